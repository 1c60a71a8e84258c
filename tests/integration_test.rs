//! Integration tests for slacker
//!
//! These tests run a full server (bus, registry, router, help executor and
//! inbound socket) and drive it the way executors and webhook relays do.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use slacker::config::Config;
use slacker::ipc::{CommandForm, InboundClient, InboundReply};
use slacker::server::{RunningServer, SlackerServer};
use slacker_api::bus::{ExchangeError, Payload};
use slacker_api::executor::{Executor, ExecutorError, ExecutorRuntime, HandshakeError, HandshakeState};
use slacker_api::request::CommandRequest;
use slacker_api::response::{CommandResponse, ResultCode};
use tempfile::TempDir;

struct Echo {
    version: &'static str,
}

#[async_trait]
impl Executor for Echo {
    fn identifier(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "repeats what you say"
    }

    fn version(&self) -> &str {
        self.version
    }

    async fn execute(&self, request: CommandRequest) -> Result<CommandResponse, ExecutorError> {
        match request.arguments() {
            Some("boom") => Err(ExecutorError::failed("boom")),
            Some("invalid") => Ok(CommandResponse::invalid("echo needs words")),
            Some(text) => Ok(CommandResponse::ok_with(text)),
            None => Ok(CommandResponse::ok()),
        }
    }
}

async fn start_server(temp: &TempDir) -> RunningServer {
    let mut config = Config::default();
    config.server.socket_path = Some(temp.path().join("slacker.sock"));
    config.bus.reply_timeout_ms = 2_000;
    SlackerServer::start(&config).await.expect("Failed to start server")
}

async fn start_echo(server: &RunningServer, version: &'static str) -> Result<ExecutorRuntime, HandshakeError> {
    let mut runtime = ExecutorRuntime::new(
        Arc::new(Echo { version }),
        server.bus().clone(),
        server.register_address(),
    );
    runtime.start().await?;
    Ok(runtime)
}

fn form(text: &str) -> CommandForm {
    CommandForm {
        timestamp: Some("1355517523.000005".to_string()),
        team_id: Some("T0001".to_string()),
        team_domain: Some("example".to_string()),
        channel_id: Some("C2147483705".to_string()),
        channel_name: Some("test".to_string()),
        user_id: Some("U2147483697".to_string()),
        user_name: Some("Steve".to_string()),
        trigger_word: Some("slacker".to_string()),
        text: Some(text.to_string()),
    }
}

fn request(command: &str, arguments: &str) -> CommandRequest {
    CommandRequest::builder()
        .timestamp(Utc::now())
        .team_id("T1")
        .team_domain("example")
        .channel_id("C1")
        .channel_name("general")
        .user_id("U1")
        .user_name("ana")
        .command(command)
        .arguments(arguments)
        .build()
        .expect("valid request")
}

// =============================================================================
// Bus-level routing
// =============================================================================

#[tokio::test]
async fn test_echo_end_to_end_over_bus() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;
    let _echo = start_echo(&server, "1.0.0").await.unwrap();

    let reply = server
        .bus()
        .request(server.request_address(), Payload::request(&request("echo", "hi")))
        .await
        .unwrap();
    let response = reply.decode_response().unwrap();

    assert_eq!(response.code(), ResultCode::Ok);
    assert_eq!(response.message(), Some("hi"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_downstream_failure_and_unknown_command() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;
    let _echo = start_echo(&server, "1.0.0").await.unwrap();

    let err = server
        .bus()
        .request(server.request_address(), Payload::request(&request("echo", "boom")))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ExchangeError::Failed {
            code: 2,
            reason: "failed echo processing: boom".to_string(),
        }
    );

    let err = server
        .bus()
        .request(server.request_address(), Payload::request(&request("nope", "")))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ExchangeError::Failed {
            code: 1,
            reason: "no executor available for the command: nope".to_string(),
        }
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_requests() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;
    let _echo = start_echo(&server, "1.0.0").await.unwrap();

    let bus = server.bus();
    let replies = join_all((0..25).map(|i| {
        let body = Payload::request(&request("echo", &format!("n{}", i)));
        bus.request(server.request_address(), body)
    }))
    .await;

    for (i, reply) in replies.into_iter().enumerate() {
        let response = reply.unwrap().decode_response().unwrap();
        assert_eq!(response.message(), Some(format!("n{}", i).as_str()));
    }

    server.shutdown().await.unwrap();
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_version_upgrade_keeps_address() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;

    let mut first = start_echo(&server, "1.0.0").await.unwrap();
    let address = first.address().unwrap().to_string();
    first.stop().await.unwrap();

    let err = start_echo(&server, "0.9.0").await.err().expect("older build must be refused");
    assert_eq!(
        err.to_string(),
        "unable to register 'echo' executor: unable to register executor: incompatible version, found 0.9.0, expected 1.0.0 or greater"
    );

    let upgraded = start_echo(&server, "1.1.0").await.unwrap();
    assert_eq!(upgraded.address(), Some(address.as_str()));
    assert!(matches!(upgraded.state(), HandshakeState::Registered { .. }));

    let entries = server.registry().list().await.unwrap();
    let echo = entries.iter().find(|e| e.identifier == "echo").unwrap();
    assert_eq!(echo.version, "1.1.0");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_second_live_instance_cannot_bind() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;

    let _first = start_echo(&server, "1.0.0").await.unwrap();
    let err = start_echo(&server, "1.0.0").await.err().expect("address is taken");
    assert!(matches!(err, HandshakeError::Bind { .. }));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_registration() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;

    let err = server
        .bus()
        .request(server.register_address(), Payload::Json(json!({"i": "x", "v": "1.meh"})))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ExchangeError::Failed {
            code: 1,
            reason: "unable to register executor: missing required fields".to_string(),
        }
    );

    server.shutdown().await.unwrap();
}

// =============================================================================
// Inbound socket
// =============================================================================

#[tokio::test]
async fn test_webhook_flow_through_socket() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;
    let _echo = start_echo(&server, "1.0.0").await.unwrap();
    let client = InboundClient::with_socket_path(server.socket_path().to_path_buf());

    assert_eq!(client.ping().await.unwrap(), env!("CARGO_PKG_VERSION"));

    let reply = client.send_form(form("slacker echo hello there")).await.unwrap();
    assert_eq!(
        reply,
        InboundReply::Reply {
            status: 200,
            text: Some("hello there".to_string())
        }
    );

    let reply = client.send_form(form("slacker echo invalid")).await.unwrap();
    assert_eq!(
        reply,
        InboundReply::Reply {
            status: 400,
            text: Some("echo needs words".to_string())
        }
    );

    let reply = client.send_form(form("slacker echo boom")).await.unwrap();
    assert_eq!(reply, InboundReply::Reply { status: 500, text: None });

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_help_through_socket() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;
    let _echo = start_echo(&server, "1.0.0").await.unwrap();
    let client = InboundClient::with_socket_path(server.socket_path().to_path_buf());

    let reply = client.send_form(form("slacker help")).await.unwrap();
    assert_eq!(
        reply,
        InboundReply::Reply {
            status: 200,
            text: Some(
                "echo       repeats what you say\nhelp       shows the help message for all the available commands"
                    .to_string()
            )
        }
    );

    let reply = client.send_form(form("slacker help Echo")).await.unwrap();
    assert_eq!(
        reply,
        InboundReply::Reply {
            status: 200,
            text: Some("echo       repeats what you say".to_string())
        }
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stopped_executor_reports_failure() {
    let temp = TempDir::new().unwrap();
    let server = start_server(&temp).await;
    let mut echo = start_echo(&server, "1.0.0").await.unwrap();
    echo.stop().await.unwrap();

    let client = InboundClient::with_socket_path(server.socket_path().to_path_buf())
        .with_reply_timeout(Duration::from_secs(5));
    let reply = client.send_form(form("slacker echo hi")).await.unwrap();
    assert_eq!(reply, InboundReply::Reply { status: 500, text: None });

    server.shutdown().await.unwrap();
}
