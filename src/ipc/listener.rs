//! Inbound adapter, server side
//!
//! Creates the Unix Domain Socket listener and answers each connection by
//! routing the command it carries.

use std::path::PathBuf;

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use slacker_api::bus::{BusHandle, Payload};

use super::form::CommandForm;
use super::messages::{InboundMessage, InboundReply};

/// Maximum message size
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Status for a webhook call that does not describe a valid command
const BAD_REQUEST: u16 = 400;

/// Status for a command the router could not answer
const SERVER_ERROR: u16 = 500;

/// Create and bind a Unix Domain Socket listener at `socket_path`
///
/// Removes a socket file left behind by a previous run, but refuses to take
/// over a socket that a live server still accepts connections on.
pub fn create_listener_at(socket_path: &PathBuf) -> Result<(UnixListener, PathBuf)> {
    debug!(?socket_path, "create_listener: creating inbound socket");

    // Ensure parent directory exists
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }

    if socket_path.exists() {
        if std::os::unix::net::UnixStream::connect(socket_path).is_ok() {
            return Err(eyre::eyre!(
                "Slacker server already running at {}",
                socket_path.display()
            ));
        }
        debug!(?socket_path, "create_listener: removing stale socket");
        std::fs::remove_file(socket_path).context("Failed to remove stale socket")?;
    }

    let listener = UnixListener::bind(socket_path).context("Failed to bind inbound socket")?;
    debug!(?socket_path, "create_listener: socket bound successfully");

    Ok((listener, socket_path.clone()))
}

/// Remove the socket file on shutdown
pub fn cleanup_socket(socket_path: &PathBuf) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}

/// Read one message line from the stream
///
/// Never buffers more than `MAX_MESSAGE_SIZE` bytes of a line.
pub async fn read_message(stream: &mut UnixStream) -> Result<InboundMessage> {
    let mut reader = BufReader::new(stream).take(MAX_MESSAGE_SIZE as u64 + 1);
    let mut line = String::new();

    let bytes_read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read inbound message")?;

    if bytes_read > MAX_MESSAGE_SIZE {
        return Err(eyre::eyre!("Message too large: more than {} bytes", MAX_MESSAGE_SIZE));
    }

    if line.is_empty() {
        return Err(eyre::eyre!("Empty message received"));
    }

    let msg: InboundMessage = serde_json::from_str(line.trim()).context("Failed to parse inbound message")?;
    debug!(?msg, "read_message: parsed message");

    Ok(msg)
}

/// Send a response on the stream
pub async fn send_response(stream: &mut UnixStream, response: InboundReply) -> Result<()> {
    let response_json = serde_json::to_string(&response).context("Failed to serialize response")?;
    stream
        .write_all(response_json.as_bytes())
        .await
        .context("Failed to write response")?;
    stream.write_all(b"\n").await.context("Failed to write newline")?;
    stream.flush().await.context("Failed to flush response")?;
    debug!(?response, "send_response: sent response");
    Ok(())
}

/// Accept loop that feeds inbound commands to the router
pub struct InboundListener {
    listener: UnixListener,
    socket_path: PathBuf,
    bus: BusHandle,
    request_address: String,
}

impl InboundListener {
    pub fn bind(socket_path: &PathBuf, bus: BusHandle, request_address: impl Into<String>) -> Result<Self> {
        let (listener, socket_path) = create_listener_at(socket_path)?;
        Ok(Self {
            listener,
            socket_path,
            bus,
            request_address: request_address.into(),
        })
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Serve connections until `shutdown_rx` fires, then remove the socket file
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(socket_path = %self.socket_path.display(), "Inbound listener started");

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let bus = self.bus.clone();
                            let request_address = self.request_address.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, &bus, &request_address).await {
                                    warn!(error = %e, "Inbound connection failed");
                                }
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to accept inbound connection");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Inbound listener shutting down");
                    break;
                }
            }
        }

        cleanup_socket(&self.socket_path);
    }
}

async fn handle_connection(mut stream: UnixStream, bus: &BusHandle, request_address: &str) -> Result<()> {
    let reply = match read_message(&mut stream).await {
        Ok(InboundMessage::Ping) => InboundReply::Pong {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Ok(InboundMessage::Command(form)) => route_command(form, bus, request_address).await,
        Err(e) => InboundReply::Error {
            message: format!("{:#}", e),
        },
    };

    send_response(&mut stream, reply).await
}

/// Turn a webhook form into a request, route it and map the outcome to a reply
async fn route_command(form: CommandForm, bus: &BusHandle, request_address: &str) -> InboundReply {
    let request = match form.into_request() {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Unable to parse inbound command");
            return InboundReply::Reply {
                status: BAD_REQUEST,
                text: None,
            };
        }
    };

    let command = request.command().to_string();
    debug!(%command, user = request.user_name(), "route_command: called");

    let outcome = bus
        .request(request_address, Payload::request(&request))
        .await
        .map_err(|e| e.to_string())
        .and_then(|reply| reply.decode_response().map_err(|e| e.to_string()));

    match outcome {
        Ok(response) => InboundReply::Reply {
            status: response.code().status(),
            text: response.message().map(str::to_string),
        },
        Err(reason) => {
            warn!(%command, %reason, "Command failed");
            InboundReply::Reply {
                status: SERVER_ERROR,
                text: None,
            }
        }
    }
}
