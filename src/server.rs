//! Server bootstrap
//!
//! Wires the message bus, executor registry, command router, built-in help
//! executor and inbound adapter together, and tears them down in reverse.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use slacker_api::bus::{BusHandle, MessageBus};
use slacker_api::executor::ExecutorRuntime;

use crate::config::Config;
use crate::help::HelpExecutor;
use crate::ipc::{InboundListener, get_socket_path};
use crate::registry::ExecutorRegistry;
use crate::router::{CommandRouter, RouterTask};

/// Entry point for starting a slacker server
pub struct SlackerServer;

impl SlackerServer {
    /// Start every component described by `config`
    pub async fn start(config: &Config) -> Result<RunningServer> {
        config.validate().context("Invalid configuration")?;
        let server = &config.server;
        debug!(register_address = %server.register_address, request_address = %server.request_address, "SlackerServer::start: called");

        let bus = MessageBus::new(config.bus.clone());
        let bus_handle = bus.handle();
        let bus_task = tokio::spawn(bus.run());

        let registry = ExecutorRegistry::spawn();

        let router = CommandRouter::new(bus_handle.clone(), registry.clone())
            .spawn(&server.register_address, &server.request_address)
            .await
            .context("Failed to start command router")?;

        let help = if config.help.enabled {
            let executor = Arc::new(HelpExecutor::new(registry.clone()));
            let mut runtime = ExecutorRuntime::new(executor, bus_handle.clone(), &server.register_address);
            runtime.start().await.context("Failed to start help executor")?;
            Some(runtime)
        } else {
            None
        };

        let socket_path = server.socket_path.clone().unwrap_or_else(get_socket_path);
        let listener = InboundListener::bind(&socket_path, bus_handle.clone(), &server.request_address)
            .context(format!("Failed to bind inbound socket at {}", socket_path.display()))?;
        let (listener_shutdown, shutdown_rx) = mpsc::channel(1);
        let listener_task = tokio::spawn(listener.run(shutdown_rx));

        info!(socket_path = %socket_path.display(), help = config.help.enabled, "Slacker server started");

        Ok(RunningServer {
            bus: bus_handle,
            bus_task,
            registry,
            router,
            help,
            listener_shutdown,
            listener_task,
            socket_path,
            register_address: server.register_address.clone(),
            request_address: server.request_address.clone(),
        })
    }
}

/// Handles to a started server
pub struct RunningServer {
    bus: BusHandle,
    bus_task: JoinHandle<()>,
    registry: ExecutorRegistry,
    router: RouterTask,
    help: Option<ExecutorRuntime>,
    listener_shutdown: mpsc::Sender<()>,
    listener_task: JoinHandle<()>,
    socket_path: PathBuf,
    register_address: String,
    request_address: String,
}

impl RunningServer {
    /// Bus handle, for executors running in the same process
    pub fn bus(&self) -> &BusHandle {
        &self.bus
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn register_address(&self) -> &str {
        &self.register_address
    }

    pub fn request_address(&self) -> &str {
        &self.request_address
    }

    /// Stop accepting commands, unregister help, then stop router, registry and bus
    pub async fn shutdown(self) -> Result<()> {
        debug!("RunningServer::shutdown: called");

        if self.listener_shutdown.send(()).await.is_err() {
            warn!("Inbound listener already stopped");
        }
        if let Err(e) = self.listener_task.await {
            warn!(error = %e, "Inbound listener ended abnormally");
        }

        if let Some(mut help) = self.help {
            help.stop().await.context("Failed to stop help executor")?;
        }

        self.router.stop().await;

        if let Err(e) = self.registry.shutdown().await {
            warn!(error = %e, "Registry already stopped");
        }

        self.bus.shutdown().await.context("Failed to stop message bus")?;
        if let Err(e) = self.bus_task.await {
            warn!(error = %e, "Message bus ended abnormally");
        }

        info!("Slacker server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.socket_path = Some(temp.path().join("slacker.sock"));
        config
    }

    #[tokio::test]
    async fn test_start_registers_help() {
        let temp = TempDir::new().unwrap();
        let server = SlackerServer::start(&config(&temp)).await.unwrap();

        let entries = server.registry().list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identifier, "help");
        assert!(server.socket_path().exists());

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_without_help() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.help.enabled = false;

        let server = SlackerServer::start(&config).await.unwrap();
        assert!(server.registry().list().await.unwrap().is_empty());
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_removes_socket() {
        let temp = TempDir::new().unwrap();
        let server = SlackerServer::start(&config(&temp)).await.unwrap();
        let socket_path = server.socket_path().to_path_buf();

        server.shutdown().await.unwrap();
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_second_server_on_same_socket_fails() {
        let temp = TempDir::new().unwrap();
        let first = SlackerServer::start(&config(&temp)).await.unwrap();

        let err = SlackerServer::start(&config(&temp)).await.err().unwrap();
        assert!(format!("{:#}", err).contains("already running"));

        // The first server still answers on its socket
        let client = crate::ipc::InboundClient::with_socket_path(first.socket_path().to_path_buf());
        assert_eq!(client.ping().await.unwrap(), env!("CARGO_PKG_VERSION"));

        first.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        config.bus.reply_timeout_ms = 0;

        assert!(SlackerServer::start(&config).await.is_err());
    }
}
