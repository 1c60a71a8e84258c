//! ExecutorRegistry - actor that owns the ExecutorDirectory
//!
//! Every registration, lookup and listing is a command on one channel, so the
//! directory is only ever touched by the actor task.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::directory::{ExecutorDirectory, ExecutorEntry, RegistrationError};
use super::messages::{RegistryCommand, RegistryError};

const REGISTRY_CHANNEL_BUFFER: usize = 256;

/// Handle to the registry actor
#[derive(Clone)]
pub struct ExecutorRegistry {
    tx: mpsc::Sender<RegistryCommand>,
}

impl ExecutorRegistry {
    /// Spawn the registry actor with an empty directory
    pub fn spawn() -> Self {
        debug!("ExecutorRegistry::spawn: called");
        let (tx, rx) = mpsc::channel(REGISTRY_CHANNEL_BUFFER);
        tokio::spawn(actor_loop(ExecutorDirectory::new(), rx));
        info!("ExecutorRegistry spawned");
        Self { tx }
    }

    pub async fn register(
        &self,
        identifier: &str,
        version: &str,
        description: Option<&str>,
    ) -> Result<String, RegistrationError> {
        debug!(%identifier, %version, "register: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Register {
                identifier: identifier.to_string(),
                version: version.to_string(),
                description: description.map(str::to_string),
                reply,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    pub async fn lookup(&self, identifier: &str) -> Result<Option<String>, RegistryError> {
        debug!(%identifier, "lookup: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Lookup {
                identifier: identifier.to_string(),
                reply,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Snapshot of all entries ordered by identifier
    pub async fn list(&self) -> Result<Vec<ExecutorEntry>, RegistryError> {
        debug!("list: called");
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::List { reply })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        debug!("shutdown: called");
        self.tx
            .send(RegistryCommand::Shutdown)
            .await
            .map_err(|_| RegistryError::ChannelClosed)
    }
}

async fn actor_loop(mut directory: ExecutorDirectory, mut rx: mpsc::Receiver<RegistryCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            RegistryCommand::Register {
                identifier,
                version,
                description,
                reply,
            } => {
                let result = directory.register(&identifier, &version, description.as_deref());
                let _ = reply.send(result);
            }
            RegistryCommand::Lookup { identifier, reply } => {
                let _ = reply.send(directory.lookup(&identifier).map(str::to_string));
            }
            RegistryCommand::List { reply } => {
                let _ = reply.send(directory.snapshot());
            }
            RegistryCommand::Shutdown => {
                info!(entries = directory.len(), "ExecutorRegistry shutting down");
                break;
            }
        }
    }
}
