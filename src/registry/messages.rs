//! Registry actor messages

use thiserror::Error;
use tokio::sync::oneshot;

use super::directory::{ExecutorEntry, RegistrationError};

/// Errors talking to the registry actor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Channel error")]
    ChannelClosed,
}

impl From<RegistryError> for RegistrationError {
    fn from(_: RegistryError) -> Self {
        RegistrationError::Unavailable
    }
}

/// Commands sent to the registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    Register {
        identifier: String,
        version: String,
        description: Option<String>,
        reply: oneshot::Sender<Result<String, RegistrationError>>,
    },
    Lookup {
        identifier: String,
        reply: oneshot::Sender<Option<String>>,
    },
    List {
        reply: oneshot::Sender<Vec<ExecutorEntry>>,
    },
    Shutdown,
}
