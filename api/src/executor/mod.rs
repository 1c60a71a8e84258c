//! Executor side of the router protocol
//!
//! An [`Executor`] handles exactly one command. [`ExecutorRuntime`] registers it
//! with the router through the HELLO [`Handshake`] and then serves forwarded
//! requests on the address the router assigned.

mod handshake;
mod runtime;

use async_trait::async_trait;
use thiserror::Error;

use crate::request::CommandRequest;
use crate::response::CommandResponse;

pub use handshake::{Handshake, HandshakeError, HandshakeState, Hello, HelloAck};
pub use runtime::ExecutorRuntime;

/// Description registered when an executor does not provide one
pub const DEFAULT_DESCRIPTION: &str = "Description not available";

/// Failure that makes an executor fail the exchange instead of answering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("{0}")]
    Failed(String),
}

impl ExecutorError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ExecutorError::Failed(reason.into())
    }
}

/// A handler for one command
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Command identifier this executor serves
    fn identifier(&self) -> &str;

    /// Human-readable description shown by help
    fn description(&self) -> &str {
        DEFAULT_DESCRIPTION
    }

    /// Semantic version of this build
    fn version(&self) -> &str;

    /// Handle one request.
    ///
    /// Returning an error fails the exchange; an ERROR-coded response is a
    /// normal answer.
    async fn execute(&self, request: CommandRequest) -> Result<CommandResponse, ExecutorError>;
}
