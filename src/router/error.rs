//! Router failure taxonomy

use thiserror::Error;

use slacker_api::bus::ExchangeError;

use crate::registry::{RegistrationError, RegistryError};

/// Bus failure code for malformed input, registry conflicts and routing misses
pub const REJECTED_CODE: u32 = 1;

/// Bus failure code for downstream and transport failures
pub const DOWNSTREAM_CODE: u32 = 2;

/// Why the router failed an exchange instead of answering it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid request event received")]
    InvalidRequest,

    #[error("invalid register event received")]
    InvalidRegisterEvent,

    #[error("unable to register executor: {0}")]
    Registration(#[from] RegistrationError),

    #[error("no executor available for the command: {command}")]
    NoExecutor { command: String },

    #[error("failed {command} processing: invalid response")]
    InvalidResponse { command: String },

    #[error("failed {command} processing: {cause}")]
    Downstream { command: String, cause: ExchangeError },

    #[error("executor registry unavailable: {0}")]
    Registry(#[from] RegistryError),
}

impl RouteError {
    /// Failure code reported on the bus
    pub fn code(&self) -> u32 {
        match self {
            RouteError::InvalidRequest
            | RouteError::InvalidRegisterEvent
            | RouteError::Registration(_)
            | RouteError::NoExecutor { .. } => REJECTED_CODE,
            RouteError::InvalidResponse { .. } | RouteError::Downstream { .. } | RouteError::Registry(_) => {
                DOWNSTREAM_CODE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            RouteError::NoExecutor {
                command: "nope".to_string()
            }
            .to_string(),
            "no executor available for the command: nope"
        );
        assert_eq!(
            RouteError::Registration(RegistrationError::InvalidRequest).to_string(),
            "unable to register executor: missing required fields"
        );
        assert_eq!(
            RouteError::Downstream {
                command: "echo".to_string(),
                cause: ExchangeError::Failed {
                    code: 2,
                    reason: "boom".to_string(),
                },
            }
            .to_string(),
            "failed echo processing: boom"
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(RouteError::InvalidRequest.code(), 1);
        assert_eq!(
            RouteError::NoExecutor {
                command: "x".to_string()
            }
            .code(),
            1
        );
        assert_eq!(
            RouteError::InvalidResponse {
                command: "x".to_string()
            }
            .code(),
            2
        );
    }
}
