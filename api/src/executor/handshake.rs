//! HELLO handshake between an executor and the router.
//!
//! ```text
//! Unregistered --hello--> AwaitingAck --ack--> Registered
//!      ^                      |                    |
//!      +------rejected--------+              unregister
//!      |                                           v
//!      +------------finish_unregister------- Unregistering
//! ```
//!
//! The state machine is a plain value: it knows nothing about the bus, so the
//! transitions can be driven and observed directly.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bus::{BusError, ExchangeError, Payload};

/// HELLO message an executor sends to obtain its address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    #[serde(rename = "i")]
    pub identifier: String,

    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "v")]
    pub version: String,
}

impl Hello {
    pub fn to_payload(&self) -> Payload {
        // A struct of strings always serializes
        Payload::Json(serde_json::json!(self))
    }
}

/// Router acknowledgement carrying the assigned address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloAck {
    #[serde(rename = "a")]
    pub address: String,
}

impl HelloAck {
    pub fn to_payload(&self) -> Payload {
        Payload::Json(serde_json::json!(self))
    }
}

/// Registration state of one executor instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Unregistered,
    AwaitingAck,
    Registered { address: String },
    Unregistering { address: String },
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeState::Unregistered => f.write_str("unregistered"),
            HandshakeState::AwaitingAck => f.write_str("awaiting-ack"),
            HandshakeState::Registered { address } => write!(f, "registered at {}", address),
            HandshakeState::Unregistering { address } => write!(f, "unregistering from {}", address),
        }
    }
}

/// Handshake failures
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        state: HandshakeState,
        event: &'static str,
    },

    #[error("unable to register '{identifier}' executor: {reason}")]
    Rejected { identifier: String, reason: String },

    #[error("unable to bind '{identifier}' executor at {address}: {source}")]
    Bind {
        identifier: String,
        address: String,
        #[source]
        source: BusError,
    },
}

/// HELLO handshake state machine for a single executor instance
#[derive(Debug, Clone)]
pub struct Handshake {
    identifier: String,
    description: String,
    version: String,
    state: HandshakeState,
}

impl Handshake {
    pub fn new(identifier: impl Into<String>, description: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            description: description.into(),
            version: version.into(),
            state: HandshakeState::Unregistered,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    /// Assigned address while registered or unregistering
    pub fn address(&self) -> Option<&str> {
        match &self.state {
            HandshakeState::Registered { address } | HandshakeState::Unregistering { address } => Some(address),
            _ => None,
        }
    }

    fn invalid(&self, event: &'static str) -> HandshakeError {
        HandshakeError::InvalidTransition {
            state: self.state.clone(),
            event,
        }
    }

    /// `Unregistered -> AwaitingAck`: produce the HELLO to send
    pub fn hello(&mut self) -> Result<Hello, HandshakeError> {
        if self.state != HandshakeState::Unregistered {
            return Err(self.invalid("send hello"));
        }

        self.state = HandshakeState::AwaitingAck;
        Ok(Hello {
            identifier: self.identifier.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            version: self.version.clone(),
        })
    }

    /// `AwaitingAck -> Registered` on an address, `AwaitingAck -> Unregistered` otherwise
    pub fn acknowledge(&mut self, reply: Result<Payload, ExchangeError>) -> Result<String, HandshakeError> {
        if self.state != HandshakeState::AwaitingAck {
            return Err(self.invalid("acknowledge"));
        }

        let outcome = match reply {
            Ok(Payload::Json(body)) => match serde_json::from_value::<HelloAck>(body) {
                Ok(ack) if !ack.address.is_empty() => Ok(ack.address),
                _ => Err("no address to bind was received".to_string()),
            },
            Ok(_) => Err("invalid response".to_string()),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(address) => {
                self.state = HandshakeState::Registered {
                    address: address.clone(),
                };
                Ok(address)
            }
            Err(reason) => {
                self.state = HandshakeState::Unregistered;
                Err(HandshakeError::Rejected {
                    identifier: self.identifier.clone(),
                    reason,
                })
            }
        }
    }

    /// `Registered -> Unregistering`: returns the address to unbind
    pub fn unregister(&mut self) -> Result<String, HandshakeError> {
        let HandshakeState::Registered { address } = &self.state else {
            return Err(self.invalid("unregister"));
        };

        let address = address.clone();
        self.state = HandshakeState::Unregistering {
            address: address.clone(),
        };
        Ok(address)
    }

    /// `Unregistering -> Unregistered`
    pub fn finish_unregister(&mut self) -> Result<(), HandshakeError> {
        if !matches!(self.state, HandshakeState::Unregistering { .. }) {
            return Err(self.invalid("finish unregistering"));
        }

        self.state = HandshakeState::Unregistered;
        Ok(())
    }
}
