//! Message types for the message bus

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::codec::CodecError;
use crate::request::CommandRequest;
use crate::response::CommandResponse;

/// Body carried by a bus exchange.
///
/// Encoded command values are tagged with what they carry so a receiver can
/// tell a malformed body apart from a well-formed one without guessing.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured control message, e.g. the registration handshake
    Json(serde_json::Value),
    /// Wire-encoded [`CommandRequest`]
    Request(Vec<u8>),
    /// Wire-encoded [`CommandResponse`]
    Response(Vec<u8>),
    /// Plain text
    Text(String),
}

impl Payload {
    pub fn request(request: &CommandRequest) -> Self {
        Payload::Request(request.encode())
    }

    pub fn response(response: &CommandResponse) -> Self {
        Payload::Response(response.encode())
    }

    /// Short name of the payload variant, for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Json(_) => "json",
            Payload::Request(_) => "request",
            Payload::Response(_) => "response",
            Payload::Text(_) => "text",
        }
    }

    pub fn decode_request(&self) -> Result<CommandRequest, PayloadError> {
        match self {
            Payload::Request(bytes) => Ok(CommandRequest::decode(bytes)?),
            other => Err(PayloadError::UnexpectedKind {
                expected: "request",
                found: other.kind(),
            }),
        }
    }

    pub fn decode_response(&self) -> Result<CommandResponse, PayloadError> {
        match self {
            Payload::Response(bytes) => Ok(CommandResponse::decode(bytes)?),
            other => Err(PayloadError::UnexpectedKind {
                expected: "response",
                found: other.kind(),
            }),
        }
    }
}

/// Errors turning a payload back into a command value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("expected {expected} payload, found {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Why a request/reply exchange did not produce a reply body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Nothing is bound at the target address
    #[error("no handlers for address {0}")]
    NoHandlers(String),

    /// The consumer's queue is full
    #[error("consumer queue full for address {0}")]
    Backpressure(String),

    /// No reply arrived in time
    #[error("timed out after {0}ms waiting for a reply")]
    Timeout(u64),

    /// The recipient explicitly failed the exchange
    #[error("{reason}")]
    Failed { code: u32, reason: String },

    /// The bus went away before the exchange completed
    #[error("message bus closed")]
    Closed,
}

/// Errors from bus administration calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("address already bound: {0}")]
    AddressInUse(String),

    #[error("message bus channel closed")]
    ChannelClosed,
}

/// A message delivered to a bound consumer.
///
/// The consumer answers it through [`BusHandle::reply`](super::BusHandle::reply)
/// or [`BusHandle::fail`](super::BusHandle::fail) using `message_id`.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message_id: String,
    pub address: String,
    pub body: Payload,
}

/// Internal requests to the bus task
#[derive(Debug)]
pub enum BusRequest {
    /// Bind a consumer to an address
    Bind {
        address: String,
        tx: mpsc::Sender<Envelope>,
        reply_tx: oneshot::Sender<Result<(), BusError>>,
    },

    /// Remove the consumer bound to an address
    Unbind { address: String },

    /// Deliver a body and wait for the correlated reply
    Send {
        message_id: String,
        address: String,
        body: Payload,
        reply_tx: oneshot::Sender<Result<Payload, ExchangeError>>,
        timeout: Duration,
    },

    /// Answer a delivered message
    Reply { message_id: String, body: Payload },

    /// Fail a delivered message
    Fail {
        message_id: String,
        code: u32,
        reason: String,
    },

    /// Reply timeout notification (internal)
    ReplyTimeout { message_id: String },

    /// Get current metrics
    GetMetrics { reply_tx: oneshot::Sender<BusMetrics> },

    /// Shutdown the bus
    Shutdown,
}

/// Bus metrics for observability
#[derive(Debug, Clone, Default)]
pub struct BusMetrics {
    pub bound_addresses: usize,
    pub pending_replies: usize,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub replies_delivered: u64,
    pub failures: u64,
    pub reply_timeouts: u64,
}
