//! In-process message bus
//!
//! Consumers bind to string addresses; senders deliver a [`Payload`] to an
//! address and wait for the correlated reply. A recipient either replies with a
//! body or fails the exchange with a code and reason. Every exchange is bounded
//! by a reply timeout.

mod config;
mod core;
mod handle;
mod messages;

pub use config::BusConfig;
pub use self::core::MessageBus;
pub use handle::BusHandle;
pub use messages::{BusError, BusMetrics, BusRequest, Envelope, ExchangeError, Payload, PayloadError};
