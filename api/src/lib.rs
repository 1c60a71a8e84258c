//! slacker-api - building blocks shared by the slacker router and its executors
//!
//! - [`request`] / [`response`]: the immutable command values
//! - [`codec`]: length-prefixed binary encoding of those values
//! - [`bus`]: addressable request/reply message bus
//! - [`executor`]: the executor trait, HELLO handshake and runtime

pub mod bus;
pub mod codec;
pub mod executor;
pub mod request;
pub mod response;

pub use bus::{BusConfig, BusHandle, ExchangeError, MessageBus, Payload};
pub use codec::{CodecError, CodecResult};
pub use executor::{Executor, ExecutorError, ExecutorRuntime, Handshake, HandshakeError, HandshakeState};
pub use request::{CommandRequest, CommandRequestBuilder, ValidationError};
pub use response::{CommandResponse, ResultCode};

/// Well-known address the router accepts HELLO registrations on
pub const REGISTER_ADDRESS: &str = "reg.slacker-server";

/// Well-known address the router accepts command requests on
pub const REQUEST_ADDRESS: &str = "req.slacker-server";
