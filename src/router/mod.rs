//! Command router
//!
//! Listens on the register and request addresses. Registrations go to the
//! executor registry; requests are looked up there and forwarded to the
//! executor's address, and the executor's answer (or a synthesized failure) is
//! relayed back to the caller.

mod core;
mod error;

pub use self::core::{CommandRouter, RouterTask};
pub use error::{DOWNSTREAM_CODE, REJECTED_CODE, RouteError};
