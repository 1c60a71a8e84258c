//! Slacker - chat command router and executor registry
//!
//! Commands typed in a chat channel reach slacker through an outgoing webhook.
//! Each command is served by an independently deployed executor that
//! registers itself with the router; the router forwards the request to it and
//! relays the answer back to the chat.
//!
//! # Modules
//!
//! - [`registry`] - identifier to executor address directory (actor)
//! - [`router`] - request routing and HELLO registration handling
//! - [`help`] - built-in `help` executor
//! - [`ipc`] - Unix socket inbound adapter and client
//! - [`server`] - bootstrap and shutdown of all components
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod help;
pub mod ipc;
pub mod registry;
pub mod router;
pub mod server;

pub use config::{Config, HelpConfig, ServerConfig};
pub use help::HelpExecutor;
pub use ipc::{CommandForm, InboundClient, InboundReply};
pub use registry::{ExecutorEntry, ExecutorRegistry, RegistrationError, RegistryError};
pub use router::{CommandRouter, RouteError, RouterTask};
pub use server::{RunningServer, SlackerServer};
