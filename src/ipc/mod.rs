//! Inbound adapter
//!
//! Unix Domain Socket front door for webhook relays and the CLI. Each
//! connection carries one JSON line describing an outgoing-webhook call; the
//! adapter turns it into a command request, sends it to the router and writes
//! back the status and text to return to the chat.

use std::path::PathBuf;

pub mod client;
pub mod form;
pub mod listener;
pub mod messages;

pub use client::InboundClient;
pub use form::{CommandForm, FormError, parse_timestamp, split_command};
pub use listener::{InboundListener, cleanup_socket, create_listener_at, read_message, send_response};
pub use messages::{InboundMessage, InboundReply};

/// Get the default socket path for the inbound adapter
pub fn get_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("slacker")
        .join("slacker.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_path_ends_with_slacker_sock() {
        let path = get_socket_path();
        assert!(path.ends_with("slacker/slacker.sock"));
    }
}
