//! Inbound adapter client
//!
//! Used by the CLI (and by webhook relays) to hand a command to a running
//! server over its Unix Domain Socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use slacker_api::bus::BusConfig;

use super::form::CommandForm;
use crate::config::Config;
use super::get_socket_path;
use super::messages::{InboundMessage, InboundReply};

/// Default timeout for connecting and writing
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra time to wait for a reply beyond the server's bus reply timeout
const REPLY_MARGIN: Duration = Duration::from_secs(5);

/// Maximum message size
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Client for the inbound adapter socket
#[derive(Debug, Clone)]
pub struct InboundClient {
    socket_path: PathBuf,
    timeout: Duration,
    reply_timeout: Duration,
}

impl Default for InboundClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundClient {
    /// Create a new client with the default socket path
    pub fn new() -> Self {
        Self::with_socket_path(get_socket_path())
    }

    /// Create a client with a custom socket path
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
            reply_timeout: BusConfig::default().reply_timeout() + REPLY_MARGIN,
        }
    }

    /// Create a client for the server described by `config`
    ///
    /// The reply wait follows the configured bus reply timeout, so a slow
    /// command is answered by the server before the client gives up.
    pub fn from_config(config: &Config) -> Self {
        let socket_path = config.server.socket_path.clone().unwrap_or_else(get_socket_path);
        Self::with_socket_path(socket_path).with_reply_timeout(config.bus.reply_timeout() + REPLY_MARGIN)
    }

    /// Set a custom timeout for connecting and writing
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how long to wait for the command's reply
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Check if the server socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Check if the server is alive and get its version
    pub async fn ping(&self) -> Result<String> {
        debug!("InboundClient: pinging server");
        match self.send_message(InboundMessage::Ping).await? {
            InboundReply::Pong { version } => Ok(version),
            InboundReply::Error { message } => Err(eyre::eyre!("Server error: {}", message)),
            other => Err(eyre::eyre!("Unexpected response: {:?}", other)),
        }
    }

    /// Submit a webhook form and return the server's reply
    pub async fn send_form(&self, form: CommandForm) -> Result<InboundReply> {
        debug!(text = ?form.text, "InboundClient: sending command");
        self.send_message(InboundMessage::Command(form)).await
    }

    /// Send a message to the server and wait for the response
    async fn send_message(&self, msg: InboundMessage) -> Result<InboundReply> {
        debug!(?self.socket_path, ?msg, "InboundClient: sending message");

        let mut stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to slacker socket")?;

        let msg_json = serde_json::to_string(&msg).context("Failed to serialize message")?;
        if msg_json.len() > MAX_MESSAGE_SIZE {
            return Err(eyre::eyre!("Message too large: {} bytes", msg_json.len()));
        }

        tokio::time::timeout(self.timeout, async {
            stream
                .write_all(msg_json.as_bytes())
                .await
                .context("Failed to write message")?;
            stream.write_all(b"\n").await.context("Failed to write newline")?;
            stream.flush().await.context("Failed to flush stream")?;
            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Write timeout")??;

        let mut reader = BufReader::new(&mut stream);
        let mut response_line = String::new();

        tokio::time::timeout(self.reply_timeout, async {
            let bytes_read = reader
                .read_line(&mut response_line)
                .await
                .context("Failed to read response")?;

            if bytes_read > MAX_MESSAGE_SIZE {
                return Err(eyre::eyre!("Response too large: {} bytes", bytes_read));
            }

            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Read timeout")??;

        let response: InboundReply =
            serde_json::from_str(response_line.trim()).context("Failed to parse server response")?;

        debug!(?response, "InboundClient: received response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_client_default() {
        let client = InboundClient::default();
        assert!(client.socket_path.ends_with("slacker.sock"));
    }

    #[test]
    fn test_client_builders() {
        let client = InboundClient::with_socket_path(PathBuf::from("/custom/slacker.sock"))
            .with_timeout(Duration::from_secs(10))
            .with_reply_timeout(Duration::from_secs(1));

        assert_eq!(client.socket_path(), Path::new("/custom/slacker.sock"));
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(client.reply_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_client_default_outwaits_bus() {
        let client = InboundClient::with_socket_path(PathBuf::from("/tmp/slacker.sock"));
        assert_eq!(client.reply_timeout, Duration::from_secs(35));
    }

    #[test]
    fn test_client_from_config() {
        let mut config = Config::default();
        config.server.socket_path = Some(PathBuf::from("/custom/slacker.sock"));
        config.bus.reply_timeout_ms = 120_000;

        let client = InboundClient::from_config(&config);
        assert_eq!(client.socket_path(), Path::new("/custom/slacker.sock"));
        assert_eq!(client.reply_timeout, Duration::from_secs(125));
    }

    #[test]
    fn test_client_from_default_config_uses_default_socket() {
        let client = InboundClient::from_config(&Config::default());
        assert_eq!(client.socket_path(), get_socket_path().as_path());
    }

    #[tokio::test]
    async fn test_ping_without_server_fails() {
        let temp = TempDir::new().unwrap();
        let client = InboundClient::with_socket_path(temp.path().join("nonexistent.sock"));

        assert!(!client.socket_exists());
        assert!(client.ping().await.is_err());
    }
}
