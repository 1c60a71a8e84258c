//! Message bus configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Message bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// How long a sender waits for a reply before the exchange fails
    #[serde(rename = "reply-timeout-ms", default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    /// Channel buffer size for bus requests
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Channel buffer size for each bound consumer
    #[serde(rename = "consumer-buffer", default = "default_consumer_buffer")]
    pub consumer_buffer: usize,
}

fn default_reply_timeout_ms() -> u64 {
    30_000
}

fn default_channel_buffer() -> usize {
    1000
}

fn default_consumer_buffer() -> usize {
    100
}

impl Default for BusConfig {
    fn default() -> Self {
        debug!("BusConfig::default: called");
        Self {
            reply_timeout_ms: default_reply_timeout_ms(),
            channel_buffer: default_channel_buffer(),
            consumer_buffer: default_consumer_buffer(),
        }
    }
}

impl BusConfig {
    /// Get the reply timeout as a Duration
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}
