//! BusHandle - client interface to the message bus

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use super::config::BusConfig;
use super::messages::{BusError, BusMetrics, BusRequest, Envelope, ExchangeError, Payload};

/// Handle for binding addresses and exchanging messages over the bus
///
/// This handle is cheap to clone and can be shared between tasks.
#[derive(Clone)]
pub struct BusHandle {
    /// Sender to the bus task
    tx: mpsc::Sender<BusRequest>,

    /// Default reply timeout for requests
    reply_timeout: Duration,

    /// Buffer size for consumer channels created by `bind`
    consumer_buffer: usize,
}

impl BusHandle {
    pub(crate) fn new(tx: mpsc::Sender<BusRequest>, config: &BusConfig) -> Self {
        Self {
            tx,
            reply_timeout: config.reply_timeout(),
            consumer_buffer: config.consumer_buffer,
        }
    }

    /// Default timeout applied by [`request`](Self::request)
    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// Bind a new consumer to `address` and return its receiving end
    pub async fn bind(&self, address: &str) -> Result<mpsc::Receiver<Envelope>, BusError> {
        let (tx, rx) = mpsc::channel(self.consumer_buffer);
        self.bind_sender(address, tx).await?;
        Ok(rx)
    }

    /// Bind an existing consumer channel to `address`
    ///
    /// Lets one consumer serve several addresses; envelopes carry the address
    /// they were sent to.
    pub async fn bind_sender(&self, address: &str, tx: mpsc::Sender<Envelope>) -> Result<(), BusError> {
        debug!(%address, "BusHandle::bind_sender: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(BusRequest::Bind {
                address: address.to_string(),
                tx,
                reply_tx,
            })
            .await
            .map_err(|_| BusError::ChannelClosed)?;

        reply_rx.await.map_err(|_| BusError::ChannelClosed)?
    }

    /// Remove whatever consumer is bound to `address`
    pub async fn unbind(&self, address: &str) -> Result<(), BusError> {
        debug!(%address, "BusHandle::unbind: called");
        self.tx
            .send(BusRequest::Unbind {
                address: address.to_string(),
            })
            .await
            .map_err(|_| BusError::ChannelClosed)
    }

    /// Send `body` to `address` and wait for the reply, using the default timeout
    pub async fn request(&self, address: &str, body: Payload) -> Result<Payload, ExchangeError> {
        self.request_with_timeout(address, body, self.reply_timeout).await
    }

    /// Send `body` to `address` and wait at most `timeout` for the reply
    pub async fn request_with_timeout(
        &self,
        address: &str,
        body: Payload,
        timeout: Duration,
    ) -> Result<Payload, ExchangeError> {
        let message_id = Uuid::now_v7().to_string();
        debug!(%address, %message_id, kind = body.kind(), ?timeout, "BusHandle::request: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(BusRequest::Send {
                message_id,
                address: address.to_string(),
                body,
                reply_tx,
                timeout,
            })
            .await
            .map_err(|_| ExchangeError::Closed)?;

        // The bus enforces the timeout and always answers unless it shuts down
        reply_rx.await.map_err(|_| ExchangeError::Closed)?
    }

    /// Answer a delivered message
    pub async fn reply(&self, message_id: &str, body: Payload) -> Result<(), BusError> {
        debug!(%message_id, kind = body.kind(), "BusHandle::reply: called");
        self.tx
            .send(BusRequest::Reply {
                message_id: message_id.to_string(),
                body,
            })
            .await
            .map_err(|_| BusError::ChannelClosed)
    }

    /// Fail a delivered message with a code and a human-readable reason
    pub async fn fail(&self, message_id: &str, code: u32, reason: &str) -> Result<(), BusError> {
        debug!(%message_id, code, %reason, "BusHandle::fail: called");
        self.tx
            .send(BusRequest::Fail {
                message_id: message_id.to_string(),
                code,
                reason: reason.to_string(),
            })
            .await
            .map_err(|_| BusError::ChannelClosed)
    }

    /// Get current bus metrics
    pub async fn metrics(&self) -> Result<BusMetrics, BusError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(BusRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| BusError::ChannelClosed)?;

        reply_rx.await.map_err(|_| BusError::ChannelClosed)
    }

    /// Request shutdown of the bus
    pub async fn shutdown(&self) -> Result<(), BusError> {
        debug!("BusHandle::shutdown: called");
        self.tx
            .send(BusRequest::Shutdown)
            .await
            .map_err(|_| BusError::ChannelClosed)
    }
}
