//! Main message bus task implementation

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::config::BusConfig;
use super::handle::BusHandle;
use super::messages::{BusError, BusMetrics, BusRequest, Envelope, ExchangeError, Payload};

/// An exchange waiting for its reply
struct PendingReply {
    reply_tx: oneshot::Sender<Result<Payload, ExchangeError>>,
    address: String,
    sent_at: Instant,
    timeout_ms: u64,
}

/// Addressable, reply-correlated message bus.
///
/// A single task owns the address table and the pending-reply table; every
/// operation arrives as a [`BusRequest`] and is processed in order.
pub struct MessageBus {
    config: BusConfig,
    tx: mpsc::Sender<BusRequest>,
    rx: mpsc::Receiver<BusRequest>,
}

impl MessageBus {
    /// Create a new bus with the given configuration
    pub fn new(config: BusConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Self { config, tx, rx }
    }

    /// Get a raw sender to the bus task
    pub fn sender(&self) -> mpsc::Sender<BusRequest> {
        self.tx.clone()
    }

    /// Get a handle for binding addresses and exchanging messages
    pub fn handle(&self) -> BusHandle {
        BusHandle::new(self.tx.clone(), &self.config)
    }

    /// Run the bus task
    ///
    /// This consumes the bus and runs until shutdown is requested.
    pub async fn run(mut self) {
        let bus_tx = self.tx.clone();

        let mut consumers: HashMap<String, mpsc::Sender<Envelope>> = HashMap::new();
        let mut pending: HashMap<String, PendingReply> = HashMap::new();
        let mut metrics = BusMetrics::default();

        info!("Message bus started");

        while let Some(req) = self.rx.recv().await {
            metrics.messages_received += 1;

            match req {
                BusRequest::Bind { address, tx, reply_tx } => {
                    let result = match consumers.get(&address) {
                        Some(existing) if !existing.is_closed() => {
                            warn!(%address, "Address already bound");
                            Err(BusError::AddressInUse(address))
                        }
                        _ => {
                            debug!(%address, "Binding consumer");
                            consumers.insert(address, tx);
                            Ok(())
                        }
                    };
                    metrics.bound_addresses = consumers.len();
                    let _ = reply_tx.send(result);
                }

                BusRequest::Unbind { address } => {
                    debug!(%address, "Unbinding consumer");
                    consumers.remove(&address);
                    metrics.bound_addresses = consumers.len();
                }

                BusRequest::Send {
                    message_id,
                    address,
                    body,
                    reply_tx,
                    timeout,
                } => {
                    debug!(%message_id, %address, kind = body.kind(), "Delivering message");

                    let Some(tx) = consumers.get(&address) else {
                        debug!(%address, "No consumer bound");
                        metrics.failures += 1;
                        let _ = reply_tx.send(Err(ExchangeError::NoHandlers(address)));
                        continue;
                    };

                    let envelope = Envelope {
                        message_id: message_id.clone(),
                        address: address.clone(),
                        body,
                    };

                    match tx.try_send(envelope) {
                        Ok(()) => {
                            metrics.messages_sent += 1;

                            let timeout_ms = timeout.as_millis() as u64;
                            pending.insert(
                                message_id.clone(),
                                PendingReply {
                                    reply_tx,
                                    address,
                                    sent_at: Instant::now(),
                                    timeout_ms,
                                },
                            );
                            metrics.pending_replies = pending.len();

                            // Spawn timeout handler
                            let timeout_tx = bus_tx.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(timeout).await;
                                let _ = timeout_tx.send(BusRequest::ReplyTimeout { message_id }).await;
                            });
                        }
                        Err(TrySendError::Full(_)) => {
                            warn!(%address, "Consumer queue full");
                            metrics.failures += 1;
                            let _ = reply_tx.send(Err(ExchangeError::Backpressure(address)));
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!(%address, "Consumer gone, dropping binding");
                            consumers.remove(&address);
                            metrics.bound_addresses = consumers.len();
                            metrics.failures += 1;
                            let _ = reply_tx.send(Err(ExchangeError::NoHandlers(address)));
                        }
                    }
                }

                BusRequest::Reply { message_id, body } => {
                    match pending.remove(&message_id) {
                        Some(waiting) => {
                            debug!(
                                %message_id,
                                address = %waiting.address,
                                elapsed_ms = waiting.sent_at.elapsed().as_millis() as u64,
                                "Reply received"
                            );
                            let _ = waiting.reply_tx.send(Ok(body));
                            metrics.replies_delivered += 1;
                        }
                        None => debug!(%message_id, "Reply for unknown or expired message"),
                    }
                    metrics.pending_replies = pending.len();
                }

                BusRequest::Fail {
                    message_id,
                    code,
                    reason,
                } => {
                    match pending.remove(&message_id) {
                        Some(waiting) => {
                            debug!(%message_id, address = %waiting.address, code, %reason, "Exchange failed by recipient");
                            let _ = waiting.reply_tx.send(Err(ExchangeError::Failed { code, reason }));
                            metrics.failures += 1;
                        }
                        None => debug!(%message_id, "Failure for unknown or expired message"),
                    }
                    metrics.pending_replies = pending.len();
                }

                BusRequest::ReplyTimeout { message_id } => {
                    if let Some(waiting) = pending.remove(&message_id) {
                        warn!(%message_id, address = %waiting.address, "Reply timed out");
                        let _ = waiting.reply_tx.send(Err(ExchangeError::Timeout(waiting.timeout_ms)));
                        metrics.pending_replies = pending.len();
                        metrics.reply_timeouts += 1;
                    }
                }

                BusRequest::GetMetrics { reply_tx } => {
                    let _ = reply_tx.send(metrics.clone());
                }

                BusRequest::Shutdown => {
                    info!(pending = pending.len(), "Message bus shutting down");
                    break;
                }
            }
        }

        // Anyone still waiting learns the bus is gone
        for (_, waiting) in pending.drain() {
            let _ = waiting.reply_tx.send(Err(ExchangeError::Closed));
        }

        info!("Message bus stopped");
    }
}
