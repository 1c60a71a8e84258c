//! CommandRouter - relays command requests to registered executors

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use slacker_api::bus::{BusError, BusHandle, Envelope, Payload};
use slacker_api::executor::HelloAck;
use slacker_api::request::CommandRequest;
use slacker_api::response::CommandResponse;

use super::error::RouteError;
use crate::registry::ExecutorRegistry;

/// Routes inbound requests and registrations.
///
/// Holds no per-request state: every request is a one-shot translation between
/// the inbound exchange and the forwarded one.
#[derive(Clone)]
pub struct CommandRouter {
    bus: BusHandle,
    registry: ExecutorRegistry,
}

impl CommandRouter {
    pub fn new(bus: BusHandle, registry: ExecutorRegistry) -> Self {
        Self { bus, registry }
    }

    /// Handle a HELLO body, returning the assigned address
    pub async fn register(&self, body: &Payload) -> Result<String, RouteError> {
        let Payload::Json(Value::Object(fields)) = body else {
            debug!(kind = body.kind(), "Register body is not a JSON object");
            return Err(RouteError::InvalidRegisterEvent);
        };

        let text = |key: &str| fields.get(key).and_then(Value::as_str).unwrap_or_default();
        let identifier = text("i");
        let version = text("v");
        let description = fields.get("d").and_then(Value::as_str);
        debug!(%identifier, %version, "register: called");

        let address = self.registry.register(identifier, version, description).await?;
        Ok(address)
    }

    /// Validate an inbound body and find the executor address for it
    pub async fn resolve(&self, body: &Payload) -> Result<(CommandRequest, String), RouteError> {
        let request = body.decode_request().map_err(|e| {
            debug!(error = %e, "Inbound request did not decode");
            RouteError::InvalidRequest
        })?;

        match self.registry.lookup(request.command()).await? {
            Some(address) => Ok((request, address)),
            None => Err(RouteError::NoExecutor {
                command: request.command().to_string(),
            }),
        }
    }

    /// Bound on a forwarded exchange.
    ///
    /// Shorter than the bus reply timeout, so a slow executor is reported to
    /// the inbound caller before the caller's own exchange expires.
    pub fn forward_timeout(&self) -> Duration {
        let timeout = self.bus.reply_timeout();
        timeout - timeout / FORWARD_MARGIN_DIVISOR
    }

    /// Forward a request to `address` and interpret the reply
    pub async fn forward(&self, request: &CommandRequest, address: &str) -> Result<CommandResponse, RouteError> {
        let command = request.command();
        let timeout = self.forward_timeout();
        debug!(%command, %address, ?timeout, "forward: called");

        match self
            .bus
            .request_with_timeout(address, Payload::request(request), timeout)
            .await
        {
            Ok(reply) => reply.decode_response().map_err(|e| {
                warn!(%command, error = %e, "Executor replied with an invalid response");
                RouteError::InvalidResponse {
                    command: command.to_string(),
                }
            }),
            Err(cause) => Err(RouteError::Downstream {
                command: command.to_string(),
                cause,
            }),
        }
    }

    /// Route one inbound request body to its executor
    pub async fn handle_request(&self, body: &Payload) -> Result<CommandResponse, RouteError> {
        let (request, address) = self.resolve(body).await?;
        self.forward(&request, &address).await
    }

    /// Bind the register and request addresses and start the router worker
    pub async fn spawn(
        self,
        register_address: impl Into<String>,
        request_address: impl Into<String>,
    ) -> Result<RouterTask, BusError> {
        let register_address = register_address.into();
        let request_address = request_address.into();
        debug!(%register_address, %request_address, "CommandRouter::spawn: called");

        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        self.bus.bind_sender(&register_address, tx.clone()).await?;
        if let Err(e) = self.bus.bind_sender(&request_address, tx).await {
            let _ = self.bus.unbind(&register_address).await;
            return Err(e);
        }

        let bus = self.bus.clone();
        let worker = Worker {
            router: self,
            register_address: register_address.clone(),
        };
        let task = tokio::spawn(worker.run(rx));

        info!(%register_address, %request_address, "Command router started");
        Ok(RouterTask {
            bus,
            register_address,
            request_address,
            task,
        })
    }
}

const REQUEST_BUFFER: usize = 256;

/// A fifth of the reply timeout is left for relaying a forward failure
const FORWARD_MARGIN_DIVISOR: u32 = 5;

/// Running router worker
pub struct RouterTask {
    bus: BusHandle,
    register_address: String,
    request_address: String,
    task: JoinHandle<()>,
}

impl RouterTask {
    /// Unbind both addresses and wait for the worker to drain
    pub async fn stop(self) {
        debug!("RouterTask::stop: called");
        for address in [&self.register_address, &self.request_address] {
            if let Err(e) = self.bus.unbind(address).await {
                warn!(%address, error = %e, "Failed to unbind router address");
            }
        }

        if let Err(e) = self.task.await {
            warn!(error = %e, "Router worker ended abnormally");
        }
        info!("Command router stopped");
    }
}

/// Single logical worker for both router addresses
struct Worker {
    router: CommandRouter,
    register_address: String,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<Envelope>) {
        while let Some(envelope) = rx.recv().await {
            if envelope.address == self.register_address {
                // Inline, so registrations are applied in arrival order
                self.on_register(envelope).await;
            } else {
                self.on_request(envelope).await;
            }
        }
        debug!("Router worker finished");
    }

    async fn on_register(&self, envelope: Envelope) {
        let Envelope { message_id, body, .. } = envelope;

        let sent = match self.router.register(&body).await {
            Ok(address) => self.router.bus.reply(&message_id, HelloAck { address }.to_payload()).await,
            Err(e) => {
                warn!(%message_id, error = %e, "Registration rejected");
                self.router.bus.fail(&message_id, e.code(), &e.to_string()).await
            }
        };

        if let Err(e) = sent {
            warn!(%message_id, error = %e, "Failed to answer registration");
        }
    }

    async fn on_request(&self, envelope: Envelope) {
        let Envelope { message_id, body, .. } = envelope;

        let (request, address) = match self.router.resolve(&body).await {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!(%message_id, error = %e, "Request not routable");
                if let Err(e) = self.router.bus.fail(&message_id, e.code(), &e.to_string()).await {
                    warn!(%message_id, error = %e, "Failed to answer request");
                }
                return;
            }
        };

        // The forward suspends until the executor answers; keep the worker free
        let router = self.router.clone();
        tokio::spawn(async move {
            let sent = match router.forward(&request, &address).await {
                Ok(response) => router.bus.reply(&message_id, Payload::response(&response)).await,
                Err(e) => {
                    debug!(%message_id, error = %e, "Request failed downstream");
                    router.bus.fail(&message_id, e.code(), &e.to_string()).await
                }
            };

            if let Err(e) = sent {
                warn!(%message_id, error = %e, "Failed to relay response");
            }
        });
    }
}
