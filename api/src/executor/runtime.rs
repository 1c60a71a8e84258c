//! ExecutorRuntime - registers an executor and serves its address

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::handshake::{Handshake, HandshakeError, HandshakeState};
use super::Executor;
use crate::bus::{BusHandle, Envelope, Payload};
use crate::response::ResultCode;

/// Failure code for a forwarded body that is not a command request
const INVALID_REQUEST_CODE: u32 = 1;

/// Drives one executor through the handshake and serves forwarded requests
pub struct ExecutorRuntime {
    executor: Arc<dyn Executor>,
    bus: BusHandle,
    register_address: String,
    handshake: Handshake,
    serve_task: Option<JoinHandle<()>>,
}

impl ExecutorRuntime {
    pub fn new(executor: Arc<dyn Executor>, bus: BusHandle, register_address: impl Into<String>) -> Self {
        let handshake = Handshake::new(executor.identifier(), executor.description(), executor.version());
        Self {
            executor,
            bus,
            register_address: register_address.into(),
            handshake,
            serve_task: None,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        self.handshake.state()
    }

    /// Address assigned by the router, once registered
    pub fn address(&self) -> Option<&str> {
        self.handshake.address()
    }

    /// Register with the router and start serving the assigned address
    ///
    /// On failure nothing is bound and the runtime is back in
    /// [`HandshakeState::Unregistered`].
    pub async fn start(&mut self) -> Result<String, HandshakeError> {
        debug!(identifier = self.handshake.identifier(), "ExecutorRuntime::start: called");
        let hello = self.handshake.hello()?;

        let reply = self.bus.request(&self.register_address, hello.to_payload()).await;
        let address = match self.handshake.acknowledge(reply) {
            Ok(address) => address,
            Err(e) => {
                error!(error = %e, "Executor registration failed");
                return Err(e);
            }
        };

        let rx = match self.bus.bind(&address).await {
            Ok(rx) => rx,
            Err(source) => {
                self.handshake.unregister()?;
                self.handshake.finish_unregister()?;
                return Err(HandshakeError::Bind {
                    identifier: self.handshake.identifier().to_string(),
                    address,
                    source,
                });
            }
        };

        let executor = self.executor.clone();
        let bus = self.bus.clone();
        self.serve_task = Some(tokio::spawn(serve(executor, bus, rx)));

        info!(
            identifier = self.handshake.identifier(),
            version = self.executor.version(),
            %address,
            "Executor registered"
        );
        Ok(address)
    }

    /// Unbind the listener and wait for the serve loop to finish
    pub async fn stop(&mut self) -> Result<(), HandshakeError> {
        debug!(identifier = self.handshake.identifier(), "ExecutorRuntime::stop: called");
        let address = self.handshake.unregister()?;

        if let Err(e) = self.bus.unbind(&address).await {
            // A closed bus has already dropped the binding
            warn!(%address, error = %e, "Failed to unbind executor");
        }

        if let Some(task) = self.serve_task.take() {
            if let Err(e) = task.await {
                warn!(%address, error = %e, "Executor serve loop ended abnormally");
            }
        }

        self.handshake.finish_unregister()?;
        info!(identifier = self.handshake.identifier(), "Executor unregistered");
        Ok(())
    }
}

/// Serve loop: one task per forwarded request
async fn serve(executor: Arc<dyn Executor>, bus: BusHandle, mut rx: mpsc::Receiver<Envelope>) {
    while let Some(envelope) = rx.recv().await {
        let executor = executor.clone();
        let bus = bus.clone();
        tokio::spawn(async move {
            handle_envelope(executor.as_ref(), &bus, envelope).await;
        });
    }
    debug!(identifier = executor.identifier(), "Executor serve loop finished");
}

async fn handle_envelope(executor: &dyn Executor, bus: &BusHandle, envelope: Envelope) {
    let Envelope { message_id, body, .. } = envelope;

    let sent = match body.decode_request() {
        Ok(request) => {
            debug!(%message_id, command = request.command(), "Executing request");
            match executor.execute(request).await {
                Ok(response) => bus.reply(&message_id, Payload::response(&response)).await,
                Err(e) => {
                    debug!(%message_id, error = %e, "Executor failed request");
                    bus.fail(&message_id, ResultCode::Error.ordinal(), &e.to_string()).await
                }
            }
        }
        Err(e) => {
            warn!(%message_id, error = %e, "Invalid request forwarded to executor");
            bus.fail(&message_id, INVALID_REQUEST_CODE, "invalid request event received")
                .await
        }
    };

    if let Err(e) = sent {
        warn!(%message_id, error = %e, "Failed to answer forwarded request");
    }
}
