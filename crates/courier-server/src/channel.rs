//! The HTTP channel: request/reply exchanges over the agent's message bus.

use crate::bus::{BusError, MessageBus};
use courier_broker::{Broker, BrokerError};
use courier_types::{Identity, OutboundEnvelope};
use std::sync::Arc;
use std::time::Duration;

/// Why an exchange produced no reply.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("failed to publish to agent: {0}")]
    Publish(#[from] BusError),

    #[error(transparent)]
    Await(#[from] BrokerError),
}

/// Bridges synchronous HTTP requests onto the asynchronous agent bus.
pub struct HttpChannel {
    broker: Broker<OutboundEnvelope>,
    bus: Arc<dyn MessageBus>,
}

impl HttpChannel {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            broker: Broker::new(),
            bus,
        }
    }

    pub fn broker(&self) -> &Broker<OutboundEnvelope> {
        &self.broker
    }

    /// Sends `content` to the agent as `identity` and waits up to `timeout`
    /// for the correlated reply.
    ///
    /// The slot is registered before the envelope is published, so a reply
    /// can never beat its own registration. If publishing fails or the
    /// calling request is cancelled, dropping the slot deregisters it.
    pub async fn exchange(
        &self,
        identity: &Identity,
        content: &str,
        timeout: Duration,
    ) -> Result<OutboundEnvelope, ExchangeError> {
        let slot = self.broker.register_with_session(identity.chat_id.clone());
        let correlation_id = slot.id().clone();

        self.bus
            .publish(identity.envelope(content, correlation_id.clone()))?;
        tracing::debug!(
            correlation_id = %correlation_id,
            sender_id = %identity.sender_id,
            "published message to agent"
        );

        let reply = self.broker.await_with_timeout(slot, timeout).await?;
        Ok(reply)
    }

    /// Delivery entry point for the agent's outbound envelopes.
    ///
    /// Matches by correlation id when the envelope carries one, otherwise
    /// falls back to the most recent pending request for its chat id.
    /// Replies nobody is waiting for are dropped; returns whether a waiting
    /// request received this envelope.
    pub fn deliver(&self, envelope: OutboundEnvelope) -> bool {
        match envelope.metadata.correlation_id.clone() {
            Some(id) => self.broker.fulfill(&id, envelope),
            None => {
                let chat_id = envelope.chat_id.clone();
                self.broker.fulfill_by_session(&chat_id, envelope)
            }
        }
    }
}
