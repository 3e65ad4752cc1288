//! Message bus seam between the HTTP surface and the agent runtime.
//!
//! The surface only ever publishes inbound envelopes; replies come back
//! through [`HttpChannel::deliver`], driven either by the embedding runtime
//! directly or by [`spawn_outbound_dispatcher`] draining an outbound queue.

use crate::channel::HttpChannel;
use courier_types::{InboundEnvelope, OutboundEnvelope, HTTP_CHANNEL};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors raised when handing an envelope to the bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The consuming side of the bus has shut down.
    #[error("message bus closed")]
    Closed,
}

/// Publish side of the agent's message bus.
///
/// `publish` must not block: it is called on the request path right before
/// the request starts waiting for its reply.
pub trait MessageBus: Send + Sync {
    fn publish(&self, envelope: InboundEnvelope) -> Result<(), BusError>;
}

/// In-process bus backed by an unbounded queue.
#[derive(Clone, Debug)]
pub struct QueueBus {
    tx: mpsc::UnboundedSender<InboundEnvelope>,
}

impl QueueBus {
    /// Creates the bus and the receiver the agent runtime consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InboundEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageBus for QueueBus {
    fn publish(&self, envelope: InboundEnvelope) -> Result<(), BusError> {
        self.tx.send(envelope).map_err(|_| BusError::Closed)
    }
}

/// Drains `rx`, delivering every envelope addressed to the HTTP channel.
///
/// Envelopes for other channels are dropped; the task ends when every
/// sender of the outbound queue is gone.
pub fn spawn_outbound_dispatcher(
    mut rx: mpsc::UnboundedReceiver<OutboundEnvelope>,
    channel: Arc<HttpChannel>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            if envelope.channel != HTTP_CHANNEL {
                tracing::debug!(
                    channel = %envelope.channel,
                    chat_id = %envelope.chat_id,
                    "outbound envelope for another channel, skipping"
                );
                continue;
            }
            channel.deliver(envelope);
        }
        tracing::info!("outbound queue closed, dispatcher stopping");
    })
}
