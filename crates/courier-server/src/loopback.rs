//! Built-in echo agent for running the server without a real backend.
//!
//! Consumes inbound envelopes and answers each one on the outbound queue,
//! echoing the content back with the request's metadata intact. The reset
//! command gets a fixed acknowledgement instead of an echo.

use courier_types::{InboundEnvelope, OutboundEnvelope};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Acknowledgement sent in reply to the reset command.
pub const RESET_ACK: &str = "New session started.";

/// Spawns the echo agent. Ends when either queue closes.
pub fn spawn(
    mut inbound: mpsc::UnboundedReceiver<InboundEnvelope>,
    outbound: mpsc::UnboundedSender<OutboundEnvelope>,
    reset_command: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = inbound.recv().await {
            let content = if envelope.content.trim() == reset_command {
                RESET_ACK.to_string()
            } else {
                envelope.content
            };
            let reply = OutboundEnvelope {
                channel: envelope.channel,
                chat_id: envelope.chat_id,
                content,
                metadata: envelope.metadata,
            };
            if outbound.send(reply).is_err() {
                break;
            }
        }
        tracing::info!("loopback agent stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_types::{CorrelationId, Identity};

    #[tokio::test]
    async fn echoes_with_metadata() {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        spawn(in_rx, out_tx, "/new".to_string());

        let id = CorrelationId::generate();
        in_tx
            .send(Identity::anonymous().envelope("ping", id.clone()))
            .unwrap();
        let reply = out_rx.recv().await.unwrap();
        assert_eq!(reply.content, "ping");
        assert_eq!(reply.metadata.correlation_id, Some(id));
    }

    #[tokio::test]
    async fn acknowledges_reset() {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        spawn(in_rx, out_tx, "/new".to_string());

        in_tx
            .send(Identity::anonymous().envelope("/new", CorrelationId::generate()))
            .unwrap();
        assert_eq!(out_rx.recv().await.unwrap().content, RESET_ACK);
    }
}
