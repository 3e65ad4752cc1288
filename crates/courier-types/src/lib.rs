//! Shared types and constants for the Courier workspace.
//!
//! This crate defines the envelopes exchanged with the conversational
//! backend, the opaque correlation id that ties an HTTP request to its
//! asynchronous reply, and the caller identity derived from request headers.
//!
//! Nothing in here performs I/O. The broker, upload pipeline and server
//! crates all depend on `courier-types` for the definitions they share.

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Channel name stamped on every envelope that originates from the HTTP surface.
pub const HTTP_CHANNEL: &str = "http";

/// Metadata key under which the correlation id travels across the bus.
pub const CORRELATION_KEY: &str = "_http_req";

/// Identity used when a request carries no usable `X-User-ID` header.
pub const ANONYMOUS_ID: &str = "anonymous";

/// Number of random bytes in a correlation id (128 bits).
const CORRELATION_ID_BYTES: usize = 16;

/// Opaque token linking one inbound request to its eventual reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Draws a fresh id from the thread-local CSPRNG, rendered as lowercase hex.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CORRELATION_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wraps an id received from the bus. No validation is performed; an id
    /// that was never issued simply fails to match any pending slot.
    pub fn from_wire(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata carried by envelopes in both directions.
///
/// The correlation id has a single reserved, typed slot; anything else the
/// backend attaches is preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    /// Serialized under [`CORRELATION_KEY`]. A value that is not a string
    /// reads as `None`, so the reply falls back to session routing.
    #[serde(
        rename = "_http_req",
        default,
        deserialize_with = "lenient_correlation_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_id: Option<CorrelationId>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn lenient_correlation_id<'de, D>(deserializer: D) -> Result<Option<CorrelationId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(raw) => Some(CorrelationId(raw)),
        _ => None,
    })
}

impl EnvelopeMetadata {
    pub fn correlated(id: CorrelationId) -> Self {
        Self {
            correlation_id: Some(id),
            extra: BTreeMap::new(),
        }
    }
}

/// Message travelling from a channel into the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub channel: String,
    pub sender_id: String,
    pub chat_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: EnvelopeMetadata,
}

/// Message travelling from the agent back out to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub channel: String,
    pub chat_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: EnvelopeMetadata,
}

/// Actor and session a request is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub sender_id: String,
    pub chat_id: String,
}

impl Identity {
    /// Resolves an identity from the raw `X-User-ID` header value.
    ///
    /// Total: a missing or blank value yields the anonymous identity. The
    /// session (chat) id is the sender id, so each user owns one conversation.
    pub fn from_header_value(value: Option<&str>) -> Self {
        let sender = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(ANONYMOUS_ID);
        Self {
            sender_id: sender.to_string(),
            chat_id: sender.to_string(),
        }
    }

    pub fn anonymous() -> Self {
        Self::from_header_value(None)
    }

    /// Builds the envelope this identity sends for `content`, tagged with `id`.
    pub fn envelope(&self, content: impl Into<String>, id: CorrelationId) -> InboundEnvelope {
        InboundEnvelope {
            channel: HTTP_CHANNEL.to_string(),
            sender_id: self.sender_id.clone(),
            chat_id: self.chat_id.clone(),
            content: content.into(),
            metadata: EnvelopeMetadata::correlated(id),
        }
    }
}
