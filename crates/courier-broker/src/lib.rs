//! Request/response correlation for the Courier HTTP surface.
//!
//! The conversational backend replies out-of-band over a bus that has no
//! notion of request identity. The [`Broker`] bridges that gap: each HTTP
//! request registers a one-shot [`Slot`] under a fresh correlation id, tags
//! its outbound envelope with that id, and awaits the slot. When the backend
//! emits a reply carrying the id, [`Broker::fulfill`] completes the slot.
//!
//! # Guarantees
//!
//! - A slot is fulfilled at most once. Later attempts return `false`.
//! - Unknown or expired ids are a silent no-op: a reply that lands after its
//!   request timed out is an expected race, not an error.
//! - Timeout, fulfillment and cancellation all mutate the registry under one
//!   lock, so a reply can never be lost between a timeout firing and the slot
//!   being removed.
//!
//! # Session fallback
//!
//! Replies without a correlation id can be matched by session key through
//! [`Broker::fulfill_by_session`]. The session index is last-registered-wins:
//! registering a second slot for the same session repoints the index, and the
//! earlier slot stays reachable by its correlation id only.

pub mod error;
pub mod registry;

pub use error::BrokerError;
pub use registry::{Broker, Slot};
