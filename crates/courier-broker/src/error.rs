//! Error types for the correlation broker.

use std::time::Duration;

/// Reasons an await on a pending slot can end without a value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BrokerError {
    /// No reply arrived within the bound. The slot has been deregistered.
    #[error("no reply within {}s", .waited.as_secs())]
    TimedOut { waited: Duration },

    /// The slot was dropped from the registry without being fulfilled.
    #[error("pending slot was abandoned before a reply arrived")]
    Abandoned,
}
