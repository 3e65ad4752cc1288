//! Background tasks for the Courier server.
//!
//! Includes:
//! - Sweeping pending requests that outlived every configured timeout.

use crate::channel::HttpChannel;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Starts the pending-request sweeper.
///
/// Every request already deregisters its own slot on timeout, so this only
/// catches slots whose owning task was lost without being dropped. Anything
/// older than twice `max_timeout` is removed.
pub async fn start_sweeper_task(
    channel: Arc<HttpChannel>,
    interval_seconds: u64,
    max_timeout: Duration,
) {
    if interval_seconds == 0 {
        tracing::debug!("pending request sweeper disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    let max_age = max_timeout * 2;
    tracing::info!(
        interval_seconds,
        max_age_seconds = max_age.as_secs(),
        "starting pending request sweeper"
    );

    loop {
        sleep(interval).await;

        let swept = channel.broker().sweep_older_than(max_age);
        if swept > 0 {
            tracing::warn!(count = swept, "swept stale pending requests");
        }
    }
}
