//! Trip notification seam.
//!
//! The governor reports trips through this trait; delivery (Discord,
//! Telegram, pager) lives with whoever implements it. Implementations run on
//! a detached task and their errors are swallowed at the dispatch boundary,
//! never surfaced to trading code.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

/// Receives the human-readable reason each time the governor trips.
#[async_trait]
pub trait TripNotifier: Send + Sync {
    async fn notify_trip(&self, reason: &str) -> Result<()>;
}

/// Default notifier that only writes the trip to the log stream.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl TripNotifier for LogNotifier {
    async fn notify_trip(&self, reason: &str) -> Result<()> {
        warn!(reason = %reason, "Circuit breaker trip notification");
        Ok(())
    }
}
