//! # Retention Sweeper
//! Background job deleting incidents past the retention window, keeping the
//! in-memory store bounded. The `/cleanup` endpoints run the same purge on
//! demand.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::store::{CrisisStore as _, SharedStore};

/// Entries older than this (by ingestion or event time) are purged.
pub const RETENTION_DAYS: i64 = 5;

/// Purge boundary for a sweep at `now`.
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - ChronoDuration::days(RETENTION_DAYS)
}

/// Spawn the periodic sweep. Errors are logged and the loop keeps running;
/// the handle aborts the loop when dropped by the caller's shutdown path.
pub fn spawn_retention_sweeper(store: SharedStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First interval tick completes immediately; the first sweep should
        // wait one full period.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let cutoff = retention_cutoff(Utc::now());
            match store.purge_older_than(cutoff).await {
                Ok(deleted) => {
                    counter!("cleanup_runs_total").increment(1);
                    counter!("cleanup_deleted_total").increment(deleted);
                    if deleted > 0 {
                        info!(deleted, cutoff = %cutoff, "retention sweep");
                    }
                }
                Err(e) => warn!(error = ?e, "retention sweep failed"),
            }
        }
    })
}
