//! # Incremental Change Feed
//! Per-connection server loop that turns "records newer than a cursor" polls
//! into a push stream of frames.
//!
//! Each subscriber owns one [`FeedSession`]: its checkpoint plus the poll and
//! heartbeat cadence. The session is consumed into a single stream whose drop
//! (the transport-close signal) cancels both timers at once; there is no
//! other cleanup path, so nothing can leak per dropped connection.

use std::time::Duration;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use metrics::counter;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::model::Crisis;
use crate::store::{CrisisStore as _, SharedStore};

#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    /// How often each connection polls the store for new records.
    pub poll_interval: Duration,
    /// How often a raw comment frame is pushed, independent of poll results.
    pub heartbeat_interval: Duration,
    /// Bootstrap window: on subscribe the checkpoint starts this far in the
    /// past so very-recent-but-pre-connection records are not missed.
    pub lookback: Duration,
    /// Upper bound on records delivered per poll tick.
    pub batch_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(20),
            lookback: Duration::from_secs(60),
            batch_limit: 100,
        }
    }
}

/// Ingestion-time cursor for one connection. The `id` component breaks ties
/// between records sharing a `created_at`, so none are silently skipped.
///
/// Strictly non-decreasing within a connection lifetime; only a reconnect
/// (a fresh session) re-initializes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub at: DateTime<Utc>,
    pub id: String,
}

impl Checkpoint {
    /// Initial cursor: `now - lookback`, before any id.
    pub fn lookback_from(now: DateTime<Utc>, lookback: Duration) -> Self {
        let lookback = chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::zero());
        Self {
            at: now - lookback,
            id: String::new(),
        }
    }

    /// Whether `crisis` sits strictly past this cursor.
    pub fn admits(&self, crisis: &Crisis) -> bool {
        (crisis.created_at, crisis.id.as_str()) > (self.at, self.id.as_str())
    }

    /// Advance to `crisis` if it is ahead of the cursor; never moves backward.
    pub fn advance_to(&mut self, crisis: &Crisis) {
        if self.admits(crisis) {
            self.at = crisis.created_at;
            self.id = crisis.id.clone();
        }
    }
}

/// One frame on the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    /// New records, ordered oldest to newest.
    Update(Vec<Crisis>),
    /// Poll tick found nothing new; keeps intermediaries from idling out.
    Ping,
    /// Raw keep-alive comment, on its own cadence.
    Heartbeat,
}

/// State owned by a single stream connection.
pub struct FeedSession {
    store: SharedStore,
    cfg: FeedConfig,
    checkpoint: Checkpoint,
}

impl FeedSession {
    pub fn new(store: SharedStore, cfg: FeedConfig, now: DateTime<Utc>) -> Self {
        let checkpoint = Checkpoint::lookback_from(now, cfg.lookback);
        Self {
            store,
            cfg,
            checkpoint,
        }
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// One poll tick: fetch records past the checkpoint, advance it to the
    /// last row delivered. Store errors are swallowed (logged and counted)
    /// and surface as a `Ping`; the loop retries on the next tick.
    pub async fn poll_once(&mut self) -> FeedFrame {
        counter!("feed_ticks_total").increment(1);
        match self
            .store
            .created_after(&self.checkpoint, self.cfg.batch_limit)
            .await
        {
            Ok(batch) if !batch.is_empty() => {
                if let Some(last) = batch.last() {
                    self.checkpoint.advance_to(last);
                }
                counter!("feed_updates_total").increment(1);
                counter!("feed_records_total").increment(batch.len() as u64);
                debug!(records = batch.len(), "feed update batch");
                FeedFrame::Update(batch)
            }
            Ok(_) => FeedFrame::Ping,
            Err(e) => {
                warn!(error = ?e, "feed poll failed; retrying next tick");
                counter!("feed_query_errors_total").increment(1);
                FeedFrame::Ping
            }
        }
    }

    /// Consume the session into its long-lived frame stream. Dropping the
    /// stream drops the session and both intervals with it.
    pub fn into_stream(mut self) -> impl Stream<Item = FeedFrame> + Send {
        stream! {
            let mut poll = tokio::time::interval(self.cfg.poll_interval);
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut heartbeat = tokio::time::interval(self.cfg.heartbeat_interval);
            heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Both intervals complete their first tick immediately; consume
            // them so the cadence starts one period out.
            poll.tick().await;
            heartbeat.tick().await;

            loop {
                let frame = tokio::select! {
                    _ = poll.tick() => self.poll_once().await,
                    _ = heartbeat.tick() => FeedFrame::Heartbeat,
                };
                yield frame;
            }
        }
    }
}
