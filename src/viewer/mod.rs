//! # Viewer Engine
//! Client-side wiring: one-shot snapshot fetch, the reconnecting event
//! stream, and the periodic stats refresh. The three loops share nothing
//! mutable except the buffer (append-only merges, single writer each).

pub mod buffer;
pub mod client;
pub mod sse;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::Crisis;
use crate::severity::Severity;
use crate::store::Stats;
use crate::viewer::buffer::{CrisisBuffer, MAX_BUFFER};
use crate::viewer::client::{run_stream_client, ClientState, ReconnectingClient};

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub api_base: String,
    /// Size of the initial `/crises` snapshot; the buffer cap is the natural
    /// choice.
    pub snapshot_limit: usize,
    pub stats_refresh: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:3000".to_string(),
            snapshot_limit: MAX_BUFFER,
            stats_refresh: Duration::from_secs(30),
        }
    }
}

/// Severity tally over the current buffer, classified at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

pub fn severity_counts(crises: &[Crisis]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for c in crises {
        match Severity::classify(&c.title, &c.description) {
            Severity::Critical => counts.critical += 1,
            Severity::High => counts.high += 1,
            Severity::Medium => counts.medium += 1,
            Severity::Low => counts.low += 1,
        }
    }
    counts
}

/// A running viewer: owns the buffer, the latest stats, and the background
/// tasks feeding both. `teardown` stops everything from any state.
pub struct Viewer {
    pub buffer: Arc<CrisisBuffer>,
    pub stats: Arc<Mutex<Option<Stats>>>,
    fsm: Arc<Mutex<ReconnectingClient>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Viewer {
    /// Spawn the snapshot + stream task and the stats refresh task.
    pub fn spawn(cfg: ViewerConfig) -> Self {
        let buffer = Arc::new(CrisisBuffer::new());
        let stats: Arc<Mutex<Option<Stats>>> = Arc::new(Mutex::new(None));
        let fsm = Arc::new(Mutex::new(ReconnectingClient::new()));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let stream_task = tokio::spawn(run_snapshot_then_stream(
            cfg.clone(),
            buffer.clone(),
            fsm.clone(),
            shutdown_rx.clone(),
        ));
        let stats_task = tokio::spawn(run_stats_refresh(
            cfg.api_base.clone(),
            cfg.stats_refresh,
            stats.clone(),
            shutdown_rx,
        ));

        Self {
            buffer,
            stats,
            fsm,
            shutdown,
            tasks: vec![stream_task, stats_task],
        }
    }

    pub fn client_state(&self) -> ClientState {
        self.fsm.lock().expect("client mutex poisoned").state()
    }

    pub fn latest_stats(&self) -> Option<Stats> {
        self.stats.lock().expect("stats mutex poisoned").clone()
    }

    /// Cancel the stream (or its pending reconnect timer) and the stats
    /// loop. Idempotent; safe from any state.
    pub fn teardown(&mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.fsm
            .lock()
            .expect("client mutex poisoned")
            .on_torn_down();
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run_snapshot_then_stream(
    cfg: ViewerConfig,
    buffer: Arc<CrisisBuffer>,
    fsm: Arc<Mutex<ReconnectingClient>>,
    shutdown: watch::Receiver<bool>,
) {
    let http = reqwest::Client::new();
    match fetch_snapshot(&http, &cfg.api_base, cfg.snapshot_limit).await {
        Ok(items) => {
            let len = buffer.seed(items);
            debug!(len, "seeded buffer from snapshot");
        }
        // Not fatal: the stream fills the buffer as updates arrive.
        Err(e) => warn!(error = ?e, "snapshot fetch failed"),
    }
    run_stream_client(cfg.api_base, fsm, buffer, shutdown).await;
}

async fn run_stats_refresh(
    api_base: String,
    every: Duration,
    stats: Arc<Mutex<Option<Stats>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let http = reqwest::Client::new();
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = ticker.tick() => {}
        }
        match fetch_stats(&http, &api_base).await {
            Ok(s) => *stats.lock().expect("stats mutex poisoned") = Some(s),
            Err(e) => debug!(error = ?e, "stats refresh failed"),
        }
    }
}

pub async fn fetch_snapshot(
    http: &reqwest::Client,
    api_base: &str,
    limit: usize,
) -> Result<Vec<Crisis>> {
    let url = format!("{}/crises?limit={}", api_base.trim_end_matches('/'), limit);
    let resp = http.get(&url).send().await.context("fetch /crises")?;
    resp.error_for_status()
        .context("snapshot status")?
        .json::<Vec<Crisis>>()
        .await
        .context("parse snapshot json")
}

pub async fn fetch_stats(http: &reqwest::Client, api_base: &str) -> Result<Stats> {
    let url = format!("{}/stats", api_base.trim_end_matches('/'));
    let resp = http.get(&url).send().await.context("fetch /stats")?;
    resp.error_for_status()
        .context("stats status")?
        .json::<Stats>()
        .await
        .context("parse stats json")
}
