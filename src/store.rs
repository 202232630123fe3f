//! # Backing Store
//! The read/write seam the server core depends on. The change feed only ever
//! needs "records ingested after a cursor, ascending, limited"; everything
//! else here serves the snapshot, stats, and retention endpoints.
//!
//! `MemoryStore` is the in-process implementation; a database-backed store
//! drops in behind the same trait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::Checkpoint;
use crate::model::Crisis;

/// Store handle shared by all connections. Read paths run concurrently; the
/// driver provides whatever locking it needs.
pub type SharedStore = Arc<dyn CrisisStore>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryCount {
    #[serde(rename = "_id")]
    pub country: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total: u64,
    #[serde(rename = "topCountries")]
    pub top_countries: Vec<CountryCount>,
}

#[async_trait]
pub trait CrisisStore: Send + Sync {
    /// Insert a batch of incidents. Returns how many were stored.
    async fn insert_batch(&self, batch: Vec<Crisis>) -> Result<usize>;

    /// Most recent incidents by `pub_date` (newest first), optionally
    /// restricted to records ingested at or after `since`.
    async fn snapshot(&self, since: Option<DateTime<Utc>>, limit: usize) -> Result<Vec<Crisis>>;

    /// Incidents ingested strictly after the checkpoint, ordered ascending by
    /// `(created_at, id)` and capped at `limit`. The id tie-break guarantees
    /// records sharing a `created_at` are never skipped between polls.
    async fn created_after(&self, checkpoint: &Checkpoint, limit: usize) -> Result<Vec<Crisis>>;

    /// Total count plus the top `top_n` countries by incident count.
    async fn stats(&self, top_n: usize) -> Result<Stats>;

    /// Delete incidents whose `created_at` or `pub_date` is older than
    /// `cutoff`. Returns the number deleted.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Count incidents that `purge_older_than(cutoff)` would delete.
    async fn count_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn total(&self) -> Result<u64>;
}

/// Bounded in-memory store. Inserts append; reads sort on demand, which is
/// fine at the retention-limited scale this service runs at.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Vec<Crisis>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for wiring: a ready-to-share handle.
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

fn is_expired(c: &Crisis, cutoff: DateTime<Utc>) -> bool {
    c.created_at < cutoff || c.pub_date < cutoff
}

#[async_trait]
impl CrisisStore for MemoryStore {
    async fn insert_batch(&self, batch: Vec<Crisis>) -> Result<usize> {
        let n = batch.len();
        let mut rows = self.inner.lock().expect("store mutex poisoned");
        rows.extend(batch);
        Ok(n)
    }

    async fn snapshot(&self, since: Option<DateTime<Utc>>, limit: usize) -> Result<Vec<Crisis>> {
        let rows = self.inner.lock().expect("store mutex poisoned");
        let mut out: Vec<Crisis> = rows
            .iter()
            .filter(|c| since.map_or(true, |s| c.created_at >= s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        out.truncate(limit);
        Ok(out)
    }

    async fn created_after(&self, checkpoint: &Checkpoint, limit: usize) -> Result<Vec<Crisis>> {
        let rows = self.inner.lock().expect("store mutex poisoned");
        let mut out: Vec<Crisis> = rows
            .iter()
            .filter(|c| checkpoint.admits(c))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        out.truncate(limit);
        Ok(out)
    }

    async fn stats(&self, top_n: usize) -> Result<Stats> {
        let rows = self.inner.lock().expect("store mutex poisoned");
        let mut by_country: HashMap<&str, u64> = HashMap::new();
        for c in rows.iter() {
            if let Some(country) = c.country.as_deref() {
                *by_country.entry(country).or_insert(0) += 1;
            }
        }
        let mut top: Vec<CountryCount> = by_country
            .into_iter()
            .map(|(country, count)| CountryCount {
                country: country.to_string(),
                count,
            })
            .collect();
        // Count desc, name asc for a stable listing.
        top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.country.cmp(&b.country)));
        top.truncate(top_n);
        Ok(Stats {
            total: rows.len() as u64,
            top_countries: top,
        })
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.inner.lock().expect("store mutex poisoned");
        let before = rows.len();
        rows.retain(|c| !is_expired(c, cutoff));
        Ok((before - rows.len()) as u64)
    }

    async fn count_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let rows = self.inner.lock().expect("store mutex poisoned");
        Ok(rows.iter().filter(|c| is_expired(c, cutoff)).count() as u64)
    }

    async fn total(&self) -> Result<u64> {
        let rows = self.inner.lock().expect("store mutex poisoned");
        Ok(rows.len() as u64)
    }
}
