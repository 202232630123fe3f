use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use metrics::counter;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::cleanup::retention_cutoff;
use crate::feed::{FeedConfig, FeedFrame, FeedSession};
use crate::model::Crisis;
use crate::store::{CrisisStore as _, SharedStore, Stats};

const DEFAULT_SNAPSHOT_LIMIT: usize = 500;
const MAX_SNAPSHOT_LIMIT: usize = 2000;
const STATS_TOP_COUNTRIES: usize = 20;

#[derive(Clone)]
pub struct AppState {
    store: SharedStore,
    feed: FeedConfig,
}

impl AppState {
    pub fn new(store: SharedStore, feed: FeedConfig) -> Self {
        Self { store, feed }
    }
}

pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/crises", get(list_crises).post(submit_crises))
        .route("/stats", get(stats))
        .route("/events", get(events))
        .route("/cleanup", delete(cleanup))
        .route("/cleanup/stats", get(cleanup_stats))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "ok": true }))
}

type ApiError = (StatusCode, Json<Value>);

fn internal_error(msg: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": msg })),
    )
}

#[derive(serde::Deserialize)]
struct SnapshotQuery {
    since: Option<String>,
    limit: Option<usize>,
}

async fn list_crises(
    State(state): State<AppState>,
    Query(q): Query<SnapshotQuery>,
) -> Result<Json<Vec<Crisis>>, ApiError> {
    // An unparseable `since` is ignored rather than rejected; the snapshot
    // contract is tolerant for the map UI.
    let since = q.since.as_deref().and_then(parse_since);
    let limit = q
        .limit
        .unwrap_or(DEFAULT_SNAPSHOT_LIMIT)
        .min(MAX_SNAPSHOT_LIMIT);
    state
        .store
        .snapshot(since, limit)
        .await
        .map(Json)
        .map_err(|_| internal_error("Failed to fetch crises"))
}

fn parse_since(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Incident as delivered by the ingestion side; `created_at` is stamped at
/// arrival when the feeder does not supply one.
#[derive(serde::Deserialize)]
struct IncomingCrisis {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate")]
    pub_date: DateTime<Utc>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
}

async fn submit_crises(
    State(state): State<AppState>,
    Json(items): Json<Vec<IncomingCrisis>>,
) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let batch: Vec<Crisis> = items
        .into_iter()
        .map(|it| Crisis {
            id: it.id,
            title: it.title,
            description: it.description,
            source: it.source,
            link: it.link,
            pub_date: it.pub_date,
            created_at: it.created_at.unwrap_or(now),
            country: it.country,
            lat: it.lat,
            lng: it.lng,
        })
        .collect();
    let inserted = state
        .store
        .insert_batch(batch)
        .await
        .map_err(|_| internal_error("Failed to store crises"))?;
    counter!("crises_ingested_total").increment(inserted as u64);
    Ok(Json(json!({ "inserted": inserted })))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    state
        .store
        .stats(STATS_TOP_COUNTRIES)
        .await
        .map(Json)
        .map_err(|_| internal_error("Failed to fetch stats"))
}

/// Long-lived push stream. Each subscriber gets its own `FeedSession`;
/// dropping the response body (client gone) drops the session and with it
/// both of its timers.
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    counter!("feed_sessions_total").increment(1);
    let session = FeedSession::new(state.store.clone(), state.feed, Utc::now());
    let stream = session.into_stream().map(|frame| Ok(sse_event(frame)));
    Sse::new(stream)
}

fn sse_event(frame: FeedFrame) -> Event {
    match frame {
        FeedFrame::Update(batch) => Event::default()
            .event("update")
            .data(serde_json::to_string(&batch).unwrap_or_else(|_| "[]".to_string())),
        FeedFrame::Ping => Event::default().event("ping").data("{}"),
        FeedFrame::Heartbeat => Event::default().comment(""),
    }
}

async fn cleanup(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let cutoff = retention_cutoff(Utc::now());
    let deleted = state
        .store
        .purge_older_than(cutoff)
        .await
        .map_err(|_| internal_error("Failed to cleanup old entries"))?;
    counter!("cleanup_deleted_total").increment(deleted);
    info!(deleted, cutoff = %cutoff, "cleaned up expired entries");
    Ok(Json(json!({
        "success": true,
        "deletedCount": deleted,
        "cutoffDate": cutoff.to_rfc3339(),
    })))
}

async fn cleanup_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let cutoff = retention_cutoff(Utc::now());
    let old = state
        .store
        .count_older_than(cutoff)
        .await
        .map_err(|_| internal_error("Failed to get cleanup stats"))?;
    let total = state
        .store
        .total()
        .await
        .map_err(|_| internal_error("Failed to get cleanup stats"))?;
    let percentage_old = if total > 0 {
        ((old as f64 / total as f64) * 100.0).round() as u64
    } else {
        0
    };
    Ok(Json(json!({
        "totalEntries": total,
        "oldEntries": old,
        "cutoffDate": cutoff.to_rfc3339(),
        "percentageOld": percentage_old,
    })))
}
