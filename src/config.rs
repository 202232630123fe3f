// src/config.rs
// Env-driven service configuration. `.env` is loaded by main in local runs;
// every knob has a production default.

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::feed::FeedConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `*` (the default) allows any origin, like the public map deployment.
    pub cors_origin: String,
    pub feed: FeedConfig,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 3000),
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            feed: FeedConfig {
                poll_interval: Duration::from_secs(env_parse("FEED_POLL_SECS", 5)),
                heartbeat_interval: Duration::from_secs(env_parse("FEED_HEARTBEAT_SECS", 20)),
                lookback: Duration::from_secs(env_parse("FEED_LOOKBACK_SECS", 60)),
                batch_limit: env_parse("FEED_BATCH_LIMIT", 100),
            },
            sweep_interval: Duration::from_secs(env_parse("CLEANUP_INTERVAL_SECS", 6 * 3600)),
        }
    }

    pub fn cors_layer(&self) -> CorsLayer {
        if self.cors_origin == "*" {
            return CorsLayer::very_permissive();
        }
        match self.cors_origin.parse::<HeaderValue>() {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                warn!(origin = %self.cors_origin, "invalid CORS_ORIGIN, allowing any");
                CorsLayer::very_permissive()
            }
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_on_missing_or_garbage() {
        std::env::remove_var("CM_TEST_MISSING");
        assert_eq!(env_parse("CM_TEST_MISSING", 42u64), 42);

        std::env::set_var("CM_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_parse("CM_TEST_GARBAGE", 7u16), 7);
        std::env::remove_var("CM_TEST_GARBAGE");
    }
}
