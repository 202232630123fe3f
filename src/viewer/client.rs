//! # Reconnecting Stream Client
//! Subscribes to the server's `/events` push stream and keeps the
//! subscription alive across failures with capped exponential backoff.
//!
//! The connection lifecycle is an explicit state machine driven by three
//! inputs (`opened`, `errored`, `torn_down`), so every transition is testable
//! without a transport. `run_stream_client` is the reqwest-backed driver that
//! feeds it real network events.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use metrics::{counter, gauge};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::model::Crisis;
use crate::viewer::buffer::CrisisBuffer;
use crate::viewer::sse::FrameDecoder;

/// Retry counter clamp: delays top out at `1s * 2^6 = 64s` no matter how
/// many consecutive failures accumulate.
pub const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Delay before reconnect attempt `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * 2u64.pow(attempt.min(MAX_BACKOFF_EXPONENT)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Open,
    /// Backoff delay running before the next connection attempt.
    WaitingRetry { attempt: u32 },
}

/// Connection lifecycle state machine. At most one of
/// {connecting, open, waiting-retry} holds at any instant; teardown is
/// terminal and idempotent from every state.
#[derive(Debug)]
pub struct ReconnectingClient {
    state: ClientState,
    attempt: u32,
    closed: bool,
}

impl Default for ReconnectingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectingClient {
    pub fn new() -> Self {
        Self {
            state: ClientState::Disconnected,
            attempt: 0,
            closed: false,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Move toward a connection attempt. Returns `false` once torn down.
    pub fn begin_connect(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.state = ClientState::Connecting;
        true
    }

    /// Subscription opened: the retry counter resets so the next failure
    /// starts the backoff ladder from the bottom again.
    pub fn on_opened(&mut self) {
        if self.closed {
            return;
        }
        self.attempt = 0;
        self.state = ClientState::Open;
    }

    /// Transport failure or server close. Returns the delay to wait before
    /// the next attempt, or `None` once torn down.
    pub fn on_errored(&mut self) -> Option<Duration> {
        if self.closed {
            return None;
        }
        self.attempt = (self.attempt + 1).min(MAX_BACKOFF_EXPONENT);
        self.state = ClientState::WaitingRetry {
            attempt: self.attempt,
        };
        Some(backoff_delay(self.attempt))
    }

    /// Explicit teardown. Terminal from any state; calling it again is a
    /// no-op.
    pub fn on_torn_down(&mut self) {
        self.closed = true;
        self.state = ClientState::Disconnected;
    }
}

/// Drive the state machine against a live `/events` endpoint until the
/// shutdown flag flips. Update batches land in `buffer`; malformed payloads
/// are dropped with a warning and the subscription stays open.
pub async fn run_stream_client(
    api_base: String,
    fsm: Arc<Mutex<ReconnectingClient>>,
    buffer: Arc<CrisisBuffer>,
    mut shutdown: watch::Receiver<bool>,
) {
    let http = reqwest::Client::new();
    let url = format!("{}/events", api_base.trim_end_matches('/'));

    loop {
        if *shutdown.borrow() {
            break;
        }
        if !fsm.lock().expect("client mutex poisoned").begin_connect() {
            break;
        }

        let resp = tokio::select! {
            _ = shutdown.changed() => break,
            r = http.get(&url).send() => r,
        };

        match resp.and_then(|r| r.error_for_status()) {
            Ok(resp) => {
                fsm.lock().expect("client mutex poisoned").on_opened();
                info!(url = %url, "event stream open");
                consume_stream(resp, &buffer, &mut shutdown).await;
                if *shutdown.borrow() {
                    break;
                }
                // fall through to the error path: the stream ended
            }
            Err(e) => {
                warn!(error = ?e, "event stream connect failed");
            }
        }

        let delay = {
            let mut guard = fsm.lock().expect("client mutex poisoned");
            match guard.on_errored() {
                Some(d) => d,
                None => break,
            }
        };
        counter!("stream_reconnects_total").increment(1);
        debug!(delay_ms = delay.as_millis() as u64, "reconnect backoff");

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    fsm.lock().expect("client mutex poisoned").on_torn_down();
}

/// Pump the open response body into the frame decoder until the transport
/// errors, the server closes, or shutdown is requested.
async fn consume_stream(
    resp: reqwest::Response,
    buffer: &CrisisBuffer,
    shutdown: &mut watch::Receiver<bool>,
) {
    let mut body = resp.bytes_stream();
    let mut decoder = FrameDecoder::new();

    loop {
        let chunk = tokio::select! {
            _ = shutdown.changed() => return,
            c = body.next() => c,
        };
        match chunk {
            Some(Ok(bytes)) => {
                for frame in decoder.feed(&bytes) {
                    handle_frame(&frame.event, &frame.data, buffer);
                }
            }
            Some(Err(e)) => {
                warn!(error = ?e, "event stream transport error");
                return;
            }
            None => {
                info!("event stream closed by server");
                return;
            }
        }
    }
}

fn handle_frame(event: &str, data: &str, buffer: &CrisisBuffer) {
    match event {
        "update" => match serde_json::from_str::<Vec<Crisis>>(data) {
            Ok(batch) if !batch.is_empty() => {
                let len = buffer.merge_batch(batch);
                gauge!("viewer_buffer_size").set(len as f64);
            }
            Ok(_) => {}
            Err(e) => {
                // A corrupt batch must not kill the subscription.
                warn!(error = ?e, "dropping malformed update payload");
                counter!("stream_dropped_payloads_total").increment(1);
            }
        },
        "ping" => {}
        other => debug!(event = other, "ignoring unknown event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_ladder_doubles_then_clamps() {
        let expected_ms = [2000, 4000, 8000, 16000, 32000, 64000];
        let mut fsm = ReconnectingClient::new();
        fsm.begin_connect();
        fsm.on_opened();
        for (i, ms) in expected_ms.iter().enumerate() {
            let d = fsm.on_errored().expect("not torn down");
            assert_eq!(d, Duration::from_millis(*ms), "attempt {}", i + 1);
        }
        // 7th consecutive failure stays at the clamp.
        assert_eq!(fsm.on_errored(), Some(Duration::from_millis(64000)));
        assert_eq!(fsm.attempt(), MAX_BACKOFF_EXPONENT);
    }

    #[test]
    fn open_resets_the_retry_counter() {
        let mut fsm = ReconnectingClient::new();
        fsm.begin_connect();
        fsm.on_errored();
        fsm.on_errored();
        assert_eq!(fsm.attempt(), 2);

        fsm.begin_connect();
        fsm.on_opened();
        assert_eq!(fsm.attempt(), 0);
        assert_eq!(fsm.state(), ClientState::Open);
        // Next failure starts over at 2s.
        assert_eq!(fsm.on_errored(), Some(Duration::from_millis(2000)));
    }

    #[test]
    fn error_while_open_moves_to_waiting_retry() {
        let mut fsm = ReconnectingClient::new();
        fsm.begin_connect();
        fsm.on_opened();
        let d = fsm.on_errored().expect("delay");
        assert_eq!(fsm.state(), ClientState::WaitingRetry { attempt: 1 });
        assert_eq!(d, Duration::from_millis(2000));
    }

    #[test]
    fn teardown_is_terminal_and_idempotent() {
        let mut fsm = ReconnectingClient::new();
        fsm.begin_connect();
        fsm.on_opened();
        fsm.on_torn_down();
        fsm.on_torn_down();
        assert_eq!(fsm.state(), ClientState::Disconnected);
        assert!(!fsm.begin_connect());
        assert_eq!(fsm.on_errored(), None);
        fsm.on_opened();
        assert_eq!(fsm.state(), ClientState::Disconnected);
    }
}
