// tests/reconnect.rs
//
// The reqwest-backed stream driver against an unreachable endpoint: it must
// land in the backoff state rather than erroring out, and teardown must stop
// it mid-backoff with no further attempts.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crisis_monitor::viewer::buffer::CrisisBuffer;
use crisis_monitor::viewer::client::{run_stream_client, ClientState, ReconnectingClient};

#[tokio::test(flavor = "multi_thread")]
async fn failed_connect_enters_backoff_and_teardown_stops_it() {
    // Nothing listens here; connects fail fast.
    let api_base = "http://127.0.0.1:9".to_string();

    let fsm = Arc::new(Mutex::new(ReconnectingClient::new()));
    let buffer = Arc::new(CrisisBuffer::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(run_stream_client(
        api_base,
        fsm.clone(),
        buffer.clone(),
        shutdown_rx,
    ));

    // Wait for at least one failed attempt to put us into WaitingRetry.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let state = fsm.lock().expect("fsm lock").state();
        if let ClientState::WaitingRetry { attempt } = state {
            assert!(attempt >= 1);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "never reached WaitingRetry, state {state:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Teardown while the backoff timer is pending: the driver must exit
    // promptly instead of sleeping out the delay (first backoff is 2s).
    shutdown_tx.send(true).expect("send shutdown");
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("driver exits before the backoff elapses")
        .expect("driver task");

    let guard = fsm.lock().expect("fsm lock");
    assert!(guard.is_closed());
    assert_eq!(guard.state(), ClientState::Disconnected);
    assert!(buffer.is_empty(), "nothing was ever received");
}
