//! Headless map viewer. Subscribes to a running crisis-monitor API, keeps
//! the incident buffer live over the event stream, and prints the
//! deduplicated marker set whenever it changes.
//!
//! Usage: `API_BASE=http://127.0.0.1:3000 cargo run --bin viewer_demo`

use std::time::Duration;

use crisis_monitor::dedupe::dedupe;
use crisis_monitor::severity::Severity;
use crisis_monitor::viewer::{severity_counts, Viewer, ViewerConfig};
use crisis_monitor::viewport::ViewportFitter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crisis_monitor=info")),
        )
        .compact()
        .init();

    let api_base =
        std::env::var("API_BASE").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let mut viewer = Viewer::spawn(ViewerConfig {
        api_base,
        ..Default::default()
    });
    let mut fitter = ViewportFitter::new();

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {}
        }

        let items = viewer.buffer.contents();
        let counts = severity_counts(&items);
        let markers = dedupe(&items);

        println!(
            "-- {} buffered ({} critical / {} high / {} medium / {} low), {} markers [{:?}]",
            items.len(),
            counts.critical,
            counts.high,
            counts.medium,
            counts.low,
            markers.len(),
            viewer.client_state(),
        );
        for m in &markers {
            let sev = Severity::classify(&m.primary.title, &m.primary.description);
            let loc = m.primary.location().unwrap_or((0.0, 0.0));
            match m.grouped_count {
                Some(n) => println!(
                    "   [{sev}] {} @ {:.3},{:.3} (+{} grouped)",
                    m.primary.title,
                    loc.0,
                    loc.1,
                    n - 1
                ),
                None => println!("   [{sev}] {} @ {:.3},{:.3}", m.primary.title, loc.0, loc.1),
            }
        }
        if let Some(region) = fitter.fit(&markers) {
            println!(
                "   fit -> [{:.3},{:.3}] .. [{:.3},{:.3}]",
                region.south, region.west, region.north, region.east
            );
        }
        if let Some(stats) = viewer.latest_stats() {
            println!("   server total: {}", stats.total);
        }
    }

    viewer.teardown();
    Ok(())
}
