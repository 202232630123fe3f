// tests/buffer_cap.rs
//
// Viewer buffer invariants: bounded at the cap, newest first, no id-level
// dedup at this layer.

use chrono::{Duration, TimeZone, Utc};

use crisis_monitor::model::Crisis;
use crisis_monitor::viewer::buffer::{CrisisBuffer, MAX_BUFFER};

fn crisis(id: &str, seq: i64) -> Crisis {
    let t = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(seq);
    Crisis {
        id: id.into(),
        title: "t".into(),
        description: String::new(),
        source: "s".into(),
        link: String::new(),
        pub_date: t,
        created_at: t,
        country: None,
        lat: None,
        lng: None,
    }
}

#[test]
fn ten_batches_of_200_leave_the_1500_most_recent() {
    let buffer = CrisisBuffer::new();

    // Batches arrive in chronological order, each ordered oldest -> newest
    // as the feed emits them.
    for batch_no in 0..10i64 {
        let batch: Vec<Crisis> = (0..200i64)
            .map(|i| crisis(&format!("b{batch_no}-{i}"), batch_no * 200 + i))
            .collect();
        buffer.merge_batch(batch);
    }

    let items = buffer.contents();
    assert_eq!(items.len(), MAX_BUFFER);

    // Newest overall at the front, oldest survivor (overall #500 of 2000)
    // at the tail.
    assert_eq!(items.first().map(|c| c.id.as_str()), Some("b9-199"));
    assert_eq!(items.last().map(|c| c.id.as_str()), Some("b2-100"));

    // Strictly newest-first throughout.
    for pair in items.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[test]
fn merge_prepends_batch_newest_first() {
    let buffer = CrisisBuffer::with_cap(10);
    buffer.merge_batch(vec![crisis("old", 0), crisis("mid", 1)]);
    buffer.merge_batch(vec![crisis("newer", 2), crisis("newest", 3)]);

    let ids: Vec<String> = buffer.contents().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["newest", "newer", "mid", "old"]);
}

#[test]
fn duplicate_ids_are_kept_at_this_layer() {
    // The feed is at-least-once; the spatial deduplicator absorbs repeats.
    let buffer = CrisisBuffer::with_cap(10);
    buffer.merge_batch(vec![crisis("dup", 0)]);
    buffer.merge_batch(vec![crisis("dup", 0)]);
    assert_eq!(buffer.len(), 2);
}

#[test]
fn seed_replaces_contents_and_truncates() {
    let buffer = CrisisBuffer::with_cap(3);
    buffer.merge_batch(vec![crisis("stale", 0)]);

    // Snapshot arrives newest-first from /crises.
    let snapshot = vec![crisis("s3", 3), crisis("s2", 2), crisis("s1", 1), crisis("s0", 0)];
    let len = buffer.seed(snapshot);
    assert_eq!(len, 3);

    let ids: Vec<String> = buffer.contents().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["s3", "s2", "s1"]);
}
