//! # Spatial Deduplication
//! Collapses geographically-overlapping incidents into one representative
//! marker per proximity group, chosen by severity then recency.
//!
//! Pure and total: classification is recomputed from the text on every call,
//! and the output partitions the located input exactly (every incident is
//! either a primary or hidden behind one).

use crate::model::{ClusterRepresentative, Crisis};
use crate::severity::Severity;

/// Degree-space grouping distance, roughly 25 km at the equator. Euclidean
/// in lat/lng, not geodesically corrected; markers within this distance read
/// as one event at map scale.
pub const PROXIMITY_THRESHOLD: f64 = 0.225;

struct Candidate<'a> {
    crisis: &'a Crisis,
    lat: f64,
    lng: f64,
    rank: u8,
}

fn within_threshold(a: &Candidate<'_>, b: &Candidate<'_>) -> bool {
    // Compared squared so a pair exactly at the threshold lands inside it.
    let d_lat = a.lat - b.lat;
    let d_lng = a.lng - b.lng;
    d_lat * d_lat + d_lng * d_lng <= PROXIMITY_THRESHOLD * PROXIMITY_THRESHOLD
}

/// Group the located incidents in `crises` by proximity. Incidents without a
/// usable location are dropped from the output entirely (they never reach the
/// map). Output order is highest-priority group first, independent of input
/// order.
///
/// Quadratic in the number of located incidents; fine at the buffer cap this
/// service runs with. A grid bucket or k-d tree slots in behind this same
/// signature if that ever stops being true.
pub fn dedupe(crises: &[Crisis]) -> Vec<ClusterRepresentative> {
    let mut candidates: Vec<Candidate<'_>> = crises
        .iter()
        .filter_map(|c| {
            c.location().map(|(lat, lng)| Candidate {
                crisis: c,
                lat,
                lng,
                rank: Severity::classify(&c.title, &c.description).rank(),
            })
        })
        .collect();

    // Severity desc, then newest first; id as the final tie-break so equal
    // inputs always produce the same primaries.
    candidates.sort_by(|a, b| {
        b.rank
            .cmp(&a.rank)
            .then_with(|| b.crisis.pub_date.cmp(&a.crisis.pub_date))
            .then_with(|| a.crisis.id.cmp(&b.crisis.id))
    });

    let mut processed = vec![false; candidates.len()];
    let mut out = Vec::new();

    for i in 0..candidates.len() {
        if processed[i] {
            continue;
        }

        let mut members = Vec::new();
        for j in i..candidates.len() {
            if !processed[j] && within_threshold(&candidates[i], &candidates[j]) {
                members.push(j);
            }
        }

        let hidden: Vec<Crisis> = members
            .iter()
            .skip(1)
            .map(|&j| candidates[j].crisis.clone())
            .collect();
        out.push(ClusterRepresentative {
            primary: candidates[i].crisis.clone(),
            grouped_count: (members.len() > 1).then_some(members.len()),
            hidden,
        });

        for j in members {
            processed[j] = true;
        }
    }

    out
}
