//! # Viewport Fitter
//! Derives the map region covering the current marker set, debounced on the
//! identity of the displayed primaries so an unchanged set never re-fits.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::ClusterRepresentative;

/// Padding applied around the fitted bounds, as a fraction of each span.
const PAD_RATIO: f64 = 0.1;

/// Axis-aligned lat/lng box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingRegion {
    fn padded(self, ratio: f64) -> Self {
        let lat_pad = (self.north - self.south) * ratio;
        let lng_pad = (self.east - self.west) * ratio;
        Self {
            south: self.south - lat_pad,
            west: self.west - lng_pad,
            north: self.north + lat_pad,
            east: self.east + lng_pad,
        }
    }
}

/// Stateful fitter: remembers the primary-id set of the last fit and goes
/// quiet while it is unchanged, so re-renders of the same markers do not
/// yank the map around.
#[derive(Debug, Default)]
pub struct ViewportFitter {
    last_ids: BTreeSet<String>,
}

impl ViewportFitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Region covering every located primary, padded, or `None` when there
    /// is nothing to fit or the displayed set is identical to last time.
    /// Set comparison is order-independent.
    pub fn fit(&mut self, reps: &[ClusterRepresentative]) -> Option<BoundingRegion> {
        let coords: Vec<(f64, f64)> = reps
            .iter()
            .filter_map(|r| r.primary.location())
            .collect();
        if coords.is_empty() {
            return None;
        }

        let ids: BTreeSet<String> = reps.iter().map(|r| r.primary.id.clone()).collect();
        if ids == self.last_ids {
            return None;
        }
        self.last_ids = ids;

        let mut region = BoundingRegion {
            south: f64::INFINITY,
            west: f64::INFINITY,
            north: f64::NEG_INFINITY,
            east: f64::NEG_INFINITY,
        };
        for (lat, lng) in coords {
            region.south = region.south.min(lat);
            region.north = region.north.max(lat);
            region.west = region.west.min(lng);
            region.east = region.east.max(lng);
        }
        Some(region.padded(PAD_RATIO))
    }
}
