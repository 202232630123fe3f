//! # Data Model
//! Wire-compatible incident records and the cluster representative shape
//! produced by spatial deduplication.
//!
//! Field names on the wire (`_id`, `pubDate`, `created_at`, `lat`, `lng`)
//! match what the ingestion side writes and what the map UI consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingested incident report. Immutable once stored; severity is derived
/// from the text at read time and is intentionally absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crisis {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub link: String,
    #[serde(rename = "pubDate")]
    pub pub_date: DateTime<Utc>,
    /// Ingestion timestamp; the change-feed cursor runs on this field.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl Crisis {
    /// Map-displayable coordinates. `(0, 0)` is the "no geocode" sentinel
    /// some feeds emit and is treated the same as a missing location.
    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if !(lat == 0.0 && lng == 0.0) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// One marker on the map: the highest-priority incident of a proximity
/// group, plus the members it stands in for.
///
/// A distinct shape rather than extra fields bolted onto [`Crisis`], so the
/// grouped/ungrouped cases cannot be confused downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRepresentative {
    pub primary: Crisis,
    /// Total group size including the primary; omitted for singletons.
    #[serde(rename = "groupedCount", default, skip_serializing_if = "Option::is_none")]
    pub grouped_count: Option<usize>,
    /// Group members hidden behind the primary; omitted when empty.
    #[serde(rename = "hiddenCrises", default, skip_serializing_if = "Vec::is_empty")]
    pub hidden: Vec<Crisis>,
}

impl ClusterRepresentative {
    /// Representative for an incident with no overlapping neighbors.
    pub fn single(primary: Crisis) -> Self {
        Self {
            primary,
            grouped_count: None,
            hidden: Vec::new(),
        }
    }

    /// Number of incidents this marker accounts for (primary included).
    pub fn member_count(&self) -> usize {
        1 + self.hidden.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn crisis(lat: Option<f64>, lng: Option<f64>) -> Crisis {
        Crisis {
            id: "c1".into(),
            title: "t".into(),
            description: String::new(),
            source: "src".into(),
            link: String::new(),
            pub_date: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 5).unwrap(),
            country: None,
            lat,
            lng,
        }
    }

    #[test]
    fn location_requires_both_coordinates() {
        assert_eq!(crisis(Some(10.0), Some(20.0)).location(), Some((10.0, 20.0)));
        assert_eq!(crisis(Some(10.0), None).location(), None);
        assert_eq!(crisis(None, None).location(), None);
    }

    #[test]
    fn null_island_is_not_a_location() {
        assert_eq!(crisis(Some(0.0), Some(0.0)).location(), None);
        // A zero on one axis alone is a real place.
        assert_eq!(crisis(Some(0.0), Some(12.5)).location(), Some((0.0, 12.5)));
    }

    #[test]
    fn representative_serializes_omitting_singleton_fields() {
        let rep = ClusterRepresentative::single(crisis(Some(1.0), Some(2.0)));
        let v = serde_json::to_value(&rep).expect("serialize representative");
        assert!(v.get("groupedCount").is_none(), "groupedCount must be omitted");
        assert!(v.get("hiddenCrises").is_none(), "hiddenCrises must be omitted");
    }
}
