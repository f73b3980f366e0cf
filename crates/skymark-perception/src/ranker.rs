//! Bearing ranker.
//!
//! Orders a set of candidate points by their bearing from the observer so
//! the overlay can lay markers out left-to-right in a stable, reproducible
//! order. Pure transform: owns no state, touches no storage.
//!
//! # Ordering contract
//!
//! Ascending by relative bearing; ties broken by ascending distance, then by
//! ascending point id. Given identical input the output order is identical
//! across runs.
//!
//! # Example
//!
//! ```rust
//! use skymark_perception::ranker::rank_by_bearing;
//! use skymark_types::{LatLon, Point};
//!
//! let observer = LatLon::new(0.0, 0.0);
//! let east = Point::new("east", "", 0.0, 0.1, 0);
//! let north = Point::new("north", "", 0.1, 0.0, 0);
//!
//! let ranked = rank_by_bearing(observer, &[east, north]);
//! assert_eq!(ranked[0].point.name, "north");
//! assert_eq!(ranked[1].point.name, "east");
//! ```

use skymark_types::{BearingResult, LatLon, Point};

use crate::geodesy::{distance_m, initial_bearing_deg};

/// Compute distance and bearing for every point and sort into the
/// deterministic overlay order.
pub fn rank_by_bearing(observer: LatLon, points: &[Point]) -> Vec<BearingResult> {
    let mut results: Vec<BearingResult> = points
        .iter()
        .map(|point| BearingResult {
            distance_m: distance_m(observer, point.lat_lon()),
            relative_bearing: initial_bearing_deg(observer, point.lat_lon()),
            point: point.clone(),
        })
        .collect();

    results.sort_by(|a, b| {
        a.relative_bearing
            .total_cmp(&b.relative_bearing)
            .then(a.distance_m.total_cmp(&b.distance_m))
            .then(a.point.id.cmp(&b.point.id))
    });
    results
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
