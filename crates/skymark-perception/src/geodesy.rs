//! Spherical-geometry primitives.
//!
//! Pure functions on latitude/longitude pairs: great-circle distance
//! (haversine), initial bearing, the planar metre↔degree conversion used by
//! the bounding-box query, and circular statistics for compass angles.
//!
//! # Example
//!
//! ```rust
//! use skymark_perception::geodesy::{distance_m, initial_bearing_deg};
//! use skymark_types::LatLon;
//!
//! let paris = LatLon::new(48.8566, 2.3522);
//! let london = LatLon::new(51.5074, -0.1278);
//!
//! let d = distance_m(paris, london);
//! assert!((d - 343_900.0).abs() < 2_000.0);
//!
//! let b = initial_bearing_deg(paris, london);
//! assert!((0.0..360.0).contains(&b));
//! ```

use skymark_types::LatLon;

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres per degree of arc under the planar approximation: one nautical
/// mile (1852 m) per arc minute.
pub const METERS_PER_DEGREE: f64 = 1_852.0 * 60.0;

// ────────────────────────────────────────────────────────────────────────────
// Distance and bearing
// ────────────────────────────────────────────────────────────────────────────

/// Great-circle distance between two coordinates in metres (haversine).
///
/// Symmetric: `distance_m(a, b) == distance_m(b, a)` within floating-point
/// tolerance.
pub fn distance_m(a: LatLon, b: LatLon) -> f64 {
    let phi_a = a.latitude.to_radians();
    let phi_b = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `observer` towards `target` in degrees clockwise
/// from north, [0, 360).
///
/// Returns `0.0` when the two coordinates coincide, so the degenerate case
/// is stable rather than NaN.
pub fn initial_bearing_deg(observer: LatLon, target: LatLon) -> f64 {
    if observer == target {
        return 0.0;
    }

    let phi_a = observer.latitude.to_radians();
    let phi_b = target.latitude.to_radians();
    let d_lambda = (target.longitude - observer.longitude).to_radians();

    let y = d_lambda.sin() * phi_b.cos();
    let x = phi_a.cos() * phi_b.sin() - phi_a.sin() * phi_b.cos() * d_lambda.cos();
    normalize_deg(y.atan2(x).to_degrees())
}

// ────────────────────────────────────────────────────────────────────────────
// Planar metre ↔ degree conversion
// ────────────────────────────────────────────────────────────────────────────

/// Convert a distance in metres to an approximate degree delta.
///
/// Planar approximation: accurate for latitude everywhere, but the real
/// width of a longitude degree shrinks towards the poles, so boxes derived
/// from this value over-reach east–west at high latitude.
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Inverse of [`meters_to_degrees`].
pub fn degrees_to_meters(degrees: f64) -> f64 {
    degrees * METERS_PER_DEGREE
}

// ────────────────────────────────────────────────────────────────────────────
// Circular statistics
// ────────────────────────────────────────────────────────────────────────────

/// Wrap an angle in degrees to [0, 360).
pub fn normalize_deg(degrees: f64) -> f64 {
    // rem_euclid of a tiny negative rounds up to exactly 360.0.
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped == 360.0 { 0.0 } else { wrapped }
}

/// Shortest angular distance between two compass headings, in [0, 180].
pub fn angular_delta_deg(a: f64, b: f64) -> f64 {
    let d = normalize_deg(b - a);
    if d > 180.0 { 360.0 - d } else { d }
}

/// Circular mean of compass angles in degrees, result in [0, 360).
///
/// Averages unit vectors rather than raw values, so a window straddling the
/// 359°→1° boundary yields a value near 0°, never 180°. Returns `0.0` for an
/// empty slice or when the vectors cancel out exactly.
pub fn circular_mean_deg(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }
    let (sin_sum, cos_sum) = angles.iter().fold((0.0, 0.0), |(s, c), a| {
        let r = a.to_radians();
        (s + r.sin(), c + r.cos())
    });
    normalize_deg(sin_sum.atan2(cos_sum).to_degrees())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: LatLon = LatLon {
        latitude: 48.8566,
        longitude: 2.3522,
    };
    const LONDON: LatLon = LatLon {
        latitude: 51.5074,
        longitude: -0.1278,
    };

    // ── distance_m ──────────────────────────────────────────────────────────

    #[test]
    fn distance_is_symmetric() {
        let ab = distance_m(PARIS, LONDON);
        let ba = distance_m(LONDON, PARIS);
        assert!((ab - ba).abs() / ab < 1e-6, "ab={ab} ba={ba}");
    }

    #[test]
    fn distance_paris_london_is_about_344_km() {
        let d = distance_m(PARIS, LONDON);
        assert!((d - 343_900.0).abs() < 2_000.0, "got {d}");
    }

    #[test]
    fn distance_one_degree_longitude_at_equator() {
        // 2πR / 360 ≈ 111 195 m.
        let d = distance_m(LatLon::new(0.0, 0.0), LatLon::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_m(PARIS, PARIS), 0.0);
    }

    // ── initial_bearing_deg ─────────────────────────────────────────────────

    #[test]
    fn bearing_cardinal_directions_from_equator() {
        let origin = LatLon::new(0.0, 0.0);
        assert!((initial_bearing_deg(origin, LatLon::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((initial_bearing_deg(origin, LatLon::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((initial_bearing_deg(origin, LatLon::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((initial_bearing_deg(origin, LatLon::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn bearing_always_in_unit_circle_range() {
        let targets = [
            LatLon::new(51.5, -0.13),
            LatLon::new(-33.9, 151.2),
            LatLon::new(48.86, 2.35),
            LatLon::new(89.0, -179.0),
            LatLon::new(-89.0, 179.0),
        ];
        for t in targets {
            let b = initial_bearing_deg(PARIS, t);
            assert!((0.0..360.0).contains(&b), "bearing {b} for {t:?}");
        }
    }

    #[test]
    fn bearing_degenerate_case_is_zero() {
        assert_eq!(initial_bearing_deg(PARIS, PARIS), 0.0);
    }

    // ── metre ↔ degree conversion ───────────────────────────────────────────

    #[test]
    fn meters_to_degrees_roundtrip() {
        assert!((meters_to_degrees(METERS_PER_DEGREE) - 1.0).abs() < 1e-12);
        assert!((degrees_to_meters(meters_to_degrees(5_000.0)) - 5_000.0).abs() < 1e-9);
    }

    // ── circular statistics ─────────────────────────────────────────────────

    #[test]
    fn normalize_wraps_into_range() {
        assert_eq!(normalize_deg(360.0), 0.0);
        assert_eq!(normalize_deg(-90.0), 270.0);
        assert_eq!(normalize_deg(725.0), 5.0);
    }

    #[test]
    fn angular_delta_across_north() {
        assert!((angular_delta_deg(359.0, 1.0) - 2.0).abs() < 1e-9);
        assert!((angular_delta_deg(1.0, 359.0) - 2.0).abs() < 1e-9);
        assert!((angular_delta_deg(90.0, 270.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn circular_mean_across_north_is_near_zero() {
        let mean = circular_mean_deg(&[359.0, 1.0]);
        let off_north = angular_delta_deg(mean, 0.0);
        assert!(off_north < 1e-6, "mean {mean} is {off_north}° off north");
    }

    #[test]
    fn circular_mean_of_clustered_angles() {
        let mean = circular_mean_deg(&[88.0, 90.0, 92.0]);
        assert!((mean - 90.0).abs() < 1e-9, "got {mean}");
    }

    #[test]
    fn circular_mean_empty_is_zero() {
        assert_eq!(circular_mean_deg(&[]), 0.0);
    }
}
