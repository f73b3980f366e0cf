//! Orientation fusion filter.
//!
//! Converts raw accelerometer + magnetometer vector pairs into a de-noised,
//! change-gated sequence of [`OrientationSample`]s in three stages:
//!
//! 1. **Extraction** – [`orientation_from_vectors`] builds the device
//!    rotation matrix from the gravity and geomagnetic vectors and reads
//!    azimuth/pitch/roll off it.
//! 2. **Smoothing** – a moving average over the last N angle triples
//!    suppresses high-frequency sensor noise. Azimuth is averaged
//!    *circularly* so a window straddling the 359°→1° boundary settles near
//!    0° instead of jumping to 180°.
//! 3. **Gating** – a sample is emitted only when at least one axis moved by
//!    its configured minimum delta since the last *emitted* sample. Sensor
//!    sampling is cheap and frequent; consumer redraw is expensive, so the
//!    gate is the dominant cost-control mechanism.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use skymark_perception::fusion::{FilterConfig, OrientationFilter};
//! use skymark_types::RawSample;
//!
//! let mut filter = OrientationFilter::new(FilterConfig::default());
//!
//! // Device flat on a table, top edge pointing north.
//! let raw = RawSample {
//!     accelerometer: [0.0, 0.0, 9.81],
//!     magnetometer: [0.0, 22.0, -41.0],
//!     timestamp: Utc::now(),
//! };
//! let sample = filter.push(&raw).expect("first valid sample always emits");
//! assert!(sample.azimuth < 1e-6 || sample.azimuth > 359.0);
//! ```

use std::collections::VecDeque;

use skymark_types::{OrientationSample, RawSample};
use tracing::trace;

use crate::geodesy::{angular_delta_deg, circular_mean_deg, normalize_deg};

/// Vectors whose angle has a sine below this are treated as (anti-)parallel,
/// leaving the east direction undefined (e.g. magnetic interference).
const MIN_CROSS_NORM_RATIO: f64 = 0.1;

/// Norm floor below which a sensor vector is considered absent (free-fall
/// for the accelerometer, dead sensor for the magnetometer).
const MIN_VECTOR_NORM: f64 = 1e-6;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Configuration for [`OrientationFilter`].
#[derive(Debug, Clone, Copy)]
pub struct FilterConfig {
    /// Number of raw samples in the smoothing window.
    pub window: usize,
    /// Minimum azimuth change in degrees before a new sample is emitted.
    pub min_azimuth_delta: f64,
    /// Minimum pitch change in degrees before a new sample is emitted.
    pub min_pitch_delta: f64,
    /// Minimum roll change in degrees before a new sample is emitted.
    pub min_roll_delta: f64,
}

impl Default for FilterConfig {
    /// 8-sample window and 1° per-axis gates: small enough that the display
    /// never looks frozen, large enough to suppress jitter spam.
    fn default() -> Self {
        Self {
            window: 8,
            min_azimuth_delta: 1.0,
            min_pitch_delta: 1.0,
            min_roll_delta: 1.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rotation-matrix orientation extraction
// ────────────────────────────────────────────────────────────────────────────

/// Compute `(azimuth, pitch, roll)` in degrees from one gravity +
/// geomagnetic vector pair in device coordinates.
///
/// Builds the east axis as the cross product of the geomagnetic and gravity
/// vectors and reads the angles off the resulting rotation matrix. Azimuth
/// is in [0, 360), pitch in [-90, 90], roll in (-180, 180].
///
/// Returns `None` when either vector is near zero or the two are close to
/// (anti-)parallel — free-fall or heavy magnetic interference — in which
/// case no orientation is defined and the sample must be dropped.
pub fn orientation_from_vectors(
    accelerometer: [f64; 3],
    magnetometer: [f64; 3],
) -> Option<(f64, f64, f64)> {
    let [ax, ay, az] = accelerometer;
    let [ex, ey, ez] = magnetometer;

    let a_norm = (ax * ax + ay * ay + az * az).sqrt();
    let e_norm = (ex * ex + ey * ey + ez * ez).sqrt();
    if a_norm < MIN_VECTOR_NORM || e_norm < MIN_VECTOR_NORM {
        return None;
    }

    // East axis: E × A.
    let hx = ey * az - ez * ay;
    let hy = ez * ax - ex * az;
    let hz = ex * ay - ey * ax;
    let h_norm = (hx * hx + hy * hy + hz * hz).sqrt();
    if h_norm < MIN_CROSS_NORM_RATIO * a_norm * e_norm {
        return None;
    }

    let (hx, hy, hz) = (hx / h_norm, hy / h_norm, hz / h_norm);
    let (ax, ay, az) = (ax / a_norm, ay / a_norm, az / a_norm);

    // North axis: A × H; only its y component feeds the azimuth readout.
    let my = az * hx - ax * hz;

    let azimuth = normalize_deg(hy.atan2(my).to_degrees());
    let pitch = (-ay).asin().to_degrees();
    let roll = (-ax).atan2(az).to_degrees();

    Some((azimuth, pitch, roll))
}

// ────────────────────────────────────────────────────────────────────────────
// OrientationFilter
// ────────────────────────────────────────────────────────────────────────────

/// Moving-average low-pass filter with per-axis change gating.
///
/// Feed raw samples with [`OrientationFilter::push`]; it returns
/// `Some(sample)` only when the smoothed orientation moved far enough on at
/// least one axis to be worth telling consumers about.
///
/// The filter state is owned exclusively by the path that feeds it; it is
/// deliberately not shareable.
#[derive(Debug)]
pub struct OrientationFilter {
    config: FilterConfig,
    /// Ring buffer of the last N extracted (azimuth, pitch, roll) triples.
    window: VecDeque<(f64, f64, f64)>,
    last_emitted: Option<OrientationSample>,
}

impl OrientationFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            window: VecDeque::with_capacity(config.window.max(1)),
            last_emitted: None,
        }
    }

    /// Feed one raw sample.
    ///
    /// Returns the smoothed orientation when the change gate opens, `None`
    /// when the sample is degenerate or the movement stayed below every
    /// per-axis threshold. The first valid sample always emits.
    pub fn push(&mut self, raw: &RawSample) -> Option<OrientationSample> {
        let (azimuth, pitch, roll) =
            orientation_from_vectors(raw.accelerometer, raw.magnetometer)?;

        self.window.push_back((azimuth, pitch, roll));
        while self.window.len() > self.config.window.max(1) {
            self.window.pop_front();
        }

        let azimuths: Vec<f64> = self.window.iter().map(|(a, _, _)| *a).collect();
        let n = self.window.len() as f64;
        let candidate = OrientationSample {
            azimuth: circular_mean_deg(&azimuths),
            pitch: self.window.iter().map(|(_, p, _)| p).sum::<f64>() / n,
            roll: self.window.iter().map(|(_, _, r)| r).sum::<f64>() / n,
            timestamp: raw.timestamp,
        };

        match &self.last_emitted {
            Some(prev)
                if angular_delta_deg(prev.azimuth, candidate.azimuth)
                    < self.config.min_azimuth_delta
                    && (candidate.pitch - prev.pitch).abs() < self.config.min_pitch_delta
                    && (candidate.roll - prev.roll).abs() < self.config.min_roll_delta =>
            {
                trace!(
                    azimuth = candidate.azimuth,
                    "orientation change below thresholds; suppressed"
                );
                None
            }
            _ => {
                self.last_emitted = Some(candidate);
                Some(candidate)
            }
        }
    }

    /// Clear the smoothing window and the last-emitted state, so the next
    /// valid sample emits unconditionally.
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_emitted = None;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
