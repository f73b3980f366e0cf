//! Scripted in-process providers for headless testing.
//!
//! These stand-ins replay pre-recorded sample/fix sequences so the full
//! overlay stack runs in CI pipelines without sensor or positioning
//! hardware. Both providers can also be constructed in an `unavailable`
//! state to exercise the acquisition-failure path.
//!
//! # Example
//!
//! ```rust
//! use skymark_middleware::provider::OrientationProvider;
//! use skymark_middleware::sim::{flat_raw_sample, SimOrientationProvider};
//!
//! # async fn demo() {
//! let provider = SimOrientationProvider::new()
//!     .with_samples([flat_raw_sample(10.0), flat_raw_sample(95.0)]);
//!
//! let stream = provider.start().await.expect("sim sensor must be available");
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, BoxStream, StreamExt};
use skymark_types::{LocationFix, RawSample, SkyError};

use crate::provider::{LocationProvider, OrientationProvider};

/// Fabricate the raw sample a flat-lying device pointing `azimuth_deg`
/// clockwise from north would produce, with a magnetic inclination of 45°
/// down — the common mid-latitude case.
pub fn flat_raw_sample(azimuth_deg: f64) -> RawSample {
    let theta = azimuth_deg.to_radians();
    let horizontal = 30.0 * std::f64::consts::FRAC_1_SQRT_2;
    let vertical = -30.0 * std::f64::consts::FRAC_1_SQRT_2;
    RawSample {
        accelerometer: [0.0, 0.0, 9.81],
        magnetometer: [
            -horizontal * theta.sin(),
            horizontal * theta.cos(),
            vertical,
        ],
        timestamp: Utc::now(),
    }
}

/// Fabricate a fresh, non-mock location fix at the given coordinate.
pub fn fix_at(latitude: f64, longitude: f64) -> LocationFix {
    LocationFix {
        latitude,
        longitude,
        altitude: 0.0,
        timestamp: Utc::now(),
        mock: false,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimOrientationProvider
// ────────────────────────────────────────────────────────────────────────────

/// A scripted orientation sensor that replays a fixed sample sequence.
///
/// Build with the `with_*` methods; the stream ends after the last sample.
#[derive(Default)]
pub struct SimOrientationProvider {
    samples: Vec<RawSample>,
    interval: Option<Duration>,
    unavailable: bool,
}

impl SimOrientationProvider {
    /// Create an empty, available provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw samples to the replay script.
    pub fn with_samples(mut self, samples: impl IntoIterator<Item = RawSample>) -> Self {
        self.samples.extend(samples);
        self
    }

    /// Pace the replay: sleep `interval` before delivering each sample.
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// A provider whose `start` fails with `SensorUnavailable`, for
    /// exercising the acquisition-failure path.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl OrientationProvider for SimOrientationProvider {
    async fn start(&self) -> Result<BoxStream<'static, RawSample>, SkyError> {
        if self.unavailable {
            return Err(SkyError::SensorUnavailable {
                sensor: "rotation".to_string(),
            });
        }
        Ok(paced_stream(self.samples.clone(), self.interval))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimLocationProvider
// ────────────────────────────────────────────────────────────────────────────

/// A scripted location source that replays a fixed sequence of fixes.
#[derive(Default)]
pub struct SimLocationProvider {
    fixes: Vec<LocationFix>,
    interval: Option<Duration>,
    unavailable: bool,
}

impl SimLocationProvider {
    /// Create an empty, available provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append fixes to the replay script.
    pub fn with_fixes(mut self, fixes: impl IntoIterator<Item = LocationFix>) -> Self {
        self.fixes.extend(fixes);
        self
    }

    /// Pace the replay: sleep `interval` before delivering each fix.
    pub fn with_fix_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// A provider whose `start` fails with `SensorUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl LocationProvider for SimLocationProvider {
    async fn start(&self) -> Result<BoxStream<'static, LocationFix>, SkyError> {
        if self.unavailable {
            return Err(SkyError::SensorUnavailable {
                sensor: "location".to_string(),
            });
        }
        Ok(paced_stream(self.fixes.clone(), self.interval))
    }
}

/// Replay `items` in order, optionally sleeping `interval` before each one.
fn paced_stream<T: Send + 'static>(
    items: Vec<T>,
    interval: Option<Duration>,
) -> BoxStream<'static, T> {
    stream::iter(items)
        .then(move |item| async move {
            if let Some(interval) = interval {
                tokio::time::sleep(interval).await;
            }
            item
        })
        .boxed()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
