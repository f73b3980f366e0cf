//! Provider traits for the outside world.
//!
//! The engine never talks to a platform sensor API directly. It consumes
//! these traits; a platform integration (mobile sensor bridge, GNSS daemon,
//! replay harness, …) implements them and owns all hardware specifics —
//! permission handling included.
//!
//! # Overview
//!
//! - [`OrientationProvider`] – delivers raw accelerometer + magnetometer
//!   samples at whatever rate the hardware produces them.
//! - [`LocationProvider`] – delivers location fixes, typically seconds
//!   apart.
//! - [`sim`][crate::sim] – scripted implementations for headless tests.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use skymark_types::{LocationFix, RawSample, SkyError};

/// Source of raw orientation sensor data.
///
/// # Contract
///
/// * `start` – acquires the underlying rotation source and returns the raw
///   sample stream. Fails with [`SkyError::SensorUnavailable`] when the
///   sensor cannot be acquired; the caller reports the condition instead of
///   crashing.
/// * The stream ends when the provider shuts down. Consumers stop pulling
///   (drop the stream) to release the subscription.
#[async_trait]
pub trait OrientationProvider: Send + Sync {
    /// Begin raw sample delivery.
    async fn start(&self) -> Result<BoxStream<'static, RawSample>, SkyError>;
}

/// Source of location fixes.
///
/// Staleness is not this trait's concern: providers deliver every fix they
/// obtain, timestamped; the consumer applies its own maximum-age policy.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Begin fix delivery.
    async fn start(&self) -> Result<BoxStream<'static, LocationFix>, SkyError>;
}
