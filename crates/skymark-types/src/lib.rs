use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a stored point: the SQLite rowid assigned on insertion.
/// Points that have not been persisted yet carry an id of `0`.
pub type PointId = i64;

/// A plain latitude/longitude coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in decimal degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in decimal degrees, [-180, 180].
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A geo-located point of interest shown on the overlay (e.g. a summit).
///
/// The `(latitude, longitude, altitude)` triple is unique within a point
/// store; inserting a second point with the same triple replaces the first
/// (last-write-wins). Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub name: String,
    pub description: String,
    /// Latitude in decimal degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in decimal degrees, [-180, 180].
    pub longitude: f64,
    /// Altitude above sea level in metres.
    pub altitude: i64,
}

impl Point {
    /// Construct an unpersisted point (id `0`; the store assigns the real id).
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        latitude: f64,
        longitude: f64,
        altitude: i64,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            latitude,
            longitude,
            altitude,
        }
    }

    /// The horizontal coordinate of this point.
    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

/// A location fix delivered by an external location provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude above sea level in metres.
    pub altitude: f64,
    /// Wall-clock time at which the provider produced the fix.
    pub timestamp: DateTime<Utc>,
    /// `true` when the fix came from a mock/test provider rather than real
    /// positioning hardware.
    pub mock: bool,
}

impl LocationFix {
    /// The horizontal coordinate of this fix.
    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    /// Age of the fix relative to `now`. Consumers reject fixes older than
    /// their configured maximum age rather than working with old positions.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.timestamp
    }
}

/// One raw sensor reading: an accelerometer (gravity) vector and a
/// magnetometer (geomagnetic field) vector in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub accelerometer: [f64; 3],
    pub magnetometer: [f64; 3],
    pub timestamp: DateTime<Utc>,
}

/// A filtered device orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    /// Compass heading in degrees clockwise from north, [0, 360).
    pub azimuth: f64,
    /// Vertical inclination in degrees; 0 when the device is flat.
    pub pitch: f64,
    /// Horizontal inclination in degrees; 0 when the device is flat.
    pub roll: f64,
    pub timestamp: DateTime<Utc>,
}

/// Distance and bearing of one candidate point relative to the observer.
/// Ephemeral: computed per ranking pass, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearingResult {
    pub point: Point,
    /// Great-circle distance from the observer in metres.
    pub distance_m: f64,
    /// Bearing from the observer in degrees clockwise from north, [0, 360).
    pub relative_bearing: f64,
}

/// One complete ranking pass: every candidate point around `observer`,
/// ordered by relative bearing for deterministic overlay layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayFrame {
    pub observer: LatLon,
    pub results: Vec<BearingResult>,
}

/// Unified event wrapper for the overlay event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. "skymark-engine::compass"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap a payload with a fresh id and the current UTC timestamp.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the overlay event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Orientation(OrientationSample),
    Location(LocationFix),
    Overlay(OverlayFrame),
}

/// Global error type spanning sensor acquisition, bus routing, and storage.
///
/// Two conditions are deliberately *not* errors: a stale location fix is
/// silently discarded by its consumer, and replacing a point on a
/// `(latitude, longitude, altitude)` conflict is the expected dedup path.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum SkyError {
    #[error("Sensor unavailable: {sensor}")]
    SensorUnavailable { sensor: String },

    #[error("Event bus error: {0}")]
    Channel(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_serialization_roundtrip() {
        let point = Point::new("Mont Blanc", "Highest alpine summit", 45.8326, 6.8652, 4810);
        let json = serde_json::to_string(&point).unwrap();
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(point, back);
    }

    #[test]
    fn event_roundtrip() {
        let event = Event::new(
            "skymark-engine::compass",
            EventPayload::Orientation(OrientationSample {
                azimuth: 123.4,
                pitch: -5.0,
                roll: 0.5,
                timestamp: Utc::now(),
            }),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        assert_eq!(event.source, back.source);
    }

    #[test]
    fn location_fix_age() {
        let now = Utc::now();
        let fix = LocationFix {
            latitude: 48.8566,
            longitude: 2.3522,
            altitude: 35.0,
            timestamp: now - TimeDelta::seconds(120),
            mock: false,
        };
        assert_eq!(fix.age(now), TimeDelta::seconds(120));
    }

    #[test]
    fn unpersisted_point_has_zero_id() {
        let point = Point::new("p", "", 0.0, 0.0, 0);
        assert_eq!(point.id, 0);
    }

    #[test]
    fn sky_error_display() {
        let err = SkyError::SensorUnavailable {
            sensor: "rotation".to_string(),
        };
        assert!(err.to_string().contains("rotation"));

        let err2 = SkyError::Storage("disk full".to_string());
        assert!(err2.to_string().contains("disk full"));
    }
}
