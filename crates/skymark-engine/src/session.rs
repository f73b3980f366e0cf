//! Overlay session facade.
//!
//! Owns every subsystem handle a live view needs — the event bus, the point
//! store, the [`Compass`] and the [`OverlayPipeline`] — and exposes the
//! surface the UI layer consumes: topic subscriptions, store access, and
//! scoped start/stop of both acquisition paths.
//!
//! # Degraded start
//!
//! The location/overlay path starts before the compass. When the rotation
//! sensor cannot be acquired, [`OverlaySession::start`] reports
//! [`SkyError::SensorUnavailable`] but leaves the location and overlay
//! stream running, so the caller can still show a positional overlay and
//! retry the compass later with another `start`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skymark_engine::session::{OverlaySession, SessionConfig};
//! use skymark_middleware::sim::{SimLocationProvider, SimOrientationProvider};
//!
//! # async fn demo() {
//! let mut session = OverlaySession::new(SessionConfig::default()).unwrap();
//! let mut overlay_rx = session.subscribe_overlay();
//!
//! session
//!     .start(
//!         Arc::new(SimOrientationProvider::new()),
//!         Arc::new(SimLocationProvider::new()),
//!     )
//!     .await
//!     .unwrap();
//!
//! let frame = overlay_rx.recv().await;
//! # }
//! ```

use std::sync::Arc;

use skymark_middleware::bus::{OverlayBus, Topic, TopicReceiver};
use skymark_middleware::provider::{LocationProvider, OrientationProvider};
use skymark_perception::fusion::FilterConfig;
use skymark_store::points::PointStore;
use skymark_types::SkyError;
use tracing::{info, warn};

use crate::compass::Compass;
use crate::overlay::{OverlayConfig, OverlayPipeline};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`OverlaySession`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Smoothing and gating parameters for the orientation stream.
    pub filter: FilterConfig,
    /// Staleness, radius and hysteresis parameters for the overlay pipeline.
    pub overlay: OverlayConfig,
    /// Optional path to the persistent point database.
    /// If `None`, an in-memory store is used (data lost on exit).
    pub db_path: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// OverlaySession
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-owned session wiring the whole overlay core together.
pub struct OverlaySession {
    bus: OverlayBus,
    store: PointStore,
    filter: FilterConfig,
    compass: Option<Compass>,
    pipeline: OverlayPipeline,
}

impl OverlaySession {
    /// Construct a session from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SkyError::Storage`] when the point database cannot be
    /// opened.
    pub fn new(config: SessionConfig) -> Result<Self, SkyError> {
        let store = match &config.db_path {
            Some(path) => {
                info!("opening persistent point store at: {path}");
                PointStore::open(path).map_err(|e| SkyError::Storage(e.to_string()))?
            }
            None => {
                warn!("no db_path configured; using in-memory point store (data will be lost)");
                PointStore::open_in_memory().map_err(|e| SkyError::Storage(e.to_string()))?
            }
        };

        let bus = OverlayBus::default();
        let pipeline = OverlayPipeline::new(bus.clone(), store.clone(), config.overlay);
        Ok(Self {
            bus,
            store,
            filter: config.filter,
            compass: None,
            pipeline,
        })
    }

    /// Subscribe to gated orientation samples. Drop the receiver to
    /// unsubscribe.
    pub fn subscribe_orientation(&self) -> TopicReceiver {
        self.bus.subscribe_to(Topic::Orientation)
    }

    /// Subscribe to validated location fixes (pass-through).
    pub fn subscribe_location(&self) -> TopicReceiver {
        self.bus.subscribe_to(Topic::Location)
    }

    /// Subscribe to ranked overlay frames.
    pub fn subscribe_overlay(&self) -> TopicReceiver {
        self.bus.subscribe_to(Topic::Overlay)
    }

    /// The point store backing this session, for inserts, batch imports,
    /// queries and `clear`. Cloning the returned handle is cheap.
    pub fn store(&self) -> &PointStore {
        &self.store
    }

    /// Start both acquisition paths.
    ///
    /// # Errors
    ///
    /// [`SkyError::SensorUnavailable`] from the location provider stops the
    /// start entirely; the same error from the rotation sensor leaves the
    /// location/overlay path running (see the module docs on degraded
    /// start).
    pub async fn start(
        &mut self,
        orientation: Arc<dyn OrientationProvider>,
        location: Arc<dyn LocationProvider>,
    ) -> Result<(), SkyError> {
        self.pipeline.start(location).await?;

        let mut compass = Compass::new(self.bus.clone(), orientation, self.filter);
        compass.start().await?;
        self.compass = Some(compass);
        Ok(())
    }

    /// Stop both acquisition paths. Idempotent; safe without a prior
    /// `start`.
    pub async fn stop(&mut self) {
        if let Some(mut compass) = self.compass.take() {
            compass.stop().await;
        }
        self.pipeline.stop().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
