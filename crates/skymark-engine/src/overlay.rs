//! Overlay pipeline.
//!
//! Turns location fixes into ranked overlay frames. Each accepted fix
//! triggers at most one store query and one ranking pass, and those passes
//! never overlap: fixes funnel through a `tokio::sync::watch` slot, so a fix
//! arriving while a query/rank cycle is still in flight simply replaces the
//! pending one (**latest wins**) instead of queuing or interleaving.
//!
//! # Fix validation
//!
//! A fix older than [`OverlayConfig::max_fix_age`] is silently discarded
//! with a `debug!` log — staleness is policy, not an error. Fixes from mock
//! providers can optionally be rejected as well.
//!
//! # Movement hysteresis
//!
//! Re-querying the store and re-ranking are both distance-gated so a
//! stationary observer does not hammer SQLite or the overlay:
//!
//! - the candidate set is reloaded only after moving
//!   [`reload_distance_m`][OverlayConfig::reload_distance_m] from the last
//!   query position;
//! - a new frame is ranked and published only after moving
//!   [`recalc_distance_m`][OverlayConfig::recalc_distance_m] from the last
//!   ranking position.
//!
//! The first accepted fix always does both.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use futures_util::StreamExt;
use skymark_middleware::bus::{OverlayBus, Topic};
use skymark_middleware::provider::LocationProvider;
use skymark_perception::geodesy::distance_m;
use skymark_perception::ranker::rank_by_bearing;
use skymark_store::points::PointStore;
use skymark_types::{Event, EventPayload, LatLon, LocationFix, OverlayFrame, Point, SkyError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Source label stamped on every published location/overlay event.
const SOURCE: &str = "skymark-engine::overlay";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`OverlayPipeline`].
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Maximum age a fix may have and still be accepted.
    pub max_fix_age: TimeDelta,
    /// Radius of the candidate search box around the observer, in metres.
    pub search_radius_m: f64,
    /// Minimum movement before the candidate set is reloaded from the store.
    pub reload_distance_m: f64,
    /// Minimum movement before a new overlay frame is ranked and published.
    pub recalc_distance_m: f64,
    /// Drop fixes whose provider marked them as mock.
    pub reject_mock_fixes: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            max_fix_age: TimeDelta::seconds(180),
            search_radius_m: 10_000.0,
            reload_distance_m: 500.0,
            recalc_distance_m: 10.0,
            reject_mock_fixes: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OverlayPipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Location-driven query/rank pipeline. See the module docs for semantics.
pub struct OverlayPipeline {
    bus: OverlayBus,
    store: PointStore,
    config: OverlayConfig,
    intake: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl OverlayPipeline {
    pub fn new(bus: OverlayBus, store: PointStore, config: OverlayConfig) -> Self {
        Self {
            bus,
            store,
            config,
            intake: None,
            worker: None,
        }
    }

    /// Acquire the location stream and spawn the intake and worker tasks.
    ///
    /// # Errors
    ///
    /// Returns [`SkyError::SensorUnavailable`] when the provider cannot
    /// deliver fixes. The pipeline is left stopped.
    pub async fn start(&mut self, provider: Arc<dyn LocationProvider>) -> Result<(), SkyError> {
        self.stop().await;

        let mut stream = provider.start().await?;
        let (fix_tx, fix_rx) = watch::channel(None::<LocationFix>);

        let bus = self.bus.clone();
        let config = self.config.clone();
        self.intake = Some(tokio::spawn(async move {
            while let Some(fix) = stream.next().await {
                let age = fix.age(Utc::now());
                if age > config.max_fix_age {
                    debug!(age_s = age.num_seconds(), "discarding stale location fix");
                    continue;
                }
                if config.reject_mock_fixes && fix.mock {
                    debug!("discarding mock location fix");
                    continue;
                }
                let event = Event::new(SOURCE, EventPayload::Location(fix.clone()));
                if bus.publish_to(Topic::Location, event).is_err() {
                    trace!("location fix relayed with no subscribers");
                }
                if fix_tx.send(Some(fix)).is_err() {
                    break;
                }
            }
            debug!("location fix stream ended");
        }));

        let bus = self.bus.clone();
        let store = self.store.clone();
        let config = self.config.clone();
        self.worker = Some(tokio::spawn(run_worker(bus, store, config, fix_rx)));
        Ok(())
    }

    /// Tear down both tasks. Idempotent and safe without a prior `start`.
    pub async fn stop(&mut self) {
        for task in [self.intake.take(), self.worker.take()].into_iter().flatten() {
            task.abort();
            let _ = task.await;
        }
    }
}

/// One query/rank cycle per watch update; the newest fix always supersedes
/// anything still pending.
async fn run_worker(
    bus: OverlayBus,
    store: PointStore,
    config: OverlayConfig,
    mut fix_rx: watch::Receiver<Option<LocationFix>>,
) {
    let mut candidates: Vec<Point> = Vec::new();
    let mut query_anchor: Option<LatLon> = None;
    let mut rank_anchor: Option<LatLon> = None;

    while fix_rx.changed().await.is_ok() {
        let Some(fix) = fix_rx.borrow_and_update().clone() else {
            continue;
        };
        let observer = fix.lat_lon();

        let needs_reload = query_anchor
            .map(|anchor| distance_m(anchor, observer) > config.reload_distance_m)
            .unwrap_or(true);
        if needs_reload {
            let blocking_store = store.clone();
            let radius = config.search_radius_m;
            match tokio::task::spawn_blocking(move || blocking_store.query_around(observer, radius))
                .await
            {
                Ok(Ok(points)) => {
                    debug!(count = points.len(), "reloaded candidate points around observer");
                    candidates = points;
                    query_anchor = Some(observer);
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "point query failed; skipping overlay pass");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "point query task failed; skipping overlay pass");
                    continue;
                }
            }
        }

        let needs_rank = rank_anchor
            .map(|anchor| distance_m(anchor, observer) > config.recalc_distance_m)
            .unwrap_or(true);
        if needs_rank {
            let results = rank_by_bearing(observer, &candidates);
            rank_anchor = Some(observer);
            let frame = OverlayFrame { observer, results };
            let event = Event::new(SOURCE, EventPayload::Overlay(frame));
            if bus.publish_to(Topic::Overlay, event).is_err() {
                trace!("overlay frame dropped: no subscribers");
            }
        }
    }
    debug!("overlay worker stopped");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
