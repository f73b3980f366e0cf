//! Compass engine.
//!
//! Owns the orientation acquisition subscription: pulls raw vector samples
//! from an [`OrientationProvider`], runs them through the
//! [`OrientationFilter`] and publishes the gated samples on
//! [`Topic::Orientation`].
//!
//! The filter state lives inside the acquisition task and is mutated by that
//! task alone — no other caller can touch it. Heavy consumers are decoupled
//! through the broadcast bus, so nothing downstream can throttle the sensor
//! path.
//!
//! # Lifecycle
//!
//! - [`Compass::start`] acquires the provider stream and spawns the
//!   acquisition task. A second `start` tears the old subscription down
//!   first. When the sensor cannot be acquired, `start` returns
//!   [`SkyError::SensorUnavailable`] and the caller decides what to show.
//! - [`Compass::stop`] is safe to call at any time, including before the
//!   first `start` or after a failed one, and guarantees that no further
//!   orientation event is published once it returns.

use std::sync::Arc;

use futures_util::StreamExt;
use skymark_middleware::bus::{OverlayBus, Topic};
use skymark_middleware::provider::OrientationProvider;
use skymark_perception::fusion::{FilterConfig, OrientationFilter};
use skymark_types::{Event, EventPayload, SkyError};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Source label stamped on every published orientation event.
const SOURCE: &str = "skymark-engine::compass";

/// Orientation acquisition engine. See the module docs for the lifecycle.
pub struct Compass {
    bus: OverlayBus,
    provider: Arc<dyn OrientationProvider>,
    config: FilterConfig,
    task: Option<JoinHandle<()>>,
}

impl Compass {
    pub fn new(
        bus: OverlayBus,
        provider: Arc<dyn OrientationProvider>,
        config: FilterConfig,
    ) -> Self {
        Self {
            bus,
            provider,
            config,
            task: None,
        }
    }

    /// Acquire the sensor and begin publishing gated orientation samples.
    ///
    /// # Errors
    ///
    /// Returns [`SkyError::SensorUnavailable`] when the provider cannot
    /// acquire the underlying rotation source. The compass is left stopped;
    /// calling `start` again retries the acquisition.
    pub async fn start(&mut self) -> Result<(), SkyError> {
        self.stop().await;

        let mut stream = self.provider.start().await?;
        let bus = self.bus.clone();
        let mut filter = OrientationFilter::new(self.config);

        self.task = Some(tokio::spawn(async move {
            while let Some(raw) = stream.next().await {
                if let Some(sample) = filter.push(&raw) {
                    let event = Event::new(SOURCE, EventPayload::Orientation(sample));
                    if bus.publish_to(Topic::Orientation, event).is_err() {
                        trace!("orientation sample dropped: no subscribers");
                    }
                }
            }
            debug!("raw orientation stream ended");
        }));
        Ok(())
    }

    /// Tear down the acquisition task.
    ///
    /// Idempotent and safe without a prior `start`. Awaits the task's
    /// termination, so no orientation event is published after this returns.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    /// True while the acquisition task is installed.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
