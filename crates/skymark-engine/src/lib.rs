//! `skymark-engine` – the live-view orchestrator.
//!
//! Wires the sensor providers, the fusion filter, the point store and the
//! bearing ranker into the two data flows a live overlay consumes:
//!
//! - raw sensor samples → [`Compass`][compass::Compass] → gated orientation
//!   events on the bus;
//! - location fixes → [`OverlayPipeline`][overlay::OverlayPipeline] →
//!   bounding-box query → bearing ranking → ordered overlay frames on the
//!   bus.
//!
//! # Modules
//!
//! - [`compass`] – [`Compass`][compass::Compass]: scoped acquisition of the
//!   orientation sensor; publishes filtered, change-gated samples.
//! - [`overlay`] – [`OverlayPipeline`][overlay::OverlayPipeline]:
//!   staleness-checked, latest-wins location intake driving the query/rank
//!   cycle.
//! - [`session`] – [`OverlaySession`][session::OverlaySession]: caller-owned
//!   facade bundling bus, store, compass and pipeline behind the surface the
//!   UI layer consumes.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: one-call
//!   `tracing` subscriber setup (`RUST_LOG`, `SKYMARK_LOG_FORMAT=json`).
//!
//! Nothing in this crate blocks the sensor callback path: queries and
//! ranking run on separate tasks, and every hand-off to consumers goes
//! through broadcast channels that drop for slow subscribers instead of
//! applying backpressure to the sensors.

pub mod compass;
pub mod overlay;
pub mod session;
pub mod telemetry;

pub use compass::Compass;
pub use overlay::{OverlayConfig, OverlayPipeline};
pub use session::{OverlaySession, SessionConfig};
pub use telemetry::init_tracing;
