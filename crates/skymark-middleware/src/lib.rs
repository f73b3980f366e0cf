//! `skymark-middleware` – the plumbing between sensors and the overlay.
//!
//! Routes asynchronous data between the platform's sensor/location sources,
//! the engine, and overlay consumers without caring about the data's
//! meaning.
//!
//! # Modules
//!
//! - [`bus`] – headless, typed, topic-based publish/subscribe event bus
//!   built on Tokio broadcast channels.
//! - [`provider`] – the traits a platform integration implements to feed
//!   raw orientation samples and location fixes into the engine.
//! - [`sim`] – scripted in-process providers so the full stack runs in
//!   headless tests and CI pipelines without sensor hardware.

pub mod bus;
pub mod provider;
pub mod sim;

pub use bus::{OverlayBus, Topic, TopicReceiver};
pub use provider::{LocationProvider, OrientationProvider};
