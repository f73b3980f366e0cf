//! `skymark-store` – durable point storage.
//!
//! Persists the point-of-interest collection to a local SQLite substrate and
//! answers the spatial and textual queries the overlay pipeline needs.
//!
//! # Modules
//!
//! - [`points`] – [`PointStore`][points::PointStore]: a caller-owned,
//!   clone-cheap handle over one SQLite connection with dedup-insert
//!   semantics, bounding-box and name queries, and serialized batch writes.

pub mod points;

pub use points::{BatchReport, PointStore, StoreError};
