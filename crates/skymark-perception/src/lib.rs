//! `skymark-perception` – the computational core of the overlay.
//!
//! Turns noisy sensor data and raw coordinates into the stable geometric
//! quantities the overlay needs: where the observer is looking, and where
//! each point of interest sits relative to that gaze.
//!
//! # Modules
//!
//! - [`geodesy`] – pure spherical-geometry functions: great-circle distance,
//!   initial bearing, planar metre↔degree conversion and circular (compass)
//!   statistics.
//! - [`fusion`] – [`OrientationFilter`][fusion::OrientationFilter]: converts
//!   raw accelerometer + magnetometer vector pairs into a de-noised,
//!   change-gated stream of orientation samples.
//! - [`ranker`] – [`rank_by_bearing`][ranker::rank_by_bearing]: deterministic
//!   total ordering of candidate points by bearing from the observer.

pub mod fusion;
pub mod geodesy;
pub mod ranker;
