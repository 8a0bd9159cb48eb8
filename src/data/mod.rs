//! Telemetry data loading.
//!
//! This module reads the telemetry file once at startup and hands the
//! rest of the application an immutable [`Dataset`](crate::models::Dataset).

pub mod loader;

pub use loader::load_dataset;
