//! Telemetry analysis.
//!
//! The aggregator is the only computation the service performs; the
//! server and report layers both call into it.

pub mod aggregator;

pub use aggregator::*;
