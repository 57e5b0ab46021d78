//! CarSight Telemetry
//!
//! Counters for the frame classification adapter: how many frames were
//! offered, admitted, dropped for backpressure, and how classifications
//! ended. Counts are kept in-process for snapshots and mirrored to the
//! `metrics` facade for whichever exporter the host installs.

pub mod metrics;

pub use metrics::{MetricsCollector, MetricsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
}
