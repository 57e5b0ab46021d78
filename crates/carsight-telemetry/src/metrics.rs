//! Metrics collection and reporting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counter name for frame outcomes, labelled by `outcome`
pub const FRAMES_TOTAL: &str = "carsight_frames_total";

/// Histogram name for per-frame classification latency
pub const CLASSIFICATION_LATENCY_US: &str = "carsight_classification_latency_us";

/// Register descriptions for the exported metrics.
///
/// Call once at startup, after the recorder is installed.
pub fn describe() {
    ::metrics::describe_counter!(
        FRAMES_TOTAL,
        "Frames offered to the classifier, by outcome (admitted, dropped, completed, failed)"
    );
    ::metrics::describe_histogram!(
        CLASSIFICATION_LATENCY_US,
        ::metrics::Unit::Microseconds,
        "Time from frame admission to classification result"
    );
}

/// Frame admission and classification counters for one adapter
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    frames_submitted: AtomicU64,
    frames_admitted: AtomicU64,
    frames_dropped: AtomicU64,
    classifications_completed: AtomicU64,
    classifications_failed: AtomicU64,
    total_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                frames_submitted: AtomicU64::new(0),
                frames_admitted: AtomicU64::new(0),
                frames_dropped: AtomicU64::new(0),
                classifications_completed: AtomicU64::new(0),
                classifications_failed: AtomicU64::new(0),
                total_latency_us: AtomicU64::new(0),
            }),
        }
    }

    /// Record a frame accepted for classification
    pub fn record_admitted(&self) {
        self.inner.frames_submitted.fetch_add(1, Ordering::Relaxed);
        self.inner.frames_admitted.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(FRAMES_TOTAL, "outcome" => "admitted").increment(1);
    }

    /// Record a frame dropped because a classification was in flight
    pub fn record_dropped(&self) {
        self.inner.frames_submitted.fetch_add(1, Ordering::Relaxed);
        self.inner.frames_dropped.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(FRAMES_TOTAL, "outcome" => "dropped").increment(1);
    }

    /// Record a successful classification and its latency
    pub fn record_completed(&self, elapsed: Duration) {
        let latency_us = elapsed.as_micros() as u64;
        self.inner
            .classifications_completed
            .fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
        ::metrics::counter!(FRAMES_TOTAL, "outcome" => "completed").increment(1);
        ::metrics::histogram!(CLASSIFICATION_LATENCY_US).record(latency_us as f64);
    }

    /// Record a failed classification
    pub fn record_failed(&self) {
        self.inner
            .classifications_failed
            .fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(FRAMES_TOTAL, "outcome" => "failed").increment(1);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_submitted: self.inner.frames_submitted.load(Ordering::Relaxed),
            frames_admitted: self.inner.frames_admitted.load(Ordering::Relaxed),
            frames_dropped: self.inner.frames_dropped.load(Ordering::Relaxed),
            classifications_completed: self
                .inner
                .classifications_completed
                .load(Ordering::Relaxed),
            classifications_failed: self.inner.classifications_failed.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub frames_submitted: u64,
    pub frames_admitted: u64,
    pub frames_dropped: u64,
    pub classifications_completed: u64,
    pub classifications_failed: u64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Average latency of successful classifications
    pub fn avg_latency_us(&self) -> u64 {
        if self.classifications_completed == 0 {
            0
        } else {
            self.total_latency_us / self.classifications_completed
        }
    }

    /// Share of submitted frames that were dropped
    pub fn drop_rate(&self) -> f64 {
        if self.frames_submitted == 0 {
            0.0
        } else {
            self.frames_dropped as f64 / self.frames_submitted as f64
        }
    }

    /// Admitted frames whose classification has not finished yet
    pub fn in_flight(&self) -> u64 {
        self.frames_admitted
            .saturating_sub(self.classifications_completed + self.classifications_failed)
    }
}
