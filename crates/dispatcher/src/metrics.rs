//! Per-replica counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single replica pool
#[derive(Debug, Default)]
pub struct ReplicaMetrics {
    /// Tasks currently being invoked
    in_flight: AtomicUsize,
    /// Responses without error
    success_count: AtomicU64,
    /// Responses carrying an error
    failure_count: AtomicU64,
}

impl ReplicaMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks currently being invoked
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub(crate) fn begin(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn finish(&self, success: bool) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        if success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get success count
    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            in_flight: self.in_flight(),
            success_count: self.success_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of replica metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub in_flight: usize,
    pub success_count: u64,
    pub failure_count: u64,
}
