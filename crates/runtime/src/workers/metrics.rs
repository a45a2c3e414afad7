//! Authority throughput counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the authority worker and replica sessions.
///
/// Uses atomics for lock-free access across threads.
#[derive(Debug, Default)]
pub struct AuthorityMetrics {
    applied: AtomicU64,
    rejected: AtomicU64,
    deltas_published: AtomicU64,
    resyncs_served: AtomicU64,
}

impl AuthorityMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deltas(&self, count: u64) {
        self.deltas_published.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_resync(&self) {
        self.resyncs_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn deltas_published(&self) -> u64 {
        self.deltas_published.load(Ordering::Relaxed)
    }

    pub fn resyncs_served(&self) -> u64 {
        self.resyncs_served.load(Ordering::Relaxed)
    }

    /// Share of requests that were applied, as a percentage (0-100).
    pub fn acceptance_rate(&self) -> f64 {
        let applied = self.applied();
        let total = applied + self.rejected();
        if total == 0 {
            100.0
        } else {
            (applied as f64 / total as f64) * 100.0
        }
    }

    /// Creates a snapshot of all metrics for display/logging.
    ///
    /// Individual fields are read atomically but the snapshot as a whole may
    /// be inconsistent if requests are in flight.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            applied: self.applied(),
            rejected: self.rejected(),
            deltas_published: self.deltas_published(),
            resyncs_served: self.resyncs_served(),
            acceptance_rate: self.acceptance_rate(),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub applied: u64,
    pub rejected: u64,
    pub deltas_published: u64,
    pub resyncs_served: u64,
    pub acceptance_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceptance_rate_counts_both_outcomes() {
        let metrics = AuthorityMetrics::new();
        assert_eq!(metrics.acceptance_rate(), 100.0);

        metrics.record_applied();
        metrics.record_applied();
        metrics.record_applied();
        metrics.record_rejected();
        metrics.record_deltas(5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.applied, 3);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.deltas_published, 5);
        assert_eq!(snapshot.acceptance_rate, 75.0);
    }
}
