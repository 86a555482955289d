//! Global atomic counters for pipeline observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    rounds: AtomicU64,
    retrieval_calls: AtomicU64,
    oracle_calls: AtomicU64,
    segments_selected: AtomicU64,
    segments_skipped: AtomicU64,
    segments_failed: AtomicU64,
    fallbacks: AtomicU64,
    exhausted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub rounds: u64,
    pub retrieval_calls: u64,
    pub oracle_calls: u64,
    pub segments_selected: u64,
    pub segments_skipped: u64,
    pub segments_failed: u64,
    pub fallbacks: u64,
    pub exhausted: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            rounds: AtomicU64::new(0),
            retrieval_calls: AtomicU64::new(0),
            oracle_calls: AtomicU64::new(0),
            segments_selected: AtomicU64::new(0),
            segments_skipped: AtomicU64::new(0),
            segments_failed: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    pub fn inc_rounds(&self) {
        Self::bump(&self.rounds, "rounds");
    }

    pub fn inc_retrieval_calls(&self) {
        Self::bump(&self.retrieval_calls, "retrieval_calls");
    }

    pub fn inc_oracle_calls(&self) {
        Self::bump(&self.oracle_calls, "oracle_calls");
    }

    pub fn inc_segments_selected(&self) {
        Self::bump(&self.segments_selected, "segments_selected");
    }

    /// Counts every SKIP, including those forced by a port failure.
    pub fn inc_segments_skipped(&self) {
        Self::bump(&self.segments_skipped, "segments_skipped");
    }

    pub fn inc_segments_failed(&self) {
        Self::bump(&self.segments_failed, "segments_failed");
    }

    pub fn inc_fallbacks(&self) {
        Self::bump(&self.fallbacks, "fallbacks");
    }

    pub fn inc_exhausted(&self) {
        Self::bump(&self.exhausted, "exhausted");
    }

    /// Read every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rounds: self.rounds.load(Ordering::Relaxed),
            retrieval_calls: self.retrieval_calls.load(Ordering::Relaxed),
            oracle_calls: self.oracle_calls.load(Ordering::Relaxed),
            segments_selected: self.segments_selected.load(Ordering::Relaxed),
            segments_skipped: self.segments_skipped.load(Ordering::Relaxed),
            segments_failed: self.segments_failed.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a run) rather than on every
    /// increment.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            rounds = s.rounds,
            retrieval_calls = s.retrieval_calls,
            oracle_calls = s.oracle_calls,
            segments_selected = s.segments_selected,
            segments_skipped = s.segments_skipped,
            segments_failed = s.segments_failed,
            fallbacks = s.fallbacks,
            exhausted = s.exhausted,
        );
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.rounds,
            &self.retrieval_calls,
            &self.oracle_calls,
            &self.segments_selected,
            &self.segments_skipped,
            &self.segments_failed,
            &self.fallbacks,
            &self.exhausted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
