//! Observability metrics for paywall resolution.
//!
//! Provides counters describing cache and deduplication behavior for
//! monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking cache and fetch statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Lookups answered from a terminal cached result
    cache_hits: AtomicU64,
    /// Lookups that joined an in-flight fetch
    requests_enqueued: AtomicU64,
    /// Lookups that claimed a signature and started a fetch
    fetches_claimed: AtomicU64,
    /// Fetches that completed with an error
    fetch_failures: AtomicU64,
    /// Completions dropped because a reset superseded them
    stale_results_dropped: AtomicU64,
    /// Claimed fetches whose task ended without completing
    fetches_abandoned: AtomicU64,
    /// Cache resets
    resets: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_enqueued(&self) {
        self.inner.requests_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch_claimed(&self) {
        self.inner.fetches_claimed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch_failure(&self) {
        self.inner.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_result(&self) {
        self.inner
            .stale_results_dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch_abandoned(&self) {
        self.inner.fetches_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reset(&self) {
        self.inner.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.inner.cache_hits.load(Ordering::Relaxed)
    }

    pub fn requests_enqueued(&self) -> u64 {
        self.inner.requests_enqueued.load(Ordering::Relaxed)
    }

    pub fn fetches_claimed(&self) -> u64 {
        self.inner.fetches_claimed.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.inner.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn stale_results_dropped(&self) -> u64 {
        self.inner.stale_results_dropped.load(Ordering::Relaxed)
    }

    pub fn fetches_abandoned(&self) -> u64 {
        self.inner.fetches_abandoned.load(Ordering::Relaxed)
    }

    pub fn resets(&self) -> u64 {
        self.inner.resets.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits(),
            requests_enqueued: self.requests_enqueued(),
            fetches_claimed: self.fetches_claimed(),
            fetch_failures: self.fetch_failures(),
            stale_results_dropped: self.stale_results_dropped(),
            fetches_abandoned: self.fetches_abandoned(),
            resets: self.resets(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub requests_enqueued: u64,
    pub fetches_claimed: u64,
    pub fetch_failures: u64,
    pub stale_results_dropped: u64,
    pub fetches_abandoned: u64,
    pub resets: u64,
}

impl MetricsSnapshot {
    /// Total lookups that reached the cache.
    pub fn total_lookups(&self) -> u64 {
        self.cache_hits
            .saturating_add(self.requests_enqueued)
            .saturating_add(self.fetches_claimed)
    }

    /// Fraction of lookups that did not start a fetch (0.0 to 1.0).
    ///
    /// Returns 0.0 if no lookups have happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_lookups();
        if total == 0 {
            0.0
        } else {
            (total - self.fetches_claimed) as f64 / total as f64
        }
    }
}
