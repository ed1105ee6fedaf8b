//! Evaluation counters with Prometheus text export

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of engine counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetrics {
    /// Full pipeline runs (cache hits excluded)
    pub evaluations: u64,

    pub cache_hits: u64,
    pub cache_misses: u64,

    /// Decisions returned, cached or not
    pub allowed: u64,
    pub denied: u64,

    /// Requests that failed with an error
    pub errors: u64,
}

impl EngineMetrics {
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed + self.denied;
        if total == 0 {
            0.0
        } else {
            self.allowed as f64 / total as f64
        }
    }
}

/// Lock-free counters updated on the decision path
#[derive(Debug, Default)]
pub struct MetricsCollector {
    evaluations: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    errors: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_evaluation(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decision(&self, allowed: bool) {
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineMetrics {
        EngineMetrics {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.evaluations,
            &self.cache_hits,
            &self.cache_misses,
            &self.allowed,
            &self.denied,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Export counters in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let metrics = self.snapshot();

        format!(
            r#"# HELP acx_evaluations_total Authorization pipeline evaluations
# TYPE acx_evaluations_total counter
acx_evaluations_total {}

# HELP acx_allowed_total Number of allowed decisions
# TYPE acx_allowed_total counter
acx_allowed_total {}

# HELP acx_denied_total Number of denied decisions
# TYPE acx_denied_total counter
acx_denied_total {}

# HELP acx_cache_hits_total Decision cache hits
# TYPE acx_cache_hits_total counter
acx_cache_hits_total {}

# HELP acx_cache_misses_total Decision cache misses
# TYPE acx_cache_misses_total counter
acx_cache_misses_total {}

# HELP acx_errors_total Failed authorization requests
# TYPE acx_errors_total counter
acx_errors_total {}
"#,
            metrics.evaluations,
            metrics.allowed,
            metrics.denied,
            metrics.cache_hits,
            metrics.cache_misses,
            metrics.errors,
        )
    }
}
