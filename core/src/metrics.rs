//! Call-count metric contract toward the external metrics aggregator.
//!
//! The engine only ever calls `get_or_create_metric(name).increment_call_count()`;
//! aggregation and shipping are somebody else's concern.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A single named counter.
pub trait Metric: Send + Sync {
    fn increment_call_count(&self);
    fn call_count(&self) -> u64;
}

/// Factory surface of the metrics aggregator.
pub trait Metrics: Send + Sync {
    fn get_or_create_metric(&self, name: &str) -> Arc<dyn Metric>;
}

/// Metric name bumped the first time a module is successfully instrumented.
pub fn loaded_metric(module_name: &str) -> String {
    format!("supportability/instrumentation/loaded/{module_name}")
}

#[derive(Default)]
struct CounterMetric {
    count: AtomicU64,
}

impl Metric for CounterMetric {
    fn increment_call_count(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn call_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Discards every increment. The default when no aggregator is attached.
#[derive(Debug, Default)]
pub struct NullMetrics;

impl Metrics for NullMetrics {
    fn get_or_create_metric(&self, _name: &str) -> Arc<dyn Metric> {
        Arc::new(CounterMetric::default())
    }
}

/// In-memory aggregator used by tests and local diagnostics.
#[derive(Default)]
pub struct RecordingMetrics {
    counters: Mutex<HashMap<String, Arc<CounterMetric>>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `name`; zero when the metric was never created.
    pub fn count(&self, name: &str) -> u64 {
        self.counters()
            .get(name)
            .map(|metric| metric.call_count())
            .unwrap_or(0)
    }

    /// Names of every metric created so far, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.counters().keys().cloned().collect();
        names.sort();
        names
    }

    fn counters(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<CounterMetric>>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Metrics for RecordingMetrics {
    fn get_or_create_metric(&self, name: &str) -> Arc<dyn Metric> {
        let mut counters = self.counters();
        let metric = counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CounterMetric::default()));
        metric.clone()
    }
}
