//! Metrics
//!
//! Authentication metrics collection interfaces and implementations.

use std::collections::HashMap;
use std::sync::Mutex;

/// Metric labels.
pub type MetricLabels = HashMap<String, String>;

/// Authentication metrics interface.
#[cfg_attr(test, mockall::automock)]
pub trait AuthMetrics: Send + Sync {
    /// Record a sign-in attempt.
    fn record_sign_in(&self, success: bool);

    /// Record token refresh.
    fn record_token_refresh(&self, success: bool);

    /// Record a sign-out that cleared a session.
    fn record_sign_out(&self);

    /// Record error.
    fn record_error(&self, error_code: &str);
}

/// No-op metrics implementation.
pub struct NoOpMetrics;

impl AuthMetrics for NoOpMetrics {
    fn record_sign_in(&self, _success: bool) {}
    fn record_token_refresh(&self, _success: bool) {}
    fn record_sign_out(&self) {}
    fn record_error(&self, _error_code: &str) {}
}

/// No-op metrics singleton.
pub fn no_op_metrics() -> NoOpMetrics {
    NoOpMetrics
}

/// Metric entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub labels: MetricLabels,
    pub timestamp: u64,
}

/// In-memory metrics for testing.
pub struct InMemoryMetrics {
    entries: Mutex<Vec<MetricEntry>>,
}

impl InMemoryMetrics {
    /// Create new in-memory metrics.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Get all recorded entries.
    pub fn get_entries(&self) -> Vec<MetricEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries by name.
    pub fn get_entries_by_name(&self, name: &str) -> Vec<MetricEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn record(&self, name: &str, value: f64, labels: MetricLabels) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        self.entries.lock().unwrap().push(MetricEntry {
            name: name.to_string(),
            value,
            labels,
            timestamp: now,
        });
    }
}

impl Default for InMemoryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn labels(pairs: &[(&str, &str)]) -> MetricLabels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl AuthMetrics for InMemoryMetrics {
    fn record_sign_in(&self, success: bool) {
        self.record(
            "auth_sign_ins_total",
            1.0,
            labels(&[("success", if success { "true" } else { "false" })]),
        );
    }

    fn record_token_refresh(&self, success: bool) {
        self.record(
            "auth_token_refreshes_total",
            1.0,
            labels(&[("success", if success { "true" } else { "false" })]),
        );
    }

    fn record_sign_out(&self) {
        self.record("auth_sign_outs_total", 1.0, MetricLabels::new());
    }

    fn record_error(&self, error_code: &str) {
        self.record("auth_errors_total", 1.0, labels(&[("code", error_code)]));
    }
}

/// Create in-memory metrics for testing.
pub fn create_in_memory_metrics() -> InMemoryMetrics {
    InMemoryMetrics::new()
}
