//! Telemetry
//!
//! Metrics for authentication operations. Logging goes through `tracing`
//! directly at each call site.

pub mod metrics;

pub use metrics::{
    create_in_memory_metrics, no_op_metrics, AuthMetrics, InMemoryMetrics, MetricEntry,
    MetricLabels, NoOpMetrics,
};

#[cfg(test)]
pub use metrics::MockAuthMetrics;
