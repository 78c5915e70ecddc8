//! Observability hooks for coordinator operations.
//!
//! Implement `SplitMetrics` to feed coordinator activity into a monitoring
//! system:
//!
//! ```ignore
//! use split_kit::observability::SplitMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl SplitMetrics for PrometheusMetrics {
//!     fn record_operation(&self, op: &str, _event_id: &str, duration: Duration) {
//!         // histogram!("split_op_latency", "op" => op).record(duration);
//!     }
//!     // ... implement other methods
//! }
//!
//! // let coordinator = EventCoordinator::new(store)
//! //     .with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! The default methods log through the `log` crate. `NoOpMetrics`, the
//! coordinator's default, records nothing.

use crate::model::EventStatus;
use std::time::Duration;

/// Trait for coordinator metrics collection.
pub trait SplitMetrics: Send + Sync {
    /// Record a successfully completed operation.
    fn record_operation(&self, op: &str, event_id: &str, duration: Duration) {
        debug!("Split {} on {} took {:?}", op, event_id, duration);
    }

    /// Record a failed operation.
    fn record_error(&self, op: &str, event_id: &str, error: &str) {
        warn!("Split {} on {} failed: {}", op, event_id, error);
    }

    /// Record an event status transition.
    fn record_status_change(&self, event_id: &str, status: EventStatus) {
        info!("Event {} is now {}", event_id, status);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl SplitMetrics for NoOpMetrics {
    fn record_operation(&self, _op: &str, _event_id: &str, _duration: Duration) {}
    fn record_error(&self, _op: &str, _event_id: &str, _error: &str) {}
    fn record_status_change(&self, _event_id: &str, _status: EventStatus) {}
}

/// Metrics that only log, using the trait's default methods.
#[derive(Clone, Default)]
pub struct LogMetrics;

impl SplitMetrics for LogMetrics {}
