//! In-process counters for API traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector shared by every clone of an API client.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total API calls issued
    pub api_calls: AtomicU64,
    /// API calls answered with a non-2xx status
    pub api_errors: AtomicU64,
    /// Successful logins
    pub logins: AtomicU64,
    /// Operation status polls
    pub status_polls: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_api_calls(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_api_errors(&self) {
        self.api_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins(&self) {
        self.logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_status_polls(&self) {
        self.status_polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            api_calls: self.api_calls.load(Ordering::Relaxed),
            api_errors: self.api_errors.load(Ordering::Relaxed),
            logins: self.logins.load(Ordering::Relaxed),
            status_polls: self.status_polls.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub api_calls: u64,
    pub api_errors: u64,
    pub logins: u64,
    pub status_polls: u64,
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.inc_api_calls();
        metrics.inc_api_calls();
        metrics.inc_api_errors();
        metrics.inc_logins();
        metrics.inc_status_polls();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                api_calls: 2,
                api_errors: 1,
                logins: 1,
                status_polls: 1,
            }
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(Metrics::new().snapshot()).unwrap();
        assert_eq!(json["api_calls"], 0);
        assert_eq!(json["status_polls"], 0);
    }
}
