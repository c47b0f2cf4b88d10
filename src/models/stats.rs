//! Per-operation results and per-worker running totals

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one attempted operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResult {
    pub succeeded: bool,
    /// Bytes moved; always 0 for a failed operation
    pub bytes_transferred: u64,
    pub latency: Duration,
    /// Keys enumerated by a LIST operation
    pub objects_listed: u64,
}

impl OperationResult {
    pub fn success(bytes_transferred: u64, latency: Duration) -> Self {
        Self {
            succeeded: true,
            bytes_transferred,
            latency,
            objects_listed: 0,
        }
    }

    pub fn failure(latency: Duration) -> Self {
        Self {
            succeeded: false,
            bytes_transferred: 0,
            latency,
            objects_listed: 0,
        }
    }

    /// Successful LIST enumeration of `objects` keys
    pub fn listed(objects: u64, latency: Duration) -> Self {
        Self {
            objects_listed: objects,
            ..Self::success(0, latency)
        }
    }
}

/// Running totals owned by exactly one worker for the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub attempts: u64,
    pub successes: u64,
    pub bytes_transferred: u64,
    /// Sum of latencies of successful operations only
    #[serde(with = "super::result::duration_serde")]
    pub success_latency: Duration,
    pub objects_listed: u64,
}

impl WorkerStats {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Self::default()
        }
    }

    /// Fold one operation outcome into the totals
    pub fn record(&mut self, result: &OperationResult) {
        self.attempts += 1;
        self.bytes_transferred += result.bytes_transferred;
        if result.succeeded {
            self.successes += 1;
            self.success_latency += result.latency;
            self.objects_listed += result.objects_listed;
        }
    }

    pub fn errors(&self) -> u64 {
        self.attempts - self.successes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_only_successful_latency() {
        let mut stats = WorkerStats::new(3);
        stats.record(&OperationResult::success(100, Duration::from_millis(10)));
        stats.record(&OperationResult::failure(Duration::from_secs(5)));
        stats.record(&OperationResult::success(50, Duration::from_millis(30)));

        assert_eq!(stats.worker_id, 3);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.errors(), 1);
        assert_eq!(stats.bytes_transferred, 150);
        assert_eq!(stats.success_latency, Duration::from_millis(40));
    }

    #[test]
    fn test_failed_operation_moves_no_bytes() {
        let failed = OperationResult::failure(Duration::from_millis(7));
        assert!(!failed.succeeded);
        assert_eq!(failed.bytes_transferred, 0);
    }

    #[test]
    fn test_listed_result() {
        let mut stats = WorkerStats::new(0);
        stats.record(&OperationResult::listed(5, Duration::from_millis(2)));
        assert_eq!(stats.objects_listed, 5);
        assert_eq!(stats.bytes_transferred, 0);
        assert_eq!(stats.successes, 1);
    }
}
