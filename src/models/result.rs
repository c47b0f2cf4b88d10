//! Benchmark result data models
//!
//! Contains the aggregate report computed once after all workers stop,
//! and the persisted record of a whole run.

use crate::config::{BenchmarkConfig, OperationKind};
use crate::models::stats::WorkerStats;
use crate::util::units::{calculate_ops_per_second, calculate_throughput_mbps, BYTES_PER_MB};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

/// Final, read-only statistics of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub operation: OperationKind,
    /// Number of workers merged into this report
    pub workers: usize,
    pub total_operations: u64,
    pub successes: u64,
    pub errors: u64,
    /// Wall time from scheduler start to the last worker's exit
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    pub operations_per_second: f64,
    /// Mean latency of successful operations; 0 when nothing succeeded
    pub average_latency_ms: f64,
    pub total_bytes: u64,
    pub throughput_mbps: f64,
    pub objects_listed: u64,
}

impl AggregateReport {
    /// Merge every worker's totals. Pure; runs once after all workers stopped.
    pub fn from_worker_stats(
        operation: OperationKind,
        stats: &[WorkerStats],
        elapsed: Duration,
    ) -> Self {
        let mut total_operations = 0u64;
        let mut successes = 0u64;
        let mut total_bytes = 0u64;
        let mut success_latency = Duration::ZERO;
        let mut objects_listed = 0u64;

        for worker in stats {
            total_operations += worker.attempts;
            successes += worker.successes;
            total_bytes += worker.bytes_transferred;
            success_latency += worker.success_latency;
            objects_listed += worker.objects_listed;
        }

        let average_latency_ms = if successes > 0 {
            success_latency.as_secs_f64() * 1000.0 / successes as f64
        } else {
            0.0
        };

        Self {
            operation,
            workers: stats.len(),
            total_operations,
            successes,
            errors: total_operations - successes,
            elapsed,
            operations_per_second: calculate_ops_per_second(total_operations, elapsed),
            average_latency_ms,
            total_bytes,
            throughput_mbps: calculate_throughput_mbps(total_bytes, elapsed),
            objects_listed,
        }
    }

    /// Data transferred in MB (2^20 bytes)
    pub fn megabytes_transferred(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_MB
    }

    /// Mean keys per LIST operation
    pub fn average_objects_per_list(&self) -> f64 {
        if self.total_operations == 0 {
            0.0
        } else {
            self.objects_listed as f64 / self.total_operations as f64
        }
    }

    /// Fixed-format text block printed at the end of a run
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} Benchmark Results ===", self.operation.description());
        let _ = writeln!(out, "Duration: {:.2}s", self.elapsed.as_secs_f64());
        let _ = writeln!(out, "Total operations: {}", self.total_operations);
        let _ = writeln!(out, "Successful: {}", self.successes);
        let _ = writeln!(out, "Errors: {}", self.errors);
        let _ = writeln!(out, "Operations/sec: {:.2}", self.operations_per_second);
        let _ = writeln!(out, "Average latency: {:.2} ms", self.average_latency_ms);
        let _ = writeln!(out, "Data transferred: {:.2} MB", self.megabytes_transferred());
        let _ = writeln!(out, "Throughput: {:.2} MB/s", self.throughput_mbps);
        if self.operation == OperationKind::List {
            let _ = writeln!(out, "Total objects listed: {}", self.objects_listed);
            let _ = writeln!(out, "Avg objects per list: {:.2}", self.average_objects_per_list());
        }
        out
    }
}

/// Persisted record of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Timestamp when the run finished
    pub timestamp: DateTime<Utc>,
    /// Configuration used for this run; the secret key is never stored
    pub config: BenchmarkConfig,
    pub report: AggregateReport,
}

impl BenchmarkResult {
    pub fn new(config: BenchmarkConfig, report: AggregateReport) -> Self {
        Self {
            timestamp: Utc::now(),
            config,
            report,
        }
    }

    /// Get a one-line summary of the run
    pub fn summary(&self) -> String {
        format!(
            "{} - {} {} x{} - {:.2} ops/s - {:.2} MB/s - {:.2}ms avg latency - {} errors",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.report.operation.description(),
            self.config.bucket,
            self.report.workers,
            self.report.operations_per_second,
            self.report.throughput_mbps,
            self.report.average_latency_ms,
            self.report.errors
        )
    }
}

// Durations are stored as nanoseconds
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
