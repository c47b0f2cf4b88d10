//! Data models module
//!
//! Per-operation outcomes, per-worker totals and the final report.

pub mod result;
pub mod stats;

// Re-export commonly used types
pub use result::{AggregateReport, BenchmarkResult};
pub use stats::{OperationResult, WorkerStats};
