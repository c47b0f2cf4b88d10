//! Benchmark engine module
//!
//! Contains the worker scheduler, the PUT/GET/LIST executors and the
//! multipart upload state machine.

pub mod engine;
pub mod executor;
pub mod get;
pub mod keys;
pub mod list;
pub mod multipart;
pub mod put;
pub mod worker;

// Re-export commonly used types
pub use engine::BenchmarkEngine;
pub use executor::WorkerExecutor;
pub use keys::{object_key, KeyCursor};
pub use multipart::{MultipartUploadSession, PartPlan, UploadPath, MAX_PART_COUNT};
pub use worker::{ProgressUpdate, PROGRESS_INTERVAL};
