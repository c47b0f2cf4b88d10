//! Run history persistence
//!
//! Keeps a bounded JSON log of past benchmark runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::OperationKind;
use crate::models::result::BenchmarkResult;
use crate::{LoadGenError, Result, APP_NAME, MAX_RESULTS_HISTORY, RESULTS_FILE};

const HISTORY_VERSION: u32 = 1;

/// Run history store
#[derive(Debug)]
pub struct ResultsStorage {
    results_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResultsFile {
    version: u32,
    results: Vec<BenchmarkResult>,
}

/// Which stored runs a history query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Only runs of this workload; all workloads when unset
    pub operation: Option<OperationKind>,
    /// Most recent runs kept after filtering
    pub limit: usize,
}

impl HistoryFilter {
    pub fn recent(limit: usize) -> Self {
        Self {
            operation: None,
            limit,
        }
    }

    pub fn with_operation(mut self, operation: Option<OperationKind>) -> Self {
        self.operation = operation;
        self
    }

    fn matches(&self, result: &BenchmarkResult) -> bool {
        self.operation
            .map_or(true, |operation| result.report.operation == operation)
    }
}

fn persistence_error(action: &str, path: &Path, err: impl std::fmt::Display) -> LoadGenError {
    LoadGenError::PersistenceError(format!("Failed to {} {}: {}", action, path.display(), err))
}

/// Keep only the newest `limit` entries of an oldest-first list
fn keep_newest(results: &mut Vec<BenchmarkResult>, limit: usize) {
    if results.len() > limit {
        let excess = results.len() - limit;
        results.drain(..excess);
    }
}

impl ResultsStorage {
    /// History store at the standard location
    pub fn new() -> Result<Self> {
        let results_path = Self::results_file_path()?;
        Ok(Self { results_path })
    }

    /// History store backed by an explicit file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            results_path: path.into(),
        }
    }

    /// `$DATA_HOME/s3-load-gen/results.json`
    pub fn results_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            LoadGenError::PersistenceError("Unable to determine data directory".to_string())
        })?;
        Ok(data_dir.join(APP_NAME).join(RESULTS_FILE))
    }

    /// Load all stored runs, oldest first
    pub fn load_results(&self) -> Result<Vec<BenchmarkResult>> {
        if !self.results_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.results_path)
            .map_err(|e| persistence_error("read results file", &self.results_path, e))?;
        let results_file: ResultsFile = serde_json::from_str(&content)
            .map_err(|e| persistence_error("parse results file", &self.results_path, e))?;

        if results_file.version != HISTORY_VERSION {
            return Err(LoadGenError::PersistenceError(format!(
                "Unsupported results file version {} in {}",
                results_file.version,
                self.results_path.display()
            )));
        }
        Ok(results_file.results)
    }

    /// Append a run, dropping the oldest entries beyond MAX_RESULTS_HISTORY
    pub fn append_result(&self, result: BenchmarkResult) -> Result<()> {
        let mut results = self.load_results()?;
        results.push(result);
        keep_newest(&mut results, MAX_RESULTS_HISTORY);
        self.save_results(results)
    }

    fn save_results(&self, results: Vec<BenchmarkResult>) -> Result<()> {
        if let Some(parent) = self.results_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| persistence_error("create results directory", parent, e))?;
        }

        let entries = results.len();
        let content = serde_json::to_string_pretty(&ResultsFile {
            version: HISTORY_VERSION,
            results,
        })?;
        fs::write(&self.results_path, content)
            .map_err(|e| persistence_error("write results file", &self.results_path, e))?;

        debug!(path = %self.results_path.display(), entries, "run history saved");
        Ok(())
    }

    /// Number of stored runs matching `operation` (all runs when `None`)
    pub fn count_results(&self, operation: Option<OperationKind>) -> Result<usize> {
        let filter = HistoryFilter::recent(usize::MAX).with_operation(operation);
        Ok(self
            .load_results()?
            .iter()
            .filter(|result| filter.matches(result))
            .count())
    }

    /// Remove the history file
    pub fn clear_results(&self) -> Result<()> {
        if self.results_path.exists() {
            fs::remove_file(&self.results_path)
                .map_err(|e| persistence_error("remove results file", &self.results_path, e))?;
        }
        Ok(())
    }

    /// The newest runs selected by `filter`, oldest first
    pub fn query(&self, filter: HistoryFilter) -> Result<Vec<BenchmarkResult>> {
        let mut results = self.load_results()?;
        results.retain(|result| filter.matches(result));
        keep_newest(&mut results, filter.limit);
        Ok(results)
    }

    pub fn path(&self) -> &Path {
        &self.results_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BenchmarkConfig, OperationKind};
    use crate::models::{AggregateReport, WorkerStats};
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_result(successes: u64) -> BenchmarkResult {
        create_result_for(OperationKind::Put, successes)
    }

    fn create_result_for(operation: OperationKind, successes: u64) -> BenchmarkResult {
        let mut stats = WorkerStats::new(0);
        stats.attempts = successes;
        stats.successes = successes;
        stats.bytes_transferred = successes * 1024;
        stats.success_latency = Duration::from_millis(successes);

        let preset = match operation {
            OperationKind::Put => BenchmarkConfig::put(),
            OperationKind::Get => BenchmarkConfig::get(),
            OperationKind::List => BenchmarkConfig::list(),
        };
        let config = preset
            .with_endpoint("http://localhost:9000")
            .with_bucket("bench");
        let report = AggregateReport::from_worker_stats(
            operation,
            &[stats],
            Duration::from_secs(10),
        );
        BenchmarkResult::new(config, report)
    }

    fn temp_storage() -> (TempDir, ResultsStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = ResultsStorage::at(temp_dir.path().join("results.json"));
        (temp_dir, storage)
    }

    #[test]
    fn test_load_empty_results() {
        let (_dir, storage) = temp_storage();
        assert!(storage.load_results().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_load_result() {
        let (_dir, storage) = temp_storage();
        storage.append_result(create_test_result(7)).unwrap();

        let results = storage.load_results().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].report.successes, 7);
        assert_eq!(results[0].config.bucket, "bench");
    }

    #[test]
    fn test_results_rotation() {
        let (_dir, storage) = temp_storage();

        for i in 0..MAX_RESULTS_HISTORY + 10 {
            storage.append_result(create_test_result(i as u64)).unwrap();
        }

        let results = storage.load_results().unwrap();
        assert_eq!(results.len(), MAX_RESULTS_HISTORY);
        assert_eq!(results[0].report.successes, 10);
        assert_eq!(
            results[results.len() - 1].report.successes,
            (MAX_RESULTS_HISTORY + 10 - 1) as u64
        );
    }

    #[test]
    fn test_clear_results() {
        let (_dir, storage) = temp_storage();
        for i in 0..3 {
            storage.append_result(create_test_result(i)).unwrap();
        }
        assert_eq!(storage.count_results(None).unwrap(), 3);

        storage.clear_results().unwrap();
        assert_eq!(storage.count_results(None).unwrap(), 0);
    }

    #[test]
    fn test_query_recent_results() {
        let (_dir, storage) = temp_storage();
        for i in 0..10 {
            storage.append_result(create_test_result(i)).unwrap();
        }

        let recent = storage.query(HistoryFilter::recent(5)).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].report.successes, 5);
        assert_eq!(recent[4].report.successes, 9);

        assert_eq!(storage.query(HistoryFilter::recent(20)).unwrap().len(), 10);
    }

    #[test]
    fn test_query_filters_by_operation_before_limit() {
        let (_dir, storage) = temp_storage();
        storage.append_result(create_result_for(OperationKind::Get, 1)).unwrap();
        storage.append_result(create_result_for(OperationKind::Put, 2)).unwrap();
        storage.append_result(create_result_for(OperationKind::Get, 3)).unwrap();
        storage.append_result(create_result_for(OperationKind::List, 4)).unwrap();
        storage.append_result(create_result_for(OperationKind::Put, 5)).unwrap();

        let gets = storage
            .query(HistoryFilter::recent(10).with_operation(Some(OperationKind::Get)))
            .unwrap();
        let successes: Vec<u64> = gets.iter().map(|r| r.report.successes).collect();
        assert_eq!(successes, vec![1, 3]);

        // The limit applies to the filtered runs, not to the whole file
        let last_put = storage
            .query(HistoryFilter::recent(1).with_operation(Some(OperationKind::Put)))
            .unwrap();
        assert_eq!(last_put.len(), 1);
        assert_eq!(last_put[0].report.successes, 5);

        assert_eq!(storage.count_results(Some(OperationKind::List)).unwrap(), 1);
        assert_eq!(storage.count_results(None).unwrap(), 5);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let (_dir, storage) = temp_storage();
        fs::write(storage.path(), r#"{"version": 99, "results": []}"#).unwrap();
        assert!(matches!(
            storage.load_results(),
            Err(LoadGenError::PersistenceError(_))
        ));
    }

    #[test]
    fn test_results_file_format() {
        let (_dir, storage) = temp_storage();
        storage.append_result(create_test_result(1)).unwrap();

        let content = fs::read_to_string(storage.path()).unwrap();
        let results_file: ResultsFile = serde_json::from_str(&content).unwrap();
        assert_eq!(results_file.version, HISTORY_VERSION);
        assert_eq!(results_file.results.len(), 1);
        assert!(!content.contains("secret_key"));
    }

    #[test]
    fn test_corrupt_file_is_persistence_error() {
        let (_dir, storage) = temp_storage();
        fs::write(storage.path(), "not json").unwrap();
        assert!(matches!(
            storage.load_results(),
            Err(LoadGenError::PersistenceError(_))
        ));
    }
}
