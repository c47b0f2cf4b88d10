//! Benchmark engine
//!
//! Fans out `concurrency` workers against one shared storage client,
//! waits for all of them, and merges their private statistics once.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::bench::executor::WorkerExecutor;
use crate::bench::get::GetExecutor;
use crate::bench::keys::KeyCursor;
use crate::bench::list::{collect_keys, ListExecutor};
use crate::bench::put::PutExecutor;
use crate::bench::worker::{run_worker, ProgressUpdate};
use crate::config::{BenchmarkConfig, KeySelection, OperationKind};
use crate::models::{AggregateReport, WorkerStats};
use crate::storage::StorageClient;
use crate::util::units::{describe_size, format_duration};
use crate::{LoadGenError, Result};

pub struct BenchmarkEngine {
    config: BenchmarkConfig,
    client: Arc<dyn StorageClient>,
}

impl BenchmarkEngine {
    /// Validates the configuration; nothing runs on an invalid one
    pub fn new(config: BenchmarkConfig, client: Arc<dyn StorageClient>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run the benchmark to its deadline and return the merged report.
    ///
    /// Errors are limited to pre-run key discovery and worker tasks that
    /// panicked; failed storage calls only show up in the error count.
    pub async fn run(
        &self,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<AggregateReport> {
        let executors = self.build_executors().await?;

        info!(
            operation = %self.config.operation,
            workers = self.config.concurrency,
            duration = %format_duration(self.config.duration),
            bucket = %self.config.bucket,
            prefix = %self.config.prefix,
            "starting benchmark"
        );

        let start = Instant::now();
        let deadline = start + self.config.duration;

        let handles: Vec<JoinHandle<WorkerStats>> = executors
            .into_iter()
            .enumerate()
            .map(|(worker_id, executor)| {
                tokio::spawn(run_worker(worker_id, executor, deadline, progress_tx.clone()))
            })
            .collect();
        drop(progress_tx);

        let mut stats = Vec::with_capacity(handles.len());
        let mut join_errors = Vec::new();
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(worker_stats) => stats.push(worker_stats),
                Err(err) => {
                    warn!(worker = worker_id, error = %err, "worker task failed");
                    join_errors.push(format!("worker {}: {}", worker_id, err));
                }
            }
        }
        let elapsed = start.elapsed();

        if !join_errors.is_empty() {
            return Err(LoadGenError::WorkerError(join_errors.join("; ")));
        }

        let report = AggregateReport::from_worker_stats(self.config.operation, &stats, elapsed);
        info!(
            operation = %report.operation,
            operations = report.total_operations,
            errors = report.errors,
            elapsed = %format_duration(elapsed),
            "benchmark finished"
        );
        Ok(report)
    }

    async fn build_executors(&self) -> Result<Vec<WorkerExecutor>> {
        let workers = self.config.concurrency;

        match self.config.operation {
            OperationKind::Put => {
                let generator = PutExecutor::generator_for(&self.config);
                info!(
                    object_size = %describe_size(self.config.object_size),
                    part_size = %describe_size(self.config.part_size),
                    multipart = self.config.multipart,
                    payload = ?generator.kind(),
                    "PUT workload"
                );
                Ok((0..workers)
                    .map(|id| {
                        WorkerExecutor::Put(PutExecutor::with_generator(
                            &self.config,
                            self.client.clone(),
                            id,
                            generator.fork(),
                        ))
                    })
                    .collect())
            }
            OperationKind::Get => {
                let cursors = self.key_cursors().await?;
                Ok(cursors
                    .into_iter()
                    .enumerate()
                    .map(|(id, cursor)| {
                        WorkerExecutor::Get(GetExecutor::new(
                            self.client.clone(),
                            id,
                            cursor,
                            self.config.range_length,
                        ))
                    })
                    .collect())
            }
            OperationKind::List => Ok((0..workers)
                .map(|id| {
                    WorkerExecutor::List(ListExecutor::new(
                        self.client.clone(),
                        id,
                        self.config.prefix.clone(),
                        self.config.page_size,
                    ))
                })
                .collect()),
        }
    }

    async fn key_cursors(&self) -> Result<Vec<KeyCursor>> {
        let workers = self.config.concurrency;

        match self.config.key_selection {
            KeySelection::Discover => {
                let keys = collect_keys(
                    self.client.as_ref(),
                    &self.config.prefix,
                    self.config.page_size,
                )
                .await?;
                if keys.is_empty() {
                    return Err(LoadGenError::NoObjectsFound(self.config.prefix.clone()));
                }
                info!(
                    objects = keys.len(),
                    prefix = %self.config.prefix,
                    "discovered objects for GET"
                );

                let keys = Arc::new(keys);
                Ok((0..workers)
                    .map(|id| KeyCursor::discovered(keys.clone(), id, workers))
                    .collect())
            }
            KeySelection::Derived { objects_per_worker } => Ok((0..workers)
                .map(|id| KeyCursor::derived(self.config.prefix.clone(), id, objects_per_worker))
                .collect()),
        }
    }
}
