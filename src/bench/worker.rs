//! Worker loop
//!
//! Each worker runs its executor until the shared deadline, folding
//! results into a private [`WorkerStats`]. The deadline is only checked
//! between operations, so an in-flight request always finishes.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::bench::executor::WorkerExecutor;
use crate::models::WorkerStats;

/// Minimum spacing between progress snapshots from one worker
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Snapshot of one worker's totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub worker_id: usize,
    pub attempts: u64,
    pub successes: u64,
    pub bytes_transferred: u64,
    pub objects_listed: u64,
    /// Set on the last snapshot a worker sends
    pub finished: bool,
}

impl ProgressUpdate {
    pub fn from_stats(stats: &WorkerStats, finished: bool) -> Self {
        Self {
            worker_id: stats.worker_id,
            attempts: stats.attempts,
            successes: stats.successes,
            bytes_transferred: stats.bytes_transferred,
            objects_listed: stats.objects_listed,
            finished,
        }
    }

    pub fn errors(&self) -> u64 {
        self.attempts - self.successes
    }
}

/// Run one worker to the deadline and hand back its totals
pub async fn run_worker(
    worker_id: usize,
    mut executor: WorkerExecutor,
    deadline: Instant,
    progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
) -> WorkerStats {
    let mut stats = WorkerStats::new(worker_id);
    let mut last_progress_update = Instant::now();

    while Instant::now() < deadline {
        let result = executor.execute().await;
        stats.record(&result);

        if let Some(tx) = &progress_tx {
            if last_progress_update.elapsed() >= PROGRESS_INTERVAL {
                // A full channel drops the snapshot; the hot path never waits.
                let _ = tx.try_send(ProgressUpdate::from_stats(&stats, false));
                last_progress_update = Instant::now();
            }
        }
    }

    if let Some(tx) = &progress_tx {
        let _ = tx.try_send(ProgressUpdate::from_stats(&stats, true));
    }

    debug!(
        worker = worker_id,
        operation = %executor.kind(),
        attempts = stats.attempts,
        errors = stats.errors(),
        "worker finished"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::list::ListExecutor;
    use crate::storage::InMemoryStorage;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_expired_deadline_issues_no_operations() {
        let store = Arc::new(InMemoryStorage::new());
        let executor = WorkerExecutor::List(ListExecutor::new(store.clone(), 0, "p/", 1000));

        let stats = run_worker(0, executor, Instant::now(), None).await;
        assert_eq!(stats.attempts, 0);
        assert_eq!(store.calls().list_objects, 0);
    }

    #[tokio::test]
    async fn test_worker_reports_final_snapshot() {
        let store = Arc::new(
            InMemoryStorage::new()
                .with_object("p/a", 1)
                .with_latency(Duration::from_millis(5)),
        );
        let executor = WorkerExecutor::List(ListExecutor::new(store.clone(), 3, "p/", 1000));
        let (tx, mut rx) = mpsc::channel(64);

        let deadline = Instant::now() + Duration::from_millis(50);
        let stats = run_worker(3, executor, deadline, Some(tx)).await;
        assert!(stats.attempts > 0);
        assert_eq!(stats.attempts, stats.successes);
        assert_eq!(stats.objects_listed, stats.attempts);

        let mut last = None;
        while let Some(update) = rx.recv().await {
            last = Some(update);
        }
        let last = last.unwrap();
        assert!(last.finished);
        assert_eq!(last.worker_id, 3);
        assert_eq!(last.attempts, stats.attempts);
    }
}
