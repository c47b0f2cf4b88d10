//! Per-worker operation dispatch

use crate::bench::get::GetExecutor;
use crate::bench::list::ListExecutor;
use crate::bench::put::PutExecutor;
use crate::config::OperationKind;
use crate::models::OperationResult;

/// The single-operation logic a worker runs in its loop
pub enum WorkerExecutor {
    Put(PutExecutor),
    Get(GetExecutor),
    List(ListExecutor),
}

impl WorkerExecutor {
    pub fn kind(&self) -> OperationKind {
        match self {
            WorkerExecutor::Put(_) => OperationKind::Put,
            WorkerExecutor::Get(_) => OperationKind::Get,
            WorkerExecutor::List(_) => OperationKind::List,
        }
    }

    /// Run exactly one operation. Never fails; errors become failed results.
    pub async fn execute(&mut self) -> OperationResult {
        match self {
            WorkerExecutor::Put(executor) => executor.execute().await,
            WorkerExecutor::Get(executor) => executor.execute().await,
            WorkerExecutor::List(executor) => executor.execute().await,
        }
    }
}
