//! LIST executor and paginated enumeration helpers

use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use crate::models::OperationResult;
use crate::storage::{StorageClient, StorageError, StorageOperation, StorageResult};

/// Totals of one complete enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSummary {
    pub keys: u64,
    pub pages: u64,
}

/// Walk every page under `prefix`, handing each page's keys to `visit`.
///
/// Any page failure fails the whole walk.
pub async fn for_each_page<F>(
    client: &dyn StorageClient,
    prefix: &str,
    page_size: i32,
    mut visit: F,
) -> StorageResult<ListingSummary>
where
    F: FnMut(Vec<String>),
{
    let mut summary = ListingSummary { keys: 0, pages: 0 };
    let mut token: Option<String> = None;

    loop {
        let page = client.list_objects(prefix, token.take(), page_size).await?;
        summary.pages += 1;
        summary.keys += page.keys.len() as u64;
        visit(page.keys);

        match page.next_token {
            Some(next) if next.is_empty() => {
                return Err(StorageError::new(
                    StorageOperation::ListObjects,
                    "empty continuation token",
                ));
            }
            Some(next) => token = Some(next),
            None => return Ok(summary),
        }
    }
}

/// Count every key under `prefix`
pub async fn list_all(
    client: &dyn StorageClient,
    prefix: &str,
    page_size: i32,
) -> StorageResult<ListingSummary> {
    for_each_page(client, prefix, page_size, |_| {}).await
}

/// Collect every key under `prefix`, in listing order
pub async fn collect_keys(
    client: &dyn StorageClient,
    prefix: &str,
    page_size: i32,
) -> StorageResult<Vec<String>> {
    let mut keys = Vec::new();
    for_each_page(client, prefix, page_size, |page| keys.extend(page)).await?;
    Ok(keys)
}

pub struct ListExecutor {
    client: Arc<dyn StorageClient>,
    worker_id: usize,
    prefix: String,
    page_size: i32,
}

impl ListExecutor {
    pub fn new(
        client: Arc<dyn StorageClient>,
        worker_id: usize,
        prefix: impl Into<String>,
        page_size: i32,
    ) -> Self {
        Self {
            client,
            worker_id,
            prefix: prefix.into(),
            page_size,
        }
    }

    /// One full enumeration; latency spans first request to last response
    pub async fn execute(&mut self) -> OperationResult {
        let start = Instant::now();
        let outcome = list_all(self.client.as_ref(), &self.prefix, self.page_size).await;
        let latency = start.elapsed();

        match outcome {
            Ok(summary) => OperationResult::listed(summary.keys, latency),
            Err(err) => {
                debug!(worker = self.worker_id, prefix = %self.prefix, error = %err, "LIST failed");
                OperationResult::failure(latency)
            }
        }
    }
}
