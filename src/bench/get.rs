//! GET executor: full or ranged downloads

use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use crate::bench::keys::KeyCursor;
use crate::models::OperationResult;
use crate::storage::{ByteRange, StorageClient};

pub struct GetExecutor {
    client: Arc<dyn StorageClient>,
    worker_id: usize,
    cursor: KeyCursor,
    range: Option<ByteRange>,
}

impl GetExecutor {
    /// `range_length` requests bytes `0..=N-1`; `None` downloads whole objects
    pub fn new(
        client: Arc<dyn StorageClient>,
        worker_id: usize,
        cursor: KeyCursor,
        range_length: Option<u64>,
    ) -> Self {
        Self {
            client,
            worker_id,
            cursor,
            range: range_length.and_then(ByteRange::first),
        }
    }

    pub fn range(&self) -> Option<ByteRange> {
        self.range
    }

    /// Read the next key; bytes counted are the bytes actually received
    pub async fn execute(&mut self) -> OperationResult {
        let start = Instant::now();
        let Some(key) = self.cursor.next_key() else {
            return OperationResult::failure(start.elapsed());
        };

        match self.client.get_object(&key, self.range).await {
            Ok(bytes) => {
                let counted = match self.range {
                    Some(range) => bytes.min(range.len()),
                    None => bytes,
                };
                OperationResult::success(counted, start.elapsed())
            }
            Err(err) => {
                let latency = start.elapsed();
                debug!(worker = self.worker_id, key = %key, error = %err, "GET failed");
                OperationResult::failure(latency)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        CompletedPart, FaultPlan, InMemoryStorage, ListPage, StorageError, StorageOperation,
        StorageResult,
    };
    use async_trait::async_trait;
    use bytes::Bytes;

    /// Store that answers every GET with the whole object, as a server
    /// without Range support does
    struct WholeObjectStore {
        object_size: u64,
    }

    #[async_trait]
    impl StorageClient for WholeObjectStore {
        async fn put_object(&self, _key: &str, _body: Bytes) -> StorageResult<()> {
            Ok(())
        }

        async fn initiate_multipart(&self, _key: &str) -> StorageResult<String> {
            Err(StorageError::new(StorageOperation::InitiateMultipart, "unsupported"))
        }

        async fn upload_part(
            &self,
            _key: &str,
            _upload_id: &str,
            _part_number: i32,
            _body: Bytes,
        ) -> StorageResult<String> {
            Err(StorageError::new(StorageOperation::UploadPart, "unsupported"))
        }

        async fn complete_multipart(
            &self,
            _key: &str,
            _upload_id: &str,
            _parts: &[CompletedPart],
        ) -> StorageResult<()> {
            Err(StorageError::new(StorageOperation::CompleteMultipart, "unsupported"))
        }

        async fn abort_multipart(&self, _key: &str, _upload_id: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn get_object(&self, _key: &str, _range: Option<ByteRange>) -> StorageResult<u64> {
            Ok(self.object_size)
        }

        async fn list_objects(
            &self,
            _prefix: &str,
            _continuation_token: Option<String>,
            _page_size: i32,
        ) -> StorageResult<ListPage> {
            Ok(ListPage::default())
        }
    }

    fn single_key(key: &str) -> KeyCursor {
        KeyCursor::discovered(Arc::new(vec![key.to_string()]), 0, 1)
    }

    #[tokio::test]
    async fn test_full_download_counts_object_size() {
        let store = Arc::new(InMemoryStorage::new().with_object("g/a", 5000));
        let mut executor = GetExecutor::new(store.clone(), 0, single_key("g/a"), None);

        let result = executor.execute().await;
        assert!(result.succeeded);
        assert_eq!(result.bytes_transferred, 5000);
    }

    #[tokio::test]
    async fn test_range_read_is_bounded_by_range_and_object() {
        let store = Arc::new(
            InMemoryStorage::new()
                .with_object("g/big", 10_000)
                .with_object("g/small", 100),
        );

        let mut big = GetExecutor::new(store.clone(), 0, single_key("g/big"), Some(4096));
        assert_eq!(big.range().map(|r| r.to_header()).as_deref(), Some("bytes=0-4095"));
        assert_eq!(big.execute().await.bytes_transferred, 4096);

        let mut small = GetExecutor::new(store.clone(), 0, single_key("g/small"), Some(4096));
        let result = small.execute().await;
        assert!(result.succeeded);
        assert_eq!(result.bytes_transferred, 100);
    }

    #[tokio::test]
    async fn test_range_ignored_by_store_counts_at_most_range_length() {
        let store = Arc::new(WholeObjectStore { object_size: 10_000 });

        let mut ranged = GetExecutor::new(store.clone(), 0, single_key("g/a"), Some(4096));
        let result = ranged.execute().await;
        assert!(result.succeeded);
        assert_eq!(result.bytes_transferred, 4096);

        let mut full = GetExecutor::new(store.clone(), 0, single_key("g/a"), None);
        assert_eq!(full.execute().await.bytes_transferred, 10_000);
    }

    #[tokio::test]
    async fn test_missing_key_is_a_failed_operation() {
        let store = Arc::new(InMemoryStorage::new());
        let mut executor = GetExecutor::new(
            store.clone(),
            1,
            KeyCursor::derived("g/", 1, 4),
            None,
        );
        let result = executor.execute().await;
        assert!(!result.succeeded);
        assert_eq!(result.bytes_transferred, 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_contained() {
        let store = Arc::new(
            InMemoryStorage::new()
                .with_object("g/a", 10)
                .with_faults(FaultPlan {
                    fail_get: true,
                    ..FaultPlan::default()
                }),
        );
        let mut executor = GetExecutor::new(store.clone(), 0, single_key("g/a"), None);
        assert!(!executor.execute().await.succeeded);
        assert_eq!(store.calls().get_object, 1);
    }
}
