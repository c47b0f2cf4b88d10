//! PUT executor
//!
//! Writes one new object per call, either with a single PutObject or
//! through a multipart session. Parts of one object go up sequentially.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::bench::keys::object_key;
use crate::bench::multipart::{MultipartUploadSession, PartPlan, SessionError, UploadPath};
use crate::config::BenchmarkConfig;
use crate::io::ObjectGenerator;
use crate::models::OperationResult;
use crate::storage::{StorageClient, StorageError, StorageOperation, StorageResult};

pub struct PutExecutor {
    client: Arc<dyn StorageClient>,
    prefix: String,
    worker_id: usize,
    sequence: u64,
    object_size: u64,
    path: UploadPath,
    generator: ObjectGenerator,
}

impl PutExecutor {
    pub fn new(config: &BenchmarkConfig, client: Arc<dyn StorageClient>, worker_id: usize) -> Self {
        Self::with_generator(config, client, worker_id, Self::generator_for(config))
    }

    /// Executor writing bodies from `generator`, usually a fork of the run's
    /// [`PutExecutor::generator_for`]
    pub fn with_generator(
        config: &BenchmarkConfig,
        client: Arc<dyn StorageClient>,
        worker_id: usize,
        generator: ObjectGenerator,
    ) -> Self {
        Self {
            client,
            prefix: config.prefix.clone(),
            worker_id,
            sequence: 0,
            object_size: config.object_size,
            path: Self::path_for(config),
            generator,
        }
    }

    /// Generator whose pattern covers the largest body this run uploads
    pub fn generator_for(config: &BenchmarkConfig) -> ObjectGenerator {
        let largest_chunk = match Self::path_for(config) {
            UploadPath::Single => config.object_size,
            UploadPath::Multipart(plan) => plan.max_part_len(),
        };
        ObjectGenerator::new(config.payload, largest_chunk as usize)
    }

    fn path_for(config: &BenchmarkConfig) -> UploadPath {
        UploadPath::choose(config.object_size, config.part_size, config.multipart)
    }

    pub fn upload_path(&self) -> UploadPath {
        self.path
    }

    /// Upload the next object. Failures are reported with zero bytes.
    pub async fn execute(&mut self) -> OperationResult {
        let key = object_key(&self.prefix, self.worker_id, self.sequence);
        self.sequence += 1;

        let start = Instant::now();
        let outcome = match self.path {
            UploadPath::Single => self.put_single(&key).await,
            UploadPath::Multipart(plan) => self.put_multipart(&key, plan).await,
        };
        let latency = start.elapsed();

        match outcome {
            Ok(bytes) => OperationResult::success(bytes, latency),
            Err(err) => {
                debug!(worker = self.worker_id, key = %key, error = %err, "PUT failed");
                OperationResult::failure(latency)
            }
        }
    }

    async fn put_single(&mut self, key: &str) -> StorageResult<u64> {
        let body = self.generator.chunk(self.object_size as usize);
        self.client.put_object(key, body).await?;
        Ok(self.object_size)
    }

    async fn put_multipart(&mut self, key: &str, plan: PartPlan) -> StorageResult<u64> {
        let mut session = MultipartUploadSession::new(plan);

        let upload_id = self.client.initiate_multipart(key).await?;
        session
            .initiated(upload_id)
            .map_err(|e| session_fault(StorageOperation::InitiateMultipart, e))?;

        if let Err(err) = self.upload_and_complete(key, &mut session).await {
            self.abort(key, &mut session).await;
            return Err(err);
        }

        session.mark_completed();
        Ok(plan.object_size())
    }

    async fn upload_and_complete(
        &mut self,
        key: &str,
        session: &mut MultipartUploadSession,
    ) -> StorageResult<()> {
        let upload_id = session
            .upload_id()
            .map(str::to_owned)
            .ok_or_else(|| {
                StorageError::new(StorageOperation::UploadPart, "session has no upload id")
            })?;
        let plan = *session.plan();

        for (part_number, len) in plan.parts() {
            let body = self.generator.chunk(len as usize);
            let e_tag = self
                .client
                .upload_part(key, &upload_id, part_number, body)
                .await?;
            session
                .record_part(part_number, e_tag)
                .map_err(|e| session_fault(StorageOperation::UploadPart, e))?;
        }

        let parts = session
            .completion_parts()
            .map_err(|e| session_fault(StorageOperation::CompleteMultipart, e))?;
        self.client.complete_multipart(key, &upload_id, parts).await
    }

    /// Best-effort abort; its own failure does not change the outcome
    async fn abort(&self, key: &str, session: &mut MultipartUploadSession) {
        if let Some(upload_id) = session.upload_id() {
            if let Err(err) = self.client.abort_multipart(key, upload_id).await {
                warn!(
                    worker = self.worker_id,
                    key = %key,
                    upload_id = %upload_id,
                    error = %err,
                    "failed to abort multipart upload"
                );
            }
        }
        session.mark_aborted();
    }
}

fn session_fault(operation: StorageOperation, err: SessionError) -> StorageError {
    StorageError::new(operation, format!("session state: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PayloadKind;
    use crate::storage::{FaultPlan, InMemoryStorage};

    fn config(object_size: u64, part_size: u64) -> BenchmarkConfig {
        BenchmarkConfig::put()
            .with_endpoint("http://localhost:9000")
            .with_bucket("bench")
            .with_prefix("put/")
            .with_object_size(object_size)
            .with_part_size(part_size)
            .with_payload(PayloadKind::Pattern)
    }

    #[tokio::test]
    async fn test_single_put_writes_sequential_keys() {
        let store = Arc::new(InMemoryStorage::new());
        let mut executor = PutExecutor::new(&config(100, 1024), store.clone(), 2);
        assert_eq!(executor.upload_path(), UploadPath::Single);

        let first = executor.execute().await;
        let second = executor.execute().await;
        assert!(first.succeeded && second.succeeded);
        assert_eq!(first.bytes_transferred, 100);

        assert_eq!(store.keys(), vec!["put/w0002-0000000000", "put/w0002-0000000001"]);
        assert_eq!(store.calls().put_object, 2);
        assert_eq!(store.calls().multipart_calls(), 0);
    }

    #[tokio::test]
    async fn test_multipart_put_assembles_object() {
        let store = Arc::new(InMemoryStorage::new());
        let mut executor = PutExecutor::new(&config(2500, 1000), store.clone(), 0);

        let result = executor.execute().await;
        assert!(result.succeeded);
        assert_eq!(result.bytes_transferred, 2500);
        assert_eq!(store.object_size("put/w0000-0000000000"), Some(2500));

        let calls = store.calls();
        assert_eq!(calls.initiate_multipart, 1);
        assert_eq!(calls.upload_part, 3);
        assert_eq!(calls.complete_multipart, 1);
        assert_eq!(calls.abort_multipart, 0);
        assert_eq!(calls.put_object, 0);
    }

    #[tokio::test]
    async fn test_executors_sharing_a_generator_upload_independently() {
        let store = Arc::new(InMemoryStorage::new());
        let config = config(2500, 1000);
        let shared = PutExecutor::generator_for(&config);

        let mut first = PutExecutor::with_generator(&config, store.clone(), 0, shared.fork());
        let mut second = PutExecutor::with_generator(&config, store.clone(), 1, shared.fork());
        assert_eq!(first.execute().await.bytes_transferred, 2500);
        assert_eq!(second.execute().await.bytes_transferred, 2500);

        assert_eq!(store.object_size("put/w0000-0000000000"), Some(2500));
        assert_eq!(store.object_size("put/w0001-0000000000"), Some(2500));
        assert_eq!(store.calls().upload_part, 6);
    }

    #[tokio::test]
    async fn test_initiate_failure_fails_without_abort() {
        let store = Arc::new(InMemoryStorage::new().with_faults(FaultPlan {
            fail_initiate: true,
            ..FaultPlan::default()
        }));
        let mut executor = PutExecutor::new(&config(2048, 1024), store.clone(), 0);

        let result = executor.execute().await;
        assert!(!result.succeeded);
        assert_eq!(result.bytes_transferred, 0);
        assert_eq!(store.calls().upload_part, 0);
        assert_eq!(store.calls().abort_multipart, 0);
    }

    #[tokio::test]
    async fn test_complete_failure_aborts_upload() {
        let store = Arc::new(InMemoryStorage::new().with_faults(FaultPlan {
            fail_complete: true,
            ..FaultPlan::default()
        }));
        let mut executor = PutExecutor::new(&config(2048, 1024), store.clone(), 0);

        let result = executor.execute().await;
        assert!(!result.succeeded);
        assert_eq!(result.bytes_transferred, 0);
        assert_eq!(store.calls().complete_multipart, 1);
        assert_eq!(store.calls().abort_multipart, 1);
        assert_eq!(store.pending_uploads(), 0);
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_abort_keeps_failed_outcome() {
        let store = Arc::new(InMemoryStorage::new().with_faults(FaultPlan {
            fail_part: Some(2),
            fail_abort: true,
            ..FaultPlan::default()
        }));
        let mut executor = PutExecutor::new(&config(3000, 1000), store.clone(), 0);

        let result = executor.execute().await;
        assert!(!result.succeeded);
        assert_eq!(store.calls().abort_multipart, 1);
        assert_eq!(store.pending_uploads(), 1);
    }
}
