//! In-process storage client
//!
//! Keeps object sizes in memory, counts every call and can inject latency
//! or failures. Completion requests are checked the way a real store checks
//! them, so executor bugs surface as failed operations.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{
    ByteRange, CompletedPart, ListPage, StorageClient, StorageError, StorageOperation,
    StorageResult,
};

/// Number of calls made per storage operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub put_object: u64,
    pub initiate_multipart: u64,
    pub upload_part: u64,
    pub complete_multipart: u64,
    pub abort_multipart: u64,
    pub get_object: u64,
    pub list_objects: u64,
}

impl CallCounts {
    /// Calls belonging to the multipart protocol
    pub fn multipart_calls(&self) -> u64 {
        self.initiate_multipart + self.upload_part + self.complete_multipart + self.abort_multipart
    }
}

/// Failures to inject into the store
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    pub fail_put: bool,
    pub fail_initiate: bool,
    /// Fail every upload of this part number
    pub fail_part: Option<i32>,
    pub fail_complete: bool,
    pub fail_abort: bool,
    pub fail_get: bool,
    /// Fail the n-th list call (1-indexed, counted over the store's lifetime)
    pub fail_list_call: Option<u64>,
}

#[derive(Debug, Default)]
struct PendingUpload {
    key: String,
    parts: HashMap<i32, (String, u64)>,
}

#[derive(Debug, Default)]
struct StoreState {
    objects: BTreeMap<String, u64>,
    uploads: HashMap<String, PendingUpload>,
    calls: CallCounts,
    completions: Vec<Vec<CompletedPart>>,
    next_upload_id: u64,
}

/// Thread-safe in-memory object store
#[derive(Debug)]
pub struct InMemoryStorage {
    state: Mutex<StoreState>,
    faults: FaultPlan,
    latency: Option<Duration>,
    page_size: Option<usize>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            faults: FaultPlan::default(),
            latency: None,
            page_size: None,
        }
    }

    /// Inject failures
    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Sleep this long inside every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Cap listing pages at `page_size` keys regardless of the requested size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Seed an object of the given size
    pub fn with_object(self, key: impl Into<String>, size: u64) -> Self {
        self.lock().objects.insert(key.into(), size);
        self
    }

    /// Snapshot of the call counters
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Part lists passed to every successful completion call, in call order
    pub fn completed_part_lists(&self) -> Vec<Vec<CompletedPart>> {
        self.lock().completions.clone()
    }

    pub fn object_size(&self, key: &str) -> Option<u64> {
        self.lock().objects.get(key).copied()
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    /// Multipart uploads neither completed nor aborted
    pub fn pending_uploads(&self) -> usize {
        self.lock().uploads.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // A panicking test thread must not wedge the other workers.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn injected(operation: StorageOperation) -> StorageError {
        StorageError::new(operation, "InternalError: injected failure")
    }

    /// Check a completion list against the uploaded parts and return the object size
    fn validate_completion(upload: &PendingUpload, parts: &[CompletedPart]) -> StorageResult<u64> {
        if parts.is_empty() || parts.len() != upload.parts.len() {
            return Err(StorageError::new(
                StorageOperation::CompleteMultipart,
                "InvalidPart: part list does not match uploaded parts",
            ));
        }

        let mut total = 0u64;
        for (index, part) in parts.iter().enumerate() {
            if part.part_number != index as i32 + 1 {
                return Err(StorageError::new(
                    StorageOperation::CompleteMultipart,
                    "InvalidPartOrder: parts must be contiguous and ascending",
                ));
            }
            match upload.parts.get(&part.part_number) {
                Some((e_tag, size)) if *e_tag == part.e_tag => total += size,
                _ => {
                    return Err(StorageError::new(
                        StorageOperation::CompleteMultipart,
                        format!("InvalidPart: part {} not uploaded", part.part_number),
                    ))
                }
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl StorageClient for InMemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> StorageResult<()> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.put_object += 1;
        if self.faults.fail_put {
            return Err(Self::injected(StorageOperation::PutObject));
        }
        state.objects.insert(key.to_owned(), body.len() as u64);
        Ok(())
    }

    async fn initiate_multipart(&self, key: &str) -> StorageResult<String> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.initiate_multipart += 1;
        if self.faults.fail_initiate {
            return Err(Self::injected(StorageOperation::InitiateMultipart));
        }
        state.next_upload_id += 1;
        let upload_id = format!("upload-{}", state.next_upload_id);
        state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_owned(),
                parts: HashMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> StorageResult<String> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.upload_part += 1;
        if self.faults.fail_part == Some(part_number) {
            return Err(Self::injected(StorageOperation::UploadPart));
        }
        let upload = state
            .uploads
            .get_mut(upload_id)
            .filter(|upload| upload.key == key)
            .ok_or_else(|| StorageError::new(StorageOperation::UploadPart, "NoSuchUpload"))?;

        let e_tag = format!("\"{}-{}\"", upload_id, part_number);
        upload
            .parts
            .insert(part_number, (e_tag.clone(), body.len() as u64));
        Ok(e_tag)
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.complete_multipart += 1;
        if self.faults.fail_complete {
            return Err(Self::injected(StorageOperation::CompleteMultipart));
        }

        let total = {
            let upload = state
                .uploads
                .get(upload_id)
                .filter(|upload| upload.key == key)
                .ok_or_else(|| {
                    StorageError::new(StorageOperation::CompleteMultipart, "NoSuchUpload")
                })?;
            Self::validate_completion(upload, parts)?
        };

        state.uploads.remove(upload_id);
        state.objects.insert(key.to_owned(), total);
        state.completions.push(parts.to_vec());
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.abort_multipart += 1;
        if self.faults.fail_abort {
            return Err(Self::injected(StorageOperation::AbortMultipart));
        }
        let known = state
            .uploads
            .get(upload_id)
            .is_some_and(|upload| upload.key == key);
        if !known {
            return Err(StorageError::new(
                StorageOperation::AbortMultipart,
                "NoSuchUpload",
            ));
        }
        state.uploads.remove(upload_id);
        Ok(())
    }

    async fn get_object(&self, key: &str, range: Option<ByteRange>) -> StorageResult<u64> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.get_object += 1;
        if self.faults.fail_get {
            return Err(Self::injected(StorageOperation::GetObject));
        }
        let size = state
            .objects
            .get(key)
            .copied()
            .ok_or_else(|| StorageError::new(StorageOperation::GetObject, "NoSuchKey"))?;

        match range {
            None => Ok(size),
            Some(range) if range.start >= size => Err(StorageError::new(
                StorageOperation::GetObject,
                "InvalidRange: requested range not satisfiable",
            )),
            Some(range) => Ok(range.len().min(size - range.start)),
        }
    }

    async fn list_objects(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
        page_size: i32,
    ) -> StorageResult<ListPage> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.list_objects += 1;
        if self.faults.fail_list_call == Some(state.calls.list_objects) {
            return Err(Self::injected(StorageOperation::ListObjects));
        }

        let limit = self
            .page_size
            .unwrap_or_else(|| page_size.max(1) as usize);

        // The token is the last key of the previous page.
        let mut matching = state
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| match &continuation_token {
                Some(token) => key.as_str() > token.as_str(),
                None => true,
            });

        let keys = matching.by_ref().take(limit).cloned().collect::<Vec<_>>();
        let next_token = match (matching.next(), keys.last()) {
            (Some(_), Some(last)) => Some(last.clone()),
            _ => None,
        };

        Ok(ListPage { keys, next_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_pages_follow_token() {
        let storage = InMemoryStorage::new()
            .with_page_size(2)
            .with_object("data/a", 1)
            .with_object("data/b", 1)
            .with_object("data/c", 1)
            .with_object("other/d", 1);

        let first = storage.list_objects("data/", None, 1000).await.unwrap();
        assert_eq!(first.keys, vec!["data/a", "data/b"]);
        assert_eq!(first.next_token.as_deref(), Some("data/b"));

        let second = storage
            .list_objects("data/", first.next_token, 1000)
            .await
            .unwrap();
        assert_eq!(second.keys, vec!["data/c"]);
        assert!(second.next_token.is_none());
        assert_eq!(storage.calls().list_objects, 2);
    }

    #[tokio::test]
    async fn test_complete_rejects_out_of_order_parts() {
        let storage = InMemoryStorage::new();
        let upload_id = storage.initiate_multipart("k").await.unwrap();
        let tag1 = storage
            .upload_part("k", &upload_id, 1, Bytes::from_static(b"aa"))
            .await
            .unwrap();
        let tag2 = storage
            .upload_part("k", &upload_id, 2, Bytes::from_static(b"b"))
            .await
            .unwrap();

        let reversed = vec![
            CompletedPart {
                part_number: 2,
                e_tag: tag2.clone(),
            },
            CompletedPart {
                part_number: 1,
                e_tag: tag1.clone(),
            },
        ];
        assert!(storage
            .complete_multipart("k", &upload_id, &reversed)
            .await
            .is_err());

        let ordered = vec![
            CompletedPart {
                part_number: 1,
                e_tag: tag1,
            },
            CompletedPart {
                part_number: 2,
                e_tag: tag2,
            },
        ];
        storage
            .complete_multipart("k", &upload_id, &ordered)
            .await
            .unwrap();
        assert_eq!(storage.object_size("k"), Some(3));
        assert_eq!(storage.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_ranged_get_is_clamped_to_object_size() {
        let storage = InMemoryStorage::new().with_object("k", 100);

        let full = storage.get_object("k", None).await.unwrap();
        assert_eq!(full, 100);

        let short = storage.get_object("k", ByteRange::first(10)).await.unwrap();
        assert_eq!(short, 10);

        let long = storage.get_object("k", ByteRange::first(1000)).await.unwrap();
        assert_eq!(long, 100);

        assert!(storage.get_object("missing", None).await.is_err());
    }
}
