//! Storage client boundary
//!
//! The benchmark core talks to object storage only through the
//! [`StorageClient`] trait. Request signing, connection pooling and
//! per-request timeouts belong to the implementation.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use memory::{CallCounts, FaultPlan, InMemoryStorage};
pub use s3::S3StorageClient;

/// Storage operation names, used to label errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageOperation {
    PutObject,
    InitiateMultipart,
    UploadPart,
    CompleteMultipart,
    AbortMultipart,
    GetObject,
    ListObjects,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::PutObject => "PutObject",
            StorageOperation::InitiateMultipart => "CreateMultipartUpload",
            StorageOperation::UploadPart => "UploadPart",
            StorageOperation::CompleteMultipart => "CompleteMultipartUpload",
            StorageOperation::AbortMultipart => "AbortMultipartUpload",
            StorageOperation::GetObject => "GetObject",
            StorageOperation::ListObjects => "ListObjectsV2",
        }
    }
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport or protocol failure returned by a storage call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub operation: StorageOperation,
    pub message: String,
}

impl StorageError {
    pub fn new(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for StorageError {}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Acknowledged part of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// 1-indexed part number
    pub part_number: i32,
    /// Opaque tag returned by the store for this part
    pub e_tag: String,
}

/// Inclusive byte range for ranged reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end_inclusive: u64,
}

impl ByteRange {
    /// Range covering the first `length` bytes, or `None` for a zero length
    pub fn first(length: u64) -> Option<Self> {
        if length == 0 {
            return None;
        }
        Some(Self {
            start: 0,
            end_inclusive: length - 1,
        })
    }

    /// Number of bytes requested
    pub fn len(&self) -> u64 {
        self.end_inclusive - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// HTTP `Range` header value
    pub fn to_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end_inclusive)
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Continuation token, `None` once the listing is exhausted
    pub next_token: Option<String>,
}

/// Object storage operations consumed by the benchmark executors.
///
/// Implementations must be safe to call from many workers at once.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload a whole object in one request
    async fn put_object(&self, key: &str, body: Bytes) -> StorageResult<()>;

    /// Start a multipart upload and return its upload id
    async fn initiate_multipart(&self, key: &str) -> StorageResult<String>;

    /// Upload one part and return the store's tag for it
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> StorageResult<String>;

    /// Finish a multipart upload; `parts` must be in ascending part order
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()>;

    /// Discard a multipart upload and any parts already stored
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()>;

    /// Download an object (or a range of it) and return the bytes received
    async fn get_object(&self, key: &str, range: Option<ByteRange>) -> StorageResult<u64>;

    /// Fetch one page of keys under `prefix`
    async fn list_objects(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
        page_size: i32,
    ) -> StorageResult<ListPage>;
}
