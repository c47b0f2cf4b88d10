//! S3 storage client backed by the AWS SDK

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder as S3ConfigBuilder, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::{
    ByteRange, CompletedPart, ListPage, StorageClient, StorageError, StorageOperation,
    StorageResult,
};
use crate::config::BenchmarkConfig;

/// Render an SDK error as `code: message` for service errors, or the full
/// error chain for transport and construction failures.
fn sdk_error<E, R>(operation: StorageOperation, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = match err.as_service_error() {
        Some(service_err) => format!(
            "{}: {}",
            service_err.code().unwrap_or("unknown"),
            service_err.message().unwrap_or("no message")
        ),
        None => DisplayErrorContext(&err).to_string(),
    };
    StorageError::new(operation, message)
}

/// S3-compatible storage client bound to a single bucket
#[derive(Clone, Debug)]
pub struct S3StorageClient {
    client: Client,
    bucket: String,
}

impl S3StorageClient {
    /// Build a path-style client with static credentials
    pub fn new(config: &BenchmarkConfig) -> Self {
        let credentials = Credentials::new(
            config.credentials.access_key.clone(),
            config.credentials.secret_key.clone(),
            None,
            None,
            "static",
        );

        let sdk_config = S3ConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn put_object(&self, key: &str, body: Bytes) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error(StorageOperation::PutObject, e))?;
        Ok(())
    }

    async fn initiate_multipart(&self, key: &str) -> StorageResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(StorageOperation::InitiateMultipart, e))?;

        output.upload_id().map(str::to_owned).ok_or_else(|| {
            StorageError::new(
                StorageOperation::InitiateMultipart,
                "response did not contain an upload id",
            )
        })
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> StorageResult<String> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error(StorageOperation::UploadPart, e))?;

        // Some S3-compatible stores omit the ETag; completion then sends an empty tag.
        Ok(output.e_tag().unwrap_or_default().to_owned())
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        let completed_parts = parts
            .iter()
            .map(|part| {
                S3CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(&part.e_tag)
                    .build()
            })
            .collect::<Vec<_>>();

        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(|e| sdk_error(StorageOperation::CompleteMultipart, e))?;
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| sdk_error(StorageOperation::AbortMultipart, e))?;
        Ok(())
    }

    async fn get_object(&self, key: &str, range: Option<ByteRange>) -> StorageResult<u64> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_range(range.map(|r| r.to_header()))
            .send()
            .await
            .map_err(|e| sdk_error(StorageOperation::GetObject, e))?;

        // A store that ignores Range answers 200 with the whole object; stop
        // reading once it overruns the requested length.
        let limit = range.map_or(u64::MAX, |r| r.len());
        let mut body = output.body;
        let mut received = 0u64;
        while let Some(chunk) = body.try_next().await.map_err(|e| {
            StorageError::new(
                StorageOperation::GetObject,
                format!("failed to read body: {}", DisplayErrorContext(&e)),
            )
        })? {
            received += chunk.len() as u64;
            if received > limit {
                debug!(key, limit, "range not honoured, body truncated");
                break;
            }
        }
        Ok(received.min(limit))
    }

    async fn list_objects(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
        page_size: i32,
    ) -> StorageResult<ListPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(page_size)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| sdk_error(StorageOperation::ListObjects, e))?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_owned))
            .collect::<Vec<_>>();

        let next_token = if output.is_truncated() == Some(true) {
            match output.next_continuation_token() {
                Some(token) => Some(token.to_owned()),
                None => {
                    return Err(StorageError::new(
                        StorageOperation::ListObjects,
                        "truncated listing without a continuation token",
                    ))
                }
            }
        } else {
            None
        };

        debug!(
            prefix,
            keys = keys.len(),
            truncated = next_token.is_some(),
            "listed page"
        );
        Ok(ListPage { keys, next_token })
    }
}
