use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use std::path::Path;
use tracing::info;

use crate::modules::transcode::error::TranscodeError;

/// Object storage surface the pipeline depends on: streaming puts for the
/// artifact uploader and existence probes for content-id allocation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads a local file and returns its remote location.
    async fn put_file(&self, key: &str, path: &Path) -> Result<String, TranscodeError>;

    /// HeadObject probe. Only distinguishes "present" from "absent"; any other
    /// failure is surfaced as a store error.
    async fn exists(&self, key: &str) -> Result<bool, TranscodeError>;
}

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
}

impl StorageService {
    pub async fn new(endpoint: &str, bucket: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ Connected to S3 (MinIO)");

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn put_file(&self, key: &str, path: &Path) -> Result<String, TranscodeError> {
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        let body = aws_sdk_s3::primitives::ByteStream::from_path(path)
            .await
            .map_err(|e| TranscodeError::Upload(format!("failed to open {:?}: {}", path, e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| TranscodeError::Upload(format!("put {} failed: {}", key, e)))?;

        Ok(format!("{}/{}", self.bucket, key))
    }

    async fn exists(&self, key: &str) -> Result<bool, TranscodeError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(TranscodeError::Store(format!(
                        "head {} failed: {}",
                        key, service_err
                    )))
                }
            }
        }
    }
}
