use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::Config;
use crate::pipeline::{FetchError, StorageFetcher};

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
pub async fn build_s3_client(config: &Config) -> S3Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "intake-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

/// Object storage for uploaded CVs.
#[derive(Clone)]
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Stores an uploaded document under `bucket/key`.
    pub async fn put_document(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> anyhow::Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded CV to s3://{}/{} ({} bytes)", bucket, key, size);
        Ok(())
    }
}

#[async_trait]
impl StorageFetcher for S3Storage {
    async fn fetch(&self, container: &str, object_id: &str) -> Result<Bytes, FetchError> {
        let output = self
            .client
            .get_object()
            .bucket(container)
            .key(object_id)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    FetchError::NotFound {
                        container: container.to_string(),
                        object_id: object_id.to_string(),
                    }
                } else {
                    FetchError::Io(format!("S3 get_object failed: {e}"))
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| FetchError::Io(format!("S3 body read failed: {e}")))?
            .into_bytes();

        debug!("Fetched s3://{}/{} ({} bytes)", container, object_id, bytes.len());
        Ok(bytes)
    }
}
