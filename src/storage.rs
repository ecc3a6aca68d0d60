//! Object storage for uploaded meal photos (S3 or MinIO).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tracing::{info, warn};

use crate::config::StorageConfig;

/// Where scan photos live. Keys are chosen by the scan service.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, key: &str, image: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
    /// Short-lived download URL handed to the app.
    async fn signed_url(&self, key: &str) -> anyhow::Result<String>;
}

pub struct S3ImageStore {
    client: Client,
    bucket: String,
    url_ttl: Duration,
}

impl S3ImageStore {
    pub async fn connect(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let credentials =
            Credentials::new(&cfg.access_key, &cfg.secret_key, None, None, "scanbite-env");
        let sdk = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        // MinIO only understands path-style addressing.
        let s3 = S3ConfigBuilder::from(&sdk)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        let store = Self {
            client: Client::from_conf(s3),
            bucket: cfg.bucket.clone(),
            url_ttl: Duration::from_secs(cfg.url_ttl_secs),
        };
        store.check_bucket().await;
        Ok(store)
    }

    /// Startup continues when the bucket is unreachable; uploads will fail loudly.
    async fn check_bucket(&self) {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => info!(bucket = %self.bucket, "image bucket reachable"),
            Err(e) => warn!(bucket = %self.bucket, error = %e, "image bucket not reachable"),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn store(&self, key: &str, image: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(image))
            .send()
            .await
            .with_context(|| format!("store image {key}"))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("remove image {key}"))?;
        Ok(())
    }

    async fn signed_url(&self, key: &str) -> anyhow::Result<String> {
        let presigning = PresigningConfig::expires_in(self.url_ttl)
            .context("image url lifetime out of range")?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .with_context(|| format!("sign url for {key}"))?;
        Ok(request.uri().to_string())
    }
}
