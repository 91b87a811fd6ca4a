// crates/vmp-objectstore/src/s3.rs
// ============================================================================
// Module: S3 Object Store
// Description: Production `ObjectStore` backend backed by S3-compatible
//              object storage.
// Dependencies: aws-sdk-s3, aws-config, vmp-core
// ============================================================================

//! ## Overview
//! Production evidence storage (spec.md §4.4, §6 "Object-store layout").
//! `signed_url` uses S3's native presigned GET. `put` enforces the
//! trait's create-only contract with a head-then-put check: S3
//! conditional writes (`If-None-Match: *`) are not supported uniformly
//! across S3-compatible providers, so this is a best-effort guard against
//! overwriting an existing key rather than an atomic compare-and-swap;
//! the evidence vault never reuses a storage key for two different
//! uploads (the key embeds the version number), so the race window has
//! no practical trigger in normal operation.

use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use vmp_core::CoreError;
use vmp_core::interfaces::ObjectStore;
use vmp_core::interfaces::SignedUrl;
use vmp_core::time::Timestamp;

use async_trait::async_trait;

/// S3-backed [`ObjectStore`] for a single bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Wraps an already-configured S3 client for `bucket`.
    #[must_use]
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    /// Builds a client from the ambient AWS config (region, endpoint,
    /// credentials resolved the standard SDK way) and wraps it for
    /// `bucket`.
    pub async fn from_env(bucket: impl Into<String>, endpoint: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        Self::new(Client::new(&config), bucket)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), CoreError> {
        let exists = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .is_ok();
        if exists {
            return Err(CoreError::conflict(format!("object already exists: {key}")));
        }
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| CoreError::Unavailable(format!("s3 put {key}: {e}")))?;
        Ok(())
    }

    async fn signed_url(&self, key: &str, lifetime: time::Duration) -> Result<SignedUrl, CoreError> {
        let seconds = u64::try_from(lifetime.whole_seconds()).unwrap_or(3600);
        let presign_config = PresigningConfig::expires_in(std::time::Duration::from_secs(seconds))
            .map_err(|e| CoreError::Internal(format!("presign config: {e}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| CoreError::Unavailable(format!("s3 presign {key}: {e}")))?;
        let expires_at = Timestamp::now().plus(lifetime);
        Ok(SignedUrl { url: presigned.uri().to_string(), expires_at })
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CoreError::Unavailable(format!("s3 delete {key}: {e}")))?;
        Ok(())
    }
}
