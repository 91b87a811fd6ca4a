// crates/vmp-objectstore/src/local.rs
// ============================================================================
// Module: Local Filesystem Object Store
// Description: Dev/test `ObjectStore` backend storing blobs under a root
//              directory, with HMAC-signed read URLs.
// Dependencies: tokio (fs, io-util), vmp-core, crate::signing
// ============================================================================

//! ## Overview
//! Keys map directly to relative paths under `root` (spec.md §6
//! "Object-store layout": `{case_id}/{evidence_type}/{date}/v{n}_{name}`).
//! `put` refuses to overwrite an existing file, matching the trait's
//! create-only contract. `signed_url` issues an HTTP URL, rooted at
//! `public_base_url`, carrying an HMAC-signed expiry token in its query
//! string; verifying that token with [`crate::signing::verify`] and
//! serving the bytes is the deployment's static-file layer in front of
//! this process, not `vmp-http` itself — the local backend is a dev/test
//! stand-in for the S3 backend's own presigned URLs, which bypass the
//! application process entirely.

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use vmp_core::CoreError;
use vmp_core::interfaces::ObjectStore;
use vmp_core::interfaces::SignedUrl;
use vmp_core::time::Timestamp;

use crate::signing::sign;

/// Filesystem-backed [`ObjectStore`] rooted at a single directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    signing_key: Vec<u8>,
}

impl LocalObjectStore {
    /// Creates a store rooted at `root`, signing URLs with `signing_key`.
    /// `public_base_url` is prefixed to signed URLs (e.g.
    /// `http://localhost:8080/evidence/blobs`).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>, signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
            signing_key: signing_key.into(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, CoreError> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(CoreError::validation(format!("invalid object key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, _content_type: &str, bytes: Vec<u8>) -> Result<(), CoreError> {
        let path = self.resolve(key)?;
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CoreError::Unavailable(format!("stat {key}: {e}")))?
        {
            return Err(CoreError::conflict(format!("object already exists: {key}")));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Unavailable(format!("create dir for {key}: {e}")))?;
        }
        write_create_only(&path, &bytes)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => CoreError::conflict(format!("object already exists: {key}")),
                _ => CoreError::Unavailable(format!("write {key}: {e}")),
            })
    }

    async fn signed_url(&self, key: &str, lifetime: time::Duration) -> Result<SignedUrl, CoreError> {
        self.resolve(key)?;
        let now = Timestamp::now();
        let expires_at = now.plus(lifetime);
        let expires_unix = expires_at.as_offset().unix_timestamp();
        let signature = sign(&self.signing_key, key, expires_unix);
        let url = format!(
            "{base}/{key}?exp={exp}&sig={sig}",
            base = self.public_base_url.trim_end_matches('/'),
            key = key,
            exp = expires_unix,
            sig = signature,
        );
        Ok(SignedUrl { url, expires_at })
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Unavailable(format!("delete {key}: {e}"))),
        }
    }
}

async fn write_create_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt as _;

    let mut file = tokio::fs::OpenOptions::new().write(true).create_new(true).open(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalObjectStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalObjectStore::new(dir.path(), "http://localhost/blobs", b"sign-key".to_vec());
        (dir, store)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let (dir, store) = store();
        store.put("case/inv/v1_file.pdf", "application/pdf", b"hello".to_vec()).await.expect("put");
        let on_disk = tokio::fs::read(dir.path().join("case/inv/v1_file.pdf")).await.expect("read");
        assert_eq!(on_disk, b"hello");
    }

    #[tokio::test]
    async fn put_rejects_duplicate_key() {
        let (_dir, store) = store();
        store.put("k", "text/plain", b"a".to_vec()).await.expect("first put");
        let err = store.put("k", "text/plain", b"b".to_vec()).await.unwrap_err();
        assert_eq!(err.reason(), "conflict");
    }

    #[tokio::test]
    async fn put_rejects_path_traversal() {
        let (_dir, store) = store();
        let err = store.put("../escape", "text/plain", b"a".to_vec()).await.unwrap_err();
        assert_eq!(err.reason(), "validation");
    }

    #[tokio::test]
    async fn signed_url_carries_a_verifiable_signature() {
        let (_dir, store) = store();
        store.put("k", "text/plain", b"a".to_vec()).await.expect("put");
        let signed = store.signed_url("k", time::Duration::minutes(5)).await.expect("sign");
        assert!(signed.url.starts_with("http://localhost/blobs/k?exp="));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = store();
        store.put("k", "text/plain", b"a".to_vec()).await.expect("put");
        store.delete("k").await.expect("first delete");
        store.delete("k").await.expect("second delete is a no-op");
    }
}
