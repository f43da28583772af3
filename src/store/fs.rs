//! Filesystem-backed object store.
//!
//! Objects are files at `<root>/<bucket>/<key>`. Keys may contain `/` (they
//! become directories) but no `..`, empty or absolute components.
//!
//! ## Presigned URLs
//!
//! ```text
//! file:///srv/store/images/input/abc.png?X-Operation=write&X-Expires=1760000000&X-Signature=<hex>
//! ```
//!
//! The signature is the hex SHA-256 of the signing secret, operation, bucket,
//! key and expiry (newline separated). [`FsStore::verify`] recomputes it and
//! checks the expiry, so whatever serves these URLs can authorise requests
//! without shared state.

use super::{ObjectStore, PresignOperation, StoreError};
use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Characters escaped in the path part of a `file://` URL.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'?')
    .add(b'<')
    .add(b'>');

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    secret: String,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, secret: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            secret: secret.into(),
        }
    }

    /// Filesystem path of an object, rejecting keys that escape the bucket.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        for name in [bucket, key] {
            let valid = !name.is_empty()
                && !name.split('/').any(str::is_empty)
                && Path::new(name)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !valid {
                return Err(StoreError::InvalidKey(name.to_string()));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }

    /// Hex SHA-256 signature for a presigned URL.
    pub fn signature(
        &self,
        bucket: &str,
        key: &str,
        operation: PresignOperation,
        expires: i64,
    ) -> String {
        let mut hasher = Sha256::new();
        for part in [self.secret.as_str(), operation.as_str(), bucket, key] {
            hasher.update(part.as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(expires.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Whether `signature` authorises `operation` at unix time `now`.
    pub fn verify(
        &self,
        bucket: &str,
        key: &str,
        operation: PresignOperation,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> bool {
        now <= expires && self.signature(bucket, key, operation, expires) == signature
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        operation: PresignOperation,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let path = self.object_path(bucket, key)?;
        let expires = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        let signature = self.signature(bucket, key, operation, expires);
        let encoded = utf8_percent_encode(&path.to_string_lossy(), PATH_ENCODE_SET).to_string();
        let separator = if encoded.starts_with('/') { "" } else { "/" };
        Ok(format!(
            "file://{separator}{encoded}?X-Operation={operation}&X-Expires={expires}&X-Signature={signature}"
        ))
    }
}
