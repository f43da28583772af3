//! In-memory object store.
//!
//! Objects live in a [`DashMap`] keyed by `(bucket, key)`. Failures can be
//! injected per key with [`MemoryStore::fail_key`], which is how the upload
//! and pipeline tests exercise partial-failure paths.

use super::{ObjectStore, PresignOperation, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type ObjectKey = (String, String);

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<ObjectKey, Vec<u8>>,
    failures: DashMap<ObjectKey, u16>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `bucket/key` fail with `status`.
    pub fn fail_key(&self, bucket: &str, key: &str, status: u16) {
        self.failures
            .insert((bucket.to_string(), key.to_string()), status);
    }

    /// Store an object without counting it as a put.
    pub fn insert(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        self.objects
            .insert((bucket.to_string(), key.to_string()), bytes);
    }

    /// Copy of an object's bytes, if present.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|v| v.clone())
    }

    /// Sorted keys stored in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == bucket)
            .map(|entry| entry.key().1.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of `put` calls issued, successful or not.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check(&self, method: &str, bucket: &str, key: &str) -> Result<(), StoreError> {
        match self.failures.get(&(bucket.to_string(), key.to_string())) {
            Some(status) => Err(StoreError::Service {
                status: *status,
                method: method.to_string(),
                url: url(bucket, key),
                body: format!("injected failure for {bucket}/{key}"),
            }),
            None => Ok(()),
        }
    }
}

fn url(bucket: &str, key: &str) -> String {
    format!("memory://{bucket}/{key}")
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check("GET", bucket, key)?;
        Ok(self.object(bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check("PUT", bucket, key)?;
        self.insert(bucket, key, bytes);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.check("DELETE", bucket, key)?;
        self.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        operation: PresignOperation,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        Ok(format!(
            "{}?X-Operation={}&X-Expires={}",
            url(bucket, key),
            operation,
            ttl.as_secs()
        ))
    }
}
