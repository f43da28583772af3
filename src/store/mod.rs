//! Object store contract consumed by the pipeline and the URL entry points.
//!
//! | Operation | Used by |
//! |---|---|
//! | `get` | pipeline fetch (absent object → `Ok(None)`) |
//! | `put` | upload fan-out |
//! | `delete` | CLI housekeeping |
//! | `presign` | upload/download URL entry points |
//!
//! Two implementations ship with the crate: [`MemoryStore`] (tests, embedding)
//! and [`FsStore`] (local directory tree, used by the CLI). Neither retries;
//! every failure is returned to the caller as a [`StoreError`].

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Validity of every presigned URL the entry points issue.
pub const PRESIGN_TTL: Duration = Duration::from_secs(3600);

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store answered, but with a failure status.
    #[error("{method} {url} failed with status {status}")]
    Service {
        status: u16,
        method: String,
        url: String,
        body: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
}

/// What a presigned URL grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresignOperation {
    Read,
    Write,
}

impl PresignOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            PresignOperation::Read => "read",
            PresignOperation::Write => "write",
        }
    }
}

impl fmt::Display for PresignOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object. `Ok(None)` when it does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Create or overwrite an object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Remove an object. Deleting a missing object succeeds.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// A URL granting `operation` on the object for `ttl`.
    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        operation: PresignOperation,
        ttl: Duration,
    ) -> Result<String, StoreError>;
}
