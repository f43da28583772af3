//! Concurrent upload of a derivative set.
//!
//! One `put` per derivative, all in flight at once on the calling task
//! (`join_all`), and the call returns only when every put has settled.
//! Successful puts are kept when others fail: the store has no multi-key
//! transaction, and a redelivered event rewrites the same keys with the same
//! bytes.

use crate::store::{ObjectStore, StoreError};
use crate::types::DerivativeResult;
use futures::future::join_all;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Failed to upload {} derivative(s): {}", .failed_keys.len(), .failed_keys.join(", "))]
pub struct UploadError {
    /// Keys whose put failed, in input order.
    pub failed_keys: Vec<String>,
    /// The failure of the first key in `failed_keys`.
    #[source]
    pub first: StoreError,
}

/// Write every result to `bucket`, concurrently.
pub async fn upload_all(
    store: &dyn ObjectStore,
    bucket: &str,
    results: Vec<DerivativeResult>,
) -> Result<(), UploadError> {
    let puts = results.into_iter().map(|result| async move {
        let outcome = store.put(bucket, &result.output_key, result.content).await;
        (result.output_key, outcome)
    });

    let mut failed_keys = Vec::new();
    let mut first = None;
    for (key, outcome) in join_all(puts).await {
        match outcome {
            Ok(()) => tracing::debug!(%bucket, %key, "uploaded derivative"),
            Err(e) => {
                tracing::warn!(%bucket, %key, error = %e, "derivative upload failed");
                failed_keys.push(key);
                first.get_or_insert(e);
            }
        }
    }

    match first {
        None => Ok(()),
        Some(first) => Err(UploadError { failed_keys, first }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn results() -> Vec<DerivativeResult> {
        [50, 100, 500]
            .iter()
            .map(|size| DerivativeResult {
                output_key: format!("resized/abc/{size}.jpg"),
                content: vec![*size as u8],
            })
            .collect()
    }

    #[tokio::test]
    async fn uploads_every_result() {
        let store = MemoryStore::new();

        upload_all(&store, "images", results()).await.unwrap();

        assert_eq!(
            store.keys("images"),
            vec!["resized/abc/100.jpg", "resized/abc/50.jpg", "resized/abc/500.jpg"]
        );
        assert_eq!(store.object("images", "resized/abc/500.jpg"), Some(vec![500u32 as u8]));
    }

    #[tokio::test]
    async fn failed_keys_are_reported_without_rollback() {
        let store = MemoryStore::new();
        store.fail_key("images", "resized/abc/100.jpg", 500);

        let err = upload_all(&store, "images", results()).await.unwrap_err();

        assert_eq!(err.failed_keys, vec!["resized/abc/100.jpg"]);
        assert!(matches!(err.first, StoreError::Service { status: 500, .. }));
        // Siblings still landed
        assert_eq!(store.put_count(), 3);
        assert_eq!(
            store.keys("images"),
            vec!["resized/abc/50.jpg", "resized/abc/500.jpg"]
        );
    }

    #[tokio::test]
    async fn all_failures_are_collected_in_order() {
        let store = MemoryStore::new();
        store.fail_key("images", "resized/abc/500.jpg", 503);
        store.fail_key("images", "resized/abc/50.jpg", 403);

        let err = upload_all(&store, "images", results()).await.unwrap_err();

        assert_eq!(
            err.failed_keys,
            vec!["resized/abc/50.jpg", "resized/abc/500.jpg"]
        );
        assert!(matches!(err.first, StoreError::Service { status: 403, .. }));
        assert!(err.to_string().starts_with("Failed to upload 2 derivative(s)"));
    }

    #[tokio::test]
    async fn empty_set_is_a_no_op() {
        let store = MemoryStore::new();
        upload_all(&store, "images", Vec::new()).await.unwrap();
        assert_eq!(store.put_count(), 0);
    }
}
