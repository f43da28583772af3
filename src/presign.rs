//! Upload and download URL entry points.
//!
//! Both take an `image_name` query parameter, validate it, and presign a URL
//! for `<input_prefix><image_name>`. Uploads require a UUID stem so every
//! upload lands on a fresh key:
//!
//! ```text
//! 4c9a2b8f-a7e8-4e9d-b8b4-f6a9c9d9b6b1.jpeg   ok
//! holiday.jpeg                                 rejected (upload only)
//! 4c9a2b8f-a7e8-4e9d-b8b4-f6a9c9d9b6b1.gif     rejected
//! ```

use crate::config::ServiceConfig;
use crate::envelope::Failure;
use crate::response::Response;
use crate::store::{ObjectStore, PresignOperation};
use crate::types::RequestContext;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

pub const UPLOAD_SUCCESS: &str = "Successfully generated upload presigned URL";
pub const UPLOAD_FAILURE: &str = "Fail to generate signed url for upload image";
pub const DOWNLOAD_SUCCESS: &str = "Successfully generated download presigned URL";
pub const DOWNLOAD_FAILURE: &str = "Fail to generate get presigned url for the requested object";

/// Query-string parameters of both entry points.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageQuery {
    pub image_name: Option<String>,
}

impl ImageQuery {
    pub fn named(image_name: impl Into<String>) -> Self {
        Self {
            image_name: Some(image_name.into()),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("image_name is required")]
    MissingName,
    #[error(
        "image_name must be in UUID format for unique name. Example: 4c9a2b8f-a7e8-4e9d-b8b4-f6a9c9d9b6b1.jpeg"
    )]
    NotUuid,
    #[error("Image name does not have a valid file extension. Must have extension with {}", .allowed.join(","))]
    BadExtension { allowed: Vec<String> },
}

impl From<QueryError> for Failure {
    fn from(err: QueryError) -> Self {
        Failure::query_string(err.to_string())
    }
}

/// Check `image_name`, returning it on success.
///
/// The extension is whatever follows the last `.`; a name without one is
/// rejected. With `require_uuid` the text before the first `.` must be a
/// hyphenated UUID.
pub fn validate_image_name<'a>(
    query: &'a ImageQuery,
    allowed_extensions: &[String],
    require_uuid: bool,
) -> Result<&'a str, QueryError> {
    let name = query
        .image_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or(QueryError::MissingName)?;

    if require_uuid {
        let stem = name.split('.').next().unwrap_or(name);
        if stem.len() != 36 || Uuid::try_parse(stem).is_err() {
            return Err(QueryError::NotUuid);
        }
    }

    let extension = name.rsplit_once('.').map(|(_, ext)| ext);
    match extension {
        Some(ext) if allowed_extensions.iter().any(|a| a == ext) => Ok(name),
        _ => Err(QueryError::BadExtension {
            allowed: allowed_extensions.to_vec(),
        }),
    }
}

/// Presign a write URL for a new upload.
pub async fn issue_upload_url(
    ctx: &RequestContext,
    store: &dyn ObjectStore,
    config: &ServiceConfig,
    query: &ImageQuery,
) -> Response {
    async {
        match upload_url(store, config, query).await {
            Ok(data) => Response::success(ctx, UPLOAD_SUCCESS, Some(data)),
            Err(failure) => Response::from_failure(ctx, &failure, UPLOAD_FAILURE),
        }
    }
    .instrument(ctx.span())
    .await
}

async fn upload_url(
    store: &dyn ObjectStore,
    config: &ServiceConfig,
    query: &ImageQuery,
) -> Result<Value, Failure> {
    let name = validate_image_name(query, &config.presign.allowed_extensions, true)?;
    let key = format!("{}{}", config.input_prefix, name);
    let url = store
        .presign(
            &config.upload_bucket,
            &key,
            PresignOperation::Write,
            config.presign.ttl(),
        )
        .await?;
    tracing::debug!(bucket = %config.upload_bucket, %key, "issued upload URL");
    Ok(json!({ "put_presigned_url": url, "file_name": name }))
}

/// Presign a read URL for an existing source image.
pub async fn issue_download_url(
    ctx: &RequestContext,
    store: &dyn ObjectStore,
    config: &ServiceConfig,
    query: &ImageQuery,
) -> Response {
    async {
        match download_url(store, config, query).await {
            Ok(data) => Response::success(ctx, DOWNLOAD_SUCCESS, Some(data)),
            Err(failure) => Response::from_failure(ctx, &failure, DOWNLOAD_FAILURE),
        }
    }
    .instrument(ctx.span())
    .await
}

async fn download_url(
    store: &dyn ObjectStore,
    config: &ServiceConfig,
    query: &ImageQuery,
) -> Result<Value, Failure> {
    let name = validate_image_name(query, &config.presign.allowed_extensions, false)?;
    let key = format!("{}{}", config.input_prefix, name);
    let url = store
        .presign(
            &config.image_bucket,
            &key,
            PresignOperation::Read,
            config.presign.ttl(),
        )
        .await
        // Always surfaces as the generic 500
        .map_err(|e| Failure::internal(format!("Fail to generate get presigned URL: {e}")))?;
    tracing::debug!(bucket = %config.image_bucket, %key, "issued download URL");
    Ok(json!({ "get_presigned_url": url, "file_name": name }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ErrorEnvelope;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::time::Duration;

    const NAME: &str = "4c9a2b8f-a7e8-4e9d-b8b4-f6a9c9d9b6b1.jpeg";

    fn allowed() -> Vec<String> {
        ServiceConfig::default().presign.allowed_extensions
    }

    fn ctx() -> RequestContext {
        RequestContext::new("req-7", "upload-image")
    }

    /// Store whose presign always fails upstream.
    struct BrokenSigner;

    #[async_trait]
    impl ObjectStore for BrokenSigner {
        async fn get(&self, _: &str, _: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }
        async fn put(&self, _: &str, _: &str, _: Vec<u8>) -> Result<(), StoreError> {
            Ok(())
        }
        async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn presign(
            &self,
            bucket: &str,
            key: &str,
            _: PresignOperation,
            _: Duration,
        ) -> Result<String, StoreError> {
            Err(StoreError::Service {
                status: 403,
                method: "PRESIGN".into(),
                url: format!("memory://{bucket}/{key}"),
                body: "credentials expired".into(),
            })
        }
    }

    // =========================================================================
    // validate_image_name
    // =========================================================================

    #[test]
    fn accepts_uuid_name_with_allowed_extension() {
        let query = ImageQuery::named(NAME);
        assert_eq!(validate_image_name(&query, &allowed(), true), Ok(NAME));
    }

    #[test]
    fn missing_or_empty_name_is_rejected() {
        for query in [ImageQuery::default(), ImageQuery::named("")] {
            assert_eq!(
                validate_image_name(&query, &allowed(), false),
                Err(QueryError::MissingName)
            );
        }
    }

    #[test]
    fn upload_requires_hyphenated_uuid_stem() {
        for name in [
            "holiday.jpeg",
            "4c9a2b8fa7e84e9db8b4f6a9c9d9b6b1.jpeg",
            "4c9a2b8f-a7e8-4e9d-b8b4.jpeg",
        ] {
            assert_eq!(
                validate_image_name(&ImageQuery::named(name), &allowed(), true),
                Err(QueryError::NotUuid),
                "{name}"
            );
        }
        // Download does not care
        assert!(validate_image_name(&ImageQuery::named("holiday.jpeg"), &allowed(), false).is_ok());
    }

    #[test]
    fn extension_is_whitelisted_case_sensitively() {
        for name in ["a.gif", "a.JPG", "noext", "a.png.exe"] {
            let err = validate_image_name(&ImageQuery::named(name), &allowed(), false).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Image name does not have a valid file extension. Must have extension with jpg,jpeg,png"
            );
        }
        assert!(validate_image_name(&ImageQuery::named("a.b.png"), &allowed(), false).is_ok());
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    #[tokio::test]
    async fn upload_url_targets_input_prefix_in_upload_bucket() {
        let mut config = ServiceConfig::default();
        config.upload_bucket = "uploads".into();

        let response =
            issue_upload_url(&ctx(), &MemoryStore::new(), &config, &ImageQuery::named(NAME)).await;

        let Response::Success { data, message, .. } = response else {
            panic!("expected success");
        };
        assert_eq!(message, UPLOAD_SUCCESS);
        assert_eq!(
            data,
            json!({
                "put_presigned_url": format!("memory://uploads/input/{NAME}?X-Operation=write&X-Expires=3600"),
                "file_name": NAME,
            })
        );
    }

    #[tokio::test]
    async fn upload_validation_failure_is_400() {
        let response = issue_upload_url(
            &ctx(),
            &MemoryStore::new(),
            &ServiceConfig::default(),
            &ImageQuery::default(),
        )
        .await;

        assert_eq!(response.status_code(), 400);
        let error = response.error().unwrap();
        assert_eq!(error.name, "QueryStringParameterException");
        assert_eq!(error.message, "Query string parameters are not valid");
        assert_eq!(error.detail, Some(json!("image_name is required")));
    }

    #[tokio::test]
    async fn upload_presign_failure_is_backend_error() {
        let response = issue_upload_url(
            &ctx(),
            &BrokenSigner,
            &ServiceConfig::default(),
            &ImageQuery::named(NAME),
        )
        .await;

        assert_eq!(response.error(), Some(&ErrorEnvelope::backend()));
        assert!(!response.into_http().body.contains("credentials expired"));
    }

    #[tokio::test]
    async fn download_url_reads_from_image_bucket() {
        let mut config = ServiceConfig::default();
        config.image_bucket = "derived".into();

        let response = issue_download_url(
            &ctx(),
            &MemoryStore::new(),
            &config,
            &ImageQuery::named("cat.png"),
        )
        .await;

        let Response::Success { data, message, .. } = response else {
            panic!("expected success");
        };
        assert_eq!(message, DOWNLOAD_SUCCESS);
        assert_eq!(
            data["get_presigned_url"],
            "memory://derived/input/cat.png?X-Operation=read&X-Expires=3600"
        );
        assert_eq!(data["file_name"], "cat.png");
    }

    #[tokio::test]
    async fn download_presign_failure_is_generic() {
        let response = issue_download_url(
            &ctx(),
            &BrokenSigner,
            &ServiceConfig::default(),
            &ImageQuery::named("cat.png"),
        )
        .await;

        assert_eq!(response.status_code(), 500);
        assert_eq!(response.error(), Some(&ErrorEnvelope::generic()));
    }

    #[test]
    fn query_deserializes_from_parameters() {
        let query: ImageQuery = serde_json::from_value(json!({"image_name": "a.png"})).unwrap();
        assert_eq!(query.image_name.as_deref(), Some("a.png"));
        let empty: ImageQuery = serde_json::from_value(json!({})).unwrap();
        assert!(empty.image_name.is_none());
    }
}
