//! Shared types used across the pipeline stages.
//!
//! Trigger input ([`TriggerEvent`] → [`SourceReference`]), the decoded key and
//! derivative plan ([`DecodedKey`], [`DerivativeSpec`]), the produced buffers
//! ([`DerivativeResult`]), and the per-invocation [`RequestContext`].

use serde::{Deserialize, Serialize};

/// Bucket + raw (possibly percent-encoded) key named by a trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub bucket: String,
    /// Percent-encoded, with `+` standing for a space.
    pub raw_key: String,
}

/// A source key after percent-decoding, split into its filename parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    /// Full decoded key, used to read the source object.
    pub key: String,
    /// Final path segment without its extension.
    pub base_name: String,
    /// Extension including the leading dot (`".png"`), or empty.
    pub extension: String,
}

/// One target size, in pixels on the longer edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivativeSpec {
    pub size: u32,
}

impl DerivativeSpec {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

/// An encoded derivative, ready to be written at `output_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeResult {
    pub output_key: String,
    pub content: Vec<u8>,
}

/// Request-scoped identity stamped on envelopes and log records.
///
/// Built once per invocation and passed by reference; never shared between
/// invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub request_id: String,
    pub function_name: String,
    pub timestamp_millis: i64,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            function_name: function_name.into(),
            timestamp_millis: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Fresh context with a random v4 request id.
    pub fn generate(function_name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), function_name)
    }

    /// Span that every log record of this invocation is emitted under.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "invocation",
            request_id = %self.request_id,
            service = %self.function_name,
            timestamp = self.timestamp_millis,
        )
    }
}

/// Object-created notification, as delivered by the storage trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<TriggerRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRecord {
    pub s3: TriggerEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEntity {
    pub bucket: TriggerBucket,
    pub object: TriggerObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerBucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerObject {
    pub key: String,
}

impl TriggerEvent {
    /// Single-record event, mostly for tests and the CLI.
    pub fn single(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            records: vec![TriggerRecord {
                s3: TriggerEntity {
                    bucket: TriggerBucket { name: bucket.into() },
                    object: TriggerObject { key: key.into() },
                },
            }],
        }
    }

    /// The source named by the first record. Later records are ignored.
    pub fn source(&self) -> Option<SourceReference> {
        self.records.first().map(|r| SourceReference {
            bucket: r.s3.bucket.name.clone(),
            raw_key: r.s3.object.key.clone(),
        })
    }
}
