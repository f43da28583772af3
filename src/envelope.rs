//! Failure taxonomy and client-safe error envelopes.
//!
//! Every failure is turned into a [`Failure`] where it happens, via the `From`
//! impls at the bottom of this module, so nothing downstream has to guess an
//! error's shape. [`build_envelope`] then classifies it, first match wins:
//!
//! | Cause | Envelope |
//! |---|---|
//! | none | default status, empty name/message |
//! | upstream 404 | `404 NotFound` |
//! | upstream, other status | `500 BackendServerError` |
//! | validation kind | `400 <Kind>`, fixed message, parsed detail |
//! | other domain kind, default status | `500 GenericServerError` |
//! | other domain kind, caller status | caller status, own name/message |
//! | unrecognized, default status | `500 GenericServerError` |
//! | unrecognized, caller status | caller status, raw value as detail |
//!
//! An envelope with status 500 never carries detail. The unredacted detail
//! (upstream body, error chain, raw value) goes only to the log record, which
//! is built in the same step as the envelope.

use crate::imaging::GenerateError;
use crate::key::KeyDecodeError;
use crate::store::StoreError;
use crate::types::RequestContext;
use crate::upload::UploadError;
use serde::Serialize;
use serde_json::{Value, json};
use std::error::Error as StdError;

/// Status used when the caller has nothing more specific.
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// Closed set of domain error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PayloadNotValid,
    QueryStringParameter,
    InternalServer,
    KeyDecode,
    ImageDecode,
    Resize,
    Upload,
}

impl ErrorKind {
    /// Stable name shown to clients.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::PayloadNotValid => "PayloadNotValidException",
            ErrorKind::QueryStringParameter => "QueryStringParameterException",
            ErrorKind::InternalServer => "InternalServerError",
            ErrorKind::KeyDecode => "KeyDecodeError",
            ErrorKind::ImageDecode => "ImageDecodeError",
            ErrorKind::Resize => "ResizeError",
            ErrorKind::Upload => "UploadError",
        }
    }

    /// Fixed client message for validation kinds; `None` for everything else.
    pub fn validation_message(self) -> Option<&'static str> {
        match self {
            ErrorKind::PayloadNotValid => Some("Payload is not valid"),
            ErrorKind::QueryStringParameter => Some("Query string parameters are not valid"),
            _ => None,
        }
    }
}

/// A dependency call that returned a failure response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub status: u16,
    pub method: String,
    pub url: String,
    pub body: String,
}

/// A failure raised by this crate's own code.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainError {
    pub kind: ErrorKind,
    /// For validation kinds this may be serialized JSON (e.g. a list of
    /// field errors); it is parsed back when building the envelope.
    pub message: String,
    /// Display of every error in the source chain, outermost first.
    pub trace: Vec<String>,
    /// Extra structured detail for the log record only.
    pub context: Option<Value>,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: Vec::new(),
            context: None,
        }
    }

    /// Capture `err` and its whole source chain.
    pub fn from_error(kind: ErrorKind, err: &(dyn StdError + 'static)) -> Self {
        let mut trace = Vec::new();
        let mut current: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(e) = current {
            trace.push(e.to_string());
            current = e.source();
        }
        Self {
            kind,
            message: err.to_string(),
            trace,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Everything that can end an operation unsuccessfully.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    Upstream(UpstreamError),
    Domain(DomainError),
    /// A value that fits no known shape, passed along as-is.
    Unrecognized(Value),
}

impl Failure {
    pub fn payload_not_valid(message: impl Into<String>) -> Self {
        Failure::Domain(DomainError::new(ErrorKind::PayloadNotValid, message))
    }

    pub fn query_string(message: impl Into<String>) -> Self {
        Failure::Domain(DomainError::new(ErrorKind::QueryStringParameter, message))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Failure::Domain(DomainError::new(ErrorKind::InternalServer, message))
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Failure::Domain(d) => Some(d.kind),
            _ => None,
        }
    }
}

/// Client-facing error body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub name: String,
    pub message: String,
    pub detail: Option<Value>,
}

impl ErrorEnvelope {
    fn new(status_code: u16, name: &str, message: &str, detail: Option<Value>) -> Self {
        Self {
            status_code,
            name: name.to_string(),
            message: message.to_string(),
            detail,
        }
    }

    pub fn generic() -> Self {
        Self::new(
            500,
            "GenericServerError",
            "A server error occurred. Please contact the administrator.",
            None,
        )
    }

    pub fn not_found() -> Self {
        Self::new(404, "NotFound", "The requested resource was not found.", None)
    }

    pub fn backend() -> Self {
        Self::new(500, "BackendServerError", "Backend server error occurred.", None)
    }
}

/// Envelope plus the internal record that must accompany it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub envelope: ErrorEnvelope,
    /// Full, unredacted detail for the log sink.
    pub record: Value,
}

/// Pure classification; see the module docs for the rules.
pub fn classify(cause: Option<&Failure>, default_message: &str, default_status: u16) -> Classified {
    let (mut envelope, record) = match cause {
        None => (
            ErrorEnvelope::new(default_status, "", "", None),
            json!({
                "kind": "missing",
                "name": "Error",
                "message": default_message,
                "error": "No cause provided. Pass the failure to get its detail.",
            }),
        ),
        Some(Failure::Upstream(up)) => {
            let envelope = if up.status == 404 {
                ErrorEnvelope::not_found()
            } else {
                ErrorEnvelope::backend()
            };
            let record = json!({
                "kind": "upstream",
                "status": up.status,
                "error": up.body,
                "url": up.url,
                "method": up.method,
            });
            (envelope, record)
        }
        Some(Failure::Domain(domain)) => classify_domain(domain, default_status),
        Some(Failure::Unrecognized(raw)) => {
            let envelope = if default_status == DEFAULT_STATUS_CODE {
                ErrorEnvelope::generic()
            } else {
                let name = raw
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("UnrecognizedError");
                let message = raw
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(default_message);
                ErrorEnvelope::new(default_status, name, message, Some(raw.clone()))
            };
            (envelope, json!({ "kind": "unrecognized", "detail": raw }))
        }
    };

    if envelope.status_code == DEFAULT_STATUS_CODE {
        envelope.detail = None;
    }
    Classified { envelope, record }
}

fn classify_domain(domain: &DomainError, default_status: u16) -> (ErrorEnvelope, Value) {
    let name = domain.kind.name();
    let mut record = json!({
        "kind": "domain",
        "name": name,
        "message": domain.message,
        "error": domain.trace,
    });
    if let Some(context) = &domain.context {
        record["context"] = context.clone();
    }

    let envelope = if let Some(fixed) = domain.kind.validation_message() {
        let detail = serde_json::from_str::<Value>(&domain.message)
            .unwrap_or_else(|_| Value::String(domain.message.clone()));
        record["detail"] = detail.clone();
        ErrorEnvelope::new(400, name, fixed, Some(detail))
    } else if default_status == DEFAULT_STATUS_CODE {
        ErrorEnvelope::generic()
    } else {
        ErrorEnvelope::new(default_status, name, &domain.message, None)
    };
    (envelope, record)
}

/// Classify `cause` and emit its log record under `ctx`.
pub fn build_envelope(
    ctx: &RequestContext,
    cause: Option<&Failure>,
    default_message: &str,
    default_status: u16,
) -> ErrorEnvelope {
    let Classified { envelope, record } = classify(cause, default_message, default_status);
    if cause.is_none() {
        tracing::warn!(
            request_id = %ctx.request_id,
            service = %ctx.function_name,
            detail = %record,
            "no cause provided: {}",
            default_message
        );
    } else {
        tracing::error!(
            request_id = %ctx.request_id,
            service = %ctx.function_name,
            status = envelope.status_code,
            detail = %record,
            "{}",
            default_message
        );
    }
    envelope
}

// =============================================================================
// Conversions at the point of failure
// =============================================================================

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Service {
                status,
                method,
                url,
                body,
            } => Failure::Upstream(UpstreamError {
                status,
                method,
                url,
                body,
            }),
            other => Failure::Domain(DomainError::from_error(ErrorKind::InternalServer, &other)),
        }
    }
}

impl From<KeyDecodeError> for Failure {
    fn from(err: KeyDecodeError) -> Self {
        Failure::Domain(DomainError::from_error(ErrorKind::KeyDecode, &err))
    }
}

impl From<GenerateError> for Failure {
    fn from(err: GenerateError) -> Self {
        let kind = match err {
            GenerateError::ImageDecode(_) => ErrorKind::ImageDecode,
            GenerateError::Resize { .. } => ErrorKind::Resize,
            GenerateError::Pool(_) => ErrorKind::InternalServer,
        };
        Failure::Domain(DomainError::from_error(kind, &err))
    }
}

impl From<UploadError> for Failure {
    fn from(err: UploadError) -> Self {
        Failure::Domain(
            DomainError::from_error(ErrorKind::Upload, &err)
                .with_context(json!({ "failedKeys": err.failed_keys })),
        )
    }
}

impl From<tokio::task::JoinError> for Failure {
    fn from(err: tokio::task::JoinError) -> Self {
        Failure::Domain(DomainError::from_error(ErrorKind::InternalServer, &err))
    }
}
