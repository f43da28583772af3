//! Outcome envelopes handed to the transport.
//!
//! ```json
//! {"requestId": "…", "statusCode": 200, "message": "…", "data": {}}
//! {"requestId": "…", "statusCode": 404, "message": "…", "error": {"statusCode": 404, …}}
//! ```
//!
//! [`Response::into_http`] wraps either one into the `{statusCode, headers, body}`
//! shape HTTP-fronted entry points return, with permissive CORS headers.

use crate::envelope::{DEFAULT_STATUS_CODE, ErrorEnvelope, Failure, build_envelope};
use crate::types::RequestContext;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    Success {
        request_id: String,
        status_code: u16,
        message: String,
        data: Value,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        request_id: String,
        status_code: u16,
        message: String,
        error: ErrorEnvelope,
    },
}

impl Response {
    /// 200 response; `data` defaults to `{}` when `None`.
    pub fn success(ctx: &RequestContext, message: &str, data: Option<Value>) -> Self {
        tracing::info!(request_id = %ctx.request_id, "{}", message);
        Response::Success {
            request_id: ctx.request_id.clone(),
            status_code: 200,
            message: message.to_string(),
            data: data.unwrap_or_else(|| json!({})),
        }
    }

    /// Classify `cause` and wrap the envelope. The outer status mirrors the
    /// envelope's.
    pub fn failure(
        ctx: &RequestContext,
        cause: Option<&Failure>,
        message: &str,
        default_status: u16,
    ) -> Self {
        let error = build_envelope(ctx, cause, message, default_status);
        Response::Failure {
            request_id: ctx.request_id.clone(),
            status_code: error.status_code,
            message: message.to_string(),
            error,
        }
    }

    /// Shorthand for [`Response::failure`] at the default status.
    pub fn from_failure(ctx: &RequestContext, cause: &Failure, message: &str) -> Self {
        Self::failure(ctx, Some(cause), message, DEFAULT_STATUS_CODE)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Response::Success { status_code, .. } | Response::Failure { status_code, .. } => {
                *status_code
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    pub fn error(&self) -> Option<&ErrorEnvelope> {
        match self {
            Response::Failure { error, .. } => Some(error),
            Response::Success { .. } => None,
        }
    }

    pub fn into_http(self) -> HttpResponse {
        let headers = BTreeMap::from([
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
            (
                "Access-Control-Allow-Credentials".to_string(),
                "true".to_string(),
            ),
        ]);
        HttpResponse {
            status_code: self.status_code(),
            headers,
            // Serializing these plain structs cannot fail
            body: serde_json::to_string(&self).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}
