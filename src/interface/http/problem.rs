use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// RFC 7807 Problem Details payload.
#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub status: u16,
    /// What went wrong in this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Stable machine-readable code (PGC_...).
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Build a Problem Details response with the correct content-type.
pub fn problem(
    status: StatusCode,
    code: &str,
    detail: Option<String>,
    instance: Option<String>,
    trace_id: Option<String>,
) -> Response {
    // Step 1: Build the problem payload.
    let payload = ProblemDetails {
        r#type: "about:blank".to_string(),
        title: status.canonical_reason().unwrap_or("Error").to_string(),
        status: status.as_u16(),
        detail,
        instance,
        code: code.to_string(),
        trace_id,
    };

    // Step 2: Convert to an HTTP response with JSON body.
    let mut response = (status, Json(payload)).into_response();

    // Step 3: Ensure RFC 7807 content type.
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/problem+json"),
    );

    response
}

pub const PGC_REQUEST_MALFORMED: &str = "PGC_REQUEST_MALFORMED";
pub const PGC_AUTH_INVALID_CREDENTIALS: &str = "PGC_AUTH_INVALID_CREDENTIALS";
pub const PGC_AUTH_FORBIDDEN: &str = "PGC_AUTH_FORBIDDEN";
pub const PGC_JOB_VALIDATION_FAILED: &str = "PGC_JOB_VALIDATION_FAILED";
pub const PGC_JOB_NOT_FOUND: &str = "PGC_JOB_NOT_FOUND";
pub const PGC_JOB_CONFLICT: &str = "PGC_JOB_CONFLICT";
pub const PGC_STORAGE_DB_ERROR: &str = "PGC_STORAGE_DB_ERROR";
pub const PGC_WORKER_FAILED: &str = "PGC_WORKER_FAILED";
pub const PGC_INTERNAL: &str = "PGC_INTERNAL";
