// Mapping of HTTP failures into the AppError taxonomy

use docbatch_core::error::AppError;
use reqwest::StatusCode;
use serde_json::Value;

/// Extract the `detail` field of an error body.
///
/// FastAPI-style backends send either `{"detail": "..."}` or a structured
/// validation list; structured details are kept as compact JSON text.
fn extract_detail(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|d| match d {
            Value::String(s) => s,
            other => other.to_string(),
        });

    detail.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    })
}

/// Convert a non-2xx status and its body into an AppError
pub fn map_status(status: StatusCode, body: &str) -> AppError {
    let detail = extract_detail(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(detail),
        StatusCode::NOT_FOUND | StatusCode::GONE => AppError::NotFound(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            AppError::Transient(format!("{} ({})", detail, status.as_u16()))
        }
        s if s.is_server_error() => AppError::ServerError {
            status: s.as_u16(),
            detail,
        },
        s => AppError::Rejected {
            status: s.as_u16(),
            detail,
        },
    }
}

/// Convert a transport-level reqwest error into an AppError
pub fn map_reqwest_error(err: reqwest::Error) -> AppError {
    if err.is_decode() {
        AppError::Decode(err.to_string())
    } else if let Some(status) = err.status() {
        map_status(status, "")
    } else if err.is_builder() {
        AppError::Config(format!("Invalid request: {}", err))
    } else {
        // connect, timeout, body read, redirect: all worth another poll tick
        AppError::Transient(err.to_string())
    }
}
