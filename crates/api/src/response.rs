//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shortlink_core::Error;

/// Response extension carrying the error message, so the metrics middleware
/// can persist it alongside the request metric.
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

/// API error with a JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Per-index errors for batch validation failures.
    pub batch_errors: Option<Vec<(usize, String)>>,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            batch_errors: None,
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "rate limit exceeded".to_string(),
            batch_errors: None,
            retry_after: Some(retry_after),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self.batch_errors {
            Some(errors) => json!({
                "errors": errors
                    .iter()
                    .map(|(index, error)| json!({ "index": index, "error": error }))
                    .collect::<Vec<_>>(),
            }),
            None if self.retry_after.is_some() => json!({
                "error": self.message.clone(),
                "retry_after": self.retry_after,
            }),
            None => json!({ "error": self.message.clone() }),
        };

        let mut response = (self.status, Json(body)).into_response();

        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
            .extensions_mut()
            .insert(ErrorMessage(self.message));
        response
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::BatchValidation(items) => Self {
                status: StatusCode::BAD_REQUEST,
                message: "batch validation failed".to_string(),
                batch_errors: Some(
                    items
                        .into_iter()
                        .map(|(index, e)| (index, e.to_string()))
                        .collect(),
                ),
                retry_after: None,
            },
            Error::NotFound => Self::not_found("url not found"),
            e if e.http_status() == 400 => Self::bad_request(e.to_string()),
            e => Self::internal(e.to_string()),
        }
    }
}
