//! Short URL creation endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shortlink_core::{CreateUrlBatchRequest, CreateUrlBatchResponse, CreateUrlRequest};
use tracing::error;

use crate::response::ApiError;
use crate::state::AppState;

/// POST /api/v1/urls
pub async fn create_url(
    State(state): State<AppState>,
    payload: Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| {
        error!(error = %e, "failed to parse request body");
        ApiError::bad_request("invalid request body")
    })?;

    state.validator.validate_url(&req.url)?;

    let response = state
        .service
        .create_short_url(&req.url)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to create short url");
            ApiError::internal("failed to create short url")
        })?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/urls/batch
pub async fn create_url_batch(
    State(state): State<AppState>,
    payload: Result<Json<CreateUrlBatchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| {
        error!(error = %e, "failed to parse request body");
        ApiError::bad_request("invalid request body")
    })?;

    state.validator.validate_batch(&req.urls)?;

    let urls = state
        .service
        .create_short_url_batch(&req.urls)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to create short urls");
            ApiError::internal("failed to create short urls")
        })?;

    Ok((StatusCode::CREATED, Json(CreateUrlBatchResponse { urls })))
}
