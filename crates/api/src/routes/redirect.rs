//! Short-code redirect endpoint.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension,
};
use shortlink_core::Error;
use shortlink_metrics::labels;
use tracing::error;
use url::Url;

use crate::middleware::metrics::ClientIp;
use crate::response::ApiError;
use crate::state::AppState;

/// GET /{code} — 302 to the original URL.
pub async fn redirect(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if code.is_empty() {
        return Err(ApiError::bad_request("code is required"));
    }

    let referrer = referrer_domain(&headers);

    let original_url = match state.service.get_original_url(&code).await {
        Ok(url) => url,
        Err(Error::NotFound) => {
            state.recorder.record_business(
                "url_not_found",
                1.0,
                labels(&[
                    ("short_code", &code),
                    ("client_ip", &client_ip),
                    ("referrer", &referrer),
                ]),
            );
            return Err(ApiError::not_found("url not found"));
        }
        Err(e) => {
            error!(error = %e, "failed to get original url");
            return Err(ApiError::internal("failed to get url"));
        }
    };

    state.recorder.record_business(
        "unique_visitors",
        1.0,
        labels(&[("short_code", &code), ("client_ip", &client_ip)]),
    );
    state.recorder.record_business(
        "referrer_redirects",
        1.0,
        labels(&[("short_code", &code), ("referrer", &referrer)]),
    );

    Ok((StatusCode::FOUND, [(header::LOCATION, original_url)]))
}

/// Extracts the referring domain; "direct" when absent, "unknown" when
/// unparseable.
fn referrer_domain(headers: &HeaderMap) -> String {
    let Some(referer) = headers
        .get("referer")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    else {
        return "direct".to_string();
    };

    match Url::parse(referer) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        Err(_) => "unknown".to_string(),
    }
}
