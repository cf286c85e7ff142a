//! Per-request HTTP metrics middleware.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use shortlink_metrics::HttpMetric;

use crate::response::ErrorMessage;
use crate::state::AppState;

/// Request extension carrying the resolved client IP.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

/// Resolves the client IP from proxy headers, falling back to the socket
/// peer address.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Records one [`HttpMetric`] per completed request.
///
/// Runs outermost so rate-limited and failed requests are captured too. The
/// recorded path is the matched route template, not the raw URI, to keep
/// cardinality bounded.
pub async fn track(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let time = Utc::now();
    let started = Instant::now();

    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let ip = client_ip(req.headers(), req.extensions());

    req.extensions_mut().insert(ClientIp(ip.clone()));

    let response = next.run(req).await;

    let error = response
        .extensions()
        .get::<ErrorMessage>()
        .map(|e| e.0.clone())
        .unwrap_or_default();

    state.recorder.record_http(HttpMetric {
        time,
        method,
        path,
        status_code: response.status().as_u16() as i32,
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        client_ip: ip,
        error,
    });

    response
}
