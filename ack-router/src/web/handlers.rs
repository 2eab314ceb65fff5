//! Webhook endpoint handlers.
//!
//! These handlers only translate between axum and the transport-neutral
//! [`App`]: they read the method, signature headers and raw body, run the
//! pipeline on the blocking pool, and write the status and body back.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::app::{AckResponse, App, InboundRequest};
use crate::error::AppError;

/// Header carrying the `v0=<hex>` request signature.
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Header carrying the UNIX timestamp the signature covers.
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
}

impl AppState {
    pub fn new(app: App) -> Self {
        Self { app: Arc::new(app) }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Slack Webhook
// =============================================================================

/// Slack webhook endpoint.
///
/// Mounted with `any()` so that non-POST requests reach the pipeline and are
/// rejected as auth failures. Handlers are synchronous, so the pipeline runs
/// on tokio's blocking pool and a slow handler only holds up its own request.
pub async fn webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!(
        method = %method,
        body_length = body.len(),
        has_signature = headers.contains_key(SIGNATURE_HEADER),
        has_timestamp = headers.contains_key(TIMESTAMP_HEADER),
        "webhook_received"
    );

    let request = InboundRequest {
        method: method.to_string(),
        signature: header_str(&headers, SIGNATURE_HEADER),
        timestamp: header_str(&headers, TIMESTAMP_HEADER),
        body: body.to_vec(),
    };

    let app = Arc::clone(&state.app);
    let response = match tokio::task::spawn_blocking(move || app.process(&request)).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "webhook_pipeline_aborted");
            state
                .app
                .error_response(&AppError::Handler(anyhow::Error::new(e)))
        }
    };

    into_http_response(response)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Write an [`AckResponse`] as an HTTP response. A non-empty body gets
/// `Content-Type: application/json` and an explicit `Content-Length`.
pub fn into_http_response(ack: AckResponse) -> Response {
    let status = match StatusCode::from_u16(ack.status) {
        Ok(status) => status,
        Err(_) => {
            error!(status = ack.status, "webhook_invalid_status");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = ack.content_type();
    let length = ack.body.len();
    let mut response = (status, Body::from(ack.body)).into_response();

    if let Some(content_type) = content_type {
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    response
}
