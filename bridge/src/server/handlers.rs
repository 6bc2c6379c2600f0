//! HTTP route handlers for the bridge.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;

use super::error::ApiError;
use crate::decode::decode_write_request;
use crate::metrics::{Metrics, Outcome};
use crate::writer::BatchWriter;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub writer: Arc<BatchWriter>,
    pub metrics: Arc<Metrics>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Handle POST /receive
///
/// Accepts a snappy-compressed protobuf `WriteRequest`. Responds `ok` once
/// the payload decodes, even if the commit later fails; the failure only shows
/// up in the transaction duration metric.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(
        request_id = uuid::Uuid::new_v4().to_string(),
        body_size = body.len(),
        content_encoding = header_str(&headers, "content-encoding"),
        series_count = tracing::field::Empty,
        samples_count = tracing::field::Empty
    )
)]
pub async fn handle_receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let request = decode_write_request(&body).inspect_err(|e| {
        tracing::warn!("decode err: {}", e);
    })?;

    let span = tracing::Span::current();
    span.record("series_count", request.timeseries.len());
    span.record("samples_count", request.sample_count());

    match state.writer.write(&request).await? {
        Outcome::Ok => tracing::debug!("Stored remote write request"),
        Outcome::Failed => tracing::debug!("Remote write request answered despite failed commit"),
    }

    Ok("ok")
}

/// Handle GET /metrics
pub async fn handle_metrics(State(state): State<AppState>) -> String {
    state.metrics.encode()
}

/// Handle GET /-/healthy
pub async fn handle_healthy() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Handle GET /-/ready
///
/// Ready once the store answers a ping.
pub async fn handle_ready(State(state): State<AppState>) -> (StatusCode, String) {
    match state.writer.store().ping().await {
        Ok(()) => (StatusCode::OK, "OK".to_string()),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}
