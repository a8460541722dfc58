//!
//! HTTP server implementation for the Ollama metrics proxy.
//!
//! Hosts the per-request orchestration: read the inbound body, sniff the
//! metric labels, forward upstream, then hand the response to the relay in
//! the mode the request asked for. Also serves the Prometheus exposition
//! endpoint and a small informational root page.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::Client;

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::metrics::{ProxyMetrics, RequestLabels};
use crate::payload::RequestPayload;
use crate::relay::{relay, RelayContext, RelayMode};
use crate::upstream::{build_upstream_url, forward};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application state containing all dependencies.
///
/// The metric registry is the only shared mutable resource; it is injected
/// here rather than reached through a global so tests can run against
/// isolated instances.
pub struct AppState {
    /** application configuration */
    pub config: Config,
    /** HTTP client for upstream requests */
    pub http_client: Client,
    /** shared metric registry */
    pub metrics: Arc<ProxyMetrics>,
}

/* --- constants ------------------------------------------------------------------------------ */

/** status label for synthesized upstream-failure responses */
const BAD_GATEWAY_LABEL: &str = "502";

/** content type of the Prometheus text exposition format */
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/** informational text served at the root path */
const INDEX_TEXT: &str =
    "Ollama metrics proxy\n\nUse /api/* for Ollama endpoints and /metrics for Prometheus metrics.\n";

/* --- start of code -------------------------------------------------------------------------- */

impl AppState {
    ///
    /// Create new application state with all dependencies.
    ///
    /// # Arguments
    ///  * `config` - application configuration
    ///
    /// # Returns
    ///  * Application state with initialized dependencies
    ///  * `ProxyError` if client or registry construction fails
    pub fn new(config: Config) -> Result<Self> {
        let http_client = Self::create_http_client()?;
        let metrics = Arc::new(ProxyMetrics::new()?);

        Ok(Self { config, http_client, metrics })
    }

    ///
    /// Create the shared HTTP client.
    ///
    /// Deliberately carries no overall timeout: streamed upstream responses
    /// may be long-lived. Cancellation follows the inbound request instead -
    /// when the client goes away the handler future and the relay body are
    /// dropped, which releases the upstream connection.
    ///
    /// # Returns
    ///  * Configured HTTP client
    ///  * `ProxyError::Http` if client creation fails
    fn create_http_client() -> Result<Client> {
        Client::builder()
            .build()
            .map_err(|e| ProxyError::Http(format!("Failed to create HTTP client: {}", e)))
    }
}

///
/// Proxy an `/api/*` request to the upstream and record metrics.
///
/// Per-request state machine: read body, sniff labels, forward, relay.
/// An unreadable inbound body answers 400 with no metrics (the request never
/// reached a labeled state). An upstream transport failure answers a
/// synthesized 502 and is counted with that status. Every other branch
/// terminates inside the relay, which emits the counter and duration exactly
/// once.
///
/// # Arguments
///  * `state` - shared application state
///  * `req` - raw inbound request
///
/// # Returns
///  * Relayed upstream response, or a synthesized error response
pub async fn proxy(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let started = Instant::now();

    let (parts, body) = req.into_parts();
    let endpoint = parts.uri.path().to_string();
    let raw_query = parts.uri.query().map(str::to_string);

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("failed to read request body for {}: {}", endpoint, e);
            return (StatusCode::BAD_REQUEST, "failed to read request body\n").into_response();
        }
    };

    let payload = RequestPayload::sniff(&body);
    let labels = RequestLabels {
        endpoint,
        model: payload.model().to_string(),
        stream: payload.stream_label(),
    };

    state.metrics.add_bytes_in(&labels, body.len() as u64);

    let url = build_upstream_url(&state.config.upstream, &labels.endpoint, raw_query.as_deref());
    tracing::debug!("forwarding {} {} to {}", parts.method, labels.endpoint, url);

    let upstream_response =
        match forward(&state.http_client, parts.method, &url, &parts.headers, body).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("upstream error: {}", e);
                state.metrics.observe_request(
                    &labels,
                    BAD_GATEWAY_LABEL,
                    started.elapsed().as_secs_f64(),
                );
                return (StatusCode::BAD_GATEWAY, "upstream error\n").into_response();
            }
        };

    let mode = RelayMode::from(payload.stream());
    let ctx = RelayContext { metrics: Arc::clone(&state.metrics), labels, started };

    relay(upstream_response, mode, ctx).await
}

///
/// Serve the Prometheus text exposition for all registered series.
///
/// # Arguments
///  * `state` - shared application state with the metric registry
///
/// # Returns
///  * Exposition text, or 500 if encoding fails
pub async fn metrics_exposition(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => ([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], text).into_response(),
        Err(e) => {
            tracing::error!("failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render metrics\n").into_response()
        }
    }
}

///
/// Serve the static informational root page.
pub async fn index() -> &'static str {
    INDEX_TEXT
}

/* --- tests ----------------------------------------------------------------------------------- */
