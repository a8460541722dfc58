//! # Ollamux - Transparent Ollama Metrics Proxy Library
//!
//! This crate provides a transparent reverse proxy that sits between clients
//! and an Ollama HTTP API, forwarding requests unmodified while recording
//! Prometheus metrics: request counts, latency, byte volume, and token usage.
//! While primarily designed as a binary application, this library exposes its
//! core functionality for programmatic use.
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use ollamux::{Config, create_app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = Config::from_env()?;
//!
//!     // Create the application
//!     let app = create_app(config)?;
//!
//!     // Start server
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration management and environment variable handling
//! - [`metrics`] - Prometheus registry with the proxy's six metric series
//! - [`payload`] - Best-effort JSON sniffing of request/response bodies
//! - [`upstream`] - Upstream URL construction and request forwarding
//! - [`relay`] - Buffered and streaming response relay with metric settlement
//! - [`server`] - HTTP server state and route handlers
//! - [`error`] - Error types and handling

pub mod config;
pub mod error;
pub mod metrics;
pub mod payload;
pub mod relay;
pub mod server;
pub mod upstream;

// Re-export commonly used types
pub use config::{Config, ConfigOverrides, ValidationIssue, ValidationSeverity};
pub use error::ProxyError;

/// Creates a new Ollamux application with the given configuration.
///
/// This is a convenience function that sets up the full application stack
/// including the metric registry, routing, and middleware.
///
/// # Arguments
///
/// * `config` - Application configuration
///
/// # Returns
///
/// Returns an Axum Router that can be served directly.
///
/// # Errors
///
/// Returns a `ProxyError` if the HTTP client or metric registry cannot be
/// constructed.
///
/// # Examples
///
/// ```rust,no_run
/// use ollamux::{Config, create_app};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///     let app = create_app(config)?;
///
///     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
///     axum::serve(listener, app).await?;
///     Ok(())
/// }
/// ```
pub fn create_app(config: Config) -> Result<axum::Router, ProxyError> {
    use axum::routing::{any, get};
    use axum::Router;
    use std::sync::Arc;
    use tower_http::trace::TraceLayer;

    let app_state = Arc::new(server::AppState::new(config)?);

    Ok(Router::new()
        .route("/", get(server::index))
        .route("/metrics", get(server::metrics_exposition))
        .route("/api/{*path}", any(server::proxy))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state))
}
