//! # Ollamux - Transparent Ollama Metrics Proxy
//!
//! A transparent reverse proxy that sits between clients and an Ollama HTTP
//! API, forwarding `/api/*` requests unmodified while recording Prometheus
//! metrics. Built with Rust following SOLID principles for type safety,
//! performance, and reliability.
//!
//! ## Features
//!
//! - **Transparent forwarding**: method, path, query, headers, and body pass
//!   through untouched
//! - **Buffered and streamed relay**: token usage is extracted from complete
//!   responses; streamed responses are piped through unbuffered
//! - **Prometheus metrics**: request counts, latency, byte volume, and token
//!   counters exposed at `/metrics`
//! - **Error Handling**: Comprehensive error handling with proper Result types
//! - **Performance**: Async/await with Tokio for high concurrency
//! - **Configurable Logging**: Structured logging with tracing
//!
//! ## Quick Start
//!
//! ```bash
//! # Point the proxy at a local Ollama and listen on :8080 (the defaults)
//! ollamux
//!
//! # Explicit configuration
//! ollamux --listen :9090 --upstream http://ollama.internal:11434
//! ```
//!
//! ## Configuration
//!
//! ```bash
//! # Optional: upstream base URL (flag takes precedence)
//! export OLLAMA_UPSTREAM="http://127.0.0.1:11434"
//!
//! # Optional: listen address and log level
//! export LISTEN_ADDR=":8080"
//! export LOG_LEVEL=info
//! ```
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.
//!
//! Authors: Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp
//!

/* --- uses ------------------------------------------------------------------------------------ */

use std::env;
use std::sync::Arc;

use axum::routing::{any, get};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

use ollamux::config::{Config, ConfigOverrides, LogLevel, ValidationSeverity};
use ollamux::error::{ProxyError, Result};
use ollamux::server::{self, AppState};

/* --- constants ------------------------------------------------------------------------------ */

/** the version as defined in cargo.toml */
const VERSION: &str = env!("CARGO_PKG_VERSION");

/* --- start of code -------------------------------------------------------------------------- */

///
/// Main application entry point for the Ollamux metrics proxy.
///
/// Parses command-line overrides, loads configuration, initializes logging,
/// creates the application state, and starts the HTTP server with proper
/// routing and middleware.
#[tokio::main]
async fn main() {
    // Handle CLI arguments before config loading
    let overrides = handle_cli_args();

    if let Err(e) = run(overrides).await {
        // Print error message line by line to ensure proper formatting
        let error_msg = format!("{}", e);
        eprintln!("Error:");
        for line in error_msg.lines() {
            eprintln!("{}", line);
        }
        std::process::exit(1);
    }
}

async fn run(overrides: ConfigOverrides) -> Result<()> {
    let config = Config::load(&overrides)?;
    initialize_logging(&config);
    log_validation_issues(&config);

    let app_state = Arc::new(AppState::new(config.clone())?);
    let app = create_router(app_state);

    start_server(&config, app).await
}

///
/// Handle command line arguments before config loading.
///
/// `--version` and `--help` work even without proper configuration; the
/// remaining flags become configuration overrides that take precedence over
/// environment variables.
///
/// # Returns
///  * Configuration overrides parsed from the command line
fn handle_cli_args() -> ConfigOverrides {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut overrides = ConfigOverrides::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("ollamux {}", VERSION);
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--listen" | "-l" => {
                overrides.listen = Some(expect_value(arg, iter.next()));
            }
            "--upstream" | "-u" => {
                overrides.upstream = Some(expect_value(arg, iter.next()));
            }
            other => {
                if let Some(value) = other.strip_prefix("--listen=") {
                    overrides.listen = Some(value.to_string());
                } else if let Some(value) = other.strip_prefix("--upstream=") {
                    overrides.upstream = Some(value.to_string());
                } else {
                    eprintln!("Error: Unknown option: {}", other);
                    eprintln!();
                    print_help();
                    std::process::exit(1);
                }
            }
        }
    }

    overrides
}

///
/// Require a value after a flag, exiting with help when it is missing.
fn expect_value(flag: &str, value: Option<&String>) -> String {
    match value {
        Some(v) => v.clone(),
        None => {
            eprintln!("Error: Missing value for {}", flag);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    }
}

///
/// Print help information for the Ollamux CLI.
fn print_help() {
    println!("Ollamux v{}", VERSION);
    println!("Transparent reverse proxy for Ollama with Prometheus metrics");
    println!();
    println!("USAGE:");
    println!("    ollamux [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -l, --listen <ADDR>     Listen address (default: :8080)");
    println!("    -u, --upstream <URL>    Ollama upstream base URL (default: http://127.0.0.1:11434)");
    println!("    -h, --help              Print help information");
    println!("    -V, --version           Print version information");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    OLLAMA_UPSTREAM           Upstream base URL (flag takes precedence)");
    println!("    LISTEN_ADDR               Listen address (flag takes precedence)");
    println!("    LOG_LEVEL                 Log level: trace, debug, info, warn, error (default: info)");
    println!();
    println!("EXAMPLES:");
    println!("    ollamux                                     Proxy a local Ollama on :8080");
    println!("    ollamux --listen :9090                      Listen on another port");
    println!("    ollamux --upstream http://10.0.0.5:11434    Proxy a remote Ollama");
    println!();
    println!("For more information, visit: https://github.com/yarenty/ollamux");
}

///
/// Initialize logging with the specified log level.
///
/// Sets up tracing subscriber with appropriate log level based on configuration.
///
/// # Arguments
///  * `config` - application configuration containing log level settings
fn initialize_logging(config: &Config) {
    let log_level = match config.log_level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    };

    tracing_subscriber::fmt().with_max_level(log_level).with_target(false).init();
}

///
/// Log configuration validation issues at the matching severity.
///
/// Validation never aborts startup here; hard failures (unparsable upstream
/// URL, unbindable listener) already terminate on their own paths.
///
/// # Arguments
///  * `config` - loaded application configuration
fn log_validation_issues(config: &Config) {
    for issue in config.validate() {
        let suggestion = issue.suggestion.as_deref().unwrap_or("");
        match issue.severity {
            ValidationSeverity::Error => {
                tracing::error!("{}: {} {}", issue.field, issue.message, suggestion)
            }
            ValidationSeverity::Warning => {
                warn!("{}: {} {}", issue.field, issue.message, suggestion)
            }
            ValidationSeverity::Info => {
                info!("{}: {} {}", issue.field, issue.message, suggestion)
            }
        }
    }
}

///
/// Create the Axum router with all routes and middleware.
///
/// Exposes the proxied `/api/*` surface, the Prometheus exposition endpoint,
/// and an informational root page, with request tracing middleware.
///
/// # Arguments
///  * `app_state` - shared application state
///
/// # Returns
///  * Configured Axum router ready for serving
fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(server::index))
        .route("/metrics", get(server::metrics_exposition))
        .route("/api/{*path}", any(server::proxy))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

///
/// Start the HTTP server and log startup information.
///
/// Binds to the configured address and starts serving requests.
///
/// # Arguments
///  * `config` - application configuration
///  * `app` - configured Axum application
///
/// # Returns
///  * `Ok(())` when server shuts down gracefully
///  * `ProxyError::Http` if server binding or startup fails
async fn start_server(config: &Config, app: Router) -> Result<()> {
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.map_err(|e| {
        ProxyError::Http(format!(
            "Failed to bind to {}: {}\n\
       \n\
       To fix this:\n\
       • Check that the address is valid and the port is free\n\
       • Find the process using the port: lsof -i :{}\n\
       • Or pick another address: ollamux --listen :9090",
            bind_addr,
            e,
            config.listen_addr.trim_start_matches(':'),
        ))
    })?;

    log_startup_info(config);

    axum::serve(listener, app)
        .await
        .map_err(|e| ProxyError::Http(format!("Server error: {}", e)))?;

    Ok(())
}

///
/// Log startup information and configuration details.
///
/// # Arguments
///  * `config` - application configuration
fn log_startup_info(config: &Config) {
    info!(
        "Ollamux v{} listening on {}, upstream {}",
        VERSION,
        config.listen_addr,
        config.upstream
    );
    info!("Proxying /api/* to the upstream; Prometheus metrics at /metrics");

    if config.log_level.is_trace_enabled() {
        info!(
            "[TRACE] Trace logging is ENABLED (LOG_LEVEL={:?}) - per-request forwarding will be logged",
            config.log_level
        );
    }
}
