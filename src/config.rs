//!
//! Configuration management for the Ollama metrics proxy.
//!
//! Handles loading configuration from command-line overrides and environment
//! variables with sensible defaults. Follows Single Responsibility Principle -
//! manages all configuration concerns.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::env;

use reqwest::Url;

use crate::error::{ProxyError, Result};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application configuration structure.
///
/// The upstream base URL is parsed eagerly so that a bad value terminates the
/// process at startup instead of failing every proxied request.
#[derive(Debug, Clone)]
pub struct Config {
    /** address the proxy listens on (e.g. `:8080` or `0.0.0.0:8080`) */
    pub listen_addr: String,
    /** Ollama upstream base URL requests are forwarded to */
    pub upstream: Url,
    /** application logging level */
    pub log_level: LogLevel,
}

///
/// Command-line overrides applied on top of environment variables.
///
/// Populated by the argument handling in `main`; flags take precedence over
/// environment variables, which take precedence over defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /** `--listen` flag value */
    pub listen: Option<String>,
    /** `--upstream` flag value */
    pub upstream: Option<String>,
}

///
/// Logging level enumeration.
///
/// Defines available log levels with helper methods for level checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

///
/// Configuration validation issue.
///
/// Represents a single validation problem found during configuration check.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Configuration field name
    pub field: String,
    /// Severity of the issue
    pub severity: ValidationSeverity,
    /// Description of the issue
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

///
/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid and will cause failures
    Error,
    /// Warning - configuration may work but has potential issues
    Warning,
    /// Info - informational note about configuration
    Info,
}

/* --- constants ------------------------------------------------------------------------------ */

/** default listen address (all interfaces, port 8080) */
const DEFAULT_LISTEN_ADDR: &str = ":8080";

/** default Ollama upstream base URL */
const DEFAULT_UPSTREAM: &str = "http://127.0.0.1:11434";

/* --- start of code -------------------------------------------------------------------------- */

impl LogLevel {
    ///
    /// Check if trace-level logging is enabled.
    ///
    /// Returns true for Trace and Debug levels, which enable detailed logging
    /// of per-request proxy activity.
    ///
    /// # Returns
    ///  * `true` if trace logging should be enabled
    ///  * `false` otherwise
    pub fn is_trace_enabled(self) -> bool {
        matches!(self, LogLevel::Trace | LogLevel::Debug)
    }
}

impl From<&str> for LogLevel {
    ///
    /// Convert string representation to LogLevel enum.
    ///
    /// Case-insensitive conversion with Info as the default fallback.
    ///
    /// # Arguments
    ///  * `s` - string representation of log level
    ///
    /// # Returns
    ///  * Corresponding LogLevel enum value
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl Config {
    ///
    /// Load configuration from environment variables only.
    ///
    /// Convenience wrapper around [`Config::load`] with no command-line
    /// overrides; used by tests and embedding applications.
    ///
    /// # Returns
    ///  * Configuration object with all settings loaded
    ///  * `ProxyError::Config` if the upstream URL is invalid
    pub fn from_env() -> Result<Self> {
        Self::load(&ConfigOverrides::default())
    }

    ///
    /// Load configuration from overrides and environment variables.
    ///
    /// Attempts to load a .env file if present, then resolves every setting
    /// as flag > environment variable > default.
    ///
    /// # Arguments
    ///  * `overrides` - command-line flag values, if any
    ///
    /// # Returns
    ///  * Configuration object with all settings loaded
    ///  * `ProxyError::Config` if the upstream URL cannot be parsed
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let listen_addr = overrides
            .listen
            .clone()
            .or_else(|| Self::get_env_nonempty("LISTEN_ADDR"))
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        let upstream_raw = overrides
            .upstream
            .clone()
            .or_else(|| Self::get_env_nonempty("OLLAMA_UPSTREAM"))
            .unwrap_or_else(|| DEFAULT_UPSTREAM.to_string());

        let upstream = Url::parse(&upstream_raw).map_err(|e| {
            ProxyError::Config(format!(
                "Invalid upstream URL {:?}: {}\n\
         \n\
         The upstream must be a full base URL, for example:\n\
            export OLLAMA_UPSTREAM=\"http://127.0.0.1:11434\"\n\
         or\n\
            ollamux --upstream http://127.0.0.1:11434",
                upstream_raw, e
            ))
        })?;

        let log_level = Self::get_log_level();

        Ok(Config { listen_addr, upstream, log_level })
    }

    ///
    /// Address suitable for binding a TCP listener.
    ///
    /// A bare `:port` form (Go-style shorthand kept for operator familiarity)
    /// is expanded to `0.0.0.0:port`; anything else is used verbatim.
    ///
    /// # Returns
    ///  * Host:port string accepted by `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        if self.listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.listen_addr)
        } else {
            self.listen_addr.clone()
        }
    }

    ///
    /// Read an environment variable, treating empty values as unset.
    fn get_env_nonempty(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    ///
    /// Get the log level from environment or use default.
    ///
    /// # Returns
    ///  * LogLevel enum value
    fn get_log_level() -> LogLevel {
        let log_level_str = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        LogLevel::from(log_level_str.as_str())
    }

    ///
    /// Validate configuration and return detailed validation results.
    ///
    /// Checks all configuration values for correctness and provides helpful
    /// suggestions for any issues found.
    ///
    /// # Returns
    ///  * Vector of validation issues (empty if all valid)
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.listen_addr.is_empty() {
            issues.push(ValidationIssue {
                field: "LISTEN_ADDR".to_string(),
                severity: ValidationSeverity::Error,
                message: "Listen address is empty".to_string(),
                suggestion: Some("Use the form :8080 or 0.0.0.0:8080".to_string()),
            });
        }

        match self.upstream.scheme() {
            "http" | "https" => {}
            other => {
                issues.push(ValidationIssue {
                    field: "OLLAMA_UPSTREAM".to_string(),
                    severity: ValidationSeverity::Error,
                    message: format!("Unsupported upstream scheme: {}", other),
                    suggestion: Some("Use an http:// or https:// base URL".to_string()),
                });
            }
        }

        let is_local = matches!(
            self.upstream.host_str(),
            Some("localhost") | Some("127.0.0.1") | Some("::1") | Some("[::1]")
        );
        if self.upstream.scheme() == "http" && !is_local {
            issues.push(ValidationIssue {
                field: "OLLAMA_UPSTREAM".to_string(),
                severity: ValidationSeverity::Info,
                message: "Plaintext http to a non-local upstream".to_string(),
                suggestion: Some("Consider https:// when the upstream is remote".to_string()),
            });
        }

        if self.upstream.path().trim_end_matches('/').ends_with("/api") {
            issues.push(ValidationIssue {
                field: "OLLAMA_UPSTREAM".to_string(),
                severity: ValidationSeverity::Warning,
                message: "Upstream URL already ends in /api".to_string(),
                suggestion: Some(
                    "The proxy appends the inbound /api/... path itself; requests would hit /api/api/..."
                        .to_string(),
                ),
            });
        }

        issues
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
