//! Configuration module tests
//!
//! Tests for configuration loading, precedence, and parsing from environment
//! variables and command-line overrides.
//!
//! Uses temp-env to safely manage environment variables during tests,
//! automatically restoring them after each test completes.

use ollamux::config::{Config, ConfigOverrides, LogLevel};
use ollamux::ProxyError;
use temp_env::with_vars;

/// Test built-in defaults when nothing is configured
#[test]
fn test_defaults() {
    // Skip this test if .env file exists, as dotenv() will load vars from it
    if std::path::Path::new(".env").exists() {
        eprintln!("Skipping test_defaults: .env file exists");
        return;
    }

    with_vars(
        vec![("LISTEN_ADDR", None::<&str>), ("OLLAMA_UPSTREAM", None::<&str>)],
        || {
            let config = Config::from_env().expect("Should load config with defaults");
            assert_eq!(config.listen_addr, ":8080", "Default listen address should be :8080");
            assert_eq!(
                config.upstream.as_str(),
                "http://127.0.0.1:11434/",
                "Default upstream should be the local Ollama"
            );
        },
    );
}

/// Test that environment variables override defaults
#[test]
fn test_env_overrides_defaults() {
    with_vars(
        vec![
            ("LISTEN_ADDR", Some(":9090")),
            ("OLLAMA_UPSTREAM", Some("http://10.0.0.5:11434")),
        ],
        || {
            let config = Config::from_env().expect("Should load config");
            assert_eq!(config.listen_addr, ":9090");
            assert_eq!(config.upstream.as_str(), "http://10.0.0.5:11434/");
        },
    );
}

/// Test that command-line flags take precedence over environment variables
#[test]
fn test_flags_override_env() {
    with_vars(
        vec![
            ("LISTEN_ADDR", Some(":9090")),
            ("OLLAMA_UPSTREAM", Some("http://from-env:11434")),
        ],
        || {
            let overrides = ConfigOverrides {
                listen: Some("127.0.0.1:7070".to_string()),
                upstream: Some("http://from-flag:11434".to_string()),
            };
            let config = Config::load(&overrides).expect("Should load config");
            assert_eq!(config.listen_addr, "127.0.0.1:7070", "Flag should beat env");
            assert_eq!(config.upstream.as_str(), "http://from-flag:11434/", "Flag should beat env");
        },
    );
}

/// Test that empty environment values are treated as unset
#[test]
fn test_empty_env_is_unset() {
    if std::path::Path::new(".env").exists() {
        eprintln!("Skipping test_empty_env_is_unset: .env file exists");
        return;
    }

    with_vars(
        vec![("LISTEN_ADDR", Some("")), ("OLLAMA_UPSTREAM", Some(""))],
        || {
            let config = Config::from_env().expect("Should load config");
            assert_eq!(config.listen_addr, ":8080");
            assert_eq!(config.upstream.as_str(), "http://127.0.0.1:11434/");
        },
    );
}

/// Test that an invalid upstream URL fails configuration loading
#[test]
fn test_invalid_upstream_url() {
    with_vars(vec![("OLLAMA_UPSTREAM", Some("not a url at all"))], || {
        let result = Config::from_env();
        assert!(result.is_err(), "Should fail with invalid upstream URL");
        if let Err(e) = result {
            assert!(
                matches!(e, ProxyError::Config(_)),
                "Should be a Config error, got: {:?}",
                e
            );
            assert!(
                format!("{}", e).contains("upstream"),
                "Error should mention the upstream URL"
            );
        }
    });
}

/// Test log level parsing
#[test]
fn test_log_level_parsing() {
    let levels = vec!["trace", "debug", "info", "warn", "error"];
    for level in levels {
        with_vars(vec![("LOG_LEVEL", Some(level))], || {
            let config = Config::from_env().expect("Should load config");
            assert_eq!(
                format!("{:?}", config.log_level).to_lowercase(),
                level,
                "Should parse log level correctly"
            );
        });
    }
}

/// Test default log level
#[test]
fn test_default_log_level() {
    // Skip this test if .env file exists, as dotenv() will load LOG_LEVEL from it
    if std::path::Path::new(".env").exists() {
        eprintln!("Skipping test_default_log_level: .env file exists");
        return;
    }

    with_vars(vec![("LOG_LEVEL", None::<&str>)], || {
        let config = Config::from_env().expect("Should load config");
        assert_eq!(config.log_level, LogLevel::Info, "Default log level should be Info");
    });
}

/// Test LogLevel::from string conversion
#[test]
fn test_log_level_from_str() {
    assert_eq!(LogLevel::from("trace"), LogLevel::Trace);
    assert_eq!(LogLevel::from("TRACE"), LogLevel::Trace); // Case insensitive
    assert_eq!(LogLevel::from("debug"), LogLevel::Debug);
    assert_eq!(LogLevel::from("info"), LogLevel::Info);
    assert_eq!(LogLevel::from("warn"), LogLevel::Warn);
    assert_eq!(LogLevel::from("error"), LogLevel::Error);
    assert_eq!(LogLevel::from("unknown"), LogLevel::Info); // Default
}

/// Test LogLevel::is_trace_enabled
#[test]
fn test_log_level_trace_enabled() {
    assert!(LogLevel::Trace.is_trace_enabled(), "Trace should enable trace logging");
    assert!(LogLevel::Debug.is_trace_enabled(), "Debug should enable trace logging");
    assert!(!LogLevel::Info.is_trace_enabled(), "Info should not enable trace logging");
    assert!(!LogLevel::Warn.is_trace_enabled(), "Warn should not enable trace logging");
    assert!(!LogLevel::Error.is_trace_enabled(), "Error should not enable trace logging");
}

/// Test validation of a well-formed configuration
#[test]
fn test_validate_clean_config() {
    with_vars(vec![("OLLAMA_UPSTREAM", Some("http://127.0.0.1:11434"))], || {
        let config = Config::from_env().expect("Should load config");
        assert!(config.validate().is_empty(), "Clean config should have no issues");
    });
}
