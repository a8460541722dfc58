//!
//! Best-effort JSON sniffing of request and response bodies.
//!
//! The proxy never validates bodies; it only extracts the handful of fields
//! it needs for metric labels and token counters. Any decode failure yields
//! defaults - this layer is an annotation step, not a validation gate.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::Deserialize;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Minimal shape sniffed from an incoming request body.
///
/// Both fields are independently optional; a body that is empty, not JSON,
/// or carries wrong-typed fields decodes to all-`None`.
#[derive(Debug, Default, Deserialize)]
pub struct RequestPayload {
    /** model name requested by the client */
    pub model: Option<String>,
    /** explicit streaming flag; Ollama streams unless told otherwise */
    pub stream: Option<bool>,
}

///
/// Token usage fields present only in buffered, non-streaming Ollama
/// responses.
#[derive(Debug, Default, Deserialize)]
pub struct ResponseStats {
    /** prompt token count reported by the upstream */
    pub prompt_eval_count: Option<u64>,
    /** completion token count reported by the upstream */
    pub eval_count: Option<u64>,
}

/* --- constants ------------------------------------------------------------------------------ */

/** model label used when the body carries no usable model name */
const UNKNOWN_MODEL: &str = "unknown";

/* --- start of code -------------------------------------------------------------------------- */

impl RequestPayload {
    ///
    /// Decode the interesting fields from a raw request body.
    ///
    /// Decoding is attempted once; failure is swallowed and yields defaults.
    ///
    /// # Arguments
    ///  * `body` - raw request body bytes (may be empty or malformed)
    ///
    /// # Returns
    ///  * Sniffed payload, defaulted on any decode failure
    pub fn sniff(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    ///
    /// Model label value; `unknown` when absent or empty.
    pub fn model(&self) -> &str {
        match self.model.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => UNKNOWN_MODEL,
        }
    }

    ///
    /// Effective streaming flag; defaults to `true` when unspecified.
    pub fn stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    ///
    /// Streaming flag as a metric label value.
    pub fn stream_label(&self) -> &'static str {
        if self.stream() { "true" } else { "false" }
    }
}

impl ResponseStats {
    ///
    /// Decode token counts from a buffered upstream response body.
    ///
    /// # Arguments
    ///  * `body` - fully materialized response body bytes
    ///
    /// # Returns
    ///  * Sniffed stats, defaulted on any decode failure
    pub fn sniff(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_valid_payload() {
        let payload = RequestPayload::sniff(br#"{"model":"llama3","prompt":"Hi","stream":false}"#);
        assert_eq!(payload.model(), "llama3");
        assert!(!payload.stream());
        assert_eq!(payload.stream_label(), "false");
    }

    #[test]
    fn test_sniff_empty_body_defaults() {
        let payload = RequestPayload::sniff(b"");
        assert_eq!(payload.model(), "unknown");
        assert!(payload.stream());
        assert_eq!(payload.stream_label(), "true");
    }

    #[test]
    fn test_sniff_non_json_defaults() {
        let payload = RequestPayload::sniff(b"not json at all");
        assert_eq!(payload.model(), "unknown");
        assert!(payload.stream());
    }

    #[test]
    fn test_sniff_wrong_field_types_default() {
        let payload = RequestPayload::sniff(br#"{"model":42,"stream":"yes"}"#);
        assert_eq!(payload.model(), "unknown");
        assert!(payload.stream());
    }

    #[test]
    fn test_sniff_empty_model_is_unknown() {
        let payload = RequestPayload::sniff(br#"{"model":""}"#);
        assert_eq!(payload.model(), "unknown");
    }

    #[test]
    fn test_sniff_stream_only() {
        let payload = RequestPayload::sniff(br#"{"stream":true}"#);
        assert_eq!(payload.model(), "unknown");
        assert!(payload.stream());
    }

    #[test]
    fn test_response_stats_present() {
        let stats = ResponseStats::sniff(br#"{"response":"ok","eval_count":10,"prompt_eval_count":3}"#);
        assert_eq!(stats.prompt_eval_count, Some(3));
        assert_eq!(stats.eval_count, Some(10));
    }

    #[test]
    fn test_response_stats_absent() {
        let stats = ResponseStats::sniff(br#"{"response":"ok"}"#);
        assert_eq!(stats.prompt_eval_count, None);
        assert_eq!(stats.eval_count, None);
    }

    #[test]
    fn test_response_stats_malformed() {
        let stats = ResponseStats::sniff(b"<html>bad gateway</html>");
        assert_eq!(stats.prompt_eval_count, None);
        assert_eq!(stats.eval_count, None);
    }
}
