//!
//! Prometheus metric registry for the Ollama metrics proxy.
//!
//! Owns the six pre-registered series the proxy emits and the text exposition
//! rendering for the `/metrics` endpoint. The registry is constructed once at
//! startup and handed to the server state explicitly (dependency-injected, no
//! globals) so tests can run against isolated instances.
//!
//! All increment/observe operations are internally synchronized by the
//! prometheus client library; callers must never add their own locking.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::Result;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Label tuple shared by the per-request series.
///
/// `endpoint` and `model` come straight from client input. Model names are
/// therefore an unbounded-cardinality risk inherited from the source design;
/// callers that need bounded cardinality should normalize the model name
/// before building the labels.
#[derive(Debug, Clone)]
pub struct RequestLabels {
    /** inbound request path, e.g. `/api/generate` */
    pub endpoint: String,
    /** model name sniffed from the request body, `unknown` when absent */
    pub model: String,
    /** `"true"` / `"false"` streaming flag label */
    pub stream: &'static str,
}

///
/// The proxy's metric series, pre-registered against one registry.
///
/// All series exist from startup; a label tuple only appears in the
/// exposition output once it has been touched.
pub struct ProxyMetrics {
    /** registry backing the /metrics exposition */
    registry: Registry,
    /** requests handled, by endpoint/model/status/stream */
    requests_total: IntCounterVec,
    /** wall-clock request duration in seconds, by endpoint/model/stream */
    request_duration: HistogramVec,
    /** request body bytes received, by endpoint/model/stream */
    bytes_in: IntCounterVec,
    /** response body bytes relayed to clients, by endpoint/model/stream */
    bytes_out: IntCounterVec,
    /** prompt tokens reported by buffered upstream responses */
    prompt_tokens: IntCounterVec,
    /** completion tokens reported by buffered upstream responses */
    completion_tokens: IntCounterVec,
}

/* --- start of code -------------------------------------------------------------------------- */

impl ProxyMetrics {
    ///
    /// Create the registry and register all six series.
    ///
    /// # Returns
    ///  * Metrics instance ready for recording
    ///  * `ProxyError::Metrics` if registration fails (duplicate names)
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "ollama_proxy_requests_total",
                "Total number of requests handled by the Ollama proxy",
            ),
            &["endpoint", "model", "status", "stream"],
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "ollama_proxy_request_duration_seconds",
                "Duration of Ollama requests handled by the proxy",
            ),
            &["endpoint", "model", "stream"],
        )?;

        let bytes_in = IntCounterVec::new(
            Opts::new(
                "ollama_proxy_request_bytes_in_total",
                "Total number of bytes received in request bodies",
            ),
            &["endpoint", "model", "stream"],
        )?;

        let bytes_out = IntCounterVec::new(
            Opts::new(
                "ollama_proxy_response_bytes_out_total",
                "Total number of bytes sent in response bodies",
            ),
            &["endpoint", "model", "stream"],
        )?;

        let prompt_tokens = IntCounterVec::new(
            Opts::new(
                "ollama_proxy_prompt_tokens_total",
                "Total number of prompt tokens (from Ollama eval stats, stream=false only)",
            ),
            &["endpoint", "model"],
        )?;

        let completion_tokens = IntCounterVec::new(
            Opts::new(
                "ollama_proxy_completion_tokens_total",
                "Total number of completion tokens (from Ollama eval stats, stream=false only)",
            ),
            &["endpoint", "model"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(bytes_in.clone()))?;
        registry.register(Box::new(bytes_out.clone()))?;
        registry.register(Box::new(prompt_tokens.clone()))?;
        registry.register(Box::new(completion_tokens.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            bytes_in,
            bytes_out,
            prompt_tokens,
            completion_tokens,
        })
    }

    ///
    /// Count a finished request and observe its duration.
    ///
    /// The two series are emitted together, exactly once per request that
    /// reached a labeled state, whatever the outcome branch.
    ///
    /// # Arguments
    ///  * `labels` - endpoint/model/stream label tuple
    ///  * `status` - string form of the HTTP status sent to the client
    ///  * `elapsed_secs` - wall-clock seconds from arrival to completion
    pub fn observe_request(&self, labels: &RequestLabels, status: &str, elapsed_secs: f64) {
        self.requests_total
            .with_label_values(&[&labels.endpoint, &labels.model, status, labels.stream])
            .inc();
        self.request_duration
            .with_label_values(&[&labels.endpoint, &labels.model, labels.stream])
            .observe(elapsed_secs);
    }

    ///
    /// Add inbound request body bytes.
    ///
    /// # Arguments
    ///  * `labels` - endpoint/model/stream label tuple
    ///  * `n` - body size in bytes
    pub fn add_bytes_in(&self, labels: &RequestLabels, n: u64) {
        self.bytes_in
            .with_label_values(&[&labels.endpoint, &labels.model, labels.stream])
            .inc_by(n);
    }

    ///
    /// Add response body bytes relayed to the client.
    ///
    /// # Arguments
    ///  * `labels` - endpoint/model/stream label tuple
    ///  * `n` - bytes actually written (full buffer or streamed-so-far)
    pub fn add_bytes_out(&self, labels: &RequestLabels, n: u64) {
        self.bytes_out
            .with_label_values(&[&labels.endpoint, &labels.model, labels.stream])
            .inc_by(n);
    }

    ///
    /// Add token counts reported by a buffered upstream response.
    ///
    /// Absent counts are simply not incremented; there is no error path.
    ///
    /// # Arguments
    ///  * `endpoint` - inbound request path
    ///  * `model` - sniffed model name
    ///  * `prompt` - `prompt_eval_count` when the upstream reported one
    ///  * `completion` - `eval_count` when the upstream reported one
    pub fn add_token_counts(
        &self,
        endpoint: &str,
        model: &str,
        prompt: Option<u64>,
        completion: Option<u64>,
    ) {
        if let Some(n) = prompt {
            self.prompt_tokens.with_label_values(&[endpoint, model]).inc_by(n);
        }
        if let Some(n) = completion {
            self.completion_tokens.with_label_values(&[endpoint, model]).inc_by(n);
        }
    }

    ///
    /// Render all series in the Prometheus text exposition format.
    ///
    /// # Returns
    ///  * Exposition text for the /metrics endpoint
    ///  * `ProxyError::Metrics` if encoding fails
    pub fn render(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("metrics output is not valid UTF-8: {}", e)).into()
        })
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(stream: &'static str) -> RequestLabels {
        RequestLabels {
            endpoint: "/api/generate".to_string(),
            model: "llama3".to_string(),
            stream,
        }
    }

    #[test]
    fn test_observe_request_emits_counter_and_histogram() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.observe_request(&labels("false"), "200", 0.25);

        let output = metrics.render().unwrap();
        assert!(output.contains(
            "ollama_proxy_requests_total{endpoint=\"/api/generate\",model=\"llama3\",status=\"200\",stream=\"false\"} 1"
        ));
        assert!(output.contains("ollama_proxy_request_duration_seconds_count"));
        assert!(output.contains("ollama_proxy_request_duration_seconds_sum"));
    }

    #[test]
    fn test_byte_counters_accumulate() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.add_bytes_in(&labels("true"), 100);
        metrics.add_bytes_in(&labels("true"), 40);
        metrics.add_bytes_out(&labels("true"), 500);

        let output = metrics.render().unwrap();
        assert!(output.contains(
            "ollama_proxy_request_bytes_in_total{endpoint=\"/api/generate\",model=\"llama3\",stream=\"true\"} 140"
        ));
        assert!(output.contains(
            "ollama_proxy_response_bytes_out_total{endpoint=\"/api/generate\",model=\"llama3\",stream=\"true\"} 500"
        ));
    }

    #[test]
    fn test_token_counts_only_when_present() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.add_token_counts("/api/generate", "llama3", Some(3), Some(10));
        metrics.add_token_counts("/api/generate", "llama3", None, None);

        let output = metrics.render().unwrap();
        assert!(output.contains(
            "ollama_proxy_prompt_tokens_total{endpoint=\"/api/generate\",model=\"llama3\"} 3"
        ));
        assert!(output.contains(
            "ollama_proxy_completion_tokens_total{endpoint=\"/api/generate\",model=\"llama3\"} 10"
        ));
    }

    #[test]
    fn test_untouched_tuples_do_not_appear() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.observe_request(&labels("true"), "200", 0.01);

        let output = metrics.render().unwrap();
        assert!(!output.contains("ollama_proxy_prompt_tokens_total{"));
        assert!(!output.contains("ollama_proxy_completion_tokens_total{"));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(ProxyMetrics::new().unwrap());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.observe_request(&labels("true"), "200", 0.001);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let output = metrics.render().unwrap();
        assert!(output.contains(
            "ollama_proxy_requests_total{endpoint=\"/api/generate\",model=\"llama3\",status=\"200\",stream=\"true\"} 800"
        ));
    }
}
