//!
//! Upstream request construction and forwarding.
//!
//! Builds the equivalent outbound request against the configured Ollama base
//! URL: same method, same path and query, headers copied without hop-by-hop
//! stripping (accepted simplification), same body bytes. The shared client
//! carries no timeout because streamed responses may run for a long time;
//! cancellation follows the inbound request instead.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use reqwest::{Client, Url};

use crate::error::Result;

/* --- constants ------------------------------------------------------------------------------ */

/** content type applied when the inbound request carries none */
const CONTENT_TYPE_JSON: &str = "application/json";

/* --- start of code -------------------------------------------------------------------------- */

///
/// Build the full upstream URL for a proxied request.
///
/// Joins the configured base (trailing slash trimmed) with the inbound path
/// and re-attaches the raw query string verbatim.
///
/// # Arguments
///  * `base` - configured upstream base URL
///  * `path` - inbound request path, e.g. `/api/generate`
///  * `raw_query` - inbound raw query string, if any
///
/// # Returns
///  * Complete URL string for the outbound request
pub fn build_upstream_url(base: &Url, path: &str, raw_query: Option<&str>) -> String {
    let mut url = base.clone();
    let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url.set_query(raw_query);
    url.to_string()
}

///
/// Issue the equivalent request against the upstream.
///
/// All inbound headers are copied except the message-framing ones (`host`,
/// `content-length`, `transfer-encoding`), which the HTTP client owns for the
/// rebuilt request. A missing `Content-Type` defaults to `application/json`.
///
/// # Arguments
///  * `client` - shared HTTP client (no timeout configured)
///  * `method` - inbound request method
///  * `url` - full upstream URL from [`build_upstream_url`]
///  * `headers` - inbound request headers
///  * `body` - fully read inbound body bytes
///
/// # Returns
///  * Upstream response ready for relaying
///  * `ProxyError::Upstream` on transport failure (mapped to 502 by the caller)
pub async fn forward(
    client: &Client,
    method: Method,
    url: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<reqwest::Response> {
    let mut outbound = HeaderMap::with_capacity(headers.len() + 1);
    for (name, value) in headers {
        if name == &HOST || name == &CONTENT_LENGTH || name == &TRANSFER_ENCODING {
            continue;
        }
        outbound.append(name, value.clone());
    }

    if !outbound.contains_key(CONTENT_TYPE) {
        outbound.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    }

    let response = client.request(method, url).headers(outbound).body(body).send().await?;
    Ok(response)
}

/* --- tests ----------------------------------------------------------------------------------- */
