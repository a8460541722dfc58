//!
//! Response relay: copies the upstream reply back to the client.
//!
//! One contract, two implementations selected by the sniffed streaming flag.
//! Buffered mode materializes the whole body so token stats can be extracted
//! before anything is written; streaming mode pipes bytes through unbuffered
//! and settles its metrics only when the copy terminates. Both emit the
//! request counter and duration exactly once. A body abandoned by the client
//! (dropped before completion) emits nothing.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::metrics::{ProxyMetrics, RequestLabels};
use crate::payload::ResponseStats;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Relay mode, selected by the sniffed `stream` flag of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /** materialize the full body, extract token stats, then write */
    Buffered,
    /** pipe bytes through as they arrive, no full materialization */
    Streaming,
}

///
/// Everything the relay needs to settle metrics for one request.
pub struct RelayContext {
    /** shared metric registry */
    pub metrics: Arc<ProxyMetrics>,
    /** label tuple derived at request arrival */
    pub labels: RequestLabels,
    /** request arrival instant, for the duration observation */
    pub started: Instant,
}

///
/// Byte stream adapter that counts what passes through and settles the
/// request's metrics on the terminal event (EOF or upstream error).
///
/// The pending state is `take`n on settlement so emission happens at most
/// once; a stream dropped before its terminal event emits nothing, which is
/// the contract for client-abandoned requests.
struct MeteredBody {
    /** upstream byte stream being relayed */
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    /** bytes forwarded so far */
    relayed: u64,
    /** metric context plus status label, present until settled */
    pending: Option<(RelayContext, String)>,
}

/* --- start of code -------------------------------------------------------------------------- */

impl From<bool> for RelayMode {
    fn from(stream: bool) -> Self {
        if stream { RelayMode::Streaming } else { RelayMode::Buffered }
    }
}

///
/// Relay an upstream response to the client in the given mode.
///
/// The returned response carries the upstream status and an unfiltered copy
/// of the upstream headers (no hop-by-hop stripping); only message-framing
/// headers are left to the server, which rebuilds them for the new body.
///
/// # Arguments
///  * `upstream` - response received from the upstream
///  * `mode` - buffered or streaming relay
///  * `ctx` - metric context for this request
///
/// # Returns
///  * Response ready to hand back to the client
pub async fn relay(upstream: reqwest::Response, mode: RelayMode, ctx: RelayContext) -> Response {
    match mode {
        RelayMode::Buffered => relay_buffered(upstream, ctx).await,
        RelayMode::Streaming => relay_streaming(upstream, ctx),
    }
}

///
/// Buffered relay: read the entire upstream body, extract token stats, emit
/// all metrics, then answer with the materialized body.
///
/// A body-read failure is logged and answered with the upstream status and an
/// empty body; no metrics are emitted on that path (the request never
/// completed a relay).
async fn relay_buffered(upstream: reqwest::Response, ctx: RelayContext) -> Response {
    let status = upstream.status();
    let headers = upstream.headers().clone();
    let status_label = status.as_u16().to_string();

    match upstream.bytes().await {
        Ok(body) => {
            ctx.metrics.add_bytes_out(&ctx.labels, body.len() as u64);

            let stats = ResponseStats::sniff(&body);
            ctx.metrics.add_token_counts(
                &ctx.labels.endpoint,
                &ctx.labels.model,
                stats.prompt_eval_count,
                stats.eval_count,
            );

            ctx.metrics.observe_request(
                &ctx.labels,
                &status_label,
                ctx.started.elapsed().as_secs_f64(),
            );

            copy_response(status, &headers, Body::from(body))
        }
        Err(e) => {
            tracing::error!("failed to read upstream response body: {}", e);
            copy_response(status, &headers, Body::empty())
        }
    }
}

///
/// Streaming relay: forward chunks as they arrive, counting bytes; metrics
/// settle when the copy terminates.
///
/// A mid-copy upstream error is logged and ends the body. The status already
/// sent to the client stands, and the request is still counted with the
/// bytes transferred so far.
fn relay_streaming(upstream: reqwest::Response, ctx: RelayContext) -> Response {
    let status = upstream.status();
    let headers = upstream.headers().clone();
    let status_label = status.as_u16().to_string();

    let body = MeteredBody {
        inner: upstream.bytes_stream().boxed(),
        relayed: 0,
        pending: Some((ctx, status_label)),
    };

    copy_response(status, &headers, Body::from_stream(body))
}

///
/// Copy status and headers from the upstream onto a fresh client response.
///
/// Framing headers are skipped; the server recomputes them for the body it
/// actually sends (buffered length or chunked stream).
fn copy_response(status: StatusCode, headers: &HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    for (name, value) in headers {
        if name == &CONTENT_LENGTH || name == &TRANSFER_ENCODING {
            continue;
        }
        response.headers_mut().append(name, value.clone());
    }
    response
}

impl MeteredBody {
    ///
    /// Settle the request's metrics; idempotent.
    fn settle(&mut self) {
        if let Some((ctx, status_label)) = self.pending.take() {
            ctx.metrics.add_bytes_out(&ctx.labels, self.relayed);
            ctx.metrics.observe_request(
                &ctx.labels,
                &status_label,
                ctx.started.elapsed().as_secs_f64(),
            );
        }
    }
}

impl Stream for MeteredBody {
    type Item = std::result::Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.pending.is_none() {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.relayed += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::error!("streaming response to client failed: {}", e);
                this.settle();
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                this.settle();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
