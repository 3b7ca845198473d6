//! The raw response write surface and the `http`-backed sink.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

// ── RawResponse ───────────────────────────────────────────────────────────────

/// Write surface of an externally-owned response object.
///
/// This is the contract the response decorator builds on: set/append/has for
/// headers, a status-line write, and an end-of-response write. Implement it
/// for whatever your HTTP layer hands you; [`HttpSink`] covers the common
/// case of accumulating into an [`http::Response`].
///
/// Header names are passed through with the caller's casing; whether lookup
/// is case-insensitive is up to the implementation ([`HttpSink`] is, because
/// [`http::HeaderName`] admits nothing but lowercase).
pub trait RawResponse {
    fn has_header(&self, name: &str) -> bool;
    fn set_header(&mut self, name: &str, value: &str);
    /// Adds a header instance without touching prior ones.
    fn append_header(&mut self, name: &str, value: &str);
    /// Writes the status line. The reason phrase is advisory; sinks over
    /// protocols that no longer carry one may discard it.
    fn write_head(&mut self, status: u16, reason: Option<&str>);
    /// Finalizes the response with `body`. Calls after the first are no-ops.
    fn end(&mut self, body: &[u8]);
}

// ── HttpSink ──────────────────────────────────────────────────────────────────

/// A [`RawResponse`] that accumulates into an `http::Response<Full<Bytes>>`.
///
/// Invalid header names or values are dropped with a warning rather than
/// failing the response. The first [`end`](RawResponse::end) wins.
pub struct HttpSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl HttpSink {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The finalized body, or `None` while the response is still open.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn is_ended(&self) -> bool {
        self.body.is_some()
    }

    /// Converts into the accumulated response. An un-ended sink produces an
    /// empty body.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.unwrap_or_default()));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl Default for HttpSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RawResponse for HttpSink {
    fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(name, "dropped invalid header"),
        }
    }

    fn append_header(&mut self, name: &str, value: &str) {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(name, "dropped invalid header"),
        }
    }

    fn write_head(&mut self, status: u16, _reason: Option<&str>) {
        self.status = StatusCode::from_u16(status).unwrap_or_else(|_| {
            warn!(status, "invalid status code, substituting 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });
    }

    fn end(&mut self, body: &[u8]) {
        if self.body.is_none() {
            self.body = Some(Bytes::copy_from_slice(body));
        }
    }
}
