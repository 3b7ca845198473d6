//! Response decoration: body helpers, header and cookie state.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::cookie::{Cookie, CookieOptions};
use crate::error::Error;
use crate::raw::RawResponse;
use crate::request::SecretSlot;

// ── Decorator ─────────────────────────────────────────────────────────────────

/// Builds [`Response`] wrappers. Takes no configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct Decorator;

impl Decorator {
    pub fn new() -> Self {
        Self
    }

    pub fn decorate<R: RawResponse>(&self, raw: R) -> Response<R> {
        Response {
            raw,
            secret: None,
            locals: None,
        }
    }
}

// ── Body ──────────────────────────────────────────────────────────────────────

/// A `send` body, dispatched by variant.
///
/// The `From` impls mean handlers rarely name this type:
/// `res.send("hello")`, `res.send(bytes)`, and
/// `res.send(serde_json::json!({..}))` all just work.
pub enum Body {
    /// Raw bytes, sent as `application/octet-stream`.
    Binary(Bytes),
    /// UTF-8 text, sent as `text/plain; charset=utf-8`.
    Text(String),
    /// Structured value, delegated to [`Response::json`].
    Json(serde_json::Value),
    /// A scalar with no body representation of its own, coerced to text.
    Other(String),
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(Bytes::copy_from_slice(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<bool> for Body {
    fn from(value: bool) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<i64> for Body {
    fn from(value: i64) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<u64> for Body {
    fn from(value: u64) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<f64> for Body {
    fn from(value: f64) -> Self {
        Self::Other(value.to_string())
    }
}

// ── Locals ────────────────────────────────────────────────────────────────────

/// String-keyed heterogeneous storage for handlers downstream of decoration.
///
/// Created lazily on first `res.locals()` access and never reset for the
/// lifetime of the response.
#[derive(Default)]
pub struct Locals {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Typed lookup; `None` when the key is absent or holds another type.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.entries
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Locals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// A decorated response: the raw sink plus the helper methods.
#[derive(Debug)]
pub struct Response<R> {
    raw: R,
    secret: Option<SecretSlot>,
    locals: Option<Locals>,
}

impl<R: RawResponse> Response<R> {
    /// Writes the status line (with an optional reason phrase) and ends the
    /// response with no body.
    pub fn send_status(&mut self, status: u16, reason: Option<&str>) {
        self.raw.write_head(status, reason);
        self.raw.end(&[]);
    }

    /// Sends `body`, branching on its variant. Structured values go through
    /// [`json`](Self::json); the other variants set `Content-Length` and a
    /// `Content-Type` (unless one is already present) and end the response.
    pub fn send(&mut self, body: impl Into<Body>) -> Result<(), Error> {
        match body.into() {
            Body::Binary(bytes) => {
                warn!("sending raw bytes as a response body is deprecated, prefer a structured value");
                if !self.raw.has_header("Content-Type") {
                    self.raw.set_header("Content-Type", "application/octet-stream");
                }
                self.raw.set_header("Content-Length", &bytes.len().to_string());
                self.raw.end(&bytes);
                Ok(())
            }
            Body::Json(value) => self.json(&value),
            Body::Text(text) => {
                warn!("sending a raw string as a response body is deprecated, prefer a structured value");
                if !self.raw.has_header("Content-Type") {
                    self.raw.set_header("Content-Type", "text/plain; charset=utf-8");
                }
                self.raw.set_header("Content-Length", &text.len().to_string());
                self.raw.end(text.as_bytes());
                Ok(())
            }
            Body::Other(coerced) => {
                warn!(value = %coerced, "unsupported response body type, coercing to text");
                self.raw.set_header("Content-Length", &coerced.len().to_string());
                self.raw.end(coerced.as_bytes());
                Ok(())
            }
        }
    }

    /// Serializes `value` and ends the response with it.
    /// `Content-Type: application/json; charset=utf-8` is set unless one is
    /// already present.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        if !self.raw.has_header("Content-Type") {
            self.raw
                .set_header("Content-Type", "application/json; charset=utf-8");
        }
        let payload = serde_json::to_vec(value)?;
        self.raw.set_header("Content-Length", &payload.len().to_string());
        self.raw.end(&payload);
        Ok(())
    }

    /// `307 Temporary Redirect` to `location`, no body.
    pub fn redirect(&mut self, location: &str) {
        self.redirect_with(307, location);
    }

    /// Redirect with an explicit status.
    pub fn redirect_with(&mut self, status: u16, location: &str) {
        self.raw.set_header("Location", location);
        self.raw.write_head(status, None);
        self.raw.end(&[]);
    }

    /// Sets one header on the raw sink.
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        self.raw.set_header(name, value);
        self
    }

    /// Applies each pair of a mapping. Key casing is handed to the sink
    /// untouched; what the sink does with it is its contract.
    pub fn headers<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> &mut Self {
        for (name, value) in pairs {
            self.raw.set_header(name, value);
        }
        self
    }

    /// Appends a `Set-Cookie` header. Cookies accumulate; prior ones are
    /// never overwritten. `path` defaults to `"/"`; a `max_age` also derives
    /// the `Expires` attribute and is floored to whole seconds on the wire.
    ///
    /// # Errors
    ///
    /// [`Error::MissingSecret`] when `options.signed` is set and no secret is
    /// linked to the originating request. Nothing is appended in that case.
    pub fn cookie(
        &mut self,
        name: &str,
        value: &str,
        options: CookieOptions,
    ) -> Result<&mut Self, Error> {
        let value = if options.signed {
            let secret = self
                .secret
                .as_ref()
                .and_then(SecretSlot::get)
                .ok_or(Error::MissingSecret)?;
            crate::cookie::sign(value, secret)
        } else {
            value.to_owned()
        };

        let mut cookie =
            Cookie::new(name, value).path(options.path.unwrap_or_else(|| "/".to_owned()));
        if let Some(domain) = options.domain {
            cookie = cookie.domain(domain);
        }
        if let Some(expires) = options.expires {
            cookie = cookie.expires(expires);
        }
        if let Some(max_age) = options.max_age {
            let delta = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
            let expires = Utc::now()
                .checked_add_signed(delta)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            cookie = cookie.expires(expires).max_age(max_age.as_secs());
        }
        if options.secure {
            cookie = cookie.secure(true);
        }
        if options.http_only {
            cookie = cookie.http_only(true);
        }
        if let Some(mode) = options.same_site {
            cookie = cookie.same_site(mode);
        }

        self.raw.append_header("Set-Cookie", &cookie.to_header_value());
        Ok(self)
    }

    /// Expires the named cookie: empty value, `Expires` at the epoch, and
    /// any caller-supplied `max_age` discarded. Expiry alone governs
    /// deletion.
    pub fn clear_cookie(
        &mut self,
        name: &str,
        options: CookieOptions,
    ) -> Result<&mut Self, Error> {
        let cleared = CookieOptions {
            expires: Some(DateTime::UNIX_EPOCH),
            max_age: None,
            ..options
        };
        self.cookie(name, "", cleared)
    }

    /// Per-response bag for downstream handlers. Created on first access and
    /// reused for the lifetime of the response.
    pub fn locals(&mut self) -> &mut Locals {
        self.locals.get_or_insert_with(Locals::new)
    }

    /// Links the originating request's signing-secret slot. An existing link
    /// is left alone.
    pub fn link(&mut self, slot: SecretSlot) {
        if self.secret.is_none() {
            self.secret = Some(slot);
        }
    }

    pub fn raw(&self) -> &R {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut R {
        &mut self.raw
    }

    pub fn into_raw(self) -> R {
        self.raw
    }
}
