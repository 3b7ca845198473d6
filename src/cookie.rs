//! Cookie model: `Set-Cookie` attribute serialization and value signing.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

// ── SameSite ──────────────────────────────────────────────────────────────────

/// `SameSite` cookie attribute modes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("Strict"),
            Self::Lax => f.write_str("Lax"),
            Self::None => f.write_str("None"),
        }
    }
}

// ── Cookie ────────────────────────────────────────────────────────────────────

/// One cookie headed for a `Set-Cookie` header.
///
/// ```rust
/// use veneer::Cookie;
///
/// let header = Cookie::new("session", "abc123")
///     .path("/")
///     .http_only(true)
///     .to_header_value();
/// assert_eq!(header, "session=abc123; Path=/; HttpOnly");
/// ```
#[derive(Clone, Debug)]
pub struct Cookie {
    name: String,
    value: String,
    path: Option<String>,
    domain: Option<String>,
    expires: Option<DateTime<Utc>>,
    max_age: Option<u64>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            expires: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    /// `Max-Age` in whole seconds.
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn same_site(mut self, mode: SameSite) -> Self {
        self.same_site = Some(mode);
        self
    }

    /// Serializes to the `Set-Cookie` wire form. `Expires` is rendered as an
    /// IMF-fixdate.
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);

        if let Some(path) = &self.path {
            out.push_str("; Path=");
            out.push_str(path);
        }
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(expires) = &self.expires {
            out.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(mode) = self.same_site {
            out.push_str(&format!("; SameSite={mode}"));
        }

        out
    }
}

// ── CookieOptions ─────────────────────────────────────────────────────────────

/// Options accepted by [`Response::cookie`](crate::Response::cookie) and
/// [`Response::clear_cookie`](crate::Response::clear_cookie).
///
/// `path` defaults to `"/"` when unset. A `max_age` also derives the
/// `Expires` attribute from the current time.
#[derive(Clone, Debug, Default)]
pub struct CookieOptions {
    pub(crate) signed: bool,
    pub(crate) path: Option<String>,
    pub(crate) domain: Option<String>,
    pub(crate) expires: Option<DateTime<Utc>>,
    pub(crate) max_age: Option<Duration>,
    pub(crate) secure: bool,
    pub(crate) http_only: bool,
    pub(crate) same_site: Option<SameSite>,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign the value with the request-linked secret before serializing.
    pub fn signed(mut self, on: bool) -> Self {
        self.signed = on;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    /// Cookie lifetime. Floored to whole seconds on the wire; also sets
    /// `Expires` relative to now, overriding an explicit [`expires`](Self::expires).
    pub fn max_age(mut self, lifetime: Duration) -> Self {
        self.max_age = Some(lifetime);
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn same_site(mut self, mode: SameSite) -> Self {
        self.same_site = Some(mode);
        self
    }
}

// ── Signing ───────────────────────────────────────────────────────────────────

type HmacSha256 = Hmac<Sha256>;

/// Signed-cookie wire form: `s:<value>.<hex-encoded HMAC-SHA256>`.
pub(crate) fn sign(value: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(value.as_bytes());
    format!("s:{}.{}", value, hex::encode(mac.finalize().into_bytes()))
}
