//! Request decoration: trust-boundary-aware derived accessors.

use std::sync::{Arc, OnceLock};

use http::header::{AsHeaderName, HOST};
use http::{HeaderMap, Method, Uri};

use crate::config::{Config, QueryMap, QueryParser};

// ── Connection metadata ───────────────────────────────────────────────────────

/// Connection metadata the server layer attaches to the raw request's
/// extensions before decoration.
///
/// Without it the request is treated as plaintext, which is the right answer
/// behind a TLS-terminating proxy, where the forwarded headers carry the
/// client's protocol.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectionInfo {
    /// Whether the underlying connection is TLS-encrypted.
    pub encrypted: bool,
}

// ── SecretSlot ────────────────────────────────────────────────────────────────

/// Set-once cookie-signing secret shared by a linked request/response pair.
///
/// Clones share the same slot. The request decorator reuses a slot already
/// present in the raw request's extensions, so a stage that runs earlier can
/// install the secret before decoration ever happens.
#[derive(Clone, Debug, Default)]
pub struct SecretSlot(Arc<OnceLock<String>>);

impl SecretSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the secret. Returns `false` when one was already set.
    pub fn set(&self, secret: impl Into<String>) -> bool {
        self.0.set(secret.into()).is_ok()
    }

    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }
}

// ── Decorator ─────────────────────────────────────────────────────────────────

/// Builds [`Request`] wrappers from one immutable [`Config`].
pub struct Decorator<A = ()> {
    app: Option<A>,
    trust_proxy: bool,
    query: Arc<dyn QueryParser>,
}

impl<A: Clone> Decorator<A> {
    pub fn new(config: Config<A>) -> Self {
        Self {
            app: config.app,
            trust_proxy: config.trust_proxy,
            query: config.query,
        }
    }

    /// Wraps `raw`. A [`SecretSlot`] already present in its extensions is
    /// reused; otherwise a fresh one is installed.
    pub fn decorate<B>(&self, mut raw: http::Request<B>) -> Request<B, A> {
        let secret = match raw.extensions().get::<SecretSlot>().cloned() {
            Some(slot) => slot,
            None => {
                let slot = SecretSlot::new();
                raw.extensions_mut().insert(slot.clone());
                slot
            }
        };

        Request {
            inner: raw,
            app: self.app.clone(),
            trust_proxy: self.trust_proxy,
            parser: Arc::clone(&self.query),
            secret,
            hostname: OnceLock::new(),
            protocol: OnceLock::new(),
            query: OnceLock::new(),
        }
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// A decorated request: the raw [`http::Request`] plus derived accessors.
///
/// Derivations that allocate (`hostname`, `protocol`, `query`) are computed
/// on first access and cached for the lifetime of the wrapper.
pub struct Request<B, A = ()> {
    inner: http::Request<B>,
    app: Option<A>,
    trust_proxy: bool,
    parser: Arc<dyn QueryParser>,
    secret: SecretSlot,
    hostname: OnceLock<Option<String>>,
    protocol: OnceLock<String>,
    query: OnceLock<QueryMap>,
}

impl<B, A> Request<B, A> {
    /// The configured application handle.
    pub fn app(&self) -> Option<&A> {
        self.app.as_ref()
    }

    /// The request's host: the first `x-forwarded-host` value under
    /// trust-proxy mode, falling back to the `Host` header.
    pub fn host(&self) -> Option<&str> {
        if self.trust_proxy {
            if let Some(forwarded) = header_str(self.inner.headers(), "x-forwarded-host") {
                return Some(forwarded);
            }
        }
        header_str(self.inner.headers(), HOST)
    }

    /// [`host`](Self::host) with any trailing `:port` stripped. A
    /// `[...]`-delimited IPv6 literal is returned whole.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname
            .get_or_init(|| {
                let host = self.host()?;
                if host.starts_with('[') && host.ends_with(']') {
                    return Some(host.to_owned());
                }
                Some(match host.rfind(':') {
                    Some(index) => host[..index].to_owned(),
                    None => host.to_owned(),
                })
            })
            .as_deref()
    }

    /// `"http"` or `"https"`, or whatever the first `x-forwarded-proto`
    /// value says (trimmed) under trust-proxy mode.
    pub fn protocol(&self) -> &str {
        self.protocol.get_or_init(|| {
            if self.trust_proxy {
                if let Some(proto) = header_str(self.inner.headers(), "x-forwarded-proto") {
                    return proto.trim().to_owned();
                }
            }
            let scheme = if self.encrypted() { "https" } else { "http" };
            scheme.to_owned()
        })
    }

    /// `true` iff [`protocol`](Self::protocol) resolves to `"https"`.
    pub fn secure(&self) -> bool {
        self.protocol() == "https"
    }

    /// Path component of the request URI, query string excluded.
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// The parsed query string. An absent query string yields an empty map.
    /// Parsed once; repeated calls return the same map.
    pub fn query(&self) -> &QueryMap {
        self.query
            .get_or_init(|| self.parser.parse(self.inner.uri().query().unwrap_or("")))
    }

    /// Case-insensitive header lookup. Returns the first value of a repeated
    /// header; use [`headers`](Self::headers) for the full view.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_str(self.inner.headers(), name)
    }

    /// Alias for [`header`](Self::header).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.header(name)
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn body(&self) -> &B {
        self.inner.body()
    }

    pub fn inner(&self) -> &http::Request<B> {
        &self.inner
    }

    pub fn into_inner(self) -> http::Request<B> {
        self.inner
    }

    /// Attaches the cookie-signing secret. Set-once: returns `false` when a
    /// secret was already present.
    pub fn set_secret(&self, secret: impl Into<String>) -> bool {
        self.secret.set(secret)
    }

    /// The signing secret, if one has been attached.
    pub fn secret(&self) -> Option<&str> {
        self.secret.get()
    }

    pub(crate) fn secret_slot(&self) -> &SecretSlot {
        &self.secret
    }

    fn encrypted(&self) -> bool {
        self.inner
            .extensions()
            .get::<ConnectionInfo>()
            .is_some_and(|conn| conn.encrypted)
    }
}

fn header_str<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers.get(name)?.to_str().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decorate(raw: http::Request<()>) -> Request<(), ()> {
        Decorator::new(Config::new()).decorate(raw)
    }

    fn decorate_untrusted(raw: http::Request<()>) -> Request<(), ()> {
        Decorator::new(Config::new().trust_proxy(false)).decorate(raw)
    }

    fn raw(uri: &str) -> http::request::Builder {
        http::Request::builder().uri(uri)
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = decorate(
            raw("/")
                .header("content-type", "application/json")
                .body(())
                .unwrap(),
        );
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.get("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn host_prefers_forwarded_when_trusted() {
        let req = decorate(
            raw("/")
                .header("x-forwarded-host", "example.com")
                .header("host", "localhost")
                .body(())
                .unwrap(),
        );
        assert_eq!(req.host(), Some("example.com"));
    }

    #[test]
    fn host_ignores_forwarded_when_untrusted() {
        let req = decorate_untrusted(
            raw("/")
                .header("x-forwarded-host", "example.com")
                .header("host", "localhost")
                .body(())
                .unwrap(),
        );
        assert_eq!(req.host(), Some("localhost"));
    }

    #[test]
    fn host_falls_back_without_proxy_headers() {
        let req = decorate(raw("/").header("host", "example.com").body(()).unwrap());
        assert_eq!(req.host(), Some("example.com"));
    }

    #[test]
    fn hostname_strips_port() {
        let req = decorate(raw("/").header("host", "example.com:3000").body(()).unwrap());
        assert_eq!(req.hostname(), Some("example.com"));
    }

    #[test]
    fn hostname_keeps_ipv6_literal_whole() {
        let req = decorate(raw("/").header("host", "[::1]").body(()).unwrap());
        assert_eq!(req.hostname(), Some("[::1]"));
    }

    #[test]
    fn hostname_strips_port_from_ipv6() {
        let req = decorate(raw("/").header("host", "[::1]:3000").body(()).unwrap());
        assert_eq!(req.hostname(), Some("[::1]"));
    }

    #[test]
    fn hostname_absent_without_host() {
        let req = decorate(raw("/").body(()).unwrap());
        assert_eq!(req.hostname(), None);
    }

    #[test]
    fn protocol_reads_forwarded_when_trusted() {
        let req = decorate(
            raw("/")
                .header("x-forwarded-proto", " https ")
                .body(())
                .unwrap(),
        );
        assert_eq!(req.protocol(), "https");
        assert!(req.secure());
    }

    #[test]
    fn protocol_ignores_forwarded_when_untrusted() {
        let mut inner = raw("/").header("x-forwarded-proto", "http").body(()).unwrap();
        inner.extensions_mut().insert(ConnectionInfo { encrypted: true });
        let req = decorate_untrusted(inner);
        assert_eq!(req.protocol(), "https");
    }

    #[test]
    fn protocol_falls_back_to_connection_flag() {
        let req = decorate(raw("/").body(()).unwrap());
        assert_eq!(req.protocol(), "http");
        assert!(!req.secure());
    }

    #[test]
    fn path_excludes_query() {
        let req = decorate(raw("/foo?a=b").body(()).unwrap());
        assert_eq!(req.path(), "/foo");
    }

    #[test]
    fn query_is_parsed_and_memoized() {
        let req = decorate(raw("/search?q=veneer&page=2").body(()).unwrap());
        let first = req.query();
        assert_eq!(first["q"], vec!["veneer"]);
        assert_eq!(first["page"], vec!["2"]);
        assert!(std::ptr::eq(first, req.query()));
    }

    #[test]
    fn absent_query_is_an_empty_map() {
        let req = decorate(raw("/foo").body(()).unwrap());
        assert!(req.query().is_empty());
    }

    #[test]
    fn app_handle_round_trips() {
        #[derive(Clone, PartialEq, Debug)]
        struct App(u32);

        let decorator = Decorator::new(Config::new().app(App(7)));
        let req = decorator.decorate(raw("/").body(()).unwrap());
        assert_eq!(req.app(), Some(&App(7)));
    }

    #[test]
    fn secret_is_set_once() {
        let req = decorate(raw("/").body(()).unwrap());
        assert!(req.set_secret("first"));
        assert!(!req.set_secret("second"));
        assert_eq!(req.secret(), Some("first"));
    }

    #[test]
    fn preinstalled_slot_is_reused() {
        let slot = SecretSlot::new();
        slot.set("keyboard cat");
        let mut inner = raw("/").body(()).unwrap();
        inner.extensions_mut().insert(slot);
        let req = decorate(inner);
        assert_eq!(req.secret(), Some("keyboard cat"));
    }
}
