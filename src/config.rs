//! Middleware configuration and the pluggable query-string parser.

use std::collections::HashMap;
use std::sync::Arc;

/// Parsed query-string mapping. Repeated keys accumulate in order.
pub type QueryMap = HashMap<String, Vec<String>>;

/// Query-string parsing seam.
///
/// The default is [`FormUrlencoded`]. Supply your own implementation through
/// [`Config::query`] to change how `req.query()` interprets the raw
/// string: nested-bracket syntax, semicolon separators, whatever your
/// application speaks.
pub trait QueryParser: Send + Sync {
    fn parse(&self, raw: &str) -> QueryMap;
}

/// `application/x-www-form-urlencoded` parsing via [`url::form_urlencoded`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FormUrlencoded;

impl QueryParser for FormUrlencoded {
    fn parse(&self, raw: &str) -> QueryMap {
        let mut map = QueryMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()).into_owned() {
            map.entry(key).or_default().push(value);
        }
        map
    }
}

/// Per-middleware options, fixed at decorator-creation time.
///
/// `A` is your application handle type, whatever `req.app()` should hand
/// back to handlers. It defaults to `()` when you have none.
///
/// ```rust
/// use veneer::Config;
///
/// let config: Config = Config::new().trust_proxy(false);
/// ```
pub struct Config<A = ()> {
    pub(crate) app: Option<A>,
    pub(crate) trust_proxy: bool,
    pub(crate) query: Arc<dyn QueryParser>,
}

impl<A> Config<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The application handle returned by `req.app()`.
    pub fn app(mut self, app: A) -> Self {
        self.app = Some(app);
        self
    }

    /// Whether `x-forwarded-*` headers are authoritative over direct
    /// connection metadata. Defaults to `true`.
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    /// Replaces the query-string parser used by `req.query()`.
    pub fn query(mut self, parser: impl QueryParser + 'static) -> Self {
        self.query = Arc::new(parser);
        self
    }
}

impl<A> Default for Config<A> {
    fn default() -> Self {
        Self {
            app: None,
            trust_proxy: true,
            query: Arc::new(FormUrlencoded),
        }
    }
}
