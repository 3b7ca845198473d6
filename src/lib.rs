//! # veneer
//!
//! Request/response decoration for `http`-stack Rust services.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Your HTTP layer (hyper, or anything else speaking the [`http`] crate's
//! types) owns sockets, TLS, routing, and request lifecycles. veneer owns
//! none of that. It takes the request/response pair that layer already
//! produced and adds the accessors handlers actually reach for:
//!
//! - **Request**: `host` / `hostname` / `protocol` / `secure` under an
//!   optional reverse-proxy trust policy, plus `path`, parsed `query`, and
//!   case-insensitive header lookup.
//! - **Response**: `send` / `json` / `redirect` / `cookie` / `clear_cookie` /
//!   `send_status`, and a per-response `locals` bag.
//!
//! Decoration returns owned wrapper types. Nothing global is mutated, and
//! each pair is independent of every other.
//!
//! ## Quick start
//!
//! ```rust
//! use veneer::{Config, HttpSink, Middleware};
//!
//! let middleware: Middleware = Middleware::new(Config::new());
//!
//! let raw = http::Request::builder()
//!     .uri("/hello?name=ada")
//!     .header("host", "example.com:3000")
//!     .body(())
//!     .unwrap();
//!
//! let sink = middleware.wrap(raw, HttpSink::new(), |req, mut res| {
//!     assert_eq!(req.hostname(), Some("example.com"));
//!     assert_eq!(req.query()["name"], vec!["ada"]);
//!     res.json(&serde_json::json!({ "hello": "world" })).unwrap();
//!     res.into_raw()
//! });
//!
//! assert_eq!(sink.body().unwrap().as_ref(), br#"{"hello":"world"}"#);
//! ```
//!
//! ## Trust-proxy mode
//!
//! With `trust_proxy` on (the default), the `x-forwarded-host` and
//! `x-forwarded-proto` headers are authoritative, the right posture behind
//! nginx or an ingress that sets them. When those headers are absent
//! the direct values apply, exactly as if trust were off. Turn trust off for
//! services exposed directly to clients, where a forwarded header is
//! attacker-controlled input.

mod config;
mod cookie;
mod error;
mod middleware;
mod raw;

pub mod request;
pub mod response;

pub use config::{Config, FormUrlencoded, QueryMap, QueryParser};
pub use cookie::{Cookie, CookieOptions, SameSite};
pub use error::Error;
pub use middleware::Middleware;
pub use raw::{HttpSink, RawResponse};
pub use request::{ConnectionInfo, Request, SecretSlot};
pub use response::{Body, Locals, Response};
