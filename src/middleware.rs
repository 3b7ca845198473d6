//! The middleware composer: both decorators wired over one configuration.

use crate::config::Config;
use crate::raw::RawResponse;
use crate::request::{self, Request};
use crate::response::{self, Response};

/// Decorates request/response pairs and hands them to a continuation.
///
/// Both decorators are built once from the [`Config`]; each decorated pair
/// is independent of every other. The response is linked to the request's
/// signing-secret slot so `res.cookie(.., signed)` can see a secret attached
/// to the request at any later point.
pub struct Middleware<A = ()> {
    request: request::Decorator<A>,
    response: response::Decorator,
}

impl<A: Clone> Middleware<A> {
    pub fn new(config: Config<A>) -> Self {
        Self {
            request: request::Decorator::new(config),
            response: response::Decorator::new(),
        }
    }

    /// Decorates the pair. An already-linked response keeps its link.
    pub fn decorate<B, R: RawResponse>(
        &self,
        raw_req: http::Request<B>,
        raw_res: R,
    ) -> (Request<B, A>, Response<R>) {
        let req = self.request.decorate(raw_req);
        let mut res = self.response.decorate(raw_res);
        res.link(req.secret_slot().clone());
        (req, res)
    }

    /// Decorates the pair and invokes `next` with it, returning whatever
    /// `next` returns. Decoration itself cannot fail.
    pub fn wrap<B, R, F, T>(&self, raw_req: http::Request<B>, raw_res: R, next: F) -> T
    where
        R: RawResponse,
        F: FnOnce(Request<B, A>, Response<R>) -> T,
    {
        let (req, res) = self.decorate(raw_req, raw_res);
        next(req, res)
    }
}

impl Default for Middleware<()> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
