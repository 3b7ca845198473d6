//! Minimal veneer example: a hyper service with decorated pairs.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl 'http://localhost:3000/hello?name=ada'
//!   curl -H 'x-forwarded-proto: https' http://localhost:3000/whoami
//!   curl -v http://localhost:3000/old-path

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};
use veneer::{Config, ConnectionInfo, CookieOptions, HttpSink, Middleware};

#[derive(Serialize)]
struct Whoami<'a> {
    host: Option<&'a str>,
    hostname: Option<&'a str>,
    protocol: &'a str,
    secure: bool,
    path: &'a str,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let middleware = Arc::new(Middleware::new(Config::<()>::new()));
    let addr: SocketAddr = ([127, 0, 0, 1], 3000).into();
    let listener = TcpListener::bind(addr).await.expect("bind");

    info!(%addr, "listening");

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("accept error: {e}");
                continue;
            }
        };
        let middleware = Arc::clone(&middleware);
        let io = TokioIo::new(stream);
        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let middleware = Arc::clone(&middleware);
                async move { handle(middleware, req).await }
            });
            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                error!("connection error: {e}");
            }
        });
    }
}

async fn handle(
    middleware: Arc<Middleware>,
    mut raw: hyper::Request<Incoming>,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    // The server layer owns connection metadata; a plain TCP listener is
    // never encrypted.
    raw.extensions_mut().insert(ConnectionInfo { encrypted: false });

    let sink = middleware.wrap(raw, HttpSink::new(), |req, mut res| {
        match req.path() {
            "/hello" => {
                let name = req
                    .query()
                    .get("name")
                    .and_then(|values| values.first())
                    .map(String::as_str)
                    .unwrap_or("world")
                    .to_owned();
                let _ = res.cookie("last-greeted", &name, CookieOptions::new().http_only(true));
                let _ = res.json(&serde_json::json!({ "hello": name }));
            }
            "/whoami" => {
                let _ = res.json(&Whoami {
                    host: req.host(),
                    hostname: req.hostname(),
                    protocol: req.protocol(),
                    secure: req.secure(),
                    path: req.path(),
                });
            }
            "/old-path" => res.redirect("/hello"),
            _ => res.send_status(404, Some("Not Found")),
        }
        res.into_raw()
    });

    Ok(sink.into_response())
}
