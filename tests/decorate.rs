//! End-to-end exercise of the composer over the `http`-backed sink.

use std::time::Duration;

use veneer::{Config, ConnectionInfo, CookieOptions, HttpSink, Middleware};

fn raw_req(uri: &str) -> http::request::Builder {
    http::Request::builder().uri(uri)
}

#[test]
fn trusted_proxy_request_round_trip() {
    let middleware: Middleware = Middleware::new(Config::new());
    let raw = raw_req("/users?id=42&id=43")
        .header("host", "localhost:8080")
        .header("x-forwarded-host", "example.com")
        .header("x-forwarded-proto", "https")
        .body(())
        .unwrap();

    let sink = middleware.wrap(raw, HttpSink::new(), |req, mut res| {
        assert_eq!(req.host(), Some("example.com"));
        assert_eq!(req.hostname(), Some("example.com"));
        assert_eq!(req.protocol(), "https");
        assert!(req.secure());
        assert_eq!(req.path(), "/users");
        assert_eq!(req.query()["id"], vec!["42", "43"]);

        res.json(&serde_json::json!({ "ok": true })).unwrap();
        res.into_raw()
    });

    let response = sink.into_response();
    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json; charset=utf-8"
    );
    assert_eq!(response.headers().get("content-length").unwrap(), "11");
}

#[test]
fn untrusted_request_uses_direct_values() {
    let middleware: Middleware = Middleware::new(Config::new().trust_proxy(false));
    let mut raw = raw_req("/")
        .header("host", "localhost")
        .header("x-forwarded-host", "example.com")
        .header("x-forwarded-proto", "https")
        .body(())
        .unwrap();
    raw.extensions_mut().insert(ConnectionInfo { encrypted: false });

    middleware.wrap(raw, HttpSink::new(), |req, _res| {
        assert_eq!(req.host(), Some("localhost"));
        assert_eq!(req.protocol(), "http");
        assert!(!req.secure());
    });
}

#[test]
fn cookies_accumulate_on_the_wire() {
    let middleware: Middleware = Middleware::new(Config::new());
    let sink = middleware.wrap(raw_req("/").body(()).unwrap(), HttpSink::new(), |_req, mut res| {
        res.cookie("a", "1", CookieOptions::new())
            .unwrap()
            .cookie("b", "2", CookieOptions::new().max_age(Duration::from_secs(60)))
            .unwrap();
        res.send_status(204, None);
        res.into_raw()
    });

    let cookies: Vec<_> = sink
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_owned())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies[0], "a=1; Path=/");
    assert!(cookies[1].starts_with("b=2; Path=/; Expires="), "{}", cookies[1]);
    assert!(cookies[1].ends_with("Max-Age=60"), "{}", cookies[1]);
    assert_eq!(sink.status(), http::StatusCode::NO_CONTENT);
}

#[test]
fn secret_flows_from_request_to_response() {
    let middleware: Middleware = Middleware::new(Config::new());
    let sink = middleware.wrap(raw_req("/").body(()).unwrap(), HttpSink::new(), |req, mut res| {
        req.set_secret("keyboard cat");
        res.cookie("session", "abc", CookieOptions::new().signed(true))
            .unwrap();
        res.into_raw()
    });

    let cookie = sink
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("session=s:abc."), "{cookie}");
}

#[test]
fn send_text_over_the_sink() {
    let middleware: Middleware = Middleware::new(Config::new());
    let sink = middleware.wrap(raw_req("/").body(()).unwrap(), HttpSink::new(), |_req, mut res| {
        res.send("hello").unwrap();
        res.into_raw()
    });

    assert_eq!(
        sink.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(sink.headers().get("content-length").unwrap(), "5");
    assert_eq!(sink.body().unwrap().as_ref(), b"hello");
}

#[test]
fn redirect_over_the_sink() {
    let middleware: Middleware = Middleware::new(Config::new());
    let sink = middleware.wrap(raw_req("/old").body(()).unwrap(), HttpSink::new(), |_req, mut res| {
        res.redirect("http://example.com");
        res.into_raw()
    });

    assert_eq!(sink.status(), http::StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(sink.headers().get("location").unwrap(), "http://example.com");
    assert_eq!(sink.body().unwrap().len(), 0);
}
