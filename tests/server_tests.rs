//! End-to-end tests for the `tiny_http` hosting adapter.
//!
//! Each test binds a fresh server on an ephemeral port and talks raw HTTP/1.1
//! to it, so the full path (wire → `Request` → `Application::respond` → wire)
//! is exercised, including streamed bodies and the body size limit.

use std::io::Write;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use trellis::server::{HttpServer, ServerHandle, TEXT_PLAIN};
use trellis::{Environment, Response, Route};

mod common;
use common::http_client::{header, parse_response, send_request};
use common::test_app;

/// Running server, stopped when dropped.
struct TestServer {
    handle: Option<ServerHandle>,
}

impl TestServer {
    fn start(max_body: usize) -> Self {
        let app = test_app::build(
            Environment::Development,
            vec![
                Route::get("/hello/:name", |req| {
                    let name = req.parameter("name").unwrap_or_default().to_string();
                    Ok(Response::text(format!("Hello, {name}!")))
                }),
                Route::post("/echo/:value", trellis::echo::echo_handler),
                Route::post("/visit", |req| {
                    req.session_mut()?.set("seen", "1");
                    Ok(Response::text("noted"))
                }),
                Route::get("/lines", |_req| {
                    Ok(Response::stream(TEXT_PLAIN, |out| {
                        for i in 0..3 {
                            writeln!(out, "line {i}")?;
                        }
                        Ok(())
                    }))
                }),
                Route::get("/fail", |_req| Err(anyhow::anyhow!("exploded").into())),
            ],
        );
        let handle = HttpServer::new(Arc::new(app))
            .workers(2)
            .max_body_bytes(max_body)
            .start("127.0.0.1:0")
            .unwrap();
        handle.wait_ready().unwrap();
        Self {
            handle: Some(handle),
        }
    }

    fn addr(&self) -> std::net::SocketAddr {
        self.handle.as_ref().unwrap().addr()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

#[test]
fn test_get_with_path_parameter() {
    let server = TestServer::start(1024);
    let resp = send_request(
        &server.addr(),
        "GET /hello/Ada%20L HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    let (status, headers, body) = parse_response(&resp);
    assert_eq!(status, 200);
    assert_eq!(body, "Hello, Ada L!");
    assert!(header(&headers, "date").is_some());
    assert!(header(&headers, "server").unwrap().starts_with("trellis/"));
    assert!(header(&headers, "set-cookie").is_none());
}

#[test]
fn test_session_write_sets_cookie() {
    let server = TestServer::start(1024);
    let resp = send_request(
        &server.addr(),
        "POST /visit HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
    );
    let (status, headers, body) = parse_response(&resp);
    assert_eq!(status, 200);
    assert_eq!(body, "noted");
    let cookie = header(&headers, "set-cookie").unwrap();
    assert!(cookie.starts_with("trellis-session="));
    assert!(cookie.contains("HttpOnly"));
}

#[test]
fn test_head_on_get_route() {
    let server = TestServer::start(1024);
    let resp = send_request(
        &server.addr(),
        "HEAD /hello/Ada HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    let (status, headers, body) = parse_response(&resp);
    assert_eq!(status, 200);
    assert!(header(&headers, "date").is_some());
    assert!(body.is_empty());
}

#[test]
fn test_post_json_body_and_query() {
    let server = TestServer::start(1024);
    let payload = r#"{"pet":"cat"}"#;
    let req = format!(
        "POST /echo/abc?x=1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        payload.len(),
        payload
    );
    let (status, _headers, body) = parse_response(&send_request(&server.addr(), &req));
    assert_eq!(status, 200);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["params"]["value"], "abc");
    assert_eq!(json["query"]["x"], "1");
    assert_eq!(json["body"]["pet"], "cat");
}

#[test]
fn test_unknown_route_is_404() {
    let server = TestServer::start(1024);
    let resp = send_request(
        &server.addr(),
        "GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    let (status, _headers, body) = parse_response(&resp);
    assert_eq!(status, 404);
    assert!(body.contains("Not Found"));
}

#[test]
fn test_handler_failure_is_500_and_server_keeps_running() {
    let server = TestServer::start(1024);
    let resp = send_request(
        &server.addr(),
        "GET /fail HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(parse_response(&resp).0, 500);

    let resp = send_request(
        &server.addr(),
        "GET /hello/again HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(parse_response(&resp).0, 200);
}

#[test]
fn test_streamed_body_reaches_client() {
    let server = TestServer::start(1024);
    let resp = send_request(
        &server.addr(),
        "GET /lines HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    let (status, _headers, body) = parse_response(&resp);
    assert_eq!(status, 200);
    for i in 0..3 {
        assert!(body.contains(&format!("line {i}")), "missing line {i} in {body:?}");
    }
}

#[test]
fn test_oversized_body_rejected() {
    let server = TestServer::start(16);
    let payload = "x".repeat(64);
    let req = format!(
        "POST /echo/big HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        payload.len(),
        payload
    );
    let (status, _headers, _body) = parse_response(&send_request(&server.addr(), &req));
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE.as_u16());
}

#[test]
fn test_stop_releases_workers() {
    let server = TestServer::start(1024);
    let addr = server.addr();
    let resp = send_request(
        &addr,
        "GET /hello/x HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(parse_response(&resp).0, 200);
    // Drop runs ServerHandle::stop, which joins every worker
    drop(server);
}
