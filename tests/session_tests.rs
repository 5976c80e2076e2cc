use std::sync::Arc;

use http::header::{self, HeaderName};
use http::{Method, StatusCode};
use trellis::middleware::DEFAULT_SESSION_COOKIE;
use trellis::{
    ApplicationBuilder, Environment, Error, MemorySessionStore, Request, Response, Route,
    SessionStore,
};

mod common;
use common::log_capture::TestLogs;
use common::test_app;

fn session_routes() -> Vec<Route> {
    vec![
        Route::post("/login/:user", |req| {
            let user = req.parameter("user").unwrap_or_default().to_string();
            req.session_mut()?.set("user", user);
            Ok(Response::text("logged in"))
        }),
        Route::get("/whoami", |req| {
            let user = req
                .session_mut()?
                .get("user")
                .unwrap_or("anonymous")
                .to_string();
            Ok(Response::text(user))
        }),
        Route::post("/logout", |req| {
            req.session_mut()?.destroy();
            Ok(Response::empty(StatusCode::NO_CONTENT))
        }),
        Route::post("/attempt", |req| {
            let session = req.session_mut()?;
            let attempts = session
                .get("attempts")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(0)
                + 1;
            session.set("attempts", attempts.to_string());
            Err(Error::unauthorized())
        }),
        Route::get("/health", |_req| Ok(Response::text("ok"))),
        Route::post("/broken", |req| {
            req.session_mut()?.set("attempted", "yes");
            Err(anyhow::anyhow!("after session write").into())
        }),
    ]
}

fn build(store: Arc<MemorySessionStore>) -> trellis::Application {
    ApplicationBuilder::new(test_app::config(Environment::Development))
        .session_store(store)
        .routes(session_routes())
        .build()
        .unwrap()
}

fn with_cookie(method: Method, path: &str, token: &str) -> Request {
    Request::try_new(method, path)
        .unwrap()
        .with_header(header::COOKIE, &format!("{DEFAULT_SESSION_COOKIE}={token}"))
}

fn session_token(res: &Response) -> String {
    res.cookies()
        .get(DEFAULT_SESSION_COOKIE)
        .cloned()
        .expect("session cookie")
}

#[test]
fn test_state_visible_to_next_request_with_same_token() {
    let store = Arc::new(MemorySessionStore::new());
    let app = build(Arc::clone(&store));

    let r1 = app.respond(Request::try_new(Method::POST, "/login/alice").unwrap());
    assert_eq!(r1.status, StatusCode::OK);
    let token = session_token(&r1);

    let r2 = app.respond(with_cookie(Method::GET, "/whoami", &token));
    assert_eq!(r2.body_bytes(), b"alice");
    assert_eq!(session_token(&r2), token);
}

#[test]
fn test_token_accepted_from_header() {
    let app = build(Arc::new(MemorySessionStore::new()));
    let token = session_token(&app.respond(Request::try_new(Method::POST, "/login/bob").unwrap()));

    let req = Request::try_new(Method::GET, "/whoami")
        .unwrap()
        .with_header(HeaderName::from_static("x-session-token"), &token);
    assert_eq!(app.respond(req).body_bytes(), b"bob");
}

#[test]
fn test_new_request_gets_fresh_session() {
    let app = build(Arc::new(MemorySessionStore::new()));
    let first = session_token(&app.respond(Request::try_new(Method::POST, "/login/amy").unwrap()));
    let second = session_token(&app.respond(Request::try_new(Method::POST, "/login/ben").unwrap()));
    assert_ne!(first, second);

    let anonymous = app.respond(Request::try_new(Method::GET, "/whoami").unwrap());
    assert_eq!(anonymous.body_bytes(), b"anonymous");
}

#[test]
fn test_untouched_sessions_are_not_stored() {
    let store = Arc::new(MemorySessionStore::new());
    let app = build(Arc::clone(&store));
    for path in ["/health", "/nope", "/whoami"] {
        for _ in 0..50 {
            let res = app.respond(Request::try_new(Method::GET, path).unwrap());
            assert!(res.header("set-cookie").is_none(), "cookie set for {path}");
        }
    }
    assert_eq!(store.len(), 0);
}

#[test]
fn test_new_session_survives_error_response() {
    let store = Arc::new(MemorySessionStore::new());
    let app = build(Arc::clone(&store));

    let r1 = app.respond(Request::try_new(Method::POST, "/attempt").unwrap());
    assert_eq!(r1.status, StatusCode::UNAUTHORIZED);
    let token = session_token(&r1);
    assert_eq!(store.len(), 1);

    let r2 = app.respond(with_cookie(Method::POST, "/attempt", &token));
    assert_eq!(r2.status, StatusCode::UNAUTHORIZED);
    assert_eq!(session_token(&r2), token);
    assert_eq!(
        store.load(&token).get("attempts").map(String::as_str),
        Some("2")
    );
}

#[test]
fn test_new_session_cookie_on_internal_error() {
    let store = Arc::new(MemorySessionStore::new());
    let app = build(Arc::clone(&store));
    let res = app.respond(Request::try_new(Method::POST, "/broken").unwrap());
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let token = session_token(&res);
    assert_eq!(
        store.load(&token).get("attempted").map(String::as_str),
        Some("yes")
    );
}

#[test]
fn test_tampered_token_is_replaced() {
    let logs = TestLogs::init();
    let app = build(Arc::new(MemorySessionStore::new()));
    let token = session_token(&app.respond(Request::try_new(Method::POST, "/login/carol").unwrap()));

    let (id, mac) = token.split_once('.').unwrap();
    let flipped = if mac.starts_with('0') { "1" } else { "0" };
    let forged = format!("{id}.{flipped}{}", &mac[1..]);

    let res = app.respond(with_cookie(Method::GET, "/whoami", &forged));
    assert_eq!(res.body_bytes(), b"anonymous");
    assert!(res.cookies().get(DEFAULT_SESSION_COOKIE).is_none());
    assert!(logs.contents().contains("invalid signature"));
}

#[test]
fn test_token_from_other_secret_rejected() {
    let store = Arc::new(MemorySessionStore::new());
    let app = build(Arc::clone(&store));
    let mut other_config = test_app::config(Environment::Development);
    other_config.session.secret = Some("someone-else".to_string());
    let other = ApplicationBuilder::new(other_config)
        .session_store(Arc::clone(&store) as Arc<dyn SessionStore>)
        .routes(session_routes())
        .build()
        .unwrap();

    let token = session_token(&other.respond(Request::try_new(Method::POST, "/login/mallory").unwrap()));
    let res = app.respond(with_cookie(Method::GET, "/whoami", &token));
    assert_eq!(res.body_bytes(), b"anonymous");
}

#[test]
fn test_destroy_removes_state_and_expires_cookie() {
    let store = Arc::new(MemorySessionStore::new());
    let app = build(Arc::clone(&store));
    let token = session_token(&app.respond(Request::try_new(Method::POST, "/login/dave").unwrap()));
    assert_eq!(store.len(), 1);

    let res = app.respond(with_cookie(Method::POST, "/logout", &token));
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(session_token(&res), "");
    let raw = res.header("set-cookie").unwrap();
    assert!(raw.contains("Max-Age=0"));
    assert!(store.is_empty());

    let after = app.respond(with_cookie(Method::GET, "/whoami", &token));
    assert_eq!(after.body_bytes(), b"anonymous");
}

#[test]
fn test_state_saved_when_handler_fails() {
    let store = Arc::new(MemorySessionStore::new());
    let app = build(Arc::clone(&store));
    let token = session_token(&app.respond(Request::try_new(Method::POST, "/login/erin").unwrap()));

    let res = app.respond(with_cookie(Method::POST, "/broken", &token));
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        store.load(&token).get("attempted").map(String::as_str),
        Some("yes")
    );
}

#[test]
fn test_cookie_attributes() {
    let mut config = test_app::config(Environment::Production);
    config.session.secure_cookie = true;
    config.session.cookie_name = "sid".to_string();
    let app = ApplicationBuilder::new(config)
        .routes(session_routes())
        .build()
        .unwrap();
    let res = app.respond(Request::try_new(Method::POST, "/login/frank").unwrap());
    let raw = res.header("set-cookie").unwrap();
    assert!(raw.starts_with("sid="));
    assert!(raw.contains("Path=/"));
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("Secure"));
}
