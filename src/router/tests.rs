use http::{Method, StatusCode};

use super::{Route, Router};
use crate::error::RouteError;
use crate::server::{Request, Response};

fn named(name: &'static str) -> Route {
    Route::get("/", move |_req| Ok(Response::text(name)))
}

fn router(routes: &[(Method, &str, &'static str)]) -> Router {
    let mut router = Router::new();
    for &(ref method, pattern, name) in routes {
        let route = Route::new(method.clone(), pattern, move |_req| Ok(Response::text(name)));
        router.register(route).unwrap();
    }
    router
}

fn call(router: &Router, method: Method, path: &str) -> Option<String> {
    let m = router.route(&method, path)?;
    let mut req = Request::try_new(method, path).unwrap();
    let res = m.entry.responder.respond(&mut req).unwrap();
    Some(String::from_utf8(res.body_bytes().to_vec()).unwrap())
}

#[test]
fn test_root_path() {
    let r = router(&[(Method::GET, "/", "root")]);
    assert_eq!(call(&r, Method::GET, "/").as_deref(), Some("root"));
    assert_eq!(call(&r, Method::GET, "").as_deref(), Some("root"));
    assert!(r.route(&Method::GET, "/other").is_none());
}

#[test]
fn test_int_parameter() {
    let r = router(&[(Method::GET, "/users/:id<int>", "user")]);
    let m = r.route(&Method::GET, "/users/42").unwrap();
    assert_eq!(m.parameter("id"), Some("42"));
    assert_eq!(m.entry.pattern, "/users/:id<int>");
    assert!(r.route(&Method::GET, "/users/abc").is_none());
}

#[test]
fn test_string_parameter_rejects_empty_segment() {
    let r = router(&[(Method::GET, "/users/:name", "user")]);
    assert!(r.route(&Method::GET, "/users/alice").is_some());
    // trailing slash yields an empty final segment
    assert!(r.route(&Method::GET, "/users/").is_none());
}

#[test]
fn test_nested_parameters_in_path_order() {
    let r = router(&[(Method::GET, "/orgs/:org/repos/:repo<int>", "repo")]);
    let m = r.route(&Method::GET, "/orgs/acme/repos/7").unwrap();
    let names: Vec<&str> = m.parameters.iter().map(|(k, _)| k.as_ref()).collect();
    assert_eq!(names, vec!["org", "repo"]);
    assert_eq!(m.parameter("org"), Some("acme"));
    assert_eq!(m.parameter("repo"), Some("7"));
}

#[test]
fn test_method_mismatch_is_a_miss() {
    let r = router(&[
        (Method::GET, "/items", "list"),
        (Method::POST, "/items", "create"),
    ]);
    assert_eq!(call(&r, Method::GET, "/items").as_deref(), Some("list"));
    assert_eq!(call(&r, Method::POST, "/items").as_deref(), Some("create"));
    assert!(r.route(&Method::DELETE, "/items").is_none());
}

#[test]
fn test_head_falls_back_to_get() {
    let r = router(&[
        (Method::GET, "/items", "list"),
        (Method::HEAD, "/probe", "probe"),
        (Method::GET, "/probe", "probe-get"),
        (Method::POST, "/create", "create"),
    ]);
    assert_eq!(call(&r, Method::HEAD, "/items").as_deref(), Some("list"));
    assert_eq!(call(&r, Method::HEAD, "/probe").as_deref(), Some("probe"));
    assert!(r.route(&Method::HEAD, "/create").is_none());
}

#[test]
fn test_trailing_slash_is_distinct() {
    let r = router(&[
        (Method::GET, "/docs", "bare"),
        (Method::GET, "/docs/", "slash"),
    ]);
    assert_eq!(call(&r, Method::GET, "/docs").as_deref(), Some("bare"));
    assert_eq!(call(&r, Method::GET, "/docs/").as_deref(), Some("slash"));
}

#[test]
fn test_literal_beats_parameter_regardless_of_order() {
    let r = router(&[
        (Method::GET, "/pets/:id", "by_id"),
        (Method::GET, "/pets/search", "search"),
    ]);
    assert_eq!(call(&r, Method::GET, "/pets/search").as_deref(), Some("search"));
    assert_eq!(call(&r, Method::GET, "/pets/12").as_deref(), Some("by_id"));
}

#[test]
fn test_duplicate_registration_replaces() {
    let mut r = Router::new();
    r.register(named("first")).unwrap();
    r.register(named("second")).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(call(&r, Method::GET, "/").as_deref(), Some("second"));
}

#[test]
fn test_conflicting_parameter_names() {
    let mut r = Router::new();
    r.register(Route::get("/items/:id", |_| Ok(Response::text("a"))))
        .unwrap();
    let err = r
        .register(Route::get("/items/:slug/edit", |_| Ok(Response::text("b"))))
        .unwrap_err();
    assert!(matches!(err, RouteError::ConflictingParameter { .. }));
}

#[test]
fn test_invalid_pattern_is_reported() {
    let mut r = Router::new();
    let err = r
        .register(Route::get("/items/:id<float>", |_| Ok(Response::text("a"))))
        .unwrap_err();
    assert!(matches!(err, RouteError::InvalidPattern { .. }));
    assert!(r.is_empty());
}

#[test]
fn test_route_constraints_travel_with_entry() {
    let mut r = Router::new();
    r.register(
        Route::post("/search", |_| Ok(Response::empty(StatusCode::NO_CONTENT)))
            .constraint(crate::middleware::Constraint::query("q")),
    )
    .unwrap();
    let m = r.route(&Method::POST, "/search").unwrap();
    assert_eq!(m.entry.constraints.len(), 1);
}

#[test]
fn test_match_request_ignores_query_string() {
    let r = router(&[(Method::GET, "/search", "search")]);
    let req = Request::try_new(Method::GET, "/search?q=rust").unwrap();
    assert!(r.match_request(&req).is_some());
}
