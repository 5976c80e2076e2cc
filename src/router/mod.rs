//! # Router Module
//!
//! Maps an HTTP method and request path to a registered route.
//!
//! Patterns are declared with literal segments and named parameters:
//!
//! - `/users` matches exactly `/users`
//! - `/users/:name` captures any non-empty segment as `name`
//! - `/users/:id<int>` captures a segment only if it parses as an `i64`
//!
//! Routes live in a segment trie. Lookup walks the request path one segment at
//! a time, preferring a literal child over the parameter child and never
//! backtracking, so the cost is proportional to the number of segments and not
//! to the number of routes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use http::Method;
//! use trellis::router::{Route, Router};
//! use trellis::server::Response;
//!
//! let mut router = Router::new();
//! router.register(Route::get("/users/:id<int>", |req| {
//!     Ok(Response::text(format!("user {}", req.parameter("id").unwrap_or("?"))))
//! }))?;
//!
//! let m = router.route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(m.parameter("id"), Some("42"));
//! ```

mod core;
mod pattern;
mod route;
#[cfg(test)]
mod tests;
mod trie;

pub use core::{ParamVec, RouteEntry, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use pattern::{parse_pattern, split_path, ParamKind, Segment};
pub use route::Route;
