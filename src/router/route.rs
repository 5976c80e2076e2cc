use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::error::Outcome;
use crate::middleware::{Constraint, Middleware, Responder};
use crate::server::Request;

/// A route declaration: method, pattern, handler, and everything scoped to it.
///
/// ```rust,ignore
/// let route = Route::get("/users/:id<int>", |req| {
///     Ok(Response::text(req.parameter("id").unwrap_or_default().to_string()))
/// })
/// .middleware(require_login)
/// .constraint(Constraint::query("fields"));
/// ```
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: String,
    /// Route-scoped middleware, outermost first
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub handler: Arc<dyn Responder>,
    pub constraints: Vec<Constraint>,
}

impl Route {
    /// Declare a route handled by a closure.
    pub fn new<F>(method: Method, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Request) -> Outcome + Send + Sync + 'static,
    {
        Self::with_responder(method, pattern, Arc::new(handler))
    }

    /// Declare a route handled by any [`Responder`].
    pub fn with_responder(
        method: Method,
        pattern: impl Into<String>,
        handler: Arc<dyn Responder>,
    ) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            middleware: Vec::new(),
            handler,
            constraints: Vec::new(),
        }
    }

    pub fn get<F>(pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Request) -> Outcome + Send + Sync + 'static,
    {
        Self::new(Method::GET, pattern, handler)
    }

    pub fn post<F>(pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Request) -> Outcome + Send + Sync + 'static,
    {
        Self::new(Method::POST, pattern, handler)
    }

    pub fn put<F>(pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Request) -> Outcome + Send + Sync + 'static,
    {
        Self::new(Method::PUT, pattern, handler)
    }

    pub fn patch<F>(pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Request) -> Outcome + Send + Sync + 'static,
    {
        Self::new(Method::PATCH, pattern, handler)
    }

    pub fn delete<F>(pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Request) -> Outcome + Send + Sync + 'static,
    {
        Self::new(Method::DELETE, pattern, handler)
    }

    /// Wrap this route's handler in `middleware`. Earlier calls wrap outermost.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Require requests to satisfy `constraint` before the handler runs.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("middleware", &self.middleware.len())
            .field("constraints", &self.constraints)
            .finish()
    }
}
