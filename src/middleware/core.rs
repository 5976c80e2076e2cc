use std::fmt;
use std::sync::Arc;

use crate::error::Outcome;
use crate::server::Request;

/// Anything that turns a request into a response.
///
/// Handlers, composed middleware chains and the fallback responders all share
/// this shape. Closures `Fn(&mut Request) -> Outcome` implement it directly.
pub trait Responder: Send + Sync {
    fn respond(&self, req: &mut Request) -> Outcome;
}

impl<F> Responder for F
where
    F: Fn(&mut Request) -> Outcome + Send + Sync,
{
    fn respond(&self, req: &mut Request) -> Outcome {
        self(req)
    }
}

/// A step wrapped around the next responder.
///
/// A middleware may call `next` zero times (short-circuit) or once, and may
/// inspect or rewrite the request before and the outcome after.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: &mut Request, next: &dyn Responder) -> Outcome;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Middleware built from a closure, see [`from_fn`].
pub struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request, &dyn Responder) -> Outcome + Send + Sync,
{
    fn handle(&self, req: &mut Request, next: &dyn Responder) -> Outcome {
        (self.0)(req, next)
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnMiddleware(..)")
    }
}

/// Turn a closure into a [`Middleware`].
///
/// ```rust,ignore
/// let auth = from_fn(|req, next| {
///     if req.header("x-api-key").is_none() {
///         return Err(Error::unauthorized());
///     }
///     next.respond(req)
/// });
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&mut Request, &dyn Responder) -> Outcome + Send + Sync,
{
    FnMiddleware(f)
}

/// A middleware bound to the responder it wraps.
struct Chained {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn Responder>,
}

impl Responder for Chained {
    fn respond(&self, req: &mut Request) -> Outcome {
        self.middleware.handle(req, self.next.as_ref())
    }
}

/// Bind one middleware in front of `next`.
pub fn chain(middleware: Arc<dyn Middleware>, next: Arc<dyn Responder>) -> Arc<dyn Responder> {
    Arc::new(Chained { middleware, next })
}

/// Wrap `terminal` in `middleware` so that `middleware[0]` runs first.
///
/// An empty list returns `terminal` unchanged.
pub fn compose(middleware: &[Arc<dyn Middleware>], terminal: Arc<dyn Responder>) -> Arc<dyn Responder> {
    middleware
        .iter()
        .rev()
        .fold(terminal, |next, m| chain(Arc::clone(m), next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::server::Response;
    use http::{Method, StatusCode};
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> Arc<dyn Middleware> {
        let log = Arc::clone(log);
        Arc::new(from_fn(move |req, next| {
            log.lock().unwrap().push(format!("{label}>"));
            let out = next.respond(req);
            log.lock().unwrap().push(format!("<{label}"));
            out
        }))
    }

    #[test]
    fn test_compose_runs_in_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let terminal_log = Arc::clone(&log);
        let terminal: Arc<dyn Responder> = Arc::new(move |_req: &mut Request| {
            terminal_log.lock().unwrap().push("T".to_string());
            Ok(Response::text("done"))
        });
        let chain = compose(&[recorder(&log, "a"), recorder(&log, "b")], terminal);
        let mut req = Request::try_new(Method::GET, "/").unwrap();
        chain.respond(&mut req).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a>", "b>", "T", "<b", "<a"]);
    }

    #[test]
    fn test_empty_compose_is_terminal() {
        let terminal: Arc<dyn Responder> =
            Arc::new(|_req: &mut Request| Ok(Response::empty(StatusCode::ACCEPTED)));
        let chain = compose(&[], Arc::clone(&terminal));
        assert!(Arc::ptr_eq(&chain, &terminal));
    }

    #[test]
    fn test_short_circuit_skips_rest() {
        let deny: Arc<dyn Middleware> = Arc::new(from_fn(|_req, _next| Err(Error::forbidden())));
        let terminal: Arc<dyn Responder> =
            Arc::new(|_req: &mut Request| -> Outcome { panic!("terminal must not run") });
        let chain = compose(&[deny], terminal);
        let mut req = Request::try_new(Method::GET, "/").unwrap();
        let err = chain.respond(&mut req).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
