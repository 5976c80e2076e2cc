use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use tracing::{error, info, info_span, warn};

use super::builder::ApplicationBuilder;
use super::date::DateCache;
use crate::error::Error;
use crate::middleware::{validation_response, Responder};
use crate::router::Router;
use crate::runtime_config::{AppConfig, Environment};
use crate::server::{Body, Request, RequestId, Response};
use crate::static_files::StaticFiles;

/// Message sent in place of internal error detail in production.
pub const GENERIC_ERROR_MESSAGE: &str = "Internal Server Error";

/// Static file fallback: the files to probe and the chain serving them.
pub(crate) struct StaticFallback {
    pub(crate) files: StaticFiles,
    pub(crate) responder: Arc<dyn Responder>,
}

/// The assembled application: routes, fallbacks and global middleware.
///
/// Built once by [`ApplicationBuilder`] and shared read-only between serving
/// threads. Every chain is composed at build time, so a request only walks the
/// trie and calls into an existing responder.
pub struct Application {
    pub(crate) router: Router,
    pub(crate) static_fallback: Option<StaticFallback>,
    /// Constant `404` responder wrapped in global middleware
    pub(crate) not_found: Arc<dyn Responder>,
    pub(crate) environment: Environment,
    pub(crate) server_name: HeaderValue,
    pub(crate) dates: DateCache,
    pub(crate) middleware_names: Vec<&'static str>,
}

impl Application {
    #[must_use]
    pub fn builder(config: AppConfig) -> ApplicationBuilder {
        ApplicationBuilder::new(config)
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Global middleware names, outermost first.
    #[must_use]
    pub fn middleware_names(&self) -> &[&'static str] {
        &self.middleware_names
    }

    /// Handle one request. Always returns a response.
    ///
    /// Steps: decode the body once, pick a responder (route, static file, or
    /// not found), invoke its chain with failures and panics contained, write
    /// cookies queued on the request, drop the body for `HEAD`, then stamp
    /// `Date` and `Server`.
    pub fn respond(&self, mut req: Request) -> Response {
        req.id = RequestId::from_header_or_new(req.header("x-request-id"));
        let span = info_span!(
            "request",
            request_id = %req.id,
            method = %req.method,
            path = %req.path()
        );
        let _enter = span.enter();
        let start = Instant::now();

        let mut res = match req.cache_content() {
            Ok(_) => {
                let responder = self.resolve(&mut req);
                self.invoke(responder.as_ref(), &mut req)
            }
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                Response::error(StatusCode::BAD_REQUEST, "Unreadable request body")
            }
        };

        for cookie in req.take_deferred_cookies() {
            res.set_cookie(&cookie);
        }
        if req.method == Method::HEAD {
            strip_body(&mut res);
        }
        self.finalize(&mut res);
        info!(
            status = res.status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        res
    }

    /// Choose the responder chain for `req`, recording route parameters on it.
    fn resolve(&self, req: &mut Request) -> Arc<dyn Responder> {
        if let Some(m) = self.router.match_request(req) {
            req.parameters = m.parameters;
            req.set_constraints(Arc::clone(&m.entry.constraints));
            return Arc::clone(&m.entry.responder);
        }

        if matches!(req.method, Method::GET | Method::HEAD) {
            if let Some(fallback) = &self.static_fallback {
                if fallback.files.resolve(req.path()).is_some() {
                    return Arc::clone(&fallback.responder);
                }
            }
        }

        Arc::clone(&self.not_found)
    }

    fn invoke(&self, responder: &dyn Responder, req: &mut Request) -> Response {
        match panic::catch_unwind(AssertUnwindSafe(|| responder.respond(req))) {
            Ok(Ok(res)) => res,
            Ok(Err(err)) => self.error_response(err),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic_message = %message, "Handler panicked");
                self.failure_response(&format!("handler panicked: {message}"))
            }
        }
    }

    /// Convert an error that escaped every middleware into a response.
    fn error_response(&self, err: Error) -> Response {
        match err {
            Error::Abort { status, message } => Response::error(status, &message),
            Error::Validation(err) => validation_response(&err),
            Error::Internal(err) => {
                error!(error = %format!("{err:#}"), "Unhandled error while responding");
                self.failure_response(&format!("{err:#}"))
            }
        }
    }

    /// `500` response; detail is replaced by a generic message in production.
    fn failure_response(&self, detail: &str) -> Response {
        let message = if self.environment.is_production() {
            GENERIC_ERROR_MESSAGE
        } else {
            detail
        };
        Response::error(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn finalize(&self, res: &mut Response) {
        res.headers.insert(header::DATE, self.dates.current());
        res.headers.insert(header::SERVER, self.server_name.clone());
        if !res.headers.contains_key(header::CONTENT_TYPE) {
            warn!(status = res.status.as_u16(), "Response has no Content-Type header");
        }
    }
}

/// Drop the body of a `HEAD` response, keeping its length when known.
fn strip_body(res: &mut Response) {
    if res.body.is_empty() {
        return;
    }
    if let Some(len) = res.body.len() {
        res.headers
            .entry(header::CONTENT_LENGTH)
            .or_insert_with(|| HeaderValue::from(len));
    }
    res.body = Body::Empty;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
