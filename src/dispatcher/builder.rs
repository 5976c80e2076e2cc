use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use tracing::{info, warn};

use super::core::{Application, StaticFallback};
use super::date::DateCache;
use crate::error::{Outcome, RouteError};
use crate::hash::KeyedHash;
use crate::middleware::{
    compose, AbortMiddleware, Middleware, Responder, SessionMiddleware, ValidationMiddleware,
};
use crate::router::{Route, Router};
use crate::runtime_config::{default_server_name, AppConfig};
use crate::server::{Request, Response};
use crate::session::{MemorySessionStore, SessionStore};
use crate::static_files::{FileResponder, StaticFiles};

fn not_found(_req: &mut Request) -> Outcome {
    Ok(Response::error(StatusCode::NOT_FOUND, "Not Found"))
}

/// Assembles an [`Application`].
///
/// Global middleware runs in this order: the defaults (abort, validation,
/// session) unless disabled, then everything added with
/// [`ApplicationBuilder::middleware`]. Route-scoped middleware runs inside
/// the global chain, closest to the handler.
pub struct ApplicationBuilder {
    config: AppConfig,
    routes: Vec<Route>,
    middleware: Vec<Arc<dyn Middleware>>,
    session_store: Option<Arc<dyn SessionStore>>,
    static_files: Option<StaticFiles>,
    default_middleware: bool,
}

impl ApplicationBuilder {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            routes: Vec::new(),
            middleware: Vec::new(),
            session_store: None,
            static_files: None,
            default_middleware: true,
        }
    }

    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    #[must_use]
    pub fn routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Append global middleware after the defaults.
    #[must_use]
    pub fn middleware(self, middleware: impl Middleware + 'static) -> Self {
        self.shared_middleware(Arc::new(middleware))
    }

    /// Append global middleware the caller keeps a handle to (e.g. metrics).
    #[must_use]
    pub fn shared_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Back sessions with `store` instead of the in-memory default.
    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Serve files from `files` when no route matches. Overrides `config.static_dir`.
    #[must_use]
    pub fn static_files(mut self, files: StaticFiles) -> Self {
        self.static_files = Some(files);
        self
    }

    /// Skip the abort, validation and session defaults.
    #[must_use]
    pub fn without_default_middleware(mut self) -> Self {
        self.default_middleware = false;
        self
    }

    fn session_middleware(&self, store: Arc<dyn SessionStore>) -> SessionMiddleware {
        let session = &self.config.session;
        let secret = session.secret.clone().unwrap_or_else(|| {
            warn!("No session secret configured; sessions will not survive a restart");
            format!("{}{}", ulid::Ulid::new(), ulid::Ulid::new())
        });
        let mut mw = SessionMiddleware::new(store, KeyedHash::new(secret, session.variant))
            .cookie_name(session.cookie_name.as_str())
            .secure(session.secure_cookie);
        match HeaderName::from_bytes(session.header_name.as_bytes()) {
            Ok(name) => mw = mw.header_name(name),
            Err(_) => warn!(
                header = %session.header_name,
                "Invalid session header name; using default"
            ),
        }
        mw
    }

    /// Register every route and compose every chain.
    pub fn build(mut self) -> Result<Application, RouteError> {
        let mut global: Vec<Arc<dyn Middleware>> = Vec::new();
        if self.default_middleware {
            let idle = self.config.session.idle_timeout_secs;
            let store = self.session_store.take().unwrap_or_else(|| {
                let memory = match idle {
                    Some(secs) => MemorySessionStore::with_idle_timeout(Duration::from_secs(secs)),
                    None => MemorySessionStore::new(),
                };
                Arc::new(memory) as Arc<dyn SessionStore>
            });
            global.push(Arc::new(AbortMiddleware));
            global.push(Arc::new(ValidationMiddleware));
            global.push(Arc::new(self.session_middleware(store)));
        }
        global.append(&mut self.middleware);

        let mut router = Router::new();
        for mut route in self.routes {
            let scoped = std::mem::take(&mut route.middleware);
            route.middleware = global.iter().cloned().chain(scoped).collect();
            router.register(route)?;
        }
        router.log_summary();

        let files = self
            .static_files
            .or_else(|| self.config.static_dir.as_ref().map(StaticFiles::new));
        let static_fallback = files.map(|files| StaticFallback {
            responder: compose(&global, Arc::new(FileResponder::new(files.clone()))),
            files,
        });
        let not_found: Arc<dyn Responder> = Arc::new(not_found);

        let server_name = HeaderValue::from_str(&self.config.server_name).unwrap_or_else(|_| {
            warn!(server_name = %self.config.server_name, "Invalid server name; using default");
            HeaderValue::from_str(&default_server_name())
                .unwrap_or_else(|_| HeaderValue::from_static("trellis"))
        });

        let middleware_names: Vec<&'static str> = global.iter().map(|m| m.name()).collect();
        info!(
            environment = %self.config.environment,
            middleware = ?middleware_names,
            static_dir = ?static_fallback.as_ref().map(|f| f.files.base_dir().display().to_string()),
            "Application built"
        );

        Ok(Application {
            router,
            static_fallback,
            not_found: compose(&global, not_found),
            environment: self.config.environment,
            server_name,
            dates: DateCache::new(),
            middleware_names,
        })
    }
}
