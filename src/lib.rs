//! # trellis
//!
//! **trellis** is a small, synchronous server-side web framework: a trie router,
//! composable middleware, signed-cookie sessions and a single dispatcher that
//! turns any request into exactly one response.
//!
//! ## Architecture
//!
//! - **[`router`]** - Method + path-pattern trie with named, optionally typed parameters
//! - **[`middleware`]** - `Responder`/`Middleware` traits, chain composition, and the
//!   built-in abort, validation, session and metrics middleware
//! - **[`dispatcher`]** - [`Application`] and its builder; the per-request flow
//! - **[`server`]** - [`Request`]/[`Response`] value objects, cookies and the
//!   `tiny_http` hosting adapter
//! - **[`session`]** - Session state and the pluggable [`SessionStore`]
//! - **[`hash`]** - Keyed SHA-2 hashing used to sign session tokens
//! - **[`static_files`]** - Fallback file serving for unmatched `GET`/`HEAD`
//! - **[`runtime_config`]** / **[`logging`]** - Configuration and `tracing` setup
//! - **[`cli`]** - The `trellis` binary's commands
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as HttpServer
//!     participant App as Application
//!     participant Router
//!     participant Chain as Middleware chain
//!     participant Handler
//!
//!     Host->>App: respond(Request)
//!     App->>App: cache body content
//!     App->>Router: match method + path
//!     Router-->>App: responder + parameters
//!     App->>Chain: invoke (panics contained)
//!     Chain->>Handler: respond(&mut Request)
//!     Handler-->>Chain: Outcome
//!     Chain-->>App: Outcome
//!     App->>App: map errors, stamp Date + Server
//!     App-->>Host: Response
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trellis::{AppConfig, ApplicationBuilder, HttpServer, Response, Route};
//!
//! let app = ApplicationBuilder::new(AppConfig::default())
//!     .route(Route::get("/hello/:name", |req| {
//!         let name = req.parameter("name").unwrap_or("world").to_string();
//!         Ok(Response::text(format!("Hello, {name}!")))
//!     }))
//!     .build()
//!     .expect("valid routes");
//!
//! let handle = HttpServer::new(Arc::new(app))
//!     .start("127.0.0.1:8080")
//!     .expect("bind");
//! handle.join().ok();
//! ```
//!
//! ## Runtime Considerations
//!
//! Handlers are plain synchronous functions. The HTTP host runs a fixed pool of
//! worker threads, so a blocking handler occupies one worker for its duration.
//! Streamed bodies are produced on their own thread and written with chunked
//! transfer encoding.

pub mod cli;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod hash;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod session;
pub mod static_files;

pub use dispatcher::{Application, ApplicationBuilder};
pub use error::{Error, Outcome, RouteError, ValidationError};
pub use hash::{HashVariant, KeyedHash};
pub use middleware::{Constraint, Middleware, Responder};
pub use router::{Route, Router};
pub use runtime_config::{AppConfig, Environment};
pub use server::{Cookie, HttpServer, Request, Response};
pub use session::{MemorySessionStore, Session, SessionStore};
