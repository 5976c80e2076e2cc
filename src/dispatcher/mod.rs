//! # Dispatcher Module
//!
//! [`Application::respond`] is the boundary between the hosting server and the
//! framework: one request in, exactly one response out, whatever happens in
//! between.
//!
//! ## Request Flow
//!
//! ```mermaid
//! flowchart LR
//!     A[Request] --> B[cache body content]
//!     B --> C{router match?}
//!     C -- yes --> R[route chain]
//!     C -- no --> D{static file?}
//!     D -- yes --> S[file chain]
//!     D -- no --> N[404 chain]
//!     R & S & N --> I[invoke, contain errors and panics]
//!     I --> F[stamp Date + Server]
//!     F --> Z[Response]
//! ```
//!
//! Every chain is the global middleware wrapped around the selected responder,
//! composed once in [`ApplicationBuilder::build`].
//!
//! ## Error Handling
//!
//! - Aborts and validation failures are normally turned into responses by their
//!   middleware; if they reach the dispatcher they are converted the same way.
//! - Internal errors and panics become `500`. Outside production the body
//!   carries the error description; in production it carries only
//!   `"Internal Server Error"`. This is the only place detail is redacted.

mod builder;
mod core;
mod date;

pub use builder::ApplicationBuilder;
pub use core::{Application, GENERIC_ERROR_MESSAGE};
pub use date::format_http_date;
