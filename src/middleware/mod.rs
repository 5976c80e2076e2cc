//! # Middleware Module
//!
//! Cross-cutting behavior wrapped around responders.
//!
//! A [`Middleware`] receives the request and the `next` responder. It may
//! change the request, call `next` (or not, to short-circuit), and inspect or
//! replace the outcome. Chains are composed once when the application is
//! built: for `[m0, m1, m2]` around terminal `T` the result is
//! `m0(m1(m2(T)))`, so `m0` sees the request first and the outcome last.
//!
//! ## Built-in middleware
//!
//! | Middleware | Role |
//! |---|---|
//! | [`AbortMiddleware`] | `Error::Abort` → response with the requested status |
//! | [`ValidationMiddleware`] | route constraints and `Error::Validation` → `400` |
//! | [`SessionMiddleware`] | load session before, save after, refresh cookie |
//! | [`MetricsMiddleware`] | request counters for Prometheus |
//!
//! The first three are installed by default, in that order.

mod abort;
mod core;
mod metrics;
mod session;
mod validation;

pub use abort::AbortMiddleware;
pub use core::{chain, compose, from_fn, FnMiddleware, Middleware, Responder};
pub use metrics::MetricsMiddleware;
pub use session::{SessionMiddleware, DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_HEADER};
pub use validation::{validation_response, Constraint, ValidationMiddleware};
