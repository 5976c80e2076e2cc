//! Error types shared by responders, middleware and the dispatcher.
//!
//! Every responder returns an [`Outcome`]. The `Err` side is a tagged union:
//!
//! - [`Error::Abort`] is an intentional early exit carrying the status and message
//!   to send. [`crate::middleware::AbortMiddleware`] turns it into a response.
//! - [`Error::Validation`] describes a violated request constraint and becomes a
//!   `400 Bad Request` in [`crate::middleware::ValidationMiddleware`].
//! - [`Error::Internal`] is anything unexpected. It is only ever converted into a
//!   response at the dispatcher boundary, where its detail may be redacted.

use std::fmt;

use http::StatusCode;

use crate::server::Response;

/// Result of invoking a responder or middleware.
pub type Outcome = Result<Response, Error>;

/// Failure raised while producing a response.
#[derive(Debug)]
pub enum Error {
    /// Structured early exit with an explicit HTTP status
    Abort {
        /// Status sent to the client
        status: StatusCode,
        /// Human readable message placed in the response body
        message: String,
    },
    /// A request failed a declared constraint
    Validation(ValidationError),
    /// Unexpected failure inside a handler or middleware
    Internal(anyhow::Error),
}

impl Error {
    /// Abort the request with `status` and a custom message.
    pub fn abort(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Abort {
            status,
            message: message.into(),
        }
    }

    /// Abort with `400 Bad Request`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::abort(StatusCode::BAD_REQUEST, message)
    }

    /// Abort with `401 Unauthorized`.
    pub fn unauthorized() -> Self {
        Self::abort(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    /// Abort with `403 Forbidden`.
    pub fn forbidden() -> Self {
        Self::abort(StatusCode::FORBIDDEN, "Forbidden")
    }

    /// Abort with `404 Not Found`.
    pub fn not_found() -> Self {
        Self::abort(StatusCode::NOT_FOUND, "Not Found")
    }

    /// Wrap any error as an unexpected internal failure.
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Internal(anyhow::Error::new(err))
    }

    /// HTTP status this error maps to when it reaches the dispatcher.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Abort { status, .. } => *status,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Abort { status, message } => write!(f, "aborted with {status}: {message}"),
            Error::Validation(err) => write!(f, "{err}"),
            // `{:#}` keeps the anyhow context chain on one line
            Error::Internal(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Validation(err) => Some(err),
            Error::Internal(err) => Some(err.as_ref()),
            Error::Abort { .. } => None,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::internal(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::internal(err)
    }
}

/// A request did not satisfy a constraint declared by its route or handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the violated constraint (e.g. `query:limit`, `body`)
    pub constraint: String,
    /// What was wrong with the request
    pub message: String,
}

impl ValidationError {
    pub fn new(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.constraint, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Route table construction error.
///
/// Returned when routes are registered at boot; serving never produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The path pattern could not be parsed
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },
    /// A node already has a parameter child with a different name or type
    ConflictingParameter {
        /// Pattern being registered
        pattern: String,
        /// Parameter already present at this position
        existing: String,
        /// Parameter the new pattern wanted to add
        requested: String,
    },
    /// A JSON schema constraint failed to compile
    InvalidSchema {
        /// Compiler message
        reason: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route pattern '{pattern}': {reason}")
            }
            RouteError::ConflictingParameter {
                pattern,
                existing,
                requested,
            } => write!(
                f,
                "route '{pattern}' declares parameter '{requested}' where '{existing}' is already registered"
            ),
            RouteError::InvalidSchema { reason } => {
                write!(f, "invalid JSON schema constraint: {reason}")
            }
        }
    }
}

impl std::error::Error for RouteError {}
