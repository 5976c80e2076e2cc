use std::fmt;
use std::sync::Arc;

use http::header::HeaderName;
use http::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use super::{Middleware, Responder};
use crate::error::{Error, Outcome, RouteError, ValidationError};
use crate::server::{Content, Request, Response};

/// A precondition a request must satisfy before its handler runs.
#[derive(Clone)]
pub enum Constraint {
    /// Query string must carry this key
    Query(String),
    /// Request must carry this header
    Header(HeaderName),
    /// Request body must be non-empty
    Body,
    /// Request body must be JSON matching the compiled schema
    JsonSchema(Arc<jsonschema::Validator>),
}

impl Constraint {
    pub fn query(name: impl Into<String>) -> Self {
        Constraint::Query(name.into())
    }

    #[must_use]
    pub fn header(name: HeaderName) -> Self {
        Constraint::Header(name)
    }

    #[must_use]
    pub fn body() -> Self {
        Constraint::Body
    }

    /// Compile a JSON Schema once at route registration time.
    pub fn json_schema(schema: &Value) -> Result<Self, RouteError> {
        let validator = jsonschema::validator_for(schema).map_err(|e| RouteError::InvalidSchema {
            reason: e.to_string(),
        })?;
        Ok(Constraint::JsonSchema(Arc::new(validator)))
    }

    /// Name reported in validation failures.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Constraint::Query(name) => format!("query:{name}"),
            Constraint::Header(name) => format!("header:{name}"),
            Constraint::Body => "body".to_string(),
            Constraint::JsonSchema(_) => "body:schema".to_string(),
        }
    }

    /// Check the request. Body constraints read the cached decoded content.
    pub fn check(&self, req: &Request) -> Result<(), ValidationError> {
        match self {
            Constraint::Query(name) => match req.query(name) {
                Some(_) => Ok(()),
                None => Err(ValidationError::new(
                    self.label(),
                    format!("missing query parameter '{name}'"),
                )),
            },
            Constraint::Header(name) => match req.headers.get(name) {
                Some(_) => Ok(()),
                None => Err(ValidationError::new(
                    self.label(),
                    format!("missing header '{name}'"),
                )),
            },
            Constraint::Body => match req.content() {
                Some(Content::Empty) | None => {
                    Err(ValidationError::new(self.label(), "request body is required"))
                }
                Some(_) => Ok(()),
            },
            Constraint::JsonSchema(validator) => {
                let instance = req.json().ok_or_else(|| {
                    ValidationError::new(self.label(), "expected a JSON request body")
                })?;
                let errors: Vec<String> = validator
                    .iter_errors(instance)
                    .map(|e| e.to_string())
                    .collect();
                if errors.is_empty() {
                    Ok(())
                } else {
                    Err(ValidationError::new(self.label(), errors.join("; ")))
                }
            }
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Query(name) => f.debug_tuple("Query").field(name).finish(),
            Constraint::Header(name) => f.debug_tuple("Header").field(name).finish(),
            Constraint::Body => f.write_str("Body"),
            Constraint::JsonSchema(_) => f.write_str("JsonSchema(..)"),
        }
    }
}

/// `400 Bad Request` body describing a validation failure.
#[must_use]
pub fn validation_response(err: &ValidationError) -> Response {
    Response::json(&json!({
        "error": "Validation failed",
        "constraint": err.constraint,
        "details": err.message,
    }))
    .with_status(StatusCode::BAD_REQUEST)
}

/// Enforces route constraints and converts validation failures into `400`.
///
/// Constraints declared on the matched route are checked before the rest of
/// the chain runs. `Error::Validation` raised further in (for example by
/// [`Request::parse_json`]) is converted on the way out.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationMiddleware;

impl Middleware for ValidationMiddleware {
    fn handle(&self, req: &mut Request, next: &dyn Responder) -> Outcome {
        if let Some(err) = req.constraints().iter().find_map(|c| c.check(req).err()) {
            debug!(
                request_id = %req.id,
                constraint = %err.constraint,
                details = %err.message,
                "Request rejected by constraint"
            );
            return Ok(validation_response(&err));
        }

        match next.respond(req) {
            Err(Error::Validation(err)) => {
                debug!(
                    request_id = %req.id,
                    constraint = %err.constraint,
                    details = %err.message,
                    "Handler reported validation failure"
                );
                Ok(validation_response(&err))
            }
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        "validation"
    }
}
