use tracing::debug;

use super::{Middleware, Responder};
use crate::error::{Error, Outcome};
use crate::server::{Request, Response};

/// Turns `Error::Abort` into a response carrying the requested status.
///
/// Aborts are intentional control flow, so they are logged at debug level
/// only. Other errors pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortMiddleware;

impl Middleware for AbortMiddleware {
    fn handle(&self, req: &mut Request, next: &dyn Responder) -> Outcome {
        match next.respond(req) {
            Err(Error::Abort { status, message }) => {
                debug!(
                    request_id = %req.id,
                    status = status.as_u16(),
                    message = %message,
                    "Request aborted"
                );
                Ok(Response::error(status, &message))
            }
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        "abort"
    }
}
