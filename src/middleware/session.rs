use std::collections::HashMap;
use std::sync::Arc;

use http::header::HeaderName;
use tracing::{debug, warn};

use super::{Middleware, Responder};
use crate::error::Outcome;
use crate::hash::KeyedHash;
use crate::server::{Cookie, Request};
use crate::session::{Session, SessionStore};

/// Cookie carrying the session token unless configured otherwise.
pub const DEFAULT_SESSION_COOKIE: &str = "trellis-session";

/// Header accepted as an alternative token source for non-browser clients.
pub const DEFAULT_SESSION_HEADER: &str = "x-session-token";

/// Attaches a [`Session`] to every request and persists it afterwards.
///
/// Tokens have the form `<ulid>.<mac>` where `mac` is the keyed hash of the
/// ULID. A token that is missing or fails verification is replaced by a fresh
/// one, so clients cannot pick their own session ids.
///
/// State is saved after the inner chain returns, whether it produced a
/// response or an error. On success the cookie is set on the response; on
/// error it is queued on the request with [`Request::defer_cookie`] so the
/// response built from the error still carries the token. A fresh session the
/// handler never wrote to is not stored and gets no cookie.
pub struct SessionMiddleware {
    store: Arc<dyn SessionStore>,
    hash: KeyedHash,
    cookie_name: String,
    header_name: HeaderName,
    secure: bool,
}

impl SessionMiddleware {
    pub fn new(store: Arc<dyn SessionStore>, hash: KeyedHash) -> Self {
        Self {
            store,
            hash,
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            header_name: HeaderName::from_static(DEFAULT_SESSION_HEADER),
            secure: false,
        }
    }

    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn header_name(mut self, name: HeaderName) -> Self {
        self.header_name = name;
        self
    }

    /// Mark the session cookie `Secure`.
    #[must_use]
    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    /// Mint a new signed token.
    #[must_use]
    pub fn issue_token(&self) -> String {
        let id = ulid::Ulid::new().to_string();
        let mac = self.hash.make(&id);
        format!("{id}.{mac}")
    }

    /// Whether `token` was signed with this middleware's key.
    #[must_use]
    pub fn verify_token(&self, token: &str) -> bool {
        match token.split_once('.') {
            Some((id, mac)) => id.parse::<ulid::Ulid>().is_ok() && self.hash.verify(id, mac),
            None => false,
        }
    }

    fn presented_token(&self, req: &Request) -> Option<String> {
        req.cookie(&self.cookie_name)
            .or_else(|| req.header(&self.header_name))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    fn session_cookie(&self, session: &Session) -> Cookie {
        Cookie::new(self.cookie_name.as_str(), session.token())
            .path("/")
            .http_only(true)
            .secure(self.secure)
    }
}

impl Middleware for SessionMiddleware {
    fn handle(&self, req: &mut Request, next: &dyn Responder) -> Outcome {
        let (token, presented) = match self.presented_token(req) {
            Some(token) if self.verify_token(&token) => (token, true),
            Some(_) => {
                warn!(request_id = %req.id, "Discarding session token with invalid signature");
                (self.issue_token(), false)
            }
            None => (self.issue_token(), false),
        };

        let data = if presented {
            self.store.load(&token)
        } else {
            HashMap::new()
        };
        debug!(request_id = %req.id, entries = data.len(), presented, "Session loaded");
        req.session = Some(Session::new(token, data));

        let outcome = next.respond(req);

        let Some(session) = req.session.take() else {
            return outcome;
        };
        // Untouched fresh sessions are neither stored nor sent to the client.
        let cookie = if session.is_destroyed() {
            self.store.destroy(session.token());
            Some(Cookie::expired(self.cookie_name.as_str()))
        } else if session.is_modified() {
            let cookie = self.session_cookie(&session);
            let token = session.token().to_string();
            self.store.save(&token, session.into_data());
            Some(cookie)
        } else if presented {
            Some(self.session_cookie(&session))
        } else {
            None
        };

        let Some(cookie) = cookie else {
            return outcome;
        };
        match outcome {
            Ok(mut res) => {
                res.set_cookie(&cookie);
                Ok(res)
            }
            Err(err) => {
                req.defer_cookie(cookie);
                Err(err)
            }
        }
    }

    fn name(&self) -> &'static str {
        "session"
    }
}
