use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::io::{self, Read};
use std::str::FromStr;
use std::sync::Arc;

use http::header::{self, AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};
use once_cell::unsync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::cookie::{parse_cookie_header, Cookie};
use crate::error::{Error, ValidationError};
use crate::middleware::Constraint;
use crate::router::ParamVec;
use crate::session::Session;

/// Strongly typed request identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse an inbound `X-Request-Id` when it is a valid ULID, otherwise mint one.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

/// Request payload source.
///
/// Hosting adapters either hand over the buffered bytes or a reader that is
/// drained the first time the body is needed.
pub enum RequestBody {
    Buffered(Vec<u8>),
    Reader(Box<dyn Read + Send>),
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            RequestBody::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Body decoded according to the request `Content-Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// No body was sent
    Empty,
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Any other media type, or a JSON body that failed to parse
    Raw,
}

/// Inbound HTTP request as seen by middleware and handlers.
///
/// A request lives for exactly one dispatch. The router fills in `parameters`,
/// the session middleware fills in `session`, and the decoded body is cached so
/// it is parsed at most once.
#[derive(Debug)]
pub struct Request {
    /// Correlation id, also recorded on the request span
    pub id: RequestId,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Path parameters captured by the router (e.g. `:id` → `42`)
    pub parameters: ParamVec,
    /// Attached by [`crate::middleware::SessionMiddleware`]
    pub session: Option<Session>,
    body: RequestBody,
    content: Option<Content>,
    query: OnceCell<Vec<(String, String)>>,
    cookies: OnceCell<HashMap<String, String>>,
    /// Cookies for whatever response the dispatcher ends up sending
    deferred_cookies: Vec<Cookie>,
    constraints: Arc<[Constraint]>,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            id: RequestId::new(),
            method,
            uri,
            headers: HeaderMap::new(),
            parameters: ParamVec::new(),
            session: None,
            body: RequestBody::Buffered(Vec::new()),
            content: None,
            query: OnceCell::new(),
            cookies: OnceCell::new(),
            deferred_cookies: Vec::new(),
            constraints: Arc::from(Vec::new()),
        }
    }

    /// Build a request from a method and a request target such as `/users/42?x=1`.
    pub fn try_new(method: Method, target: &str) -> Result<Self, http::uri::InvalidUri> {
        Ok(Self::new(method, target.parse()?))
    }

    /// Append a header. Values that are not valid header text are dropped with a warning.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                self.headers.append(name, v);
            }
            Err(_) => warn!(header = %name, "Dropping request header with invalid value"),
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = RequestBody::Buffered(body.into());
        self.content = None;
        self
    }

    #[must_use]
    pub fn with_body_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = RequestBody::Reader(Box::new(reader));
        self.content = None;
        self
    }

    /// Request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a path parameter by name (last capture wins for repeated names).
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins).
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_pairs()
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All decoded query pairs in order of appearance.
    pub fn query_pairs(&self) -> &[(String, String)] {
        self.query.get_or_init(|| {
            self.uri
                .query()
                .map(|q| {
                    url::form_urlencoded::parse(q.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Cookie sent by the client in the `Cookie` header(s).
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name).map(String::as_str)
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies.get_or_init(|| {
            let mut jar = HashMap::new();
            for value in self.headers.get_all(header::COOKIE) {
                if let Ok(s) = value.to_str() {
                    parse_cookie_header(s, &mut jar);
                }
            }
            jar
        })
    }

    /// Queue a cookie for the final response.
    ///
    /// Used when an error is propagating and there is no response to set it
    /// on yet; the dispatcher writes queued cookies onto whatever response the
    /// request ends with, error responses included.
    pub fn defer_cookie(&mut self, cookie: Cookie) {
        self.deferred_cookies.push(cookie);
    }

    pub fn take_deferred_cookies(&mut self) -> Vec<Cookie> {
        std::mem::take(&mut self.deferred_cookies)
    }

    /// Raw body bytes, draining a reader body on first use.
    pub fn body_bytes(&mut self) -> io::Result<&[u8]> {
        if let RequestBody::Reader(reader) = &mut self.body {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            self.body = RequestBody::Buffered(buf);
        }
        match &self.body {
            RequestBody::Buffered(bytes) => Ok(bytes),
            RequestBody::Reader(_) => Ok(&[]),
        }
    }

    /// Decode the body once according to `Content-Type` and cache the result.
    ///
    /// Subsequent calls return the cached value without touching the body again.
    pub fn cache_content(&mut self) -> io::Result<&Content> {
        if self.content.is_none() {
            let media_type = self
                .header(header::CONTENT_TYPE)
                .and_then(|ct| ct.split(';').next())
                .map(|ct| ct.trim().to_ascii_lowercase());
            let bytes = self.body_bytes()?;
            let content = if bytes.is_empty() {
                Content::Empty
            } else {
                match media_type.as_deref() {
                    Some("application/json") => match serde_json::from_slice(bytes) {
                        Ok(value) => Content::Json(value),
                        Err(e) => {
                            debug!(error = %e, "Request body is not valid JSON");
                            Content::Raw
                        }
                    },
                    Some("application/x-www-form-urlencoded") => Content::Form(
                        url::form_urlencoded::parse(bytes)
                            .map(|(k, v)| (k.into_owned(), v.into_owned()))
                            .collect(),
                    ),
                    _ => Content::Raw,
                }
            };
            self.content = Some(content);
        }
        Ok(self.content.get_or_insert(Content::Empty))
    }

    /// Cached decoded body, `None` until [`Request::cache_content`] ran.
    #[must_use]
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// Decoded JSON body, if the request carried one.
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        match &self.content {
            Some(Content::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Look a key up in the query string, then the form body, then the JSON body.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<String> {
        if let Some(v) = self.query(key) {
            return Some(v.to_string());
        }
        match &self.content {
            Some(Content::Form(pairs)) => pairs
                .iter()
                .rfind(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            Some(Content::Json(Value::Object(map))) => match map.get(key)? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            },
            _ => None,
        }
    }

    /// Deserialize the body as JSON, reporting decode failures as validation errors.
    pub fn parse_json<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let bytes = self.body_bytes()?;
        serde_json::from_slice(bytes)
            .map_err(|e| ValidationError::new("body", format!("invalid JSON body: {e}")).into())
    }

    /// The session attached by the session middleware.
    pub fn session_mut(&mut self) -> Result<&mut Session, Error> {
        self.session.as_mut().ok_or_else(|| {
            Error::Internal(anyhow::anyhow!(
                "no session attached to request; is SessionMiddleware installed?"
            ))
        })
    }

    /// Constraints declared by the matched route.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub(crate) fn set_constraints(&mut self, constraints: Arc<[Constraint]>) {
        self.constraints = constraints;
    }
}
