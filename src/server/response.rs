use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::cookie::{parse_set_cookie, Cookie};
use crate::error::Error;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

type StreamFn = Box<dyn FnOnce(&mut dyn Write) -> io::Result<()> + Send>;

/// Deferred body producer, invoked by the transport against its output stream.
pub struct StreamBody(StreamFn);

impl StreamBody {
    pub fn new<F>(writer: F) -> Self
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()> + Send + 'static,
    {
        Self(Box::new(writer))
    }

    /// Run the producer to completion against `out`.
    pub fn write_to(self, out: &mut dyn Write) -> io::Result<()> {
        (self.0)(out)
    }
}

impl fmt::Debug for StreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamBody(..)")
    }
}

/// Response payload.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Stream(StreamBody),
}

impl Body {
    /// Length in bytes when known up front; streams report `None`.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(b) => Some(b.len()),
            Body::Stream(_) => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

/// Outgoing HTTP response.
///
/// Built fresh per request by a responder. After it leaves the dispatcher only
/// the `Date` and `Server` headers have been added.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    fn with_content(status: StatusCode, content_type: &'static str, bytes: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self::new(status, headers, Body::Bytes(bytes))
    }

    /// Response with a status and no body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, HeaderMap::new(), Body::Empty)
    }

    /// `200 OK` plain text.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content(StatusCode::OK, TEXT_PLAIN, body.into().into_bytes())
    }

    /// `200 OK` HTML document.
    pub fn html(body: impl Into<String>) -> Self {
        Self::with_content(StatusCode::OK, TEXT_HTML, body.into().into_bytes())
    }

    /// `200 OK` JSON document.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::with_content(StatusCode::OK, APPLICATION_JSON, value.to_string().into_bytes())
    }

    /// Serialize any value as a `200 OK` JSON document.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::with_content(StatusCode::OK, APPLICATION_JSON, bytes))
    }

    /// JSON error document `{ "error": message }` with the given status.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(&serde_json::json!({ "error": message })).with_status(status)
    }

    /// `200 OK` binary payload with an explicit media type.
    #[must_use]
    pub fn binary(bytes: Vec<u8>, content_type: &str) -> Self {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
        headers.insert(header::CONTENT_TYPE, value);
        Self::new(StatusCode::OK, headers, Body::Bytes(bytes))
    }

    /// Redirect to `location`: `301 Moved Permanently` or `303 See Other`.
    #[must_use]
    pub fn redirect(location: &str, permanent: bool) -> Self {
        let status = if permanent {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::SEE_OTHER
        };
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        match HeaderValue::from_str(location) {
            Ok(v) => {
                headers.insert(header::LOCATION, v);
            }
            Err(_) => warn!(location = %location, "Redirect target is not a valid header value"),
        }
        Self::new(status, headers, Body::Empty)
    }

    /// `200 OK` with a body produced later by `writer` against the output stream.
    pub fn stream<F>(content_type: &'static str, writer: F) -> Self
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()> + Send + 'static,
    {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self::new(StatusCode::OK, headers, Body::Stream(StreamBody::new(writer)))
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// First value of a header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Add a cookie as its own `Set-Cookie` header.
    pub fn set_cookie(&mut self, cookie: &Cookie) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(v) => {
                self.headers.append(header::SET_COOKIE, v);
            }
            Err(_) => warn!(cookie = %cookie.name, "Cookie is not a valid header value; skipped"),
        }
    }

    /// Cookies set on this response, keyed by name.
    ///
    /// Reads every `Set-Cookie` header and keeps the leading `name=value` pair.
    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect()
    }

    /// Buffered body bytes; empty for stream bodies.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        match &self.body {
            Body::Bytes(b) => b,
            Body::Empty | Body::Stream(_) => &[],
        }
    }

    /// Consume the response and materialize its body, driving streams to completion.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self.body {
            Body::Empty => Ok(Vec::new()),
            Body::Bytes(b) => Ok(b),
            Body::Stream(stream) => {
                let mut buf = Vec::new();
                stream.write_to(&mut buf)?;
                Ok(buf)
            }
        }
    }
}
