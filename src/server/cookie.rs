use std::collections::HashMap;
use std::fmt;

/// A cookie written to the client through `Set-Cookie`.
///
/// Each cookie is serialized into its own `Set-Cookie` header value; attributes
/// follow the `name=value` pair separated by `; `.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    /// Lifetime in seconds; `Some(0)` expires the cookie immediately
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            max_age: None,
            http_only: false,
            secure: false,
        }
    }

    /// A cookie that instructs the client to drop `name`.
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "").path("/").max_age(0)
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    #[must_use]
    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

/// Parse a request `Cookie` header (`a=1; b=2`) into name/value pairs.
///
/// Later duplicates overwrite earlier ones. Pairs without a name are skipped.
pub fn parse_cookie_header(header: &str, into: &mut HashMap<String, String>) {
    for pair in header.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let name = match parts.next() {
            Some(n) if !n.trim().is_empty() => n.trim(),
            _ => continue,
        };
        let value = parts.next().unwrap_or("").trim();
        into.insert(name.to_string(), value.to_string());
    }
}

/// Extract the leading `name=value` pair from a `Set-Cookie` header value.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
