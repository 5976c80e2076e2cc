//! Route pattern syntax and path segmentation.
//!
//! Patterns are `/`-separated segments. A segment is either literal text or a
//! parameter written `:name` (any non-empty text) or `:name<int>` (a signed
//! 64-bit integer). `:name<string>` is accepted as an explicit spelling of the
//! untyped form.
//!
//! Paths and patterns are split by the same rule: one leading `/` is removed,
//! an empty remainder is the root (no segments), and every other `/` produces a
//! segment, so a trailing slash yields an empty final segment.

use std::fmt;
use std::sync::Arc;

use crate::error::RouteError;

/// Type a parameter capture must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Any non-empty segment
    Str,
    /// Segment that parses as `i64`
    Int,
}

impl ParamKind {
    /// Whether the raw segment text satisfies this kind.
    #[must_use]
    pub fn accepts(self, segment: &str) -> bool {
        match self {
            ParamKind::Str => !segment.is_empty(),
            ParamKind::Int => segment.parse::<i64>().is_ok(),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Str => f.write_str("string"),
            ParamKind::Int => f.write_str("int"),
        }
    }
}

/// One parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param { name: Arc<str>, kind: ParamKind },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Param { name, kind } => write!(f, ":{name}<{kind}>"),
        }
    }
}

/// Split a request path (or pattern) into segments without allocating.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    (!trimmed.is_empty())
        .then(|| trimmed.split('/'))
        .into_iter()
        .flatten()
}

/// Parse a route pattern such as `/users/:id<int>/posts`.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, RouteError> {
    let invalid = |reason: String| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    if !(pattern.is_empty() || pattern.starts_with('/')) {
        return Err(invalid("pattern must start with '/'".to_string()));
    }
    if pattern.contains('?') {
        return Err(invalid("pattern must not contain a query string".to_string()));
    }

    split_path(pattern)
        .map(|segment| {
            let Some(spec) = segment.strip_prefix(':') else {
                return Ok(Segment::Literal(segment.to_string()));
            };
            let (name, kind) = match spec.split_once('<') {
                Some((name, rest)) => {
                    let ty = rest
                        .strip_suffix('>')
                        .ok_or_else(|| invalid(format!("unterminated type in '{segment}'")))?;
                    let kind = match ty {
                        "int" => ParamKind::Int,
                        "string" | "str" => ParamKind::Str,
                        other => return Err(invalid(format!("unknown parameter type '{other}'"))),
                    };
                    (name, kind)
                }
                None => (spec, ParamKind::Str),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid(format!("invalid parameter name in '{segment}'")));
            }
            Ok(Segment::Param {
                name: Arc::from(name),
                kind,
            })
        })
        .collect()
}
