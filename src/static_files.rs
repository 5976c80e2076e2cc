//! File-system collaborator used as the dispatcher's fallback when no route matches.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use http::header::{self, HeaderValue};
use http::StatusCode;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::error::Outcome;
use crate::middleware::Responder;
use crate::server::{Body, Request, Response, OCTET_STREAM};

static CONTENT_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("html", "text/html; charset=utf-8"),
        ("htm", "text/html; charset=utf-8"),
        ("css", "text/css; charset=utf-8"),
        ("js", "application/javascript"),
        ("mjs", "application/javascript"),
        ("json", "application/json"),
        ("txt", "text/plain; charset=utf-8"),
        ("xml", "application/xml"),
        ("svg", "image/svg+xml"),
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("webp", "image/webp"),
        ("ico", "image/x-icon"),
        ("wasm", "application/wasm"),
        ("pdf", "application/pdf"),
        ("woff", "font/woff"),
        ("woff2", "font/woff2"),
    ])
});

/// Content type for a file, derived from its extension.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .and_then(|ext| CONTENT_TYPES.get(ext.as_str()).copied())
        .unwrap_or(OCTET_STREAM)
}

/// Serves files below a base directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a URL path below the base directory, refusing anything but plain segments.
    ///
    /// The path is percent-decoded first, so encoded dot segments are refused too.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(url_path).ok()?;
        let mut pb = self.base_dir.clone();
        for comp in Path::new(decoded.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// File that would serve `url_path`, if it exists. Directories resolve to `index.html`.
    #[must_use]
    pub fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let mut path = self.map_path(url_path)?;
        if path.is_dir() {
            path.push("index.html");
        }
        path.is_file().then_some(path)
    }

    /// Read the file serving `url_path` with its content type.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .resolve(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))?;
        let bytes = fs::read(&path)?;
        Ok((bytes, content_type_for(&path)))
    }
}

/// Responder serving the request path from [`StaticFiles`].
///
/// Read failures are logged and answered with `404`, never a server error.
#[derive(Debug, Clone)]
pub struct FileResponder {
    files: StaticFiles,
}

impl FileResponder {
    #[must_use]
    pub fn new(files: StaticFiles) -> Self {
        Self { files }
    }
}

impl Responder for FileResponder {
    fn respond(&self, req: &mut Request) -> Outcome {
        match self.files.load(req.path()) {
            Ok((bytes, content_type)) => {
                let mut res = Response::binary(bytes, content_type);
                if req.method == http::Method::HEAD {
                    let len = res.body.len().unwrap_or(0);
                    res.body = Body::Empty;
                    res.headers
                        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
                }
                Ok(res)
            }
            Err(e) => {
                warn!(
                    request_id = %req.id,
                    path = %req.path(),
                    error = %e,
                    "Static file read failed"
                );
                Ok(Response::error(StatusCode::NOT_FOUND, "Not Found"))
            }
        }
    }
}
