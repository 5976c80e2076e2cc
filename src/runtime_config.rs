//! # Runtime Configuration Module
//!
//! Application settings passed explicitly to [`crate::dispatcher::ApplicationBuilder`].
//! Nothing here is global: the dispatcher reads the environment flag and server
//! name from the config object it was built with.
//!
//! ## Sources
//!
//! - [`AppConfig::default()`] for tests and embedding
//! - [`AppConfig::from_env()`] for containers
//! - [`AppConfig::load()`] for a YAML or TOML file, chosen by extension
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `TRELLIS_ENV` | `environment` | `development` |
//! | `TRELLIS_SERVER_NAME` | `server_name` | `trellis/<version>` |
//! | `TRELLIS_STATIC_DIR` | `static_dir` | unset |
//! | `TRELLIS_SESSION_SECRET` | `session.secret` | random per process |
//! | `TRELLIS_SESSION_IDLE_SECS` | `session.idle_timeout_secs` | `1800` (`0` disables) |
//! | `TRELLIS_ADDR` | `http.addr` | `127.0.0.1:8080` |
//! | `TRELLIS_WORKERS` | `http.workers` | available parallelism |
//!
//! Unparseable values fall back to the default.
//!
//! ## Example
//!
//! ```yaml
//! environment: production
//! server_name: "petshop/1.4"
//! static_dir: ./public
//! session:
//!   cookie_name: petshop-session
//!   secret: change-me
//!   variant: sha512
//!   idle_timeout_secs: 3600
//! http:
//!   addr: 0.0.0.0:8080
//!   workers: 8
//! ```

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::hash::HashVariant;
use crate::middleware::{DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_HEADER};

/// Deployment environment. Production hides internal error detail from clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
            Environment::Test => f.write_str("test"),
        }
    }
}

/// Default `Server` header value.
#[must_use]
pub fn default_server_name() -> String {
    concat!("trellis/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Session middleware settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub header_name: String,
    /// Key for token signatures; a random key is generated when unset
    pub secret: Option<String>,
    pub variant: HashVariant,
    /// Mark the cookie `Secure`
    pub secure_cookie: bool,
    /// Forget in-memory sessions idle this long; unset keeps them until destroyed
    pub idle_timeout_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            header_name: DEFAULT_SESSION_HEADER.to_string(),
            secret: None,
            variant: HashVariant::default(),
            secure_cookie: false,
            idle_timeout_secs: Some(30 * 60),
        }
    }
}

/// Hosting adapter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
    /// Worker threads pulling requests off the listener
    pub workers: usize,
    /// Larger request bodies are rejected with `413`
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server_name: String,
    pub static_dir: Option<PathBuf>,
    pub session: SessionConfig,
    pub http: HttpConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            server_name: default_server_name(),
            static_dir: None,
            session: SessionConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `TRELLIS_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `TRELLIS_*` environment variables that are set.
    pub fn apply_env(&mut self) {
        if let Some(environment) = env::var("TRELLIS_ENV").ok().and_then(|v| v.parse().ok()) {
            self.environment = environment;
        }
        if let Ok(name) = env::var("TRELLIS_SERVER_NAME") {
            if !name.trim().is_empty() {
                self.server_name = name;
            }
        }
        if let Ok(dir) = env::var("TRELLIS_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Ok(secret) = env::var("TRELLIS_SESSION_SECRET") {
            self.session.secret = Some(secret);
        }
        if let Some(secs) = env::var("TRELLIS_SESSION_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.session.idle_timeout_secs = (secs > 0).then_some(secs);
        }
        if let Ok(addr) = env::var("TRELLIS_ADDR") {
            self.http.addr = addr;
        }
        if let Some(workers) = env::var("TRELLIS_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            self.http.workers = workers;
        }
    }

    /// Load from a `.yaml`/`.yml` or `.toml` file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&text)
                .with_context(|| format!("parsing YAML config {}", path.display())),
            Some("toml") => toml::from_str(&text)
                .with_context(|| format!("parsing TOML config {}", path.display())),
            _ => bail!(
                "unsupported config format for {} (expected .yaml, .yml or .toml)",
                path.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert!(config.server_name.starts_with("trellis/"));
        assert_eq!(config.session.cookie_name, "trellis-session");
        assert_eq!(config.session.idle_timeout_secs, Some(1800));
        assert!(config.http.workers > 0);
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "environment: production\nserver_name: shop/2\nsession:\n  variant: sha512\n  secret: s3cret\nhttp:\n  workers: 3"
        )
        .unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.server_name, "shop/2");
        assert_eq!(config.session.variant, HashVariant::Sha512);
        assert_eq!(config.session.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.http.workers, 3);
        assert_eq!(config.http.addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "environment = \"test\"\nstatic_dir = \"public\"\n\n[http]\naddr = \"0.0.0.0:9000\""
        )
        .unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.static_dir, Some(PathBuf::from("public")));
        assert_eq!(config.http.addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }
}
