//! # Session Module
//!
//! Server-held state correlated to a client through an opaque token.
//!
//! [`crate::middleware::SessionMiddleware`] reads the token from the request,
//! loads the state from a [`SessionStore`] into a [`Session`] attached to the
//! request, and saves it back once the handler has finished. Stores only need
//! to be safe under concurrent access by different tokens; concurrent writers
//! to the same token are last-writer-wins.

mod memory;

use std::collections::HashMap;

pub use memory::MemorySessionStore;

/// Backing storage for session state.
pub trait SessionStore: Send + Sync {
    /// State stored for `token`, empty if none.
    fn load(&self, token: &str) -> HashMap<String, String>;

    /// Replace the state stored for `token`.
    fn save(&self, token: &str, data: HashMap<String, String>);

    /// Forget `token` entirely.
    fn destroy(&self, token: &str);
}

/// Session state for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: String,
    data: HashMap<String, String>,
    modified: bool,
    destroyed: bool,
}

impl Session {
    pub fn new(token: impl Into<String>, data: HashMap<String, String>) -> Self {
        Self {
            token: token.into(),
            data,
            modified: false,
            destroyed: false,
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
        self.modified = true;
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.data.remove(key);
        self.modified |= removed.is_some();
        removed
    }

    /// Drop all state; the store entry is deleted and the cookie expired.
    pub fn destroy(&mut self) {
        self.data.clear();
        self.modified = true;
        self.destroyed = true;
    }

    /// Whether the handler changed any state since the session was loaded.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[must_use]
    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }

    pub(crate) fn into_data(self) -> HashMap<String, String> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_remove() {
        let mut session = Session::new("tok", HashMap::new());
        session.set("user", "alice");
        assert_eq!(session.get("user"), Some("alice"));
        assert_eq!(session.remove("user").as_deref(), Some("alice"));
        assert_eq!(session.get("user"), None);
    }

    #[test]
    fn test_reads_do_not_mark_modified() {
        let mut session = Session::new("tok", HashMap::from([("k".into(), "v".into())]));
        assert_eq!(session.get("k"), Some("v"));
        assert_eq!(session.remove("missing"), None);
        assert!(!session.is_modified());
        session.set("k", "w");
        assert!(session.is_modified());
    }

    #[test]
    fn test_destroy_clears_state() {
        let mut session = Session::new("tok", HashMap::from([("k".into(), "v".into())]));
        session.destroy();
        assert!(session.is_destroyed());
        assert!(session.data().is_empty());
        assert_eq!(session.token(), "tok");
    }
}
