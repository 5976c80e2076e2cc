use std::fmt;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::pattern::parse_pattern;
use super::route::Route;
use super::trie::Trie;
use crate::error::RouteError;
use crate::middleware::{compose, Constraint, Responder};
use crate::server::Request;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path parameters in path order.
///
/// Names are shared with the trie (`Arc<str>`); values are decoded per request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A registered route with its middleware chain already composed.
pub struct RouteEntry {
    pub method: Method,
    pub pattern: String,
    /// Route middleware wrapped around the handler
    pub responder: Arc<dyn Responder>,
    pub constraints: Arc<[Constraint]>,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

/// Result of successfully matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    /// Parameters captured along the matched path (e.g. `:id` → `"123"`)
    pub parameters: ParamVec,
}

impl RouteMatch {
    /// Get a captured parameter by name; the last capture wins for repeated names.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Maps `(method, path)` to a route.
///
/// Routes are registered while the application is built and the router is
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct Router {
    trie: Trie<Arc<RouteEntry>>,
    entries: Vec<Arc<RouteEntry>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `route`, composing its middleware around its handler.
    ///
    /// Registering the same method and pattern again replaces the earlier route.
    pub fn register(&mut self, route: Route) -> Result<(), RouteError> {
        let segments = parse_pattern(&route.pattern)?;
        let entry = Arc::new(RouteEntry {
            responder: compose(&route.middleware, route.handler),
            constraints: Arc::from(route.constraints),
            method: route.method,
            pattern: route.pattern,
        });

        let replaced = self.trie.insert(
            &entry.pattern,
            &segments,
            entry.method.clone(),
            Arc::clone(&entry),
        )?;
        if let Some(previous) = replaced {
            warn!(
                method = %previous.method,
                pattern = %previous.pattern,
                "Route registered twice; replacing the earlier handler"
            );
            self.entries.retain(|e| !Arc::ptr_eq(e, &previous));
        }

        debug!(method = %entry.method, pattern = %entry.pattern, "Route registered");
        self.entries.push(entry);
        Ok(())
    }

    /// Match a method and path. Returns `None` when no route applies.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let mut parameters = ParamVec::new();
        let entry = self.trie.lookup(method, path, &mut parameters)?;
        debug!(
            method = %method,
            path = %path,
            route_pattern = %entry.pattern,
            path_params = ?parameters,
            "Route matched"
        );
        Some(RouteMatch {
            entry: Arc::clone(entry),
            parameters,
        })
    }

    /// Match a request by its method and path.
    #[must_use]
    pub fn match_request(&self, req: &Request) -> Option<RouteMatch> {
        self.route(&req.method, req.path())
    }

    /// Registered routes in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter().map(Arc::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Log a summary of the routing table.
    pub fn log_summary(&self) {
        let routes_summary: Vec<String> = self
            .entries
            .iter()
            .take(10)
            .map(|e| format!("{} {}", e.method, e.pattern))
            .collect();
        info!(
            routes_count = self.entries.len(),
            trie_nodes = self.trie.node_count(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
    }

    /// Print all registered routes to stdout.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.entries.len());
        for entry in &self.entries {
            println!(
                "[route] {} {} constraints={}",
                entry.method,
                entry.pattern,
                entry.constraints.len()
            );
        }
    }
}
