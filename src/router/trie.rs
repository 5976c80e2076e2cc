//! Segment trie stored as an index-based arena.
//!
//! Nodes never hold references to each other; children are `NodeId`s into
//! `Trie::nodes`. The trie is filled once at boot and only read while serving,
//! so concurrent lookups need no locking.
//!
//! Lookup rules:
//! - a literal child always wins over the parameter child at the same node;
//! - once a branch is taken there is no backtracking, so a literal match that
//!   dead-ends later does not retry through the parameter child;
//! - a parameter capture that fails its type check ends the lookup;
//! - a path that matches but has no handler for the method is a miss, except
//!   that `HEAD` uses the `GET` handler when it has none of its own.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use super::pattern::{split_path, ParamKind, Segment};
use super::ParamVec;
use crate::error::RouteError;

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug)]
struct ParamEdge {
    name: Arc<str>,
    kind: ParamKind,
    child: NodeId,
}

#[derive(Debug)]
struct Node<T> {
    literals: HashMap<Box<str>, NodeId>,
    /// At most one parameter child per node
    param: Option<ParamEdge>,
    handlers: HashMap<Method, T>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            literals: HashMap::new(),
            param: None,
            handlers: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Trie<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Trie<T> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
        }
    }

    fn push(&mut self) -> NodeId {
        self.nodes.push(Node::new());
        self.nodes.len() - 1
    }

    /// Insert `value` for `method` at the node addressed by `segments`.
    ///
    /// Returns the value previously registered for the same method and path.
    pub(crate) fn insert(
        &mut self,
        pattern: &str,
        segments: &[Segment],
        method: Method,
        value: T,
    ) -> Result<Option<T>, RouteError> {
        let mut node = ROOT;
        for segment in segments {
            node = match segment {
                Segment::Literal(text) => match self.nodes[node].literals.get(text.as_str()) {
                    Some(&child) => child,
                    None => {
                        let child = self.push();
                        self.nodes[node]
                            .literals
                            .insert(text.clone().into_boxed_str(), child);
                        child
                    }
                },
                Segment::Param { name, kind } => match &self.nodes[node].param {
                    Some(edge) if edge.name == *name && edge.kind == *kind => edge.child,
                    Some(edge) => {
                        return Err(RouteError::ConflictingParameter {
                            pattern: pattern.to_string(),
                            existing: format!(":{}<{}>", edge.name, edge.kind),
                            requested: format!(":{name}<{kind}>"),
                        })
                    }
                    None => {
                        let child = self.push();
                        self.nodes[node].param = Some(ParamEdge {
                            name: Arc::clone(name),
                            kind: *kind,
                            child,
                        });
                        child
                    }
                },
            };
        }
        Ok(self.nodes[node].handlers.insert(method, value))
    }

    /// Resolve `path` for `method`, pushing captured parameters into `params`.
    pub(crate) fn lookup(&self, method: &Method, path: &str, params: &mut ParamVec) -> Option<&T> {
        let mut node = ROOT;
        for segment in split_path(path) {
            let current = &self.nodes[node];
            if let Some(&child) = current.literals.get(segment) {
                node = child;
                continue;
            }
            let edge = current.param.as_ref()?;
            if !edge.kind.accepts(segment) {
                return None;
            }
            let value = urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            params.push((Arc::clone(&edge.name), value));
            node = edge.child;
        }
        let handlers = &self.nodes[node].handlers;
        match handlers.get(method) {
            Some(value) => Some(value),
            None if *method == Method::HEAD => handlers.get(&Method::GET),
            None => None,
        }
    }

    /// Number of allocated nodes, root included.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
