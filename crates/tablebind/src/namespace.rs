//! Caller-owned namespace registry for generated models.
//!
//! A registry is a tree of named segments rooted at the registry root;
//! leaves hold model bindings. It is explicitly constructed and passed into
//! the orchestrator rather than living in process-global state, so
//! independent binds into independent registries never interact.
//!
//! This layer performs no collision detection: callers must guarantee name
//! uniqueness before binding (the orchestrator's collision safeguard does
//! exactly that). Rebinding an already-used name silently overwrites.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::Model;

/// One segment of the namespace tree.
#[derive(Default)]
pub struct NamespaceNode {
    children: BTreeMap<String, NamespaceNode>,
    bindings: BTreeMap<String, Arc<Model>>,
}

impl NamespaceNode {
    /// Names bound directly at this node.
    pub fn binding_names(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    /// Child segment names.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.keys().map(String::as_str).collect()
    }

    /// A binding at this node.
    pub fn binding(&self, name: &str) -> Option<&Arc<Model>> {
        self.bindings.get(name)
    }
}

/// Caller-owned registry of bound models, keyed by namespace path.
#[derive(Default)]
pub struct NamespaceRegistry {
    root: NamespaceNode,
}

impl NamespaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name → model` at the node addressed by `path`, creating any
    /// missing intermediate segments.
    ///
    /// No collision detection happens here; binding an already-used name
    /// overwrites it. Callers guarantee uniqueness beforehand.
    pub fn register(&mut self, path: &[String], name: &str, model: Arc<Model>) {
        let mut node = &mut self.root;
        for segment in path {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.bindings.insert(name.to_string(), model);
    }

    /// The node at `path`, if every segment exists.
    pub fn node(&self, path: &[String]) -> Option<&NamespaceNode> {
        let mut node = &self.root;
        for segment in path {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Resolve a binding at `path`.
    pub fn get(&self, path: &[String], name: &str) -> Option<Arc<Model>> {
        self.node(path)?.bindings.get(name).cloned()
    }

    /// Snapshot of the names bound at `path`. Empty when the path does not
    /// exist yet.
    pub fn bound_names(&self, path: &[String]) -> Vec<String> {
        match self.node(path) {
            Some(node) => node.bindings.keys().cloned().collect(),
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn fmt_node(
            node: &NamespaceNode,
            f: &mut std::fmt::Formatter<'_>,
            indent: usize,
        ) -> std::fmt::Result {
            for name in node.bindings.keys() {
                writeln!(f, "{:indent$}{name}", "")?;
            }
            for (segment, child) in &node.children {
                writeln!(f, "{:indent$}{segment}::", "")?;
                fmt_node(child, f, indent + 2)?;
            }
            Ok(())
        }

        writeln!(f, "NamespaceRegistry")?;
        fmt_node(&self.root, f, 2)
    }
}
