//! Circular dependency detection along one resolution branch.
//!
//! The resolver walks the dependency tree depth-first. Every branch carries a
//! [`CycleDetector`] holding the version-independent names of its ancestors;
//! before descending into a child the branch clones its detector and pushes
//! the child's name. Seeing a name that is already an ancestor means the tree
//! would be infinite.
//!
//! The ancestor path is a persistent singly-linked list: pushing creates a new
//! head that points at the shared tail, so cloning is a reference-count bump
//! and sibling branches can never observe each other's additions.

use crate::core::BzError;
use anyhow::Result;
use std::sync::Arc;

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<Arc<Node>>,
}

/// Ancestor path of the branch currently being resolved.
#[derive(Debug, Clone, Default)]
pub struct CycleDetector {
    head: Option<Arc<Node>>,
    depth: usize,
}

impl CycleDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` to the ancestor path.
    ///
    /// # Errors
    ///
    /// Returns [`BzError::CircularDependency`] when `name` is already an
    /// ancestor. The chain lists the ancestors root-first followed by `name`,
    /// joined with `->`. The detector is left unchanged on error.
    pub fn push(&mut self, name: &str) -> Result<()> {
        if self.contains(name) {
            let mut chain = self.chain();
            chain.push(name.to_string());
            return Err(BzError::CircularDependency {
                chain: chain.join("->"),
            }
            .into());
        }

        self.head = Some(Arc::new(Node {
            name: name.to_string(),
            parent: self.head.take(),
        }));
        self.depth += 1;
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|n| n == name)
    }

    /// Ancestor names, root first.
    #[must_use]
    pub fn chain(&self) -> Vec<String> {
        let mut chain: Vec<String> = self.iter().map(str::to_string).collect();
        chain.reverse();
        chain
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    // Newest first
    fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::successors(self.head.as_deref(), |node| node.parent.as_deref())
            .map(|node| node.name.as_str())
    }
}
