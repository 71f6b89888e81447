#![forbid(unsafe_code)]

//! Materialized node sets.
//!
//! A `NodeSet` is the eager form of a filtered [`crate::NodeSetData`]: the
//! identifiers of every selected node, computed once before
//! canonicalization.

use roxmltree::{Node, NodeId};
use std::collections::HashSet;

/// A set of document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    pub fn insert(&mut self, id: NodeId) {
        self.nodes.insert(id);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let doc = roxmltree::Document::parse("<a><b/><c/></a>").unwrap();
        let b = doc.descendants().find(|n| n.has_tag_name("b")).unwrap();
        let c = doc.descendants().find(|n| n.has_tag_name("c")).unwrap();
        let mut set = NodeSet::new();
        assert!(set.is_empty());
        set.insert(b.id());
        set.insert(b.id());
        assert_eq!(set.len(), 1);
        assert!(set.contains(b));
        assert!(!set.contains(c));
    }
}
