//! Tree traversal over the Document Model
//!
//! A single pre-order walker backs every search; searches differ only in the
//! predicate they pass in.

pub mod search;

pub use search::{
    find_all, find_by_kind, find_by_name_pattern, find_first, NamePattern,
};

use crate::document::Node;

/// Pre-order, depth-first iterator over a node and all of its descendants.
///
/// Uses an explicit stack, so deep documents cannot overflow the call stack.
pub struct PreOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> PreOrder<'a> {
    pub fn new(root: &'a Node) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse push keeps the first child on top of the stack.
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

impl Node {
    /// Walk this node and its descendants in pre-order.
    pub fn walk(&self) -> PreOrder<'_> {
        PreOrder::new(self)
    }
}
