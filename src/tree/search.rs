//! Predicate searches over a node tree.
//!
//! Every search tests the node itself before its children and returns matches in
//! child-array order. No match yields an empty list.

use crate::document::Node;
use regex::{Regex, RegexBuilder};

/// Case-insensitive name matcher.
///
/// The pattern is compiled as a regular expression; input that is not a valid
/// expression is matched as a literal substring instead.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Literal(String),
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        let matcher = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Matcher::Regex(regex),
            Err(err) => {
                tracing::debug!(pattern, error = %err, "Name pattern is not a valid regex, matching literally");
                Matcher::Literal(pattern.to_lowercase())
            }
        };
        Self {
            source: pattern.to_string(),
            matcher,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, name: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(regex) => regex.is_match(name),
            Matcher::Literal(needle) => name.to_lowercase().contains(needle.as_str()),
        }
    }
}

impl From<&str> for NamePattern {
    fn from(pattern: &str) -> Self {
        NamePattern::new(pattern)
    }
}

/// All nodes satisfying `predicate`, in pre-order
pub fn find_all<'a, P>(root: &'a Node, mut predicate: P) -> Vec<&'a Node>
where
    P: FnMut(&Node) -> bool,
{
    root.walk().filter(|node| predicate(node)).collect()
}

/// First node satisfying `predicate`, in pre-order
pub fn find_first<'a, P>(root: &'a Node, mut predicate: P) -> Option<&'a Node>
where
    P: FnMut(&Node) -> bool,
{
    root.walk().find(|node| predicate(node))
}

/// Nodes whose kind equals `kind` exactly
pub fn find_by_kind<'a>(root: &'a Node, kind: &str) -> Vec<&'a Node> {
    find_all(root, |node| node.kind == kind)
}

/// Nodes whose name contains a case-insensitive match of `pattern`
pub fn find_by_name_pattern<'a>(root: &'a Node, pattern: &NamePattern) -> Vec<&'a Node> {
    find_all(root, |node| pattern.is_match(&node.name))
}
