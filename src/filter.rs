//! Per-node write filters and output decoration.
//!
//! Filters run on each map child just before it is written, matched against
//! the node's path string (`a/b/0`, root-relative). An exclude filter drops
//! the node;
//! a mask filter replaces its content with a placeholder that reveals only
//! the shape (`<Masked:len=5>`, `{Masked:size=3}`, `[Masked:length=2]`).
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::{parse, write_with_options, NodeFilter, WriteOptions};
//!
//! let doc = parse(r#"{user: {name: "ann", password: "hunter2"}}"#).unwrap();
//! let opts = WriteOptions::default()
//!     .with_filter(NodeFilter::mask(&["password"]).unwrap());
//! let out = write_with_options(&doc, &opts);
//! assert!(out.contains("<Masked:len=7>"));
//! assert!(!out.contains("hunter2"));
//! ```

use crate::error::{Error, Result};
use crate::{Node, NodeId, NodeType, TreeDoc};
use regex::Regex;
use std::rc::Rc;

/// Categories of text the writer emits, for decorator hooks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextKind {
    /// Brackets and delimiters.
    Operator,
    /// A map key, including its quotes when quoted.
    Key,
    /// A quoted string scalar, including quotes.
    StringValue,
    /// Any other scalar (number, bool, null, unquoted string).
    NonStringValue,
}

/// Wraps each emitted substring; used for syntax-highlighted output.
///
/// The decorator only affects presentation: returning its input unchanged
/// produces the undecorated text.
pub type Decorator = Rc<dyn Fn(TextKind, &str) -> String>;

/// The outcome of running filters on a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filtered {
    /// Write the node as-is.
    Keep,
    /// Omit the node entirely.
    Skip,
    /// Write this placeholder string in place of the node.
    Mask(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FilterAction {
    Exclude,
    Mask,
}

/// A path-matching write filter.
#[derive(Clone, Debug)]
pub struct NodeFilter {
    action: FilterAction,
    patterns: Vec<Regex>,
}

impl NodeFilter {
    /// A filter dropping every node whose path matches one of `patterns`.
    pub fn exclude(patterns: &[&str]) -> Result<NodeFilter> {
        Ok(NodeFilter {
            action: FilterAction::Exclude,
            patterns: compile(patterns)?,
        })
    }

    /// A filter masking every node whose path matches one of `patterns`.
    pub fn mask(patterns: &[&str]) -> Result<NodeFilter> {
        Ok(NodeFilter {
            action: FilterAction::Mask,
            patterns: compile(patterns)?,
        })
    }

    /// Applies this filter to the node at `path`.
    #[must_use]
    pub fn apply(&self, node: &Node, path: &str) -> Filtered {
        if !self.patterns.iter().any(|p| p.is_match(path)) {
            return Filtered::Keep;
        }
        match self.action {
            FilterAction::Exclude => Filtered::Skip,
            FilterAction::Mask => {
                // Empty leaves carry nothing worth hiding.
                if node.value().is_none() && !node.has_children() {
                    return Filtered::Keep;
                }
                Filtered::Mask(mask_placeholder(node))
            }
        }
    }
}

/// Runs `filters` in order against the node; first non-keep outcome wins.
pub(crate) fn apply_filters(filters: &[NodeFilter], doc: &TreeDoc, id: NodeId) -> Filtered {
    if filters.is_empty() {
        return Filtered::Keep;
    }
    let path = doc.path_string(id);
    let node = doc.node(id);
    for filter in filters {
        match filter.apply(node, &path) {
            Filtered::Keep => continue,
            other => return other,
        }
    }
    Filtered::Keep
}

fn mask_placeholder(node: &Node) -> String {
    match node.node_type() {
        NodeType::Simple => {
            let len = node.value().map_or(0, |v| v.to_string().chars().count());
            format!("<Masked:len={len}>")
        }
        NodeType::Map => format!("{{Masked:size={}}}", node.children_size()),
        NodeType::Array => format!("[Masked:length={}]", node.children_size()),
    }
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| Error::message(format!("invalid filter pattern: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_exclude_matches_path() {
        let doc = parse("{a: 1, secret: 2}").unwrap();
        let filter = NodeFilter::exclude(&["secret"]).unwrap();
        let id = doc.get_child(doc.root(), "secret").unwrap();
        assert_eq!(
            filter.apply(doc.node(id), &doc.path_string(id)),
            Filtered::Skip
        );
        let id = doc.get_child(doc.root(), "a").unwrap();
        assert_eq!(
            filter.apply(doc.node(id), &doc.path_string(id)),
            Filtered::Keep
        );
    }

    #[test]
    fn test_mask_placeholders_by_shape() {
        let doc = parse(r#"{s: "hello", m: {a: 1, b: 2}, l: [1, 2, 3]}"#).unwrap();
        let filter = NodeFilter::mask(&["."]).unwrap();
        let s = doc.get_child(doc.root(), "s").unwrap();
        assert_eq!(
            filter.apply(doc.node(s), &doc.path_string(s)),
            Filtered::Mask("<Masked:len=5>".into())
        );
        let m = doc.get_child(doc.root(), "m").unwrap();
        assert_eq!(
            filter.apply(doc.node(m), &doc.path_string(m)),
            Filtered::Mask("{Masked:size=2}".into())
        );
        let l = doc.get_child(doc.root(), "l").unwrap();
        assert_eq!(
            filter.apply(doc.node(l), &doc.path_string(l)),
            Filtered::Mask("[Masked:length=3]".into())
        );
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(NodeFilter::exclude(&["["]).is_err());
    }
}
