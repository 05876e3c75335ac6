//! Node types for the document tree.
//!
//! A tree is made of [`Node`]s owned by a [`TreeDoc`](crate::TreeDoc) arena
//! and addressed by [`NodeId`] handles. Each node is Map, Array or Simple
//! typed; Simple nodes carry a [`TdValue`] scalar, containers carry ordered
//! children. Parent links are arena indices, so the tree itself never forms
//! an ownership cycle.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::{parse, NodeType, TdValue};
//!
//! let doc = parse("{a: 1, b: [true, null]}").unwrap();
//! let root = doc.node(doc.root());
//! assert_eq!(root.node_type(), NodeType::Map);
//!
//! let a = doc.get_child(doc.root(), "a").unwrap();
//! assert_eq!(doc.node(a).value(), Some(&TdValue::Int(1)));
//! ```

use crate::Bookmark;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Handle to a node inside a [`TreeDoc`](crate::TreeDoc) arena.
///
/// Ids are only meaningful against the document that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The three node shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeType {
    Map,
    Array,
    #[default]
    Simple,
}

/// The scalar value union carried by Simple nodes.
///
/// A closed variant set: anything that is not one of these parses as a
/// string. Integers that overflow `i64` (including hex literals) also stay
/// strings, mirroring the permissive grammars this crate reads.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TdValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl TdValue {
    /// Returns `true` if this is `Null`.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, TdValue::Null)
    }

    /// If this is a boolean, returns it.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TdValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If this is an integer, returns it.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TdValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// If this is a number, returns it as `f64`.
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TdValue::Int(i) => Some(*i as f64),
            TdValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// If this is a string, returns a reference to it.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TdValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TdValue::Null => write!(f, "null"),
            TdValue::Bool(b) => write!(f, "{b}"),
            TdValue::Int(i) => write!(f, "{i}"),
            TdValue::Float(v) => write!(f, "{v}"),
            TdValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for TdValue {
    fn from(value: bool) -> Self {
        TdValue::Bool(value)
    }
}

impl From<i64> for TdValue {
    fn from(value: i64) -> Self {
        TdValue::Int(value)
    }
}

impl From<i32> for TdValue {
    fn from(value: i32) -> Self {
        TdValue::Int(value as i64)
    }
}

impl From<f64> for TdValue {
    fn from(value: f64) -> Self {
        TdValue::Float(value)
    }
}

impl From<&str> for TdValue {
    fn from(value: &str) -> Self {
        TdValue::Str(value.to_string())
    }
}

impl From<String> for TdValue {
    fn from(value: String) -> Self {
        TdValue::Str(value)
    }
}

/// Derived state memoized on a node, cleared by
/// [`TreeDoc::touch`](crate::TreeDoc::touch).
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeCache {
    pub(crate) text: Option<Rc<str>>,
    pub(crate) hash: Option<u64>,
}

/// One element of a document tree.
///
/// Nodes are created through [`TreeDoc`](crate::TreeDoc) mutators and never
/// deleted individually; a document is discarded as a whole.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) key: Option<String>,
    pub(crate) node_type: NodeType,
    pub(crate) value: Option<TdValue>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) start: Option<Bookmark>,
    pub(crate) end: Option<Bookmark>,
    /// Set when a repeated map key was converted into a synthetic array.
    pub(crate) deduped: bool,
    pub(crate) frozen: bool,
    /// Lazy key lookup index, built once the child count crosses the
    /// threshold and maintained on append from then on.
    pub(crate) key_index: Option<HashMap<String, usize>>,
    pub(crate) cache: RefCell<NodeCache>,
}

impl Node {
    pub(crate) fn new(key: Option<String>) -> Self {
        Node {
            key,
            node_type: NodeType::Simple,
            value: None,
            children: Vec::new(),
            parent: None,
            start: None,
            end: None,
            deduped: false,
            frozen: false,
            key_index: None,
            cache: RefCell::new(NodeCache::default()),
        }
    }

    /// The key of this node. `None` for the document root and for array
    /// elements, which are addressed positionally.
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// The scalar value, only present on leaf (Simple) nodes.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&TdValue> {
        self.value.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in document order.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn children_size(&self) -> usize {
        self.children.len()
    }

    #[inline]
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Start position in the source, when this node came from a parse.
    #[inline]
    #[must_use]
    pub fn start(&self) -> Option<Bookmark> {
        self.start
    }

    /// End position in the source, when this node came from a parse.
    #[inline]
    #[must_use]
    pub fn end(&self) -> Option<Bookmark> {
        self.end
    }

    /// `true` if this node is a synthetic array created from repeated keys.
    #[inline]
    #[must_use]
    pub fn is_deduped(&self) -> bool {
        self.deduped
    }

    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// `true` for Simple nodes.
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.node_type == NodeType::Simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(TdValue::from(7i64).as_i64(), Some(7));
        assert_eq!(TdValue::from(7i64).as_f64(), Some(7.0));
        assert_eq!(TdValue::from("x").as_str(), Some("x"));
        assert_eq!(TdValue::from(true).as_bool(), Some(true));
        assert!(TdValue::Null.is_null());
        assert_eq!(TdValue::from(1.5).as_i64(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TdValue::Null.to_string(), "null");
        assert_eq!(TdValue::from(3i64).to_string(), "3");
        assert_eq!(TdValue::from("ab").to_string(), "ab");
    }
}
