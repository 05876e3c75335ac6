//! The document: an arena of nodes plus an id index.
//!
//! A [`TreeDoc`] exclusively owns every node of one tree. Nodes live in a
//! slab and refer to each other through [`NodeId`] indices, which keeps
//! parent back-references cycle-free and makes upward cache invalidation an
//! O(depth) index walk. The `id_map` resolves `$id` anchors to live nodes
//! for `$ref` lookup.
//!
//! Documents are created once per parse or per object-graph encode.
//! [`TreeDoc::merge`] and [`TreeDoc::retain`] re-root existing subtrees into
//! a new document, rewriting `$id`/`$ref` values to avoid collisions between
//! independently parsed sources.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::{parse, TdValue};
//!
//! let doc = parse(r#"{data: [{name: "n1"}, {name: "n2"}]}"#).unwrap();
//! let name = doc.get_by_path_str(doc.root(), "data/1/name").unwrap();
//! assert_eq!(doc.node(name).value(), Some(&TdValue::from("n2")));
//! ```

use crate::node::{Node, NodeCache};
use crate::options::{KEY_ID, KEY_REF};
use crate::path::{Part, TdPath};
use crate::{Bookmark, NodeId, NodeType, TdValue, WriteOptions};
use indexmap::IndexMap;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Child count past which a map node builds a key lookup index.
const KEY_INDEX_THRESHOLD: usize = 64;

/// A document tree: node arena, root handle and `$id` index.
#[derive(Clone, Debug)]
pub struct TreeDoc {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    id_map: IndexMap<String, NodeId>,
    uri: Option<String>,
}

impl Default for TreeDoc {
    fn default() -> Self {
        TreeDoc::new()
    }
}

impl TreeDoc {
    /// Creates a document holding a single empty root node keyed `root`.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = TreeDoc {
            nodes: Vec::new(),
            root: None,
            id_map: IndexMap::new(),
            uri: None,
        };
        let root = doc.alloc(Node::new(Some("root".to_string())));
        doc.root = Some(root);
        doc
    }

    /// Creates a document tagged with a source uri.
    #[must_use]
    pub fn with_uri(uri: impl Into<String>) -> Self {
        let mut doc = TreeDoc::new();
        doc.uri = Some(uri.into());
        doc
    }

    /// The root node handle.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root.expect("document always has a root")
    }

    /// The source uri, if one was recorded.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Borrows a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different document (a logic error).
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn assert_mutable(&self, id: NodeId) {
        assert!(
            !self.node(id).frozen,
            "attempted to mutate a frozen node; freeze() is terminal"
        );
    }

    /// The `$id` index.
    #[must_use]
    pub fn id_map(&self) -> &IndexMap<String, NodeId> {
        &self.id_map
    }

    /// Registers a node under an `$id` value.
    pub fn register_id(&mut self, key: impl Into<String>, id: NodeId) {
        self.id_map.insert(key.into(), id);
    }

    /// Looks a node up by `$id` value.
    #[must_use]
    pub fn node_by_id(&self, key: &str) -> Option<NodeId> {
        self.id_map.get(key).copied()
    }

    // ---- mutation ----------------------------------------------------

    /// Appends a child node, without duplicate-key handling.
    ///
    /// # Panics
    ///
    /// Panics if the parent is frozen.
    pub fn add_child(&mut self, parent: NodeId, key: Option<&str>) -> NodeId {
        self.assert_mutable(parent);
        let child = self.alloc(Node::new(key.map(str::to_string)));
        self.node_mut(child).parent = Some(parent);
        let idx = self.node(parent).children.len();
        self.node_mut(parent).children.push(child);

        if self.node(parent).key_index.is_some() {
            if let Some(k) = key {
                let k = k.to_string();
                if let Some(index) = self.node_mut(parent).key_index.as_mut() {
                    index.insert(k, idx);
                }
            }
        } else if self.node(parent).children.len() > KEY_INDEX_THRESHOLD {
            let children = self.node(parent).children.clone();
            let map: HashMap<String, usize> = children
                .iter()
                .enumerate()
                .filter_map(|(i, &c)| self.node(c).key.clone().map(|k| (k, i)))
                .collect();
            self.node_mut(parent).key_index = Some(map);
        }
        self.touch(parent);
        child
    }

    /// Creates a child under `parent`, deduplicating repeated keys.
    ///
    /// If a child with the same key already exists and is not yet deduped, it
    /// is replaced by a synthetic Array-typed wrapper carrying the key (and
    /// the original's source positions); the original becomes element 0 and
    /// loses its own key, the new child becomes the next element. Repeated
    /// occurrences are addressed positionally from then on.
    ///
    /// # Panics
    ///
    /// Panics if the parent is frozen.
    pub fn create_child(&mut self, parent: NodeId, key: Option<&str>) -> NodeId {
        let key = match key {
            None => return self.add_child(parent, None),
            Some(k) => k,
        };
        let idx = match self.index_of(parent, key) {
            None => return self.add_child(parent, Some(key)),
            Some(idx) => idx,
        };
        self.assert_mutable(parent);

        let existing = self.node(parent).children[idx];
        let wrapper = if self.node(existing).deduped {
            existing
        } else {
            let w = self.alloc(Node::new(Some(key.to_string())));
            {
                let wn = self.node_mut(w);
                wn.node_type = NodeType::Array;
                wn.deduped = true;
                wn.parent = Some(parent);
            }
            // Reuse the first occurrence's source positions.
            let (start, end) = {
                let en = self.node(existing);
                (en.start, en.end)
            };
            self.node_mut(w).start = start;
            self.node_mut(w).end = end;
            self.node_mut(parent).children[idx] = w;
            // Re-key the first occurrence to its index position.
            {
                let en = self.node_mut(existing);
                en.parent = Some(w);
                en.key = None;
            }
            self.node_mut(w).children.push(existing);
            w
        };
        self.add_child(wrapper, None)
    }

    /// Sets the scalar value of a node.
    ///
    /// # Panics
    ///
    /// Panics if the node is frozen.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<TdValue>) {
        self.assert_mutable(id);
        self.node_mut(id).value = Some(value.into());
        self.touch(id);
    }

    /// Sets the node type.
    ///
    /// # Panics
    ///
    /// Panics if the node is frozen.
    pub fn set_type(&mut self, id: NodeId, node_type: NodeType) {
        self.assert_mutable(id);
        self.node_mut(id).node_type = node_type;
        self.touch(id);
    }

    pub(crate) fn set_start(&mut self, id: NodeId, bookmark: Bookmark) {
        self.node_mut(id).start = Some(bookmark);
    }

    pub(crate) fn set_end(&mut self, id: NodeId, bookmark: Bookmark) {
        self.node_mut(id).end = Some(bookmark);
    }

    /// Clears memoized derived state on this node and every ancestor.
    ///
    /// Called by every mutator: a cache is only valid while no mutation has
    /// happened anywhere in the subtree it describes.
    pub fn touch(&mut self, id: NodeId) {
        let mut cur = Some(id);
        while let Some(c) = cur {
            let node = self.node_mut(c);
            *node.cache.borrow_mut() = NodeCache::default();
            cur = node.parent;
        }
    }

    /// Recursively marks a subtree immutable. Terminal: there is no thaw.
    pub fn freeze(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let node = self.node_mut(n);
            node.frozen = true;
            stack.extend_from_slice(&node.children);
        }
    }

    // ---- lookup ------------------------------------------------------

    fn index_of(&self, parent: NodeId, key: &str) -> Option<usize> {
        let pn = self.node(parent);
        if let Some(index) = pn.key_index.as_ref() {
            return index.get(key).copied();
        }
        pn.children
            .iter()
            .position(|&c| self.node(c).key.as_deref() == Some(key))
    }

    /// Finds a direct child by literal key.
    #[must_use]
    pub fn get_child(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.index_of(parent, key)
            .map(|i| self.node(parent).children[i])
    }

    /// Finds a direct child by position.
    #[must_use]
    pub fn child_by_index(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.node(parent).children.get(index).copied()
    }

    /// The scalar value of a direct child, if present.
    #[must_use]
    pub fn child_value(&self, parent: NodeId, key: &str) -> Option<&TdValue> {
        self.get_child(parent, key)
            .and_then(|c| self.node(c).value())
    }

    fn child_by_segment(&self, parent: NodeId, segment: &str) -> Option<NodeId> {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(i) = segment.parse::<usize>() {
                if let Some(c) = self.child_by_index(parent, i) {
                    return Some(c);
                }
            }
        }
        self.get_child(parent, segment)
    }

    /// Resolves a path from `from`, part by part.
    ///
    /// On a failed part: returns `None`, or the deepest node reached when
    /// `allow_partial` is set.
    #[must_use]
    pub fn get_by_path(&self, from: NodeId, path: &TdPath, allow_partial: bool) -> Option<NodeId> {
        let mut cur = from;
        for part in &path.parts {
            let next = match part {
                Part::Root => Some(self.root()),
                Part::Relative(level) => {
                    let mut n = Some(cur);
                    for _ in 0..*level {
                        n = n.and_then(|id| self.node(id).parent());
                    }
                    n
                }
                Part::Child(key) => self.child_by_segment(cur, key),
                Part::ChildOrId { key, id } => self
                    .child_by_segment(cur, key)
                    .or_else(|| self.node_by_id(id)),
            };
            match next {
                Some(n) => cur = n,
                None => return allow_partial.then_some(cur),
            }
        }
        Some(cur)
    }

    /// Resolves a simple slash path (see [`TdPath::parse`]) from `from`.
    #[must_use]
    pub fn get_by_path_str(&self, from: NodeId, path: &str) -> Option<NodeId> {
        self.get_by_path(from, &TdPath::parse(path), false)
    }

    /// The scalar value at a simple slash path.
    #[must_use]
    pub fn value_by_path(&self, from: NodeId, path: &str) -> Option<&TdValue> {
        self.get_by_path_str(from, path)
            .and_then(|n| self.node(n).value())
    }

    /// Resolves a JSON-pointer expression (see [`TdPath::parse_pointer`]).
    #[must_use]
    pub fn query(&self, from: NodeId, pointer: &str) -> Option<NodeId> {
        self.get_by_path(from, &TdPath::parse_pointer(pointer), false)
    }

    /// The node's path from the root, joined with `/`.
    ///
    /// Keyless (array-positioned) nodes contribute their index. The root
    /// contributes nothing, so the root's own path is the empty string.
    #[must_use]
    pub fn path_string(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent() {
            let segment = match self.node(cur).key() {
                Some(k) => k.to_string(),
                None => self
                    .node(parent)
                    .children
                    .iter()
                    .position(|&c| c == cur)
                    .unwrap_or(0)
                    .to_string(),
            };
            segments.push(segment);
            cur = parent;
        }
        segments.reverse();
        segments.join("/")
    }

    // ---- memoized derived state --------------------------------------

    /// The memoized compact textual form of a node.
    ///
    /// Recomputed after any mutation in the subtree ([`TreeDoc::touch`]
    /// clears it on the way up).
    #[must_use]
    pub fn text(&self, id: NodeId) -> Rc<str> {
        if let Some(text) = self.node(id).cache.borrow().text.clone() {
            return text;
        }
        let text: Rc<str> = crate::writer::write_node(self, id, &WriteOptions::default()).into();
        self.node(id).cache.borrow_mut().text = Some(text.clone());
        text
    }

    /// A memoized hash of the node's textual form.
    #[must_use]
    pub fn hash(&self, id: NodeId) -> u64 {
        if let Some(hash) = self.node(id).cache.borrow().hash {
            return hash;
        }
        let mut hasher = DefaultHasher::new();
        self.text(id).hash(&mut hasher);
        let hash = hasher.finish();
        self.node(id).cache.borrow_mut().hash = Some(hash);
        hash
    }

    // ---- re-rooting --------------------------------------------------

    /// Merges independently parsed documents into one Array-rooted document.
    ///
    /// Every `$id` and id-anchored `$ref` value from source `i` is suffixed
    /// with `_i` so references stay unambiguous across the merged sources.
    #[must_use]
    pub fn merge(docs: &[TreeDoc]) -> TreeDoc {
        let mut doc = TreeDoc::new();
        let root = doc.root();
        doc.set_type(root, NodeType::Array);
        for (i, src) in docs.iter().enumerate() {
            let suffix = format!("_{i}");
            let child = doc.add_child(root, None);
            doc.copy_subtree_from(src, src.root(), child, Some(&suffix));
        }
        doc
    }

    /// Creates a new document rooted at a copy of `id`'s subtree in `src`.
    #[must_use]
    pub fn of_node(src: &TreeDoc, id: NodeId) -> TreeDoc {
        let mut doc = TreeDoc::new();
        let root = doc.root();
        doc.copy_subtree_from(src, id, root, None);
        doc
    }

    /// Consumes this document, keeping only the subtree at `id` as the new
    /// root (re-keyed to `root`).
    #[must_use]
    pub fn retain(self, id: NodeId) -> TreeDoc {
        TreeDoc::of_node(&self, id)
    }

    fn copy_subtree_from(
        &mut self,
        src: &TreeDoc,
        src_id: NodeId,
        dst_id: NodeId,
        id_suffix: Option<&str>,
    ) {
        let sn = src.node(src_id);
        {
            let dn = self.node_mut(dst_id);
            dn.node_type = sn.node_type;
            dn.value = sn.value.clone();
            dn.start = sn.start;
            dn.end = sn.end;
            dn.deduped = sn.deduped;
        }
        for &sc in sn.children() {
            let scn = src.node(sc);
            let dc = self.add_child(dst_id, scn.key());
            self.copy_subtree_from(src, sc, dc, id_suffix);

            if scn.is_leaf() {
                match scn.key() {
                    Some(KEY_ID) => {
                        let mut id_value = scn
                            .value()
                            .map(|v| v.to_string())
                            .unwrap_or_default();
                        if let Some(suffix) = id_suffix {
                            id_value.push_str(suffix);
                            self.set_value(dc, TdValue::Str(id_value.clone()));
                        }
                        self.register_id(id_value, dst_id);
                    }
                    Some(KEY_REF) => {
                        // Only id-anchored refs are suffixed; relative and
                        // root-anchored paths resolve within their own copy.
                        if let Some(suffix) = id_suffix {
                            let old = scn.value().map(|v| v.to_string()).unwrap_or_default();
                            if old.starts_with('#') {
                                self.set_value(dc, TdValue::Str(format!("{old}{suffix}")));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        self.touch(dst_id);
    }
}
