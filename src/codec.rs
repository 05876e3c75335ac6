//! Object-graph codec: between [`ObjValue`] graphs and document trees.
//!
//! Encoding walks an in-memory object graph and handles aliasing the way the
//! textual form expects:
//!
//! - a reference back to an *active ancestor* (a true cycle) becomes a
//!   relative `$ref` of the form `../../`;
//! - a reference to an object already encoded elsewhere (shared, acyclic)
//!   lazily assigns the target a numeric `$id` and emits `{$ref:"#id"}`.
//!
//! Decoding ([`materialize`]) resolves both forms back, preserving identity:
//! the same source object comes back as the same [`Rc`], so cycles survive a
//! full text round trip. [`NodeView`] offers the lazy alternative when only
//! part of a large tree will be read.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::{encode, materialize, write, ObjMap, ObjValue};
//!
//! let mut map = ObjMap::new();
//! map.insert("a", 1i64);
//! let value = ObjValue::from(map);
//!
//! let doc = encode(&value);
//! assert_eq!(write(&doc), r#"{"a":1}"#);
//!
//! let back = materialize(&doc, doc.root(), false).unwrap();
//! assert_eq!(back.get("a").and_then(|v| v.as_i64()), Some(1));
//! ```

use crate::options::{KEY_ID, KEY_REF, KEY_TYPE};
use crate::path::TdPath;
use crate::{Error, Node, NodeId, NodeType, Result, TdValue, TreeDoc};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// An associative value with an optional type tag.
///
/// Entries keep insertion order so encode output is deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjMap {
    /// Recorded from a `$type` child on decode; emitted back when
    /// [`EncodeOptions::show_type`] is set.
    pub type_name: Option<String>,
    entries: IndexMap<String, ObjValue>,
}

impl ObjMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type(type_name: impl Into<String>) -> Self {
        ObjMap {
            type_name: Some(type_name.into()),
            entries: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ObjValue>) {
        self.entries.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ObjValue> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ObjValue)> {
        self.entries.iter()
    }
}

/// An in-memory object-graph value.
///
/// Containers are `Rc`-shared so one value can appear in several places,
/// including inside itself; the codec preserves that aliasing across a text
/// round trip.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Rc<RefCell<Vec<ObjValue>>>),
    Map(Rc<RefCell<ObjMap>>),
}

impl ObjValue {
    /// A fresh empty map value.
    #[must_use]
    pub fn new_map() -> ObjValue {
        ObjValue::Map(Rc::new(RefCell::new(ObjMap::new())))
    }

    /// A fresh empty array value.
    #[must_use]
    pub fn new_array() -> ObjValue {
        ObjValue::Array(Rc::new(RefCell::new(Vec::new())))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ObjValue::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ObjValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ObjValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ObjValue::Int(i) => Some(*i as f64),
            ObjValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ObjValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Map entry lookup; clones the entry out of the shared map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ObjValue> {
        match self {
            ObjValue::Map(m) => m.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Array element lookup; clones the element out of the shared array.
    #[must_use]
    pub fn index(&self, i: usize) -> Option<ObjValue> {
        match self {
            ObjValue::Array(a) => a.borrow().get(i).cloned(),
            _ => None,
        }
    }

    /// `true` if both sides are the *same* shared container, not merely
    /// equal ones.
    #[must_use]
    pub fn ptr_eq(&self, other: &ObjValue) -> bool {
        match (self, other) {
            (ObjValue::Array(a), ObjValue::Array(b)) => Rc::ptr_eq(a, b),
            (ObjValue::Map(a), ObjValue::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Container address, used as the aliasing key during encode.
    fn addr(&self) -> Option<usize> {
        match self {
            ObjValue::Array(a) => Some(Rc::as_ptr(a) as *const () as usize),
            ObjValue::Map(m) => Some(Rc::as_ptr(m) as *const () as usize),
            _ => None,
        }
    }
}

impl From<bool> for ObjValue {
    fn from(v: bool) -> Self {
        ObjValue::Bool(v)
    }
}

impl From<i64> for ObjValue {
    fn from(v: i64) -> Self {
        ObjValue::Int(v)
    }
}

impl From<i32> for ObjValue {
    fn from(v: i32) -> Self {
        ObjValue::Int(v as i64)
    }
}

impl From<f64> for ObjValue {
    fn from(v: f64) -> Self {
        ObjValue::Float(v)
    }
}

impl From<&str> for ObjValue {
    fn from(v: &str) -> Self {
        ObjValue::Str(v.to_string())
    }
}

impl From<String> for ObjValue {
    fn from(v: String) -> Self {
        ObjValue::Str(v)
    }
}

impl From<ObjMap> for ObjValue {
    fn from(v: ObjMap) -> Self {
        ObjValue::Map(Rc::new(RefCell::new(v)))
    }
}

impl From<Vec<ObjValue>> for ObjValue {
    fn from(v: Vec<ObjValue>) -> Self {
        ObjValue::Array(Rc::new(RefCell::new(v)))
    }
}

impl From<&TdValue> for ObjValue {
    fn from(v: &TdValue) -> Self {
        match v {
            TdValue::Null => ObjValue::Null,
            TdValue::Bool(b) => ObjValue::Bool(*b),
            TdValue::Int(i) => ObjValue::Int(*i),
            TdValue::Float(f) => ObjValue::Float(*f),
            TdValue::Str(s) => ObjValue::Str(s.clone()),
        }
    }
}

/// Hook for application-specific encodings (dates, wrappers, handles).
///
/// Returns `true` when it fully encoded the value into `target`; the
/// structural encoder then skips that value.
pub trait CustomCoder {
    fn encode(&self, value: &ObjValue, doc: &mut TreeDoc, target: NodeId) -> bool;
}

/// Options for [`encode_with_options`].
#[derive(Clone, Default)]
pub struct EncodeOptions {
    /// Emit a `$type` child for maps carrying a type name.
    pub show_type: bool,
    /// Custom coders, consulted in order before structural encoding.
    pub coders: Vec<Rc<dyn CustomCoder>>,
}

impl EncodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_show_type(mut self, show_type: bool) -> Self {
        self.show_type = show_type;
        self
    }

    #[must_use]
    pub fn with_coder(mut self, coder: Rc<dyn CustomCoder>) -> Self {
        self.coders.push(coder);
        self
    }
}

impl fmt::Debug for EncodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("show_type", &self.show_type)
            .field("coders", &self.coders.len())
            .finish()
    }
}

#[derive(Default)]
struct EncodeContext {
    next_id: i64,
    /// container address -> node already holding its encoding
    obj_node_map: HashMap<usize, NodeId>,
    /// addresses of containers currently being encoded, root first
    path: Vec<usize>,
}

/// Encodes an object graph into a new document.
#[must_use]
pub fn encode(value: &ObjValue) -> TreeDoc {
    encode_with_options(value, &EncodeOptions::default())
}

/// Encodes an object graph with explicit options.
#[must_use]
pub fn encode_with_options(value: &ObjValue, opt: &EncodeOptions) -> TreeDoc {
    let mut doc = TreeDoc::new();
    let root = doc.root();
    let mut ctx = EncodeContext {
        next_id: 1,
        ..EncodeContext::default()
    };
    encode_node(value, opt, &mut doc, root, &mut ctx);
    doc
}

fn encode_node(
    value: &ObjValue,
    opt: &EncodeOptions,
    doc: &mut TreeDoc,
    target: NodeId,
    ctx: &mut EncodeContext,
) {
    match value {
        ObjValue::Null => {}
        ObjValue::Bool(b) => doc.set_value(target, *b),
        ObjValue::Int(i) => doc.set_value(target, *i),
        ObjValue::Float(f) => doc.set_value(target, *f),
        ObjValue::Str(s) => doc.set_value(target, s.as_str()),
        ObjValue::Array(_) | ObjValue::Map(_) => {
            for coder in &opt.coders {
                if coder.encode(value, doc, target) {
                    return;
                }
            }
            encode_container(value, opt, doc, target, ctx);
        }
    }
}

fn encode_container(
    value: &ObjValue,
    opt: &EncodeOptions,
    doc: &mut TreeDoc,
    target: NodeId,
    ctx: &mut EncodeContext,
) {
    let addr = match value.addr() {
        Some(a) => a,
        None => return,
    };

    // A reference to an active ancestor is a true cycle: point back up.
    if let Some(pos) = ctx.path.iter().position(|&p| p == addr) {
        let levels = ctx.path.len() - pos;
        set_ref(doc, target, &"../".repeat(levels));
        return;
    }

    // Already encoded elsewhere: give the earlier node an id on demand and
    // reference it.
    if let Some(&exist) = ctx.obj_node_map.get(&addr) {
        let id = match doc.child_value(exist, KEY_ID) {
            Some(v) => v.to_string(),
            None => {
                let id = ctx.next_id;
                ctx.next_id += 1;
                let child = doc.create_child(exist, Some(KEY_ID));
                doc.set_value(child, id);
                doc.register_id(id.to_string(), exist);
                id.to_string()
            }
        };
        set_ref(doc, target, &format!("#{id}"));
        return;
    }

    ctx.path.push(addr);
    ctx.obj_node_map.insert(addr, target);

    match value {
        ObjValue::Array(items) => {
            doc.set_type(target, NodeType::Array);
            for item in items.borrow().iter() {
                let child = doc.create_child(target, None);
                encode_node(item, opt, doc, child, ctx);
            }
        }
        ObjValue::Map(map) => {
            doc.set_type(target, NodeType::Map);
            let map = map.borrow();
            if opt.show_type {
                if let Some(type_name) = &map.type_name {
                    let child = doc.create_child(target, Some(KEY_TYPE));
                    doc.set_value(child, type_name.as_str());
                }
            }
            for (key, entry) in map.iter() {
                // absent and null entries are indistinguishable downstream
                if entry.is_null() {
                    continue;
                }
                let child = doc.create_child(target, Some(key));
                encode_node(entry, opt, doc, child, ctx);
            }
        }
        _ => {}
    }

    ctx.path.pop();
}

fn set_ref(doc: &mut TreeDoc, target: NodeId, reference: &str) {
    doc.set_type(target, NodeType::Map);
    let child = doc.create_child(target, Some(KEY_REF));
    doc.set_value(child, reference);
}

/// A map holding nothing but a `$ref` string stands for its target.
fn ref_target(doc: &TreeDoc, id: NodeId) -> Option<&TdValue> {
    let node = doc.node(id);
    if node.node_type() != NodeType::Map || node.children_size() != 1 {
        return None;
    }
    doc.child_value(id, KEY_REF)
        .filter(|v| matches!(v, TdValue::Str(_)))
}

fn resolve_ref(doc: &TreeDoc, id: NodeId, reference: &str) -> Option<NodeId> {
    let path = TdPath::parse_pointer(reference);
    doc.get_by_path(id, &path, false)
}

/// Materializes the subtree at `id` into an object graph.
///
/// Reference maps (`{$ref:"..."}`) are replaced by their target's
/// materialization; nodes reached through several paths come back as the
/// same shared container, so cycles materialize as cyclic graphs.
///
/// # Errors
///
/// An unresolvable `$ref` is an [`Error::ReferenceNotFound`] in `strict`
/// mode; otherwise it is logged and the reference map is kept literally.
pub fn materialize(doc: &TreeDoc, id: NodeId, strict: bool) -> Result<ObjValue> {
    let mut cache = HashMap::new();
    materialize_node(doc, id, strict, &mut cache)
}

fn materialize_node(
    doc: &TreeDoc,
    id: NodeId,
    strict: bool,
    cache: &mut HashMap<NodeId, ObjValue>,
) -> Result<ObjValue> {
    if let Some(cached) = cache.get(&id) {
        return Ok(cached.clone());
    }
    let node = doc.node(id);
    match node.node_type() {
        NodeType::Simple => Ok(node.value().map(ObjValue::from).unwrap_or(ObjValue::Null)),
        NodeType::Array => {
            let items = Rc::new(RefCell::new(Vec::with_capacity(node.children_size())));
            // cache before filling so cyclic paths find the container
            cache.insert(id, ObjValue::Array(items.clone()));
            for &child in node.children() {
                let value = materialize_node(doc, child, strict, cache)?;
                items.borrow_mut().push(value);
            }
            Ok(ObjValue::Array(items))
        }
        NodeType::Map => {
            if let Some(TdValue::Str(reference)) = ref_target(doc, id) {
                match resolve_ref(doc, id, reference) {
                    Some(target) => return materialize_node(doc, target, strict, cache),
                    None => {
                        if strict {
                            return Err(Error::reference_not_found(reference.clone()));
                        }
                        log::warn!("unresolved $ref {reference:?}, keeping the literal map");
                    }
                }
            }
            let map = Rc::new(RefCell::new(ObjMap::new()));
            cache.insert(id, ObjValue::Map(map.clone()));
            for &child in node.children() {
                let key = match doc.node(child).key() {
                    Some(k) => k.to_string(),
                    None => continue,
                };
                if key == KEY_TYPE {
                    if let Some(TdValue::Str(t)) = doc.node(child).value() {
                        map.borrow_mut().type_name = Some(t.clone());
                        continue;
                    }
                }
                let value = materialize_node(doc, child, strict, cache)?;
                map.borrow_mut().entries.insert(key, value);
            }
            Ok(ObjValue::Map(map))
        }
    }
}

/// A lazy, reference-resolving view over one node.
///
/// Child access returns either a scalar or a further view without
/// materializing anything else, so reading one field of a large document
/// costs one path walk.
#[derive(Clone, Copy, Debug)]
pub struct NodeView<'a> {
    doc: &'a TreeDoc,
    id: NodeId,
}

/// What a view hands back for one child.
#[derive(Clone, Copy, Debug)]
pub enum ViewValue<'a> {
    Scalar(&'a TdValue),
    View(NodeView<'a>),
}

impl<'a> ViewValue<'a> {
    #[must_use]
    pub fn as_scalar(&self) -> Option<&'a TdValue> {
        match self {
            ViewValue::Scalar(v) => Some(v),
            ViewValue::View(_) => None,
        }
    }

    #[must_use]
    pub fn as_view(&self) -> Option<NodeView<'a>> {
        match self {
            ViewValue::View(v) => Some(*v),
            ViewValue::Scalar(_) => None,
        }
    }
}

impl<'a> NodeView<'a> {
    /// A view over the document root.
    #[must_use]
    pub fn of(doc: &'a TreeDoc) -> Self {
        NodeView { doc, id: doc.root() }
    }

    /// A view over an arbitrary node.
    #[must_use]
    pub fn of_node(doc: &'a TreeDoc, id: NodeId) -> Self {
        NodeView { doc, id }
    }

    #[must_use]
    pub fn node(&self) -> &'a Node {
        self.doc.node(self.id)
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Child count of the viewed node (after reference resolution).
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolve().node().children_size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map child access, resolving `$ref` on both this node and the child.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ViewValue<'a>> {
        let base = self.resolve();
        let child = base.doc.get_child(base.id, key)?;
        Some(base.wrap(child))
    }

    /// Array element access, resolving `$ref` on both sides.
    #[must_use]
    pub fn index(&self, i: usize) -> Option<ViewValue<'a>> {
        let base = self.resolve();
        let child = base.doc.child_by_index(base.id, i)?;
        Some(base.wrap(child))
    }

    /// Eagerly converts the viewed subtree.
    ///
    /// # Errors
    ///
    /// See [`materialize`].
    pub fn materialize(&self, strict: bool) -> Result<ObjValue> {
        materialize(self.doc, self.id, strict)
    }

    /// Follows `$ref` chains until a non-reference node is reached.
    fn resolve(&self) -> NodeView<'a> {
        let mut cur = *self;
        // depth-bounded in case of a reference loop
        for _ in 0..32 {
            let reference = match ref_target(cur.doc, cur.id) {
                Some(TdValue::Str(r)) => r,
                _ => return cur,
            };
            match resolve_ref(cur.doc, cur.id, reference) {
                Some(target) => cur = NodeView::of_node(cur.doc, target),
                None => {
                    log::warn!("unresolved $ref {reference:?} in lazy view");
                    return cur;
                }
            }
        }
        cur
    }

    fn wrap(&self, child: NodeId) -> ViewValue<'a> {
        let view = NodeView::of_node(self.doc, child).resolve();
        if view.node().is_leaf() {
            ViewValue::Scalar(view.node().value().unwrap_or(&TdValue::Null))
        } else {
            ViewValue::View(view)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, write};

    fn shared_graph() -> ObjValue {
        let mut shared = ObjMap::new();
        shared.insert("title", "common");
        let shared = ObjValue::from(shared);
        let mut root = ObjMap::new();
        root.insert("a", shared.clone());
        root.insert("b", shared);
        ObjValue::from(root)
    }

    #[test]
    fn test_encode_scalars() {
        let doc = encode(&ObjValue::from(true));
        assert_eq!(doc.node(doc.root()).value(), Some(&TdValue::Bool(true)));

        let doc = encode(&ObjValue::Null);
        assert_eq!(doc.node(doc.root()).value(), None);
    }

    #[test]
    fn test_encode_shared_reference_uses_lazy_id() {
        let doc = encode(&shared_graph());
        assert_eq!(
            write(&doc),
            r##"{"a":{"title":"common","$id":1},"b":{"$ref":"#1"}}"##
        );
        assert!(doc.node_by_id("1").is_some());
    }

    #[test]
    fn test_encode_cycle_emits_relative_ref() {
        let root = ObjValue::new_map();
        if let ObjValue::Map(m) = &root {
            let mut inner = ObjMap::new();
            inner.insert("cyclic", root.clone());
            m.borrow_mut().insert("obj", inner);
        }
        let doc = encode(&root);
        assert_eq!(write(&doc), r#"{"obj":{"cyclic":{"$ref":"../../"}}}"#);
    }

    #[test]
    fn test_round_trip_preserves_shared_identity() {
        let doc = encode(&shared_graph());
        let reparsed = parse(&write(&doc)).unwrap();
        let back = materialize(&reparsed, reparsed.root(), false).unwrap();
        let a = back.get("a").unwrap();
        let b = back.get("b").unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.get("title").unwrap().as_str(), Some("common"));
    }

    #[test]
    fn test_round_trip_preserves_cycle_identity() {
        let root = ObjValue::new_map();
        if let ObjValue::Map(m) = &root {
            m.borrow_mut().insert("name", "o");
            m.borrow_mut().insert("self", root.clone());
        }
        let doc = encode(&root);
        let reparsed = parse(&write(&doc)).unwrap();
        let back = materialize(&reparsed, reparsed.root(), false).unwrap();
        assert!(back.get("self").unwrap().ptr_eq(&back));
    }

    #[test]
    fn test_null_map_entries_skipped_but_array_nulls_kept() {
        let mut map = ObjMap::new();
        map.insert("gone", ObjValue::Null);
        map.insert("list", vec![ObjValue::Int(1), ObjValue::Null]);
        let doc = encode(&ObjValue::from(map));
        assert_eq!(write(&doc), r#"{"list":[1,null]}"#);
    }

    #[test]
    fn test_show_type() {
        let mut map = ObjMap::with_type("Point");
        map.insert("x", 1i64);
        let value = ObjValue::from(map);
        let doc = encode_with_options(&value, &EncodeOptions::new().with_show_type(true));
        assert_eq!(write(&doc), r#"{"$type":"Point","x":1}"#);

        let back = materialize(&doc, doc.root(), false).unwrap();
        match &back {
            ObjValue::Map(m) => assert_eq!(m.borrow().type_name.as_deref(), Some("Point")),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_ref_strict_vs_lenient() {
        let doc = parse(r##"{a: {$ref: "#missing"}}"##).unwrap();
        assert!(matches!(
            materialize(&doc, doc.root(), true),
            Err(Error::ReferenceNotFound { .. })
        ));
        let lenient = materialize(&doc, doc.root(), false).unwrap();
        let literal = lenient.get("a").unwrap();
        assert_eq!(literal.get("$ref").unwrap().as_str(), Some("#missing"));
    }

    #[test]
    fn test_lazy_view_resolves_refs() {
        let text = r##"{data: {$id: "d", v: 42}, alias: {$ref: "#d"}}"##;
        let doc = parse(text).unwrap();
        let view = NodeView::of(&doc);
        let alias = view.get("alias").unwrap().as_view().unwrap();
        assert_eq!(
            alias.get("v").unwrap().as_scalar(),
            Some(&TdValue::Int(42))
        );
    }

    #[test]
    fn test_custom_coder_takes_precedence() {
        struct Stamp;
        impl CustomCoder for Stamp {
            fn encode(&self, value: &ObjValue, doc: &mut TreeDoc, target: NodeId) -> bool {
                if value.get("stamp").is_some() {
                    doc.set_value(target, "stamped");
                    return true;
                }
                false
            }
        }
        let mut inner = ObjMap::new();
        inner.insert("stamp", true);
        let mut root = ObjMap::new();
        root.insert("s", inner);
        let doc = encode_with_options(
            &ObjValue::from(root),
            &EncodeOptions::new().with_coder(Rc::new(Stamp)),
        );
        assert_eq!(write(&doc), r#"{"s":"stamped"}"#);
    }
}
