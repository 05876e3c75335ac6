//! # treedoc
//!
//! A configurable-grammar document engine: one tree model that parses JSON,
//! JSON5 and textproto-like dialects, serializes back under independently
//! configured delimiters, and round-trips arbitrary object graphs — cycles
//! included — through an `$id`/`$ref` addressing scheme.
//!
//! ## Why another parser?
//!
//! Most parsers hard-code one grammar and hand you either events or an
//! anonymous value. This crate instead parses a *family* of grammars into a
//! single [`TreeDoc`]: every delimiter lives in a [`GrammarConfig`], every
//! node keeps its source position, duplicate keys are handled safely, and
//! shared or cyclic object references survive a full text round trip.
//!
//! ## Key Features
//!
//! - **Configurable grammar**: key/value delimiters, brackets and quote
//!   candidates are options, not constants — the same parser reads strict
//!   JSON, JSON5 and textproto-style input
//! - **Position tracking**: every node records start/end [`Bookmark`]s and
//!   every error points at the offending spot with a source digest
//! - **Duplicate-key safety**: repeated map keys collapse into a deduped
//!   array instead of silently overwriting
//! - **Path addressing**: absolute, relative and by-id lookup via a
//!   JSON-pointer-compatible path language
//! - **Graph round trips**: `encode`/`materialize` preserve shared
//!   references and cycles through `$id`/`$ref`
//!
//! ## Quick Start
//!
//! ```rust
//! use treedoc::{parse, write, TdValue};
//!
//! // JSON5-ish input: comments, unquoted keys, trailing comma
//! let doc = parse("{name: 'ann', /* age */ age: 42,}").unwrap();
//! assert_eq!(
//!     doc.value_by_path(doc.root(), "name"),
//!     Some(&TdValue::from("ann"))
//! );
//!
//! // writes back as strict JSON by default
//! assert_eq!(write(&doc), r#"{"name":"ann","age":42}"#);
//! ```
//!
//! ### Cyclic object graphs
//!
//! ```rust
//! use treedoc::{encode, materialize, parse, write, ObjValue};
//!
//! let graph = ObjValue::new_map();
//! if let ObjValue::Map(m) = &graph {
//!     m.borrow_mut().insert("self", graph.clone());
//! }
//!
//! let text = write(&encode(&graph));
//! assert_eq!(text, r#"{"self":{"$ref":"../"}}"#);
//!
//! let doc = parse(&text).unwrap();
//! let back = materialize(&doc, doc.root(), false).unwrap();
//! assert!(back.get("self").unwrap().ptr_eq(&back)); // identity, not a copy
//! ```
//!
//! ### Paths
//!
//! ```rust
//! use treedoc::{parse, TdValue};
//!
//! let doc = parse("{users: [{name: bob}, {name: eve}]}").unwrap();
//! assert_eq!(
//!     doc.value_by_path(doc.root(), "users/1/name"),
//!     Some(&TdValue::from("eve"))
//! );
//! ```
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - All array indexing is bounds-checked
//! - Proper error propagation with `Result` types
//! - No panics in public API (except for logic errors that indicate bugs,
//!   such as mutating a frozen node or using a foreign [`NodeId`])

pub mod bookmark;
pub mod codec;
pub mod doc;
pub mod error;
pub mod filter;
pub mod node;
pub mod options;
pub mod parser;
pub mod path;
pub mod scanner;
pub mod writer;

pub use bookmark::Bookmark;
pub use codec::{
    encode, encode_with_options, materialize, CustomCoder, EncodeOptions, NodeView, ObjMap,
    ObjValue, ViewValue,
};
pub use doc::TreeDoc;
pub use error::{Error, Result};
pub use filter::{Decorator, Filtered, NodeFilter, TextKind};
pub use node::{Node, NodeId, NodeType, TdValue};
pub use options::{GrammarConfig, ParseOptions, WriteOptions, KEY_ID, KEY_REF, KEY_TYPE};
pub use path::{Part, TdPath};
pub use scanner::{CharSource, StringCharSource};

/// Parses one document with default options.
///
/// # Examples
///
/// ```rust
/// use treedoc::{parse, TdValue};
///
/// let doc = parse("{a: 1}").unwrap();
/// assert_eq!(doc.value_by_path(doc.root(), "a"), Some(&TdValue::Int(1)));
/// ```
///
/// # Errors
///
/// Returns a parse [`Error`] on malformed input (unterminated quotes,
/// unbalanced brackets, missing key delimiters, bad escapes).
pub fn parse(text: &str) -> Result<TreeDoc> {
    parse_with_options(text, &ParseOptions::default())
}

/// Parses one document with explicit options.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_with_options(text: &str, opt: &ParseOptions) -> Result<TreeDoc> {
    let mut src = StringCharSource::new(text);
    parser::parse_source(&mut src, opt)
}

/// Parses a stream of concatenated documents into one Array-rooted document.
///
/// # Examples
///
/// ```rust
/// use treedoc::parse_all;
///
/// let doc = parse_all("{a: 1} {b: 2}").unwrap();
/// assert_eq!(doc.node(doc.root()).children_size(), 2);
/// ```
///
/// # Errors
///
/// Fails on the first malformed sub-document.
pub fn parse_all(text: &str) -> Result<TreeDoc> {
    parse_all_with_options(text, &ParseOptions::default())
}

/// Parses a stream of concatenated documents with explicit options.
///
/// # Errors
///
/// Same as [`parse_all`].
pub fn parse_all_with_options(text: &str, opt: &ParseOptions) -> Result<TreeDoc> {
    let mut src = StringCharSource::new(text);
    parser::parse_all_source(&mut src, opt)
}

/// Serializes a whole document compactly with default options.
#[must_use]
pub fn write(doc: &TreeDoc) -> String {
    writer::write_node(doc, doc.root(), &WriteOptions::default())
}

/// Serializes a whole document with explicit options.
#[must_use]
pub fn write_with_options(doc: &TreeDoc, opt: &WriteOptions) -> String {
    writer::write_node(doc, doc.root(), opt)
}

/// Encodes an object graph and serializes it in one step.
///
/// # Examples
///
/// ```rust
/// use treedoc::{stringify, ObjMap, ObjValue};
///
/// let mut map = ObjMap::new();
/// map.insert("a", 1i64);
/// assert_eq!(stringify(&ObjValue::from(map)), r#"{"a":1}"#);
/// ```
#[must_use]
pub fn stringify(value: &ObjValue) -> String {
    write(&encode(value))
}

/// Parses text and materializes it into an object graph in one step.
///
/// References are resolved leniently; unresolved `$ref`s stay literal.
///
/// # Errors
///
/// Returns the underlying parse error on malformed input.
pub fn parse_to_value(text: &str) -> Result<ObjValue> {
    let doc = parse(text)?;
    materialize(&doc, doc.root(), false)
}
