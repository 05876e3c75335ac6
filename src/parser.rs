//! The grammar-driven parser.
//!
//! Recursive descent with one function per production, all parameterized by
//! the [`GrammarConfig`](crate::GrammarConfig) inside [`ParseOptions`]: the
//! same code reads strict JSON, JSON5 and textproto-like dialects depending
//! only on the configured delimiters. Accepted sugar beyond JSON:
//!
//! - comments: `# ...`, `// ...`, `/* ... */`
//! - unquoted keys and unquoted string values
//! - duplicate keys (collected into a deduped array, see
//!   [`TreeDoc::create_child`](crate::TreeDoc::create_child))
//! - path compression: `a:b:c` parses as `{a:{b:c}}`
//! - type wrappers: `Point{x:1}` parses as `{$type:Point,x:1}`
//! - adjacent quoted segments concatenated into one string
//! - `$id` anchors, registered in the document's id index
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::{parse, TdValue};
//!
//! let doc = parse("{a: 1, b: c, /* skip */ d: [2, 3]}").unwrap();
//! assert_eq!(doc.value_by_path(doc.root(), "b"), Some(&TdValue::from("c")));
//! assert_eq!(doc.value_by_path(doc.root(), "d/1"), Some(&TdValue::Int(3)));
//! ```

use crate::options::{KEY_ID, KEY_REF, KEY_TYPE};
use crate::scanner::CharSource;
use crate::{Error, NodeId, NodeType, ParseOptions, Result, TdValue, TreeDoc};

/// Per-parse state threaded through the productions.
struct Ctx<'a> {
    opt: &'a ParseOptions,
    /// Set by [`parse_all_source`]: appended to every `$id`/`$ref` value so
    /// ids stay unique across concatenated documents.
    id_suffix: Option<String>,
}

/// Parses one document from a scanner.
///
/// # Errors
///
/// Propagates the scanner and grammar errors described in [`Error`];
/// nothing is locally recovered.
pub fn parse_source<S: CharSource>(src: &mut S, opt: &ParseOptions) -> Result<TreeDoc> {
    let mut doc = new_doc(opt);
    let root = doc.root();
    let ctx = Ctx {
        opt,
        id_suffix: None,
    };
    parse_value(src, &ctx, &mut doc, root, true)?;
    Ok(doc)
}

/// Parses a stream of concatenated documents into one Array-rooted document,
/// one child per sub-document.
///
/// Sub-documents may be separated by whitespace, comments or value
/// delimiters. Each gets a sequential doc id; `$id` and `$ref` values are
/// suffixed with `_docId` so references cannot collide across sub-documents.
///
/// # Errors
///
/// Fails on the first malformed sub-document.
pub fn parse_all_source<S: CharSource>(src: &mut S, opt: &ParseOptions) -> Result<TreeDoc> {
    let mut doc = new_doc(opt);
    let root = doc.root();
    doc.set_type(root, NodeType::Array);

    let delim_len = opt.grammar.value_delim().chars().count();
    let mut doc_id = 0;
    loop {
        // separators between sub-documents
        while skip_space_and_comments(src).is_some() && src.starts_with(opt.grammar.value_delim())
        {
            src.skip(delim_len);
        }
        if src.is_eof(0) {
            break;
        }
        let ctx = Ctx {
            opt,
            id_suffix: Some(format!("_{doc_id}")),
        };
        let child = doc.add_child(root, None);
        parse_value(src, &ctx, &mut doc, child, false)?;
        doc_id += 1;
    }
    Ok(doc)
}

fn new_doc(opt: &ParseOptions) -> TreeDoc {
    match &opt.uri {
        Some(uri) => TreeDoc::with_uri(uri),
        None => TreeDoc::new(),
    }
}

/// Skips whitespace and `#`, `//`, `/* */` comments.
///
/// Returns the next significant character, peeked, or `None` at EOF.
pub(crate) fn skip_space_and_comments<S: CharSource>(src: &mut S) -> Option<char> {
    while src.skip_spaces() {
        let c = src.peek(0)?;
        if c == '#' {
            if src.skip_terminator("\n", true) {
                src.skip(1);
            }
            continue;
        }
        if c != '/' || src.is_eof(1) {
            return Some(c);
        }
        match src.peek(1) {
            Some('/') => {
                if src.skip_terminator("\n", true) {
                    src.skip(1);
                }
            }
            Some('*') => {
                src.skip(2);
                src.skip_until_match("*/", true);
            }
            _ => return Some(c),
        }
    }
    None
}

fn parse_value<S: CharSource>(
    src: &mut S,
    ctx: &Ctx,
    doc: &mut TreeDoc,
    node: NodeId,
    use_default_root: bool,
) -> Result<()> {
    let c = match skip_space_and_comments(src) {
        Some(c) => c,
        None => return Ok(()),
    };
    doc.set_start(node, src.bookmark());
    let result = parse_dispatch(src, ctx, doc, node, use_default_root, c);
    doc.set_end(node, src.bookmark());
    result
}

fn parse_dispatch<S: CharSource>(
    src: &mut S,
    ctx: &Ctx,
    doc: &mut TreeDoc,
    node: NodeId,
    use_default_root: bool,
    c: char,
) -> Result<()> {
    let g = &ctx.opt.grammar;
    if src.starts_with(g.obj_start()) {
        return parse_map(src, ctx, doc, node, true);
    }
    if src.starts_with(g.arr_start()) {
        return parse_array(src, ctx, doc, node, true);
    }
    if use_default_root {
        match ctx.opt.default_root_type {
            NodeType::Map => return parse_map(src, ctx, doc, node, false),
            NodeType::Array => return parse_array(src, ctx, doc, node, false),
            NodeType::Simple => {}
        }
    }

    if g.quote_chars().contains(c) {
        src.read()?;
        let mut text = String::new();
        src.read_quoted_into(c, &mut text)?;
        read_continuous_string(src, ctx, &mut text)?;
        doc.set_value(node, text);
        return Ok(());
    }

    // Bareword. The terminator set depends on the enclosing container so a
    // closing bracket ends the token only where one could legally appear.
    // Deduped wrappers are synthetic: the textual container is the nearest
    // non-deduped ancestor.
    let mut container = doc.node(node).parent();
    while let Some(p) = container {
        if !doc.node(p).is_deduped() {
            break;
        }
        container = doc.node(p).parent();
    }
    let term = match container.map(|p| doc.node(p).node_type()) {
        Some(NodeType::Array) => &g.term_value_in_array,
        Some(NodeType::Map) => &g.term_value_in_map,
        _ => &g.term_value,
    };
    let mut token = String::new();
    src.read_until(|s| term.is_term(s), Some(&mut token), 0, usize::MAX);
    let token = token.trim().to_string();

    if src.starts_with(g.key_delim()) {
        // Path compression: the token was really a key (`a:b:c`). Recurse
        // into a fresh child instead of re-entering parse_map.
        src.skip(g.key_delim().chars().count());
        doc.set_type(node, NodeType::Map);
        let child = doc.create_child(node, Some(&token));
        let child_key = token;
        parse_value(src, ctx, doc, child, false)?;
        register_reserved(doc, ctx, node, child, &child_key);
        return Ok(());
    }
    if !token.is_empty() && src.starts_with(g.obj_start()) {
        // Type wrapper: `Point{x:1}` becomes `{$type:Point,x:1}`.
        let type_child = doc.create_child(node, Some(KEY_TYPE));
        doc.set_value(type_child, token);
        return parse_map(src, ctx, doc, node, true);
    }

    doc.set_value(node, classify_token(&token));
    Ok(())
}

/// Concatenates directly adjacent quoted segments into `out`.
fn read_continuous_string<S: CharSource>(src: &mut S, ctx: &Ctx, out: &mut String) -> Result<()> {
    while let Some(c) = skip_space_and_comments(src) {
        if !ctx.opt.grammar.quote_chars().contains(c) {
            break;
        }
        src.read()?;
        src.read_quoted_into(c, out)?;
    }
    Ok(())
}

fn parse_map<S: CharSource>(
    src: &mut S,
    ctx: &Ctx,
    doc: &mut TreeDoc,
    node: NodeId,
    with_brackets: bool,
) -> Result<()> {
    let g = &ctx.opt.grammar;
    doc.set_type(node, NodeType::Map);
    let opened = src.bookmark();
    if with_brackets {
        src.skip(g.obj_start().chars().count());
    }

    let mut index = 0usize;
    loop {
        let c = match skip_space_and_comments(src) {
            Some(c) => c,
            None => {
                if with_brackets {
                    return Err(Error::unbalanced_brackets(g.obj_end(), opened, src.digest()));
                }
                break;
            }
        };
        if src.starts_with(g.obj_end()) {
            src.skip(g.obj_end().chars().count());
            break;
        }
        if src.starts_with(g.value_delim()) {
            src.skip(g.value_delim().chars().count());
            continue;
        }

        let key;
        if g.quote_chars().contains(c) {
            src.read()?;
            key = src.read_quoted(c)?;
            if skip_space_and_comments(src).is_none() {
                break;
            }
            // after a quoted key only a delimiter, bracket or separator may follow
            if !src.starts_with(g.key_delim())
                && !src.starts_with(g.obj_start())
                && !src.starts_with(g.arr_start())
                && !src.starts_with(g.value_delim())
                && !src.starts_with(g.obj_end())
            {
                return Err(Error::missing_key_delimiter(key, src.bookmark(), src.digest()));
            }
        } else {
            let mut raw = String::new();
            src.read_until(|s| g.term_key.is_term(s), Some(&mut raw), 1, usize::MAX);
            if src.is_eof(0) {
                return Err(Error::missing_key_delimiter(
                    raw.trim().to_string(),
                    src.bookmark(),
                    src.digest(),
                ));
            }
            key = raw.trim().to_string();
        }

        let has_delim = src.starts_with(g.key_delim());
        if has_delim {
            src.skip(g.key_delim().chars().count());
        }

        if !has_delim && (src.starts_with(g.value_delim()) || src.starts_with(g.obj_end())) {
            // No delimiter at all: treat the token as an indexed value, so
            // `{a, b}` reads like a shorthand enumeration.
            let child = doc.create_child(node, Some(&index.to_string()));
            doc.set_value(child, TdValue::Str(key));
        } else {
            let child = doc.create_child(node, Some(&key));
            parse_value(src, ctx, doc, child, false)?;
            register_reserved(doc, ctx, node, child, &key);
        }
        index += 1;
    }
    Ok(())
}

fn parse_array<S: CharSource>(
    src: &mut S,
    ctx: &Ctx,
    doc: &mut TreeDoc,
    node: NodeId,
    with_brackets: bool,
) -> Result<()> {
    let g = &ctx.opt.grammar;
    doc.set_type(node, NodeType::Array);
    let opened = src.bookmark();
    if with_brackets {
        src.skip(g.arr_start().chars().count());
    }

    loop {
        if skip_space_and_comments(src).is_none() {
            if with_brackets {
                return Err(Error::unbalanced_brackets(g.arr_end(), opened, src.digest()));
            }
            break;
        }
        if src.starts_with(g.arr_end()) {
            src.skip(g.arr_end().chars().count());
            break;
        }

        let child = doc.create_child(node, None);
        parse_value(src, ctx, doc, child, false)?;
        if skip_space_and_comments(src).is_some() && src.starts_with(g.value_delim()) {
            src.skip(g.value_delim().chars().count());
        }
    }
    Ok(())
}

/// Handles `$id` registration and streaming id suffixes for a freshly parsed
/// map child.
fn register_reserved(doc: &mut TreeDoc, ctx: &Ctx, map_node: NodeId, child: NodeId, key: &str) {
    if !doc.node(child).is_leaf() {
        return;
    }
    match key {
        KEY_ID => {
            let mut value = doc
                .node(child)
                .value()
                .map(|v| v.to_string())
                .unwrap_or_default();
            if let Some(suffix) = &ctx.id_suffix {
                value.push_str(suffix);
                doc.set_value(child, TdValue::Str(value.clone()));
            }
            doc.register_id(value, map_node);
        }
        KEY_REF => {
            // Only id-anchored refs are suffixed; relative and root-anchored
            // paths resolve within their own sub-document.
            if let Some(suffix) = &ctx.id_suffix {
                if let Some(old) = doc.node(child).value().map(|v| v.to_string()) {
                    if old.starts_with('#') {
                        doc.set_value(child, TdValue::Str(format!("{old}{suffix}")));
                    }
                }
            }
        }
        _ => {}
    }
}

/// Classifies a bareword token into a scalar value.
///
/// `null`/`true`/`false` literals, `0x`-prefixed hex integers, then numbers
/// when the token leads with a digit, sign or dot; everything else (and any
/// number that fails to parse, e.g. an overflowing hex literal) stays a
/// string.
pub(crate) fn classify_token(token: &str) -> TdValue {
    match token {
        "null" => return TdValue::Null,
        "true" => return TdValue::Bool(true),
        "false" => return TdValue::Bool(false),
        _ => {}
    }
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(TdValue::Int)
            .unwrap_or_else(|_| TdValue::Str(token.to_string()));
    }
    let leads_numeric = matches!(
        token.chars().next(),
        Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit()
    );
    if !leads_numeric {
        return TdValue::Str(token.to_string());
    }
    if token.contains('.') {
        return token
            .parse::<f64>()
            .map(TdValue::Float)
            .unwrap_or_else(|_| TdValue::Str(token.to_string()));
    }
    token
        .parse::<i64>()
        .map(TdValue::Int)
        .or_else(|_| token.parse::<f64>().map(TdValue::Float))
        .unwrap_or_else(|_| TdValue::Str(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, parse_all, parse_with_options};

    #[test]
    fn test_classify_token() {
        assert_eq!(classify_token("null"), TdValue::Null);
        assert_eq!(classify_token("true"), TdValue::Bool(true));
        assert_eq!(classify_token("42"), TdValue::Int(42));
        assert_eq!(classify_token("-1.5"), TdValue::Float(-1.5));
        assert_eq!(classify_token("1e3"), TdValue::Float(1000.0));
        assert_eq!(classify_token("0x1f"), TdValue::Int(31));
        assert_eq!(
            classify_token("0xffffffffffffffffff"),
            TdValue::Str("0xffffffffffffffffff".to_string())
        );
        assert_eq!(classify_token("hello"), TdValue::Str("hello".to_string()));
        assert_eq!(classify_token("12ab"), TdValue::Str("12ab".to_string()));
    }

    #[test]
    fn test_comments_are_skipped() {
        let doc = parse("{\n# line\n a: 1, // more\n b: /* inline */ 2}").unwrap();
        assert_eq!(doc.value_by_path(doc.root(), "a"), Some(&TdValue::Int(1)));
        assert_eq!(doc.value_by_path(doc.root(), "b"), Some(&TdValue::Int(2)));
    }

    #[test]
    fn test_path_compression() {
        let doc = parse("{a:b:c}").unwrap();
        assert_eq!(
            doc.value_by_path(doc.root(), "a/b"),
            Some(&TdValue::from("c"))
        );
    }

    #[test]
    fn test_type_wrapper() {
        let doc = parse("{p: Point{x: 1, y: 2}}").unwrap();
        assert_eq!(
            doc.value_by_path(doc.root(), "p/$type"),
            Some(&TdValue::from("Point"))
        );
        assert_eq!(doc.value_by_path(doc.root(), "p/x"), Some(&TdValue::Int(1)));
    }

    #[test]
    fn test_continuous_string_concatenation() {
        let doc = parse(r#"{a: "one " 'two' `three`}"#).unwrap();
        assert_eq!(
            doc.value_by_path(doc.root(), "a"),
            Some(&TdValue::from("one twothree"))
        );
    }

    #[test]
    fn test_bare_entries_become_indexed_children() {
        let doc = parse("{a, b, c}").unwrap();
        assert_eq!(doc.value_by_path(doc.root(), "1"), Some(&TdValue::from("b")));
        assert_eq!(doc.node(doc.root()).children_size(), 3);
    }

    #[test]
    fn test_root_scalar_fallback() {
        let doc = parse("}").unwrap();
        assert_eq!(doc.node(doc.root()).value(), Some(&TdValue::from("}")));

        let doc = parse("").unwrap();
        assert_eq!(doc.node(doc.root()).value(), None);
        assert!(doc.node(doc.root()).is_leaf());
    }

    #[test]
    fn test_default_root_type_map() {
        let opt = crate::ParseOptions::default().with_default_root_type(NodeType::Map);
        let doc = parse_with_options("a: 1\nb: 2", &opt).unwrap();
        assert_eq!(doc.value_by_path(doc.root(), "b"), Some(&TdValue::Int(2)));
    }

    #[test]
    fn test_default_root_type_array() {
        let opt = crate::ParseOptions::default().with_default_root_type(NodeType::Array);
        let doc = parse_with_options("a, b, 3", &opt).unwrap();
        assert_eq!(doc.value_by_path(doc.root(), "2"), Some(&TdValue::Int(3)));
    }

    #[test]
    fn test_duplicate_keys_dedup() {
        let doc = parse(r#"{"a":1,"a":2}"#).unwrap();
        let a = doc.get_child(doc.root(), "a").unwrap();
        assert_eq!(doc.node(a).node_type(), NodeType::Array);
        assert!(doc.node(a).is_deduped());
        assert_eq!(doc.value_by_path(doc.root(), "a/1"), Some(&TdValue::Int(2)));
    }

    #[test]
    fn test_duplicate_key_value_stops_at_map_close() {
        // the last occurrence sits directly before the closing brace; the
        // synthetic wrapper must not hide the enclosing map's terminator
        let doc = parse(r#"[{"a":1,"a":2}]"#).unwrap();
        assert_eq!(doc.value_by_path(doc.root(), "0/a/1"), Some(&TdValue::Int(2)));
    }

    #[test]
    fn test_id_registration() {
        let doc = parse(r#"{a: {$id: "n1", v: 1}}"#).unwrap();
        let anchored = doc.node_by_id("n1").unwrap();
        assert_eq!(doc.value_by_path(anchored, "v"), Some(&TdValue::Int(1)));
    }

    #[test]
    fn test_parse_all_suffixes_ids() {
        let doc = parse_all(r##"{$id: "x"} {r: {$ref: "#x"}}"##).unwrap();
        let root = doc.root();
        assert_eq!(doc.node(root).node_type(), NodeType::Array);
        assert_eq!(doc.node(root).children_size(), 2);
        assert!(doc.node_by_id("x_0").is_some());
        assert_eq!(
            doc.value_by_path(root, "1/r/$ref"),
            Some(&TdValue::from("#x_1"))
        );
    }

    #[test]
    fn test_unbalanced_brackets() {
        match parse("{a: [1, 2}").unwrap_err() {
            Error::UnbalancedBrackets { close, .. } => assert_eq!(close, "]"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            parse("{a: 1"),
            Err(Error::UnbalancedBrackets { .. })
        ));
    }

    #[test]
    fn test_missing_key_delimiter() {
        assert!(matches!(
            parse(r#"{"a" 1}"#),
            Err(Error::MissingKeyDelimiter { .. })
        ));
    }

    #[test]
    fn test_positions_recorded() {
        let doc = parse("{a: 12}").unwrap();
        let a = doc.get_child(doc.root(), "a").unwrap();
        let start = doc.node(a).start().unwrap();
        assert_eq!(start.offset, 4);
        assert_eq!(doc.node(a).end().unwrap().offset, 6);
    }

    #[test]
    fn test_json5_flavor() {
        let doc = parse(
            r#"{
  unquoted: 'single',
  trailing: [1, 2,],
  hex: 0xFF,
  leading: .5,
}"#,
        )
        .unwrap();
        let root = doc.root();
        assert_eq!(
            doc.value_by_path(root, "unquoted"),
            Some(&TdValue::from("single"))
        );
        assert_eq!(doc.value_by_path(root, "hex"), Some(&TdValue::Int(255)));
        assert_eq!(doc.value_by_path(root, "leading"), Some(&TdValue::Float(0.5)));
        assert_eq!(doc.node(doc.get_child(root, "trailing").unwrap()).children_size(), 2);
    }
}
