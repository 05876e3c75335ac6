//! Serializes a document tree back to text.
//!
//! The writer is a pure function of node and [`WriteOptions`]: it keeps no
//! state between calls, so one options value can serialize any number of
//! documents. Output follows the same [`GrammarConfig`](crate::GrammarConfig)
//! the parser reads, which keeps write-then-parse an identity on the tree.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::{parse, write, write_with_options, WriteOptions};
//!
//! let doc = parse("{a: 1, b: [true, null]}").unwrap();
//! assert_eq!(write(&doc), r#"{"a":1,"b":[true,null]}"#);
//!
//! let bare = WriteOptions::default()
//!     .with_always_quote_key(false)
//!     .with_always_quote_value(false);
//! assert_eq!(write_with_options(&doc, &bare), "{a:1,b:[true,null]}");
//! ```

use crate::filter::{apply_filters, Filtered, TextKind};
use crate::parser::classify_token;
use crate::{NodeId, NodeType, TdValue, TreeDoc, WriteOptions};
use std::fmt::Write as _;

/// Serializes the subtree rooted at `id`.
#[must_use]
pub fn write_node(doc: &TreeDoc, id: NodeId, opt: &WriteOptions) -> String {
    let mut out = String::new();
    write_node_into(&mut out, doc, id, opt, "");
    out
}

/// Serializes the subtree rooted at `id` into `out`, starting at the given
/// indentation prefix.
pub fn write_node_into(out: &mut String, doc: &TreeDoc, id: NodeId, opt: &WriteOptions, indent: &str) {
    match doc.node(id).node_type() {
        NodeType::Map => write_map(out, doc, id, opt, indent),
        NodeType::Array => write_array(out, doc, id, opt, indent),
        NodeType::Simple => write_simple(out, doc, id, opt),
    }
}

fn write_map(out: &mut String, doc: &TreeDoc, id: NodeId, opt: &WriteOptions, indent: &str) {
    emit(out, opt, TextKind::Operator, opt.grammar.obj_start());

    let child_indent = child_indent(opt, indent);
    // Resolve filters up front so the value delimiter can be omitted after
    // the last surviving child, not merely the last child.
    let survivors: Vec<(NodeId, Filtered)> = doc
        .node(id)
        .children()
        .iter()
        .map(|c| (*c, apply_filters(&opt.filters, doc, *c)))
        .filter(|(_, f)| *f != Filtered::Skip)
        .collect();

    for (i, (child, filtered)) in survivors.iter().enumerate() {
        if opt.has_indent() {
            out.push('\n');
            out.push_str(&child_indent);
        }
        write_key(out, doc.node(*child).key().unwrap_or(""), opt);
        emit(out, opt, TextKind::Operator, opt.grammar.key_delim());
        match filtered {
            Filtered::Mask(placeholder) => write_quoted(out, placeholder, opt, TextKind::StringValue),
            _ => write_node_into(out, doc, *child, opt, &child_indent),
        }
        if i + 1 < survivors.len() {
            emit(out, opt, TextKind::Operator, opt.grammar.value_delim());
        }
    }

    if opt.has_indent() && !survivors.is_empty() {
        out.push('\n');
        out.push_str(indent);
    }
    emit(out, opt, TextKind::Operator, opt.grammar.obj_end());
}

fn write_array(out: &mut String, doc: &TreeDoc, id: NodeId, opt: &WriteOptions, indent: &str) {
    emit(out, opt, TextKind::Operator, opt.grammar.arr_start());

    let child_indent = child_indent(opt, indent);
    let children = doc.node(id).children();
    for (i, child) in children.iter().enumerate() {
        if opt.has_indent() {
            out.push('\n');
            out.push_str(&child_indent);
        }
        write_node_into(out, doc, *child, opt, &child_indent);
        if i + 1 < children.len() {
            emit(out, opt, TextKind::Operator, opt.grammar.value_delim());
        }
    }

    if opt.has_indent() && !children.is_empty() {
        out.push('\n');
        out.push_str(indent);
    }
    emit(out, opt, TextKind::Operator, opt.grammar.arr_end());
}

fn write_simple(out: &mut String, doc: &TreeDoc, id: NodeId, opt: &WriteOptions) {
    match doc.node(id).value() {
        None | Some(TdValue::Null) => emit(out, opt, TextKind::NonStringValue, "null"),
        Some(TdValue::Bool(b)) => emit(out, opt, TextKind::NonStringValue, &b.to_string()),
        Some(TdValue::Int(i)) => emit(out, opt, TextKind::NonStringValue, &i.to_string()),
        // {:?} keeps a trailing `.0` on whole floats so they read back as
        // floats rather than integers.
        Some(TdValue::Float(v)) => emit(out, opt, TextKind::NonStringValue, &format!("{v:?}")),
        Some(TdValue::Str(s)) => {
            if opt.always_quote_value || needs_quote(s, opt) {
                write_quoted(out, s, opt, TextKind::StringValue);
            } else {
                emit(out, opt, TextKind::NonStringValue, s);
            }
        }
    }
}

fn write_key(out: &mut String, key: &str, opt: &WriteOptions) {
    if opt.always_quote_key || !is_identifier(key) {
        write_quoted(out, key, opt, TextKind::Key);
    } else {
        emit(out, opt, TextKind::Key, key);
    }
}

fn write_quoted(out: &mut String, text: &str, opt: &WriteOptions, kind: TextKind) {
    let quote = choose_quote(text, opt.grammar.quote_chars());
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(quote);
    quoted.push_str(&c_escape(text, quote));
    quoted.push(quote);
    emit(out, opt, kind, &quoted);
}

fn emit(out: &mut String, opt: &WriteOptions, kind: TextKind, text: &str) {
    match &opt.decorator {
        Some(decorator) => out.push_str(&decorator(kind, text)),
        None => out.push_str(text),
    }
}

fn child_indent(opt: &WriteOptions, indent: &str) -> String {
    if opt.has_indent() {
        format!("{indent}{}", opt.indent_str())
    } else {
        String::new()
    }
}

/// Picks the quote candidate that appears least often in `text`, so the
/// escaped form is shortest. Ties go to the earlier candidate.
fn choose_quote(text: &str, candidates: &str) -> char {
    candidates
        .chars()
        .min_by_key(|q| text.chars().filter(|c| c == q).count())
        .unwrap_or('"')
}

/// Whether an unquoted rendition of `text` would fail to read back as the
/// same string: empty, boundary spaces, leading comment starters, grammar
/// characters, control characters, or text that classifies as a non-string
/// token.
fn needs_quote(text: &str, opt: &WriteOptions) -> bool {
    if text.is_empty() || text.starts_with(' ') || text.ends_with(' ') {
        return true;
    }
    // A leading comment starter would swallow the value on reparse.
    if text.starts_with('#') || text.starts_with("//") || text.starts_with("/*") {
        return true;
    }
    if text
        .chars()
        .any(|c| c < ' ' || opt.grammar.quote_needed_chars.contains(c))
    {
        return true;
    }
    !matches!(classify_token(text), TdValue::Str(_))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

const MIN_PRINTABLE: char = ' ';

/// C-style escaping. Quote characters other than the active quote pass
/// through unescaped; unprintable characters become `\uXXXX`.
pub(crate) fn c_escape(text: &str, quote: char) -> String {
    if !text
        .chars()
        .any(|c| c < MIN_PRINTABLE || c == '\\' || c == quote)
    {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match escape_symbol(c) {
            Some(symbol) if c == quote || !is_quote_char(c) => {
                out.push('\\');
                out.push(symbol);
            }
            _ if c < MIN_PRINTABLE => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            _ => out.push(c),
        }
    }
    out
}

fn escape_symbol(c: char) -> Option<char> {
    match c {
        '\'' => Some('\''),
        '"' => Some('"'),
        '`' => Some('`'),
        '\\' => Some('\\'),
        '\u{8}' => Some('b'),
        '\u{c}' => Some('f'),
        '\n' => Some('n'),
        '\r' => Some('r'),
        '\t' => Some('t'),
        _ => None,
    }
}

fn is_quote_char(c: char) -> bool {
    matches!(c, '\'' | '"' | '`')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, write_with_options, NodeFilter};
    use std::rc::Rc;

    #[test]
    fn test_choose_quote_prefers_fewest_escapes() {
        assert_eq!(choose_quote("it's", "\"'"), '"');
        assert_eq!(choose_quote("say \"hi\"", "\"'"), '\'');
        // three single quotes, no double quotes
        assert_eq!(choose_quote("'''", "\"'"), '"');
        // tie goes to the first candidate
        assert_eq!(choose_quote("plain", "\"'"), '"');
    }

    #[test]
    fn test_c_escape() {
        assert_eq!(c_escape("plain", '"'), "plain");
        assert_eq!(c_escape("a\"b", '"'), "a\\\"b");
        assert_eq!(c_escape("a\"b", '\''), "a\"b");
        assert_eq!(c_escape("line\nbreak\t", '"'), "line\\nbreak\\t");
        assert_eq!(c_escape("\u{1}", '"'), "\\u0001");
        assert_eq!(c_escape("back\\slash", '"'), "back\\\\slash");
    }

    #[test]
    fn test_needs_quote() {
        let opt = WriteOptions::default();
        assert!(needs_quote("", &opt));
        assert!(needs_quote(" lead", &opt));
        assert!(needs_quote("a,b", &opt));
        assert!(needs_quote("true", &opt));
        assert!(needs_quote("12", &opt));
        assert!(!needs_quote("hello world", &opt));
        // leading comment starters would swallow the value on reparse
        assert!(needs_quote("#tag", &opt));
        assert!(needs_quote("//path", &opt));
        assert!(needs_quote("/* note", &opt));
        assert!(!needs_quote("/usr/bin", &opt));
    }

    #[test]
    fn test_pretty_indentation() {
        let doc = parse("{a: 1, b: [2]}").unwrap();
        let out = write_with_options(&doc, &WriteOptions::pretty());
        assert_eq!(out, "{\n  \"a\":1,\n  \"b\":[\n    2\n  ]\n}");
    }

    #[test]
    fn test_filtered_children_do_not_leave_trailing_delimiter() {
        let doc = parse("{a: 1, b: 2}").unwrap();
        let opt = WriteOptions::default().with_filter(NodeFilter::exclude(&["^b$"]).unwrap());
        assert_eq!(write_with_options(&doc, &opt), r#"{"a":1}"#);
    }

    #[test]
    fn test_decorator_wraps_categories() {
        let doc = parse("{a: 1}").unwrap();
        let opt = WriteOptions::default().with_decorator(Rc::new(|kind, text| {
            if kind == TextKind::Key {
                format!("<{text}>")
            } else {
                text.to_string()
            }
        }));
        assert_eq!(write_with_options(&doc, &opt), "{<\"a\">:1}");
    }
}
