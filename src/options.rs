//! Grammar configuration and parse/write options.
//!
//! The textual grammar this crate reads and writes is not fixed: every
//! delimiter — key separator, value separator, brackets, quote candidates —
//! lives in a [`GrammarConfig`], and the parser and writer each embed one by
//! value in their option struct. Changing a delimiter re-derives the
//! terminator sets that bound scalar-token reads.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::{parse_with_options, GrammarConfig, ParseOptions, TdValue};
//!
//! // An `=`-keyed dialect
//! let grammar = GrammarConfig::default().with_key_delim("=");
//! let opts = ParseOptions::default().with_grammar(grammar);
//! let doc = parse_with_options("{a = 1}", &opts).unwrap();
//! assert_eq!(doc.value_by_path(doc.root(), "a"), Some(&TdValue::Int(1)));
//! ```

use crate::filter::{Decorator, NodeFilter};
use crate::scanner::CharSource;
use crate::NodeType;
use std::fmt;

/// Reserved key registering a node in the document's id index.
pub const KEY_ID: &str = "$id";
/// Reserved key carrying a type tag produced by the type-wrapper syntax.
pub const KEY_TYPE: &str = "$type";
/// Reserved key holding a reference path to another node.
pub const KEY_REF: &str = "$ref";

/// A terminator set: single characters plus multi-character literals.
///
/// Scalar-token reads stop when the upcoming input matches one of these.
#[derive(Clone, Debug, Default)]
pub struct TermSet {
    chars: String,
    literals: Vec<String>,
}

impl TermSet {
    fn add(&mut self, delim: &str) {
        if delim.chars().count() == 1 {
            self.chars.push_str(delim);
        } else if !delim.is_empty() {
            self.literals.push(delim.to_string());
        }
    }

    fn add_chars(&mut self, chars: &str) {
        self.chars.push_str(chars);
    }

    /// Returns `true` if the scanner's upcoming input matches this set.
    pub fn is_term<S: CharSource>(&self, src: &S) -> bool {
        match src.peek(0) {
            None => false,
            Some(c) => {
                self.chars.contains(c) || self.literals.iter().any(|l| src.starts_with(l))
            }
        }
    }
}

/// The configurable delimiters of the textual grammar, plus the terminator
/// sets derived from them.
///
/// Defaults give the JSON/JSON5/textproto-compatible dialect: `:` keys, `,`
/// values, `{}`/`[]` brackets and `"`/`'`/`` ` `` quote candidates.
#[derive(Clone, Debug)]
pub struct GrammarConfig {
    key_delim: String,
    value_delim: String,
    obj_start: String,
    obj_end: String,
    arr_start: String,
    arr_end: String,
    quote_chars: String,
    // derived by rebuild_terms()
    pub(crate) term_value: TermSet,
    pub(crate) term_value_in_map: TermSet,
    pub(crate) term_value_in_array: TermSet,
    pub(crate) term_key: TermSet,
    pub(crate) quote_needed_chars: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        let mut config = GrammarConfig {
            key_delim: ":".to_string(),
            value_delim: ",".to_string(),
            obj_start: "{".to_string(),
            obj_end: "}".to_string(),
            arr_start: "[".to_string(),
            arr_end: "]".to_string(),
            quote_chars: "\"'`".to_string(),
            term_value: TermSet::default(),
            term_value_in_map: TermSet::default(),
            term_value_in_array: TermSet::default(),
            term_key: TermSet::default(),
            quote_needed_chars: String::new(),
        };
        config.rebuild_terms();
        config
    }
}

impl GrammarConfig {
    /// Re-derives the terminator sets from the current delimiters.
    ///
    /// Runs automatically from every `with_*` setter; only needed directly
    /// after mutating delimiters through some future field access.
    pub fn rebuild_terms(&mut self) {
        // A value token also stops at the key delimiter and object start so
        // `a:b:c` path compression and `Type{...}` wrappers can be detected.
        let mut term_value = TermSet::default();
        term_value.add_chars("\n\r");
        term_value.add(&self.key_delim);
        term_value.add(&self.obj_start);
        term_value.add(&self.value_delim);

        let mut term_value_in_map = term_value.clone();
        term_value_in_map.add(&self.obj_end);
        let mut term_value_in_array = term_value.clone();
        term_value_in_array.add(&self.arr_end);

        let mut term_key = TermSet::default();
        term_key.add(&self.obj_start);
        term_key.add(&self.obj_end);
        term_key.add(&self.arr_start);
        term_key.add(&self.value_delim);
        term_key.add(&self.key_delim);
        term_key.add_chars(&self.quote_chars);

        let mut quote_needed = String::from("\n\r");
        for delim in [
            &self.key_delim,
            &self.value_delim,
            &self.obj_start,
            &self.obj_end,
            &self.arr_start,
            &self.arr_end,
        ] {
            quote_needed.push_str(delim);
        }
        quote_needed.push_str(&self.quote_chars);

        self.term_value = term_value;
        self.term_value_in_map = term_value_in_map;
        self.term_value_in_array = term_value_in_array;
        self.term_key = term_key;
        self.quote_needed_chars = quote_needed;
    }

    #[must_use]
    pub fn key_delim(&self) -> &str {
        &self.key_delim
    }

    #[must_use]
    pub fn value_delim(&self) -> &str {
        &self.value_delim
    }

    #[must_use]
    pub fn obj_start(&self) -> &str {
        &self.obj_start
    }

    #[must_use]
    pub fn obj_end(&self) -> &str {
        &self.obj_end
    }

    #[must_use]
    pub fn arr_start(&self) -> &str {
        &self.arr_start
    }

    #[must_use]
    pub fn arr_end(&self) -> &str {
        &self.arr_end
    }

    /// The quote character candidates, in preference order.
    #[must_use]
    pub fn quote_chars(&self) -> &str {
        &self.quote_chars
    }

    /// Sets the key delimiter (default `:`).
    #[must_use]
    pub fn with_key_delim(mut self, delim: impl Into<String>) -> Self {
        self.key_delim = delim.into();
        self.rebuild_terms();
        self
    }

    /// Sets the value delimiter (default `,`).
    #[must_use]
    pub fn with_value_delim(mut self, delim: impl Into<String>) -> Self {
        self.value_delim = delim.into();
        self.rebuild_terms();
        self
    }

    /// Sets the object brackets (default `{` / `}`).
    #[must_use]
    pub fn with_obj_brackets(
        mut self,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        self.obj_start = start.into();
        self.obj_end = end.into();
        self.rebuild_terms();
        self
    }

    /// Sets the array brackets (default `[` / `]`).
    #[must_use]
    pub fn with_arr_brackets(
        mut self,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        self.arr_start = start.into();
        self.arr_end = end.into();
        self.rebuild_terms();
        self
    }

    /// Sets the quote character candidates.
    ///
    /// When more than one candidate is configured the writer dynamically
    /// picks the one needing the fewest escapes for each string.
    #[must_use]
    pub fn with_quote_chars(mut self, quote_chars: impl Into<String>) -> Self {
        self.quote_chars = quote_chars.into();
        self.rebuild_terms();
        self
    }
}

/// Options for parsing.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    pub grammar: GrammarConfig,
    /// Root node type used when the top level has no enclosing bracket.
    pub default_root_type: NodeType,
    /// Recorded on the produced document.
    pub uri: Option<String>,
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback type for bracketless root documents.
    ///
    /// `Map` parses headerless streams like `a:1\nb:2`; `Array` parses
    /// comma-joined scalars like `a,b,c`.
    #[must_use]
    pub fn with_default_root_type(mut self, node_type: NodeType) -> Self {
        self.default_root_type = node_type;
        self
    }

    #[must_use]
    pub fn with_grammar(mut self, grammar: GrammarConfig) -> Self {
        self.grammar = grammar;
        self
    }

    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

/// Options for writing.
///
/// A pure value: the writer itself keeps no state between calls.
#[derive(Clone)]
pub struct WriteOptions {
    pub grammar: GrammarConfig,
    indent_factor: usize,
    indent_str: String,
    /// Quote every map key, even ones matching the identifier pattern.
    pub always_quote_key: bool,
    /// Quote every string scalar, not just ones that need it.
    pub always_quote_value: bool,
    pub filters: Vec<NodeFilter>,
    pub decorator: Option<Decorator>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            grammar: GrammarConfig::default(),
            indent_factor: 0,
            indent_str: String::new(),
            always_quote_key: true,
            always_quote_value: true,
            filters: Vec::new(),
            decorator: None,
        }
    }
}

impl WriteOptions {
    /// Compact output with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output, two spaces per level.
    #[must_use]
    pub fn pretty() -> Self {
        Self::default().with_indent_factor(2)
    }

    /// Sets the indent width; 0 means compact (no newlines).
    #[must_use]
    pub fn with_indent_factor(mut self, factor: usize) -> Self {
        self.indent_factor = factor;
        self.indent_str = " ".repeat(factor);
        self
    }

    /// Sets the per-level indent string directly (e.g. a tab).
    #[must_use]
    pub fn with_indent_str(mut self, indent: impl Into<String>) -> Self {
        self.indent_str = indent.into();
        self
    }

    #[must_use]
    pub fn indent_factor(&self) -> usize {
        self.indent_factor
    }

    #[must_use]
    pub fn indent_str(&self) -> &str {
        &self.indent_str
    }

    #[must_use]
    pub fn has_indent(&self) -> bool {
        !self.indent_str.is_empty()
    }

    #[must_use]
    pub fn with_always_quote_key(mut self, always: bool) -> Self {
        self.always_quote_key = always;
        self
    }

    #[must_use]
    pub fn with_always_quote_value(mut self, always: bool) -> Self {
        self.always_quote_value = always;
        self
    }

    #[must_use]
    pub fn with_grammar(mut self, grammar: GrammarConfig) -> Self {
        self.grammar = grammar;
        self
    }

    /// Appends a node filter; filters run in the order added.
    #[must_use]
    pub fn with_filter(mut self, filter: NodeFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Installs a text decorator wrapping emitted substrings by category.
    #[must_use]
    pub fn with_decorator(mut self, decorator: Decorator) -> Self {
        self.decorator = Some(decorator);
        self
    }
}

impl fmt::Debug for WriteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOptions")
            .field("grammar", &self.grammar)
            .field("indent_factor", &self.indent_factor)
            .field("always_quote_key", &self.always_quote_key)
            .field("always_quote_value", &self.always_quote_value)
            .field("filters", &self.filters)
            .field("decorator", &self.decorator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::StringCharSource;

    #[test]
    fn test_default_terms() {
        let grammar = GrammarConfig::default();
        let src = StringCharSource::new(":rest");
        assert!(grammar.term_value.is_term(&src));
        let src = StringCharSource::new("}rest");
        assert!(grammar.term_value_in_map.is_term(&src));
        assert!(!grammar.term_value_in_array.is_term(&src));
    }

    #[test]
    fn test_setters_rederive_terms() {
        let grammar = GrammarConfig::default().with_key_delim("=");
        let src = StringCharSource::new("=1");
        assert!(grammar.term_value.is_term(&src));
        let src = StringCharSource::new(":1");
        assert!(!grammar.term_value.is_term(&src));
    }

    #[test]
    fn test_multi_char_delimiter_goes_to_literals() {
        let grammar = GrammarConfig::default().with_value_delim("||");
        let src = StringCharSource::new("||rest");
        assert!(grammar.term_value.is_term(&src));
        let src = StringCharSource::new("|rest");
        assert!(!grammar.term_value.is_term(&src));
    }
}
