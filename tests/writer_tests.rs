//! Writer integration tests: quoting, indentation, filters, decoration.

use std::rc::Rc;
use treedoc::{
    parse, write, write_with_options, GrammarConfig, NodeFilter, TextKind, WriteOptions,
};

#[test]
fn test_compact_default_is_strict_json() {
    let doc = parse("{a: 1, b: [x, true], c: {}}").unwrap();
    assert_eq!(write(&doc), r#"{"a":1,"b":["x",true],"c":{}}"#);
}

#[test]
fn test_pretty_output() {
    let doc = parse("{a: 1, b: [2, 3]}").unwrap();
    let expected = "{
  \"a\":1,
  \"b\":[
    2,
    3
  ]
}";
    assert_eq!(write_with_options(&doc, &WriteOptions::pretty()), expected);
}

#[test]
fn test_tab_indentation() {
    let doc = parse("{a: 1}").unwrap();
    let opt = WriteOptions::default().with_indent_str("\t");
    assert_eq!(write_with_options(&doc, &opt), "{\n\t\"a\":1\n}");
}

#[test]
fn test_unquoted_keys_and_values_when_safe() {
    let doc = parse(r#"{plain: hello, "spaced key": "with, comma", num: "12"}"#).unwrap();
    let opt = WriteOptions::default()
        .with_always_quote_key(false)
        .with_always_quote_value(false);
    // identifier keys and harmless strings drop their quotes; anything that
    // would reparse differently keeps them
    assert_eq!(
        write_with_options(&doc, &opt),
        r#"{plain:hello,"spaced key":"with, comma",num:"12"}"#
    );
}

#[test]
fn test_quote_candidate_selection() {
    // three single quotes and no double quotes: double wins
    let doc = parse(r#"{a: "it's a 'quote' fest"}"#).unwrap();
    let opt = WriteOptions::default()
        .with_grammar(GrammarConfig::default().with_quote_chars("\"'"));
    assert_eq!(
        write_with_options(&doc, &opt),
        r#"{"a":"it's a 'quote' fest"}"#
    );

    // majority double quotes: single wins and doubles stay unescaped
    let doc = parse(r#"{a: 'say "hi" and "bye"'}"#).unwrap();
    assert_eq!(
        write_with_options(&doc, &opt),
        r#"{"a":'say "hi" and "bye"'}"#
    );
}

#[test]
fn test_write_parse_identity_on_tree() {
    let text = r#"{"a":1,"b":[true,null,"x y"],"c":{"d":-2.5,"e":"it\"s"}}"#;
    let doc = parse(text).unwrap();
    let written = write(&doc);
    let doc2 = parse(&written).unwrap();
    assert_eq!(doc.text(doc.root()), doc2.text(doc2.root()));
}

#[test]
fn test_exclude_and_mask_filters() {
    let doc = parse(
        r#"{user: {name: ann, password: hunter2, token: {k: 1, v: 2}}, debug: true}"#,
    )
    .unwrap();
    let opt = WriteOptions::default()
        .with_filter(NodeFilter::exclude(&["^debug$"]).unwrap())
        .with_filter(NodeFilter::mask(&["password", "token"]).unwrap());
    let out = write_with_options(&doc, &opt);
    assert_eq!(
        out,
        r#"{"user":{"name":"ann","password":"<Masked:len=7>","token":"{Masked:size=2}"}}"#
    );
}

#[test]
fn test_decorator_categories() {
    let doc = parse("{k: v, n: 1}").unwrap();
    let opt = WriteOptions::default().with_decorator(Rc::new(|kind, text| match kind {
        TextKind::Key => format!("K({text})"),
        TextKind::StringValue => format!("S({text})"),
        TextKind::NonStringValue => format!("V({text})"),
        TextKind::Operator => text.to_string(),
    }));
    assert_eq!(
        write_with_options(&doc, &opt),
        r#"{K("k"):S("v"),K("n"):V(1)}"#
    );
}

#[test]
fn test_comment_like_values_stay_quoted() {
    let doc = parse(r##"{a: "#tag", b: "//path", c: "/* note", d: "/usr/bin"}"##).unwrap();
    let opt = WriteOptions::default()
        .with_always_quote_key(false)
        .with_always_quote_value(false);
    let out = write_with_options(&doc, &opt);
    assert_eq!(out, r##"{a:"#tag",b:"//path",c:"/* note",d:/usr/bin}"##);

    let back = parse(&out).unwrap();
    assert_eq!(doc.text(doc.root()), back.text(back.root()));
}

#[test]
fn test_escapes_in_output() {
    let doc = parse(r#"{a: "line\nbreak\ttab"}"#).unwrap();
    assert_eq!(write(&doc), r#"{"a":"line\nbreak\ttab"}"#);
}

#[test]
fn test_deduped_node_writes_as_array() {
    let doc = parse("{a: 1, a: 2}").unwrap();
    assert_eq!(write(&doc), r#"{"a":[1,2]}"#);
}
