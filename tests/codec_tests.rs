//! Object-graph codec integration tests: identity across text round trips.

use treedoc::{
    encode, encode_with_options, materialize, parse, parse_to_value, stringify, write,
    EncodeOptions, Error, NodeView, ObjMap, ObjValue, TdValue,
};

/// `root.obj.nest` and `root.other` share one map; `root.obj.cyclic` points
/// back at the root.
fn reference_graph() -> ObjValue {
    let mut common = ObjMap::new();
    common.insert("title", "common");
    let common = ObjValue::from(common);

    let root = ObjValue::new_map();
    if let ObjValue::Map(m) = &root {
        let mut obj = ObjMap::new();
        obj.insert("str", "123");
        obj.insert("bool", true);
        obj.insert("nest", common.clone());
        obj.insert("cyclic", root.clone());
        m.borrow_mut().insert("num", 10i64);
        m.borrow_mut().insert("obj", obj);
        m.borrow_mut().insert("other", common);
    }
    root
}

#[test]
fn test_encode_reference_graph_text() {
    let text = stringify(&reference_graph());
    assert_eq!(
        text,
        r##"{"num":10,"obj":{"str":"123","bool":true,"nest":{"title":"common","$id":1},"cyclic":{"$ref":"../../"}},"other":{"$ref":"#1"}}"##
    );
}

#[test]
fn test_cycle_identity_survives_round_trip() {
    let text = stringify(&reference_graph());
    let back = parse_to_value(&text).unwrap();

    let obj = back.get("obj").unwrap();
    assert!(obj.get("cyclic").unwrap().ptr_eq(&back));
}

#[test]
fn test_shared_identity_survives_round_trip() {
    let text = stringify(&reference_graph());
    let back = parse_to_value(&text).unwrap();

    let nest = back.get("obj").unwrap().get("nest").unwrap();
    let other = back.get("other").unwrap();
    assert!(nest.ptr_eq(&other));
    assert_eq!(nest.get("title").unwrap().as_str(), Some("common"));
}

#[test]
fn test_stringify_is_stable_across_round_trips() {
    let text = stringify(&reference_graph());
    let again = stringify(&parse_to_value(&text).unwrap());
    assert_eq!(text, again);
}

#[test]
fn test_strict_mode_fails_on_dangling_ref() {
    let doc = parse(r##"{a: {$ref: "#nowhere"}}"##).unwrap();
    assert!(matches!(
        materialize(&doc, doc.root(), true),
        Err(Error::ReferenceNotFound { .. })
    ));

    // lenient mode keeps the literal reference map
    let lenient = materialize(&doc, doc.root(), false).unwrap();
    assert_eq!(
        lenient.get("a").unwrap().get("$ref").unwrap().as_str(),
        Some("#nowhere")
    );
}

#[test]
fn test_show_type_round_trip() {
    let mut point = ObjMap::with_type("Point");
    point.insert("x", 3i64);
    let value = ObjValue::from(point);

    let doc = encode_with_options(&value, &EncodeOptions::new().with_show_type(true));
    assert_eq!(write(&doc), r#"{"$type":"Point","x":3}"#);

    let back = materialize(&doc, doc.root(), false).unwrap();
    if let ObjValue::Map(m) = &back {
        assert_eq!(m.borrow().type_name.as_deref(), Some("Point"));
        assert_eq!(m.borrow().get("x"), Some(&ObjValue::Int(3)));
    } else {
        panic!("expected a map");
    }
}

#[test]
fn test_lazy_view_reads_one_path() {
    let text = r##"{users: [{$id: "u1", name: ann}], head: {$ref: "#u1"}, big: [1,2,3]}"##;
    let doc = parse(text).unwrap();

    let view = NodeView::of(&doc);
    let head = view.get("head").unwrap().as_view().unwrap();
    assert_eq!(
        head.get("name").unwrap().as_scalar(),
        Some(&TdValue::from("ann"))
    );

    let big = view.get("big").unwrap().as_view().unwrap();
    assert_eq!(big.len(), 3);
    assert_eq!(big.index(2).unwrap().as_scalar(), Some(&TdValue::Int(3)));
}

#[test]
fn test_scalar_round_trips() {
    for value in [
        ObjValue::Bool(false),
        ObjValue::Int(-42),
        ObjValue::Float(2.75),
        ObjValue::Str("plain".to_string()),
    ] {
        let doc = encode(&value);
        let back = materialize(&doc, doc.root(), false).unwrap();
        assert_eq!(back, value);
    }
}

#[test]
fn test_array_of_shared_maps() {
    let mut shared = ObjMap::new();
    shared.insert("v", 1i64);
    let shared = ObjValue::from(shared);
    let list = ObjValue::from(vec![shared.clone(), shared.clone(), shared]);

    let text = stringify(&list);
    assert_eq!(
        text,
        r##"[{"v":1,"$id":1},{"$ref":"#1"},{"$ref":"#1"}]"##
    );

    let back = parse_to_value(&text).unwrap();
    assert!(back.index(0).unwrap().ptr_eq(&back.index(2).unwrap()));
}
