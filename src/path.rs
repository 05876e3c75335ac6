//! Path expressions over the document tree.
//!
//! A [`TdPath`] is a sequence of [`Part`]s resolved against a document:
//! jump to the root, step into a child, walk some number of parents up, or
//! fall back to the `$id` index. Two textual grammars produce paths:
//!
//! - [`TdPath::parse`]: plain slash paths (`a/b/0`, `../sibling`, `#anchor`).
//! - [`TdPath::parse_pointer`]: the fuller JSON-pointer flavor with a
//!   `url#anchor` split, legacy numeric relative segments, and RFC 6901
//!   `~0`/`~1` unescaping.
//!
//! ## Examples
//!
//! ```rust
//! use treedoc::{parse, TdValue};
//!
//! let doc = parse(r#"{a: {b: {c: 3}}, d: 4}"#).unwrap();
//! let b = doc.get_by_path_str(doc.root(), "a/b").unwrap();
//! // two parents up, then down into `d`
//! let d = doc.get_by_path_str(b, "../../d").unwrap();
//! assert_eq!(doc.node(d).value(), Some(&TdValue::Int(4)));
//! ```

/// One navigation step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Part {
    /// Jump to the document root.
    Root,
    /// Step into the child with this key (digit segments index arrays).
    Child(String),
    /// Walk `level` parents up; 0 is the current node.
    Relative(usize),
    /// Try a literal child first, then fall back to an `$id` lookup.
    ///
    /// Plain field names are far more common than id anchors, so the child
    /// match wins when both exist.
    ChildOrId { key: String, id: String },
}

impl Part {
    /// A child-or-id part where key and id are the same text.
    #[must_use]
    pub fn child_or_id(text: &str) -> Part {
        Part::ChildOrId {
            key: text.to_string(),
            id: text.to_string(),
        }
    }
}

/// A parsed path: optional document path plus navigation parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TdPath {
    /// The document file path or URL this path points into, when given.
    pub doc_path: Option<String>,
    pub parts: Vec<Part>,
}

impl TdPath {
    /// Parses a simple slash-delimited path.
    ///
    /// Special segments: empty or `#` is the root, `.` is the current node,
    /// `..` is the parent, a segment starting with `#` is an id reference.
    /// Everything else is a child step.
    #[must_use]
    pub fn parse(text: &str) -> TdPath {
        let mut path = TdPath::default();
        for segment in text.split('/') {
            let part = match segment {
                "." => Part::Relative(0),
                ".." => Part::Relative(1),
                "" | "#" => Part::Root,
                s if s.starts_with('#') => Part::child_or_id(&s[1..]),
                s => Part::Child(s.to_string()),
            };
            path.parts.push(part);
        }
        path
    }

    /// Parses a JSON-pointer style expression.
    ///
    /// Supported forms, combined:
    ///
    /// 1. URL + anchor: `http://a.com/path#/p1/p2`
    /// 2. URL only: `http://a.com`
    /// 3. Anchor only: `#/p1/p2`
    /// 4. Legacy numeric relative: `2/p1/p2` (two ancestors up)
    /// 5. Relative with dots: `../p1/p2`
    /// 6. Id anchor: `#nodeId`
    ///
    /// A trailing `#` (the "key of" form) is ignored. `~1` and `~0` in child
    /// segments unescape to `/` and `~` per RFC 6901.
    #[must_use]
    pub fn parse_pointer(text: &str) -> TdPath {
        let mut path = TdPath::default();
        if text.is_empty() {
            return path;
        }
        let text = text.strip_suffix('#').unwrap_or(text);

        match text.split_once('#') {
            None => {
                if !parse_anchor_parts(text, &mut path, true) {
                    path.doc_path = Some(text.to_string());
                    path.parts.push(Part::Root);
                }
            }
            Some((doc_path, anchor)) => {
                if !doc_path.is_empty() {
                    path.doc_path = Some(doc_path.to_string());
                }
                parse_anchor_parts(anchor, &mut path, false);
            }
        }
        path
    }
}

/// Parses the `/`-separated parts of an anchor into `path`.
///
/// With `relative_with_num` the first segment must be a bare integer (the
/// legacy "n ancestors up" form), a dot-relative segment, or empty (a
/// root-anchored `/a/b` path); returns `false` otherwise, so the caller can
/// treat the whole text as a document path instead.
fn parse_anchor_parts(text: &str, path: &mut TdPath, relative_with_num: bool) -> bool {
    let mut segments = text.split('/');
    let first = segments.next().unwrap_or("");

    if relative_with_num {
        let part = match first {
            // a leading slash addresses from the root: `/a/b`
            "" => Some(Part::Root),
            "." => Some(Part::Relative(0)),
            ".." => Some(Part::Relative(1)),
            _ => first.parse::<usize>().ok().map(Part::Relative),
        };
        match part {
            Some(part) => path.parts.push(part),
            None => return false,
        }
    } else {
        let part = match first {
            "" => Part::Root,
            "." => Part::Relative(0),
            ".." => Part::Relative(1),
            s => Part::child_or_id(s),
        };
        path.parts.push(part);
    }

    for segment in segments {
        // tolerate `../../` style refs with a trailing slash
        if segment.is_empty() {
            continue;
        }
        path.parts.push(parse_child_segment(segment));
    }
    true
}

fn parse_child_segment(segment: &str) -> Part {
    match segment {
        "." => Part::Relative(0),
        ".." => Part::Relative(1),
        _ => Part::Child(segment.replace("~1", "/").replace("~0", "~")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let path = TdPath::parse("a/0/b");
        assert_eq!(
            path.parts,
            vec![
                Part::Child("a".into()),
                Part::Child("0".into()),
                Part::Child("b".into())
            ]
        );
    }

    #[test]
    fn test_parse_special_segments() {
        let path = TdPath::parse("../#x/.");
        assert_eq!(
            path.parts,
            vec![Part::Relative(1), Part::child_or_id("x"), Part::Relative(0)]
        );
        assert_eq!(TdPath::parse("").parts, vec![Part::Root]);
    }

    #[test]
    fn test_pointer_url_and_anchor() {
        let path = TdPath::parse_pointer("http://a.com/path#/p1/p2");
        assert_eq!(path.doc_path.as_deref(), Some("http://a.com/path"));
        assert_eq!(
            path.parts,
            vec![Part::Root, Part::Child("p1".into()), Part::Child("p2".into())]
        );
    }

    #[test]
    fn test_pointer_url_only() {
        let path = TdPath::parse_pointer("http://a.com");
        assert_eq!(path.doc_path.as_deref(), Some("http://a.com"));
        assert_eq!(path.parts, vec![Part::Root]);
    }

    #[test]
    fn test_pointer_numeric_relative() {
        let path = TdPath::parse_pointer("2/p1");
        assert_eq!(
            path.parts,
            vec![Part::Relative(2), Part::Child("p1".into())]
        );
    }

    #[test]
    fn test_pointer_id_anchor() {
        let path = TdPath::parse_pointer("#nodeId");
        assert_eq!(path.parts, vec![Part::child_or_id("nodeId")]);
    }

    #[test]
    fn test_pointer_repeated_dots_with_trailing_slash() {
        let path = TdPath::parse_pointer("../../");
        assert_eq!(path.parts, vec![Part::Relative(1), Part::Relative(1)]);
    }

    #[test]
    fn test_pointer_root_anchored() {
        let path = TdPath::parse_pointer("/a/b");
        assert_eq!(
            path.parts,
            vec![Part::Root, Part::Child("a".into()), Part::Child("b".into())]
        );
    }

    #[test]
    fn test_pointer_relative_dots() {
        let path = TdPath::parse_pointer("../p1");
        assert_eq!(
            path.parts,
            vec![Part::Relative(1), Part::Child("p1".into())]
        );
    }

    #[test]
    fn test_pointer_unescaping() {
        let path = TdPath::parse_pointer("#/a~1b/c~0d");
        assert_eq!(
            path.parts,
            vec![
                Part::Root,
                Part::Child("a/b".into()),
                Part::Child("c~d".into())
            ]
        );
    }

    #[test]
    fn test_trailing_hash_ignored() {
        let path = TdPath::parse_pointer("#/p1#");
        assert_eq!(path.parts, vec![Part::Root, Part::Child("p1".into())]);
    }
}
