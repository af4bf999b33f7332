//! Reader for YAML documents.
//!
//! The reader turns source text into the tagged [`Node`] tree the resolver
//! consumes. It supports the parts of YAML that configuration files use in
//! practice:
//!
//! - block mappings and block sequences, nested by indentation, including the
//!   compact `- key: value` form
//! - plain, single-quoted and double-quoted scalars on a single line
//! - literal (`|`) and folded (`>`) block scalars, with chomping and
//!   indentation indicators
//! - flow sequences and flow mappings, such as `[a, b]` and `{x: 1}`,
//!   opened and closed on one line
//! - anchors (`&name`) and aliases (`*name`) on block nodes
//! - `#` comments, a leading `---` marker, and explicit tags (`!!str`,
//!   `!!int`, `!!tmpl`, `!!exp`, or any `!custom`)
//!
//! Untagged plain scalars get their tag from their text: integers become
//! `!!int`, `true`/`false` become `!!bool`, floats become `!!float`, empty
//! text, `~` and `null` become `!!null`, and everything else is `!!str`.
//! Quoted and block scalars are always `!!str`.
//!
//! An alias is replaced by a copy of its anchored node, so the tree never
//! shares nodes. Directives, multiple documents and flow collections that
//! span lines are rejected with an `E004` diagnostic.

mod lexer;
mod loader;

use std::sync::Arc;

use log::debug;
use trellis_core::node::Node;

use crate::{DEFAULT_MAX_DEPTH, error::Result};

/// Reads documents attributed to one filename.
#[derive(Debug, Clone)]
pub struct Reader {
    filename: Arc<str>,
    max_depth: usize,
}

impl Reader {
    /// Create a reader whose ranges carry `filename`.
    pub fn new(filename: impl Into<Arc<str>>) -> Self {
        Self {
            filename: filename.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deeply collections may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Read `source` into a [`Node::Document`].
    ///
    /// Line-level syntax errors are collected across the whole source;
    /// structural errors stop at the first one.
    pub fn read(&self, source: &str) -> Result<Node> {
        let tokens = lexer::tokenize(source, &self.filename, self.max_depth)?;
        debug!(filename = self.filename.as_ref(), tokens = tokens.len(); "Tokenized document");
        loader::Loader::new(tokens, Arc::clone(&self.filename), self.max_depth).load()
    }
}

/// Read `source` as a document named `filename`.
///
/// # Example
///
/// ```
/// use trellis_parser::reader::read_document;
///
/// let doc = read_document("hello: world\n", "example.yaml").unwrap();
/// let root = doc.unwrap_document().as_mapping().unwrap();
/// assert_eq!(root.len(), 1);
/// ```
pub fn read_document(source: &str, filename: &str) -> Result<Node> {
    Reader::new(filename).read(source)
}

#[cfg(test)]
mod tests {
    use trellis_core::{
        node::{Mapping, NodeKind, Scalar, Tag},
        position::Pos,
    };

    use super::*;
    use crate::error::ErrorCode;

    fn read(source: &str) -> Node {
        read_document(source, "test.yaml").expect("document should read")
    }

    fn read_err(source: &str) -> Vec<ErrorCode> {
        read_document(source, "test.yaml")
            .expect_err("document should fail")
            .iter()
            .filter_map(|d| d.code())
            .collect()
    }

    fn root(node: &Node) -> &Mapping {
        node.unwrap_document().as_mapping().expect("root mapping")
    }

    fn text<'a>(node: Option<&'a Node>) -> Option<&'a str> {
        node.and_then(Node::as_scalar).map(Scalar::text)
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        let doc = read("# nothing here\n");
        assert_eq!(doc.kind(), NodeKind::Document);
        assert!(root(&doc).is_empty());
    }

    #[test]
    fn test_nested_mapping() {
        let doc = read("foo:\n  fooFirstLabel: bar\n  baz: BAZ\nhello: world\n");
        let root = root(&doc);
        assert_eq!(root.len(), 2);

        let foo = root.get("foo").and_then(Node::as_mapping).unwrap();
        assert_eq!(text(foo.get("fooFirstLabel")), Some("bar"));
        assert_eq!(text(foo.get("baz")), Some("BAZ"));
        assert_eq!(foo.range().start(), Pos::new(2, 3, 7));
        assert_eq!(text(root.get("hello")), Some("world"));
    }

    #[test]
    fn test_sequence_of_mappings() {
        let doc = read("foos:\n  - fooFirstLabel: a\n    baz: one\n  - fooFirstLabel: b\n    baz: two\n");
        let foos = root(&doc).get("foos").and_then(Node::as_sequence).unwrap();
        assert_eq!(foos.len(), 2);

        let second = foos.items()[1].as_mapping().unwrap();
        assert_eq!(text(second.get("fooFirstLabel")), Some("b"));
        assert_eq!(text(second.get("baz")), Some("two"));
    }

    #[test]
    fn test_compact_sequence_at_key_indentation() {
        let doc = read("items:\n- one\n- two\nafter: x\n");
        let root = root(&doc);
        let items = root.get("items").and_then(Node::as_sequence).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(text(root.get("after")), Some("x"));
    }

    #[test]
    fn test_nested_sequences() {
        let doc = read("matrix:\n  - - 1\n    - 2\n  - - 3\n");
        let matrix = root(&doc).get("matrix").and_then(Node::as_sequence).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.items()[0].as_sequence().unwrap().len(), 2);
        assert_eq!(matrix.items()[1].as_sequence().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_values_are_null() {
        let doc = read("a:\nb: 1\nlist:\n  -\n  - x\n");
        let root = root(&doc);
        assert_eq!(root.get("a").and_then(Node::as_scalar).map(Scalar::tag), Some(&Tag::Null));

        let list = root.get("list").and_then(Node::as_sequence).unwrap();
        assert_eq!(list.items()[0].as_scalar().map(Scalar::tag), Some(&Tag::Null));
    }

    #[test]
    fn test_value_on_next_line() {
        let doc = read("a:\n  deeper\n");
        assert_eq!(text(root(&doc).get("a")), Some("deeper"));
    }

    #[test]
    fn test_root_sequence_is_read() {
        let doc = read("- a\n- b\n");
        assert_eq!(doc.unwrap_document().kind(), NodeKind::Sequence);
    }

    #[test]
    fn test_duplicate_key() {
        let err = read_document("a: 1\nb: 2\na: 3\n", "test.yaml").unwrap_err();
        let diag = err.first_error().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E005));
        assert_eq!(diag.subject().unwrap().start().line(), 3);
        assert_eq!(diag.context().unwrap().start().line(), 1);
    }

    #[test]
    fn test_bad_indentation() {
        assert_eq!(read_err("a:\n    b: 1\n  c: 2\n"), [ErrorCode::E002]);
        assert_eq!(read_err("a: 1\n  b: 2\n"), [ErrorCode::E002]);
    }

    #[test]
    fn test_multi_line_plain_scalar_rejected() {
        assert_eq!(read_err("a:\n  one\n  two\n"), [ErrorCode::E003]);
    }

    #[test]
    fn test_max_depth() {
        let source = "a:\n  b:\n    c:\n      d: 1\n";
        let err = Reader::new("deep.yaml").with_max_depth(3).read(source).unwrap_err();
        assert_eq!(err.first_error().and_then(|d| d.code()), Some(ErrorCode::E205));
        assert!(Reader::new("deep.yaml").with_max_depth(4).read(source).is_ok());
    }

    #[test]
    fn test_flow_collections_in_document() {
        let doc = read("hello: [a, b]
limits: {cpu: 2, mem: \"1Gi\"}
");
        let root = root(&doc);

        let hello = root.get("hello").and_then(Node::as_sequence).unwrap();
        let items: Vec<_> = hello.items().iter().filter_map(Node::as_scalar).map(Scalar::text).collect();
        assert_eq!(items, ["a", "b"]);

        let limits = root.get("limits").and_then(Node::as_mapping).unwrap();
        assert_eq!(limits.get("cpu").and_then(Node::as_scalar).map(Scalar::tag), Some(&Tag::Int));
        assert_eq!(text(limits.get("mem")), Some("1Gi"));
    }

    #[test]
    fn test_block_scalar_in_document() {
        let doc = read("hello: |\n  x\nscript: >-\n  one\n  two\nafter: y\n");
        let root = root(&doc);
        assert_eq!(text(root.get("hello")), Some("x\n"));
        assert_eq!(text(root.get("script")), Some("one two"));
        assert_eq!(text(root.get("after")), Some("y"));
        assert_eq!(root.get("hello").unwrap().range().start(), Pos::new(2, 3, 11));
    }

    #[test]
    fn test_alias_copies_anchored_mapping() {
        let doc = read("base: &base\n  port: 80\n  host: local\nother: *base\n");
        let root = root(&doc);
        let base = root.get("base").and_then(Node::as_mapping).unwrap();
        let other = root.get("other").and_then(Node::as_mapping).unwrap();
        assert_eq!(base, other);
        assert_eq!(text(other.get("port")), Some("80"));
    }

    #[test]
    fn test_alias_copies_anchored_scalar() {
        let doc = read("a: &name web\nlist:\n  - *name\n  - &second [1, 2]\nb: *second\n");
        let root = root(&doc);
        let list = root.get("list").and_then(Node::as_sequence).unwrap();
        assert_eq!(list.items()[0].as_scalar().map(Scalar::text), Some("web"));
        assert_eq!(root.get("b").and_then(Node::as_sequence).map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_anchored_empty_value_is_null() {
        let doc = read("a: &empty\nb: *empty\n");
        let b = root(&doc).get("b").and_then(Node::as_scalar).unwrap();
        assert_eq!(b.tag(), &Tag::Null);
    }

    #[test]
    fn test_unknown_alias() {
        let err = read_document("a: *missing\n", "test.yaml").unwrap_err();
        let diag = err.first_error().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E006));
        assert_eq!(diag.subject().unwrap().start(), Pos::new(1, 4, 3));

        // An anchor is only visible after its node.
        assert_eq!(read_err("a: *self\nb: &self 1\n"), [ErrorCode::E006]);
    }

    #[test]
    fn test_alias_expansion_is_bounded() {
        let mut source = String::from("a: &a [x, x, x, x, x, x, x, x, x, x]\n");
        for (name, prev) in [("b", "a"), ("c", "b"), ("d", "c")] {
            source.push_str(&format!("{name}: &{name}\n"));
            for _ in 0..10 {
                source.push_str(&format!("  - *{prev}\n"));
            }
        }
        assert_eq!(read_err(&source), [ErrorCode::E004]);

        let small = "a: &a [x, y]\nb:\n  - *a\n  - *a\n";
        assert_eq!(root(&read(small)).get("b").and_then(Node::as_sequence).map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_max_depth_counts_flow_and_aliases() {
        let flow = "a:\n  b: [[1]]\n";
        let err = Reader::new("deep.yaml").with_max_depth(3).read(flow).unwrap_err();
        assert_eq!(err.first_error().and_then(|d| d.code()), Some(ErrorCode::E205));
        assert!(Reader::new("deep.yaml").with_max_depth(4).read(flow).is_ok());

        let aliased = "a: &a\n  b:\n    c: 1\nd:\n  e: *a\n";
        let err = Reader::new("deep.yaml").with_max_depth(3).read(aliased).unwrap_err();
        assert_eq!(err.first_error().and_then(|d| d.code()), Some(ErrorCode::E205));
        assert!(Reader::new("deep.yaml").with_max_depth(4).read(aliased).is_ok());
    }
}
