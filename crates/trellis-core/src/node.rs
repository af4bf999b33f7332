//! The tagged document tree.
//!
//! A [`Node`] is either a scalar, a mapping, a sequence, or a document wrapper
//! around a single root node. Every node carries the [`Range`] it was read
//! from. Trees are built once and never mutated afterwards; the resolver and
//! decoder only ever borrow them.

use std::{borrow::Cow, fmt, sync::Arc};

use crate::position::{Pos, Range};

/// The type tag attached to a scalar.
///
/// Tags decide how a scalar becomes an expression: strings and templates are
/// parsed for `${...}` interpolation, integers become literals, and raw
/// expressions are handed to the expression parser as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// `!!str`
    Str,
    /// `!!int`
    Int,
    /// `!!tmpl`
    Template,
    /// `!!exp`
    Expr,
    /// `!!bool`
    Bool,
    /// `!!float`
    Float,
    /// `!!null`
    Null,
    /// Any other tag, kept verbatim including its `!` prefix.
    Custom(String),
}

impl Tag {
    /// Parse a tag as written in the source, e.g. `!!int` or `!custom`.
    ///
    /// The long `tag:yaml.org,2002:` form is accepted for the core tags.
    pub fn parse(text: &str) -> Tag {
        let short = text
            .strip_prefix("tag:yaml.org,2002:")
            .or_else(|| text.strip_prefix("!!"));
        match short {
            Some("str") => Tag::Str,
            Some("int") => Tag::Int,
            Some("tmpl") => Tag::Template,
            Some("exp") => Tag::Expr,
            Some("bool") => Tag::Bool,
            Some("float") => Tag::Float,
            Some("null") => Tag::Null,
            _ => Tag::Custom(text.to_string()),
        }
    }

    /// The short source form of this tag.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Tag::Str => Cow::Borrowed("!!str"),
            Tag::Int => Cow::Borrowed("!!int"),
            Tag::Template => Cow::Borrowed("!!tmpl"),
            Tag::Expr => Cow::Borrowed("!!exp"),
            Tag::Bool => Cow::Borrowed("!!bool"),
            Tag::Float => Cow::Borrowed("!!float"),
            Tag::Null => Cow::Borrowed("!!null"),
            Tag::Custom(tag) => Cow::Borrowed(tag.as_str()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// How a scalar was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalarStyle {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|` block scalar.
    Literal,
    /// `>` block scalar.
    Folded,
}

/// The kind of a node, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Mapping,
    Sequence,
    Scalar,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Document => write!(f, "document"),
            NodeKind::Mapping => write!(f, "mapping"),
            NodeKind::Sequence => write!(f, "sequence"),
            NodeKind::Scalar => write!(f, "scalar"),
        }
    }
}

/// A scalar leaf: text plus its type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    text: String,
    tag: Tag,
    style: ScalarStyle,
    range: Range,
}

impl Scalar {
    /// Create a scalar with an explicit source range.
    pub fn new(text: impl Into<String>, tag: Tag, range: Range) -> Self {
        Self {
            text: text.into(),
            tag,
            style: ScalarStyle::Plain,
            range,
        }
    }

    /// Create a plain scalar whose range ends where `text` ends.
    pub fn at(filename: impl Into<Arc<str>>, start: Pos, text: impl Into<String>, tag: Tag) -> Self {
        let text = text.into();
        let range = Range::covering(filename, start, &text);
        Self::new(text, tag, range)
    }

    /// Set the quoting style.
    pub fn with_style(mut self, style: ScalarStyle) -> Self {
        self.style = style;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn style(&self) -> ScalarStyle {
        self.style
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    /// The range of the scalar's content, excluding quotes.
    ///
    /// Positions inside quoted scalars that use escape sequences are
    /// approximate, since escapes are shorter once decoded. Block scalars
    /// start at their first content line; past that line, positions are
    /// approximate too, since indentation is stripped from the text.
    pub fn content_range(&self) -> Range {
        match self.style {
            ScalarStyle::Plain | ScalarStyle::Literal | ScalarStyle::Folded => self.range.clone(),
            ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted => {
                let start = self.range.start().advance("\"");
                Range::covering(self.range.filename_handle(), start, &self.text)
            }
        }
    }
}

/// One `key: value` pair of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: Node,
    value: Node,
}

impl Entry {
    pub fn new(key: Node, value: Node) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &Node {
        &self.key
    }

    pub fn value(&self) -> &Node {
        &self.value
    }

    /// The key text, if the key is a scalar.
    pub fn key_text(&self) -> Option<&str> {
        self.key.as_scalar().map(Scalar::text)
    }

    /// The range from the start of the key to the end of the value.
    pub fn range(&self) -> Range {
        self.key.range().union(self.value.range())
    }
}

/// An ordered list of key/value entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<Entry>,
    range: Range,
}

impl Mapping {
    pub fn new(entries: Vec<Entry>, range: Range) -> Self {
        Self { entries, range }
    }

    /// Create a mapping that starts at `start` and spans to its last entry.
    pub fn spanning(filename: impl Into<Arc<str>>, start: Pos, entries: Vec<Entry>) -> Self {
        let end = entries
            .last()
            .map(|entry| entry.value().range().end())
            .unwrap_or(start);
        Self::new(entries, Range::new(filename, start, end))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the value of the last entry whose key is the scalar `key`.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.key_text() == Some(key))
            .map(Entry::value)
    }
}

/// An ordered list of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    items: Vec<Node>,
    range: Range,
}

impl Sequence {
    pub fn new(items: Vec<Node>, range: Range) -> Self {
        Self { items, range }
    }

    /// Create a sequence that starts at `start` and spans to its last item.
    pub fn spanning(filename: impl Into<Arc<str>>, start: Pos, items: Vec<Node>) -> Self {
        let end = items.last().map(|item| item.range().end()).unwrap_or(start);
        Self::new(items, Range::new(filename, start, end))
    }

    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A document wrapper around a single root node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Box<Node>,
    range: Range,
}

impl Document {
    pub fn new(root: Node) -> Self {
        let range = root.range().clone();
        Self {
            root: Box::new(root),
            range,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn range(&self) -> &Range {
        &self.range
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Document(Document),
    Mapping(Mapping),
    Sequence(Sequence),
    Scalar(Scalar),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Document(_) => NodeKind::Document,
            Node::Mapping(_) => NodeKind::Mapping,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Scalar(_) => NodeKind::Scalar,
        }
    }

    pub fn range(&self) -> &Range {
        match self {
            Node::Document(doc) => doc.range(),
            Node::Mapping(mapping) => mapping.range(),
            Node::Sequence(sequence) => sequence.range(),
            Node::Scalar(scalar) => scalar.range(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Strip any document wrappers, returning the innermost root node.
    pub fn unwrap_document(&self) -> &Node {
        match self {
            Node::Document(doc) => doc.root().unwrap_document(),
            other => other,
        }
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<Mapping> for Node {
    fn from(mapping: Mapping) -> Self {
        Node::Mapping(mapping)
    }
}

impl From<Sequence> for Node {
    fn from(sequence: Sequence) -> Self {
        Node::Sequence(sequence)
    }
}

impl From<Document> for Node {
    fn from(document: Document) -> Self {
        Node::Document(document)
    }
}
