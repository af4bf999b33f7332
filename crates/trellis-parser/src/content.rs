//! Matching a document body against a schema.
//!
//! [`Resolver::resolve`] checks the shape of one mapping: every required
//! attribute and block is present, blocks have their labels, and singleton
//! blocks appear at most once. Attribute values become [`Expression`]s;
//! block bodies are kept as nodes and resolved later against the block's
//! own schema. Keys the schema does not mention are recorded, not rejected;
//! the decoder decides what to do with them.
//!
//! Resolution stops at the first error.

use indexmap::IndexMap;
use log::debug;
use trellis_core::{
    node::{Entry, Mapping, Node, NodeKind},
    position::Range,
    schema::{BlockSpec, Schema},
};

use crate::{
    DEFAULT_MAX_DEPTH,
    error::{Diagnostic, Diagnostics, ErrorCode, Result},
    expression::{Expression, ExpressionBuilder, non_scalar_key},
};

/// An attribute found in the document.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    expression: Expression,
    key_range: Range,
}

impl Attribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Where the attribute's key is written.
    pub fn key_range(&self) -> &Range {
        &self.key_range
    }

    /// The key and its value together.
    pub fn range(&self) -> Range {
        self.key_range.union(self.expression.range())
    }
}

/// A label value taken from a block instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    name: String,
    value: String,
    range: Range,
}

impl Label {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn range(&self) -> &Range {
        &self.range
    }
}

/// One instance of a block, with its body still unresolved.
#[derive(Debug, Clone)]
pub struct Block {
    kind: String,
    labels: Vec<Label>,
    body: Node,
}

impl Block {
    /// The block's schema name. Instances found under the plural key still
    /// carry the singular name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label_values(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.value.clone()).collect()
    }

    pub fn body(&self) -> &Node {
        &self.body
    }

    pub fn range(&self) -> &Range {
        self.body.range()
    }
}

/// A key present in the document but not declared in the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownKey {
    name: String,
    range: Range,
}

impl UnknownKey {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &Range {
        &self.range
    }
}

/// The result of resolving one body.
#[derive(Debug, Clone)]
pub struct Content {
    attributes: IndexMap<String, Attribute>,
    blocks: Vec<Block>,
    unknown: Vec<UnknownKey>,
    range: Range,
}

impl Content {
    /// Attributes present in the document, in schema order.
    pub fn attributes(&self) -> &IndexMap<String, Attribute> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Block instances, grouped by schema order and in document order
    /// within one block type.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Instances of the block named `kind`.
    pub fn blocks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |block| block.kind == kind)
    }

    /// Keys no attribute, block or label accounts for, in document order.
    pub fn unknown_keys(&self) -> &[UnknownKey] {
        &self.unknown
    }

    pub fn range(&self) -> &Range {
        &self.range
    }
}

/// Document keys by name, plus the order they were written in.
struct KeyIndex<'a> {
    entries: IndexMap<&'a str, &'a Entry>,
}

impl<'a> KeyIndex<'a> {
    /// Index the keys of `mapping`.
    ///
    /// A non-scalar key is an error whose context spans its neighbours.
    fn new(mapping: &'a Mapping) -> Result<Self> {
        let mut entries = IndexMap::with_capacity(mapping.len());
        let all = mapping.entries();
        for (idx, entry) in all.iter().enumerate() {
            let Some(key) = entry.key_text() else {
                let mut context = entry.range();
                if let Some(before) = idx.checked_sub(1).and_then(|i| all.get(i)) {
                    context = before.range().union(&context);
                }
                if let Some(after) = all.get(idx + 1) {
                    context = context.union(&after.range());
                }
                return Err(non_scalar_key(entry.key()).with_context(context).into());
            };
            // A later duplicate replaces the earlier one.
            entries.insert(key, entry);
        }
        Ok(Self { entries })
    }

    fn get(&self, key: &str) -> Option<&'a Entry> {
        self.entries.get(key).copied()
    }

    fn names(&self) -> Vec<&'a str> {
        self.entries.keys().copied().collect()
    }
}

/// Resolves bodies against schemas.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    builder: ExpressionBuilder,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Resolver {
    pub fn new(max_depth: usize) -> Self {
        Self {
            builder: ExpressionBuilder::new(max_depth),
        }
    }

    /// Resolve a root body.
    pub fn resolve(&self, schema: &Schema, node: &Node) -> Result<Content> {
        self.resolve_body(schema, node, &[])
    }

    /// Resolve a block body whose label keys are `labels`.
    ///
    /// Label keys are not reported as unknown.
    pub fn resolve_block(&self, spec: &BlockSpec, block: &Block) -> Result<Content> {
        self.resolve_body(spec.body(), block.body(), spec.labels())
    }

    fn resolve_body(&self, schema: &Schema, node: &Node, labels: &[String]) -> Result<Content> {
        let node = node.unwrap_document();
        let Some(mapping) = node.as_mapping() else {
            return Err(Diagnostic::error(format!(
                "unexpected {}, expected a mapping",
                node.kind()
            ))
            .with_code(ErrorCode::E200)
            .with_subject(node.range().clone())
            .with_detail(format!("a body must be a {}", NodeKind::Mapping))
            .into());
        };

        let index = KeyIndex::new(mapping)?;
        let mut consumed: Vec<&str> = labels.iter().map(String::as_str).collect();

        let mut attributes = IndexMap::new();
        for (name, spec) in schema.attributes() {
            let Some(entry) = index.get(name) else {
                if spec.is_optional() {
                    continue;
                }
                return Err(Diagnostic::error(format!(
                    "no mapping found for expected attribute \"{name}\""
                ))
                .with_code(ErrorCode::E300)
                .with_subject(mapping.range().clone())
                .with_detail(format!("add a `{name}` key of kind {}", spec.kind()))
                .into());
            };

            let expression = self.builder.build(entry.value())?;
            debug!(attribute = name.as_str(); "Resolved attribute");
            consumed.push(name.as_str());
            attributes.insert(
                name.clone(),
                Attribute {
                    name: name.clone(),
                    expression,
                    key_range: entry.key().range().clone(),
                },
            );
        }

        let mut blocks = Vec::new();
        for (name, spec) in schema.blocks() {
            let Some((key, entry)) = find_block(&index, name, spec, mapping)? else {
                continue;
            };
            consumed.push(key);

            let instances = block_instances(name, entry)?;
            if spec.is_singleton() && instances.len() > 1 {
                return Err(Diagnostic::error(format!(
                    "too many \"{name}\" blocks; singleton requires at most one"
                ))
                .with_code(ErrorCode::E303)
                .with_subject(instances[1].range().clone())
                .with_context(entry.range())
                .with_detail(format!("found {} instances", instances.len()))
                .into());
            }

            for instance in instances {
                let labels = extract_labels(name, spec, instance)?;
                debug!(block = name.as_str(), labels = labels.len(); "Resolved block");
                blocks.push(Block {
                    kind: name.clone(),
                    labels,
                    body: instance.clone(),
                });
            }
        }

        let unknown = mapping
            .entries()
            .iter()
            .filter_map(|entry| {
                let key = entry.key_text()?;
                (!consumed.contains(&key)).then(|| UnknownKey {
                    name: key.to_string(),
                    range: entry.key().range().clone(),
                })
            })
            .collect();

        Ok(Content {
            attributes,
            blocks,
            unknown,
            range: mapping.range().clone(),
        })
    }
}

/// Resolve `node` against `schema` with the default depth limit.
pub fn resolve(schema: &Schema, node: &Node) -> Result<Content> {
    Resolver::default().resolve(schema, node)
}

/// Find the entry for block `name`, trying its plural when the name is absent.
///
/// Returns `None` for an absent optional block. Giving both keys is an error.
fn find_block<'a>(
    index: &KeyIndex<'a>,
    name: &str,
    spec: &BlockSpec,
    mapping: &Mapping,
) -> Result<Option<(&'a str, &'a Entry)>> {
    let singular = index.get(name);
    let plural = spec.plural().and_then(|p| index.get(p));

    match (singular, plural) {
        (Some(first), Some(second)) => Err(Diagnostic::error(format!(
            "block \"{name}\" is given both as \"{name}\" and as \"{}\"",
            spec.result_key(name)
        ))
        .with_code(ErrorCode::E306)
        .with_subject(second.key().range().clone())
        .with_context(first.key().range().clone())
        .with_detail("use one key or the other")
        .into()),
        (Some(entry), None) | (None, Some(entry)) => Ok(entry.key_text().map(|key| (key, entry))),
        (None, None) if spec.is_optional() => Ok(None),
        (None, None) => {
            let detail = match spec.plural() {
                Some(plural) => format!("expected a \"{name}\" or \"{plural}\" key"),
                None => format!("expected a \"{name}\" key"),
            };
            Err(Diagnostic::error(format!("no mapping found for expected block \"{name}\""))
                .with_code(ErrorCode::E301)
                .with_subject(mapping.range().clone())
                .with_detail(detail)
                .into())
        }
    }
}

/// The instance nodes of a block: one mapping, or every item of a sequence.
fn block_instances<'a>(name: &str, entry: &'a Entry) -> Result<Vec<&'a Node>> {
    let value = entry.value();
    match value {
        Node::Mapping(_) => Ok(vec![value]),
        Node::Sequence(sequence) => sequence
            .items()
            .iter()
            .map(|item| match item {
                Node::Mapping(_) => Ok(item),
                other => Err(unsupported_block_kind(name, other)),
            })
            .collect(),
        other => Err(unsupported_block_kind(name, other)),
    }
}

fn unsupported_block_kind(name: &str, node: &Node) -> Diagnostics {
    Diagnostic::error(format!(
        "unsupported node kind for block \"{name}\": {}",
        node.kind()
    ))
    .with_code(ErrorCode::E202)
    .with_subject(node.range().clone())
    .with_detail(format!(
        "a block is a {} or a {} of mappings",
        NodeKind::Mapping,
        NodeKind::Sequence
    ))
    .into()
}

/// Read the labels of one instance, in schema order.
fn extract_labels(name: &str, spec: &BlockSpec, instance: &Node) -> Result<Vec<Label>> {
    let Some(mapping) = instance.as_mapping() else {
        return Err(unsupported_block_kind(name, instance));
    };
    let index = KeyIndex::new(mapping)?;

    spec.labels()
        .iter()
        .map(|label| -> Result<Label> {
            let Some(entry) = index.get(label) else {
                let available = index.names();
                let detail = if available.is_empty() {
                    "the block is empty".to_string()
                } else {
                    format!("available keys: {}", available.join(", "))
                };
                return Err(Diagnostic::error(format!(
                    "missing label \"{label}\" for block \"{name}\""
                ))
                .with_code(ErrorCode::E302)
                .with_subject(mapping.range().clone())
                .with_detail(detail)
                .into());
            };

            let Some(scalar) = entry.value().as_scalar() else {
                return Err(Diagnostic::error(format!(
                    "label \"{label}\" of block \"{name}\" must be a scalar"
                ))
                .with_code(ErrorCode::E305)
                .with_subject(entry.value().range().clone())
                .with_context(entry.range())
                .into());
            };

            Ok(Label {
                name: label.clone(),
                value: scalar.text().to_string(),
                range: scalar.range().clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use trellis_core::{
        node::{Scalar, Sequence, Tag},
        position::Pos,
        schema::AttributeSpec,
    };

    use super::*;
    use crate::reader::read_document;

    fn schema() -> Schema {
        Schema::new()
            .with_attribute("hello", AttributeSpec::string())
            .with_attribute("intval", AttributeSpec::int().with_optional(true))
            .with_block(
                "foo",
                BlockSpec::new()
                    .with_plural("foos")
                    .with_label("fooFirstLabel")
                    .with_attribute("baz", AttributeSpec::string()),
            )
            .with_block(
                "hoge",
                BlockSpec::new().with_attribute("fuga", AttributeSpec::string()),
            )
    }

    fn resolve_str(schema: &Schema, source: &str) -> Result<Content> {
        let doc = read_document(source, "test.yaml").expect("document should read");
        resolve(schema, &doc)
    }

    fn code(err: &Diagnostics) -> Option<ErrorCode> {
        err.first_error().and_then(Diagnostic::code)
    }

    #[test]
    fn test_resolve_full_document() {
        let source = "foo:\n  fooFirstLabel: bar\n  baz: BAZ\nhoge:\n  fuga: FUGA\nhello: world\n";
        let content = resolve_str(&schema(), source).unwrap();

        assert!(content.attribute("hello").is_some());
        assert!(content.attribute("intval").is_none());
        assert_eq!(content.blocks().len(), 2);

        let foo = content.blocks_of("foo").next().unwrap();
        assert_eq!(foo.label_values(), ["bar"]);
        assert!(content.unknown_keys().is_empty());
    }

    #[test]
    fn test_plural_sequence_keeps_document_order() {
        let source = "foos:\n  - fooFirstLabel: a\n    baz: 1\n  - fooFirstLabel: b\n    baz: 2\nhoge: {}\nhello: x\n";
        let schema = Schema::new()
            .with_attribute("hello", AttributeSpec::string())
            .with_block("foo", schema().block("foo").unwrap().clone())
            .with_block("hoge", BlockSpec::new());
        let content = resolve_str(&schema, source).unwrap();
        let labels: Vec<_> = content.blocks_of("foo").map(Block::label_values).collect();
        assert_eq!(labels, [["a"], ["b"]]);
    }

    #[test]
    fn test_missing_required_attribute() {
        let err = resolve_str(&schema(), "foo:\n  fooFirstLabel: x\nhoge: {}\n").unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::E300));
        assert!(err.first_error().unwrap().summary().contains("\"hello\""));
    }

    #[test]
    fn test_missing_required_block() {
        let err = resolve_str(&schema(), "hello: x\nhoge: {}\n").unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::E301));
        assert_eq!(
            err.first_error().unwrap().detail(),
            Some("expected a \"foo\" or \"foos\" key")
        );
    }

    #[test]
    fn test_optional_block_may_be_absent() {
        let schema = Schema::new().with_block("extra", BlockSpec::new().with_optional(true));
        let content = resolve_str(&schema, "name: x\n").unwrap();
        assert!(content.blocks().is_empty());
        assert_eq!(content.unknown_keys().len(), 1);
    }

    #[test]
    fn test_missing_label_lists_available_keys() {
        let err = resolve_str(&schema(), "hello: x\nfoo:\n  baz: B\n  other: O\nhoge: {}\n").unwrap_err();
        let diag = err.first_error().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E302));
        assert_eq!(diag.detail(), Some("available keys: baz, other"));
    }

    #[test]
    fn test_singleton_rejects_two_instances() {
        let schema = Schema::new().with_block(
            "server",
            BlockSpec::new().with_plural("servers").with_singleton(true),
        );
        let err = resolve_str(&schema, "servers:\n  - {}\n  - {}\n").unwrap_err();
        let diag = err.first_error().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E303));
        assert!(diag.summary().contains("server"));
        assert!(diag.summary().contains("singleton"));

        assert!(resolve_str(&schema, "servers:\n  - {}\n").is_ok());
    }

    #[test]
    fn test_block_of_wrong_kind() {
        let err = resolve_str(&schema(), "hello: x\nfoo: scalar\nhoge: {}\n").unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::E202));

        let err = resolve_str(&schema(), "hello: x\nfoos:\n  - 1\nhoge: {}\n").unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::E202));
    }

    #[test]
    fn test_both_singular_and_plural() {
        let source = "hello: x\nfoo:\n  fooFirstLabel: a\nfoos: []\nhoge: {}\n";
        let err = resolve_str(&schema(), source).unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::E306));
    }

    #[test]
    fn test_root_must_be_mapping() {
        let err = resolve_str(&schema(), "- a\n- b\n").unwrap_err();
        let diag = err.first_error().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E200));
        assert!(diag.summary().contains("sequence"));
    }

    #[test]
    fn test_unknown_keys_are_recorded() {
        let source = "hello: x\nfoo:\n  fooFirstLabel: a\nhoge: {}\nextra: 1\nmore: 2\n";
        let content = resolve_str(&schema(), source).unwrap();
        let names: Vec<_> = content.unknown_keys().iter().map(UnknownKey::name).collect();
        assert_eq!(names, ["extra", "more"]);
    }

    #[test]
    fn test_block_body_ignores_label_keys() {
        let source = "hello: x\nfoo:\n  fooFirstLabel: a\n  baz: B\nhoge: {}\n";
        let schema = schema();
        let content = resolve_str(&schema, source).unwrap();
        let foo = content.blocks_of("foo").next().unwrap();
        let body = Resolver::default()
            .resolve_block(schema.block("foo").unwrap(), foo)
            .unwrap();
        assert!(body.attribute("baz").is_some());
        assert!(body.unknown_keys().is_empty());
    }

    fn scalar(line: usize, column: usize, byte: usize, text: &str) -> Node {
        Scalar::at("f", Pos::new(line, column, byte), text, Tag::Str).into()
    }

    #[test]
    fn test_non_scalar_key_context_spans_neighbours() {
        // a: x
        // {k: v}: y
        // b: z
        let key: Node = Mapping::new(
            vec![Entry::new(scalar(2, 2, 6, "k"), scalar(2, 5, 9, "v"))],
            Range::new("f", Pos::new(2, 1, 5), Pos::new(2, 7, 11)),
        )
        .into();
        let mapping = Mapping::spanning(
            "f",
            Pos::START,
            vec![
                Entry::new(scalar(1, 1, 0, "a"), scalar(1, 4, 3, "x")),
                Entry::new(key, scalar(2, 9, 13, "y")),
                Entry::new(scalar(3, 1, 15, "b"), scalar(3, 4, 18, "z")),
            ],
        );

        let err = resolve(&schema(), &mapping.into()).unwrap_err();
        let diag = err.first_error().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E201));

        let subject = diag.subject().unwrap();
        assert_eq!(subject.start(), Pos::new(2, 1, 5));
        assert_eq!(subject.end(), Pos::new(2, 7, 11));

        let context = diag.context().unwrap();
        assert_eq!(context.start(), Pos::new(1, 1, 0));
        assert_eq!(context.end(), Pos::new(3, 5, 19));
    }

    #[test]
    fn test_non_scalar_key_first_entry() {
        let key: Node = Sequence::spanning("f", Pos::START, vec![scalar(1, 3, 2, "k")]).into();
        let mapping = Mapping::spanning(
            "f",
            Pos::START,
            vec![
                Entry::new(key, scalar(1, 7, 6, "y")),
                Entry::new(scalar(2, 1, 8, "b"), scalar(2, 4, 11, "z")),
            ],
        );

        let err = resolve(&schema(), &mapping.into()).unwrap_err();
        let diag = err.first_error().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E201));
        assert_eq!(diag.context().unwrap().start(), Pos::START);
        assert_eq!(diag.context().unwrap().end(), Pos::new(2, 5, 12));
    }
}
