//! Declarative schemas for attribute and block content.
//!
//! A [`Schema`] describes one nesting level of a document: the attributes it
//! may contain and the blocks it may contain. Each [`BlockSpec`] carries its
//! own nested schema, so schemas form a tree mirroring the expected document.
//!
//! Attributes and blocks are kept in declaration order, which makes both
//! resolution and the resulting diagnostics deterministic.
//!
//! # Example
//!
//! ```
//! use trellis_core::schema::{AttributeSpec, BlockSpec, Schema};
//!
//! let schema = Schema::new()
//!     .with_attribute("hello", AttributeSpec::string())
//!     .with_attribute("intval", AttributeSpec::int().with_optional(true))
//!     .with_block(
//!         "foo",
//!         BlockSpec::new()
//!             .with_plural("foos")
//!             .with_label("fooFirstLabel")
//!             .with_attribute("baz", AttributeSpec::string()),
//!     );
//!
//! assert_eq!(schema.block("foo").unwrap().result_key("foo"), "foos");
//! ```

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The declared kind of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Int,
    List,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an unknown [`ValueKind`] name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value kind `{0}`, expected one of: string, int, list, map")]
pub struct UnknownValueKind(String);

impl FromStr for ValueKind {
    type Err = UnknownValueKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ValueKind::String),
            "int" => Ok(ValueKind::Int),
            "list" => Ok(ValueKind::List),
            "map" => Ok(ValueKind::Map),
            other => Err(UnknownValueKind(other.to_string())),
        }
    }
}

/// Specification of a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    kind: ValueKind,
    #[serde(default)]
    optional: bool,
}

impl AttributeSpec {
    /// A required attribute of the given kind.
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            optional: false,
        }
    }

    pub fn string() -> Self {
        Self::new(ValueKind::String)
    }

    pub fn int() -> Self {
        Self::new(ValueKind::Int)
    }

    pub fn list() -> Self {
        Self::new(ValueKind::List)
    }

    pub fn map() -> Self {
        Self::new(ValueKind::Map)
    }

    /// Mark the attribute as optional (or required again).
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// The attributes and blocks expected at one nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    attributes: IndexMap<String, AttributeSpec>,
    #[serde(default)]
    blocks: IndexMap<String, BlockSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute. Redeclaring a name replaces the earlier spec.
    pub fn with_attribute(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attributes.insert(name.into(), spec);
        self
    }

    /// Declare a block type. Redeclaring a name replaces the earlier spec.
    pub fn with_block(mut self, name: impl Into<String>, spec: BlockSpec) -> Self {
        self.blocks.insert(name.into(), spec);
        self
    }

    pub fn attributes(&self) -> &IndexMap<String, AttributeSpec> {
        &self.attributes
    }

    pub fn blocks(&self) -> &IndexMap<String, BlockSpec> {
        &self.blocks
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.get(name)
    }

    pub fn block(&self, name: &str) -> Option<&BlockSpec> {
        self.blocks.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.blocks.is_empty()
    }
}

/// Specification of a block type: its labels, cardinality and nested schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Alternative key under which a sequence of instances may be given.
    /// Also the key the decoded instances are stored under.
    #[serde(default)]
    plural: Option<String>,

    /// Keys whose scalar values become the block's labels, in this order.
    #[serde(default)]
    labels: Vec<String>,

    #[serde(default)]
    singleton: bool,

    #[serde(default)]
    optional: bool,

    #[serde(flatten)]
    body: Schema,
}

impl BlockSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = Some(plural.into());
        self
    }

    /// Append a label name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Declare an attribute of the block body.
    pub fn with_attribute(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.body = self.body.with_attribute(name, spec);
        self
    }

    /// Declare a nested block type of the block body.
    pub fn with_block(mut self, name: impl Into<String>, spec: BlockSpec) -> Self {
        self.body = self.body.with_block(name, spec);
        self
    }

    /// Replace the whole nested schema.
    pub fn with_body(mut self, body: Schema) -> Self {
        self.body = body;
        self
    }

    pub fn plural(&self) -> Option<&str> {
        self.plural.as_deref()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The schema of each instance's body.
    pub fn body(&self) -> &Schema {
        &self.body
    }

    /// Whether `key` names this block type, either directly or via its plural.
    pub fn matches(&self, name: &str, key: &str) -> bool {
        key == name || self.plural() == Some(key)
    }

    /// The key decoded instances of block `name` are stored under.
    pub fn result_key<'a>(&'a self, name: &'a str) -> &'a str {
        self.plural().unwrap_or(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_from_str() {
        assert_eq!("int".parse::<ValueKind>(), Ok(ValueKind::Int));
        let err = "float".parse::<ValueKind>().unwrap_err();
        assert!(err.to_string().contains("`float`"));
    }

    #[test]
    fn test_builder_keeps_declaration_order() {
        let schema = Schema::new()
            .with_attribute("zeta", AttributeSpec::string())
            .with_attribute("alpha", AttributeSpec::int())
            .with_attribute("mid", AttributeSpec::list());
        let names: Vec<_> = schema.attributes().keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_result_key_prefers_plural() {
        let foo = BlockSpec::new().with_plural("foos");
        let hoge = BlockSpec::new();
        assert_eq!(foo.result_key("foo"), "foos");
        assert_eq!(hoge.result_key("hoge"), "hoge");
        assert!(foo.matches("foo", "foos"));
        assert!(foo.matches("foo", "foo"));
        assert!(!hoge.matches("hoge", "hoges"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let source = r#"
            [attributes.hello]
            kind = "string"

            [attributes.intval]
            kind = "int"
            optional = true

            [blocks.foo]
            plural = "foos"
            labels = ["fooFirstLabel"]

            [blocks.foo.attributes.baz]
            kind = "string"

            [blocks.hoge]
            singleton = true

            [blocks.hoge.attributes.fuga]
            kind = "string"
        "#;

        let schema: Schema = toml::from_str(source).expect("schema should deserialize");

        assert_eq!(schema.attribute("hello"), Some(&AttributeSpec::string()));
        assert!(schema.attribute("intval").unwrap().is_optional());

        let foo = schema.block("foo").unwrap();
        assert_eq!(foo.plural(), Some("foos"));
        assert_eq!(foo.labels(), ["fooFirstLabel"]);
        assert_eq!(foo.body().attribute("baz"), Some(&AttributeSpec::string()));

        let hoge = schema.block("hoge").unwrap();
        assert!(hoge.is_singleton());
        assert!(!hoge.is_optional());
    }
}
