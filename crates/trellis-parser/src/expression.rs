//! Lazily evaluated expressions built from document nodes.
//!
//! Scalars become literals or syntax trees depending on their tag; mappings
//! and sequences become composite expressions whose children are built once
//! and evaluated on demand. Evaluating a composite never revisits the node
//! tree it was built from.

use indexmap::IndexMap;
use log::trace;
use trellis_core::{
    node::{Mapping, Node, Scalar, Sequence, Tag},
    position::Range,
    value::{Value, ValueMap},
};

use crate::{
    DEFAULT_MAX_DEPTH,
    error::{Diagnostic, Diagnostics, ErrorCode, Result},
    syntax::{self, EvalContext, SyntaxTree, Traversal},
};

/// An expression ready to be evaluated against an [`EvalContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A value known without evaluation (`!!int`, `!!bool`, `!!float`, `!!null`).
    Literal { value: Value, range: Range },
    /// A string template (`!!str`, `!!tmpl`).
    Template(SyntaxTree),
    /// A bare expression (`!!exp`).
    Raw(SyntaxTree),
    Mapping {
        entries: IndexMap<String, Expression>,
        range: Range,
    },
    Sequence { items: Vec<Expression>, range: Range },
}

impl Expression {
    /// The document range this expression was built from.
    pub fn range(&self) -> &Range {
        match self {
            Expression::Literal { range, .. }
            | Expression::Mapping { range, .. }
            | Expression::Sequence { range, .. } => range,
            Expression::Template(tree) | Expression::Raw(tree) => tree.range(),
        }
    }

    /// Evaluate against `ctx`.
    ///
    /// Composites evaluate their children in order and stop at the first
    /// failure; no partial value is produced.
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<Value> {
        match self {
            Expression::Literal { value, .. } => Ok(value.clone()),
            Expression::Template(tree) | Expression::Raw(tree) => tree.evaluate(ctx),
            Expression::Mapping { entries, .. } => {
                let mut map = ValueMap::with_capacity(entries.len());
                for (key, expression) in entries {
                    map.insert(key.clone(), expression.evaluate(ctx)?);
                }
                Ok(Value::Map(map))
            }
            Expression::Sequence { items, .. } => items
                .iter()
                .map(|item| item.evaluate(ctx))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
        }
    }

    /// Every variable this expression references, in source order.
    pub fn variables(&self) -> Vec<Traversal> {
        match self {
            Expression::Literal { .. } => Vec::new(),
            Expression::Template(tree) | Expression::Raw(tree) => tree.variables(),
            Expression::Mapping { entries, .. } => {
                entries.values().flat_map(Expression::variables).collect()
            }
            Expression::Sequence { items, .. } => items.iter().flat_map(Expression::variables).collect(),
        }
    }
}

/// Builds [`Expression`]s from nodes, refusing to nest past a depth limit.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionBuilder {
    max_depth: usize,
}

impl Default for ExpressionBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl ExpressionBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn build(&self, node: &Node) -> Result<Expression> {
        self.node(node, 0)
    }

    fn node(&self, node: &Node, depth: usize) -> Result<Expression> {
        if depth > self.max_depth {
            return Err(Diagnostic::error(format!(
                "value nests deeper than {} levels",
                self.max_depth
            ))
            .with_code(ErrorCode::E205)
            .with_subject(node.range().clone())
            .into());
        }

        match node {
            Node::Document(document) => self.node(document.root(), depth),
            Node::Scalar(scalar) => scalar_expression(scalar),
            Node::Mapping(mapping) => self.mapping(mapping, depth),
            Node::Sequence(sequence) => self.sequence(sequence, depth),
        }
    }

    fn mapping(&self, mapping: &Mapping, depth: usize) -> Result<Expression> {
        let mut entries = IndexMap::with_capacity(mapping.len());
        for entry in mapping.entries() {
            let Some(key) = entry.key_text() else {
                return Err(non_scalar_key(entry.key()).into());
            };
            let value = self.node(entry.value(), depth + 1)?;
            entries.insert(key.to_string(), value);
        }
        Ok(Expression::Mapping {
            entries,
            range: mapping.range().clone(),
        })
    }

    fn sequence(&self, sequence: &Sequence, depth: usize) -> Result<Expression> {
        let items = sequence
            .items()
            .iter()
            .map(|item| self.node(item, depth + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(Expression::Sequence {
            items,
            range: sequence.range().clone(),
        })
    }
}

/// Build an expression for `node` with the default depth limit.
///
/// # Example
///
/// ```
/// use trellis_core::{node::{Scalar, Tag}, position::Pos, value::Value};
/// use trellis_parser::{expression::build_expression, syntax::EvalContext};
///
/// let node = Scalar::at("inline", Pos::START, "1 + 2", Tag::Expr).into();
/// let expression = build_expression(&node).unwrap();
/// assert_eq!(expression.evaluate(&EvalContext::new()).unwrap(), Value::Int(3));
/// ```
pub fn build_expression(node: &Node) -> Result<Expression> {
    ExpressionBuilder::default().build(node)
}

pub(crate) fn non_scalar_key(key: &Node) -> Diagnostic {
    Diagnostic::error("mapping key must be a scalar")
        .with_code(ErrorCode::E201)
        .with_subject(key.range().clone())
        .with_detail(format!("found a {} used as a key", key.kind()))
}

fn scalar_expression(scalar: &Scalar) -> Result<Expression> {
    let range = scalar.range().clone();
    let literal = |value: Value| -> Result<Expression> {
        Ok(Expression::Literal {
            value,
            range: range.clone(),
        })
    };
    trace!(tag:% = scalar.tag(), text = scalar.text(); "Building scalar expression");

    match scalar.tag() {
        Tag::Str | Tag::Template => {
            syntax::parse_template(scalar.text(), &scalar.content_range()).map(Expression::Template)
        }
        Tag::Expr => syntax::parse_expression(scalar.text(), &scalar.content_range()).map(Expression::Raw),
        Tag::Int => match parse_int(scalar.text()) {
            Some(i) => literal(Value::Int(i)),
            None => Err(Diagnostic::error(format!("invalid integer \"{}\"", scalar.text()))
                .with_code(ErrorCode::E204)
                .with_subject(range.clone())
                .into()),
        },
        Tag::Bool => match scalar.text() {
            "true" | "True" | "TRUE" => literal(Value::Bool(true)),
            "false" | "False" | "FALSE" => literal(Value::Bool(false)),
            text => Err(invalid_for_tag(scalar, text)),
        },
        Tag::Float => match parse_float(scalar.text()) {
            Some(f) => literal(Value::Float(f)),
            None => Err(invalid_for_tag(scalar, scalar.text())),
        },
        Tag::Null => literal(Value::Null),
        Tag::Custom(tag) => Err(Diagnostic::error(format!("unsupported scalar tag `{tag}`"))
            .with_code(ErrorCode::E203)
            .with_subject(range.clone())
            .with_detail("supported tags are !!str, !!int, !!tmpl, !!exp, !!bool, !!float and !!null")
            .into()),
    }
}

fn invalid_for_tag(scalar: &Scalar, text: &str) -> Diagnostics {
    Diagnostic::error(format!("cannot read \"{text}\" as {}", scalar.tag()))
        .with_code(ErrorCode::E203)
        .with_subject(scalar.range().clone())
        .into()
}

/// Decimal integers with an optional sign.
fn parse_int(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use trellis_core::position::Pos;

    use super::*;
    use crate::reader::read_document;

    fn ctx() -> EvalContext {
        let var: Value = [("one", Value::from("ONE"))].into_iter().collect();
        EvalContext::new().with_variable("var", var).with_stdlib()
    }

    fn attribute(source: &str, key: &str) -> Expression {
        let doc = read_document(source, "test.yaml").unwrap();
        let root = doc.unwrap_document().as_mapping().unwrap();
        build_expression(root.get(key).unwrap()).unwrap()
    }

    fn scalar(text: &str, tag: Tag) -> Node {
        Scalar::at("test.yaml", Pos::START, text, tag).into()
    }

    #[test]
    fn test_template_scalar() {
        let expression = attribute("a: \"x${var.one}y\"\n", "a");
        assert!(matches!(expression, Expression::Template(_)));
        assert_eq!(expression.evaluate(&ctx()).unwrap(), Value::from("xONEy"));
    }

    #[test]
    fn test_raw_expression_scalar() {
        let expression = attribute("a: !!exp 1 + 2\n", "a");
        assert!(matches!(expression, Expression::Raw(_)));
        assert_eq!(expression.evaluate(&ctx()).unwrap(), Value::Int(3));

        let expression = attribute("a: !!exp 'list(map(\"a\", \"x${var.one}y\"))'\n", "a");
        let value = expression.evaluate(&ctx()).unwrap();
        let first = &value.as_list().unwrap()[0];
        assert_eq!(first.as_map().unwrap().get("a"), Some(&Value::from("xONEy")));
    }

    #[test]
    fn test_int_scalar() {
        assert_eq!(
            build_expression(&scalar("-42", Tag::Int)).unwrap().evaluate(&ctx()).unwrap(),
            Value::Int(-42)
        );

        let err = build_expression(&scalar("4x", Tag::Int)).unwrap_err();
        let diag = err.first_error().unwrap();
        assert_eq!(diag.code(), Some(ErrorCode::E204));
        assert_eq!(diag.subject().unwrap().len(), 2);
    }

    #[test]
    fn test_other_scalar_tags() {
        let value = build_expression(&scalar("1.5", Tag::Float))
            .unwrap()
            .evaluate(&ctx())
            .unwrap();
        assert!(approx_eq!(f64, value.as_f64().unwrap(), 1.5));
        assert_eq!(
            build_expression(&scalar("True", Tag::Bool)).unwrap().evaluate(&ctx()).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            build_expression(&scalar("~", Tag::Null)).unwrap().evaluate(&ctx()).unwrap(),
            Value::Null
        );

        let err = build_expression(&scalar("x", Tag::Custom("!color".to_string()))).unwrap_err();
        assert_eq!(err.first_error().and_then(Diagnostic::code), Some(ErrorCode::E203));
    }

    #[test]
    fn test_mapping_expression() {
        let expression = attribute("map1:\n  foo: \"x${var.one}y\"\n  n: 2\n", "map1");
        let value = expression.evaluate(&ctx()).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("foo"), Some(&Value::from("xONEy")));
        assert_eq!(map.get("n"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_sequence_of_mappings() {
        let expression = attribute("ary1:\n  - a: \"x${var.one}y\"\n  - a: plain\n", "ary1");
        let value = expression.evaluate(&ctx()).unwrap();
        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_map().unwrap().get("a"), Some(&Value::from("xONEy")));
    }

    #[test]
    fn test_composite_fails_fast() {
        let expression = attribute("list:\n  - ${var.missing}\n  - ${nope}\n", "list");
        let err = expression.evaluate(&ctx()).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first_error().and_then(Diagnostic::code), Some(ErrorCode::E401));
    }

    #[test]
    fn test_variables_are_collected_from_children() {
        let expression = attribute("m:\n  a: ${var.one}\n  b:\n    - ${env.home}\n", "m");
        let names: Vec<String> = expression.variables().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["var.one", "env.home"]);
    }

    #[test]
    fn test_error_range_inside_quoted_scalar() {
        let expression = attribute("a: \"x${var.two}\"\n", "a");
        let err = expression.evaluate(&ctx()).unwrap_err();
        let subject = err.first_error().unwrap().subject().unwrap();
        // `var.two` starts after `a: "x${`
        assert_eq!(subject.start().column(), 8);
    }
}
