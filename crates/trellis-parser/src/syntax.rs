//! The expression language embedded in document scalars.
//!
//! Two entry points share one grammar:
//!
//! - [`parse_template`] reads literal text with `${ expr }` holes, used for
//!   plain and `!!tmpl` scalars
//! - [`parse_expression`] reads a single bare expression, used for `!!exp`
//!   scalars
//!
//! Both return a [`SyntaxTree`] that remembers where its text came from, so
//! parse and evaluation errors point into the original document.
//!
//! # Example
//!
//! ```
//! use trellis_core::{position::{Pos, Range}, value::Value};
//! use trellis_parser::syntax::{EvalContext, parse_expression};
//!
//! let origin = Range::covering("inline", Pos::START, "1 + 2");
//! let tree = parse_expression("1 + 2", &origin).unwrap();
//! assert_eq!(tree.evaluate(&EvalContext::new()).unwrap(), Value::Int(3));
//! ```

mod ast;
mod context;
mod eval;
mod function;
mod parser;
pub mod stdlib;

use std::{fmt, sync::Arc};

use log::trace;
use trellis_core::{position::Range, value::Value};

pub use ast::{BinaryOp, Expr, Span, TemplatePart, UnaryOp};
pub use context::EvalContext;
pub use function::{Function, FunctionError};

use crate::error::{Diagnostic, Diagnostics};

/// A parsed expression together with its source text and location.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    root: Expr,
    text: Arc<str>,
    origin: Range,
}

impl SyntaxTree {
    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// The source text the tree was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The document range the source text occupies.
    pub fn range(&self) -> &Range {
        &self.origin
    }

    /// Map a span of the source text onto the document.
    pub fn range_of(&self, span: Span) -> Range {
        self.origin.sub_range(&self.text, span.range())
    }

    /// Evaluate the tree against `ctx`.
    ///
    /// A failure is reported as a single error whose subject is the
    /// sub-expression that failed and whose context is the whole expression.
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<Value, Diagnostics> {
        trace!(range:% = self.origin; "Evaluating expression");
        eval::Evaluator::new(ctx).eval(&self.root).map_err(|err| {
            let mut diagnostic = Diagnostic::error(err.message)
                .with_code(err.code)
                .with_subject(self.range_of(err.span))
                .with_context(self.origin.clone());
            if let Some(detail) = err.detail {
                diagnostic = diagnostic.with_detail(detail);
            }
            diagnostic.into()
        })
    }

    /// Every variable traversal in the tree, in source order.
    pub fn variables(&self) -> Vec<Traversal> {
        let mut raw = Vec::new();
        self.root.collect_traversals(&mut raw);
        raw.into_iter()
            .map(|t| Traversal {
                range: self.range_of(t.span),
                root: t.root,
                path: t.path,
            })
            .collect()
    }
}

/// A variable reference such as `var.items[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    root: String,
    path: Vec<String>,
    range: Range,
}

impl Traversal {
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn range(&self) -> &Range {
        &self.range
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for step in &self.path {
            write!(f, ".{step}")?;
        }
        Ok(())
    }
}

fn build(
    text: &str,
    origin: &Range,
    parse: fn(&str) -> Result<Expr, parser::SyntaxError>,
) -> Result<SyntaxTree, Diagnostics> {
    let text: Arc<str> = Arc::from(text);
    match parse(&text) {
        Ok(root) => Ok(SyntaxTree {
            root,
            text,
            origin: origin.clone(),
        }),
        Err(err) => Err(Diagnostic::error(err.message)
            .with_code(err.code)
            .with_subject(origin.sub_range(&text, err.span.range()))
            .with_context(origin.clone())
            .into()),
    }
}

/// Parse `text` as a template. `origin` is where `text` sits in its document.
pub fn parse_template(text: &str, origin: &Range) -> Result<SyntaxTree, Diagnostics> {
    build(text, origin, parser::parse_template)
}

/// Parse `text` as a single expression. `origin` is where `text` sits in its
/// document.
pub fn parse_expression(text: &str, origin: &Range) -> Result<SyntaxTree, Diagnostics> {
    build(text, origin, parser::parse_expression)
}
