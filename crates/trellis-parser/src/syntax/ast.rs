//! Syntax tree of the expression language.
//!
//! Every node carries a [`Span`] of byte offsets into the text it was
//! parsed from. Spans are mapped onto document ranges only when a
//! diagnostic is produced.

use std::fmt;

use trellis_core::value::Value;

/// A half-open byte range inside an expression's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Create a new span from a byte range.
    pub fn new(range: std::ops::Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end.max(range.start),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Create a union of two spans (encompassing both).
    pub fn union(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(op)
    }
}

/// One piece of a string template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Interpolation(Expr),
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value, Span),
    /// A string with at least one `${...}` interpolation.
    Template(Vec<TemplatePart>, Span),
    Variable(String, Span),
    GetAttr {
        target: Box<Expr>,
        name: String,
        span: Span,
    },
    Index {
        target: Box<Expr>,
        key: Box<Expr>,
        span: Span,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
    List(Vec<Expr>, Span),
    Map(Vec<(Expr, Expr)>, Span),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
        span: Span,
    },
}

/// A variable reference with the static path that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTraversal {
    pub(crate) root: String,
    pub(crate) path: Vec<String>,
    pub(crate) span: Span,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, span)
            | Expr::Template(_, span)
            | Expr::Variable(_, span)
            | Expr::List(_, span)
            | Expr::Map(_, span) => *span,
            Expr::GetAttr { span, .. }
            | Expr::Index { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Conditional { span, .. } => *span,
        }
    }

    /// The root variable and literal path of a traversal like `var.a["b"][0]`.
    fn static_traversal(&self) -> Option<(String, Vec<String>)> {
        match self {
            Expr::Variable(name, _) => Some((name.clone(), Vec::new())),
            Expr::GetAttr { target, name, .. } => {
                let (root, mut path) = target.static_traversal()?;
                path.push(name.clone());
                Some((root, path))
            }
            Expr::Index { target, key, .. } => {
                let step = match key.as_ref() {
                    Expr::Literal(Value::String(s), _) => s.clone(),
                    Expr::Literal(Value::Int(i), _) => i.to_string(),
                    _ => return None,
                };
                let (root, mut path) = target.static_traversal()?;
                path.push(step);
                Some((root, path))
            }
            _ => None,
        }
    }

    /// Collect every variable traversal in this expression, in source order.
    pub(crate) fn collect_traversals(&self, out: &mut Vec<RawTraversal>) {
        if let Some((root, path)) = self.static_traversal() {
            out.push(RawTraversal {
                root,
                path,
                span: self.span(),
            });
            return;
        }

        match self {
            Expr::Literal(..) | Expr::Variable(..) => {}
            Expr::Template(parts, _) => {
                for part in parts {
                    if let TemplatePart::Interpolation(expr) = part {
                        expr.collect_traversals(out);
                    }
                }
            }
            Expr::GetAttr { target, .. } => target.collect_traversals(out),
            Expr::Index { target, key, .. } => {
                target.collect_traversals(out);
                key.collect_traversals(out);
            }
            Expr::Call { args, .. } | Expr::List(args, _) => {
                args.iter().for_each(|arg| arg.collect_traversals(out));
            }
            Expr::Map(entries, _) => {
                for (key, value) in entries {
                    key.collect_traversals(out);
                    value.collect_traversals(out);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_traversals(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_traversals(out);
                rhs.collect_traversals(out);
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
                ..
            } => {
                condition.collect_traversals(out);
                then.collect_traversals(out);
                otherwise.collect_traversals(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_union() {
        let span = Span::new(5..10).union(Span::new(2..7));
        assert_eq!(span.range(), 2..10);
        assert_eq!(span.len(), 8);
    }

    #[test]
    fn test_static_traversal_through_index() {
        let expr = Expr::Index {
            target: Box::new(Expr::GetAttr {
                target: Box::new(Expr::Variable("var".to_string(), Span::new(0..3))),
                name: "items".to_string(),
                span: Span::new(0..9),
            }),
            key: Box::new(Expr::Literal(Value::Int(0), Span::new(10..11))),
            span: Span::new(0..12),
        };

        let mut out = Vec::new();
        expr.collect_traversals(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].root, "var");
        assert_eq!(out[0].path, ["items", "0"]);
        assert_eq!(out[0].span, Span::new(0..12));
    }

    #[test]
    fn test_dynamic_index_collects_both_sides() {
        let expr = Expr::Index {
            target: Box::new(Expr::Variable("a".to_string(), Span::new(0..1))),
            key: Box::new(Expr::Variable("b".to_string(), Span::new(2..3))),
            span: Span::new(0..4),
        };

        let mut out = Vec::new();
        expr.collect_traversals(&mut out);
        let roots: Vec<_> = out.iter().map(|t| t.root.as_str()).collect();
        assert_eq!(roots, ["a", "b"]);
    }
}
