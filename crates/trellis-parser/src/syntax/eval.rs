//! Tree-walking evaluator for expressions.

use std::cmp::Ordering;

use trellis_core::value::{Value, ValueMap};

use super::{
    ast::{BinaryOp, Expr, Span, TemplatePart, UnaryOp},
    context::EvalContext,
};
use crate::error::ErrorCode;

/// An evaluation failure located by a span of the expression text.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct EvalError {
    pub(super) code: ErrorCode,
    pub(super) message: String,
    pub(super) detail: Option<String>,
    pub(super) span: Span,
}

impl EvalError {
    fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
            span,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

type EvalResult = Result<Value, EvalError>;

pub(super) struct Evaluator<'a> {
    ctx: &'a EvalContext,
}

impl<'a> Evaluator<'a> {
    pub(super) fn new(ctx: &'a EvalContext) -> Self {
        Self { ctx }
    }

    pub(super) fn eval(&self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(value, _) => Ok(value.clone()),
            Expr::Template(parts, _) => self.template(parts),
            Expr::Variable(name, span) => self.variable(name, *span),
            Expr::GetAttr { target, name, span } => {
                let target = self.eval(target)?;
                get_attr(target, name, *span)
            }
            Expr::Index { target, key, span } => {
                let target = self.eval(target)?;
                let key = self.eval(key)?;
                index(target, &key, *span)
            }
            Expr::Call { name, args, span } => self.call(name, args, *span),
            Expr::List(items, _) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Map(entries, _) => self.map(entries),
            Expr::Unary { op, operand, span } => {
                let value = self.eval(operand)?;
                unary(*op, value, *span)
            }
            Expr::Binary { op, lhs, rhs, span } => self.binary(*op, lhs, rhs, *span),
            Expr::Conditional {
                condition,
                then,
                otherwise,
                ..
            } => {
                let span = condition.span();
                match self.eval(condition)? {
                    Value::Bool(true) => self.eval(then),
                    Value::Bool(false) => self.eval(otherwise),
                    other => Err(EvalError::new(
                        ErrorCode::E403,
                        format!("condition must be a bool, got {}", other.value_type()),
                        span,
                    )),
                }
            }
        }
    }

    /// A template made of a single interpolation yields the raw value;
    /// anything else concatenates string forms.
    fn template(&self, parts: &[TemplatePart]) -> EvalResult {
        if let [TemplatePart::Interpolation(expr)] = parts {
            return self.eval(expr);
        }

        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Interpolation(expr) => {
                    let value = self.eval(expr)?;
                    let Some(text) = value.to_template_string() else {
                        return Err(EvalError::new(
                            ErrorCode::E403,
                            format!("cannot interpolate a {} value", value.value_type()),
                            expr.span(),
                        ));
                    };
                    out.push_str(&text);
                }
            }
        }
        Ok(Value::String(out))
    }

    fn variable(&self, name: &str, span: Span) -> EvalResult {
        if let Some(value) = self.ctx.variable(name) {
            return Ok(value.clone());
        }

        let available: Vec<_> = self.ctx.variable_names().collect();
        let error = EvalError::new(ErrorCode::E400, format!("unknown variable \"{name}\""), span);
        Err(if available.is_empty() {
            error.with_detail("no variables are defined")
        } else {
            error.with_detail(format!("available variables: {}", available.join(", ")))
        })
    }

    fn call(&self, name: &str, args: &[Expr], span: Span) -> EvalResult {
        let Some(function) = self.ctx.function(name) else {
            return Err(EvalError::new(
                ErrorCode::E404,
                format!("call to unknown function \"{name}\""),
                span,
            ));
        };

        let args = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        function.call(&args).map_err(|err| {
            EvalError::new(ErrorCode::E405, format!("error in function \"{name}\""), span)
                .with_detail(err.to_string())
        })
    }

    fn map(&self, entries: &[(Expr, Expr)]) -> EvalResult {
        let mut map = ValueMap::with_capacity(entries.len());
        for (key_expr, value_expr) in entries {
            let key = self.eval(key_expr)?;
            let Some(key) = key.to_template_string() else {
                return Err(EvalError::new(
                    ErrorCode::E403,
                    format!("map key must be a string, got {}", key.value_type()),
                    key_expr.span(),
                ));
            };
            let value = self.eval(value_expr)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> EvalResult {
        // Logical operators short-circuit.
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let left = expect_bool(self.eval(lhs)?, op, lhs.span())?;
            return match (op, left) {
                (BinaryOp::And, false) => Ok(Value::Bool(false)),
                (BinaryOp::Or, true) => Ok(Value::Bool(true)),
                _ => expect_bool(self.eval(rhs)?, op, rhs.span()).map(Value::Bool),
            };
        }

        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;
        match op {
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
            BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                compare(op, &left, &right, span)
            }
            _ => arithmetic(op, &left, &right, span),
        }
    }
}

fn expect_bool(value: Value, op: BinaryOp, span: Span) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::new(
            ErrorCode::E403,
            format!("operand of `{op}` must be a bool, got {}", other.value_type()),
            span,
        )),
    }
}

fn get_attr(target: Value, name: &str, span: Span) -> EvalResult {
    match target {
        Value::Map(mut map) => map.swap_remove(name).ok_or_else(|| missing_key(&map, name, span)),
        other => Err(EvalError::new(
            ErrorCode::E403,
            format!("cannot access attribute \"{name}\" on a {} value", other.value_type()),
            span,
        )),
    }
}

fn missing_key(map: &ValueMap, key: &str, span: Span) -> EvalError {
    let error = EvalError::new(ErrorCode::E401, format!("missing map element \"{key}\""), span);
    if map.is_empty() {
        error.with_detail("the map is empty")
    } else {
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        error.with_detail(format!("available keys: {}", keys.join(", ")))
    }
}

fn index(target: Value, key: &Value, span: Span) -> EvalResult {
    match (target, key) {
        (Value::List(mut items), Value::Int(i)) => {
            let len = items.len();
            usize::try_from(*i)
                .ok()
                .filter(|idx| *idx < len)
                .map(|idx| items.swap_remove(idx))
                .ok_or_else(|| {
                    EvalError::new(
                        ErrorCode::E402,
                        format!("index {i} out of range for list of length {len}"),
                        span,
                    )
                })
        }
        (Value::Map(mut map), Value::String(k)) => {
            map.swap_remove(k.as_str()).ok_or_else(|| missing_key(&map, k, span))
        }
        (target, key) => Err(EvalError::new(
            ErrorCode::E403,
            format!("cannot index a {} with a {}", target.value_type(), key.value_type()),
            span,
        )),
    }
}

fn unary(op: UnaryOp, value: Value, span: Span) -> EvalResult {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::new(ErrorCode::E403, "integer overflow", span)),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, value) => Err(EvalError::new(
            ErrorCode::E403,
            format!("cannot apply `{op}` to a {} value", value.value_type()),
            span,
        )),
    }
}

/// Equality where ints and floats compare by numeric value.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            left.as_f64() == right.as_f64()
        }
        _ => left == right,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value, span: Span) -> EvalResult {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(EvalError::new(
                    ErrorCode::E403,
                    format!(
                        "cannot compare {} with {} using `{op}`",
                        left.value_type(),
                        right.value_type()
                    ),
                    span,
                ));
            }
        },
    };

    // NaN compares false with everything.
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value, span: Span) -> EvalResult {
    let overflow = || EvalError::new(ErrorCode::E403, "integer overflow", span);
    let by_zero = || EvalError::new(ErrorCode::E406, "division by zero", span);

    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let (a, b) = (*a, *b);
        return match op {
            BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Div if b == 0 => Err(by_zero()),
            BinaryOp::Div if a.checked_rem(b) == Some(0) => a.checked_div(b).map(Value::Int).ok_or_else(overflow),
            BinaryOp::Div => Ok(Value::Float(a as f64 / b as f64)),
            BinaryOp::Mod if b == 0 => Err(by_zero()),
            BinaryOp::Mod => a.checked_rem(b).map(Value::Int).ok_or_else(overflow),
            _ => Err(EvalError::new(ErrorCode::E403, format!("unsupported operator `{op}`"), span)),
        };
    }

    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(EvalError::new(
            ErrorCode::E403,
            format!(
                "operator `{op}` needs numbers, got {} and {}",
                left.value_type(),
                right.value_type()
            ),
            span,
        ));
    };

    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Mod if b == 0.0 => return Err(by_zero()),
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => {
            return Err(EvalError::new(
                ErrorCode::E403,
                format!("unsupported operator `{op}`"),
                span,
            ));
        }
    };
    Ok(Value::Float(result))
}
