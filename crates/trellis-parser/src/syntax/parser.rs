//! winnow parsers for templates and expressions.
//!
//! Operator precedence, loosest first:
//!
//! | level          | operators              |
//! |----------------|------------------------|
//! | conditional    | `c ? a : b`            |
//! | or             | `\|\|`                 |
//! | and            | `&&`                   |
//! | equality       | `==` `!=`              |
//! | comparison     | `<` `<=` `>` `>=`      |
//! | additive       | `+` `-`                |
//! | multiplicative | `*` `/` `%`            |
//! | unary          | `-` `!`                |
//! | postfix        | `.name` `.0` `[expr]`  |

use winnow::{
    Parser as _,
    ascii::{digit1, multispace0},
    combinator::{alt, cut_err, opt, peek, preceded},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{any, literal, one_of, take_while},
};

use trellis_core::value::Value;

use super::ast::{BinaryOp, Expr, Span, TemplatePart, UnaryOp};
use crate::error::ErrorCode;

/// Diagnostic information attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SyntaxDiagnostic {
    code: ErrorCode,
    message: &'static str,
    /// The error span covers from `start` to the error position.
    start: usize,
}

/// A syntax error with its span inside the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SyntaxError {
    pub(super) code: ErrorCode,
    pub(super) message: &'static str,
    pub(super) span: Span,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<SyntaxDiagnostic>>;

const MULTIPLICATIVE: &[(&str, BinaryOp)] = &[
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("%", BinaryOp::Mod),
];
const ADDITIVE: &[(&str, BinaryOp)] = &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)];
// Longest first, so `<` never splits `<=`.
const COMPARISON: &[(&str, BinaryOp)] = &[
    ("<=", BinaryOp::Le),
    (">=", BinaryOp::Ge),
    ("<", BinaryOp::Lt),
    (">", BinaryOp::Gt),
];
const EQUALITY: &[(&str, BinaryOp)] = &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)];
const AND: &[(&str, BinaryOp)] = &[("&&", BinaryOp::And)];
const OR: &[(&str, BinaryOp)] = &[("||", BinaryOp::Or)];

fn fail<O>(input: &mut Input<'_>, code: ErrorCode, message: &'static str, start: usize) -> IResult<O> {
    Err(ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        SyntaxDiagnostic {
            code,
            message,
            start,
        },
    )))
}

fn identifier<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Parse an integer or float literal.
fn number<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    let text: &str = (
        digit1,
        opt(('.', digit1)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;

    if opt(peek(one_of(|c: char| c.is_ascii_alphabetic() || c == '_')))
        .parse_next(input)?
        .is_some()
    {
        return fail(input, ErrorCode::E103, "invalid number literal", start);
    }

    let span = Span::new(start..input.current_token_start());
    if text.contains(['.', 'e', 'E']) {
        match text.parse::<f64>() {
            Ok(f) => Ok(Expr::Literal(Value::Float(f), span)),
            Err(_) => fail(input, ErrorCode::E103, "invalid number literal", start),
        }
    } else {
        match text.parse::<i64>() {
            Ok(i) => Ok(Expr::Literal(Value::Int(i), span)),
            Err(_) => fail(input, ErrorCode::E103, "integer literal out of range", start),
        }
    }
}

/// Parse an escape sequence inside a quoted string.
fn string_escape<'a>(input: &mut Input<'a>) -> IResult<char> {
    let start = input.current_token_start();
    preceded(
        '\\',
        cut_err(alt((
            one_of(['n', 't', 'r', '\\', '"']).map(|c| match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            }),
            preceded('u', take_while(4, |c: char| c.is_ascii_hexdigit()))
                .verify_map(|hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)),
        )))
        .context(SyntaxDiagnostic {
            code: ErrorCode::E100,
            message: "invalid escape sequence",
            start,
        }),
    )
    .parse_next(input)
}

/// Parse template parts until the end of input, or until the closing quote
/// when `quoted`.
///
/// `$${` is a literal `${`. Escapes are only processed when `quoted`.
fn template_parts(input: &mut Input<'_>, quoted: bool) -> IResult<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut literal_text = String::new();

    loop {
        if input.is_empty() {
            break;
        }
        if quoted && opt(peek(one_of(['"', '\n']))).parse_next(input)?.is_some() {
            break;
        }
        if opt("$${").parse_next(input)?.is_some() {
            literal_text.push_str("${");
            continue;
        }

        let hole_start = input.current_token_start();
        if opt("${").parse_next(input)?.is_some() {
            if !literal_text.is_empty() {
                parts.push(TemplatePart::Literal(std::mem::take(&mut literal_text)));
            }
            multispace0.parse_next(input)?;
            let expr = cut_err(expression)
                .context(SyntaxDiagnostic {
                    code: ErrorCode::E100,
                    message: "expected an expression in interpolation",
                    start: hole_start,
                })
                .parse_next(input)?;
            multispace0.parse_next(input)?;
            cut_err('}')
                .context(SyntaxDiagnostic {
                    code: ErrorCode::E101,
                    message: "unterminated interpolation",
                    start: hole_start,
                })
                .parse_next(input)?;
            parts.push(TemplatePart::Interpolation(expr));
            continue;
        }

        let ch = if quoted && opt(peek('\\')).parse_next(input)?.is_some() {
            string_escape(input)?
        } else {
            any.parse_next(input)?
        };
        literal_text.push(ch);
    }

    if !literal_text.is_empty() {
        parts.push(TemplatePart::Literal(literal_text));
    }
    Ok(parts)
}

/// Build the expression for a list of template parts.
///
/// Templates without interpolations collapse to a string literal.
fn template_expr(mut parts: Vec<TemplatePart>, span: Span) -> Expr {
    match parts.as_slice() {
        [] => Expr::Literal(Value::String(String::new()), span),
        [TemplatePart::Literal(_)] => match parts.pop() {
            Some(TemplatePart::Literal(text)) => Expr::Literal(Value::String(text), span),
            _ => Expr::Template(parts, span),
        },
        _ => Expr::Template(parts, span),
    }
}

/// Parse a double-quoted string, which is itself a template.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    '"'.parse_next(input)?;
    let parts = template_parts(input, true)?;
    cut_err('"')
        .context(SyntaxDiagnostic {
            code: ErrorCode::E102,
            message: "unterminated string literal",
            start,
        })
        .parse_next(input)?;
    Ok(template_expr(
        parts,
        Span::new(start..input.current_token_start()),
    ))
}

/// Parse comma-separated expressions up to `close`. A trailing comma is allowed.
fn items(input: &mut Input<'_>, close: char, start: usize) -> IResult<Vec<Expr>> {
    let message = match close {
        ')' => "expected `,` or `)`",
        _ => "expected `,` or `]`",
    };
    let mut items = Vec::new();

    loop {
        multispace0.parse_next(input)?;
        if opt(close).parse_next(input)?.is_some() {
            return Ok(items);
        }

        let item_start = input.current_token_start();
        let item = cut_err(expression)
            .context(SyntaxDiagnostic {
                code: ErrorCode::E100,
                message: "expected an expression",
                start: item_start,
            })
            .parse_next(input)?;
        items.push(item);

        multispace0.parse_next(input)?;
        if opt(',').parse_next(input)?.is_some() {
            continue;
        }
        cut_err(close)
            .context(SyntaxDiagnostic {
                code: ErrorCode::E100,
                message,
                start,
            })
            .parse_next(input)?;
        return Ok(items);
    }
}

fn list_expr<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    '['.parse_next(input)?;
    let items = items(input, ']', start)?;
    Ok(Expr::List(
        items,
        Span::new(start..input.current_token_start()),
    ))
}

fn map_key<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    alt((
        string_literal,
        paren_expr,
        number,
        identifier
            .with_span()
            .map(|(name, span)| Expr::Literal(Value::String(name.to_string()), Span::from(span))),
    ))
    .parse_next(input)
}

/// Parse `{ key = value, "key": value }`. Separators between entries are optional.
fn map_expr<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    '{'.parse_next(input)?;
    let mut entries = Vec::new();

    loop {
        multispace0.parse_next(input)?;
        if opt('}').parse_next(input)?.is_some() {
            break;
        }

        let key_start = input.current_token_start();
        let key = cut_err(map_key)
            .context(SyntaxDiagnostic {
                code: ErrorCode::E100,
                message: "expected a map key or `}`",
                start: key_start,
            })
            .parse_next(input)?;
        multispace0.parse_next(input)?;
        cut_err(one_of(['=', ':']))
            .context(SyntaxDiagnostic {
                code: ErrorCode::E100,
                message: "expected `=` or `:` after map key",
                start: key_start,
            })
            .parse_next(input)?;
        multispace0.parse_next(input)?;
        let value = cut_err(expression)
            .context(SyntaxDiagnostic {
                code: ErrorCode::E100,
                message: "expected a map value",
                start: key_start,
            })
            .parse_next(input)?;
        entries.push((key, value));

        multispace0.parse_next(input)?;
        opt(',').parse_next(input)?;
    }

    Ok(Expr::Map(
        entries,
        Span::new(start..input.current_token_start()),
    ))
}

fn paren_expr<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    '('.parse_next(input)?;
    multispace0.parse_next(input)?;
    let inner = cut_err(expression)
        .context(SyntaxDiagnostic {
            code: ErrorCode::E100,
            message: "expected an expression",
            start,
        })
        .parse_next(input)?;
    multispace0.parse_next(input)?;
    cut_err(')')
        .context(SyntaxDiagnostic {
            code: ErrorCode::E100,
            message: "unclosed parenthesis",
            start,
        })
        .parse_next(input)?;
    Ok(inner)
}

/// Parse a variable, a keyword literal or a function call.
fn variable_or_call<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    let name = identifier(input)?;

    let checkpoint = input.checkpoint();
    multispace0.parse_next(input)?;
    if opt('(').parse_next(input)?.is_some() {
        let args = items(input, ')', start)?;
        return Ok(Expr::Call {
            name: name.to_string(),
            args,
            span: Span::new(start..input.current_token_start()),
        });
    }
    input.reset(&checkpoint);

    let span = Span::new(start..input.current_token_start());
    Ok(match name {
        "true" => Expr::Literal(Value::Bool(true), span),
        "false" => Expr::Literal(Value::Bool(false), span),
        "null" => Expr::Literal(Value::Null, span),
        _ => Expr::Variable(name.to_string(), span),
    })
}

fn primary<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    alt((
        number,
        string_literal,
        list_expr,
        map_expr,
        paren_expr,
        variable_or_call,
    ))
    .parse_next(input)
}

/// Parse attribute access and indexing after a primary expression.
fn postfix<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    let mut expr = primary(input)?;

    loop {
        let step_start = input.current_token_start();
        if opt('.').parse_next(input)?.is_some() {
            // Legacy index syntax: `list.0`
            if let Some(digits) = opt(digit1).parse_next(input)? {
                let Ok(index) = digits.parse::<i64>() else {
                    return fail(input, ErrorCode::E103, "index out of range", step_start);
                };
                let end = input.current_token_start();
                expr = Expr::Index {
                    target: Box::new(expr),
                    key: Box::new(Expr::Literal(
                        Value::Int(index),
                        Span::new(step_start + 1..end),
                    )),
                    span: Span::new(start..end),
                };
                continue;
            }

            let name = cut_err(identifier)
                .context(SyntaxDiagnostic {
                    code: ErrorCode::E100,
                    message: "expected an attribute name after `.`",
                    start: step_start,
                })
                .parse_next(input)?;
            expr = Expr::GetAttr {
                target: Box::new(expr),
                name: name.to_string(),
                span: Span::new(start..input.current_token_start()),
            };
            continue;
        }

        if opt('[').parse_next(input)?.is_some() {
            multispace0.parse_next(input)?;
            let key = cut_err(expression)
                .context(SyntaxDiagnostic {
                    code: ErrorCode::E100,
                    message: "expected an index expression",
                    start: step_start,
                })
                .parse_next(input)?;
            multispace0.parse_next(input)?;
            cut_err(']')
                .context(SyntaxDiagnostic {
                    code: ErrorCode::E100,
                    message: "expected `]`",
                    start: step_start,
                })
                .parse_next(input)?;
            expr = Expr::Index {
                target: Box::new(expr),
                key: Box::new(key),
                span: Span::new(start..input.current_token_start()),
            };
            continue;
        }

        return Ok(expr);
    }
}

fn unary<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    let op = opt(alt(('-'.value(UnaryOp::Neg), '!'.value(UnaryOp::Not)))).parse_next(input)?;
    let Some(op) = op else {
        return postfix(input);
    };

    multispace0.parse_next(input)?;
    let operand = cut_err(unary)
        .context(SyntaxDiagnostic {
            code: ErrorCode::E100,
            message: "expected an expression after unary operator",
            start,
        })
        .parse_next(input)?;
    let span = Span::new(start..input.current_token_start());

    // Fold negative number literals.
    Ok(match (op, operand) {
        (UnaryOp::Neg, Expr::Literal(Value::Int(i), _)) => Expr::Literal(Value::Int(-i), span),
        (UnaryOp::Neg, Expr::Literal(Value::Float(f), _)) => Expr::Literal(Value::Float(-f), span),
        (op, operand) => Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        },
    })
}

/// Parse a left-associative chain of `operand (op operand)*`.
fn binary_chain<'a>(
    input: &mut Input<'a>,
    operand: fn(&mut Input<'a>) -> IResult<Expr>,
    operators: &[(&'static str, BinaryOp)],
) -> IResult<Expr> {
    let start = input.current_token_start();
    let mut lhs = operand(input)?;

    loop {
        let checkpoint = input.checkpoint();
        multispace0.parse_next(input)?;
        let op_start = input.current_token_start();

        let mut matched = None;
        for &(text, op) in operators {
            if opt(literal(text)).parse_next(input)?.is_some() {
                matched = Some(op);
                break;
            }
        }
        let Some(op) = matched else {
            input.reset(&checkpoint);
            return Ok(lhs);
        };

        multispace0.parse_next(input)?;
        let rhs = cut_err(operand)
            .context(SyntaxDiagnostic {
                code: ErrorCode::E100,
                message: "expected an expression after operator",
                start: op_start,
            })
            .parse_next(input)?;
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span: Span::new(start..input.current_token_start()),
        };
    }
}

fn multiplicative<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    binary_chain(input, unary, MULTIPLICATIVE)
}

fn additive<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    binary_chain(input, multiplicative, ADDITIVE)
}

fn comparison<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    binary_chain(input, additive, COMPARISON)
}

fn equality<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    binary_chain(input, comparison, EQUALITY)
}

fn and<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    binary_chain(input, equality, AND)
}

fn or<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    binary_chain(input, and, OR)
}

/// Parse a full expression, including conditionals.
fn expression<'a>(input: &mut Input<'a>) -> IResult<Expr> {
    let start = input.current_token_start();
    let condition = or(input)?;

    let checkpoint = input.checkpoint();
    multispace0.parse_next(input)?;
    let question = input.current_token_start();
    if opt('?').parse_next(input)?.is_none() {
        input.reset(&checkpoint);
        return Ok(condition);
    }

    multispace0.parse_next(input)?;
    let then = cut_err(expression)
        .context(SyntaxDiagnostic {
            code: ErrorCode::E100,
            message: "expected an expression after `?`",
            start: question,
        })
        .parse_next(input)?;
    multispace0.parse_next(input)?;
    cut_err(':')
        .context(SyntaxDiagnostic {
            code: ErrorCode::E100,
            message: "expected `:` in conditional",
            start: question,
        })
        .parse_next(input)?;
    multispace0.parse_next(input)?;
    let otherwise = cut_err(expression)
        .context(SyntaxDiagnostic {
            code: ErrorCode::E100,
            message: "expected an expression after `:`",
            start: question,
        })
        .parse_next(input)?;

    Ok(Expr::Conditional {
        condition: Box::new(condition),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
        span: Span::new(start..input.current_token_start()),
    })
}

fn convert_err_mode(err: ErrMode<ContextError<SyntaxDiagnostic>>, error_pos: usize) -> SyntaxError {
    let context_error = match err {
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    match context_error.context().next() {
        Some(SyntaxDiagnostic {
            code,
            message,
            start,
        }) => SyntaxError {
            code: *code,
            message: *message,
            span: Span::new(*start..error_pos),
        },
        None => SyntaxError {
            code: ErrorCode::E100,
            message: "expected an expression",
            span: Span::new(error_pos..error_pos + 1),
        },
    }
}

/// Parse `text` as a template: literal text with `${ expr }` holes.
pub(super) fn parse_template(text: &str) -> Result<Expr, SyntaxError> {
    let mut input = LocatingSlice::new(text);
    let parts =
        template_parts(&mut input, false).map_err(|e| convert_err_mode(e, input.current_token_start()))?;
    Ok(template_expr(parts, Span::new(0..text.len())))
}

/// Parse `text` as a single bare expression.
pub(super) fn parse_expression(text: &str) -> Result<Expr, SyntaxError> {
    let mut input = LocatingSlice::new(text);
    let parsed = preceded(multispace0, expression)
        .parse_next(&mut input)
        .map_err(|e| convert_err_mode(e, input.current_token_start()))?;

    let _: IResult<&str> = multispace0.parse_next(&mut input);
    if !input.is_empty() {
        let start = input.current_token_start();
        return Err(SyntaxError {
            code: ErrorCode::E104,
            message: "unexpected input after expression",
            span: Span::new(start..text.len()),
        });
    }
    Ok(parsed)
}
