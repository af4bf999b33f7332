//! Line-oriented lexer for the document reader.
//!
//! Every source line becomes zero or more [`Token`]s: sequence dashes, at
//! most one mapping key, an optional anchor and at most one value. Nesting
//! is not decided here; tokens carry their start column and the
//! [loader](super::loader) builds the tree from indentation.
//!
//! Flow collections are read whole, so a `[...]` or `{...}` value becomes a
//! single token holding the finished node. A block scalar header (`|` or `>`)
//! makes the lexer consume the indented lines that follow it as the
//! scalar's content.
//!
//! Like the rest of the reader, errors are collected per line: a broken line
//! is reported and skipped, and lexing continues with the next one.

use std::{borrow::Cow, ops::Range as ByteRange, sync::Arc};

use winnow::{
    Parser as _,
    ascii::{line_ending, space0, space1, till_line_ending},
    combinator::{alt, cut_err, eof, opt, peek, preceded, repeat, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{any, none_of, one_of, take_while},
};

use trellis_core::{
    node::{Entry, Mapping, Node, Scalar, ScalarStyle, Sequence, Tag},
    position::{Pos, Range},
};

use super::loader::check_duplicate;
use crate::error::{Diagnostic, DiagnosticCollector, Diagnostics, ErrorCode};

/// Rich diagnostic information for reader errors.
///
/// Attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReaderDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    /// The error span covers from `start` to the error position.
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<ReaderDiagnostic>>;

/// What a token stands for.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    /// A `-` sequence item indicator.
    Dash,
    /// A mapping key. The token ends after the `:`.
    Key(Scalar),
    /// An `&anchor` naming the node that follows it.
    Anchor(String),
    /// An `*alias` standing for a previously anchored node.
    Alias(String),
    /// A scalar, a block scalar or a whole flow collection.
    Value(Node),
}

/// A token with its source location.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub(super) kind: TokenKind,
    pub(super) start: Pos,
    pub(super) end: Pos,
}

impl Token {
    pub(super) fn is_dash(&self) -> bool {
        matches!(self.kind, TokenKind::Dash)
    }

    pub(super) fn is_key(&self) -> bool {
        matches!(self.kind, TokenKind::Key(_))
    }

    pub(super) fn is_anchor(&self) -> bool {
        matches!(self.kind, TokenKind::Anchor(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RawScalar<'a> {
    tag: Option<&'a str>,
    text: Cow<'a, str>,
    style: ScalarStyle,
    span: ByteRange<usize>,
}

impl<'a> RawScalar<'a> {
    /// The empty plain scalar at `at`, read as null unless tagged.
    fn empty(tag: Option<&'a str>, at: usize) -> Self {
        Self {
            tag,
            text: Cow::Borrowed(""),
            style: ScalarStyle::Plain,
            span: at..at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RawValue<'a> {
    Scalar(RawScalar<'a>),
    Sequence(Vec<RawValue<'a>>, ByteRange<usize>),
    Mapping(Vec<(RawScalar<'a>, RawValue<'a>)>, ByteRange<usize>),
}

/// How trailing line breaks of a block scalar are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomping {
    /// `|-`: drop every trailing line break.
    Strip,
    /// `|`: keep a single trailing line break.
    Clip,
    /// `|+`: keep every trailing line break.
    Keep,
}

/// A `|` or `>` header whose content starts on the next line.
#[derive(Debug, Clone, PartialEq)]
struct BlockHeader<'a> {
    tag: Option<&'a str>,
    folded: bool,
    chomping: Chomping,
    /// Explicit indentation indicator, relative to `parent_indent`.
    indent: Option<usize>,
    /// Indentation of the key or dash that owns the scalar.
    parent_indent: usize,
    span: ByteRange<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum RawToken<'a> {
    Dash(ByteRange<usize>),
    Key(RawScalar<'a>, usize),
    Anchor(&'a str, ByteRange<usize>),
    Alias(&'a str, ByteRange<usize>),
    Value(RawValue<'a>),
}

/// The tokens of one line, plus the header of a block scalar whose content
/// follows on the next lines.
type LineTokens<'a> = (Vec<RawToken<'a>>, Option<BlockHeader<'a>>);

type AnchorName<'a> = Option<(&'a str, ByteRange<usize>)>;

/// Maps byte offsets to line/column positions.
pub(super) struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(super) fn new(source: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { source, starts }
    }

    pub(super) fn pos(&self, byte: usize) -> Pos {
        let byte = byte.min(self.source.len());
        let line = self.starts.partition_point(|&start| start <= byte);
        let line_start = self.starts[line.saturating_sub(1)];
        let column = self
            .source
            .get(line_start..byte)
            .map_or(0, |text| text.chars().count());
        Pos::new(line, column + 1, byte)
    }

    fn range(&self, filename: &Arc<str>, span: ByteRange<usize>) -> Range {
        Range::new(Arc::clone(filename), self.pos(span.start), self.pos(span.end))
    }
}

/// Resolve the tag of an untagged plain scalar.
pub(super) fn resolve_plain(text: &str) -> Tag {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Tag::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return Tag::Bool,
        ".inf" | "-.inf" | "+.inf" | ".nan" | ".NaN" | ".NAN" => return Tag::Float,
        _ => {}
    }

    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return Tag::Int;
    }
    if looks_like_float(digits) {
        return Tag::Float;
    }
    Tag::Str
}

fn looks_like_float(text: &str) -> bool {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
        None => (text, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (mantissa, None),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let mantissa_ok = all_digits(whole)
        && fraction.is_none_or(all_digits)
        && (!whole.is_empty() || fraction.is_some_and(|f| !f.is_empty()));
    let exponent_ok = exponent.is_none_or(|exp| {
        let exp = exp.strip_prefix(['-', '+']).unwrap_or(exp);
        !exp.is_empty() && all_digits(exp)
    });
    mantissa_ok && exponent_ok && (fraction.is_some() || exponent.is_some())
}

/// A cut error carrying a reader diagnostic that spans from `start` to the
/// current position.
fn reader_error(
    input: &mut Input<'_>,
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    start: usize,
) -> ErrMode<ContextError<ReaderDiagnostic>> {
    ErrMode::Cut(ContextError::new().add_context(
        input,
        &input.checkpoint(),
        ReaderDiagnostic {
            code,
            message,
            help,
            start,
        },
    ))
}

/// Parse a `#` comment up to the end of the line.
fn comment<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    preceded('#', till_line_ending).parse_next(input)
}

/// Succeed without consuming anything if only whitespace and an optional
/// comment remain on this line.
fn line_end<'a>(input: &mut Input<'a>) -> IResult<()> {
    (
        space0,
        opt(comment),
        peek(alt((line_ending.void(), eof.void()))),
    )
        .void()
        .parse_next(input)
}

fn at_line_end(input: &mut Input<'_>) -> IResult<bool> {
    opt(line_end).map(|end| end.is_some()).parse_next(input)
}

/// Characters that end a tag, anchor or alias name.
fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '[' | ']' | '{' | '}')
}

/// Parse a tag like `!!int`, `!custom` or the non-specific `!`.
fn tag<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    terminated(('!', take_while(0.., is_name_char)).take(), space0).parse_next(input)
}

/// Parse an `&anchor`, returning its name and span.
fn anchor<'a>(input: &mut Input<'a>) -> IResult<(&'a str, ByteRange<usize>)> {
    terminated(preceded('&', take_while(1.., is_name_char)).with_span(), space0).parse_next(input)
}

/// Parse an `*alias`, returning its name and span.
fn alias<'a>(input: &mut Input<'a>) -> IResult<(&'a str, ByteRange<usize>)> {
    preceded('*', take_while(1.., is_name_char))
        .with_span()
        .parse_next(input)
}

/// Parse the node properties in front of a value: a tag and an anchor, in
/// either order.
fn properties<'a>(input: &mut Input<'a>) -> IResult<(Option<&'a str>, AnchorName<'a>)> {
    let mut found_tag = None;
    let mut found_anchor = None;
    loop {
        if found_tag.is_none() {
            if let Some(t) = opt(tag).parse_next(input)? {
                found_tag = Some(t);
                continue;
            }
        }
        if found_anchor.is_none() {
            if let Some(a) = opt(anchor).parse_next(input)? {
                found_anchor = Some(a);
                continue;
            }
        }
        return Ok((found_tag, found_anchor));
    }
}

/// Parse an escape sequence inside a double-quoted scalar.
fn double_quoted_escape<'a>(input: &mut Input<'a>) -> IResult<char> {
    let escape_start = input.current_token_start();
    preceded(
        '\\',
        cut_err(alt((
            one_of(['n', 't', 'r', '0', '\\', '"', '/', 'b', 'f', ' ', 'e']).map(|c| match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                'b' => '\u{08}',
                'f' => '\u{0C}',
                'e' => '\u{1B}',
                other => other,
            }),
            preceded('x', take_while(2, |c: char| c.is_ascii_hexdigit()))
                .verify_map(|hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)),
            preceded('u', take_while(4, |c: char| c.is_ascii_hexdigit()))
                .verify_map(|hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)),
        )))
        .context(ReaderDiagnostic {
            code: ErrorCode::E003,
            message: "invalid escape sequence",
            help: Some("valid escapes: `\\n`, `\\t`, `\\r`, `\\0`, `\\\\`, `\\\"`, `\\xXX`, `\\uXXXX`"),
            start: escape_start,
        }),
    )
    .parse_next(input)
}

/// Parse a double-quoted scalar on a single line.
fn double_quoted<'a>(input: &mut Input<'a>) -> IResult<(Cow<'a, str>, ByteRange<usize>)> {
    let start = input.current_token_start();
    '"'.parse_next(input)?;

    let content = repeat(0.., alt((double_quoted_escape, none_of(['"', '\\', '\n', '\r']))))
        .fold(String::new, |mut acc, ch| {
            acc.push(ch);
            acc
        });

    let text = cut_err(terminated(content, '"'))
        .context(ReaderDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated double-quoted scalar",
            help: Some("add a closing `\"` on the same line"),
            start,
        })
        .parse_next(input)?;

    Ok((Cow::Owned(text), start..input.current_token_start()))
}

/// Parse a single-quoted scalar on a single line. `''` stands for one quote.
fn single_quoted<'a>(input: &mut Input<'a>) -> IResult<(Cow<'a, str>, ByteRange<usize>)> {
    let start = input.current_token_start();
    '\''.parse_next(input)?;

    let content = repeat(0.., alt(("''".value('\''), none_of(['\'', '\n', '\r'])))).fold(
        String::new,
        |mut acc, ch| {
            acc.push(ch);
            acc
        },
    );

    let text = cut_err(terminated(content, '\''))
        .context(ReaderDiagnostic {
            code: ErrorCode::E001,
            message: "unterminated single-quoted scalar",
            help: Some("add a closing `'` on the same line"),
            start,
        })
        .parse_next(input)?;

    Ok((Cow::Owned(text), start..input.current_token_start()))
}

fn quoted<'a>(input: &mut Input<'a>) -> IResult<(Cow<'a, str>, ByteRange<usize>, ScalarStyle)> {
    alt((
        double_quoted.map(|(text, span)| (text, span, ScalarStyle::DoubleQuoted)),
        single_quoted.map(|(text, span)| (text, span, ScalarStyle::SingleQuoted)),
    ))
    .parse_next(input)
}

/// Characters that may not start a plain scalar.
const INDICATORS: [char; 12] = ['&', '*', '|', '>', '%', '@', '`', '[', '{', '"', '\'', '#'];

/// Characters that end a plain scalar inside a flow collection.
const FLOW_BREAKS: [char; 9] = [',', '[', ']', '{', '}', ' ', '\t', '\n', '\r'];

/// Parse a plain scalar in key position.
///
/// A key ends at the first `:` followed by whitespace or the end of the
/// line. A `#` preceded by whitespace starts a comment.
fn plain_key<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    preceded(
        peek(none_of(INDICATORS)),
        repeat::<_, _, (), _, _>(
            1..,
            alt((
                none_of([':', ' ', '\t', '\n', '\r']).void(),
                (':', peek(none_of([' ', '\t', '\n', '\r']))).void(),
                (space1, peek(none_of(['#', ':', ' ', '\t', '\n', '\r']))).void(),
            )),
        )
        .take(),
    )
    .parse_next(input)
}

/// Parse a plain scalar in value position: the rest of the line, without
/// trailing whitespace or comment.
fn plain_value<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    let start = input.current_token_start();
    let text = preceded(
        peek(none_of(INDICATORS)),
        repeat::<_, _, (), _, _>(
            1..,
            alt((
                none_of([' ', '\t', '\n', '\r']).void(),
                (space1, peek(none_of(['#', ' ', '\t', '\n', '\r']))).void(),
            )),
        )
        .take(),
    )
    .parse_next(input)?;

    if text.contains(": ") || text.contains(":\t") || text.ends_with(':') {
        return Err(reader_error(
            input,
            ErrorCode::E003,
            "mapping values are not allowed here",
            Some("quote the scalar if the `: ` is part of the value"),
            start,
        ));
    }

    Ok(text)
}

/// Parse a plain scalar inside a flow collection, which also ends at `,`
/// and at brackets.
fn flow_plain<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    preceded(
        peek(none_of(INDICATORS)),
        repeat::<_, _, (), _, _>(
            1..,
            alt((
                none_of([':', ',', '[', ']', '{', '}', ' ', '\t', '\n', '\r']).void(),
                (':', peek(none_of(FLOW_BREAKS))).void(),
                (
                    space1,
                    peek(none_of(['#', ':', ',', '[', ']', '{', '}', ' ', '\t', '\n', '\r'])),
                )
                    .void(),
            )),
        )
        .take(),
    )
    .parse_next(input)
}

/// Reject syntax outside the supported subset with a specific message.
fn unsupported<'a>(input: &mut Input<'a>) -> IResult<RawValue<'a>> {
    let start = input.current_token_start();
    let indicator = peek(any).parse_next(input)?;
    let (code, message, help) = match indicator {
        '&' => (ErrorCode::E003, "a node may carry only one anchor", None),
        '*' => (
            ErrorCode::E003,
            "invalid alias",
            Some("an alias is `*name` and cannot carry a tag or an anchor"),
        ),
        '%' => (ErrorCode::E004, "directives are not supported", None),
        '@' | '`' => (ErrorCode::E003, "reserved indicator", Some("quote the scalar")),
        _ => return Err(ErrMode::Backtrack(ContextError::new())),
    };
    Err(reader_error(input, code, message, help, start))
}

/// Parse one entry of a flow collection: a quoted or plain scalar, or a
/// nested collection.
fn flow_node<'a>(input: &mut Input<'a>, depth: usize, max_depth: usize) -> IResult<RawValue<'a>> {
    let start = input.current_token_start();
    if opt(peek(one_of(['&', '*']))).parse_next(input)?.is_some() {
        return Err(reader_error(
            input,
            ErrorCode::E004,
            "anchors and aliases are not supported inside flow collections",
            Some("move the anchored node into block style"),
            start,
        ));
    }

    let tag = opt(tag).parse_next(input)?;
    let scalar = |(text, span, style): (Cow<'a, str>, ByteRange<usize>, ScalarStyle)| {
        RawValue::Scalar(RawScalar {
            tag,
            text,
            style,
            span,
        })
    };

    let parsed = opt(alt((
        quoted.map(scalar),
        |i: &mut Input<'a>| flow_collection(i, depth + 1, max_depth),
        flow_plain
            .with_span()
            .map(|(text, span)| scalar((Cow::Borrowed(text), span, ScalarStyle::Plain))),
    )))
    .parse_next(input)?;

    match parsed {
        Some(value) => Ok(value),
        None if tag.is_some() => Ok(RawValue::Scalar(RawScalar::empty(
            tag,
            input.current_token_start(),
        ))),
        None => Err(reader_error(
            input,
            ErrorCode::E003,
            "expected a flow collection entry",
            Some("quote entries that contain `,`, `[`, `]`, `{` or `}`"),
            start,
        )),
    }
}

/// Parse one `key: value` pair of a flow mapping. A missing value is null.
fn flow_pair<'a>(
    input: &mut Input<'a>,
    depth: usize,
    max_depth: usize,
) -> IResult<(RawScalar<'a>, RawValue<'a>)> {
    let start = input.current_token_start();
    let tag = opt(tag).parse_next(input)?;
    let key = opt(alt((
        quoted,
        flow_plain
            .with_span()
            .map(|(text, span)| (Cow::Borrowed(text), span, ScalarStyle::Plain)),
    )))
    .parse_next(input)?;
    let Some((text, span, style)) = key else {
        return Err(reader_error(
            input,
            ErrorCode::E003,
            "expected a flow mapping key",
            None,
            start,
        ));
    };

    space0.parse_next(input)?;
    if opt(':').parse_next(input)?.is_none() {
        return Err(reader_error(
            input,
            ErrorCode::E003,
            "expected `:` after a flow mapping key",
            None,
            start,
        ));
    }
    space0.parse_next(input)?;

    let value = if opt(peek(one_of([',', '}']))).parse_next(input)?.is_some() {
        RawValue::Scalar(RawScalar::empty(None, input.current_token_start()))
    } else {
        flow_node(input, depth, max_depth)?
    };

    let key = RawScalar {
        tag,
        text,
        style,
        span,
    };
    Ok((key, value))
}

/// Parse a `[...]` or `{...}` collection that opens and closes on one line.
fn flow_collection<'a>(input: &mut Input<'a>, depth: usize, max_depth: usize) -> IResult<RawValue<'a>> {
    let start = input.current_token_start();
    let open = one_of(['[', '{']).parse_next(input)?;
    if depth > max_depth {
        return Err(reader_error(
            input,
            ErrorCode::E205,
            "flow collection nests too deeply",
            None,
            start,
        ));
    }

    let is_sequence = open == '[';
    let close = if is_sequence { ']' } else { '}' };
    let mut items = Vec::new();
    let mut pairs = Vec::new();

    loop {
        space0.parse_next(input)?;
        if opt(close).parse_next(input)?.is_some() {
            break;
        }
        if is_sequence {
            items.push(flow_node(input, depth, max_depth)?);
        } else {
            pairs.push(flow_pair(input, depth, max_depth)?);
        }
        space0.parse_next(input)?;
        if opt(',').parse_next(input)?.is_some() {
            continue;
        }
        if opt(close).parse_next(input)?.is_some() {
            break;
        }
        return Err(unclosed_flow(input, is_sequence, start));
    }

    let span = start..input.current_token_start();
    Ok(if is_sequence {
        RawValue::Sequence(items, span)
    } else {
        RawValue::Mapping(pairs, span)
    })
}

fn unclosed_flow(input: &mut Input<'_>, is_sequence: bool, start: usize) -> ErrMode<ContextError<ReaderDiagnostic>> {
    let at_end = matches!(at_line_end(input), Ok(true));
    if at_end {
        return reader_error(
            input,
            ErrorCode::E004,
            "flow collections must close on the line they open",
            Some("keep the collection on one line, or use block style"),
            start,
        );
    }
    let message = if is_sequence {
        "expected `,` or `]` in flow sequence"
    } else {
        "expected `,` or `}` in flow mapping"
    };
    reader_error(input, ErrorCode::E003, message, None, start)
}

/// Parse a block scalar header: `|` or `>`, then optional chomping and
/// indentation indicators in either order.
fn block_header(input: &mut Input<'_>) -> IResult<(bool, Chomping, Option<usize>)> {
    let start = input.current_token_start();
    let folded = one_of(['|', '>']).map(|c| c == '>').parse_next(input)?;

    let mut chomping = None;
    let mut indent = None;
    loop {
        if chomping.is_none() {
            if let Some(c) = opt(one_of(['-', '+'])).parse_next(input)? {
                chomping = Some(if c == '-' { Chomping::Strip } else { Chomping::Keep });
                continue;
            }
        }
        if indent.is_none() {
            if let Some(d) = opt(one_of('1'..='9')).parse_next(input)? {
                indent = d.to_digit(10).map(|d| d as usize);
                continue;
            }
        }
        break;
    }

    if !at_line_end(input)? {
        return Err(reader_error(
            input,
            ErrorCode::E003,
            "invalid block scalar header",
            Some("write `|` or `>`, optionally followed by `-` or `+` and an indentation digit"),
            start,
        ));
    }
    Ok((folded, chomping.unwrap_or(Chomping::Clip), indent))
}

/// Join the lines of a folded scalar: single breaks between ordinary lines
/// become spaces, while empty and more-indented lines keep their breaks.
fn fold_lines(lines: &[&str]) -> String {
    let mut text = String::new();
    let mut breaks = 0;
    let mut previous_indented = None;

    for line in lines {
        if line.is_empty() {
            breaks += 1;
            continue;
        }
        let indented = line.starts_with([' ', '\t']);
        match previous_indented {
            None => text.push_str(&"\n".repeat(breaks)),
            Some(false) if !indented => {
                if breaks == 0 {
                    text.push(' ');
                } else {
                    text.push_str(&"\n".repeat(breaks));
                }
            }
            Some(_) => text.push_str(&"\n".repeat(breaks + 1)),
        }
        text.push_str(line);
        breaks = 0;
        previous_indented = Some(indented);
    }
    text
}

/// Consume the content lines of a block scalar.
///
/// Content continues while lines are blank or indented at least as far as
/// the first content line, which must itself be indented past the parent.
fn block_scalar<'a>(input: &mut Input<'a>, header: BlockHeader<'a>) -> IResult<RawScalar<'a>> {
    let mut content_indent = header.indent.map(|indent| header.parent_indent + indent);
    let mut raw_lines: Vec<&'a str> = Vec::new();
    let mut content_span: Option<ByteRange<usize>> = None;

    while !input.is_empty() {
        let checkpoint = input.checkpoint();
        let line_start = input.current_token_start();
        let full = till_line_ending.parse_next(input)?;
        let indent = full.len() - full.trim_start_matches(' ').len();

        if !full.trim().is_empty() {
            let required = content_indent.unwrap_or(indent);
            if indent <= header.parent_indent || indent < required {
                input.reset(&checkpoint);
                break;
            }
            content_indent = Some(required);
            let end = input.current_token_start();
            content_span = Some(content_span.map_or(line_start + required..end, |span| span.start..end));
        }
        raw_lines.push(full);

        if opt(line_ending).parse_next(input)?.is_none() {
            break;
        }
    }

    let required = content_indent.unwrap_or(0);
    let lines: Vec<&str> = raw_lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.get(required..).unwrap_or("")
            }
        })
        .collect();

    let trailing = lines.iter().rev().take_while(|line| line.is_empty()).count();
    let body = &lines[..lines.len() - trailing];
    let mut text = if header.folded {
        fold_lines(body)
    } else {
        body.join("\n")
    };
    match header.chomping {
        Chomping::Strip => {}
        Chomping::Clip if !body.is_empty() => text.push('\n'),
        Chomping::Clip => {}
        Chomping::Keep => {
            if !body.is_empty() {
                text.push('\n');
            }
            text.push_str(&"\n".repeat(trailing));
        }
    }

    let style = if header.folded {
        ScalarStyle::Folded
    } else {
        ScalarStyle::Literal
    };
    Ok(RawScalar {
        tag: header.tag,
        text: Cow::Owned(text),
        style,
        span: content_span.unwrap_or(header.span),
    })
}

/// Parse a mapping key and its `:`.
fn key<'a>(input: &mut Input<'a>) -> IResult<(RawScalar<'a>, usize)> {
    let tag = opt(tag).parse_next(input)?;
    let (text, span, style) = alt((
        quoted,
        plain_key
            .with_span()
            .map(|(text, span)| (Cow::Borrowed(text), span, ScalarStyle::Plain)),
    ))
    .parse_next(input)?;

    (
        space0,
        ':',
        peek(alt((space1.void(), line_ending.void(), eof.void()))),
    )
        .parse_next(input)?;
    let colon_end = input.current_token_start();

    Ok((
        RawScalar {
            tag,
            text,
            style,
            span,
        },
        colon_end,
    ))
}

/// Parse a value: a possibly tagged scalar, or a flow collection.
fn value<'a>(input: &mut Input<'a>, tag: Option<&'a str>, max_depth: usize) -> IResult<RawValue<'a>> {
    let scalar = |(text, span, style): (Cow<'a, str>, ByteRange<usize>, ScalarStyle)| {
        RawValue::Scalar(RawScalar {
            tag,
            text,
            style,
            span,
        })
    };

    alt((
        quoted.map(scalar),
        |i: &mut Input<'a>| flow_collection(i, 1, max_depth),
        unsupported,
        plain_value
            .with_span()
            .map(|(text, span)| scalar((Cow::Borrowed(text), span, ScalarStyle::Plain))),
        // A tag with nothing after it tags the empty scalar.
        peek(line_end)
            .span()
            .map(|span| scalar((Cow::Borrowed(""), span, ScalarStyle::Plain))),
    ))
    .parse_next(input)
}

fn unexpected_content(input: &mut Input<'_>, start: usize) -> ErrMode<ContextError<ReaderDiagnostic>> {
    reader_error(
        input,
        ErrorCode::E003,
        "unexpected content",
        Some("only one scalar is allowed per line; quote values that contain special characters"),
        start,
    )
}

/// Lex one line, stopping before its line ending.
fn line<'a>(input: &mut Input<'a>, seen_content: bool, max_depth: usize) -> IResult<LineTokens<'a>> {
    let mut tokens = Vec::new();
    let line_start = input.current_token_start();

    if opt(terminated("---", line_end)).parse_next(input)?.is_some() {
        if seen_content {
            return Err(reader_error(
                input,
                ErrorCode::E004,
                "multiple documents are not supported",
                None,
                line_start,
            ));
        }
        return Ok((tokens, None));
    }
    let marker_with_content = opt(peek(alt((
        ("---", space1).void(),
        ("...", alt((space1.void(), line_ending.void(), eof.void()))).void(),
    ))))
    .parse_next(input)?;
    if marker_with_content.is_some() {
        return Err(reader_error(
            input,
            ErrorCode::E004,
            "document markers with content are not supported",
            None,
            line_start,
        ));
    }

    take_while(0.., ' ').parse_next(input)?;
    if at_line_end(input)? {
        return Ok((tokens, None));
    }
    if opt(peek('\t')).parse_next(input)?.is_some() {
        return Err(reader_error(
            input,
            ErrorCode::E002,
            "tabs are not allowed in indentation",
            Some("indent with spaces"),
            line_start,
        ));
    }
    let mut parent_indent = input.current_token_start() - line_start;

    loop {
        let dash_start = input.current_token_start();
        let dash = opt(terminated(
            '-',
            peek(alt((space1.void(), line_ending.void(), eof.void()))),
        ))
        .parse_next(input)?;
        if dash.is_none() {
            break;
        }
        tokens.push(RawToken::Dash(dash_start..dash_start + 1));
        parent_indent = dash_start - line_start;
        space0.parse_next(input)?;
        if at_line_end(input)? {
            return Ok((tokens, None));
        }
    }

    if let Some((key, colon_end)) = opt(key).parse_next(input)? {
        parent_indent = key.span.start - line_start;
        tokens.push(RawToken::Key(key, colon_end));
        space0.parse_next(input)?;
        if at_line_end(input)? {
            return Ok((tokens, None));
        }
        let value_start = input.current_token_start();
        if opt(peek(('-', alt((space1.void(), line_ending.void(), eof.void())))))
            .parse_next(input)?
            .is_some()
        {
            return Err(reader_error(
                input,
                ErrorCode::E003,
                "sequence entries are not allowed here",
                Some("start the sequence on the next line"),
                value_start,
            ));
        }
    }

    let value_start = input.current_token_start();
    if let Some((name, span)) = opt(alias).parse_next(input)? {
        tokens.push(RawToken::Alias(name, span));
    } else {
        let (tag, anchor) = properties(input)?;
        let anchored = anchor.is_some();
        if let Some((name, span)) = anchor {
            tokens.push(RawToken::Anchor(name, span));
        }
        if anchored && tag.is_none() && at_line_end(input)? {
            // The anchored node starts on the next line.
            return Ok((tokens, None));
        }

        let header_start = input.current_token_start();
        if let Some((folded, chomping, indent)) = opt(block_header).parse_next(input)? {
            let header = BlockHeader {
                tag,
                folded,
                chomping,
                indent,
                parent_indent,
                span: header_start..header_start + 1,
            };
            return Ok((tokens, Some(header)));
        }

        tokens.push(RawToken::Value(value(input, tag, max_depth)?));
    }

    if !at_line_end(input)? {
        return Err(unexpected_content(input, value_start));
    }
    Ok((tokens, None))
}

/// Consume the rest of the current line and its line ending.
fn skip_line<'a>(input: &mut Input<'a>) -> IResult<()> {
    (
        take_while(0.., |c: char| c != '\n'),
        opt('\n'),
    )
        .void()
        .parse_next(input)
}

/// Lexer that accumulates tokens and diagnostics while reading lines.
struct Lexer<'a> {
    index: LineIndex<'a>,
    filename: Arc<str>,
    max_depth: usize,
    tokens: Vec<Token>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, filename: Arc<str>, max_depth: usize) -> Self {
        Self {
            index: LineIndex::new(source),
            filename,
            max_depth,
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            let line_start = input.current_token_start();
            let block = match line(&mut input, !self.tokens.is_empty(), self.max_depth) {
                Ok((tokens, block)) => {
                    for token in tokens {
                        self.push(token);
                    }
                    block
                }
                Err(e) => {
                    let error_pos = input.current_token_start();
                    let diagnostic = self.convert_err_mode(e, error_pos);
                    self.diagnostics.emit(diagnostic);
                    None
                }
            };

            let _ = skip_line(&mut input);
            if input.current_token_start() == line_start && !input.is_empty() {
                input.next_token();
            }

            if let Some(header) = block {
                match block_scalar(&mut input, header) {
                    Ok(scalar) => self.push(RawToken::Value(RawValue::Scalar(scalar))),
                    Err(e) => {
                        let error_pos = input.current_token_start();
                        let diagnostic = self.convert_err_mode(e, error_pos);
                        self.diagnostics.emit(diagnostic);
                    }
                }
            }
        }
    }

    fn push(&mut self, raw: RawToken<'_>) {
        match self.convert_token(raw) {
            Ok(token) => self.tokens.push(token),
            Err(diagnostic) => self.diagnostics.emit(diagnostic),
        }
    }

    fn finish(self) -> Result<Vec<Token>, Diagnostics> {
        let tokens = self.tokens;
        self.diagnostics.finish().map(|_| tokens)
    }

    fn convert_scalar(&self, raw: RawScalar<'_>) -> Scalar {
        let tag = match raw.tag {
            Some("!") => Tag::Str,
            Some(tag) => Tag::parse(tag),
            None if raw.style == ScalarStyle::Plain => resolve_plain(&raw.text),
            None => Tag::Str,
        };
        let range = self.index.range(&self.filename, raw.span);
        Scalar::new(raw.text.into_owned(), tag, range).with_style(raw.style)
    }

    fn convert_value(&self, raw: RawValue<'_>) -> Result<Node, Diagnostic> {
        match raw {
            RawValue::Scalar(raw) => Ok(self.convert_scalar(raw).into()),
            RawValue::Sequence(items, span) => {
                let items = items
                    .into_iter()
                    .map(|item| self.convert_value(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Sequence::new(items, self.index.range(&self.filename, span)).into())
            }
            RawValue::Mapping(pairs, span) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.convert_scalar(key);
                    check_duplicate(&entries, &key)?;
                    let value = self.convert_value(value)?;
                    entries.push(Entry::new(key.into(), value));
                }
                Ok(Mapping::new(entries, self.index.range(&self.filename, span)).into())
            }
        }
    }

    fn convert_token(&self, raw: RawToken<'_>) -> Result<Token, Diagnostic> {
        let token = match raw {
            RawToken::Dash(span) => Token {
                kind: TokenKind::Dash,
                start: self.index.pos(span.start),
                end: self.index.pos(span.end),
            },
            RawToken::Key(raw, colon_end) => {
                let start = self.index.pos(raw.span.start);
                Token {
                    kind: TokenKind::Key(self.convert_scalar(raw)),
                    start,
                    end: self.index.pos(colon_end),
                }
            }
            RawToken::Anchor(name, span) => Token {
                kind: TokenKind::Anchor(name.to_string()),
                start: self.index.pos(span.start),
                end: self.index.pos(span.end),
            },
            RawToken::Alias(name, span) => Token {
                kind: TokenKind::Alias(name.to_string()),
                start: self.index.pos(span.start),
                end: self.index.pos(span.end),
            },
            RawToken::Value(raw) => {
                let node = self.convert_value(raw)?;
                Token {
                    start: node.range().start(),
                    end: node.range().end(),
                    kind: TokenKind::Value(node),
                }
            }
        };
        Ok(token)
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E003 (unexpected content) if no diagnostic context is
    /// found.
    fn convert_err_mode(&self, err: ErrMode<ContextError<ReaderDiagnostic>>, error_pos: usize) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(ReaderDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let subject = self
                .index
                .range(&self.filename, *start..error_pos.max(*start));
            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_subject(subject);
            if let Some(h) = help {
                diag = diag.with_detail(*h);
            }
            return diag;
        }

        let subject = self
            .index
            .range(&self.filename, error_pos..error_pos.saturating_add(1).min(self.index.source.len()));
        Diagnostic::error("unexpected content")
            .with_code(ErrorCode::E003)
            .with_subject(subject)
    }
}

/// Split `source` into tokens, collecting errors from every broken line.
///
/// Flow collections nesting deeper than `max_depth` are rejected while
/// lexing.
pub(super) fn tokenize(source: &str, filename: &Arc<str>, max_depth: usize) -> Result<Vec<Token>, Diagnostics> {
    let mut lexer = Lexer::new(source, Arc::clone(filename), max_depth);
    lexer.tokenize(LocatingSlice::new(source));
    lexer.finish()
}
