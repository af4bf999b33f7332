//! Builds the node tree from lexer tokens.
//!
//! Nesting follows indentation: a mapping owns every key token in its
//! column, a sequence owns every dash in its column, and a token further
//! right than its parent's column belongs to the parent's last entry.
//!
//! Anchored nodes are remembered as they finish loading, and an alias is
//! replaced by a copy of the node its anchor names.

use std::{collections::HashMap, iter::Peekable, sync::Arc, vec};

use log::trace;
use trellis_core::{
    node::{Document, Entry, Mapping, Node, Scalar, Sequence, Tag},
    position::{Pos, Range},
};

use super::lexer::{Token, TokenKind};
use crate::error::{Diagnostic, ErrorCode, Result};

/// How many nodes aliases may copy into one document.
const MAX_ALIASED_NODES: usize = 10_000;

/// The leading token kind, copied out so the token stream can be advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lead {
    Dash,
    Key,
    Anchor,
    Alias,
    Value,
}

pub(super) struct Loader {
    tokens: Peekable<vec::IntoIter<Token>>,
    filename: Arc<str>,
    max_depth: usize,
    anchors: HashMap<String, Node>,
    aliased_nodes: usize,
}

impl Loader {
    pub(super) fn new(tokens: Vec<Token>, filename: Arc<str>, max_depth: usize) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
            filename,
            max_depth,
            anchors: HashMap::new(),
            aliased_nodes: 0,
        }
    }

    /// Load the whole token stream as one document.
    ///
    /// An empty stream is an empty mapping.
    pub(super) fn load(mut self) -> Result<Node> {
        let root = if self.tokens.peek().is_some() {
            self.node(0)?
        } else {
            Mapping::new(Vec::new(), Range::point(Arc::clone(&self.filename), Pos::START)).into()
        };

        if let Some(token) = self.tokens.next() {
            return Err(self.unexpected(token).into());
        }

        Ok(Document::new(root).into())
    }

    fn peek_lead(&mut self) -> Option<(Lead, Pos)> {
        self.tokens.peek().map(|token| {
            let lead = match token.kind {
                TokenKind::Dash => Lead::Dash,
                TokenKind::Key(_) => Lead::Key,
                TokenKind::Anchor(_) => Lead::Anchor,
                TokenKind::Alias(_) => Lead::Alias,
                TokenKind::Value(_) => Lead::Value,
            };
            (lead, token.start)
        })
    }

    fn node(&mut self, depth: usize) -> Result<Node> {
        let Some((lead, start)) = self.peek_lead() else {
            return Ok(self.null_at(Pos::START));
        };

        if depth > self.max_depth {
            return Err(self.too_deep(start).into());
        }

        match lead {
            Lead::Dash => self.sequence(start.column(), depth),
            Lead::Key => self.mapping(start.column(), depth),
            Lead::Anchor => self.anchored(depth),
            Lead::Alias => self.alias(depth),
            Lead::Value => match self.tokens.next() {
                Some(Token {
                    kind: TokenKind::Value(node),
                    ..
                }) => {
                    self.check_nesting(&node, depth, start)?;
                    Ok(node)
                }
                _ => Ok(self.null_at(start)),
            },
        }
    }

    /// Whether the next token continues the entry introduced by `lead`:
    /// it sits on the same line, or on a later line indented past `column`.
    fn continues(&mut self, lead: Pos, column: usize) -> bool {
        self.tokens
            .peek()
            .is_some_and(|next| next.start.line() == lead.line() || next.start.column() > column)
    }

    /// Load the value that follows a key or dash spanning `start..end`, and
    /// record it under the anchor written between them, if any.
    fn value_after(
        &mut self,
        start: Pos,
        end: Pos,
        column: usize,
        depth: usize,
        compact_sequence: bool,
    ) -> Result<Node> {
        let anchor = self.tokens.next_if(Token::is_anchor);
        let end = anchor.as_ref().map_or(end, |anchor| anchor.end);

        let value = if self.continues(start, column) {
            self.node(depth + 1)?
        } else if compact_sequence
            && self
                .tokens
                .peek()
                .is_some_and(|next| next.is_dash() && next.start.column() == column)
        {
            // A sequence may sit at the same indentation as its key.
            self.sequence(column, depth + 1)?
        } else {
            self.null_at(end)
        };

        if let Some(Token {
            kind: TokenKind::Anchor(name),
            ..
        }) = anchor
        {
            self.remember(name, &value);
        }
        Ok(value)
    }

    /// Load a node that starts with its own anchor, such as an anchored root.
    fn anchored(&mut self, depth: usize) -> Result<Node> {
        let Some(Token {
            kind: TokenKind::Anchor(name),
            start,
            end,
        }) = self.tokens.next()
        else {
            return Ok(self.null_at(Pos::START));
        };

        let owns_next = self.tokens.peek().is_some_and(|next| {
            next.start.line() == start.line() || next.start.column() >= start.column()
        });
        let value = if owns_next {
            self.node(depth)?
        } else {
            self.null_at(end)
        };

        self.remember(name, &value);
        Ok(value)
    }

    fn remember(&mut self, name: String, value: &Node) {
        trace!(anchor = name.as_str(); "Anchored node");
        self.anchors.insert(name, value.clone());
    }

    fn alias(&mut self, depth: usize) -> Result<Node> {
        let Some(Token {
            kind: TokenKind::Alias(name),
            start,
            end,
        }) = self.tokens.next()
        else {
            return Ok(self.null_at(Pos::START));
        };
        let subject = Range::new(Arc::clone(&self.filename), start, end);

        let node = match self.anchors.get(&name) {
            Some(node) => node.clone(),
            None => {
                return Err(Diagnostic::error(format!("unknown alias \"*{name}\""))
                    .with_code(ErrorCode::E006)
                    .with_subject(subject)
                    .with_detail("define the anchor with `&name` before the alias refers to it")
                    .into());
            }
        };

        self.aliased_nodes = self.aliased_nodes.saturating_add(node_count(&node));
        if self.aliased_nodes > MAX_ALIASED_NODES {
            return Err(Diagnostic::error(format!(
                "aliases expand to more than {MAX_ALIASED_NODES} nodes"
            ))
            .with_code(ErrorCode::E004)
            .with_subject(subject)
            .into());
        }

        self.check_nesting(&node, depth, start)?;
        Ok(node)
    }

    fn sequence(&mut self, column: usize, depth: usize) -> Result<Node> {
        let start = self.peek_lead().map_or(Pos::START, |(_, pos)| pos);
        let mut items = Vec::new();

        while let Some(dash) = self
            .tokens
            .next_if(|token| token.is_dash() && token.start.column() == column)
        {
            let item = self.value_after(dash.start, dash.end, column, depth, false)?;
            items.push(item);
        }

        Ok(Sequence::spanning(Arc::clone(&self.filename), start, items).into())
    }

    fn mapping(&mut self, column: usize, depth: usize) -> Result<Node> {
        let start = self.peek_lead().map_or(Pos::START, |(_, pos)| pos);
        let mut entries: Vec<Entry> = Vec::new();

        while let Some(token) = self
            .tokens
            .next_if(|token| token.is_key() && token.start.column() == column)
        {
            let Token {
                kind: TokenKind::Key(key),
                start: key_start,
                end: key_end,
            } = token
            else {
                continue;
            };
            check_duplicate(&entries, &key)?;

            let value = self.value_after(key_start, key_end, column, depth, true)?;
            entries.push(Entry::new(key.into(), value));
        }

        Ok(Mapping::spanning(Arc::clone(&self.filename), start, entries).into())
    }

    /// Reject a finished node that would put leaves deeper than allowed.
    fn check_nesting(&self, node: &Node, depth: usize, start: Pos) -> Result<()> {
        if depth + nesting(node) > self.max_depth {
            return Err(self.too_deep(start).into());
        }
        Ok(())
    }

    fn too_deep(&self, start: Pos) -> Diagnostic {
        Diagnostic::error(format!("document nests deeper than {} levels", self.max_depth))
            .with_code(ErrorCode::E205)
            .with_subject(Range::point(Arc::clone(&self.filename), start))
    }

    fn null_at(&self, pos: Pos) -> Node {
        Scalar::new("", Tag::Null, Range::point(Arc::clone(&self.filename), pos)).into()
    }

    fn unexpected(&self, token: Token) -> Diagnostic {
        let subject = Range::new(Arc::clone(&self.filename), token.start, token.end);
        match token.kind {
            TokenKind::Value(_) | TokenKind::Alias(_) => Diagnostic::error("unexpected scalar")
                .with_code(ErrorCode::E003)
                .with_subject(subject)
                .with_detail("multi-line plain scalars are not supported; quote the value"),
            TokenKind::Anchor(_) => Diagnostic::error("anchor without a node")
                .with_code(ErrorCode::E003)
                .with_subject(subject),
            TokenKind::Dash => Diagnostic::error("bad indentation of a sequence item")
                .with_code(ErrorCode::E002)
                .with_subject(subject),
            TokenKind::Key(_) => Diagnostic::error("bad indentation of a mapping entry")
                .with_code(ErrorCode::E002)
                .with_subject(subject),
        }
    }
}

/// How many collection levels sit below `node`. Empty collections and
/// scalars add none.
fn nesting(node: &Node) -> usize {
    match node {
        Node::Document(doc) => nesting(doc.root()),
        Node::Mapping(mapping) => mapping
            .entries()
            .iter()
            .map(|entry| 1 + nesting(entry.value()))
            .max()
            .unwrap_or(0),
        Node::Sequence(sequence) => sequence
            .items()
            .iter()
            .map(|item| 1 + nesting(item))
            .max()
            .unwrap_or(0),
        Node::Scalar(_) => 0,
    }
}

fn node_count(node: &Node) -> usize {
    1 + match node {
        Node::Document(doc) => node_count(doc.root()),
        Node::Mapping(mapping) => mapping
            .entries()
            .iter()
            .map(|entry| 1 + node_count(entry.value()))
            .sum(),
        Node::Sequence(sequence) => sequence.items().iter().map(node_count).sum(),
        Node::Scalar(_) => 0,
    }
}

/// Reject `key` if `entries` already holds a scalar key with the same text.
pub(super) fn check_duplicate(
    entries: &[Entry],
    key: &Scalar,
) -> std::result::Result<(), Diagnostic> {
    let Some(first) = entries
        .iter()
        .find(|entry| entry.key_text() == Some(key.text()))
    else {
        return Ok(());
    };

    Err(
        Diagnostic::error(format!("duplicate mapping key \"{}\"", key.text()))
            .with_code(ErrorCode::E005)
            .with_subject(key.range().clone())
            .with_context(first.key().range().clone())
            .with_detail(format!("first defined at {}", first.key().range())),
    )
}
