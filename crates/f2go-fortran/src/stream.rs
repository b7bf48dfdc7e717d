//! Cursor over the node stream.
//!
//! The parser edits the stream while it walks it: END markers for labeled
//! DO loops and a fake `PROGRAM MAIN` header are spliced in, consumed
//! FORMAT lines are erased. Every edit keeps the cursor on the node it
//! pointed at before, except that nodes spliced exactly at the cursor are
//! read next.

use crate::token::{Node, TokenKind};
use f2go_core::{SourceLocation, TranspileError};

#[derive(Debug, Clone)]
pub struct NodeStream {
    nodes: Vec<Node>,
    cursor: usize,
}

impl NodeStream {
    /// Wrap a node list; a trailing `Eof` is added if missing
    pub fn new(mut nodes: Vec<Node>) -> Self {
        if nodes.last().map(|n| n.kind) != Some(TokenKind::Eof) {
            let pos = nodes.last().map(|n| n.pos).unwrap_or_default();
            nodes.push(Node::new(TokenKind::Eof, "", pos));
        }
        Self { nodes, cursor: 0 }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn seek(&mut self, at: usize) {
        self.cursor = at.min(self.last_index());
    }

    fn last_index(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Node under the cursor; `Eof` once past the end
    pub fn current(&self) -> &Node {
        self.at(self.cursor)
    }

    pub fn at(&self, index: usize) -> &Node {
        &self.nodes[index.min(self.last_index())]
    }

    pub fn kind(&self) -> TokenKind {
        self.current().kind
    }

    pub fn peek_kind(&self, offset: usize) -> TokenKind {
        self.at(self.cursor + offset).kind
    }

    pub fn pos(&self) -> SourceLocation {
        self.current().pos
    }

    pub fn at_eof(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    /// Step past the current node, never past `Eof`
    pub fn advance(&mut self) {
        if self.cursor < self.last_index() {
            self.cursor += 1;
        }
    }

    /// Take the current node and step past it
    pub fn bump(&mut self) -> Node {
        let node = self.current().clone();
        self.advance();
        node
    }

    /// Consume `kind` if it is next
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a node of `kind` or fail with the node actually found
    pub fn expect(&mut self, kind: TokenKind) -> f2go_core::Result<Node> {
        if self.kind() == kind {
            Ok(self.bump())
        } else {
            Err(self.unexpected(kind.view()))
        }
    }

    /// Error for an unexpected node at the cursor
    pub fn unexpected(&self, expected: &str) -> TranspileError {
        let node = self.current();
        TranspileError::UnexpectedToken {
            expected: expected.to_string(),
            found: node.kind.view().to_string(),
            literal: node.text.escape_debug().to_string(),
            location: node.pos,
        }
    }

    /// Index of the next `Newline` (or `Eof`) at or after `from`
    pub fn line_end(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.last_index()
            && !matches!(self.nodes[i].kind, TokenKind::Newline | TokenKind::Eof)
        {
            i += 1;
        }
        i
    }

    /// Index of the first node of the line containing `index`
    pub fn line_start(&self, index: usize) -> usize {
        let mut i = index.min(self.last_index());
        while i > 0 && self.nodes[i - 1].kind != TokenKind::Newline {
            i -= 1;
        }
        i
    }

    /// Nodes from the cursor up to (not including) the line end
    pub fn rest_of_line(&self) -> &[Node] {
        let end = self.line_end(self.cursor);
        &self.nodes[self.cursor.min(end)..end]
    }

    /// Move past the next `Newline`
    pub fn skip_line(&mut self) {
        self.cursor = self.line_end(self.cursor);
        self.advance_over_newline();
    }

    fn advance_over_newline(&mut self) {
        if self.kind() == TokenKind::Newline {
            self.advance();
        }
    }

    /// Copy of nodes in `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Vec<Node> {
        let end = end.min(self.nodes.len());
        self.nodes[start.min(end)..end].to_vec()
    }

    /// Insert nodes before `at`; returns how many were inserted
    pub fn splice(&mut self, at: usize, nodes: Vec<Node>) -> usize {
        let at = at.min(self.last_index());
        let n = nodes.len();
        self.nodes.splice(at..at, nodes);
        if at < self.cursor {
            self.cursor += n;
        }
        n
    }

    /// Remove nodes in `start..end`, never the final `Eof`
    pub fn erase(&mut self, start: usize, end: usize) -> usize {
        let end = end.min(self.last_index());
        if start >= end {
            return 0;
        }
        let n = end - start;
        self.nodes.drain(start..end);
        if self.cursor >= end {
            self.cursor -= n;
        } else if self.cursor > start {
            self.cursor = start;
        }
        n
    }

    /// Remove the whole line containing `index`, its `Newline` included
    pub fn erase_line(&mut self, index: usize) -> usize {
        let start = self.line_start(index);
        let mut end = self.line_end(index);
        if self.nodes[end].kind == TokenKind::Newline {
            end += 1;
        }
        self.erase(start, end)
    }

    /// Remove one node
    pub fn remove(&mut self, index: usize) -> Option<Node> {
        if index >= self.last_index() {
            return None;
        }
        let node = self.nodes.remove(index);
        if self.cursor > index {
            self.cursor -= 1;
        }
        Some(node)
    }
}
