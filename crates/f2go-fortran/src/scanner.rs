//! Source scanner.
//!
//! Turns FORTRAN text into a flat [`Node`] stream. Every logical line ends
//! with a `Newline` node; a statement label becomes a leading `Int` node and
//! a whole-line comment becomes a single `Comment` node. The stream always
//! ends with `Eof`.

use crate::token::{Node, TokenKind};
use f2go_core::{SourceForm, SourceLocation, TranspileError};
use logos::Logos;

/// Last column read in fixed form
const FIXED_WIDTH: usize = 72;

/// Column where fixed-form statements start
const FIXED_BODY_COLUMN: usize = 7;

/// One logical line after continuation handling
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    /// Physical line the statement starts on
    pub line: usize,
    /// First column of `text` in the physical line
    pub column: usize,
    /// Label from columns 1-5
    pub label: Option<String>,
    pub text: String,
    pub comment: bool,
}

/// Line scanner for both source forms
pub struct Scanner {
    fixed_format: bool,
}

impl Scanner {
    /// Scanner for column-significant FORTRAN 77 source
    pub fn fixed() -> Self {
        Self { fixed_format: true }
    }

    /// Scanner for free-form source
    pub fn free() -> Self {
        Self {
            fixed_format: false,
        }
    }

    /// Pick a scanner for a resolved form; `Auto` reads as fixed
    pub fn for_form(form: SourceForm) -> Self {
        match form {
            SourceForm::Free => Self::free(),
            SourceForm::Fixed | SourceForm::Auto => Self::fixed(),
        }
    }

    /// Scan a whole source text into nodes
    pub fn scan(&self, source: &str) -> f2go_core::Result<Vec<Node>> {
        let lines = if self.fixed_format {
            self.preprocess_fixed(source)
        } else {
            self.preprocess_free(source)
        };

        let mut nodes = Vec::new();
        for line in &lines {
            scan_line(line, &mut nodes)?;
        }

        let last = source.lines().count() + 1;
        nodes.push(Node::new(TokenKind::Eof, "", SourceLocation::new(last, 1)));
        tracing::trace!(lines = lines.len(), nodes = nodes.len(), "scanned source");
        Ok(nodes)
    }

    /// Split fixed-form source into logical lines
    pub fn preprocess_fixed(&self, source: &str) -> Vec<LogicalLine> {
        let mut result: Vec<LogicalLine> = Vec::new();

        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }

            // Comment lines (C, c, *, or !)
            if raw.starts_with(['C', 'c', '*', '!']) {
                result.push(LogicalLine {
                    line: line_no,
                    column: 2,
                    label: None,
                    text: raw[1..].trim_end().to_string(),
                    comment: true,
                });
                continue;
            }

            // Tab form: statement right after the tab
            if let Some(rest) = raw.strip_prefix('\t') {
                result.push(LogicalLine {
                    line: line_no,
                    column: 2,
                    label: None,
                    text: rest.trim_end().to_string(),
                    comment: false,
                });
                continue;
            }

            let chars: Vec<char> = raw.chars().take(FIXED_WIDTH).collect();
            let label: String = chars.iter().take(5).collect::<String>().trim().to_string();
            let marker = chars.get(5).copied().unwrap_or(' ');
            let body: String = chars.iter().skip(6).collect();

            // Continuation (column 6)
            if label.is_empty() && marker != ' ' && marker != '0' {
                if let Some(prev) = result.iter_mut().rev().find(|l| !l.comment) {
                    prev.text.push_str(body.trim_end());
                    continue;
                }
            }

            result.push(LogicalLine {
                line: line_no,
                column: FIXED_BODY_COLUMN,
                label: (!label.is_empty()).then_some(label),
                text: body.trim_end().to_string(),
                comment: false,
            });
        }

        result
    }

    /// Split free-form source into logical lines
    pub fn preprocess_free(&self, source: &str) -> Vec<LogicalLine> {
        let mut result: Vec<LogicalLine> = Vec::new();
        let mut continuing = false;

        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('!') {
                result.push(LogicalLine {
                    line: line_no,
                    column: 2,
                    label: None,
                    text: rest.trim_end().to_string(),
                    comment: true,
                });
                continue;
            }

            let (text, more) = match trimmed.strip_suffix('&') {
                Some(head) => (head.trim_end(), true),
                None => (trimmed, false),
            };

            if continuing {
                if let Some(prev) = result.iter_mut().rev().find(|l| !l.comment) {
                    prev.text.push(' ');
                    prev.text.push_str(text.trim_start_matches('&').trim_start());
                    continuing = more;
                    continue;
                }
            }

            let column = raw.len() - raw.trim_start().len() + 1;
            result.push(LogicalLine {
                line: line_no,
                column,
                label: None,
                text: text.to_string(),
                comment: false,
            });
            continuing = more;
        }

        result
    }
}

/// Lex one logical line, appending its nodes
fn scan_line(line: &LogicalLine, nodes: &mut Vec<Node>) -> f2go_core::Result<()> {
    let start = SourceLocation::new(line.line, 1);

    if line.comment {
        nodes.push(Node::new(TokenKind::Comment, line.text.clone(), start));
        nodes.push(Node::newline(start));
        return Ok(());
    }

    if let Some(label) = &line.label {
        nodes.push(Node::new(TokenKind::Int, label.clone(), start));
    }

    let mut lexer = TokenKind::lexer(&line.text);
    let mut prev_end = usize::MAX;
    while let Some(token) = lexer.next() {
        let span = lexer.span();
        let pos = SourceLocation::new(line.line, line.column + span.start);
        let kind = token.map_err(|_| TranspileError::Lexer {
            text: lexer.slice().to_string(),
            location: pos,
        })?;

        match kind {
            TokenKind::InlineComment => {}
            TokenKind::Semicolon => nodes.push(Node::newline(pos)),
            TokenKind::ElseIf => {
                nodes.push(Node::new(TokenKind::Else, "ELSE", pos));
                nodes.push(Node::new(TokenKind::If, "IF", pos));
            }
            TokenKind::Period if span.start == prev_end => match nodes.last_mut() {
                Some(last) if last.kind == TokenKind::Int => {
                    last.kind = TokenKind::Float;
                    last.text.push('.');
                }
                _ => nodes.push(Node::new(kind, ".", pos)),
            },
            TokenKind::Str => nodes.push(Node::new(kind, lexer.slice(), pos)),
            _ => nodes.push(Node::new(kind, lexer.slice().to_uppercase(), pos)),
        }
        prev_end = span.end;
    }

    let end = SourceLocation::new(line.line, line.column + line.text.len());
    nodes.push(Node::newline(end));
    Ok(())
}
