//! WRITE and PRINT statements.
//!
//! Both become `fmt.Printf`. A labeled FORMAT is looked up inside the
//! current unit and compiled once; the line is erased from the stream and
//! later statements using the same label reuse the compiled descriptors.

use crate::format;
use crate::parser::Parser;
use crate::scanner::Scanner;
use crate::symbols::LabelBook;
use crate::token::{Node, TokenKind};
use f2go_core::{DiagnosticKind, Result, TranspileError};
use f2go_goast::{Expr, Stmt};

/// Format item of a WRITE or PRINT control list
#[derive(Debug, Clone)]
enum FormatSpec {
    /// `*`
    ListDirected,
    /// Statement label of a FORMAT line
    Label(Node),
    /// Character constant holding the descriptors
    Inline(Node),
}

impl Parser {
    /// `WRITE(<unit>, <format>) [list]`
    pub(crate) fn parse_write(&mut self) -> Result<Vec<Stmt>> {
        let write = self.stream.expect(TokenKind::Write)?;
        self.stream.expect(TokenKind::LParen)?;

        self.eat_keyword("UNIT");
        match self.stream.kind() {
            TokenKind::Star | TokenKind::Int => self.stream.advance(),
            _ => {
                return Err(TranspileError::Unsupported {
                    message: format!(
                        "WRITE unit `{}` is not `*` or a constant",
                        self.stream.current().text
                    ),
                    location: write.pos,
                })
            }
        }
        self.stream.expect(TokenKind::Comma)?;
        self.eat_keyword("FMT");
        let spec = self.parse_format_spec()?;

        if !self.stream.eat(TokenKind::RParen) {
            return Err(TranspileError::Unsupported {
                message: "WRITE control list with more than unit and format".to_string(),
                location: self.stream.pos(),
            });
        }
        self.finish_output(spec)
    }

    /// `PRINT <format> [, list]`
    pub(crate) fn parse_print(&mut self) -> Result<Vec<Stmt>> {
        self.stream.expect(TokenKind::Print)?;
        let spec = self.parse_format_spec()?;
        self.stream.eat(TokenKind::Comma);
        self.finish_output(spec)
    }

    /// Consume `NAME =` if it is next
    fn eat_keyword(&mut self, name: &str) -> bool {
        let is_keyword = self.stream.kind() == TokenKind::Ident
            && self.stream.current().text == name
            && self.stream.peek_kind(1) == TokenKind::Assign;
        if is_keyword {
            self.stream.advance();
            self.stream.advance();
        }
        is_keyword
    }

    fn parse_format_spec(&mut self) -> Result<FormatSpec> {
        let node = self.stream.current().clone();
        let spec = match node.kind {
            TokenKind::Star => FormatSpec::ListDirected,
            TokenKind::Int => FormatSpec::Label(node),
            TokenKind::Str => FormatSpec::Inline(node),
            _ => {
                return Err(TranspileError::Unsupported {
                    message: format!("format specifier `{}`", node.text),
                    location: node.pos,
                })
            }
        };
        self.stream.advance();
        Ok(spec)
    }

    /// Output list, then the `fmt.Printf` call
    fn finish_output(&mut self, spec: FormatSpec) -> Result<Vec<Stmt>> {
        if self
            .stream
            .rest_of_line()
            .iter()
            .any(|n| n.kind == TokenKind::Assign)
        {
            self.skip_unsupported("implied DO in an output list is not translated");
            return Ok(Vec::new());
        }

        let mut args = Vec::new();
        while !matches!(self.stream.kind(), TokenKind::Newline | TokenKind::Eof) {
            args.push(self.parse_expr()?);
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_line_end()?;

        let format = match spec {
            FormatSpec::ListDirected => format::list_directed(args.len()),
            FormatSpec::Inline(node) => {
                let text = format::unquote(&node.text);
                let mut nodes = Scanner::free().scan(&text)?;
                nodes.retain(|n| !matches!(n.kind, TokenKind::Newline | TokenKind::Eof));
                format::compile(&nodes, &mut self.diagnostics)
            }
            FormatSpec::Label(label) => match self.labeled_format(&label.text) {
                Some(format) => format,
                None => {
                    self.diagnostics.push(
                        DiagnosticKind::MissingLabel,
                        format!("FORMAT {} not found, using list-directed output", label.text),
                        Some(label.pos),
                    );
                    format::list_directed(args.len())
                }
            },
        };

        self.require("fmt");
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(Expr::string(format));
        call_args.extend(args);
        Ok(vec![Stmt::Expr(Expr::call(
            Expr::selector("fmt", "Printf"),
            call_args,
        ))])
    }

    /// Compiled FORMAT for `label`, compiling it on first use
    fn labeled_format(&mut self, label: &str) -> Option<String> {
        let name = LabelBook::name(label);
        if let Some(format) = self.scope.formats.get(&name) {
            return Some(format.clone());
        }
        let nodes = self.take_format_line(label)?;
        let format = format::compile(&nodes, &mut self.diagnostics);
        self.scope.formats.insert(name, format.clone());
        Some(format)
    }

    /// Find `label FORMAT(...)` in the current unit, forward from the
    /// cursor first; returns its descriptors and erases the line
    fn take_format_line(&mut self, label: &str) -> Option<Vec<Node>> {
        let wanted = LabelBook::name(label);
        let cursor = self.stream.cursor();

        let forward = self.line_starts(cursor, self.stream.len());
        let backward = self.line_starts(self.unit_start, cursor);
        let start = forward
            .into_iter()
            .take_while(|&start| !self.opens_unit(start))
            .chain(backward.into_iter().rev())
            .find(|&start| {
                let first = self.stream.at(start);
                first.kind == TokenKind::Int
                    && LabelBook::name(&first.text) == wanted
                    && self.stream.at(start + 1).kind == TokenKind::Format
            })?;

        let end = self.stream.line_end(start);
        let nodes = self.stream.slice(start + 2, end);
        self.stream.erase_line(start);
        tracing::debug!(label, "consumed FORMAT line");
        Some(nodes)
    }

    /// First node of every line starting in `from..to`
    fn line_starts(&self, from: usize, to: usize) -> Vec<usize> {
        let mut starts = Vec::new();
        let mut i = self.stream.line_start(from);
        while i < to && !self.stream.at(i).is(TokenKind::Eof) {
            starts.push(i);
            i = self.stream.line_end(i) + 1;
        }
        starts
    }

    /// Whether the line starting at `start` is a unit header
    fn opens_unit(&self, start: usize) -> bool {
        let first = self.stream.at(start).kind;
        first.is_unit_keyword()
            || (first.is_type_keyword()
                && (start..self.stream.line_end(start))
                    .any(|i| self.stream.at(i).kind == TokenKind::Function))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(source: &str) -> Parser {
        Parser::new(Scanner::free().scan(source).unwrap())
    }

    fn printf(format: &str, args: Vec<Expr>) -> Vec<Stmt> {
        let mut all = vec![Expr::string(format)];
        all.extend(args);
        vec![Stmt::Expr(Expr::call(Expr::selector("fmt", "Printf"), all))]
    }

    #[test]
    fn test_write_with_forward_format() {
        let mut p = parser("WRITE(*, 100) X\nY = 1\n100 FORMAT(' Result: ', F10.4)\nEND\n");
        let stmts = p.parse_write().unwrap();
        assert_eq!(stmts, printf(r#"" Result: %10.4f\n""#, vec![Expr::ident("X")]));
        assert!(p.imports.contains("fmt"));
        assert!(p.stream.nodes().iter().all(|n| n.kind != TokenKind::Format));
        assert_eq!(p.stream.current().text, "Y");
    }

    #[test]
    fn test_write_with_backward_format() {
        let mut p = parser("10 FORMAT(I5)\nWRITE(6, FMT=10) N\n");
        p.stream.skip_line();
        let stmts = p.parse_write().unwrap();
        assert_eq!(stmts, printf(r#""%5d\n""#, vec![Expr::ident("N")]));
        assert_eq!(p.stream.nodes()[0].kind, TokenKind::Write);
        assert!(p.stream.at_eof());
    }

    #[test]
    fn test_format_shared_by_several_writes() {
        let mut p = parser("WRITE(*, 10) N\nWRITE(*, 10) M\n10 FORMAT(I5)\nPRINT 10, K\n");
        assert_eq!(p.parse_write().unwrap(), printf(r#""%5d\n""#, vec![Expr::ident("N")]));
        assert_eq!(p.parse_write().unwrap(), printf(r#""%5d\n""#, vec![Expr::ident("M")]));
        assert_eq!(p.parse_print().unwrap(), printf(r#""%5d\n""#, vec![Expr::ident("K")]));
        assert_eq!(p.diagnostics.count(DiagnosticKind::MissingLabel), 0);
        assert!(p.stream.nodes().iter().all(|n| n.kind != TokenKind::Format));
    }

    #[test]
    fn test_format_lookup_stops_at_next_unit() {
        let mut p = parser("WRITE(*, 10) N\nEND\nSUBROUTINE T\n10 FORMAT(I5)\nEND\n");
        let stmts = p.parse_write().unwrap();
        assert_eq!(stmts, printf(r#"" %v\n""#, vec![Expr::ident("N")]));
        assert_eq!(p.diagnostics.count(DiagnosticKind::MissingLabel), 1);
        assert!(p.stream.nodes().iter().any(|n| n.kind == TokenKind::Format));
    }

    #[test]
    fn test_list_directed_write() {
        let mut p = parser("WRITE(UNIT=6, FMT=*) A, 'x'\n");
        let stmts = p.parse_write().unwrap();
        assert_eq!(
            stmts,
            printf(r#"" %v %v\n""#, vec![Expr::ident("A"), Expr::string(r#""x""#)])
        );
    }

    #[test]
    fn test_inline_format() {
        let mut p = parser("WRITE(*, '(A, I3)') 'N = ', N\n");
        let stmts = p.parse_write().unwrap();
        assert_eq!(
            stmts,
            printf(
                r#""%s%3d\n""#,
                vec![Expr::string(r#""N = ""#), Expr::ident("N")]
            )
        );
    }

    #[test]
    fn test_print_forms() {
        let mut p = parser("PRINT *, 'hello'\nPRINT 20, K\n20 FORMAT(I2)\n");
        assert_eq!(
            p.parse_print().unwrap(),
            printf(r#"" %v\n""#, vec![Expr::string(r#""hello""#)])
        );
        assert_eq!(
            p.parse_print().unwrap(),
            printf(r#""%2d\n""#, vec![Expr::ident("K")])
        );
    }

    #[test]
    fn test_implied_do_output_is_skipped() {
        let mut p = parser("WRITE(*,*) (A(I), I = 1, N)\nX = 1\n");
        assert!(p.parse_write().unwrap().is_empty());
        assert_eq!(p.diagnostics.count(DiagnosticKind::UnsupportedStatement), 1);
        assert_eq!(p.stream.current().text, "X");
    }

    #[test]
    fn test_unsupported_control_lists() {
        let mut p = parser("WRITE(*, 10, IOSTAT=K) X\n");
        assert!(matches!(
            p.parse_write().unwrap_err(),
            TranspileError::Unsupported { .. }
        ));

        let mut p = parser("WRITE(NOUT, *) X\n");
        assert!(matches!(
            p.parse_write().unwrap_err(),
            TranspileError::Unsupported { .. }
        ));
    }
}
