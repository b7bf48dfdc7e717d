//! DATA statements.
//!
//! `DATA names /values/ [, names /values/]...` becomes one assignment per
//! element. Matrices are filled in storage order, first subscript fastest.

use crate::parser::Parser;
use crate::statement::bytes_of;
use crate::symbols::Extent;
use crate::token::TokenKind;
use f2go_core::{DiagnosticKind, Result, SourceLocation, TranspileError};
use f2go_goast::{Expr, Stmt};

/// One name (or element) on the left of a value list
#[derive(Debug)]
enum Target {
    /// Undeclared name; consumes one value and produces nothing
    Unresolved(String),
    /// Every element of the target, in storage order
    Elements { name: String, slots: Vec<Expr>, string: bool },
}

impl Target {
    fn width(&self) -> usize {
        match self {
            Self::Unresolved(_) => 1,
            Self::Elements { slots, .. } => slots.len(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Unresolved(name) | Self::Elements { name, .. } => name,
        }
    }
}

impl Parser {
    pub(crate) fn parse_data(&mut self) -> Result<Vec<Stmt>> {
        self.stream.expect(TokenKind::Data)?;
        let mut stmts = Vec::new();

        loop {
            let location = self.stream.pos();
            let Some(targets) = self.parse_data_targets()? else {
                return Ok(stmts);
            };
            self.stream.expect(TokenKind::Slash)?;
            let values = self.parse_data_values()?;
            self.stream.expect(TokenKind::Slash)?;

            let expected: usize = targets.iter().map(Target::width).sum();
            if expected != values.len() {
                let names: Vec<&str> = targets.iter().map(Target::name).collect();
                return Err(TranspileError::DataArity {
                    name: names.join(", "),
                    expected,
                    found: values.len(),
                    location,
                });
            }

            let mut values = values.into_iter();
            for target in targets {
                match target {
                    Target::Unresolved(name) => {
                        values.next();
                        self.diagnostics.push(
                            DiagnosticKind::UnresolvedData,
                            format!("DATA target `{}` is not declared", name),
                            Some(location),
                        );
                    }
                    Target::Elements { slots, string, .. } => {
                        for (slot, value) in slots.into_iter().zip(values.by_ref()) {
                            let value = if string { bytes_of(value) } else { value };
                            stmts.push(Stmt::assign(slot, value));
                        }
                    }
                }
            }

            self.stream.eat(TokenKind::Comma);
            if matches!(self.stream.kind(), TokenKind::Newline | TokenKind::Eof) {
                break;
            }
        }
        self.expect_line_end()?;
        Ok(stmts)
    }

    /// Names before the first `/`; `None` when an implied DO made the
    /// rest of the line untranslatable
    fn parse_data_targets(&mut self) -> Result<Option<Vec<Target>>> {
        let mut targets = Vec::new();
        loop {
            if self.stream.kind() == TokenKind::LParen {
                self.skip_unsupported("implied DO in DATA is not translated");
                return Ok(None);
            }
            let node = self.stream.current().clone();
            if node.kind != TokenKind::Ident {
                return Err(self.stream.unexpected(TokenKind::Ident.view()));
            }
            targets.push(self.parse_data_target(&node.text, node.pos)?);
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(Some(targets))
    }

    fn parse_data_target(&mut self, name: &str, location: SourceLocation) -> Result<Target> {
        let Some(ty) = self.scope.lookup(name).cloned() else {
            self.stream.advance();
            if self.stream.kind() == TokenKind::LParen {
                self.parse_subscripts()?;
            }
            return Ok(Target::Unresolved(name.to_string()));
        };
        let string = ty.is_string();

        if self.stream.peek_kind(1) == TokenKind::LParen {
            let element = self.parse_primary()?;
            return Ok(Target::Elements {
                name: name.to_string(),
                slots: vec![element],
                string,
            });
        }
        self.stream.advance();

        let unsupported = |message: String| TranspileError::Unsupported { message, location };
        let mut sizes = Vec::with_capacity(ty.rank());
        for dim in &ty.dims {
            match &dim.extent {
                Extent::Known(n) => sizes.push(*n),
                _ => {
                    return Err(unsupported(format!(
                        "DATA for `{}` needs constant array bounds",
                        name
                    )))
                }
            }
        }

        let target = Expr::ident(name);
        let slots = match sizes.as_slice() {
            [] => vec![target],
            [n] => (0..*n)
                .map(|i| Expr::index(target.clone(), Expr::int(i as i64)))
                .collect(),
            [rows, cols] => (0..*cols)
                .flat_map(|j| {
                    let target = &target;
                    (0..*rows).map(move |i| {
                        Expr::index(
                            Expr::index(target.clone(), Expr::int(i as i64)),
                            Expr::int(j as i64),
                        )
                    })
                })
                .collect(),
            _ => {
                return Err(unsupported(format!(
                    "DATA for `{}` with rank {} is not supported",
                    name,
                    ty.rank()
                )))
            }
        };
        Ok(Target::Elements {
            name: name.to_string(),
            slots,
            string,
        })
    }

    /// Values between slashes with `r*v` repeats expanded
    fn parse_data_values(&mut self) -> Result<Vec<Expr>> {
        let mut values = Vec::new();
        loop {
            let repeat = if self.stream.kind() == TokenKind::Int
                && self.stream.peek_kind(1) == TokenKind::Star
            {
                let count = self.stream.bump();
                self.stream.advance();
                count.text.parse::<usize>().unwrap_or(1)
            } else {
                1
            };
            let value = self.parse_primary()?;
            values.extend(std::iter::repeat(value).take(repeat));
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(values)
    }
}
