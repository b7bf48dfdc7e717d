//! Statement parser.
//!
//! Every handler starts at the first node of a statement and returns with
//! the cursor just past that statement's `Newline`.

use crate::parser::Parser;
use crate::symbols::{BaseType, Dim, Extent, ExternalKind, TypeDescriptor};
use crate::token::{nodes_to_string, Node, TokenKind};
use f2go_core::{DiagnosticKind, Result, TranspileError};
use f2go_goast::{AssignOp, BinaryOp, CaseClause, Expr, LitKind, Stmt, UnaryOp};

/// Statement keywords accepted without translation
const UNSUPPORTED_WORDS: &[&str] = &[
    "READ", "OPEN", "CLOSE", "REWIND", "BACKSPACE", "ENDFILE", "INQUIRE", "EQUIVALENCE",
    "NAMELIST", "ENTRY", "ASSIGN", "PAUSE", "BLOCK", "USE", "MODULE", "CONTAINS", "INTERFACE",
    "ALLOCATE", "DEALLOCATE", "NULLIFY",
];

impl Parser {
    /// Statements up to the END closing the current block.
    ///
    /// Stops without consuming at ELSE, at the next unit header and at
    /// the end of the stream; consumes the END line.
    pub(crate) fn parse_list(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            match self.stream.kind() {
                TokenKind::Eof | TokenKind::Else => break,
                TokenKind::End => {
                    self.stream.skip_line();
                    break;
                }
                _ if self.at_unit_header() => break,
                _ => stmts.extend(self.parse_statement()?),
            }
        }
        Ok(stmts)
    }

    /// Parse one statement line into zero or more Go statements
    pub(crate) fn parse_statement(&mut self) -> Result<Vec<Stmt>> {
        let node = self.stream.current().clone();
        tracing::trace!(kind = %node.kind, line = node.pos.line, "statement");

        match node.kind {
            TokenKind::Newline => {
                self.stream.advance();
                Ok(Vec::new())
            }
            TokenKind::Comment => {
                self.stream.advance();
                Ok(vec![Stmt::Comment(node.text)])
            }
            TokenKind::Int => self.parse_labeled(),
            kind if kind.is_type_keyword() => self.parse_declaration(),
            TokenKind::If => Ok(vec![self.parse_if()?]),
            TokenKind::Do => Ok(vec![self.parse_do()?]),
            TokenKind::Goto => Ok(vec![self.parse_goto()?]),
            TokenKind::Call => Ok(vec![self.parse_call()?]),
            TokenKind::Return | TokenKind::Stop => {
                self.stream.skip_line();
                Ok(vec![Stmt::Return(None)])
            }
            TokenKind::External | TokenKind::Intrinsic => {
                self.parse_external()?;
                Ok(Vec::new())
            }
            TokenKind::Data => self.parse_data(),
            TokenKind::Write => self.parse_write(),
            TokenKind::Print => self.parse_print(),
            TokenKind::Parameter => self.parse_parameter(),
            TokenKind::Format
            | TokenKind::Implicit
            | TokenKind::Save
            | TokenKind::Continue => {
                self.stream.skip_line();
                Ok(Vec::new())
            }
            TokenKind::Common => {
                self.skip_unsupported("COMMON blocks are not translated");
                Ok(Vec::new())
            }
            TokenKind::Ident if node.text == "DIMENSION" => {
                self.parse_dimension()?;
                Ok(Vec::new())
            }
            TokenKind::Ident
                if UNSUPPORTED_WORDS.contains(&node.text.as_str()) && !self.is_assignment() =>
            {
                self.skip_unsupported(&format!("{} statement is not translated", node.text));
                Ok(Vec::new())
            }
            _ => self.parse_assignment_or_expr(),
        }
    }

    /// Record a diagnostic for the current line and skip it
    pub(crate) fn skip_unsupported(&mut self, message: &str) {
        let pos = self.stream.pos();
        self.diagnostics
            .push(DiagnosticKind::UnsupportedStatement, message, Some(pos));
        self.stream.skip_line();
    }

    fn parse_labeled(&mut self) -> Result<Vec<Stmt>> {
        let label_at = self.stream.cursor();
        let label = self.stream.bump();
        let pending = self.scope.labels.pending_do(&label.text);

        match self.stream.kind() {
            TokenKind::Format => {
                self.stream.skip_line();
                Ok(Vec::new())
            }
            TokenKind::Continue if pending > 0 => {
                // Close every loop waiting on this label, then read the
                // labeled line again once the markers are consumed
                self.scope.labels.close_do(&label.text);
                self.stream.splice(label_at, end_markers(pending, &label));
                self.stream.seek(label_at);
                tracing::debug!(label = %label.text, markers = pending, "closed labeled DO loops");
                Ok(Vec::new())
            }
            TokenKind::Continue => {
                let name = self.scope.labels.declare(&label.text);
                let at = self.stream.cursor();
                self.stream.remove(at);
                self.expect_line_end()?;
                Ok(vec![Stmt::label(name)])
            }
            TokenKind::End => {
                // `10 END DO` closes its own loop
                if pending > 0 {
                    self.scope.labels.close_do(&label.text);
                }
                let name = self.scope.labels.declare(&label.text);
                Ok(vec![Stmt::label(name)])
            }
            _ => {
                if pending > 0 {
                    // The terminal statement itself stays inside the loop
                    self.scope.labels.close_do(&label.text);
                    let after = self.stream.line_end(self.stream.cursor()) + 1;
                    self.stream.splice(after, end_markers(pending, &label));
                    tracing::debug!(label = %label.text, markers = pending, "closed labeled DO loops after terminal statement");
                }
                let name = self.scope.labels.declare(&label.text);
                let mut stmts = self.parse_statement()?;
                if stmts.is_empty() {
                    stmts.push(Stmt::label(name));
                } else {
                    let first = stmts.remove(0);
                    stmts.insert(
                        0,
                        Stmt::Labeled {
                            label: name,
                            stmt: Box::new(first),
                        },
                    );
                }
                Ok(stmts)
            }
        }
    }

    pub(crate) fn parse_if(&mut self) -> Result<Stmt> {
        self.stream.expect(TokenKind::If)?;
        self.stream.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.stream.expect(TokenKind::RParen)?;

        match self.stream.kind() {
            TokenKind::Then => {
                self.stream.advance();
                self.expect_line_end()?;
                let body = self.parse_list()?;
                let els = if self.stream.kind() == TokenKind::Else {
                    Some(Box::new(self.parse_else()?))
                } else {
                    None
                };
                Ok(Stmt::If { cond, body, els })
            }
            TokenKind::Int => self.parse_arithmetic_if(cond),
            _ => {
                let body = self.parse_statement()?;
                Ok(Stmt::If {
                    cond,
                    body,
                    els: None,
                })
            }
        }
    }

    fn parse_else(&mut self) -> Result<Stmt> {
        self.stream.expect(TokenKind::Else)?;
        if self.stream.kind() == TokenKind::If {
            return self.parse_if();
        }
        self.expect_line_end()?;
        Ok(Stmt::Block(self.parse_list()?))
    }

    /// `IF (e) l1, l2, l3`
    fn parse_arithmetic_if(&mut self, value: Expr) -> Result<Stmt> {
        let mut targets = Vec::with_capacity(3);
        for i in 0..3 {
            if i > 0 {
                self.stream.expect(TokenKind::Comma)?;
            }
            let label = self.stream.expect(TokenKind::Int)?;
            targets.push(self.scope.labels.mark_found(&label.text));
        }
        self.expect_line_end()?;

        let zero = Expr::int(0);
        let [negative, null, positive]: [String; 3] = targets
            .try_into()
            .map_err(|_| self.stream.unexpected(TokenKind::Int.view()))?;
        Ok(Stmt::If {
            cond: Expr::binary(BinaryOp::Lt, value.clone(), zero.clone()),
            body: vec![Stmt::Goto(negative)],
            els: Some(Box::new(Stmt::If {
                cond: Expr::binary(BinaryOp::Eq, value, zero),
                body: vec![Stmt::Goto(null)],
                els: Some(Box::new(Stmt::Block(vec![Stmt::Goto(positive)]))),
            })),
        })
    }

    pub(crate) fn parse_do(&mut self) -> Result<Stmt> {
        self.stream.expect(TokenKind::Do)?;

        let label = match self.stream.kind() {
            TokenKind::Int => {
                let label = self.stream.bump();
                self.stream.eat(TokenKind::Comma);
                Some(label)
            }
            _ => None,
        };

        if matches!(self.stream.kind(), TokenKind::Newline | TokenKind::Eof) {
            self.expect_line_end()?;
            self.open_labeled_do(label.as_ref());
            let body = self.parse_list()?;
            return Ok(Stmt::For {
                init: None,
                cond: None,
                post: None,
                body,
            });
        }

        if self.stream.eat(TokenKind::While) {
            self.stream.expect(TokenKind::LParen)?;
            let cond = self.parse_expr()?;
            self.stream.expect(TokenKind::RParen)?;
            self.expect_line_end()?;
            self.open_labeled_do(label.as_ref());
            let body = self.parse_list()?;
            return Ok(Stmt::For {
                init: None,
                cond: Some(cond),
                post: None,
                body,
            });
        }

        let var = self.stream.expect(TokenKind::Ident)?.text;
        self.stream.expect(TokenKind::Assign)?;
        let init = self.parse_expr()?;
        self.stream.expect(TokenKind::Comma)?;
        let bound = self.parse_expr()?;
        let step = if self.stream.eat(TokenKind::Comma) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_line_end()?;

        self.scope.declare_implicit(&var);
        self.open_labeled_do(label.as_ref());
        let body = self.parse_list()?;

        let counter = Expr::ident(var.as_str());
        let cond_op = match &step {
            Some(step) if is_negative_literal(step) => BinaryOp::Ge,
            _ => BinaryOp::Le,
        };
        let post = match step {
            None => Stmt::IncDec {
                target: counter.clone(),
                inc: true,
            },
            Some(step) => Stmt::Assign {
                lhs: counter.clone(),
                op: AssignOp::AddAssign,
                rhs: step,
            },
        };

        Ok(Stmt::For {
            init: Some(Box::new(Stmt::assign(counter.clone(), init))),
            cond: Some(Expr::binary(cond_op, counter, bound)),
            post: Some(Box::new(post)),
            body,
        })
    }

    fn open_labeled_do(&mut self, label: Option<&Node>) {
        if let Some(label) = label {
            self.scope.labels.open_do(&label.text);
        }
    }

    pub(crate) fn parse_goto(&mut self) -> Result<Stmt> {
        let goto = self.stream.expect(TokenKind::Goto)?;

        if self.stream.kind() == TokenKind::Int {
            let label = self.stream.bump();
            self.expect_line_end()?;
            return Ok(Stmt::Goto(self.scope.labels.mark_found(&label.text)));
        }

        self.stream.expect(TokenKind::LParen)?;
        let mut labels = Vec::new();
        while self.stream.kind() == TokenKind::Int {
            let label = self.stream.bump();
            labels.push(self.scope.labels.mark_found(&label.text));
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.stream.expect(TokenKind::RParen)?;
        if labels.is_empty() {
            return Err(TranspileError::EmptyComputedGoto { location: goto.pos });
        }
        self.stream.eat(TokenKind::Comma);
        let index = self.parse_expr()?;
        self.expect_line_end()?;

        let cases = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| CaseClause {
                values: vec![Expr::int(i as i64 + 1)],
                body: vec![Stmt::Goto(label)],
            })
            .collect();
        Ok(Stmt::Switch { tag: index, cases })
    }

    fn parse_call(&mut self) -> Result<Stmt> {
        self.stream.expect(TokenKind::Call)?;
        let name = self.stream.expect(TokenKind::Ident)?.text;
        let args = if self.stream.kind() == TokenKind::LParen {
            self.parse_call_args()?
        } else {
            Vec::new()
        };
        self.expect_line_end()?;
        Ok(Stmt::Expr(Expr::call(Expr::Ident(name), args)))
    }

    /// EXTERNAL / INTRINSIC name lists
    fn parse_external(&mut self) -> Result<()> {
        let kind = ExternalKind::from_keyword(self.stream.bump().kind);
        self.stream.eat(TokenKind::DoubleColon);
        loop {
            let node = self.stream.current();
            if node.kind == TokenKind::Ident || node.kind.is_type_keyword() {
                let name = node.text.clone();
                self.scope.add_external(&name, kind);
                self.stream.advance();
            } else {
                return Err(self.stream.unexpected(TokenKind::Ident.view()));
            }
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_line_end()
    }

    /// Base type with an optional kind or length selector
    pub(crate) fn parse_type_spec(&mut self) -> Result<TypeDescriptor> {
        let keyword = self.stream.bump();
        let mut base = BaseType::from_keyword(keyword.kind).ok_or_else(|| {
            TranspileError::UnexpectedToken {
                expected: "type".to_string(),
                found: keyword.kind.view().to_string(),
                literal: keyword.text.clone(),
                location: keyword.pos,
            }
        })?;

        let mut char_len = None;
        if self.stream.eat(TokenKind::Star) {
            match self.parse_length()? {
                Extent::Known(n) if base != BaseType::Character => base = base.with_kind(n),
                len if base == BaseType::Character => char_len = Some(len),
                _ => {}
            }
        } else if self.stream.kind() == TokenKind::LParen
            && self.stream.peek_kind(1) != TokenKind::RParen
        {
            // REAL(8), REAL(KIND=8), CHARACTER(LEN=*)
            self.stream.advance();
            if self.stream.kind() == TokenKind::Ident
                && self.stream.peek_kind(1) == TokenKind::Assign
            {
                self.stream.advance();
                self.stream.advance();
            }
            let len = if self.stream.eat(TokenKind::Star) {
                Extent::Assumed
            } else {
                let e = self.parse_expr()?;
                self.scope.resolve_extent(e)
            };
            self.stream.expect(TokenKind::RParen)?;
            match len {
                Extent::Known(n) if base != BaseType::Character => base = base.with_kind(n),
                len if base == BaseType::Character => char_len = Some(len),
                _ => {}
            }
        }

        Ok(TypeDescriptor {
            base,
            dims: Vec::new(),
            char_len,
        })
    }

    /// Length after `*`: `n`, `(expr)` or `(*)`
    fn parse_length(&mut self) -> Result<Extent> {
        match self.stream.kind() {
            TokenKind::Int => {
                let n = self.stream.bump();
                Ok(self.scope.resolve_extent(Expr::Lit {
                    kind: LitKind::Int,
                    value: n.text,
                }))
            }
            TokenKind::LParen => {
                self.stream.advance();
                let len = if self.stream.eat(TokenKind::Star) {
                    Extent::Assumed
                } else {
                    let e = self.parse_expr()?;
                    self.scope.resolve_extent(e)
                };
                self.stream.expect(TokenKind::RParen)?;
                Ok(len)
            }
            _ => Err(self.stream.unexpected(TokenKind::Int.view())),
        }
    }

    /// `(d1, d2, ...)` where each entry is `n`, `l:u` or `*`
    fn parse_dims(&mut self) -> Result<Vec<Dim>> {
        self.stream.expect(TokenKind::LParen)?;
        let mut dims = Vec::new();
        loop {
            let dim = if self.stream.eat(TokenKind::Star) {
                Dim::new(Extent::Assumed)
            } else {
                let first = self.parse_expr()?;
                if self.stream.eat(TokenKind::Colon) {
                    let lower = match self.scope.const_eval(&first) {
                        Some(1) => None,
                        _ => Some(first),
                    };
                    let extent = if self.stream.eat(TokenKind::Star) {
                        Extent::Assumed
                    } else {
                        let upper = self.parse_expr()?;
                        self.scope.resolve_extent(span(upper, lower.as_ref()))
                    };
                    Dim { lower, extent }
                } else {
                    Dim::new(self.scope.resolve_extent(first))
                }
            };
            dims.push(dim);
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.stream.expect(TokenKind::RParen)?;
        Ok(dims)
    }

    /// Type declaration line; yields assignments for F90 initializers
    fn parse_declaration(&mut self) -> Result<Vec<Stmt>> {
        let spec = self.parse_type_spec()?;
        let mut shared_dims = Vec::new();

        // F90 attributes: `, DIMENSION(n), INTENT(IN) ::`
        while self.stream.eat(TokenKind::Comma) {
            let attr = self.stream.expect(TokenKind::Ident)?;
            if attr.text == "DIMENSION" {
                shared_dims = self.parse_dims()?;
            } else if self.stream.kind() == TokenKind::LParen {
                self.skip_group()?;
            }
        }
        self.stream.eat(TokenKind::DoubleColon);

        let mut stmts = Vec::new();
        loop {
            let name = self.stream.expect(TokenKind::Ident)?.text;
            let dims = if self.stream.kind() == TokenKind::LParen {
                self.parse_dims()?
            } else {
                shared_dims.clone()
            };
            let char_len = if self.stream.eat(TokenKind::Star) {
                Some(self.parse_length()?)
            } else {
                spec.char_len.clone()
            };
            let ty = TypeDescriptor {
                base: spec.base,
                dims,
                char_len: char_len.filter(|_| spec.base == BaseType::Character),
            };
            self.scope.declare(&name, ty);

            if self.stream.eat(TokenKind::Assign) {
                let value = self.parse_expr()?;
                stmts.push(Stmt::assign(Expr::Ident(name), value));
            }
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_line_end()?;
        Ok(stmts)
    }

    /// `DIMENSION A(n), B(m, k)`
    fn parse_dimension(&mut self) -> Result<()> {
        self.stream.advance();
        loop {
            let name = self.stream.expect(TokenKind::Ident)?.text;
            let dims = self.parse_dims()?;
            let mut ty = self
                .scope
                .lookup(&name)
                .cloned()
                .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::implicit(&name)));
            ty.dims = dims;
            self.scope.declare(&name, ty);
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_line_end()
    }

    /// Skip a balanced parenthesized group
    fn skip_group(&mut self) -> Result<()> {
        self.stream.expect(TokenKind::LParen)?;
        let mut depth = 1;
        while depth > 0 {
            match self.stream.kind() {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                TokenKind::Newline | TokenKind::Eof => {
                    return Err(self.stream.unexpected(TokenKind::RParen.view()))
                }
                _ => {}
            }
            self.stream.advance();
        }
        Ok(())
    }

    /// `PARAMETER (N = 10, EPS = 1.0D-6)`
    fn parse_parameter(&mut self) -> Result<Vec<Stmt>> {
        self.stream.expect(TokenKind::Parameter)?;
        self.stream.expect(TokenKind::LParen)?;
        let mut stmts = Vec::new();
        loop {
            let name = self.stream.expect(TokenKind::Ident)?.text;
            self.stream.expect(TokenKind::Assign)?;
            let value = self.parse_expr()?;
            if let Some(n) = self.scope.const_eval(&value) {
                self.scope.constants.insert(name.clone(), n);
            }
            self.scope.declare_implicit(&name);
            stmts.push(Stmt::assign(Expr::Ident(name), value));
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.stream.expect(TokenKind::RParen)?;
        self.expect_line_end()?;
        Ok(stmts)
    }

    /// Name, optional subscript groups, then `=`
    pub(crate) fn is_assignment(&self) -> bool {
        let line = self.stream.rest_of_line();
        if line.first().map(|n| n.kind) != Some(TokenKind::Ident) {
            return false;
        }
        let mut i = 1;
        while line.get(i).map(|n| n.kind) == Some(TokenKind::LParen) {
            let mut depth = 0usize;
            while let Some(node) = line.get(i) {
                match node.kind {
                    TokenKind::LParen => depth += 1,
                    TokenKind::RParen => depth -= 1,
                    _ => {}
                }
                i += 1;
                if depth == 0 {
                    break;
                }
            }
        }
        line.get(i).map(|n| n.kind) == Some(TokenKind::Assign)
    }

    fn parse_assignment_or_expr(&mut self) -> Result<Vec<Stmt>> {
        if !self.is_assignment() {
            let line = nodes_to_string(self.stream.rest_of_line());
            let expr = self.parse_expr()?;
            self.expect_line_end()?;
            tracing::trace!(%line, "expression statement");
            return Ok(vec![Stmt::Expr(expr)]);
        }

        let lhs = self.parse_expr()?;
        self.stream.expect(TokenKind::Assign)?;
        let mut rhs = self.parse_expr()?;
        self.expect_line_end()?;

        if let Expr::Ident(name) = &lhs {
            self.scope.declare_implicit(name);
            if self.scope.lookup(name).is_some_and(TypeDescriptor::is_string) {
                rhs = bytes_of(rhs);
            }
        }
        if matches!(lhs, Expr::Slice { .. }) {
            return Ok(vec![Stmt::Expr(Expr::call(
                Expr::ident("copy"),
                vec![lhs, bytes_of(rhs)],
            ))]);
        }
        Ok(vec![Stmt::assign(lhs, rhs)])
    }
}

/// `k` synthetic END lines closing loops that share `label`
fn end_markers(count: usize, label: &Node) -> Vec<Node> {
    (0..count)
        .flat_map(|_| {
            [
                Node::new(TokenKind::End, "END", label.pos),
                Node::newline(label.pos),
            ]
        })
        .collect()
}

/// Element count of `lower:upper`
fn span(upper: Expr, lower: Option<&Expr>) -> Expr {
    let Some(lower) = lower else {
        return upper;
    };
    match int_value(lower).map(|l| 1 - l) {
        Some(0) => upper,
        Some(offset) if offset > 0 => Expr::binary(BinaryOp::Add, upper, Expr::int(offset)),
        Some(offset) => Expr::binary(BinaryOp::Sub, upper, Expr::int(-offset)),
        None => {
            let lower = match lower {
                Expr::Binary { .. } => Expr::Paren(Box::new(lower.clone())),
                other => other.clone(),
            };
            Expr::binary(
                BinaryOp::Add,
                Expr::binary(BinaryOp::Sub, upper, lower),
                Expr::int(1),
            )
        }
    }
}

/// Value of a possibly negated integer literal
pub(crate) fn int_value(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Lit {
            kind: LitKind::Int,
            value,
        } => value.parse().ok(),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => int_value(operand).map(|n| -n),
        _ => None,
    }
}

fn is_negative_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => matches!(**operand, Expr::Lit { .. }),
        Expr::Lit { value, .. } => value.starts_with('-'),
        _ => false,
    }
}

/// String literals assigned to character variables become `[]byte(...)`
pub(crate) fn bytes_of(expr: Expr) -> Expr {
    match expr {
        Expr::Lit {
            kind: LitKind::String,
            ..
        } => Expr::call(
            Expr::Type(f2go_goast::GoType::slice_of(f2go_goast::GoType::Basic(
                f2go_goast::BasicType::Byte,
            ))),
            vec![expr],
        ),
        other => other,
    }
}
