//! Compilation context and program-unit parsing.
//!
//! A [`Parser`] owns the node stream for the whole run. Each program unit
//! gets a fresh [`UnitScope`]; the stream, the import set and the
//! diagnostics live across units.

use crate::rewrite;
use crate::stream::NodeStream;
use crate::symbols::{BaseType, TypeDescriptor, UnitScope};
use crate::token::{Node, TokenKind};
use crate::Translation;
use f2go_core::{Aborted, DiagnosticKind, Diagnostics, Result, SourceLocation};
use f2go_goast::{AssignOp, BinaryOp, Expr, File, FileBuilder, FuncDecl, GoType, Param, Stmt};
use std::collections::{BTreeSet, HashSet};

/// Modifiers that may precede a unit keyword and carry no meaning in Go
const UNIT_PREFIXES: &[&str] = &["PURE", "ELEMENTAL"];

/// Loop variables for nested allocations, outermost first
const LOOP_VARS: &[&str] = &["u", "v", "w"];

/// Recursive-descent parser over one source file
pub struct Parser {
    pub(crate) stream: NodeStream,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) imports: BTreeSet<String>,
    /// Every PROGRAM/SUBROUTINE/FUNCTION name, in source order
    pub(crate) units: Vec<String>,
    pub(crate) scope: UnitScope,
    /// First node of the unit being parsed; bounds label lookup
    pub(crate) unit_start: usize,
    pending_doc: Vec<String>,
}

impl Parser {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            stream: NodeStream::new(nodes),
            diagnostics: Diagnostics::new(),
            imports: BTreeSet::new(),
            units: Vec::new(),
            scope: UnitScope::default(),
            unit_start: 0,
            pending_doc: Vec::new(),
        }
    }

    /// Parse the whole stream into a Go file
    pub fn parse(mut self, package: &str) -> std::result::Result<Translation, Aborted> {
        match self.parse_file(package) {
            Ok(file) => Ok(Translation {
                file,
                diagnostics: self.diagnostics.into_vec(),
            }),
            Err(error) => Err(self.diagnostics.abort(error)),
        }
    }

    fn parse_file(&mut self, package: &str) -> Result<File> {
        self.discover_units();
        let mut builder = FileBuilder::new(package);

        loop {
            match self.stream.kind() {
                TokenKind::Eof => break,
                TokenKind::Newline => self.stream.advance(),
                TokenKind::Comment => {
                    let comment = self.stream.bump();
                    self.pending_doc.push(comment.text);
                }
                _ if self.at_unit_header() => {
                    let func = self.parse_unit()?;
                    builder.add_func(func);
                }
                _ => self.insert_fake_program(),
            }
        }

        for import in &self.imports {
            builder.add_import(import);
        }
        Ok(builder.build())
    }

    /// Collect unit names and drop prefixes such as RECURSIVE
    fn discover_units(&mut self) {
        let mut i = 0;
        while i + 1 < self.stream.len() {
            let kind = self.stream.at(i).kind;
            let next = self.stream.at(i + 1).kind;
            let is_prefix = kind == TokenKind::Recursive
                || (kind == TokenKind::Ident
                    && UNIT_PREFIXES.contains(&self.stream.at(i).text.as_str())
                    && (next.is_unit_keyword() || next.is_type_keyword()));
            if is_prefix {
                self.stream.remove(i);
                continue;
            }

            let after_end = i > 0 && self.stream.at(i - 1).kind == TokenKind::End;
            if kind.is_unit_keyword()
                && !after_end
                && next == TokenKind::Ident
            {
                let name = self.stream.at(i + 1).text.clone();
                if !self.units.contains(&name) {
                    self.units.push(name);
                }
            }
            i += 1;
        }
        tracing::debug!(units = ?self.units, "discovered program units");
    }

    /// Whether the current line opens a program unit
    pub(crate) fn at_unit_header(&self) -> bool {
        let kind = self.stream.kind();
        kind.is_unit_keyword()
            || (kind.is_type_keyword()
                && self
                    .stream
                    .rest_of_line()
                    .iter()
                    .any(|n| n.kind == TokenKind::Function))
    }

    /// Wrap statements found outside any unit in `PROGRAM MAIN`; later
    /// runs of stray statements get `MAIN2`, `MAIN3`, ...
    fn insert_fake_program(&mut self) {
        let mut name = "MAIN".to_string();
        let mut n = 1;
        while self.units.contains(&name) {
            n += 1;
            name = format!("MAIN{}", n);
        }

        let pos = self.stream.pos();
        self.diagnostics.push(
            DiagnosticKind::FakeProgram,
            format!("Add fake PROGRAM {}", name),
            Some(pos),
        );
        self.units.push(name.clone());
        let at = self.stream.cursor();
        self.stream.splice(
            at,
            vec![
                Node::new(TokenKind::Program, "PROGRAM", pos),
                Node::new(TokenKind::Ident, name, pos),
                Node::newline(pos),
            ],
        );
    }

    /// Consume the end of a statement line
    pub(crate) fn expect_line_end(&mut self) -> Result<()> {
        match self.stream.kind() {
            TokenKind::Newline => {
                self.stream.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.stream.unexpected(TokenKind::Newline.view())),
        }
    }

    /// Parse one PROGRAM, SUBROUTINE or FUNCTION through its END line
    pub(crate) fn parse_unit(&mut self) -> Result<FuncDecl> {
        self.unit_start = self.stream.line_start(self.stream.cursor());

        let prefix = if self.stream.kind().is_type_keyword() {
            Some(self.parse_type_spec()?)
        } else {
            None
        };

        let keyword = self.stream.current().clone();
        if !keyword.kind.is_unit_keyword() {
            return Err(self
                .stream
                .unexpected("PROGRAM, SUBROUTINE or FUNCTION"));
        }
        self.stream.advance();
        let name = self.stream.expect(TokenKind::Ident)?.text;

        self.scope = UnitScope::new(&self.units);
        self.scope.unit = name.clone();
        self.scope.params = self.parse_params()?;
        self.expect_line_end()?;

        let doc = std::mem::take(&mut self.pending_doc);
        tracing::debug!(unit = %name, kind = %keyword.kind, params = self.scope.params.len(), "parsing unit");

        let body = self.parse_list()?;
        if self.stream.kind() == TokenKind::Else {
            return Err(self.stream.unexpected(TokenKind::End.view()));
        }

        let is_function = keyword.kind == TokenKind::Function;
        Ok(self.finish_unit(name, doc, is_function, prefix, body))
    }

    fn parse_params(&mut self) -> Result<Vec<String>> {
        let mut params = Vec::new();
        if !self.stream.eat(TokenKind::LParen) {
            return Ok(params);
        }
        loop {
            match self.stream.kind() {
                TokenKind::RParen => {
                    self.stream.advance();
                    return Ok(params);
                }
                TokenKind::Comma => self.stream.advance(),
                TokenKind::Ident => params.push(self.stream.bump().text),
                TokenKind::Star => {
                    let pos = self.stream.pos();
                    self.diagnostics.push(
                        DiagnosticKind::MalformedDeclaration,
                        "Alternate return in parameter list is ignored",
                        Some(pos),
                    );
                    self.stream.advance();
                }
                _ => return Err(self.stream.unexpected(TokenKind::Ident.view())),
            }
        }
    }

    /// Resolve types, allocate locals and run the rewrite passes
    fn finish_unit(
        &mut self,
        name: String,
        doc: Vec<String>,
        is_function: bool,
        prefix: Option<TypeDescriptor>,
        mut body: Vec<Stmt>,
    ) -> FuncDecl {
        let result_name = format!("{}_RES", name);
        let result = is_function.then(|| {
            let ty = prefix
                .or_else(|| self.scope.symbols.remove(&name))
                .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::implicit(&name)));
            Param::new(result_name.clone(), ty.go_type())
        });

        self.scope.remove_externals();

        let mut params = Vec::new();
        let mut by_pointer = HashSet::new();
        let mut by_reference = HashSet::new();
        for param in std::mem::take(&mut self.scope.params) {
            if self.scope.is_external(&param) {
                params.push(Param::new(param, GoType::Func));
                continue;
            }
            let ty = self
                .scope
                .symbols
                .remove(&param)
                .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::implicit(&param)));
            if ty.is_reference() {
                by_reference.insert(param.clone());
                params.push(Param::new(param, ty.go_type()));
            } else {
                by_pointer.insert(param.clone());
                params.push(Param::new(param, GoType::pointer_to(ty.go_type())));
            }
        }

        let mut inits = self.initializers();
        rewrite::deref_params(&by_pointer, &mut inits);
        rewrite::deref_params(&by_pointer, &mut body);
        if is_function {
            rewrite::rename(&name, &result_name, &mut body);
        }
        rewrite::call_arguments(&self.scope, &by_reference, &mut body);

        inits.append(&mut body);
        let mut body = inits;
        if is_function && !matches!(body.last(), Some(Stmt::Return(_))) {
            body.push(Stmt::Return(None));
        }

        for label in rewrite::neutralize_dead_labels(&self.scope.labels, &mut body) {
            self.diagnostics.push(
                DiagnosticKind::DeadLabel,
                format!("{} is not used", label),
                None,
            );
        }

        FuncDecl {
            name,
            doc,
            params,
            result,
            body,
        }
    }

    /// Declarations for every remaining local
    fn initializers(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        let symbols = std::mem::take(&mut self.scope.symbols);

        for (name, ty) in &symbols {
            if !ty.is_reference() {
                stmts.push(Stmt::VarDecl {
                    name: name.clone(),
                    ty: ty.go_type(),
                });
                continue;
            }

            let sizes: Option<Vec<Expr>> = ty.extents().map(|e| e.size_expr()).collect();
            match sizes {
                Some(sizes) => {
                    let go_type = ty.go_type();
                    stmts.push(Stmt::Assign {
                        lhs: Expr::ident(name.as_str()),
                        op: AssignOp::Define,
                        rhs: make(go_type.clone(), sizes[0].clone()),
                    });
                    stmts.extend(allocate_rows(Expr::ident(name.as_str()), &go_type, &sizes, 0));
                }
                None => {
                    self.diagnostics.push(
                        DiagnosticKind::UnallocatedArray,
                        format!("{} has an assumed size and is not allocated", name),
                        None,
                    );
                    stmts.push(Stmt::VarDecl {
                        name: name.clone(),
                        ty: ty.go_type(),
                    });
                }
            }
        }

        self.scope.symbols = symbols;
        stmts
    }

    /// Record that a lowering needs a Go package
    pub(crate) fn require(&mut self, import: &str) {
        self.imports.insert(import.to_string());
    }

    /// Location of the current node
    pub(crate) fn pos(&self) -> SourceLocation {
        self.stream.pos()
    }
}

/// `make(T, size)`
fn make(ty: GoType, size: Expr) -> Expr {
    Expr::call(Expr::ident("make"), vec![Expr::Type(ty), size])
}

/// Allocate the inner slices of `target`, already made with `sizes[0]`
fn allocate_rows(target: Expr, ty: &GoType, sizes: &[Expr], depth: usize) -> Vec<Stmt> {
    let (GoType::Slice(elem), [outer, inner, ..]) = (ty, sizes) else {
        return Vec::new();
    };
    let var = LOOP_VARS
        .get(depth)
        .map(|v| v.to_string())
        .unwrap_or_else(|| format!("u{}", depth));
    let row = Expr::index(target, Expr::ident(var.as_str()));

    let mut body = vec![Stmt::assign(row.clone(), make((**elem).clone(), inner.clone()))];
    body.extend(allocate_rows(row, elem, &sizes[1..], depth + 1));

    vec![Stmt::For {
        init: Some(Box::new(Stmt::Assign {
            lhs: Expr::ident(var.as_str()),
            op: AssignOp::Define,
            rhs: Expr::int(0),
        })),
        cond: Some(Expr::binary(BinaryOp::Lt, Expr::ident(var.as_str()), outer.clone())),
        post: Some(Box::new(Stmt::IncDec {
            target: Expr::ident(var.as_str()),
            inc: true,
        })),
        body,
    }]
}
