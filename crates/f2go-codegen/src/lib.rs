//! # f2go Code Generator
//!
//! Renders the Go tree as Go source text.
//!
//! ## Output Rules
//!
//! 1. **gofmt layout**: tab indentation, labels outdented one level, `case`
//!    clauses aligned with their `switch`.
//! 2. **Minimal parentheses**: only where Go precedence needs them, plus any
//!    [`Expr::Paren`] the source spelled out.
//! 3. **Compact temporaries**: function literals made only of simple
//!    statements stay on one line.

use f2go_goast::{Expr, File, FuncDecl, Param, Stmt, UnaryOp};
use std::fmt::Write;

/// Precedence of unary operators
const UNARY_PREC: u8 = 6;
/// Precedence of calls, indexing and selectors
const POSTFIX_PREC: u8 = 7;

/// Code generation options
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Emit doc comments and carried-over comment lines
    pub include_comments: bool,
    /// One indentation level
    pub indent: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            include_comments: true,
            indent: "\t".to_string(),
        }
    }
}

/// Go code generator
pub struct GoCodegen {
    options: CodegenOptions,
}

impl GoCodegen {
    /// Create a new code generator
    pub fn new(options: CodegenOptions) -> Self {
        Self { options }
    }

    /// Render a whole file
    pub fn generate(&self, file: &File) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "package {}", file.package);

        match file.imports.as_slice() {
            [] => {}
            [single] => {
                let _ = writeln!(out, "\nimport \"{}\"", single);
            }
            many => {
                out.push_str("\nimport (\n");
                for import in many {
                    let _ = writeln!(out, "{}\"{}\"", self.options.indent, import);
                }
                out.push_str(")\n");
            }
        }

        for func in &file.decls {
            out.push('\n');
            out.push_str(&self.generate_func(func));
        }
        out
    }

    /// Render one function declaration
    pub fn generate_func(&self, func: &FuncDecl) -> String {
        let mut printer = Printer::new(&self.options);
        if self.options.include_comments {
            for line in &func.doc {
                printer.line(&format!("//{}", line));
            }
        }

        let params: Vec<String> = func.params.iter().map(param).collect();
        let result = func
            .result
            .as_ref()
            .map(|r| format!(" ({})", param(r)))
            .unwrap_or_default();
        printer.line(&format!(
            "func {}({}){} {{",
            func.name,
            params.join(", "),
            result
        ));
        printer.block(&func.body);
        printer.line("}");
        printer.out
    }

    /// Render one expression
    pub fn generate_expr(&self, expr: &Expr) -> String {
        Printer::new(&self.options).expr(expr, 0)
    }
}

impl Default for GoCodegen {
    fn default() -> Self {
        Self::new(CodegenOptions::default())
    }
}

fn param(p: &Param) -> String {
    format!("{} {}", p.name, p.ty)
}

/// Indentation-aware line writer
struct Printer<'a> {
    options: &'a CodegenOptions,
    out: String,
    level: usize,
}

impl<'a> Printer<'a> {
    fn new(options: &'a CodegenOptions) -> Self {
        Self {
            options,
            out: String::new(),
            level: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.level {
            self.out.push_str(&self.options.indent);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Statements one level deeper than the current line
    fn block(&mut self, stmts: &[Stmt]) {
        self.level += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.level -= 1;
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if let Some(simple) = self.simple_stmt(stmt) {
            self.line(&simple);
            return;
        }
        match stmt {
            Stmt::If { .. } => {
                let head = self.if_head(stmt);
                self.if_chain(stmt, head);
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
            } => {
                let head = match (init, cond, post) {
                    (None, None, None) => "for {".to_string(),
                    (None, Some(cond), None) => format!("for {} {{", self.expr(cond, 0)),
                    _ => format!(
                        "for {}; {}; {} {{",
                        self.opt_simple(init.as_deref()),
                        cond.as_ref().map(|c| self.expr(c, 0)).unwrap_or_default(),
                        self.opt_simple(post.as_deref()),
                    ),
                };
                self.line(&head);
                self.block(body);
                self.line("}");
            }
            Stmt::Switch { tag, cases } => {
                let head = format!("switch {} {{", self.expr(tag, 0));
                self.line(&head);
                for case in cases {
                    let values: Vec<String> =
                        case.values.iter().map(|v| self.expr(v, 0)).collect();
                    if values.is_empty() {
                        self.line("default:");
                    } else {
                        self.line(&format!("case {}:", values.join(", ")));
                    }
                    self.block(&case.body);
                }
                self.line("}");
            }
            Stmt::Block(stmts) => {
                self.line("{");
                self.block(stmts);
                self.line("}");
            }
            Stmt::Labeled { label, stmt } => {
                // gofmt outdents labels by one level
                let level = self.level;
                self.level = level.saturating_sub(1);
                self.line(&format!("{}:", label));
                self.level = level;
                if **stmt != Stmt::Empty {
                    self.stmt(stmt);
                }
            }
            Stmt::Comment(text) => {
                if self.options.include_comments {
                    self.line(&format!("//{}", text));
                }
            }
            // simple statements were printed above
            _ => {}
        }
    }

    fn if_head(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::If { cond, .. } => format!("if {} {{", self.expr(cond, 0)),
            _ => String::new(),
        }
    }

    /// `if` with its `else if` / `else` continuation
    fn if_chain(&mut self, stmt: &Stmt, head: String) {
        let Stmt::If { body, els, .. } = stmt else {
            return;
        };
        self.line(&head);
        self.block(body);
        match els.as_deref() {
            None => self.line("}"),
            Some(next @ Stmt::If { .. }) => {
                let head = format!("}} else {}", self.if_head(next));
                self.if_chain(next, head);
            }
            Some(Stmt::Block(stmts)) => {
                self.line("} else {");
                self.block(stmts);
                self.line("}");
            }
            Some(other) => {
                self.line("} else {");
                self.block(std::slice::from_ref(other));
                self.line("}");
            }
        }
    }

    fn opt_simple(&self, stmt: Option<&Stmt>) -> String {
        stmt.and_then(|s| self.simple_stmt(s)).unwrap_or_default()
    }

    /// Statements that fit on one line
    fn simple_stmt(&self, stmt: &Stmt) -> Option<String> {
        let text = match stmt {
            Stmt::VarDecl { name, ty } => format!("var {} {}", name, ty),
            Stmt::Assign { lhs, op, rhs } => format!(
                "{} {} {}",
                self.expr(lhs, 0),
                op.as_str(),
                self.expr(rhs, 0)
            ),
            Stmt::IncDec { target, inc } => {
                format!("{}{}", self.expr(target, 0), if *inc { "++" } else { "--" })
            }
            Stmt::Expr(expr) => self.expr(expr, 0),
            Stmt::Goto(label) => format!("goto {}", label),
            Stmt::Return(None) => "return".to_string(),
            Stmt::Return(Some(expr)) => format!("return {}", self.expr(expr, 0)),
            _ => return None,
        };
        Some(text)
    }

    /// Render `expr`, parenthesized if it binds looser than `parent`
    fn expr(&self, expr: &Expr, parent: u8) -> String {
        let (text, prec) = match expr {
            Expr::Ident(name) => (name.clone(), POSTFIX_PREC),
            Expr::Lit { value, .. } => (value.clone(), POSTFIX_PREC),
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                let text = format!(
                    "{} {} {}",
                    self.expr(lhs, prec),
                    op.as_str(),
                    self.expr(rhs, prec + 1)
                );
                (text, prec)
            }
            Expr::Unary { op, operand } => {
                let inner = self.expr(operand, UNARY_PREC);
                // `- -x` must not print as the `--` operator
                let inner = match (op, inner.chars().next()) {
                    (UnaryOp::Neg, Some('-')) | (UnaryOp::Plus, Some('+')) => {
                        format!("({})", inner)
                    }
                    _ => inner,
                };
                (format!("{}{}", op.as_str(), inner), UNARY_PREC)
            }
            Expr::Paren(inner) => (format!("({})", self.expr(inner, 0)), POSTFIX_PREC),
            Expr::Call { func, args } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a, 0)).collect();
                (
                    format!("{}({})", self.expr(func, POSTFIX_PREC), args.join(", ")),
                    POSTFIX_PREC,
                )
            }
            Expr::Index { target, index } => (
                format!(
                    "{}[{}]",
                    self.expr(target, POSTFIX_PREC),
                    self.expr(index, 0)
                ),
                POSTFIX_PREC,
            ),
            Expr::Slice { target, low, high } => {
                let bound = |b: &Option<Box<Expr>>| {
                    b.as_deref().map(|e| self.expr(e, 0)).unwrap_or_default()
                };
                (
                    format!(
                        "{}[{}:{}]",
                        self.expr(target, POSTFIX_PREC),
                        bound(low),
                        bound(high)
                    ),
                    POSTFIX_PREC,
                )
            }
            Expr::Selector { target, field } => (
                format!("{}.{}", self.expr(target, POSTFIX_PREC), field),
                POSTFIX_PREC,
            ),
            Expr::Type(ty) => (ty.to_string(), POSTFIX_PREC),
            Expr::FuncLit { result, body } => (self.func_lit(result.as_ref(), body), POSTFIX_PREC),
        };

        if prec < parent {
            format!("({})", text)
        } else {
            text
        }
    }

    fn func_lit(&self, result: Option<&f2go_goast::GoType>, body: &[Stmt]) -> String {
        let head = match result {
            Some(ty) => format!("func() {}", ty),
            None => "func()".to_string(),
        };
        let simple: Option<Vec<String>> = body.iter().map(|s| self.simple_stmt(s)).collect();
        match simple {
            Some(lines) if lines.is_empty() => format!("{} {{}}", head),
            Some(lines) => format!("{} {{ {} }}", head, lines.join("; ")),
            None => {
                let mut nested = Printer {
                    options: self.options,
                    out: String::new(),
                    level: self.level,
                };
                nested.block(body);
                let mut closing = String::new();
                for _ in 0..self.level {
                    closing.push_str(&self.options.indent);
                }
                format!("{} {{\n{}{}}}", head, nested.out, closing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use f2go_goast::{
        AssignOp, BasicType, BinaryOp, CaseClause, FileBuilder, GoType, LitKind,
    };

    fn codegen() -> GoCodegen {
        GoCodegen::default()
    }

    fn func(body: Vec<Stmt>) -> FuncDecl {
        FuncDecl {
            name: "F".to_string(),
            doc: vec![],
            params: vec![],
            result: None,
            body,
        }
    }

    #[test]
    fn test_file_layout() {
        let mut builder = FileBuilder::new("blas");
        builder.add_import("math").add_import("fmt");
        builder.add_func(FuncDecl {
            name: "S".to_string(),
            doc: vec!["  Scales a vector".to_string()],
            params: vec![Param::new("N", GoType::pointer_to(GoType::Basic(BasicType::Int)))],
            result: None,
            body: vec![],
        });
        let out = codegen().generate(&builder.build());
        assert_eq!(
            out,
            "package blas\n\nimport (\n\t\"fmt\"\n\t\"math\"\n)\n\n//  Scales a vector\nfunc S(N *int) {\n}\n"
        );
    }

    #[test]
    fn test_single_import_and_named_result() {
        let mut builder = FileBuilder::new("main");
        builder.add_import("fmt");
        builder.add_func(FuncDecl {
            name: "CDOTU".to_string(),
            doc: vec![],
            params: vec![],
            result: Some(Param::new("CDOTU_RES", GoType::Basic(BasicType::Complex128))),
            body: vec![Stmt::Return(None)],
        });
        let out = codegen().generate(&builder.build());
        assert!(out.contains("import \"fmt\"\n"));
        assert!(out.contains("func CDOTU() (CDOTU_RES complex128) {\n\treturn\n}\n"));
    }

    #[test]
    fn test_precedence_parentheses() {
        let sum = Expr::binary(BinaryOp::Add, Expr::ident("A"), Expr::ident("B"));
        let product = Expr::binary(BinaryOp::Mul, sum.clone(), Expr::ident("C"));
        assert_eq!(codegen().generate_expr(&product), "(A + B) * C");

        let diff = Expr::binary(
            BinaryOp::Sub,
            Expr::ident("A"),
            Expr::binary(BinaryOp::Sub, Expr::ident("B"), Expr::ident("C")),
        );
        assert_eq!(codegen().generate_expr(&diff), "A - (B - C)");

        let neg = Expr::unary(UnaryOp::Neg, Expr::unary(UnaryOp::Neg, Expr::ident("X")));
        assert_eq!(codegen().generate_expr(&neg), "-(-X)");

        let deref = Expr::binary(
            BinaryOp::Add,
            Expr::unary(UnaryOp::Deref, Expr::ident("N")),
            Expr::int(1),
        );
        assert_eq!(codegen().generate_expr(&deref), "*N + 1");
    }

    #[test]
    fn test_postfix_forms() {
        let element = Expr::index(
            Expr::index(Expr::ident("A"), Expr::ident("I")),
            Expr::binary(BinaryOp::Sub, Expr::ident("J"), Expr::int(1)),
        );
        assert_eq!(codegen().generate_expr(&element), "A[I][J - 1]");

        let slice = Expr::Slice {
            target: Box::new(Expr::ident("S")),
            low: Some(Box::new(Expr::int(0))),
            high: None,
        };
        assert_eq!(codegen().generate_expr(&slice), "S[0:]");

        let call = Expr::call(Expr::selector("math", "Pow"), vec![Expr::ident("X"), Expr::int(2)]);
        assert_eq!(codegen().generate_expr(&call), "math.Pow(X, 2)");

        let conv = Expr::call(
            Expr::Type(GoType::slice_of(GoType::Basic(BasicType::Byte))),
            vec![Expr::string("\"N\"")],
        );
        assert_eq!(codegen().generate_expr(&conv), "[]byte(\"N\")");
    }

    #[test]
    fn test_temporary_stays_on_one_line() {
        let temp = Expr::call(
            Expr::FuncLit {
                result: Some(GoType::pointer_to(GoType::Basic(BasicType::Int))),
                body: vec![
                    Stmt::Assign {
                        lhs: Expr::ident("y"),
                        op: AssignOp::Define,
                        rhs: Expr::int(1),
                    },
                    Stmt::Return(Some(Expr::unary(UnaryOp::Addr, Expr::ident("y")))),
                ],
            },
            vec![],
        );
        assert_eq!(
            codegen().generate_expr(&temp),
            "func() *int { y := 1; return &y }()"
        );
    }

    #[test]
    fn test_loops() {
        let counted = Stmt::For {
            init: Some(Box::new(Stmt::assign(Expr::ident("I"), Expr::int(1)))),
            cond: Some(Expr::binary(BinaryOp::Le, Expr::ident("I"), Expr::ident("N"))),
            post: Some(Box::new(Stmt::IncDec {
                target: Expr::ident("I"),
                inc: true,
            })),
            body: vec![Stmt::assign(Expr::ident("X"), Expr::ident("I"))],
        };
        let forever = Stmt::For {
            init: None,
            cond: None,
            post: None,
            body: vec![],
        };
        let out = codegen().generate_func(&func(vec![counted, forever]));
        assert_eq!(
            out,
            "func F() {\n\tfor I = 1; I <= N; I++ {\n\t\tX = I\n\t}\n\tfor {\n\t}\n}\n"
        );
    }

    #[test]
    fn test_else_if_chain() {
        let stmt = Stmt::If {
            cond: Expr::ident("A"),
            body: vec![Stmt::Return(None)],
            els: Some(Box::new(Stmt::If {
                cond: Expr::ident("B"),
                body: vec![Stmt::Goto("Label10".to_string())],
                els: Some(Box::new(Stmt::Block(vec![Stmt::Expr(Expr::call(
                    Expr::ident("G"),
                    vec![],
                ))]))),
            })),
        };
        let out = codegen().generate_func(&func(vec![stmt]));
        assert_eq!(
            out,
            "func F() {\n\tif A {\n\t\treturn\n\t} else if B {\n\t\tgoto Label10\n\t} else {\n\t\tG()\n\t}\n}\n"
        );
    }

    #[test]
    fn test_switch_labels_and_comments() {
        let body = vec![
            Stmt::Switch {
                tag: Expr::ident("K"),
                cases: vec![CaseClause {
                    values: vec![Expr::int(1)],
                    body: vec![Stmt::Goto("Label10".to_string())],
                }],
            },
            Stmt::Comment("Label20:".to_string()),
            Stmt::Labeled {
                label: "Label10".to_string(),
                stmt: Box::new(Stmt::assign(
                    Expr::ident("X"),
                    Expr::Lit {
                        kind: LitKind::Float,
                        value: "1.5e-3".to_string(),
                    },
                )),
            },
            Stmt::label("Label30"),
        ];
        let out = codegen().generate_func(&func(body));
        assert_eq!(
            out,
            "func F() {\n\tswitch K {\n\tcase 1:\n\t\tgoto Label10\n\t}\n\t//Label20:\nLabel10:\n\tX = 1.5e-3\nLabel30:\n}\n"
        );

        let quiet = GoCodegen::new(CodegenOptions {
            include_comments: false,
            indent: "    ".to_string(),
        });
        let out = quiet.generate_func(&func(vec![Stmt::Comment(" note".to_string()), Stmt::Return(None)]));
        assert_eq!(out, "func F() {\n    return\n}\n");
    }
}
