//! # f2go Go AST
//!
//! The target tree produced by the FORTRAN frontend. It models the subset of
//! Go the translator emits: functions with pointer and slice parameters,
//! C-style loops, `switch` jump tables, labels and `goto`.
//!
//! ## Design Goals
//!
//! 1. **Rewritable**: every pass after parsing edits the tree in place through
//!    [`visit::VisitorMut`].
//! 2. **Printable**: the codegen crate renders it without extra information.
//! 3. **Serializable**: the CLI can dump it as JSON.

pub mod visit;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One translated source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// Package clause
    pub package: String,
    /// Imported packages, sorted
    pub imports: Vec<String>,
    /// One function per program unit, in source order
    pub decls: Vec<FuncDecl>,
}

impl File {
    /// Find a function by name
    pub fn func(&self, name: &str) -> Option<&FuncDecl> {
        self.decls.iter().find(|d| d.name == name)
    }
}

/// Function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    /// Leading documentation lines, without the `//` marker
    pub doc: Vec<String>,
    pub params: Vec<Param>,
    /// Named result, if the unit was typed as a function
    pub result: Option<Param>,
    pub body: Vec<Stmt>,
}

/// Named parameter or result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: GoType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: GoType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Predeclared Go types the translator uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicType {
    Int,
    Float64,
    Complex128,
    Bool,
    Byte,
}

impl BasicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float64 => "float64",
            Self::Complex128 => "complex128",
            Self::Bool => "bool",
            Self::Byte => "byte",
        }
    }
}

/// Go type expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoType {
    Basic(BasicType),
    Slice(Box<GoType>),
    Pointer(Box<GoType>),
    /// Function value without signature details
    Func,
}

impl GoType {
    pub fn slice_of(elem: GoType) -> Self {
        Self::Slice(Box::new(elem))
    }

    pub fn pointer_to(elem: GoType) -> Self {
        Self::Pointer(Box::new(elem))
    }

    pub fn is_slice(&self) -> bool {
        matches!(self, Self::Slice(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(_))
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(b) => f.write_str(b.as_str()),
            Self::Slice(elem) => write!(f, "[]{}", elem),
            Self::Pointer(elem) => write!(f, "*{}", elem),
            Self::Func => f.write_str("func()"),
        }
    }
}

/// Assignment token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `+=`
    AddAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Define => ":=",
            Self::AddAssign => "+=",
        }
    }
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `var name T`
    VarDecl { name: String, ty: GoType },
    /// `lhs op rhs`
    Assign { lhs: Expr, op: AssignOp, rhs: Expr },
    /// `x++` / `x--`
    IncDec { target: Expr, inc: bool },
    /// Expression evaluated for its effect
    Expr(Expr),
    /// `if cond { body } else ...`; `els` is a `Block` or a nested `If`
    If {
        cond: Expr,
        body: Vec<Stmt>,
        els: Option<Box<Stmt>>,
    },
    /// `for init; cond; post { body }`
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    /// `switch tag { case ... }`
    Switch { tag: Expr, cases: Vec<CaseClause> },
    /// Braced block
    Block(Vec<Stmt>),
    /// `goto label`
    Goto(String),
    /// `label: stmt`
    Labeled { label: String, stmt: Box<Stmt> },
    /// `return` / `return x`
    Return(Option<Expr>),
    /// Line comment, without the `//` marker
    Comment(String),
    /// Nothing
    Empty,
}

impl Stmt {
    /// Build an `lhs = rhs` statement
    pub fn assign(lhs: Expr, rhs: Expr) -> Self {
        Self::Assign {
            lhs,
            op: AssignOp::Assign,
            rhs,
        }
    }

    /// Build a label marker carrying no statement
    pub fn label(name: impl Into<String>) -> Self {
        Self::Labeled {
            label: name.into(),
            stmt: Box::new(Self::Empty),
        }
    }
}

/// One `case` of a switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// Literal kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LitKind {
    Int,
    Float,
    /// Double-quoted, already escaped for Go
    String,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Go operator precedence (5 binds tightest)
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Rem => 5,
            Self::Add | Self::Sub => 4,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => 3,
            Self::And => 2,
            Self::Or => 1,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    /// `&x`
    Addr,
    /// `*x`
    Deref,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Plus => "+",
            Self::Not => "!",
            Self::Addr => "&",
            Self::Deref => "*",
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Ident(String),
    Lit { kind: LitKind, value: String },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Paren(Box<Expr>),
    Call { func: Box<Expr>, args: Vec<Expr> },
    Index { target: Box<Expr>, index: Box<Expr> },
    Slice {
        target: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
    },
    /// `pkg.Name`
    Selector { target: Box<Expr>, field: String },
    /// Type used in expression position: `make([]int, n)`, `[]byte("x")`
    Type(GoType),
    /// `func() T { body }`
    FuncLit {
        result: Option<GoType>,
        body: Vec<Stmt>,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    pub fn int(value: i64) -> Self {
        Self::Lit {
            kind: LitKind::Int,
            value: value.to_string(),
        }
    }

    pub fn string(quoted: impl Into<String>) -> Self {
        Self::Lit {
            kind: LitKind::String,
            value: quoted.into(),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Self::Call {
            func: Box::new(func),
            args,
        }
    }

    pub fn index(target: Expr, index: Expr) -> Self {
        Self::Index {
            target: Box::new(target),
            index: Box::new(index),
        }
    }

    /// `pkg.Name`
    pub fn selector(pkg: &str, name: &str) -> Self {
        Self::Selector {
            target: Box::new(Self::ident(pkg)),
            field: name.to_string(),
        }
    }

    /// Identifier name, if this is a bare identifier
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// Builder for a [`File`]
pub struct FileBuilder {
    package: String,
    imports: BTreeSet<String>,
    decls: Vec<FuncDecl>,
}

impl FileBuilder {
    /// Create a new builder
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            imports: BTreeSet::new(),
            decls: Vec::new(),
        }
    }

    /// Add an import; duplicates are ignored
    pub fn add_import(&mut self, path: &str) -> &mut Self {
        self.imports.insert(path.to_string());
        self
    }

    /// Add a function
    pub fn add_func(&mut self, decl: FuncDecl) -> &mut Self {
        self.decls.push(decl);
        self
    }

    /// Build the final file
    pub fn build(self) -> File {
        File {
            package: self.package,
            imports: self.imports.into_iter().collect(),
            decls: self.decls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_builder() {
        let mut builder = FileBuilder::new("main");
        builder
            .add_import("math")
            .add_import("fmt")
            .add_import("math")
            .add_func(FuncDecl {
                name: "MAIN".to_string(),
                doc: vec![],
                params: vec![],
                result: None,
                body: vec![],
            });

        let file = builder.build();
        assert_eq!(file.package, "main");
        assert_eq!(file.imports, vec!["fmt".to_string(), "math".to_string()]);
        assert!(file.func("MAIN").is_some());
        assert!(file.func("OTHER").is_none());
    }

    #[test]
    fn test_type_display() {
        let matrix = GoType::slice_of(GoType::slice_of(GoType::Basic(BasicType::Float64)));
        assert_eq!(matrix.to_string(), "[][]float64");
        let ptr = GoType::pointer_to(GoType::Basic(BasicType::Int));
        assert_eq!(ptr.to_string(), "*int");
        assert!(ptr.is_pointer());
        assert!(!ptr.is_slice());
    }

    #[test]
    fn test_tree_serializes() {
        let stmt = Stmt::assign(Expr::ident("X"), Expr::int(1));
        let json = serde_json::to_string(&stmt).unwrap();
        let back: Stmt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stmt);
    }
}
