//! Per-unit symbol table.
//!
//! A fresh [`UnitScope`] is created on entry to every program unit and
//! dropped once the unit has been lowered.

use crate::token::TokenKind;
use f2go_goast::{BasicType, BinaryOp, Expr, GoType, LitKind, UnaryOp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// FORTRAN base type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Integer,
    Real,
    DoublePrecision,
    Complex,
    Logical,
    Character,
}

impl BaseType {
    /// Base type named by a declaration keyword
    pub fn from_keyword(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Integer => Some(Self::Integer),
            TokenKind::Real => Some(Self::Real),
            TokenKind::Double => Some(Self::DoublePrecision),
            TokenKind::Complex => Some(Self::Complex),
            TokenKind::Logical => Some(Self::Logical),
            TokenKind::Character => Some(Self::Character),
            _ => None,
        }
    }

    /// Apply a `*n` kind suffix
    pub fn with_kind(self, size: usize) -> Self {
        match (self, size) {
            (Self::Real, 8) => Self::DoublePrecision,
            (base, _) => base,
        }
    }

    /// Implicit typing: names starting I-N are integers, others real
    pub fn implicit(name: &str) -> Self {
        match name.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('I'..='N') => Self::Integer,
            _ => Self::Real,
        }
    }

    pub fn basic(&self) -> BasicType {
        match self {
            Self::Integer => BasicType::Int,
            Self::Real | Self::DoublePrecision => BasicType::Float64,
            Self::Complex => BasicType::Complex128,
            Self::Logical => BasicType::Bool,
            Self::Character => BasicType::Byte,
        }
    }
}

/// Declared size of one dimension or of a character length
#[derive(Debug, Clone, PartialEq)]
pub enum Extent {
    Known(usize),
    /// Size only known at run time, already lowered to Go
    Expr(Expr),
    /// `*`
    Assumed,
}

impl Extent {
    /// Go expression for the allocation size, if there is one
    pub fn size_expr(&self) -> Option<Expr> {
        match self {
            Self::Known(n) => Some(Expr::Lit {
                kind: LitKind::Int,
                value: n.to_string(),
            }),
            Self::Expr(expr) => Some(expr.clone()),
            Self::Assumed => None,
        }
    }
}

/// One array dimension: `u`, `l:u` or `l:*`
#[derive(Debug, Clone, PartialEq)]
pub struct Dim {
    /// Lower bound when it is not 1
    pub lower: Option<Expr>,
    /// Number of elements
    pub extent: Extent,
}

impl Dim {
    pub fn new(extent: Extent) -> Self {
        Self {
            lower: None,
            extent,
        }
    }
}

impl From<Extent> for Dim {
    fn from(extent: Extent) -> Self {
        Self::new(extent)
    }
}

/// Type of one declared name
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub base: BaseType,
    /// One entry per dimension, first subscript first
    pub dims: Vec<Dim>,
    /// Character length, when declared with one
    pub char_len: Option<Extent>,
}

impl TypeDescriptor {
    pub fn scalar(base: BaseType) -> Self {
        Self {
            base,
            dims: Vec::new(),
            char_len: None,
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    /// Character value with a length (a byte slice in Go)
    pub fn is_string(&self) -> bool {
        self.base == BaseType::Character && self.char_len.is_some()
    }

    /// Values that already have reference semantics in Go
    pub fn is_reference(&self) -> bool {
        self.is_array() || self.is_string()
    }

    /// Go type for this descriptor
    pub fn go_type(&self) -> GoType {
        let mut ty = GoType::Basic(self.base.basic());
        if self.is_string() {
            ty = GoType::slice_of(ty);
        }
        for _ in &self.dims {
            ty = GoType::slice_of(ty);
        }
        ty
    }

    /// Every extent, dimensions first, then the character length
    pub fn extents(&self) -> impl Iterator<Item = &Extent> {
        self.dims.iter().map(|d| &d.extent).chain(self.char_len.iter())
    }
}

/// How a procedure name entered the scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    External,
    Intrinsic,
}

impl ExternalKind {
    /// Kind recorded by an EXTERNAL or INTRINSIC statement
    pub fn from_keyword(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Intrinsic => Self::Intrinsic,
            _ => Self::External,
        }
    }
}

/// Label bookkeeping for one unit
#[derive(Debug, Clone, Default)]
pub struct LabelBook {
    all: BTreeSet<String>,
    found: BTreeSet<String>,
    end_label_do: HashMap<String, usize>,
}

impl LabelBook {
    /// Go label name for a statement label
    pub fn name(label: &str) -> String {
        let trimmed = label.trim_start_matches('0');
        format!("Label{}", if trimmed.is_empty() { "0" } else { trimmed })
    }

    /// Record a label attached to a statement
    pub fn declare(&mut self, label: &str) -> String {
        let name = Self::name(label);
        self.all.insert(name.clone());
        name
    }

    /// Record a label targeted by a jump
    pub fn mark_found(&mut self, label: &str) -> String {
        let name = Self::name(label);
        self.found.insert(name.clone());
        name
    }

    pub fn is_found(&self, name: &str) -> bool {
        self.found.contains(name)
    }

    /// Register one more DO loop closing on `label`
    pub fn open_do(&mut self, label: &str) {
        *self.end_label_do.entry(Self::name(label)).or_insert(0) += 1;
    }

    /// Loops still waiting on `label`
    pub fn pending_do(&self, label: &str) -> usize {
        self.end_label_do.get(&Self::name(label)).copied().unwrap_or(0)
    }

    /// Take and reset the pending count for `label`
    pub fn close_do(&mut self, label: &str) -> usize {
        self.end_label_do
            .insert(Self::name(label), 0)
            .unwrap_or(0)
    }

    /// Labels declared but never jumped to
    pub fn dead(&self) -> Vec<String> {
        self.all.difference(&self.found).cloned().collect()
    }

    pub fn found(&self) -> impl Iterator<Item = &String> {
        self.found.iter()
    }
}

/// Everything scoped to one program unit
#[derive(Debug, Clone, Default)]
pub struct UnitScope {
    /// Name of the unit being parsed
    pub unit: String,
    /// Dummy argument names, in order
    pub params: Vec<String>,
    pub symbols: BTreeMap<String, TypeDescriptor>,
    pub constants: HashMap<String, i64>,
    pub externals: BTreeMap<String, ExternalKind>,
    pub labels: LabelBook,
    /// Compiled FORMAT strings by label name
    pub formats: HashMap<String, String>,
}

impl UnitScope {
    /// New scope that knows every discovered unit as external
    pub fn new(units: &[String]) -> Self {
        let externals = units
            .iter()
            .map(|name| (name.clone(), ExternalKind::External))
            .collect();
        Self {
            externals,
            ..Self::default()
        }
    }

    pub fn declare(&mut self, name: &str, ty: TypeDescriptor) {
        tracing::trace!(name, base = ?ty.base, rank = ty.rank(), "declare");
        self.symbols.insert(name.to_string(), ty);
    }

    /// Give an undeclared local its implicit type
    pub fn declare_implicit(&mut self, name: &str) {
        if self.symbols.contains_key(name)
            || self.params.iter().any(|p| p == name)
            || self.unit == name
            || self.is_external(name)
        {
            return;
        }
        self.declare(name, TypeDescriptor::scalar(BaseType::implicit(name)));
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.symbols.get(name)
    }

    pub fn is_array(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(TypeDescriptor::is_array)
    }

    pub fn is_reference(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(TypeDescriptor::is_reference)
    }

    pub fn add_external(&mut self, name: &str, kind: ExternalKind) {
        self.externals.insert(name.to_string(), kind);
    }

    pub fn is_external(&self, name: &str) -> bool {
        self.externals.contains_key(name)
    }

    pub fn is_intrinsic(&self, name: &str) -> bool {
        self.externals.get(name) == Some(&ExternalKind::Intrinsic)
    }

    /// Drop symbol entries for names that are call targets
    pub fn remove_externals(&mut self) {
        let externals = &self.externals;
        self.symbols.retain(|name, _| !externals.contains_key(name));
    }

    /// Fold a lowered extent expression to a known size where possible
    pub fn resolve_extent(&self, expr: Expr) -> Extent {
        match self.const_eval(&expr) {
            Some(n) if n >= 0 => Extent::Known(n as usize),
            _ => Extent::Expr(expr),
        }
    }

    /// Evaluate integer arithmetic over literals and PARAMETER constants
    pub fn const_eval(&self, expr: &Expr) -> Option<i64> {
        match expr {
            Expr::Lit {
                kind: LitKind::Int,
                value,
            } => value.parse().ok(),
            Expr::Ident(name) => self.constants.get(name).copied(),
            Expr::Paren(inner) => self.const_eval(inner),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => self.const_eval(operand).map(|n| -n),
            Expr::Binary { op, lhs, rhs } => {
                let (a, b) = (self.const_eval(lhs)?, self.const_eval(rhs)?);
                match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::Div => a.checked_div(b),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_types() {
        let matrix = TypeDescriptor {
            base: BaseType::Complex,
            dims: vec![Extent::Known(2).into(), Extent::Assumed.into()],
            char_len: None,
        };
        assert_eq!(matrix.go_type().to_string(), "[][]complex128");
        assert!(matrix.is_reference());

        let name = TypeDescriptor {
            base: BaseType::Character,
            dims: vec![],
            char_len: Some(Extent::Assumed),
        };
        assert_eq!(name.go_type().to_string(), "[]byte");
        assert!(name.is_string());

        let flag = TypeDescriptor::scalar(BaseType::Character);
        assert_eq!(flag.go_type().to_string(), "byte");
        assert!(!flag.is_reference());
    }

    #[test]
    fn test_implicit_typing() {
        assert_eq!(BaseType::implicit("N"), BaseType::Integer);
        assert_eq!(BaseType::implicit("INCX"), BaseType::Integer);
        assert_eq!(BaseType::implicit("ALPHA"), BaseType::Real);
        assert_eq!(BaseType::Real.with_kind(8), BaseType::DoublePrecision);
        assert_eq!(BaseType::Integer.with_kind(8), BaseType::Integer);
    }

    #[test]
    fn test_label_book() {
        let mut labels = LabelBook::default();
        labels.declare("10");
        labels.declare("20");
        assert_eq!(labels.mark_found("20"), "Label20");
        assert_eq!(labels.dead(), vec!["Label10".to_string()]);

        labels.open_do("30");
        labels.open_do("30");
        assert_eq!(labels.pending_do("30"), 2);
        assert_eq!(labels.close_do("30"), 2);
        assert_eq!(labels.pending_do("30"), 0);
    }

    #[test]
    fn test_scope_externals_and_extents() {
        let mut scope = UnitScope::new(&["CAXPY".to_string()]);
        scope.declare("CAXPY", TypeDescriptor::scalar(BaseType::Real));
        scope.declare("X", TypeDescriptor::scalar(BaseType::Real));
        scope.remove_externals();
        assert!(scope.lookup("CAXPY").is_none());
        assert!(scope.lookup("X").is_some());

        scope.constants.insert("NMAX".to_string(), 50);
        assert_eq!(scope.resolve_extent(Expr::ident("NMAX")), Extent::Known(50));
        assert_eq!(scope.resolve_extent(Expr::int(4)), Extent::Known(4));
        assert!(matches!(scope.resolve_extent(Expr::ident("N")), Extent::Expr(_)));

        let doubled = Expr::binary(BinaryOp::Mul, Expr::ident("NMAX"), Expr::int(2));
        assert_eq!(scope.resolve_extent(doubled), Extent::Known(100));
    }

    #[test]
    fn test_declare_implicit_skips_known_names() {
        let mut scope = UnitScope::new(&["SDOT".to_string()]);
        scope.unit = "F".to_string();
        scope.params = vec!["N".to_string()];
        for name in ["N", "F", "SDOT", "I", "TEMP"] {
            scope.declare_implicit(name);
        }
        let names: Vec<&String> = scope.symbols.keys().collect();
        assert_eq!(names, vec!["I", "TEMP"]);
        assert_eq!(scope.lookup("TEMP").map(|t| t.base), Some(BaseType::Real));
    }
}
