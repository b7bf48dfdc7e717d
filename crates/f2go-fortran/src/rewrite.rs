//! Tree passes run once a unit body is complete.
//!
//! FORTRAN passes every argument by reference. Scalars become Go pointers:
//! parameters are dereferenced where they are used and call sites take
//! the address of their arguments. Arrays and character strings are
//! slices already and pass through unchanged.

use crate::intrinsics::{GO_BUILTINS, VALUE_PACKAGES};
use crate::symbols::{LabelBook, UnitScope};
use f2go_goast::visit::{walk_block_mut, walk_expr_mut, VisitorMut};
use f2go_goast::{AssignOp, BasicType, Expr, GoType, LitKind, Stmt, UnaryOp};
use std::collections::HashSet;

/// Replace every use of a pointer parameter `X` with `*X`
pub fn deref_params(params: &HashSet<String>, body: &mut Vec<Stmt>) {
    if params.is_empty() {
        return;
    }
    Deref { params }.visit_block(body);
}

struct Deref<'a> {
    params: &'a HashSet<String>,
}

impl VisitorMut for Deref<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Ident(name) if self.params.contains(name.as_str()) => {
                let target = Expr::Ident(std::mem::take(name));
                *expr = Expr::unary(UnaryOp::Deref, target);
            }
            _ => walk_expr_mut(self, expr),
        }
    }
}

/// Make call sites pass addresses.
///
/// Literal arguments go through a temporary, string literals become byte
/// slices, and plain scalars are passed as `&X`. Calls into Go packages,
/// builtins, conversions and declared intrinsics are left alone.
pub fn call_arguments(scope: &UnitScope, by_reference: &HashSet<String>, body: &mut Vec<Stmt>) {
    CallArguments { scope, by_reference }.visit_block(body);
}

struct CallArguments<'a> {
    scope: &'a UnitScope,
    by_reference: &'a HashSet<String>,
}

impl CallArguments<'_> {
    fn takes_values(&self, func: &Expr) -> bool {
        match func {
            Expr::Ident(name) => {
                GO_BUILTINS.contains(&name.as_str()) || self.scope.is_intrinsic(name)
            }
            Expr::Selector { target, .. } => target
                .as_ident()
                .is_some_and(|pkg| VALUE_PACKAGES.contains(&pkg)),
            Expr::Type(_) | Expr::FuncLit { .. } => true,
            _ => false,
        }
    }

    fn passes_itself(&self, name: &str) -> bool {
        self.by_reference.contains(name)
            || self.scope.is_reference(name)
            || self.scope.is_external(name)
    }

    fn argument(&self, arg: Expr) -> Expr {
        if let Some(ty) = literal_type(&arg) {
            return temporary(ty, arg);
        }
        match arg {
            Expr::Lit {
                kind: LitKind::String,
                ..
            } => Expr::call(
                Expr::Type(GoType::slice_of(GoType::Basic(BasicType::Byte))),
                vec![arg],
            ),
            Expr::Ident(name) if self.passes_itself(&name) => Expr::Ident(name),
            Expr::Ident(name) => Expr::unary(UnaryOp::Addr, Expr::Ident(name)),
            Expr::Unary {
                op: UnaryOp::Deref,
                operand,
            } => *operand,
            other => other,
        }
    }
}

/// Type of a literal argument that needs a temporary to be addressable
fn literal_type(arg: &Expr) -> Option<BasicType> {
    match arg {
        Expr::Lit {
            kind: LitKind::Int, ..
        } => Some(BasicType::Int),
        Expr::Lit {
            kind: LitKind::Float,
            ..
        } => Some(BasicType::Float64),
        Expr::Ident(name) if name == "true" || name == "false" => Some(BasicType::Bool),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => match operand.as_ref() {
            Expr::Lit { .. } => literal_type(operand),
            _ => None,
        },
        _ => None,
    }
}

impl VisitorMut for CallArguments<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
        if let Expr::Call { func, args } = expr {
            if !self.takes_values(func) {
                let taken = std::mem::take(args);
                *args = taken.into_iter().map(|a| self.argument(a)).collect();
            }
        }
    }
}

/// `func() *T { y := v; return &y }()`
fn temporary(ty: BasicType, value: Expr) -> Expr {
    let body = vec![
        Stmt::Assign {
            lhs: Expr::ident("y"),
            op: AssignOp::Define,
            rhs: value,
        },
        Stmt::Return(Some(Expr::unary(UnaryOp::Addr, Expr::ident("y")))),
    ];
    Expr::call(
        Expr::FuncLit {
            result: Some(GoType::pointer_to(GoType::Basic(ty))),
            body,
        },
        Vec::new(),
    )
}

/// Rename a variable everywhere except where it is called
pub fn rename(from: &str, to: &str, body: &mut Vec<Stmt>) {
    Rename { from, to }.visit_block(body);
}

struct Rename<'a> {
    from: &'a str,
    to: &'a str,
}

impl VisitorMut for Rename<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Ident(name) if name == self.from => *name = self.to.to_string(),
            Expr::Call { func, args } => {
                if func.as_ident().is_none() {
                    self.visit_expr(func);
                }
                for arg in args {
                    self.visit_expr(arg);
                }
            }
            _ => walk_expr_mut(self, expr),
        }
    }
}

/// Turn labels nothing jumps to into comments; returns their names
pub fn neutralize_dead_labels(labels: &LabelBook, body: &mut Vec<Stmt>) -> Vec<String> {
    let mut pass = DeadLabels {
        labels,
        dead: Vec::new(),
    };
    pass.visit_block(body);
    pass.dead
}

struct DeadLabels<'a> {
    labels: &'a LabelBook,
    dead: Vec<String>,
}

impl VisitorMut for DeadLabels<'_> {
    fn visit_block(&mut self, block: &mut Vec<Stmt>) {
        for stmt in std::mem::take(block) {
            match stmt {
                Stmt::Labeled { label, stmt } if !self.labels.is_found(&label) => {
                    block.push(Stmt::Comment(format!("{}:", label)));
                    if *stmt != Stmt::Empty {
                        block.push(*stmt);
                    }
                    self.dead.push(label);
                }
                other => block.push(other),
            }
        }
        walk_block_mut(self, block);
    }
}
