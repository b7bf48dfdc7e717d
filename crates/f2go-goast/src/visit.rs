//! Mutable tree walking.
//!
//! Implement [`VisitorMut`] and override the hooks you need; call the
//! matching `walk_*` function from an override to keep descending.

use crate::{Expr, FuncDecl, Stmt};

pub trait VisitorMut {
    fn visit_block(&mut self, block: &mut Vec<Stmt>) {
        walk_block_mut(self, block);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

/// Visit the body of a function
pub fn walk_func_mut<V: VisitorMut + ?Sized>(v: &mut V, func: &mut FuncDecl) {
    v.visit_block(&mut func.body);
}

pub fn walk_block_mut<V: VisitorMut + ?Sized>(v: &mut V, block: &mut Vec<Stmt>) {
    for stmt in block.iter_mut() {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitorMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Assign { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Stmt::IncDec { target, .. } => v.visit_expr(target),
        Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::If { cond, body, els } => {
            v.visit_expr(cond);
            v.visit_block(body);
            if let Some(els) = els {
                v.visit_stmt(els);
            }
        }
        Stmt::For {
            init,
            cond,
            post,
            body,
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            if let Some(post) = post {
                v.visit_stmt(post);
            }
            v.visit_block(body);
        }
        Stmt::Switch { tag, cases } => {
            v.visit_expr(tag);
            for case in cases {
                for value in &mut case.values {
                    v.visit_expr(value);
                }
                v.visit_block(&mut case.body);
            }
        }
        Stmt::Block(stmts) => v.visit_block(stmts),
        Stmt::Labeled { stmt, .. } => v.visit_stmt(stmt),
        Stmt::Return(Some(expr)) => v.visit_expr(expr),
        Stmt::Return(None)
        | Stmt::VarDecl { .. }
        | Stmt::Goto(_)
        | Stmt::Comment(_)
        | Stmt::Empty => {}
    }
}

pub fn walk_expr_mut<V: VisitorMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Paren(inner) => v.visit_expr(inner),
        Expr::Call { func, args } => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Index { target, index } => {
            v.visit_expr(target);
            v.visit_expr(index);
        }
        Expr::Slice { target, low, high } => {
            v.visit_expr(target);
            if let Some(low) = low {
                v.visit_expr(low);
            }
            if let Some(high) = high {
                v.visit_expr(high);
            }
        }
        Expr::Selector { target, .. } => v.visit_expr(target),
        Expr::FuncLit { body, .. } => v.visit_block(body),
        Expr::Ident(_) | Expr::Lit { .. } | Expr::Type(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinaryOp, Expr, Stmt};

    struct Upper;

    impl VisitorMut for Upper {
        fn visit_expr(&mut self, expr: &mut Expr) {
            if let Expr::Ident(name) = expr {
                *name = name.to_uppercase();
            }
            walk_expr_mut(self, expr);
        }
    }

    #[test]
    fn test_walk_reaches_nested_loops() {
        let mut body = vec![Stmt::For {
            init: Some(Box::new(Stmt::assign(Expr::ident("i"), Expr::int(1)))),
            cond: Some(Expr::binary(BinaryOp::Le, Expr::ident("i"), Expr::ident("n"))),
            post: Some(Box::new(Stmt::IncDec {
                target: Expr::ident("i"),
                inc: true,
            })),
            body: vec![Stmt::If {
                cond: Expr::ident("ok"),
                body: vec![Stmt::Expr(Expr::call(Expr::ident("f"), vec![Expr::ident("x")]))],
                els: Some(Box::new(Stmt::Block(vec![Stmt::Goto("Label10".into())]))),
            }],
        }];

        Upper.visit_block(&mut body);

        let Stmt::For { cond, body, .. } = &body[0] else {
            panic!("expected a loop");
        };
        assert_eq!(
            cond.as_ref(),
            Some(&Expr::binary(BinaryOp::Le, Expr::ident("I"), Expr::ident("N")))
        );
        let Stmt::If { body, .. } = &body[0] else {
            panic!("expected an if");
        };
        assert_eq!(
            body[0],
            Stmt::Expr(Expr::call(Expr::ident("F"), vec![Expr::ident("X")]))
        );
    }
}
