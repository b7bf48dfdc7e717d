//! Expression parser.
//!
//! Precedence climbing with FORTRAN levels, loosest first:
//!
//! ```text
//! .EQV. .NEQV.
//! .OR.
//! .AND.
//! .NOT.
//! relational
//! //
//! + -        (leading sign allowed)
//! * /
//! **         (right associative)
//! primary
//! ```
//!
//! `NAME(...)` is resolved against the unit's symbol table: arrays become
//! zero-based index chains, character variables become slices, intrinsics
//! are lowered to Go, and anything else is a call.

use crate::format::unquote;
use crate::intrinsics;
use crate::parser::Parser;
use crate::statement::int_value;
use crate::symbols::BaseType;
use crate::token::TokenKind;
use f2go_core::{Result, TranspileError};
use f2go_goast::{BasicType, BinaryOp, Expr, LitKind, UnaryOp};

/// One entry of a parenthesized list after a name
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Subscript {
    Value(Expr),
    /// `lo:hi`, either side optional
    Range(Option<Expr>, Option<Expr>),
}

type Level = fn(&mut Parser) -> Result<Expr>;

impl Parser {
    /// Parse one expression starting at the cursor
    pub(crate) fn parse_expr(&mut self) -> Result<Expr> {
        self.binary_level(Self::parse_disjunction, |kind| match kind {
            TokenKind::Eqv => Some(BinaryOp::Eq),
            TokenKind::Neqv => Some(BinaryOp::Ne),
            _ => None,
        })
    }

    /// Left-associative chain of operators picked by `op` over `next`
    fn binary_level(&mut self, next: Level, op: fn(TokenKind) -> Option<BinaryOp>) -> Result<Expr> {
        let mut lhs = next(self)?;
        while let Some(op) = op(self.stream.kind()) {
            self.stream.advance();
            let rhs = next(self)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_disjunction(&mut self) -> Result<Expr> {
        self.binary_level(Self::parse_conjunction, |kind| {
            (kind == TokenKind::Or).then_some(BinaryOp::Or)
        })
    }

    fn parse_conjunction(&mut self) -> Result<Expr> {
        self.binary_level(Self::parse_negation, |kind| {
            (kind == TokenKind::And).then_some(BinaryOp::And)
        })
    }

    fn parse_negation(&mut self) -> Result<Expr> {
        if self.stream.eat(TokenKind::Not) {
            let operand = self.parse_negation()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_relational()
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        self.binary_level(Self::parse_concat, |kind| match kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_concat(&mut self) -> Result<Expr> {
        self.binary_level(Self::parse_additive, |kind| {
            (kind == TokenKind::Concat).then_some(BinaryOp::Add)
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let first = match self.stream.kind() {
            TokenKind::Minus => {
                self.stream.advance();
                Expr::unary(UnaryOp::Neg, self.parse_multiplicative()?)
            }
            TokenKind::Plus => {
                self.stream.advance();
                self.parse_multiplicative()?
            }
            _ => self.parse_multiplicative()?,
        };

        let mut lhs = first;
        loop {
            let op = match self.stream.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.stream.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        self.binary_level(Self::parse_power, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        })
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if !self.stream.eat(TokenKind::Power) {
            return Ok(base);
        }
        let exponent = match self.stream.kind() {
            TokenKind::Minus => {
                self.stream.advance();
                Expr::unary(UnaryOp::Neg, self.parse_power()?)
            }
            _ => self.parse_power()?,
        };
        self.require("math");
        Ok(Expr::call(Expr::selector("math", "Pow"), vec![base, exponent]))
    }

    /// Literal, name, reference or parenthesized expression
    pub(crate) fn parse_primary(&mut self) -> Result<Expr> {
        let node = self.stream.current().clone();
        match node.kind {
            TokenKind::Int => {
                self.stream.advance();
                Ok(int_literal(&node.text))
            }
            TokenKind::Float => {
                self.stream.advance();
                Ok(Expr::Lit {
                    kind: LitKind::Float,
                    value: node.text.replace(['D', 'E'], "e"),
                })
            }
            TokenKind::Str => {
                self.stream.advance();
                Ok(Expr::string(go_string(&node.text)))
            }
            TokenKind::True => {
                self.stream.advance();
                Ok(Expr::ident("true"))
            }
            TokenKind::False => {
                self.stream.advance();
                Ok(Expr::ident("false"))
            }
            TokenKind::LParen => {
                self.stream.advance();
                let first = self.parse_expr()?;
                if self.stream.eat(TokenKind::Comma) {
                    let imag = self.parse_expr()?;
                    self.stream.expect(TokenKind::RParen)?;
                    return Ok(Expr::call(Expr::ident("complex"), vec![first, imag]));
                }
                self.stream.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(first)))
            }
            TokenKind::Minus | TokenKind::Plus => {
                self.stream.advance();
                let operand = self.parse_power()?;
                Ok(match node.kind {
                    TokenKind::Minus => Expr::unary(UnaryOp::Neg, operand),
                    _ => operand,
                })
            }
            TokenKind::Ident => {
                self.stream.advance();
                if self.stream.kind() == TokenKind::LParen {
                    self.parse_reference(node.text)
                } else {
                    Ok(Expr::Ident(node.text))
                }
            }
            // REAL(N), CMPLX spelled COMPLEX(...)
            TokenKind::Real | TokenKind::Complex | TokenKind::Logical
                if self.stream.peek_kind(1) == TokenKind::LParen =>
            {
                self.stream.advance();
                self.parse_reference(node.kind.view().to_string())
            }
            _ => Err(self.stream.unexpected("expression")),
        }
    }

    /// `NAME(...)`: array element, substring, intrinsic or call
    fn parse_reference(&mut self, name: String) -> Result<Expr> {
        let pos = self.stream.pos();
        let subscripts = self.parse_subscripts()?;

        if let Some(ty) = self.scope.lookup(&name).filter(|t| t.is_reference()) {
            let lowers: Vec<Option<Expr>> = ty.dims.iter().map(|d| d.lower.clone()).collect();
            let is_string = ty.is_string();
            let mut target = Expr::Ident(name);
            for (i, sub) in subscripts.into_iter().enumerate() {
                target = match (sub, lowers.get(i)) {
                    (Subscript::Value(e), Some(lower)) => {
                        Expr::index(target, self.rebase(e, lower.as_ref()))
                    }
                    (Subscript::Range(lo, hi), _) => substring(target, lo, hi),
                    (Subscript::Value(_), None) => {
                        return Err(TranspileError::Unsupported {
                            message: "too many subscripts".to_string(),
                            location: pos,
                        })
                    }
                };
            }
            // NAMES(I)(1:3)
            while is_string && self.stream.kind() == TokenKind::LParen {
                for sub in self.parse_subscripts()? {
                    if let Subscript::Range(lo, hi) = sub {
                        target = substring(target, lo, hi);
                    }
                }
            }
            return Ok(target);
        }

        let mut args = Vec::with_capacity(subscripts.len());
        for sub in subscripts {
            match sub {
                Subscript::Value(e) => args.push(e),
                Subscript::Range(..) => {
                    return Err(TranspileError::Unsupported {
                        message: format!("substring of `{}`, which is not a character variable", name),
                        location: pos,
                    })
                }
            }
        }

        let user_defined = self.scope.is_external(&name) && !self.scope.is_intrinsic(&name);
        if !user_defined {
            if let Some(intrinsic) = intrinsics::lookup(&name) {
                if let Some(import) = intrinsic.import() {
                    self.require(import);
                }
                // REAL(Z) of a complex value takes its real part
                if intrinsic == intrinsics::Intrinsic::Convert(BasicType::Float64)
                    && args.len() == 1
                    && self.is_complex(&args[0])
                {
                    return Ok(Expr::call(Expr::ident("real"), args));
                }
                return Ok(intrinsic.lower(args));
            }
        }
        Ok(Expr::call(Expr::Ident(name), args))
    }

    /// Zero-based index for a subscript of a dimension starting at `lower`
    fn rebase(&self, index: Expr, lower: Option<&Expr>) -> Expr {
        let Some(lower) = lower else {
            return zero_based(index);
        };
        match (self.scope.const_eval(lower), int_value(&index)) {
            (Some(l), Some(n)) => Expr::int(n - l),
            (Some(0), None) => index,
            (Some(l), None) if l < 0 => Expr::binary(BinaryOp::Add, index, Expr::int(-l)),
            (Some(l), None) => Expr::binary(BinaryOp::Sub, index, Expr::int(l)),
            (None, _) => {
                let lower = match lower {
                    Expr::Binary { .. } => Expr::Paren(Box::new(lower.clone())),
                    other => other.clone(),
                };
                Expr::binary(BinaryOp::Sub, index, lower)
            }
        }
    }

    /// Whether `expr` names a complex variable or element
    fn is_complex(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Ident(name) => self
                .scope
                .lookup(name)
                .is_some_and(|ty| ty.base == BaseType::Complex),
            Expr::Index { target, .. } | Expr::Paren(target) => self.is_complex(target),
            Expr::Call { func, .. } => **func == Expr::ident("complex"),
            _ => false,
        }
    }

    /// Parenthesized subscript or argument list, ranges allowed
    pub(crate) fn parse_subscripts(&mut self) -> Result<Vec<Subscript>> {
        self.stream.expect(TokenKind::LParen)?;
        let mut subs = Vec::new();
        if self.stream.eat(TokenKind::RParen) {
            return Ok(subs);
        }
        loop {
            let lo = match self.stream.kind() {
                TokenKind::Colon => None,
                _ => Some(self.parse_expr()?),
            };
            let sub = if self.stream.eat(TokenKind::Colon) {
                let hi = match self.stream.kind() {
                    TokenKind::Comma | TokenKind::RParen => None,
                    _ => Some(self.parse_expr()?),
                };
                Subscript::Range(lo, hi)
            } else {
                match lo {
                    Some(e) => Subscript::Value(e),
                    None => return Err(self.stream.unexpected("expression")),
                }
            };
            subs.push(sub);
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.stream.expect(TokenKind::RParen)?;
        Ok(subs)
    }

    /// Argument list of a CALL
    pub(crate) fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        self.stream.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.stream.eat(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.stream.eat(TokenKind::Comma) {
                break;
            }
        }
        self.stream.expect(TokenKind::RParen)?;
        Ok(args)
    }
}

/// Integer literal without leading zeros (Go reads those as octal)
fn int_literal(text: &str) -> Expr {
    let digits = text.trim_start_matches('0');
    Expr::Lit {
        kind: LitKind::Int,
        value: if digits.is_empty() { "0" } else { digits }.to_string(),
    }
}

/// Shift a one-based subscript to zero-based
pub(crate) fn zero_based(expr: Expr) -> Expr {
    match expr {
        Expr::Lit {
            kind: LitKind::Int,
            ref value,
        } => match value.parse::<i64>() {
            Ok(n) => Expr::int(n - 1),
            Err(_) => Expr::binary(BinaryOp::Sub, expr.clone(), Expr::int(1)),
        },
        Expr::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
        } if *rhs == Expr::int(1) => *lhs,
        other => Expr::binary(BinaryOp::Sub, other, Expr::int(1)),
    }
}

/// `S(lo:hi)` as `S[lo-1:hi]`
fn substring(target: Expr, lo: Option<Expr>, hi: Option<Expr>) -> Expr {
    Expr::Slice {
        target: Box::new(target),
        low: lo.map(|e| Box::new(zero_based(e))),
        high: hi.map(Box::new),
    }
}

/// Go literal for a FORTRAN string literal
pub(crate) fn go_string(literal: &str) -> String {
    let text = unquote(literal);
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use crate::symbols::{BaseType, Dim, Extent, TypeDescriptor};

    fn parser(source: &str) -> Parser {
        Parser::new(Scanner::free().scan(source).unwrap())
    }

    fn expr(source: &str) -> Expr {
        parser(source).parse_expr().unwrap()
    }

    #[test]
    fn test_precedence() {
        let e = expr("A + B * C");
        assert_eq!(
            e,
            Expr::binary(
                BinaryOp::Add,
                Expr::ident("A"),
                Expr::binary(BinaryOp::Mul, Expr::ident("B"), Expr::ident("C"))
            )
        );

        let e = expr("A .LT. B .AND. .NOT. C");
        assert_eq!(
            e,
            Expr::binary(
                BinaryOp::And,
                Expr::binary(BinaryOp::Lt, Expr::ident("A"), Expr::ident("B")),
                Expr::unary(UnaryOp::Not, Expr::ident("C"))
            )
        );
    }

    #[test]
    fn test_leading_sign_and_power() {
        let mut p = parser("-X**2**K");
        let e = p.parse_expr().unwrap();
        let pow = |a, b| Expr::call(Expr::selector("math", "Pow"), vec![a, b]);
        assert_eq!(
            e,
            Expr::unary(
                UnaryOp::Neg,
                pow(Expr::ident("X"), pow(Expr::int(2), Expr::ident("K")))
            )
        );
        assert!(p.imports.contains("math"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            expr("1.5D-3"),
            Expr::Lit {
                kind: LitKind::Float,
                value: "1.5e-3".to_string()
            }
        );
        assert_eq!(expr("010"), Expr::int(10));
        assert_eq!(expr("'say \"hi\"'"), Expr::string(r#""say \"hi\"""#));
        assert_eq!(expr(".TRUE."), Expr::ident("true"));
        assert_eq!(
            expr("(1.0, 0.0)"),
            Expr::call(
                Expr::ident("complex"),
                vec![
                    Expr::Lit { kind: LitKind::Float, value: "1.0".into() },
                    Expr::Lit { kind: LitKind::Float, value: "0.0".into() },
                ]
            )
        );
    }

    #[test]
    fn test_array_reference_is_zero_based() {
        let mut p = parser("A(I, 2) + X(J+1)");
        p.scope.declare(
            "A",
            TypeDescriptor {
                base: BaseType::Real,
                dims: vec![Extent::Known(3).into(), Extent::Known(3).into()],
                char_len: None,
            },
        );
        p.scope.declare(
            "X",
            TypeDescriptor {
                base: BaseType::Real,
                dims: vec![Extent::Assumed.into()],
                char_len: None,
            },
        );
        let e = p.parse_expr().unwrap();
        let a = Expr::index(
            Expr::index(
                Expr::ident("A"),
                Expr::binary(BinaryOp::Sub, Expr::ident("I"), Expr::int(1)),
            ),
            Expr::int(1),
        );
        let x = Expr::index(Expr::ident("X"), Expr::ident("J"));
        assert_eq!(e, Expr::binary(BinaryOp::Add, a, x));
    }

    #[test]
    fn test_lower_bounds_shift_subscripts() {
        let mut p = parser("A(0) + A(I) + B(K) + B(3)");
        let dim = |lower: Expr, n| Dim {
            lower: Some(lower),
            extent: Extent::Known(n),
        };
        let declare = |p: &mut Parser, name: &str, dim: Dim| {
            p.scope.declare(
                name,
                TypeDescriptor {
                    base: BaseType::Real,
                    dims: vec![dim],
                    char_len: None,
                },
            )
        };
        declare(&mut p, "A", dim(Expr::int(0), 4));
        declare(&mut p, "B", dim(Expr::unary(UnaryOp::Neg, Expr::int(2)), 6));
        let e = p.parse_expr().unwrap();
        let add = |a, b| Expr::binary(BinaryOp::Add, a, b);
        assert_eq!(
            e,
            add(
                add(
                    add(
                        Expr::index(Expr::ident("A"), Expr::int(0)),
                        Expr::index(Expr::ident("A"), Expr::ident("I"))
                    ),
                    Expr::index(Expr::ident("B"), add(Expr::ident("K"), Expr::int(2)))
                ),
                Expr::index(Expr::ident("B"), Expr::int(5))
            )
        );
    }

    #[test]
    fn test_substring() {
        let mut p = parser("S(2:N)");
        p.scope.declare(
            "S",
            TypeDescriptor {
                base: BaseType::Character,
                dims: vec![],
                char_len: Some(Extent::Known(10)),
            },
        );
        assert_eq!(
            p.parse_expr().unwrap(),
            Expr::Slice {
                target: Box::new(Expr::ident("S")),
                low: Some(Box::new(Expr::int(1))),
                high: Some(Box::new(Expr::ident("N"))),
            }
        );
    }

    #[test]
    fn test_intrinsics_and_calls() {
        let mut p = parser("SQRT(X) + F(X)");
        let e = p.parse_expr().unwrap();
        assert_eq!(
            e,
            Expr::binary(
                BinaryOp::Add,
                Expr::call(Expr::selector("math", "Sqrt"), vec![Expr::ident("X")]),
                Expr::call(Expr::ident("F"), vec![Expr::ident("X")])
            )
        );
        assert!(p.imports.contains("math"));
    }

    #[test]
    fn test_type_keywords_call_intrinsics() {
        let mut p = parser("REAL(N) + ABS(REAL(C))");
        p.scope.declare("C", TypeDescriptor::scalar(BaseType::Complex));
        let e = p.parse_expr().unwrap();
        assert_eq!(
            e,
            Expr::binary(
                BinaryOp::Add,
                Expr::call(
                    Expr::Type(f2go_goast::GoType::Basic(BasicType::Float64)),
                    vec![Expr::ident("N")]
                ),
                Expr::call(
                    Expr::selector("math", "Abs"),
                    vec![Expr::call(Expr::ident("real"), vec![Expr::ident("C")])]
                )
            )
        );
        assert_eq!(
            expr("COMPLEX(X)"),
            Expr::call(Expr::ident("complex"), vec![Expr::ident("X"), Expr::int(0)])
        );
    }

    #[test]
    fn test_user_unit_shadows_intrinsic() {
        let mut p = parser("SIGN(A, B)");
        p.scope = crate::symbols::UnitScope::new(&["SIGN".to_string()]);
        assert_eq!(
            p.parse_expr().unwrap(),
            Expr::call(Expr::ident("SIGN"), vec![Expr::ident("A"), Expr::ident("B")])
        );
    }

    #[test]
    fn test_missing_operand_is_fatal() {
        let err = parser("A + )").parse_expr().unwrap_err();
        assert_eq!(err.to_string(), "Expect expression, but we have {),)}. Pos = 1:5");
    }
}
