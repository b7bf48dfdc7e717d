//! FORTRAN intrinsic functions and their Go spelling.

use f2go_goast::{BasicType, BinaryOp, Expr, GoType};

/// Go builtins and conversions that take values, never pointers
pub const GO_BUILTINS: &[&str] = &[
    "append", "complex", "copy", "float64", "imag", "int", "len", "make", "max", "min", "real",
];

/// Packages whose calls keep their arguments as written
pub const VALUE_PACKAGES: &[&str] = &["math", "fmt", "cmplx"];

/// How an intrinsic is lowered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    /// Function from a Go package: `(import path, selector, name)`
    Package(&'static str, &'static str, &'static str),
    /// Go builtin called with the same arguments
    Builtin(&'static str),
    /// Type conversion
    Convert(BasicType),
    /// `a % b`
    Mod,
    /// `int(math.Round(x))`
    Nint,
    /// `complex(re, im)`, imaginary part defaulting to zero
    Cmplx,
}

/// Look up an intrinsic by its FORTRAN name
pub fn lookup(name: &str) -> Option<Intrinsic> {
    use Intrinsic::*;
    let math = |f| Some(Package("math", "math", f));
    match name {
        "SQRT" | "DSQRT" => math("Sqrt"),
        "ABS" | "DABS" | "IABS" => math("Abs"),
        "SIN" | "DSIN" => math("Sin"),
        "COS" | "DCOS" => math("Cos"),
        "TAN" | "DTAN" => math("Tan"),
        "EXP" | "DEXP" => math("Exp"),
        "LOG" | "ALOG" | "DLOG" => math("Log"),
        "LOG10" | "ALOG10" | "DLOG10" => math("Log10"),
        "ATAN" | "DATAN" => math("Atan"),
        "ATAN2" | "DATAN2" => math("Atan2"),
        "SIGN" | "DSIGN" | "ISIGN" => math("Copysign"),
        "CABS" | "ZABS" | "CDABS" => Some(Package("math/cmplx", "cmplx", "Abs")),
        "CONJG" | "DCONJG" => Some(Package("math/cmplx", "cmplx", "Conj")),
        "MAX" | "MAX0" | "AMAX1" | "DMAX1" => Some(Builtin("max")),
        "MIN" | "MIN0" | "AMIN1" | "DMIN1" => Some(Builtin("min")),
        "LEN" => Some(Builtin("len")),
        "AIMAG" | "DIMAG" => Some(Builtin("imag")),
        "DBLE" | "REAL" | "FLOAT" | "SNGL" | "DFLOAT" => Some(Convert(BasicType::Float64)),
        "INT" | "IFIX" | "IDINT" => Some(Convert(BasicType::Int)),
        "MOD" => Some(Mod),
        "NINT" | "IDNINT" => Some(Nint),
        "CMPLX" | "DCMPLX" | "COMPLEX" => Some(Cmplx),
        "LOGICAL" => Some(Convert(BasicType::Bool)),
        _ => None,
    }
}

impl Intrinsic {
    /// Go import the lowered call needs
    pub fn import(&self) -> Option<&'static str> {
        match self {
            Self::Package(path, _, _) => Some(*path),
            Self::Nint => Some("math"),
            _ => None,
        }
    }

    /// Build the Go expression for a call with `args`
    pub fn lower(&self, mut args: Vec<Expr>) -> Expr {
        match self {
            Self::Package(_, pkg, func) => Expr::call(Expr::selector(pkg, func), args),
            Self::Builtin(name) => Expr::call(Expr::ident(*name), args),
            Self::Convert(ty) => Expr::call(Expr::Type(GoType::Basic(*ty)), args),
            Self::Mod if args.len() == 2 => {
                let rhs = args.pop().unwrap_or_else(|| Expr::int(1));
                let lhs = args.pop().unwrap_or_else(|| Expr::int(0));
                Expr::binary(BinaryOp::Rem, lhs, rhs)
            }
            Self::Mod => Expr::call(Expr::ident("MOD"), args),
            Self::Nint => Expr::call(
                Expr::Type(GoType::Basic(BasicType::Int)),
                vec![Expr::call(Expr::selector("math", "Round"), args)],
            ),
            Self::Cmplx => {
                if args.len() == 1 {
                    args.push(Expr::int(0));
                }
                Expr::call(Expr::ident("complex"), args)
            }
        }
    }
}
