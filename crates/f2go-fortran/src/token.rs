//! Lexical nodes.

use f2go_core::SourceLocation;
use logos::Logos;
use serde::{Deserialize, Serialize};
use std::fmt;

/// FORTRAN token kinds
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[logos(skip r"[ \t\r\f]+")]
pub enum TokenKind {
    // Program units
    #[token("PROGRAM", ignore(ascii_case))]
    Program,
    #[token("SUBROUTINE", ignore(ascii_case))]
    Subroutine,
    #[token("FUNCTION", ignore(ascii_case))]
    Function,
    #[token("RECURSIVE", ignore(ascii_case))]
    Recursive,
    #[token("END", ignore(ascii_case))]
    #[token("ENDIF", ignore(ascii_case))]
    #[token("ENDDO", ignore(ascii_case))]
    End,

    // Control flow
    #[token("IF", ignore(ascii_case))]
    If,
    #[token("THEN", ignore(ascii_case))]
    Then,
    #[token("ELSE", ignore(ascii_case))]
    Else,
    /// Split into `Else` + `If` by the scanner
    #[token("ELSEIF", ignore(ascii_case))]
    ElseIf,
    #[token("DO", ignore(ascii_case))]
    Do,
    #[token("WHILE", ignore(ascii_case))]
    While,
    #[regex("GO[ \t]*TO", ignore(ascii_case))]
    Goto,
    #[token("CONTINUE", ignore(ascii_case))]
    Continue,
    #[token("CALL", ignore(ascii_case))]
    Call,
    #[token("RETURN", ignore(ascii_case))]
    Return,
    #[token("STOP", ignore(ascii_case))]
    Stop,

    // Declarations
    #[token("INTEGER", ignore(ascii_case))]
    Integer,
    #[token("REAL", ignore(ascii_case))]
    Real,
    #[token("COMPLEX", ignore(ascii_case))]
    #[regex("DOUBLE[ \t]*COMPLEX", ignore(ascii_case))]
    Complex,
    #[token("LOGICAL", ignore(ascii_case))]
    Logical,
    #[token("CHARACTER", ignore(ascii_case))]
    Character,
    #[regex("DOUBLE[ \t]*PRECISION", ignore(ascii_case))]
    Double,
    #[token("EXTERNAL", ignore(ascii_case))]
    External,
    #[token("INTRINSIC", ignore(ascii_case))]
    Intrinsic,
    #[token("IMPLICIT", ignore(ascii_case))]
    Implicit,
    #[token("PARAMETER", ignore(ascii_case))]
    Parameter,
    #[token("DATA", ignore(ascii_case))]
    Data,
    #[token("SAVE", ignore(ascii_case))]
    Save,
    #[token("COMMON", ignore(ascii_case))]
    Common,

    // I/O
    #[token("WRITE", ignore(ascii_case))]
    Write,
    #[token("PRINT", ignore(ascii_case))]
    Print,
    #[token("FORMAT", ignore(ascii_case))]
    Format,

    // Operators
    #[token(".TRUE.", ignore(ascii_case))]
    True,
    #[token(".FALSE.", ignore(ascii_case))]
    False,
    #[token(".AND.", ignore(ascii_case))]
    And,
    #[token(".OR.", ignore(ascii_case))]
    Or,
    #[token(".NOT.", ignore(ascii_case))]
    Not,
    #[token(".EQV.", ignore(ascii_case))]
    Eqv,
    #[token(".NEQV.", ignore(ascii_case))]
    Neqv,
    #[token(".EQ.", ignore(ascii_case))]
    #[token("==")]
    Eq,
    #[token(".NE.", ignore(ascii_case))]
    #[token("/=")]
    Ne,
    #[token(".LT.", ignore(ascii_case))]
    #[token("<")]
    Lt,
    #[token(".LE.", ignore(ascii_case))]
    #[token("<=")]
    Le,
    #[token(".GT.", ignore(ascii_case))]
    #[token(">")]
    Gt,
    #[token(".GE.", ignore(ascii_case))]
    #[token(">=")]
    Ge,

    // Symbols
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("::")]
    DoubleColon,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("**")]
    Power,
    #[token("//")]
    Concat,
    #[token(".")]
    Period,
    /// Statement separator, turned into `Newline` by the scanner
    #[token(";")]
    Semicolon,

    // Literals
    #[regex(r"[0-9]+")]
    Int,
    /// `1.` alone lexes as `Int` `Period` so that `1.AND.` still splits;
    /// the scanner glues the pair back together
    #[regex(r"[0-9]+\.[0-9]+([eEdD][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+\.[eEdD][+-]?[0-9]+")]
    #[regex(r"\.[0-9]+([eEdD][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eEdD][+-]?[0-9]+")]
    Float,
    #[regex(r"'([^']|'')*'")]
    #[regex(r#""([^"]|"")*""#)]
    Str,

    // Identifiers
    #[regex(r"[a-zA-Z][a-zA-Z0-9_$]*")]
    Ident,

    /// Trailing `!` comment, dropped by the scanner
    #[regex(r"![^\n]*")]
    InlineComment,

    // Produced by the scanner, never lexed
    /// Whole-line comment
    Comment,
    /// End of a logical statement line
    Newline,
    /// End of the stream
    Eof,
}

impl TokenKind {
    /// Name used in error messages
    pub fn view(&self) -> &'static str {
        match self {
            Self::Program => "PROGRAM",
            Self::Subroutine => "SUBROUTINE",
            Self::Function => "FUNCTION",
            Self::Recursive => "RECURSIVE",
            Self::End => "END",
            Self::If => "IF",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::ElseIf => "ELSEIF",
            Self::Do => "DO",
            Self::While => "WHILE",
            Self::Goto => "GOTO",
            Self::Continue => "CONTINUE",
            Self::Call => "CALL",
            Self::Return => "RETURN",
            Self::Stop => "STOP",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Complex => "COMPLEX",
            Self::Logical => "LOGICAL",
            Self::Character => "CHARACTER",
            Self::Double => "DOUBLE PRECISION",
            Self::External => "EXTERNAL",
            Self::Intrinsic => "INTRINSIC",
            Self::Implicit => "IMPLICIT",
            Self::Parameter => "PARAMETER",
            Self::Data => "DATA",
            Self::Save => "SAVE",
            Self::Common => "COMMON",
            Self::Write => "WRITE",
            Self::Print => "PRINT",
            Self::Format => "FORMAT",
            Self::True => ".TRUE.",
            Self::False => ".FALSE.",
            Self::And => ".AND.",
            Self::Or => ".OR.",
            Self::Not => ".NOT.",
            Self::Eqv => ".EQV.",
            Self::Neqv => ".NEQV.",
            Self::Eq => ".EQ.",
            Self::Ne => ".NE.",
            Self::Lt => ".LT.",
            Self::Le => ".LE.",
            Self::Gt => ".GT.",
            Self::Ge => ".GE.",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::DoubleColon => "::",
            Self::Assign => "=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Power => "**",
            Self::Concat => "//",
            Self::Period => ".",
            Self::Semicolon => ";",
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::Str => "STRING",
            Self::Ident => "IDENT",
            Self::InlineComment | Self::Comment => "COMMENT",
            Self::Newline => "NEW_LINE",
            Self::Eof => "EOF",
        }
    }

    /// Keywords that open a type declaration
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::Real
                | Self::Complex
                | Self::Logical
                | Self::Character
                | Self::Double
        )
    }

    /// Keywords that open a program unit
    pub fn is_unit_keyword(&self) -> bool {
        matches!(self, Self::Program | Self::Subroutine | Self::Function)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.view())
    }
}

/// One lexical node of the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: TokenKind,
    pub text: String,
    pub pos: SourceLocation,
}

impl Node {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    pub fn newline(pos: SourceLocation) -> Self {
        Self::new(TokenKind::Newline, "\n", pos)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Join node texts with single spaces, for messages
pub fn nodes_to_string(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|n| n.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        TokenKind::lexer(source).map(|t| t.unwrap()).collect()
    }

    #[test]
    fn test_lexer_keywords() {
        assert_eq!(
            kinds("SUBROUTINE CAXPY(N)"),
            vec![
                TokenKind::Subroutine,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
            ]
        );
        assert_eq!(kinds("go to 30"), vec![TokenKind::Goto, TokenKind::Int]);
        assert_eq!(kinds("DOUBLE PRECISION DX"), vec![TokenKind::Double, TokenKind::Ident]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(kinds("DONE = DOT"), vec![TokenKind::Ident, TokenKind::Assign, TokenKind::Ident]);
    }

    #[test]
    fn test_lexer_operators_and_literals() {
        assert_eq!(
            kinds("IF (N.LE.0) X = 4096.D0 ** 2"),
            vec![
                TokenKind::If,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Le,
                TokenKind::Int,
                TokenKind::RParen,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Float,
                TokenKind::Power,
                TokenKind::Int,
            ]
        );
        assert_eq!(kinds("'It''s'"), vec![TokenKind::Str]);
    }

    #[test]
    fn test_integer_before_dotted_operator() {
        assert_eq!(
            kinds("INCX.EQ.1.AND.INCY.EQ.1"),
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Int,
                TokenKind::And,
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Int,
            ]
        );
    }

    #[test]
    fn test_format_descriptor_tokens() {
        assert_eq!(
            kinds("( I5 , F10.4 , A )"),
            vec![
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::Float,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::RParen,
            ]
        );
    }
}
