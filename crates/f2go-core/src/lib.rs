//! # f2go Core
//!
//! Core types, traits, and error tiers shared by the f2go transpiler.
//!
//! ## Architecture
//!
//! ```text
//! FORTRAN source (fixed or free form)
//!       |
//!       v
//! +-------------+
//! |  Scanner    |  (Lexical node stream)
//! +-------------+
//!       |
//!       v
//! +-------------+
//! |  Procedure  |  (Program units, statements, symbol table)
//! |  Parser     |
//! +-------------+
//!       |
//!       v
//! +-------------+
//! |  Rewriter   |  (Pass-by-reference, call arguments, labels)
//! +-------------+
//!       |
//!       v
//! +-------------+
//! |  Codegen    |  (Go source code)
//! +-------------+
//! ```
//!
//! Errors come in two tiers. A [`TranspileError`] stops the run; a
//! [`Diagnostic`] is recorded and translation continues.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Source language dialect being transpiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SourceLanguage {
    /// FORTRAN 77, fixed format
    #[default]
    Fortran77,
    /// FORTRAN 90 and later, free format
    Fortran90,
}

impl SourceLanguage {
    /// Get file extensions for this dialect
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Fortran77 => &["f", "for", "f77"],
            Self::Fortran90 => &["f90", "f95", "f03", "f08"],
        }
    }

    /// Check if the dialect uses significant columns
    pub fn is_fixed_format(&self) -> bool {
        matches!(self, Self::Fortran77)
    }

    /// Detect the dialect from a file name
    pub fn detect(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        [Self::Fortran77, Self::Fortran90]
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }
}

/// Layout of the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SourceForm {
    /// Columns 1-5 label, column 6 continuation, 7-72 statement
    Fixed,
    /// Free layout with `&` continuation
    Free,
    /// Decide from the file extension, falling back to fixed
    #[default]
    Auto,
}

/// Position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source file representation
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name
    pub name: String,
    /// File content
    pub content: String,
    /// Detected dialect
    pub language: SourceLanguage,
}

impl SourceFile {
    pub fn new(name: &str, content: String) -> Self {
        Self {
            name: name.to_string(),
            content,
            language: SourceLanguage::detect(name).unwrap_or_default(),
        }
    }

    /// Resolve the layout to scan this file with
    pub fn form(&self, requested: SourceForm) -> SourceForm {
        match requested {
            SourceForm::Auto if self.language.is_fixed_format() => SourceForm::Fixed,
            SourceForm::Auto => SourceForm::Free,
            other => other,
        }
    }
}

/// Core transpiler trait that all frontends implement
pub trait Frontend {
    /// Translated output
    type Output;

    /// Frontend name
    fn name(&self) -> &'static str;

    /// File extensions this frontend handles
    fn file_extensions(&self) -> &[&'static str];

    /// Translate a whole source file
    fn translate(&self, source: &SourceFile) -> std::result::Result<Self::Output, Aborted>;
}

/// Errors that stop the run
#[derive(Debug, Error)]
pub enum TranspileError {
    #[error("Expect {expected}, but we have {{{found},{literal}}}. Pos = {location}")]
    UnexpectedToken {
        expected: String,
        found: String,
        literal: String,
        location: SourceLocation,
    },

    #[error("Not acceptable amount of labels in GOTO at {location}")]
    EmptyComputedGoto { location: SourceLocation },

    #[error("DATA for `{name}` needs {expected} values, found {found} at {location}")]
    DataArity {
        name: String,
        expected: usize,
        found: usize,
        location: SourceLocation,
    },

    #[error("Unsupported construct at {location}: {message}")]
    Unsupported {
        message: String,
        location: SourceLocation,
    },

    #[error("Lexer error at {location}: cannot scan `{text}`")]
    Lexer {
        text: String,
        location: SourceLocation,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transpilation operations
pub type Result<T> = std::result::Result<T, TranspileError>;

/// A fatal error together with everything recorded before it
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Aborted {
    #[source]
    pub error: TranspileError,
    pub diagnostics: Vec<Diagnostic>,
}

/// Category of a non-fatal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Statements found outside any program unit
    FakeProgram,
    /// Label never targeted by a jump
    DeadLabel,
    /// DATA target without a usable declaration
    UnresolvedData,
    /// FORMAT descriptor without a Go equivalent
    UnsupportedFormat,
    /// FORMAT label referenced but not present in the unit
    MissingLabel,
    /// Statement consumed without translation
    UnsupportedStatement,
    /// Local array whose extent is not known
    UnallocatedArray,
    /// Declaration or parameter list that could not be read
    MalformedDeclaration,
}

/// A non-fatal message surfaced alongside the output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{} (at {})", self.message, loc),
            None => f.write_str(&self.message),
        }
    }
}

/// Ordered accumulator of non-fatal diagnostics
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn push(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) {
        let message = message.into();
        tracing::debug!(?kind, %message, "diagnostic");
        self.items.push(Diagnostic {
            kind,
            message,
            location,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Number of diagnostics of one kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Wrap a fatal error with the diagnostics collected so far
    pub fn abort(self, error: TranspileError) -> Aborted {
        for diag in &self.items {
            tracing::warn!("{}", diag);
        }
        Aborted {
            error,
            diagnostics: self.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(SourceLanguage::detect("dgemm.f"), Some(SourceLanguage::Fortran77));
        assert_eq!(SourceLanguage::detect("solver.F90"), Some(SourceLanguage::Fortran90));
        assert_eq!(SourceLanguage::detect("README.md"), None);
    }

    #[test]
    fn test_fixed_format() {
        assert!(SourceLanguage::Fortran77.is_fixed_format());
        assert!(!SourceLanguage::Fortran90.is_fixed_format());
    }

    #[test]
    fn test_form_resolution() {
        let fixed = SourceFile::new("caxpy.f", String::new());
        let free = SourceFile::new("caxpy.f90", String::new());
        assert_eq!(fixed.form(SourceForm::Auto), SourceForm::Fixed);
        assert_eq!(free.form(SourceForm::Auto), SourceForm::Free);
        assert_eq!(fixed.form(SourceForm::Free), SourceForm::Free);
    }

    #[test]
    fn test_unexpected_token_message() {
        let err = TranspileError::UnexpectedToken {
            expected: "IDENT".to_string(),
            found: "INT".to_string(),
            literal: "10".to_string(),
            location: SourceLocation::new(3, 7),
        };
        assert_eq!(err.to_string(), "Expect IDENT, but we have {INT,10}. Pos = 3:7");
    }

    #[test]
    fn test_diagnostics_abort_keeps_history() {
        let mut diags = Diagnostics::new();
        diags.push(DiagnosticKind::FakeProgram, "Add fake PROGRAM MAIN", None);
        diags.push(DiagnosticKind::DeadLabel, "Label10 is not used", None);
        assert_eq!(diags.count(DiagnosticKind::DeadLabel), 1);

        let aborted = diags.abort(TranspileError::EmptyComputedGoto {
            location: SourceLocation::new(1, 1),
        });
        assert_eq!(aborted.diagnostics.len(), 2);
        assert!(aborted.to_string().contains("GOTO"));
    }
}
