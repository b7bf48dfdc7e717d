//! # f2go FORTRAN Frontend
//!
//! Translates FORTRAN 77 (and the common FORTRAN 90 conveniences) into the
//! Go tree defined by `f2go-goast`.
//!
//! ## Pipeline
//!
//! 1. [`Scanner`] turns fixed- or free-form text into a flat node list.
//! 2. [`Parser`] walks that list as an editable stream, one program unit at
//!    a time, and lowers every statement directly to Go statements.
//! 3. Per-unit passes resolve parameter types, pass scalars by pointer and
//!    turn unused labels into comments.
//!
//! ## FORTRAN to Go Mapping
//!
//! | FORTRAN | Go |
//! |---------|----|
//! | INTEGER | int |
//! | REAL, DOUBLE PRECISION | float64 |
//! | COMPLEX | complex128 |
//! | LOGICAL | bool |
//! | CHARACTER | byte |
//! | CHARACTER*n | []byte |
//! | DIMENSION(n, m) | [][]T |
//! | SUBROUTINE S(N) | func S(N *int) |
//! | FUNCTION F(X) | func F(X *float64) (F_RES float64) |
//! | label: | LabelN: |

mod data;
mod expr;
mod io;
mod statement;

pub mod format;
pub mod intrinsics;
pub mod parser;
pub mod rewrite;
pub mod scanner;
pub mod stream;
pub mod symbols;
pub mod token;

pub use parser::Parser;
pub use scanner::Scanner;
pub use token::{Node, TokenKind};

use f2go_core::{Aborted, Diagnostic, Diagnostics, Frontend, SourceFile, SourceForm};
use f2go_goast::File;
use serde::{Deserialize, Serialize};

/// Options for one translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateOptions {
    /// Go package clause
    pub package: String,
    /// Source layout; `Auto` means fixed form
    pub form: SourceForm,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            package: "main".to_string(),
            form: SourceForm::Auto,
        }
    }
}

/// Result of a successful translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub file: File,
    /// Everything that was translated approximately or skipped
    pub diagnostics: Vec<Diagnostic>,
}

/// Translate FORTRAN source text into a Go file
pub fn translate(source: &str, options: &TranslateOptions) -> Result<Translation, Aborted> {
    let nodes = Scanner::for_form(options.form)
        .scan(source)
        .map_err(|error| Diagnostics::new().abort(error))?;
    parse_nodes(nodes, options)
}

/// Translate an already scanned node list
pub fn parse_nodes(nodes: Vec<Node>, options: &TranslateOptions) -> Result<Translation, Aborted> {
    let translation = Parser::new(nodes).parse(&options.package)?;
    tracing::debug!(
        units = translation.file.decls.len(),
        diagnostics = translation.diagnostics.len(),
        "translation finished"
    );
    Ok(translation)
}

/// FORTRAN frontend
pub struct FortranFrontend {
    options: TranslateOptions,
}

impl FortranFrontend {
    pub fn new(options: TranslateOptions) -> Self {
        Self { options }
    }

    /// Fixed-form FORTRAN 77
    pub fn fortran77() -> Self {
        Self::new(TranslateOptions {
            form: SourceForm::Fixed,
            ..TranslateOptions::default()
        })
    }

    /// Free-form FORTRAN 90
    pub fn fortran90() -> Self {
        Self::new(TranslateOptions {
            form: SourceForm::Free,
            ..TranslateOptions::default()
        })
    }

    pub fn options(&self) -> &TranslateOptions {
        &self.options
    }
}

impl Default for FortranFrontend {
    fn default() -> Self {
        Self::new(TranslateOptions::default())
    }
}

impl Frontend for FortranFrontend {
    type Output = Translation;

    fn name(&self) -> &'static str {
        match self.options.form {
            SourceForm::Free => "FORTRAN 90",
            _ => "FORTRAN 77",
        }
    }

    fn file_extensions(&self) -> &[&'static str] {
        &["f", "for", "f77", "f90", "f95", "f03", "f08"]
    }

    fn translate(&self, source: &SourceFile) -> Result<Translation, Aborted> {
        let options = TranslateOptions {
            form: source.form(self.options.form),
            ..self.options.clone()
        };
        tracing::debug!(file = %source.name, form = ?options.form, "translating");
        translate(&source.content, &options)
    }
}
