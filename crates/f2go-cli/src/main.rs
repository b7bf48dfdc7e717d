//! # f2go CLI
//!
//! Command-line front end for the FORTRAN to Go translator.
//!
//! ## Quick Start
//!
//! ```bash
//! # Translate a single file to stdout
//! f2go transpile dnrm2.f
//!
//! # Write the Go file and a JSON diagnostics report
//! f2go transpile dnrm2.f -o dnrm2.go --package blas --format json
//!
//! # Translate a whole directory
//! f2go batch lapack/ -o go/ --recursive --keep-going
//!
//! # Inspect the scanner output
//! f2go tokens dnrm2.f
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use f2go_codegen::{CodegenOptions, GoCodegen};
use f2go_core::{Diagnostic, Frontend, SourceFile, SourceForm, SourceLanguage};
use f2go_fortran::{FortranFrontend, Scanner, TranslateOptions, Translation};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// f2go - FORTRAN 77 to Go translator
#[derive(Parser)]
#[command(name = "f2go")]
#[command(version)]
#[command(about = "Translate FORTRAN 77 source into Go", long_about = None)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

const AFTER_HELP: &str = r#"
EXAMPLES:
    f2go transpile code.f              Print the Go translation
    f2go transpile code.f -o code.go   Write it to a file
    f2go transpile code.f --emit ast   Dump the Go tree as JSON
    f2go batch src/ -o go/ -r          Translate a directory tree
    f2go tokens code.f90               Dump the scanned tokens
"#;

#[derive(Subcommand)]
enum Commands {
    /// Translate one source file
    Transpile {
        /// Input file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        translate: TranslateArgs,

        /// What to write
        #[arg(long, value_enum, default_value_t = Emit::Go)]
        emit: Emit,

        /// Diagnostics report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Translate every FORTRAN file under a directory
    Batch {
        /// Input directory
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "go_output")]
        output_dir: PathBuf,

        #[command(flatten)]
        translate: TranslateArgs,

        /// Recursive search
        #[arg(short, long)]
        recursive: bool,

        /// Continue on errors
        #[arg(long)]
        keep_going: bool,
    },

    /// Print the scanned token stream as JSON
    Tokens {
        /// Input file
        input: PathBuf,

        /// Source layout
        #[arg(long, value_enum, default_value_t = FormArg::Auto)]
        form: FormArg,
    },
}

/// Flags shared by `transpile` and `batch`
#[derive(clap::Args)]
struct TranslateArgs {
    /// Go package clause
    #[arg(long, default_value = "main")]
    package: String,

    /// Source layout (auto picks from the file extension)
    #[arg(long, value_enum, default_value_t = FormArg::Auto)]
    form: FormArg,

    /// Drop carried-over FORTRAN comments from the output
    #[arg(long)]
    no_comments: bool,
}

impl TranslateArgs {
    fn options(&self) -> TranslateOptions {
        TranslateOptions {
            package: self.package.clone(),
            form: self.form.into(),
        }
    }

    fn codegen(&self) -> GoCodegen {
        GoCodegen::new(CodegenOptions {
            include_comments: !self.no_comments,
            ..CodegenOptions::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormArg {
    Fixed,
    Free,
    Auto,
}

impl From<FormArg> for SourceForm {
    fn from(form: FormArg) -> Self {
        match form {
            FormArg::Fixed => SourceForm::Fixed,
            FormArg::Free => SourceForm::Free,
            FormArg::Auto => SourceForm::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Go source
    Go,
    /// The Go tree as JSON
    Ast,
    /// Scanner tokens as JSON
    Tokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Transpile {
            input,
            output,
            translate,
            emit,
            format,
        } => run_transpile(&input, output.as_deref(), &translate, emit, format, cli.quiet),
        Commands::Batch {
            input,
            output_dir,
            translate,
            recursive,
            keep_going,
        } => run_batch(&input, &output_dir, &translate, recursive, keep_going, cli.quiet),
        Commands::Tokens { input, form } => {
            let source = read_source(&input)?;
            let json = scan_json(&source, form.into())?;
            write_output(None, &json)
        }
    }
}

fn run_transpile(
    input: &Path,
    output: Option<&Path>,
    args: &TranslateArgs,
    emit: Emit,
    format: ReportFormat,
    quiet: bool,
) -> Result<()> {
    let source = read_source(input)?;

    let text = match emit {
        Emit::Tokens => scan_json(&source, args.form.into())?,
        Emit::Go | Emit::Ast => {
            let translation = translate_file(&source, args, format, quiet)?;
            report_diagnostics(&translation.diagnostics, format, quiet)?;
            if emit == Emit::Go {
                args.codegen().generate(&translation.file)
            } else {
                serde_json::to_string_pretty(&translation.file)?
            }
        }
    };

    write_output(output, &text)?;

    if let Some(path) = output {
        if !quiet {
            eprintln!(
                "{} {} -> {} ({} lines)",
                "Translated".green().bold(),
                input.display().to_string().cyan(),
                path.display().to_string().green(),
                text.lines().count()
            );
        }
    }

    Ok(())
}

fn run_batch(
    input: &Path,
    output_dir: &Path,
    args: &TranslateArgs,
    recursive: bool,
    keep_going: bool,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        eprintln!("{}", "Batch translation".bold());
        eprintln!("  Source: {}", input.display().to_string().cyan());
        eprintln!("  Output: {}", output_dir.display().to_string().green());
    }

    // Find all source files
    let walker = if recursive {
        WalkDir::new(input)
    } else {
        WalkDir::new(input).max_depth(1)
    };

    let files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| SourceLanguage::detect(&e.file_name().to_string_lossy()).is_some())
        .map(|e| e.into_path())
        .collect();

    if files.is_empty() {
        eprintln!("{} no FORTRAN files found", "warning:".yellow().bold());
        return Ok(());
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let codegen = args.codegen();
    let mut success = 0;
    let mut failed = 0;

    for path in &files {
        let out_path = batch_output_path(input, output_dir, path);
        tracing::debug!(input = %path.display(), output = %out_path.display(), "batch file");

        let result = read_source(path)
            .and_then(|source| translate_file(&source, args, ReportFormat::Text, quiet))
            .and_then(|translation| {
                report_diagnostics(&translation.diagnostics, ReportFormat::Text, quiet)?;
                if let Some(parent) = out_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                write_output(Some(&out_path), &codegen.generate(&translation.file))
            });

        match result {
            Ok(()) => success += 1,
            Err(e) => {
                failed += 1;
                if !keep_going {
                    return Err(e);
                }
                eprintln!("{} {:#}", "error:".red().bold(), e);
            }
        }
    }

    tracing::info!(success, failed, "batch finished");
    if !quiet {
        eprintln!(
            "{} {} successful, {} failed",
            "Batch complete:".green().bold(),
            success.to_string().green(),
            failed.to_string().red()
        );
    }

    Ok(())
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(SourceFile::new(&path.display().to_string(), content))
}

/// Translate one file; a fatal error still reports what was collected
fn translate_file(
    source: &SourceFile,
    args: &TranslateArgs,
    format: ReportFormat,
    quiet: bool,
) -> Result<Translation> {
    let frontend = FortranFrontend::new(args.options());
    match frontend.translate(source) {
        Ok(translation) => Ok(translation),
        Err(aborted) => {
            report_diagnostics(&aborted.diagnostics, format, quiet)?;
            Err(aborted.error).with_context(|| format!("Failed to translate {}", source.name))
        }
    }
}

fn scan_json(source: &SourceFile, form: SourceForm) -> Result<String> {
    let nodes = Scanner::for_form(source.form(form))
        .scan(&source.content)
        .with_context(|| format!("Failed to scan {}", source.name))?;
    Ok(serde_json::to_string_pretty(&nodes)?)
}

fn report_diagnostics(diagnostics: &[Diagnostic], format: ReportFormat, quiet: bool) -> Result<()> {
    match format {
        ReportFormat::Json => eprintln!("{}", serde_json::to_string_pretty(diagnostics)?),
        ReportFormat::Text if quiet => {}
        ReportFormat::Text => {
            for diagnostic in diagnostics {
                eprintln!(
                    "{} [{:?}] {}",
                    "warning:".yellow().bold(),
                    diagnostic.kind,
                    diagnostic
                );
            }
        }
    }
    Ok(())
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

/// Mirror `path` under `output_dir` with a `.go` extension
fn batch_output_path(input: &Path, output_dir: &Path, path: &Path) -> PathBuf {
    let relative = path
        .strip_prefix(input)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .or_else(|| path.file_name().map(Path::new))
        .unwrap_or(path);
    output_dir.join(relative).with_extension("go")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_transpile_flags() {
        let cli = Cli::try_parse_from([
            "f2go", "transpile", "a.f", "--package", "blas", "--form", "free", "--emit", "ast",
        ])
        .unwrap();
        let Commands::Transpile { translate, emit, .. } = cli.command else {
            panic!("expected transpile");
        };
        assert_eq!(translate.options().package, "blas");
        assert_eq!(translate.options().form, SourceForm::Free);
        assert_eq!(emit, Emit::Ast);
    }

    #[test]
    fn test_batch_output_path_mirrors_tree() {
        let out = batch_output_path(
            Path::new("src"),
            Path::new("go"),
            Path::new("src/blas/ddot.f"),
        );
        assert_eq!(out, PathBuf::from("go/blas/ddot.go"));

        let single = batch_output_path(Path::new("ddot.f"), Path::new("go"), Path::new("ddot.f"));
        assert_eq!(single, PathBuf::from("go/ddot.go"));
    }
}
