//! FORMAT compiler.
//!
//! Turns the descriptor list of a FORMAT statement into a Go `Printf`
//! format string literal.
//!
//! | Descriptor | Output |
//! |---|---|
//! | `Iw` | `%wd` |
//! | `Fw.d` | `%w.df` |
//! | `Fw` | `%wf` |
//! | `Aw` | `%ws` |
//! | `A` | `%s` |
//! | `nX` | `n` spaces |
//! | `/` | newline |
//! | `'text'` | `text` |
//! | anything else | `%v` |

use crate::token::{nodes_to_string, Node, TokenKind};
use f2go_core::{DiagnosticKind, Diagnostics};

/// Compile FORMAT descriptors into a double-quoted Go string literal.
///
/// `nodes` may include the enclosing parentheses. Descriptors without a Go
/// equivalent become `%v` and are reported through `diags`.
pub fn compile(nodes: &[Node], diags: &mut Diagnostics) -> String {
    let inner = strip_parens(nodes);
    let mut out = String::new();
    compile_group(inner, diags, &mut out);
    out.push_str("\\n");
    format!("\"{}\"", out)
}

/// Format string for list-directed output of `count` values
pub fn list_directed(count: usize) -> String {
    format!("\"{}\\n\"", " %v".repeat(count))
}

fn strip_parens(nodes: &[Node]) -> &[Node] {
    match nodes {
        [first, inner @ .., last]
            if first.kind == TokenKind::LParen && last.kind == TokenKind::RParen =>
        {
            inner
        }
        _ => nodes,
    }
}

fn compile_group(nodes: &[Node], diags: &mut Diagnostics, out: &mut String) {
    let mut i = 0;
    while i < nodes.len() {
        let node = &nodes[i];
        match node.kind {
            TokenKind::Comma | TokenKind::Newline => i += 1,
            TokenKind::Slash => {
                out.push_str("\\n");
                i += 1;
            }
            // `//` lexes as one node
            TokenKind::Concat => {
                out.push_str("\\n\\n");
                i += 1;
            }
            TokenKind::Str => {
                out.push_str(&escape(&unquote(&node.text)));
                i += 1;
            }
            TokenKind::LParen => {
                let end = matching_paren(nodes, i);
                compile_group(&nodes[i + 1..end], diags, out);
                i = end + 1;
            }
            TokenKind::Int => {
                let count = node.text.parse::<usize>().unwrap_or(1);
                match nodes.get(i + 1).map(|n| n.kind) {
                    Some(TokenKind::LParen) => {
                        let end = matching_paren(nodes, i + 1);
                        let mut group = String::new();
                        compile_group(&nodes[i + 2..end], diags, &mut group);
                        out.push_str(&group.repeat(count));
                        i = end + 1;
                    }
                    Some(TokenKind::Ident) => {
                        let (piece, used) = descriptor(&nodes[i + 1..], diags);
                        out.push_str(&piece.repeat(count));
                        i += 1 + used;
                    }
                    _ => {
                        unsupported(&nodes[i..=i], diags, out);
                        i += 1;
                    }
                }
            }
            TokenKind::Ident => {
                let (piece, used) = descriptor(&nodes[i..], diags);
                out.push_str(&piece);
                i += used;
            }
            _ => {
                unsupported(&nodes[i..=i], diags, out);
                i += 1;
            }
        }
    }
}

/// Compile the descriptor starting at `nodes[0]`; returns the output and
/// how many nodes it spanned
fn descriptor(nodes: &[Node], diags: &mut Diagnostics) -> (String, usize) {
    let text = nodes[0].text.as_str();
    let (letter, width) = text.split_at(1);
    let width_ok = width.chars().all(|c| c.is_ascii_digit());
    let decimals = nodes
        .get(1)
        .filter(|n| n.kind == TokenKind::Float)
        .and_then(|n| n.text.strip_prefix('.'))
        .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()));

    match (letter, width_ok) {
        ("I", true) if !width.is_empty() => (format!("%{}d", width), 1),
        ("F", true) if !width.is_empty() => match decimals {
            Some(d) => (format!("%{}.{}f", width, d), 2),
            None => (format!("%{}f", width), 1),
        },
        ("A", true) => (format!("%{}s", width), 1),
        ("X", true) if width.is_empty() => (" ".to_string(), 1),
        _ => {
            let used = if decimals.is_some() { 2 } else { 1 };
            let mut out = String::new();
            unsupported(&nodes[..used], diags, &mut out);
            (out, used)
        }
    }
}

fn unsupported(nodes: &[Node], diags: &mut Diagnostics, out: &mut String) {
    let pos = nodes.first().map(|n| n.pos);
    diags.push(
        DiagnosticKind::UnsupportedFormat,
        format!("FORMAT descriptor `{}` is printed with %v", nodes_to_string(nodes)),
        pos,
    );
    out.push_str("%v");
}

fn matching_paren(nodes: &[Node], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, node) in nodes.iter().enumerate().skip(open) {
        match node.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    nodes.len()
}

/// Text of a FORTRAN string literal without its quotes
pub fn unquote(literal: &str) -> String {
    let quote = match literal.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return literal.to_string(),
    };
    let inner = literal
        .strip_prefix(quote)
        .and_then(|s| s.strip_suffix(quote))
        .unwrap_or(literal);
    let doubled: String = [quote, quote].iter().collect();
    inner.replace(&doubled, &quote.to_string())
}

/// Escape literal FORMAT text for a Go format string
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => out.push_str("%%"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn run(spec: &str) -> (String, Diagnostics) {
        let mut nodes = Scanner::free().scan(spec).unwrap();
        nodes.retain(|n| !matches!(n.kind, TokenKind::Newline | TokenKind::Eof));
        let mut diags = Diagnostics::new();
        let out = compile(&nodes, &mut diags);
        (out, diags)
    }

    #[test]
    fn test_descriptor_table() {
        assert_eq!(run("(I5)").0, r#""%5d\n""#);
        assert_eq!(run("(F10.4)").0, r#""%10.4f\n""#);
        assert_eq!(run("(F8)").0, r#""%8f\n""#);
        assert_eq!(run("(A)").0, r#""%s\n""#);
        assert_eq!(run("(A12)").0, r#""%12s\n""#);
    }

    #[test]
    fn test_literal_text_is_verbatim() {
        let (out, diags) = run("(' Result: ', I5)");
        assert_eq!(out, r#"" Result: %5d\n""#);
        assert!(diags.is_empty());
        assert_eq!(run("('100% ''done''')").0, r#""100%% 'done'\n""#);
    }

    #[test]
    fn test_repeat_counts() {
        assert_eq!(run("(3I4)").0, r#""%4d%4d%4d\n""#);
        assert_eq!(run("(2(I2, A))").0, r#""%2d%s%2d%s\n""#);
    }

    #[test]
    fn test_spacing_and_record_breaks() {
        let (out, diags) = run("(1X, I5, 3X, 'END'/A)");
        assert_eq!(out, r#"" %5d   END\n%s\n""#);
        assert!(diags.is_empty());
        assert_eq!(run("(X, I2//F4.1)").0, r#"" %2d\n\n%4.1f\n""#);
    }

    #[test]
    fn test_unsupported_descriptor_falls_back() {
        let (out, diags) = run("(E12.4, I3)");
        assert_eq!(out, r#""%v%3d\n""#);
        assert_eq!(diags.count(DiagnosticKind::UnsupportedFormat), 1);
    }

    #[test]
    fn test_list_directed() {
        assert_eq!(list_directed(2), r#"" %v %v\n""#);
        assert_eq!(list_directed(0), r#""\n""#);
    }
}
