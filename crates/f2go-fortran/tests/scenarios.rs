//! End-to-end translations, checked against the printed Go source.

use f2go_codegen::GoCodegen;
use f2go_core::{Diagnostic, DiagnosticKind};
use f2go_fortran::{translate, TranslateOptions};

/// Lay statements out in fixed form; a leading number becomes the label
fn fixed(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| match line.split_once(' ') {
            _ if line.starts_with("C ") => format!("{}\n", line),
            Some((label, rest)) if label.chars().all(|c| c.is_ascii_digit()) => {
                format!("{:>5} {}\n", label, rest)
            }
            _ => format!("      {}\n", line),
        })
        .collect()
}

fn go(lines: &[&str]) -> (String, Vec<Diagnostic>) {
    let out = translate(&fixed(lines), &TranslateOptions::default()).unwrap();
    (GoCodegen::default().generate(&out.file), out.diagnostics)
}

fn count(diagnostics: &[Diagnostic], kind: DiagnosticKind) -> usize {
    diagnostics.iter().filter(|d| d.kind == kind).count()
}

#[test]
fn test_scalar_parameter_becomes_pointer() {
    let (code, diagnostics) = go(&["SUBROUTINE S(N)", "INTEGER N", "N = N + 1", "END"]);
    assert_eq!(code, "package main\n\nfunc S(N *int) {\n\t*N = *N + 1\n}\n");
    assert!(diagnostics.is_empty());
}

#[test]
fn test_complex_function_result() {
    let (code, _) = go(&[
        "COMPLEX FUNCTION CDOTU(N)",
        "INTEGER N",
        "CDOTU = (0.0, 0.0)",
        "RETURN",
        "END",
    ]);
    assert_eq!(
        code,
        "package main\n\nfunc CDOTU(N *int) (CDOTU_RES complex128) {\n\tCDOTU_RES = complex(0.0, 0.0)\n\treturn\n}\n"
    );
}

#[test]
fn test_statements_outside_units_get_fake_program() {
    let (code, diagnostics) = go(&["X = 1.5", "PRINT *, X", "END"]);
    assert_eq!(
        code,
        "package main\n\nimport \"fmt\"\n\nfunc MAIN() {\n\tvar X float64\n\tX = 1.5\n\tfmt.Printf(\" %v\\n\", X)\n}\n"
    );
    assert_eq!(count(&diagnostics, DiagnosticKind::FakeProgram), 1);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn test_data_fills_vector() {
    let (code, diagnostics) = go(&[
        "SUBROUTINE INIT",
        "REAL X(4)",
        "DATA X /1.0, 2.0, 3.0, 4.0/",
        "END",
    ]);
    assert_eq!(
        code,
        "package main\n\nfunc INIT() {\n\tX := make([]float64, 4)\n\tX[0] = 1.0\n\tX[1] = 2.0\n\tX[2] = 3.0\n\tX[3] = 4.0\n}\n"
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn test_explicit_lower_bounds() {
    let (code, diagnostics) = go(&[
        "SUBROUTINE S(N)",
        "INTEGER N, I",
        "DOUBLE PRECISION A(0:3)",
        "REAL B(-1:N)",
        "A(0) = 1.0",
        "B(I) = A(3)",
        "END",
    ]);
    assert!(code.contains("\tA := make([]float64, 4)\n"));
    assert!(code.contains("\tB := make([]float64, *N + 2)\n"));
    assert!(code.contains("\tA[0] = 1.0\n\tB[I + 1] = A[3]\n"));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_labeled_format_is_compiled_and_consumed() {
    let (code, diagnostics) = go(&[
        "PROGRAM P",
        "INTEGER N",
        "REAL X",
        "N = 5",
        "X = 2.5",
        "WRITE(*, 100) N",
        "100 FORMAT(' Result: ', I5)",
        "WRITE(6, 200) X",
        "200 FORMAT(F10.4)",
        "END",
    ]);
    assert!(code.contains("\tfmt.Printf(\" Result: %5d\\n\", N)\n"));
    assert!(code.contains("\tfmt.Printf(\"%10.4f\\n\", X)\n"));
    assert!(!code.contains("Label100"));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_format_reused_by_later_writes() {
    let (code, diagnostics) = go(&[
        "PROGRAM P",
        "INTEGER N, M",
        "N = 1",
        "M = 2",
        "WRITE(*, 10) N",
        "WRITE(*, 10) M",
        "10 FORMAT(I5)",
        "END",
    ]);
    assert!(code.contains("\tfmt.Printf(\"%5d\\n\", N)\n\tfmt.Printf(\"%5d\\n\", M)\n"));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_missing_format_falls_back_to_list_directed() {
    let (code, diagnostics) = go(&["PROGRAM P", "WRITE(*, 300) 'x'", "END"]);
    assert!(code.contains("\tfmt.Printf(\" %v\\n\", \"x\")\n"));
    assert_eq!(count(&diagnostics, DiagnosticKind::MissingLabel), 1);
}

#[test]
fn test_shared_label_closes_nested_loops() {
    let (code, diagnostics) = go(&[
        "C  Zeroes a matrix",
        "SUBROUTINE M(A, N)",
        "INTEGER N",
        "REAL A(N, N)",
        "DO 10 J = 1, N",
        "DO 10 I = 1, N",
        "A(I, J) = 0.0",
        "10 CONTINUE",
        "END",
    ]);
    assert_eq!(
        code,
        concat!(
            "package main\n\n",
            "//  Zeroes a matrix\n",
            "func M(A [][]float64, N *int) {\n",
            "\tvar I int\n",
            "\tvar J int\n",
            "\tfor J = 1; J <= *N; J++ {\n",
            "\t\tfor I = 1; I <= *N; I++ {\n",
            "\t\t\tA[I - 1][J - 1] = 0.0\n",
            "\t\t}\n",
            "\t}\n",
            "\t//Label10:\n",
            "}\n",
        )
    );
    assert_eq!(count(&diagnostics, DiagnosticKind::DeadLabel), 1);
}

#[test]
fn test_stepped_loop() {
    let (code, _) = go(&[
        "SUBROUTINE STEP(N)",
        "INTEGER N",
        "DO 20 I = 1, N, 2",
        "20 CONTINUE",
        "END",
    ]);
    assert!(code.contains("\tfor I = 1; I <= *N; I += 2 {\n\t}\n"));
}

#[test]
fn test_goto_targets_stay_labeled() {
    let (code, diagnostics) = go(&[
        "SUBROUTINE G(K)",
        "INTEGER K",
        "GO TO (10, 20), K",
        "10 K = 1",
        "GOTO 30",
        "20 K = 2",
        "30 RETURN",
        "END",
    ]);
    assert_eq!(
        code,
        concat!(
            "package main\n\n",
            "func G(K *int) {\n",
            "\tswitch *K {\n",
            "\tcase 1:\n",
            "\t\tgoto Label10\n",
            "\tcase 2:\n",
            "\t\tgoto Label20\n",
            "\t}\n",
            "Label10:\n",
            "\t*K = 1\n",
            "\tgoto Label30\n",
            "Label20:\n",
            "\t*K = 2\n",
            "Label30:\n",
            "\treturn\n",
            "}\n",
        )
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn test_call_arguments_are_addressable() {
    let (code, _) = go(&[
        "SUBROUTINE C(X, N)",
        "REAL X(*)",
        "INTEGER N",
        "CALL SSCAL(N, 2.0, X, 1)",
        "END",
    ]);
    assert!(code.contains("func C(X []float64, N *int) {\n"));
    assert!(code.contains(
        "\tSSCAL(N, func() *float64 { y := 2.0; return &y }(), X, func() *int { y := 1; return &y }())\n"
    ));
}

#[test]
fn test_intrinsics_import_math() {
    let (code, _) = go(&[
        "DOUBLE PRECISION FUNCTION DNRM(N, X)",
        "INTEGER N",
        "DOUBLE PRECISION X(*)",
        "DNRM = SQRT(X(1)**2)",
        "END",
    ]);
    assert_eq!(
        code,
        "package main\n\nimport \"math\"\n\nfunc DNRM(N *int, X []float64) (DNRM_RES float64) {\n\tDNRM_RES = math.Sqrt(math.Pow(X[0], 2))\n\treturn\n}\n"
    );
}

#[test]
fn test_type_conversions_in_expressions() {
    let (code, diagnostics) = go(&[
        "SUBROUTINE S(N)",
        "INTEGER N",
        "DOUBLE PRECISION X",
        "COMPLEX C",
        "X = REAL(N) + ABS(REAL(C))",
        "END",
    ]);
    assert!(code.contains("import \"math\""));
    assert!(code.contains("\tX = float64(*N) + math.Abs(real(C))\n"));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_units_call_each_other() {
    let (code, diagnostics) = go(&[
        "PROGRAM MAIN",
        "INTEGER K",
        "K = TWICE(3)",
        "END",
        "INTEGER FUNCTION TWICE(I)",
        "TWICE = 2 * I",
        "END",
    ]);
    assert!(code.contains(
        "func MAIN() {\n\tvar K int\n\tK = TWICE(func() *int { y := 3; return &y }())\n}\n"
    ));
    assert!(code.contains("func TWICE(I *int) (TWICE_RES int) {\n\tTWICE_RES = 2 * *I\n\treturn\n}\n"));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_continuation_lines_join() {
    let source = concat!(
        "      SUBROUTINE S(A, B)\n",
        "      REAL A, B\n",
        "      A = B +\n",
        "     &    1.0\n",
        "      END\n",
    );
    let out = translate(source, &TranslateOptions::default()).unwrap();
    let code = GoCodegen::default().generate(&out.file);
    assert!(code.contains("\t*A = *B + 1.0\n"));
}

#[test]
fn test_fatal_error_reports_position() {
    let source = fixed(&["SUBROUTINE S", "DO 10 = 1, 2", "END"]);
    let aborted = translate(&source, &TranslateOptions::default()).unwrap_err();
    assert_eq!(
        aborted.to_string(),
        "Expect IDENT, but we have {=,=}. Pos = 2:13"
    );
}
