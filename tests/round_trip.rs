use std::{
    fs,
    path::{Path, PathBuf},
};

use miette::{Diagnostic, IntoDiagnostic};
use thiserror::Error;
use yamlcfg::{YamlDocument, YamlParseError};

#[derive(Debug, Error, Diagnostic)]
#[error("Round trip suite failed {} of {total_checks}.", diagnostics.len())]
struct RoundTripSuiteFailure {
    total_checks: usize,
    #[related]
    diagnostics: Vec<RoundTripDiagnostic>,
}

#[derive(Debug, Error, Diagnostic)]
enum RoundTripDiagnostic {
    #[error("{}", file_name(.0))]
    #[diagnostic(code(yamlcfg::round_trip::parse_failure))]
    ParseFailure(
        PathBuf,
        #[source]
        #[diagnostic_source]
        YamlParseError,
    ),

    #[error("{}:\nExpected:\n{expected}\nActual:\n{actual}", file_name(file))]
    #[diagnostic(code(yamlcfg::round_trip::expectation_mismatch))]
    ExpectationMismatch {
        file: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{}: writing and reading back changed the document", file_name(.0))]
    #[diagnostic(code(yamlcfg::round_trip::unstable))]
    Unstable(PathBuf),

    #[error("{}: parsed, but should have been rejected", file_name(.0))]
    #[diagnostic(code(yamlcfg::round_trip::unexpected_success))]
    UnexpectedSuccess(PathBuf),

    #[error(transparent)]
    #[diagnostic(code(yamlcfg::round_trip::io_error))]
    IoError(#[from] std::io::Error),
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn test_cases() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("test_cases")
}

fn finish(count: usize, failures: Vec<RoundTripDiagnostic>) -> miette::Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(RoundTripSuiteFailure {
            total_checks: count,
            diagnostics: failures,
        }
        .into())
    }
}

#[test]
fn round_trip() -> miette::Result<()> {
    let mut failures = Vec::new();
    let mut count = 0usize;
    for test_name in fs::read_dir(test_cases().join("input")).into_diagnostic()? {
        let test_path = test_name.into_diagnostic()?.path();
        let src = normalize_line_endings(fs::read_to_string(&test_path).into_diagnostic()?);
        if let Err(e) = validate(&test_path, &src) {
            failures.push(e);
        }
        count += 1;
    }
    finish(count, failures)
}

/// Without a file in `expected/`, the output must match the input byte for
/// byte.
fn validate(path: &Path, src: &str) -> Result<(), RoundTripDiagnostic> {
    let doc = YamlDocument::parse(src)
        .map_err(|e| RoundTripDiagnostic::ParseFailure(path.into(), e))?;
    let expected_path = test_cases().join("expected").join(file_name(path));
    let expected = if expected_path.exists() {
        normalize_line_endings(fs::read_to_string(&expected_path)?)
    } else {
        src.to_string()
    };
    let actual = doc.to_string();
    if actual != expected {
        return Err(RoundTripDiagnostic::ExpectationMismatch {
            file: path.into(),
            expected: expected.replace('\n', "\\n").replace(' ', "."),
            actual: actual.replace('\n', "\\n").replace(' ', "."),
        });
    }
    let reparsed = YamlDocument::parse(&actual)
        .map_err(|e| RoundTripDiagnostic::ParseFailure(path.into(), e))?;
    if reparsed != doc || reparsed.to_string() != actual {
        return Err(RoundTripDiagnostic::Unstable(path.into()));
    }
    Ok(())
}

#[test]
fn rejects_invalid() -> miette::Result<()> {
    let mut failures = Vec::new();
    let mut count = 0usize;
    for test_name in fs::read_dir(test_cases().join("invalid")).into_diagnostic()? {
        let test_path = test_name.into_diagnostic()?.path();
        let src = normalize_line_endings(fs::read_to_string(&test_path).into_diagnostic()?);
        match YamlDocument::parse(&src) {
            Ok(_) => failures.push(RoundTripDiagnostic::UnexpectedSuccess(test_path)),
            Err(e) => assert!(e.line >= 1, "{}: no line number", file_name(&test_path)),
        }
        count += 1;
    }
    finish(count, failures)
}

fn normalize_line_endings(src: String) -> String {
    src.replace("\r\n", "\n")
}
