use std::sync::Arc;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Returned when a document failed to parse entirely. The reader never
/// recovers from a structural problem, so there is exactly one of these per
/// failed load.
///
/// This diagnostic implements [`miette::Diagnostic`] and can be used to
/// display detailed, pretty-printed diagnostic messages when using
/// [`miette::Result`] and the `"fancy"` feature flag for `miette`:
///
/// ```no_run
/// fn main() -> miette::Result<()> {
///     "key: 'open".parse::<yamlcfg::YamlDocument>()?;
///     Ok(())
/// }
/// ```
///
/// This will display a message like:
/// ```text
/// Error:
///   × Unterminated value starting at line 1 (line 1)
///    ╭────
///  1 │ key: 'open
///    · ─────┬────
///    ·      ╰── value starts here
///    ╰────
///   help: Close the quote or bracket, or end the line with `\` to continue it.
/// ```
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
#[error("{kind} (line {line})")]
pub struct YamlParseError {
    /// Original input that this failure came from.
    #[source_code]
    pub input: Arc<String>,

    /// Offset of the offending logical line.
    #[label("{label}")]
    pub span: SourceSpan,

    /// Label text for the span.
    pub label: &'static str,

    /// 1-based line number the failing construct starts on.
    pub line: usize,

    /// What went wrong.
    pub kind: YamlErrorKind,

    /// Suggestion for fixing the input.
    #[help]
    pub help: Option<&'static str>,
}

/// The specific structural problem behind a [`YamlParseError`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum YamlErrorKind {
    /// A line that is neither a comment, a sequence item nor `key:`.
    #[error("Malformed key line, no `:` separator outside quotes")]
    MalformedKey,

    /// A flow sequence with a stray, nested or missing bracket.
    #[error("Mismatched brackets in flow sequence")]
    MismatchedBracket,

    /// Input ended while a quoted value or flow sequence was still open.
    #[error("Unterminated value starting at line {start_line}")]
    UnterminatedValue {
        /// Line the open value started on.
        start_line: usize,
    },

    /// Something other than a comment follows a closing quote.
    #[error("Unexpected characters after quoted value")]
    TrailingCharacters,

    /// The same key appears twice in one mapping.
    #[error("Duplicate key `{0}`")]
    DuplicateKey(String),

    /// A key was attached to a value list, or a value to a mapping.
    #[error("{0}")]
    ContentConflict(String),
}

/// The toplevel error type for everything a [`crate::YamlDocument`] can fail
/// at.
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    /// The input text could not be parsed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] YamlParseError),

    /// A mutation would mix values and sub keys in one node.
    #[error("Cannot modify `{key}`: {reason}")]
    #[diagnostic(code(yamlcfg::content_conflict))]
    ContentConflict {
        /// Key of the node the mutation was applied to.
        key: String,
        /// Why the mutation was rejected.
        reason: &'static str,
    },

    /// A lookup without a default found nothing.
    #[error("The key you wanted to retrieve (\"{0}\") could not be found")]
    #[diagnostic(code(yamlcfg::key_not_found))]
    KeyNotFound(String),

    /// A typed accessor could not convert the stored text.
    #[error("Value {value:?} at `{key}` could not be converted: {reason}")]
    #[diagnostic(code(yamlcfg::conversion))]
    Conversion {
        /// Key that was looked up.
        key: String,
        /// The stored text.
        value: String,
        /// Message of the underlying conversion failure.
        reason: String,
    },

    /// A key filter pattern failed to compile.
    #[error(transparent)]
    #[diagnostic(code(yamlcfg::invalid_pattern))]
    InvalidPattern(#[from] regex::Error),

    /// Reading or writing a document failed.
    #[error(transparent)]
    #[diagnostic(code(yamlcfg::io_error))]
    Io(#[from] std::io::Error),
}

impl YamlError {
    pub(crate) fn conflict(key: impl Into<String>, reason: &'static str) -> Self {
        YamlError::ContentConflict {
            key: key.into(),
            reason,
        }
    }

    pub(crate) fn conversion(
        key: &str,
        value: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        YamlError::Conversion {
            key: key.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;

    #[test]
    fn parse_error() {
        let err = YamlParseError {
            input: Arc::new("key 'x'".into()),
            span: SourceSpan::new(0.into(), 7),
            label: "here",
            line: 3,
            kind: YamlErrorKind::MalformedKey,
            help: None,
        };

        assert_eq!(
            err.to_string(),
            "Malformed key line, no `:` separator outside quotes (line 3)"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn unterminated_names_start_line() {
        let kind = YamlErrorKind::UnterminatedValue { start_line: 12 };
        assert_eq!(kind.to_string(), "Unterminated value starting at line 12");
    }

    #[test]
    fn yaml_error() {
        let err = YamlError::KeyNotFound("a.b".into());
        assert_eq!(
            err.to_string(),
            "The key you wanted to retrieve (\"a.b\") could not be found"
        );

        let err = YamlError::conflict("List", "it holds a value list");
        assert_eq!(err.to_string(), "Cannot modify `List`: it holds a value list");

        let err = YamlError::conversion("port", "eighty", "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "Value \"eighty\" at `port` could not be converted: invalid digit found in string"
        );
    }
}
