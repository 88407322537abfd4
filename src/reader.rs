use std::sync::Arc;

use miette::SourceSpan;

use crate::{
    parser::{parse_line, LineItem, LineParse, Rest},
    Element, NodeId, YamlError, YamlErrorKind, YamlNode, YamlParseError, YamlTree,
};

pub(crate) const DEFAULT_INDENT: usize = 4;

/// Options for [`crate::YamlDocument::parse_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Indentation width, also the width a tab counts for. `None` detects it
    /// from the first indented line, falling back to 4.
    pub indent: Option<usize>,
}

impl ParseOptions {
    /// Options with width detection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed indentation width.
    pub fn indent(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }
}

#[derive(Debug)]
pub(crate) struct ReadOutput {
    pub(crate) tree: YamlTree,
    pub(crate) footer: String,
    pub(crate) indent: usize,
    pub(crate) newline: &'static str,
}

/// A line as handed to the grammar: one or more physical lines folded
/// together.
#[derive(Debug)]
struct Logical {
    text: String,
    indent: usize,
    line: usize,
    start: usize,
    end: usize,
}

struct Reader {
    src: Arc<String>,
    tree: YamlTree,
    newline: &'static str,
    width: Option<usize>,
    stack: Vec<(usize, NodeId)>,
    last: NodeId,
    last_indent: usize,
    comment: String,
}

pub(crate) fn read(input: &str, options: ParseOptions) -> Result<ReadOutput, YamlParseError> {
    let text = input.strip_prefix('\u{feff}').unwrap_or(input);
    let tree = YamlTree::new();
    let root = tree.root();
    let mut reader = Reader {
        src: Arc::new(text.to_string()),
        tree,
        newline: if text.contains("\r\n") { "\r\n" } else { "\n" },
        width: options.indent.filter(|w| *w > 0),
        stack: vec![(0, root)],
        last: root,
        last_indent: 0,
        comment: String::new(),
    };

    let mut pending: Option<Logical> = None;
    let mut offset = 0;
    let mut count = 0;
    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let start = offset;
        offset += raw.len();
        count = idx + 1;
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let logical = match pending.take() {
            Some(mut logical) => {
                let next = line.trim();
                if next.is_empty() {
                    logical.text.push('\n');
                } else {
                    logical.text.push(' ');
                    logical.text.push_str(next);
                }
                logical.end = start + line.len();
                logical
            }
            None => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    reader.comment.push_str(line);
                    reader.comment.push_str(reader.newline);
                    continue;
                }
                Logical {
                    text: trimmed.to_string(),
                    indent: reader.measure(line),
                    line: idx + 1,
                    start,
                    end: start + line.len(),
                }
            }
        };
        pending = reader.feed(logical)?;
    }

    if let Some(logical) = pending {
        let kind = YamlErrorKind::UnterminatedValue {
            start_line: logical.line,
        };
        let span = SourceSpan::new(logical.start.into(), text.len() - logical.start);
        return Err(reader.error(span, logical.line, kind));
    }

    let indent = reader.width.unwrap_or(DEFAULT_INDENT);
    tracing::debug!(
        lines = count,
        indent,
        newline = ?reader.newline,
        "read document"
    );
    Ok(ReadOutput {
        tree: reader.tree,
        footer: reader.comment,
        indent,
        newline: reader.newline,
    })
}

fn ends_with_escape(text: &str) -> bool {
    text.trim_end().chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

// A same-line comment runs to the end of the line, so a backslash ending it
// is comment text.
fn escape_in_comment(text: &str) -> bool {
    matches!(parse_line(text), Ok(LineParse::Complete(item)) if !item.comment().is_empty())
}

impl Reader {
    /// Leading whitespace width. The first indented line fixes the
    /// indentation width unless it was configured.
    fn measure(&mut self, line: &str) -> usize {
        let tab = self.width.unwrap_or(DEFAULT_INDENT);
        let indent = line
            .chars()
            .map_while(|c| match c {
                ' ' => Some(1),
                '\t' => Some(tab),
                _ => None,
            })
            .sum();
        if self.width.is_none() && indent > 0 {
            self.width = Some(indent);
        }
        indent
    }

    /// Processes a logical line, or hands it back if it continues on the
    /// next physical line.
    fn feed(&mut self, mut logical: Logical) -> Result<Option<Logical>, YamlParseError> {
        if ends_with_escape(&logical.text) && !escape_in_comment(&logical.text) {
            let kept = logical.text.trim_end().len() - 1;
            logical.text.truncate(kept);
            let kept = logical.text.trim_end().len();
            logical.text.truncate(kept);
            return Ok(Some(logical));
        }
        let span = SourceSpan::new(logical.start.into(), logical.end - logical.start);
        let item = match parse_line(&logical.text) {
            Ok(LineParse::Complete(item)) => item,
            Ok(LineParse::Pending) => return Ok(Some(logical)),
            Err(kind) => return Err(self.error(span, logical.line, kind)),
        };
        tracing::trace!(line = logical.line, indent = logical.indent, ?item, "read line");

        while self.stack.len() > 1 && logical.indent < self.top().0 {
            self.stack.pop();
        }
        if logical.indent > self.top().0 {
            self.stack.push((logical.indent, self.last));
        }

        let result = match item {
            LineItem::Item(value) => self.add_item(value, logical.indent),
            LineItem::Key { key, rest } => {
                let parent = self.top().1;
                if self.tree.child(parent, key.value()).is_some() {
                    return Err(self.error(
                        span,
                        logical.line,
                        YamlErrorKind::DuplicateKey(key.value().to_string()),
                    ));
                }
                let mut node = YamlNode::new(key);
                node.comment = std::mem::take(&mut self.comment);
                #[cfg(feature = "span")]
                {
                    node.span = Some(span);
                    node.line = Some(logical.line);
                }
                match rest {
                    Rest::Empty { comment } => node.inline_comment = comment,
                    Rest::Scalar(value) => node.elements.push(Element::Value(value)),
                    Rest::Flow { items, comment } => {
                        node.elements.extend(items.into_iter().map(Element::Value));
                        node.flow = true;
                        node.inline_comment = comment;
                    }
                }
                self.tree.push_child(parent, node).map(|id| {
                    self.last = id;
                    self.last_indent = logical.indent;
                })
            }
        };
        result.map_err(|err| {
            let reason = match err {
                YamlError::ContentConflict { reason, .. } => reason.to_string(),
                other => other.to_string(),
            };
            self.error(span, logical.line, YamlErrorKind::ContentConflict(reason))
        })?;
        Ok(None)
    }

    fn add_item(&mut self, mut value: crate::YamlValue, indent: usize) -> Result<(), YamlError> {
        let node = &mut self.tree[self.last];
        if node.flow || (node.value_count() > 0 && !node.dash_items) {
            return Err(YamlError::conflict(
                node.name(),
                "a list item cannot follow a key that already has a value",
            ));
        }
        value.leading = std::mem::take(&mut self.comment);
        let first = !node.dash_items;
        node.add_value(value)?;
        node.dash_items = true;
        if first {
            node.compact = indent <= self.last_indent;
        }
        Ok(())
    }

    fn top(&self) -> (usize, NodeId) {
        self.stack[self.stack.len() - 1]
    }

    fn error(&self, span: SourceSpan, line: usize, kind: YamlErrorKind) -> YamlParseError {
        let (label, help) = match &kind {
            YamlErrorKind::MalformedKey => (
                "expected `key:` or `- item`",
                Some("Keys containing whitespace, `:` or `.` must be quoted."),
            ),
            YamlErrorKind::MismatchedBracket => (
                "bracket mismatch",
                Some("Flow sequences cannot nest and close with a single `]`."),
            ),
            YamlErrorKind::UnterminatedValue { .. } => (
                "value starts here",
                Some("Close the quote or bracket, or end the line with `\\` to continue it."),
            ),
            YamlErrorKind::TrailingCharacters => (
                "unexpected characters",
                Some("Only a comment, separated by whitespace, may follow a value."),
            ),
            YamlErrorKind::DuplicateKey(_) => ("duplicate key", None),
            YamlErrorKind::ContentConflict(_) => (
                "conflicting content",
                Some("A key holds a value, a list or sub keys, never a mix."),
            ),
        };
        YamlParseError {
            input: self.src.clone(),
            span,
            label,
            line,
            kind,
            help,
        }
    }
}
