use std::{borrow::Cow, fmt::Display};

/// Quote style of a scalar or key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    /// `'text'`, with `''` standing for a literal `'`.
    Single,
    /// `"text"`, with `\"`, `\\` and `\n` escapes.
    Double,
}

impl Quote {
    /// The delimiter character.
    pub fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }

    /// Maps a delimiter character back to its style.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            _ => None,
        }
    }
}

/// A scalar leaf: its decoded text plus the comments and quoting it was
/// written with.
///
/// Two values are equal when they hold the same text, comments and written
/// token. Whether the token came from parsing or was derived from the quote
/// does not matter.
#[derive(Debug, Clone, Eq, Default)]
pub struct YamlValue {
    pub(crate) text: String,
    pub(crate) repr: Option<String>,
    pub(crate) quote: Option<Quote>,
    pub(crate) trailing: String,
    pub(crate) leading: String,
}

impl PartialEq for YamlValue {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other, false)
    }
}

impl YamlValue {
    /// Creates a value that is written unquoted whenever the text allows it.
    pub fn new(text: impl Into<String>) -> Self {
        YamlValue {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Creates a value whose preferred quote is inferred from its content.
    /// Anything outside `[A-Za-z0-9_.-]` forces quoting.
    pub fn with_inferred_quote(text: impl Into<String>) -> Self {
        let text = text.into();
        let quote = infer_quote(&text);
        YamlValue {
            text,
            quote,
            ..Default::default()
        }
    }

    /// Gets the decoded text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text, keeping comments and the preferred quote. The
    /// original token is dropped since it would no longer match.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.repr = None;
    }

    /// Gets the preferred quote, if any.
    pub fn quote(&self) -> Option<Quote> {
        self.quote
    }

    /// Sets the preferred quote. `None` writes the text bare when possible.
    pub fn set_quote(&mut self, quote: Option<Quote>) {
        self.quote = quote;
        self.repr = None;
    }

    /// Comment text following the value on the same line, including the
    /// whitespace before the `#`.
    pub fn trailing_comment(&self) -> &str {
        &self.trailing
    }

    /// Sets the same-line comment. It is written verbatim, so it should start
    /// with whitespace and a `#`.
    pub fn set_trailing_comment(&mut self, comment: impl Into<String>) {
        self.trailing = comment.into();
    }

    /// Comment and blank lines written before this value when it is a block
    /// sequence item.
    pub fn leading_comment(&self) -> &str {
        &self.leading
    }

    /// Sets the lines written before this value. Each line must end with a
    /// newline.
    pub fn set_leading_comment(&mut self, comment: impl Into<String>) {
        self.leading = comment.into();
    }

    /// Gets the token this value was parsed from, if any.
    pub fn repr(&self) -> Option<&str> {
        self.repr.as_deref()
    }

    /// Sets a custom token for this value. It is written verbatim.
    pub fn set_repr(&mut self, repr: impl Into<String>) {
        self.repr = Some(repr.into());
    }

    /// Drops the original token and both comments.
    pub fn clear_fmt(&mut self) {
        self.repr = None;
        self.trailing.clear();
        self.leading.clear();
    }

    /// Equality as written in block (`flow == false`) or flow context.
    pub(crate) fn same_as(&self, other: &Self, flow: bool) -> bool {
        self.text == other.text
            && self.trailing == other.trailing
            && self.leading == other.leading
            && self.render(flow) == other.render(flow)
    }

    /// The token written for this value. `flow` selects the stricter rules
    /// that apply inside `[ ... ]`.
    pub(crate) fn render(&self, flow: bool) -> Cow<'_, str> {
        if let Some(repr) = self.repr.as_deref() {
            if !repr.contains('\n') {
                return Cow::Borrowed(repr);
            }
        }
        match self.quote {
            Some(quote) => Cow::Owned(quote_text(&self.text, usable_quote(&self.text, quote))),
            None if is_plain_safe(&self.text, flow) => Cow::Borrowed(&self.text),
            None => {
                let quote = infer_quote(&self.text).unwrap_or(Quote::Double);
                Cow::Owned(quote_text(&self.text, usable_quote(&self.text, quote)))
            }
        }
    }
}

impl Display for YamlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

impl From<&str> for YamlValue {
    fn from(value: &str) -> Self {
        YamlValue::new(value)
    }
}

impl From<String> for YamlValue {
    fn from(value: String) -> Self {
        YamlValue::new(value)
    }
}

pub(crate) fn is_plain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// `None` when the text needs no quotes, otherwise `"` unless the text
/// contains `"` but no `'`.
pub(crate) fn infer_quote(text: &str) -> Option<Quote> {
    if !text.is_empty() && text.chars().all(is_plain_char) {
        None
    } else if text.contains('"') && !text.contains('\'') {
        Some(Quote::Single)
    } else {
        Some(Quote::Double)
    }
}

// Single quotes cannot carry a line break through the reader.
fn usable_quote(text: &str, preferred: Quote) -> Quote {
    if preferred == Quote::Single && text.contains(|c: char| c == '\n' || c == '\r') {
        Quote::Double
    } else {
        preferred
    }
}

/// Whether `text` reads back unchanged when written without quotes.
pub(crate) fn is_plain_safe(text: &str, flow: bool) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };
    if text.trim() != text || matches!(first, '\'' | '"' | '[' | '#') {
        return false;
    }
    if flow && text.contains(|c: char| matches!(c, ',' | '[' | ']')) {
        return false;
    }
    let mut prev_space = false;
    for c in text.chars() {
        if c == '\n' || c == '\r' || (c == '#' && prev_space) {
            return false;
        }
        prev_space = c.is_whitespace();
    }
    text.chars().rev().take_while(|c| *c == '\\').count() % 2 == 0
}

/// Encodes `text` with the given quote, delimiters included.
pub(crate) fn quote_text(text: &str, quote: Quote) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote.as_char());
    for c in text.chars() {
        match (quote, c) {
            (Quote::Single, '\'') => out.push_str("''"),
            (Quote::Double, '\\') => out.push_str("\\\\"),
            (Quote::Double, '"') => out.push_str("\\\""),
            (Quote::Double, '\n') => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push(quote.as_char());
    out
}

/// Item layout requested for a sequence passed to `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStyle {
    /// One `- item` line per value.
    Block,
    /// Inline `[ a, b ]`.
    Flow,
}

/// Input to a `set` operation. Classification happens at the call site
/// through the `From` impls: strings are [`SetValue::Text`], numbers and
/// booleans [`SetValue::Plain`], `Vec`s block sequences, fixed-size arrays
/// flow sequences and `None` [`SetValue::Null`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    /// Clears all values.
    Null,
    /// Text whose quoting is inferred from its content.
    Text(String),
    /// Text written bare whenever it reads back unchanged.
    Plain(String),
    /// Replaces all values with one per item.
    Sequence {
        /// Item texts, each quoted independently.
        items: Vec<String>,
        /// How the items are laid out.
        style: SequenceStyle,
    },
}

impl SetValue {
    /// A block sequence from anything displayable.
    pub fn block<T: ToString>(items: impl IntoIterator<Item = T>) -> Self {
        SetValue::Sequence {
            items: items.into_iter().map(|i| i.to_string()).collect(),
            style: SequenceStyle::Block,
        }
    }

    /// A flow sequence from anything displayable.
    pub fn flow<T: ToString>(items: impl IntoIterator<Item = T>) -> Self {
        SetValue::Sequence {
            items: items.into_iter().map(|i| i.to_string()).collect(),
            style: SequenceStyle::Flow,
        }
    }

    /// Returns `true` for [`SetValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, SetValue::Null)
    }
}

impl From<&str> for SetValue {
    fn from(value: &str) -> Self {
        SetValue::Text(value.to_string())
    }
}

impl From<String> for SetValue {
    fn from(value: String) -> Self {
        SetValue::Text(value)
    }
}

impl From<&String> for SetValue {
    fn from(value: &String) -> Self {
        SetValue::Text(value.clone())
    }
}

macro_rules! plain_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SetValue {
                fn from(value: $ty) -> Self {
                    SetValue::Plain(value.to_string())
                }
            }
        )*
    };
}

plain_from!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);

impl<T: Into<String>> From<Vec<T>> for SetValue {
    fn from(value: Vec<T>) -> Self {
        SetValue::Sequence {
            items: value.into_iter().map(Into::into).collect(),
            style: SequenceStyle::Block,
        }
    }
}

impl<T: Into<String>, const N: usize> From<[T; N]> for SetValue {
    fn from(value: [T; N]) -> Self {
        SetValue::Sequence {
            items: value.into_iter().map(Into::into).collect(),
            style: SequenceStyle::Flow,
        }
    }
}

impl<T: Into<SetValue>> From<Option<T>> for SetValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => SetValue::Null,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inference() {
        assert_eq!(infer_quote("plain_text-1.0"), None);
        assert_eq!(infer_quote("P@SS#WORD"), Some(Quote::Double));
        assert_eq!(infer_quote("u\"s#er"), Some(Quote::Single));
        assert_eq!(infer_quote("local'host"), Some(Quote::Double));
        assert_eq!(infer_quote("both ' and \""), Some(Quote::Double));
        assert_eq!(infer_quote(""), Some(Quote::Double));
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_text("it's", Quote::Single), "'it''s'");
        assert_eq!(quote_text("a \"b\"\\", Quote::Double), r#""a \"b\"\\""#);
        assert_eq!(quote_text("two\nlines", Quote::Double), r#""two\nlines""#);
    }

    #[test]
    fn plain_safety() {
        assert!(is_plain_safe("hello world", false));
        assert!(is_plain_safe("a#b", false));
        assert!(!is_plain_safe("a #b", false));
        assert!(!is_plain_safe("", false));
        assert!(!is_plain_safe(" padded", false));
        assert!(!is_plain_safe("[x", false));
        assert!(!is_plain_safe("ends\\", false));
        assert!(is_plain_safe("ends\\\\", false));
        assert!(is_plain_safe("a,b", false));
        assert!(!is_plain_safe("a,b", true));
    }

    #[test]
    fn rendering() {
        let mut value = YamlValue::new("hello world");
        assert_eq!(value.to_string(), "hello world");

        value.set_text("needs # quoting");
        assert_eq!(value.to_string(), "\"needs # quoting\"");

        let mut value = YamlValue::with_inferred_quote("multi\nline");
        assert_eq!(value.to_string(), "\"multi\\nline\"");
        value.set_quote(Some(Quote::Single));
        assert_eq!(value.to_string(), "\"multi\\nline\"");

        let mut value = YamlValue::new("tab");
        value.set_repr("\"t\\tb\"");
        assert_eq!(value.to_string(), "\"t\\tb\"");
    }

    #[test]
    fn equality_ignores_token_origin() {
        let mut parsed = YamlValue::new("443");
        parsed.set_repr("443");
        assert_eq!(parsed, YamlValue::new("443"));

        let mut parsed = YamlValue::with_inferred_quote("a b");
        parsed.set_repr("\"a b\"");
        assert_eq!(parsed, YamlValue::with_inferred_quote("a b"));
        assert_eq!(parsed, YamlValue::new("a b"));

        let mut single = YamlValue::new("a b");
        single.set_quote(Some(Quote::Single));
        assert_ne!(single, YamlValue::new("a b"));

        let mut commented = YamlValue::new("443");
        commented.set_trailing_comment(" # port");
        assert_ne!(commented, YamlValue::new("443"));
    }

    #[test]
    fn set_value_conversions() {
        assert_eq!(SetValue::from("x"), SetValue::Text("x".into()));
        assert_eq!(SetValue::from(42), SetValue::Plain("42".into()));
        assert_eq!(SetValue::from(true), SetValue::Plain("true".into()));
        assert_eq!(SetValue::from(None::<&str>), SetValue::Null);
        assert_eq!(
            SetValue::from(vec!["a", "b"]),
            SetValue::Sequence {
                items: vec!["a".into(), "b".into()],
                style: SequenceStyle::Block,
            }
        );
        assert_eq!(
            SetValue::from(["a", "b"]),
            SetValue::Sequence {
                items: vec!["a".into(), "b".into()],
                style: SequenceStyle::Flow,
            }
        );
        assert_eq!(SetValue::flow([1, 2]), SetValue::from(["1", "2"]));
    }
}
