use std::{fmt::Display, str::FromStr};

use crate::{
    parser,
    value::{quote_text, Quote},
    YamlParseError,
};

/// The key of a [`crate::YamlNode`]: the decoded name used for dotted-key
/// addressing plus, for parsed keys, the exact token it was written as.
#[derive(Debug, Clone, Eq)]
pub struct YamlKey {
    pub(crate) value: String,
    pub(crate) repr: Option<String>,
}

/// Keys are equal when they decode to the same name and are written the
/// same way.
impl PartialEq for YamlKey {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.to_string() == other.to_string()
    }
}

impl std::hash::Hash for YamlKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.to_string().hash(state);
    }
}

impl YamlKey {
    /// Gets the decoded name of this key.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Sets the name of this key. Any custom representation is dropped, since
    /// it would no longer match.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.repr = None;
    }

    /// Gets the custom string representation for this key, if any.
    pub fn repr(&self) -> Option<&str> {
        self.repr.as_deref()
    }

    /// Sets a custom string representation for this key.
    pub fn set_repr(&mut self, repr: impl Into<String>) {
        self.repr = Some(repr.into());
    }

    /// The quote character this key is written with, if it is quoted.
    pub fn quote_char(&self) -> Option<char> {
        match &self.repr {
            Some(repr) => repr.chars().next().filter(|c| matches!(*c, '\'' | '"')),
            None => self.default_quote().map(Quote::as_char),
        }
    }

    /// Resets this key to its default representation. It will be written
    /// unquoted when possible and quoted otherwise.
    pub fn clear_fmt(&mut self) {
        self.repr = None;
    }

    /// Returns `true` if `name` cannot be written as a bare key.
    pub(crate) fn needs_quotes(name: &str) -> bool {
        name.is_empty()
            || name.starts_with(|c: char| c == '-' || c == '[')
            || name.chars().any(|c| {
                c.is_whitespace() || matches!(c, ':' | '.' | '\\' | '"' | '\'' | '#')
            })
    }

    fn default_quote(&self) -> Option<Quote> {
        if !Self::needs_quotes(&self.value) {
            None
        } else if self.value.contains('\'') || self.value.contains('\n') {
            Some(Quote::Double)
        } else {
            Some(Quote::Single)
        }
    }
}

impl Display for YamlKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(repr) = &self.repr {
            write!(f, "{}", repr)
        } else if let Some(quote) = self.default_quote() {
            write!(f, "{}", quote_text(&self.value, quote))
        } else {
            write!(f, "{}", self.value)
        }
    }
}

impl From<&str> for YamlKey {
    fn from(value: &str) -> Self {
        YamlKey {
            value: value.to_string(),
            repr: None,
        }
    }
}

impl From<String> for YamlKey {
    fn from(value: String) -> Self {
        YamlKey { value, repr: None }
    }
}

impl From<YamlKey> for String {
    fn from(value: YamlKey) -> Self {
        value.value
    }
}

impl FromStr for YamlKey {
    type Err = YamlParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_key(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parsing() -> miette::Result<()> {
        let plain = "foo";
        assert_eq!(
            plain.parse::<YamlKey>()?,
            YamlKey {
                value: plain.to_string(),
                repr: Some(plain.to_string()),
            }
        );

        let dotted = "test.2";
        assert_eq!(dotted.parse::<YamlKey>()?.value(), "test.2");

        let quoted = "'it''s here'";
        assert_eq!(
            quoted.parse::<YamlKey>()?,
            YamlKey {
                value: "it's here".to_string(),
                repr: Some(quoted.to_string()),
            }
        );

        let double = "\"a \\\"b\\\"\"";
        assert_eq!(double.parse::<YamlKey>()?.value(), "a \"b\"");

        assert!("   space   ".parse::<YamlKey>().is_err());
        assert!("'x".parse::<YamlKey>().is_err());
        assert!("a:b".parse::<YamlKey>().is_err());

        Ok(())
    }

    #[test]
    fn formatting() {
        let plain = YamlKey::from("foo");
        assert_eq!(format!("{}", plain), "foo");
        assert_eq!(plain.quote_char(), None);

        let spaced = YamlKey::from("foo bar");
        assert_eq!(format!("{}", spaced), "'foo bar'");
        assert_eq!(spaced.quote_char(), Some('\''));

        let apostrophe = YamlKey::from("it's");
        assert_eq!(format!("{}", apostrophe), "\"it's\"");

        let dotted = YamlKey::from("a.b");
        assert_eq!(format!("{}", dotted), "'a.b'");

        let mut custom_repr = YamlKey::from("269");
        custom_repr.set_repr("'269'");
        assert_eq!(format!("{}", custom_repr), "'269'");
        assert_eq!(custom_repr.quote_char(), Some('\''));

        custom_repr.set_value("270");
        assert_eq!(format!("{}", custom_repr), "270");
    }
}
