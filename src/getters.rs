//! Typed accessors layered over the string getters.
//!
//! The `_or` variants only fall back to the default when the key is
//! missing. Text that fails to convert is always an error.

use std::{fmt::Display, str::FromStr};

use crate::{parser::parse_number, YamlDocument, YamlError};

fn or_default<T>(result: Result<T, YamlError>, default: T) -> Result<T, YamlError> {
    match result {
        Err(YamlError::KeyNotFound(_)) => Ok(default),
        other => other,
    }
}

fn parse_bool(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}

fn parse_char(key: &str, text: &str) -> Result<char, YamlError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(YamlError::conversion(
            key,
            text,
            "expected exactly one character",
        )),
    }
}

fn number<T: num::Num>(key: &str, text: &str) -> Result<T, YamlError> {
    parse_number(text).ok_or_else(|| YamlError::conversion(key, text, "not a valid number"))
}

impl YamlDocument {
    /// Converts the text at `key` with [`FromStr`].
    ///
    /// ```rust
    /// let doc: yamlcfg::YamlDocument = "port: 8080\nratio: 0.5".parse()?;
    /// assert_eq!(doc.get_parsed::<u16>("port")?, 8080);
    /// assert_eq!(doc.get_parsed::<f32>("ratio")?, 0.5);
    /// assert!(doc.get_parsed::<u8>("port").is_err());
    /// # Ok::<(), yamlcfg::YamlError>(())
    /// ```
    pub fn get_parsed<T>(&self, key: &str) -> Result<T, YamlError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let text = self.get_string(key)?;
        text.trim()
            .parse()
            .map_err(|e| YamlError::conversion(key, text, e))
    }

    /// Like [`YamlDocument::get_parsed`], returning `default` for a missing
    /// key.
    pub fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T, YamlError>
    where
        T: FromStr,
        T::Err: Display,
    {
        or_default(self.get_parsed(key), default)
    }

    /// Converts every item of the list at `key`.
    pub fn get_parsed_list<T>(&self, key: &str) -> Result<Vec<T>, YamlError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get_string_list(key)?
            .into_iter()
            .map(|text| {
                text.trim()
                    .parse()
                    .map_err(|e| YamlError::conversion(key, text, e))
            })
            .collect()
    }

    /// Like [`YamlDocument::get_parsed_list`], returning `default` for a
    /// missing key.
    pub fn get_parsed_list_or<T>(&self, key: &str, default: Vec<T>) -> Result<Vec<T>, YamlError>
    where
        T: FromStr,
        T::Err: Display,
    {
        or_default(self.get_parsed_list(key), default)
    }

    /// Reads a number, accepting `0x`, `0o` and `0b` prefixes and `_`
    /// separators, as in `0xFF_FF`.
    pub fn get_number<T: num::Num>(&self, key: &str) -> Result<T, YamlError> {
        number(key, self.get_string(key)?)
    }

    /// Like [`YamlDocument::get_number`], returning `default` for a missing
    /// key.
    pub fn get_number_or<T: num::Num>(&self, key: &str, default: T) -> Result<T, YamlError> {
        or_default(self.get_number(key), default)
    }

    /// Reads every item of the list at `key` as a number.
    pub fn get_number_list<T: num::Num>(&self, key: &str) -> Result<Vec<T>, YamlError> {
        self.get_string_list(key)?
            .into_iter()
            .map(|text| number(key, text))
            .collect()
    }

    /// `true` if the text is `true` in any case, `false` for anything else.
    pub fn get_bool(&self, key: &str) -> Result<bool, YamlError> {
        self.get_string(key).map(parse_bool)
    }

    /// Like [`YamlDocument::get_bool`], returning `default` when the key is
    /// missing or holds a list.
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_string(key).map(parse_bool).unwrap_or(default)
    }

    /// Reads every item of the list at `key` as a boolean.
    pub fn get_bool_list(&self, key: &str) -> Result<Vec<bool>, YamlError> {
        Ok(self
            .get_string_list(key)?
            .into_iter()
            .map(parse_bool)
            .collect())
    }

    /// A single character.
    pub fn get_char(&self, key: &str) -> Result<char, YamlError> {
        parse_char(key, self.get_string(key)?)
    }

    /// Like [`YamlDocument::get_char`], returning `default` for a missing key.
    pub fn get_char_or(&self, key: &str, default: char) -> Result<char, YamlError> {
        or_default(self.get_char(key), default)
    }

    /// Reads every item of the list at `key` as a single character.
    pub fn get_char_list(&self, key: &str) -> Result<Vec<char>, YamlError> {
        self.get_string_list(key)?
            .into_iter()
            .map(|text| parse_char(key, text))
            .collect()
    }
}
