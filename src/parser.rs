use std::sync::Arc;

use miette::SourceSpan;
use winnow::{
    combinator::{alt, delimited, opt, repeat},
    prelude::*,
    token::{any, none_of, one_of, rest, take_while},
};

use crate::{Quote, YamlErrorKind, YamlKey, YamlParseError, YamlValue};

/// Result of parsing one logical line. A quote or bracket that is still open
/// at the end of the line is not an error yet: the reader folds the next
/// physical line in and tries again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineParse<T> {
    Complete(T),
    Pending,
}

impl<T> LineParse<T> {
    pub(crate) fn map<U>(self, f: impl FnOnce(T) -> U) -> LineParse<U> {
        match self {
            LineParse::Complete(t) => LineParse::Complete(f(t)),
            LineParse::Pending => LineParse::Pending,
        }
    }
}

/// What follows `key:` on a key line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rest {
    /// Nothing, or only a comment. Sub keys or `-` items may follow.
    Empty { comment: String },
    Scalar(YamlValue),
    Flow { items: Vec<YamlValue>, comment: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineItem {
    /// `- value`
    Item(YamlValue),
    /// `key: rest`
    Key { key: YamlKey, rest: Rest },
}

impl LineItem {
    /// The same-line comment. It always runs to the end of the line.
    pub(crate) fn comment(&self) -> &str {
        match self {
            LineItem::Item(value) | LineItem::Key { rest: Rest::Scalar(value), .. } => {
                value.trailing_comment()
            }
            LineItem::Key {
                rest: Rest::Empty { comment } | Rest::Flow { comment, .. },
                ..
            } => comment.as_str(),
        }
    }
}

type LineResult<T> = Result<LineParse<T>, YamlErrorKind>;

/// Classifies a logical line with its indentation already removed. Blank and
/// comment lines never get here.
pub(crate) fn parse_line(line: &str) -> LineResult<LineItem> {
    if let Some(item) = line.strip_prefix('-') {
        return Ok(parse_scalar(item)?.map(LineItem::Item));
    }
    let mut input = line;
    let key = (key_token, ":")
        .map(|(key, _)| key)
        .parse_next(&mut input)
        .map_err(|_| YamlErrorKind::MalformedKey)?;
    let body = input.trim_start();
    let rest = if body.is_empty() {
        LineParse::Complete(Rest::Empty {
            comment: String::new(),
        })
    } else if body.starts_with('#') {
        LineParse::Complete(Rest::Empty {
            comment: input.to_string(),
        })
    } else if body.starts_with('[') {
        parse_flow(input)?.map(|(items, comment)| Rest::Flow { items, comment })
    } else {
        parse_scalar(input)?.map(Rest::Scalar)
    };
    Ok(rest.map(|rest| LineItem::Key { key, rest }))
}

/// A scalar plus its same-line comment. `text` may start with whitespace,
/// which is kept with the comment when there is no value.
fn parse_scalar(text: &str) -> LineResult<YamlValue> {
    let body = text.trim_start();
    if body.is_empty() {
        return Ok(LineParse::Complete(plain_value("")));
    }
    if body.starts_with('#') {
        let mut value = plain_value("");
        value.trailing = text.to_string();
        return Ok(LineParse::Complete(value));
    }
    if body.len() > 1 && body.starts_with(|c: char| c == '\'' || c == '"') {
        let Some(end) = quoted_len(body) else {
            return Ok(LineParse::Pending);
        };
        let (token, after) = body.split_at(end);
        let mut value = quoted_value(token)?;
        if !after.trim().is_empty() {
            if after.starts_with(char::is_whitespace) && after.trim_start().starts_with('#') {
                value.trailing = after.trim_end().to_string();
            } else {
                return Err(YamlErrorKind::TrailingCharacters);
            }
        }
        return Ok(LineParse::Complete(value));
    }
    let (token, comment) = split_comment(body);
    let mut value = plain_value(token);
    value.trailing = comment.to_string();
    Ok(LineParse::Complete(value))
}

/// Splits a plain scalar from a comment. Only a `#` after whitespace starts
/// one, so `a#b` is a value and `a #b` is `a` plus a comment.
fn split_comment(body: &str) -> (&str, &str) {
    let mut prev_space = false;
    for (i, c) in body.char_indices() {
        if c == '#' && prev_space {
            let token = body[..i].trim_end();
            return (token, body[token.len()..].trim_end());
        }
        prev_space = c.is_whitespace();
    }
    (body.trim_end(), "")
}

fn plain_value(token: &str) -> YamlValue {
    YamlValue {
        text: token.to_string(),
        repr: Some(token.to_string()),
        ..Default::default()
    }
}

fn quoted_value(token: &str) -> Result<YamlValue, YamlErrorKind> {
    let (text, quote) = quoted
        .parse(token)
        .map_err(|_| YamlErrorKind::TrailingCharacters)?;
    Ok(YamlValue {
        text,
        repr: Some(token.to_string()),
        quote: Some(quote),
        ..Default::default()
    })
}

/// `[ a, 'b', "c" ]` with an optional comment after the closing bracket.
fn parse_flow(text: &str) -> LineResult<(Vec<YamlValue>, String)> {
    let body = text.trim_start();
    let mut close = None;
    let mut item_start = true;
    let mut iter = body.char_indices().skip(1).peekable();
    while let Some((i, c)) = iter.next() {
        match c {
            '\'' | '"' if item_start => {
                let Some(len) = quoted_len(&body[i..]) else {
                    return Ok(LineParse::Pending);
                };
                // skip the rest of the quoted token
                let end = i + len;
                while iter.next_if(|(j, _)| *j < end).is_some() {}
                item_start = false;
            }
            '[' => return Err(YamlErrorKind::MismatchedBracket),
            ']' => {
                close = Some(i);
                break;
            }
            ',' => item_start = true,
            c if c.is_whitespace() => {}
            _ => item_start = false,
        }
    }
    let Some(close) = close else {
        return Ok(LineParse::Pending);
    };

    let tail = &body[close + 1..];
    let comment = if tail.trim().is_empty() {
        String::new()
    } else if tail.starts_with(char::is_whitespace) && tail.trim_start().starts_with('#') {
        tail.trim_end().to_string()
    } else if tail.contains(|c: char| c == '[' || c == ']') {
        return Err(YamlErrorKind::MismatchedBracket);
    } else {
        return Err(YamlErrorKind::TrailingCharacters);
    };

    let mut items = Vec::new();
    for piece in split_items(&body[1..close]) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if piece.len() > 1 && piece.starts_with(|c: char| c == '\'' || c == '"') {
            if quoted_len(piece) != Some(piece.len()) {
                return Err(YamlErrorKind::TrailingCharacters);
            }
            items.push(quoted_value(piece)?);
        } else {
            items.push(plain_value(piece));
        }
    }
    Ok(LineParse::Complete((items, comment)))
}

/// Splits flow sequence content on commas outside quoted items.
fn split_items(inner: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut item_start = true;
    let mut iter = inner.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        match c {
            '\'' | '"' if item_start => {
                let end = quoted_len(&inner[i..]).map_or(inner.len(), |len| i + len);
                while iter.next_if(|(j, _)| *j < end).is_some() {}
                item_start = false;
            }
            ',' => {
                pieces.push(&inner[start..i]);
                start = i + 1;
                item_start = true;
            }
            c if c.is_whitespace() => {}
            _ => item_start = false,
        }
    }
    pieces.push(&inner[start..]);
    pieces
}

/// Byte length of the quoted token `s` starts with, delimiters included.
/// `None` if the quote is never closed.
pub(crate) fn quoted_len(s: &str) -> Option<usize> {
    let open = s.chars().next().filter(|c| matches!(*c, '\'' | '"'))?;
    let mut chars = s.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if open == '"' && c == '\\' {
            chars.next();
        } else if c == open {
            if open == '\'' && chars.next_if(|(_, n)| *n == '\'').is_some() {
                continue;
            }
            return Some(i + 1);
        }
    }
    None
}

fn quoted(input: &mut &str) -> PResult<(String, Quote)> {
    alt((
        single_quoted.map(|s| (s, Quote::Single)),
        double_quoted.map(|s| (s, Quote::Double)),
    ))
    .parse_next(input)
}

/// `'...'` where `''` stands for `'`.
fn single_quoted(input: &mut &str) -> PResult<String> {
    delimited("'", repeat(0.., alt(("''".value('\''), none_of('\'')))), "'")
        .parse_next(input)
}

/// `"..."` decoding `\"`, `\\` and `\n`. Other escapes are kept as written.
fn double_quoted(input: &mut &str) -> PResult<String> {
    delimited("\"", repeat(0.., double_fragment), "\"").parse_next(input)
}

fn double_fragment<'i>(input: &mut &'i str) -> PResult<&'i str> {
    alt((
        "\\\\".value("\\"),
        "\\\"".value("\""),
        "\\n".value("\n"),
        ("\\", any).take(),
        take_while(1.., |c: char| c != '\\' && c != '"'),
    ))
    .parse_next(input)
}

fn is_plain_key_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ':' | '.' | '\'' | '"')
}

/// Bare key: runs of non-reserved characters joined by single dots.
fn plain_key<'i>(input: &mut &'i str) -> PResult<&'i str> {
    (
        take_while(1.., is_plain_key_char),
        repeat(0.., (".", take_while(1.., is_plain_key_char))).map(|()| ()),
    )
        .take()
        .parse_next(input)
}

fn key_token(input: &mut &str) -> PResult<YamlKey> {
    alt((quoted.map(|(s, _)| s), plain_key.map(String::from)))
        .with_taken()
        .map(|(value, repr)| YamlKey {
            value,
            repr: Some(repr.to_string()),
        })
        .parse_next(input)
}

/// Parses a complete key token, such as `name`, `'with space'` or `"it's"`.
pub(crate) fn parse_key(input: &str) -> Result<YamlKey, YamlParseError> {
    key_token.parse(input).map_err(|_| YamlParseError {
        input: Arc::new(input.to_string()),
        span: SourceSpan::new(0.into(), input.len()),
        label: "invalid key",
        line: 1,
        kind: YamlErrorKind::MalformedKey,
        help: Some("Keys containing whitespace, `:`, `.` or quotes must be quoted."),
    })
}

fn radix(input: &mut &str) -> PResult<u32> {
    alt((
        alt(("0x", "0X")).value(16),
        alt(("0o", "0O")).value(8),
        alt(("0b", "0B")).value(2),
        "".value(10),
    ))
    .parse_next(input)
}

/// Parses a number with an optional sign, `0x`/`0o`/`0b` prefix and `_`
/// digit separators.
pub(crate) fn parse_number<T: num::Num>(text: &str) -> Option<T> {
    let (sign, radix, digits) = (opt(one_of(['+', '-'])), radix, rest)
        .parse(text.trim())
        .ok()?;
    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(|c: char| c == '+' || c == '-') {
        return None;
    }
    let mut s = String::with_capacity(digits.len() + 1);
    if let Some(sign) = sign {
        s.push(sign);
    }
    s.push_str(&digits);
    T::from_str_radix(&s, radix).ok()
}
