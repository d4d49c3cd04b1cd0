//! Restricted JSON-like codec used at the request/response boundary.
//!
//! Only two shapes exist: a flat object mapping strings to strings, and an
//! array of pre-formatted fragments. There are no numbers, booleans or nested
//! values on the decoding side. Inside a quoted string a backslash makes the
//! next character literal; that is the only escape.
//!
//! [`encode_object`] writes keys and values verbatim, so a value containing a
//! quote does not survive [`decode`]. Use [`encode_object_escaped`] when the
//! output must decode back to the same mapping.

use std::{borrow::Cow, collections::BTreeMap, fmt};

use itertools::Itertools;

use crate::error::StructuralError;

/// Flat string-to-string mapping. Keys are unique and kept in sorted order.
pub type JsonObject = BTreeMap<String, String>;

/// `{"k1":"v1","k2":"v2"}`, or `{}` for an empty mapping. No escaping.
pub fn encode_object(object: &JsonObject) -> String {
    encode_members(
        object
            .iter()
            .map(|(key, value)| (key.as_str(), format!("\"{value}\""))),
    )
}

/// Like [`encode_object`], with quotes and backslashes escaped in both keys
/// and values.
pub fn encode_object_escaped(object: &JsonObject) -> String {
    encode_members(
        object
            .iter()
            .map(|(key, value)| (escape(key), quote(value))),
    )
}

/// `[f1,f2,...]`. Fragments are copied verbatim; plain strings must be passed
/// through [`quote`] first.
pub fn encode_array<I>(fragments: I) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    format!("[{}]", fragments.into_iter().format(","))
}

/// `{"k1":f1,"k2":f2}` where each value is a pre-formatted fragment such as
/// the output of [`encode_array`] or [`quote`]. Keys are written verbatim.
pub fn encode_members<I, K, V>(members: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: fmt::Display,
    V: fmt::Display,
{
    format!(
        "{{{}}}",
        members
            .into_iter()
            .format_with(",", |(key, value), f| f(&format_args!("\"{key}\":{value}")))
    )
}

/// Backslash-escapes `"` and `\`.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['"', '\\']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        if matches!(ch, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}

/// A quoted, escaped string fragment.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", escape(text))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start { opened: bool },
    KeyOpen,
    KeyClose { colon: bool },
    ValOpen,
    ValClose,
    NextPair,
    Closed,
}

/// Decodes a flat object, or returns `None` on any malformed input.
pub fn decode(text: &str) -> Option<JsonObject> {
    try_decode(text).ok()
}

/// Decodes a flat object, reporting where and why decoding stopped.
///
/// Accepts optional whitespace and one `{`, then `"key":"value"` pairs
/// separated by `,`, then `}` and optional whitespace. A trailing comma, a
/// missing `:`, or any bare character other than whitespace and the
/// punctuation above fails the whole document. Later duplicates of a key
/// replace earlier ones.
pub fn try_decode(text: &str) -> Result<JsonObject, StructuralError> {
    let fail = |offset: usize, reason: &'static str| StructuralError::Codec { offset, reason };

    let mut object = JsonObject::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut state = State::Start { opened: false };
    let mut chars = text.char_indices();

    while let Some((offset, ch)) = chars.next() {
        state = match state {
            State::Start { opened } => match ch {
                c if c.is_whitespace() => state,
                '{' if !opened => State::Start { opened: true },
                '}' if opened => State::Closed,
                '"' => {
                    key.clear();
                    State::KeyOpen
                }
                _ => return Err(fail(offset, "expected '{' or a key")),
            },
            State::KeyOpen | State::ValOpen => {
                let target = if state == State::KeyOpen {
                    &mut key
                } else {
                    &mut value
                };
                match ch {
                    '\\' => {
                        let (_, escaped) = chars
                            .next()
                            .ok_or_else(|| fail(offset, "dangling escape"))?;
                        target.push(escaped);
                        state
                    }
                    '"' if state == State::KeyOpen => State::KeyClose { colon: false },
                    '"' => State::ValClose,
                    other => {
                        target.push(other);
                        state
                    }
                }
            }
            State::KeyClose { colon } => match ch {
                c if c.is_whitespace() => state,
                ':' if !colon => State::KeyClose { colon: true },
                '"' if colon => {
                    value.clear();
                    State::ValOpen
                }
                _ => return Err(fail(offset, "expected ':' followed by a value")),
            },
            State::ValClose => match ch {
                c if c.is_whitespace() => state,
                ',' => {
                    object.insert(std::mem::take(&mut key), std::mem::take(&mut value));
                    State::NextPair
                }
                '}' => {
                    object.insert(std::mem::take(&mut key), std::mem::take(&mut value));
                    State::Closed
                }
                _ => return Err(fail(offset, "expected ',' or '}'")),
            },
            State::NextPair => match ch {
                c if c.is_whitespace() => state,
                '"' => {
                    key.clear();
                    State::KeyOpen
                }
                '}' => return Err(fail(offset, "trailing comma")),
                _ => return Err(fail(offset, "expected a key")),
            },
            State::Closed => match ch {
                c if c.is_whitespace() => state,
                _ => return Err(fail(offset, "unexpected content after '}'")),
            },
        };
    }

    if state == State::Closed {
        Ok(object)
    } else {
        Err(fail(text.len(), "unexpected end of input"))
    }
}
