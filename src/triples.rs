// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Parsing of bulk-delete selections.
//!
//! Record listings hand each row to the presentation layer as a
//! `name||data||type` token. Selected tokens come back either one per form
//! value or as a single list literal such as `[u'a||1.2.3.4||A', u"b||…||A"]`.
//! Both shapes are parsed here with a small hand-written scanner; the input is
//! never evaluated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::TRIPLE_SEPARATOR;

/// One record selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTriple {
    pub name: String,
    pub record_type: String,
    pub data: String,
}

impl RecordTriple {
    #[must_use]
    pub fn new(name: &str, record_type: &str, data: &str) -> Self {
        Self {
            name: name.to_string(),
            record_type: record_type.to_string(),
            data: data.to_string(),
        }
    }

    /// Encode as `name||data||type`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}{TRIPLE_SEPARATOR}{}{TRIPLE_SEPARATOR}{}",
            self.name, self.data, self.record_type
        )
    }
}

/// Errors parsing selection tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TripleParseError {
    /// The token does not have exactly three `||`-separated fields
    #[error("Expected 'name||data||type', got {field_count} field(s) in '{token}'")]
    FieldCount { token: String, field_count: usize },

    /// One of the three fields is empty
    #[error("Empty {field} in '{token}'")]
    EmptyField { token: String, field: &'static str },

    /// The list literal is not a bracketed list of quoted strings
    #[error("Malformed record list at offset {offset}: {reason}")]
    MalformedList { offset: usize, reason: String },
}

/// Parse one `name||data||type` token.
///
/// # Errors
///
/// Returns [`TripleParseError`] if the token does not have three non-empty fields.
pub fn parse_triple(token: &str) -> Result<RecordTriple, TripleParseError> {
    let fields: Vec<&str> = token.trim().split(TRIPLE_SEPARATOR).map(str::trim).collect();
    if fields.len() != 3 {
        return Err(TripleParseError::FieldCount {
            token: token.to_string(),
            field_count: fields.len(),
        });
    }

    for (value, field) in fields.iter().zip(["name", "data", "type"]) {
        if value.is_empty() {
            return Err(TripleParseError::EmptyField {
                token: token.to_string(),
                field,
            });
        }
    }

    Ok(RecordTriple::new(fields[0], fields[2], fields[1]))
}

/// Parse several tokens, keeping input order.
///
/// # Errors
///
/// Fails on the first malformed token.
pub fn parse_triples<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<RecordTriple>, TripleParseError> {
    tokens.iter().map(|t| parse_triple(t.as_ref())).collect()
}

/// Split a list literal of quoted strings into its items.
///
/// Accepts `['a', "b"]`, optional `u`/`b` prefixes, backslash escapes and a
/// trailing comma. Anything else is rejected.
///
/// # Errors
///
/// Returns [`TripleParseError::MalformedList`] describing the first problem.
pub fn parse_string_list(input: &str) -> Result<Vec<String>, TripleParseError> {
    let malformed = |offset: usize, reason: &str| TripleParseError::MalformedList {
        offset,
        reason: reason.to_string(),
    };

    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut pos = 0;
    let skip_ws = |pos: &mut usize| {
        while *pos < chars.len() && chars[*pos].1.is_whitespace() {
            *pos += 1;
        }
    };
    let offset_at = |pos: usize| chars.get(pos).map_or(input.len(), |(i, _)| *i);

    skip_ws(&mut pos);
    if chars.get(pos).map(|c| c.1) != Some('[') {
        return Err(malformed(offset_at(pos), "expected '['"));
    }
    pos += 1;

    let mut items = Vec::new();
    loop {
        skip_ws(&mut pos);
        match chars.get(pos).map(|c| c.1) {
            Some(']') => {
                pos += 1;
                break;
            }
            None => return Err(malformed(input.len(), "unterminated list")),
            _ => {}
        }

        if matches!(chars.get(pos).map(|c| c.1), Some('u' | 'U' | 'b' | 'B')) {
            pos += 1;
        }
        let quote = match chars.get(pos).map(|c| c.1) {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(malformed(offset_at(pos), "expected quoted string")),
        };
        pos += 1;

        let mut item = String::new();
        loop {
            match chars.get(pos).map(|c| c.1) {
                None => return Err(malformed(input.len(), "unterminated string")),
                Some('\\') => {
                    let escaped = chars
                        .get(pos + 1)
                        .map(|c| c.1)
                        .ok_or_else(|| malformed(input.len(), "dangling escape"))?;
                    item.push(escaped);
                    pos += 2;
                }
                Some(c) if c == quote => {
                    pos += 1;
                    break;
                }
                Some(c) => {
                    item.push(c);
                    pos += 1;
                }
            }
        }
        items.push(item);

        skip_ws(&mut pos);
        match chars.get(pos).map(|c| c.1) {
            Some(',') => pos += 1,
            Some(']') => {
                pos += 1;
                break;
            }
            _ => return Err(malformed(offset_at(pos), "expected ',' or ']'")),
        }
    }

    skip_ws(&mut pos);
    if pos != chars.len() {
        return Err(malformed(offset_at(pos), "trailing characters after list"));
    }
    Ok(items)
}

/// Parse a list literal of `name||data||type` tokens.
///
/// # Errors
///
/// Returns [`TripleParseError`] if the list or any token is malformed.
pub fn parse_triple_list(input: &str) -> Result<Vec<RecordTriple>, TripleParseError> {
    parse_triples(&parse_string_list(input)?)
}

#[cfg(test)]
#[path = "triples_tests.rs"]
mod triples_tests;
