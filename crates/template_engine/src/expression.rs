//! Parsing of `${...}` expressions embedded in template strings.
//!
//! A template string is split into literal text and variable lookups. A lookup path
//! accepts dotted segments (`a.b.1`) and bracket indexes (`a.b[1]`). A backslash in
//! front of `${` escapes the expression so it is emitted literally.

use serde_json::Value;

use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "expression_tests.rs"]
mod tests;

const EXPRESSION_START: &str = "${";
const ESCAPED_EXPRESSION_START: &str = "\\${";

/// One piece of a parsed template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Part {
    Literal(String),
    Lookup(Vec<String>),
}

/// A template string split into literal text and variable lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Expression {
    parts: Vec<Part>,
}

impl Expression {
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix(ESCAPED_EXPRESSION_START) {
                literal.push_str(EXPRESSION_START);
                rest = after;
            } else if let Some(after) = rest.strip_prefix(EXPRESSION_START) {
                let end = after.find('}').ok_or_else(|| Error::InvalidExpression {
                    text: text.to_string(),
                    reason: "unterminated expression".to_string(),
                })?;
                if !literal.is_empty() {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                }
                parts.push(Part::Lookup(parse_path(text, &after[..end])?));
                rest = &after[end + 1..];
            } else {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    literal.push(c);
                }
                rest = chars.as_str();
            }
        }

        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Self { parts })
    }

    pub(crate) fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Returns the lookup path when the whole string is a single expression.
    pub(crate) fn single_lookup(&self) -> Option<&[String]> {
        match self.parts.as_slice() {
            [Part::Lookup(path)] => Some(path),
            _ => None,
        }
    }
}

fn parse_path(text: &str, inner: &str) -> Result<Vec<String>> {
    let invalid = |reason: String| Error::InvalidExpression {
        text: text.to_string(),
        reason,
    };

    let mut segments = Vec::new();
    for piece in inner.trim().split('.') {
        let (name, mut indexes) = match piece.find('[') {
            Some(position) => piece.split_at(position),
            None => (piece, ""),
        };
        if name.is_empty() && indexes.is_empty() {
            return Err(invalid(format!("empty path segment in '{inner}'")));
        }
        if !name.is_empty() {
            segments.push(name.to_string());
        }
        while !indexes.is_empty() {
            let close = indexes
                .find(']')
                .ok_or_else(|| invalid(format!("unclosed index in '{inner}'")))?;
            let index = &indexes[1..close];
            if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid(format!("invalid index '{index}' in '{inner}'")));
            }
            segments.push(index.to_string());
            indexes = &indexes[close + 1..];
            if !indexes.is_empty() && !indexes.starts_with('[') {
                return Err(invalid(format!("unexpected '{indexes}' in '{inner}'")));
            }
        }
    }
    Ok(segments)
}

/// Renders a value embedded in a larger string.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
