//! A single header field, stored as it appeared on the wire.

use serde::Serialize;

/// A field in a message or message-part header.
///
/// `name` is the text before the first `:` exactly as read. `values` holds
/// the first value line (everything after the `:`, leading space included)
/// followed by any continuation lines, each with its leading whitespace.
/// There is always at least one value line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub values: Vec<String>,
}

impl Field {
    /// Open a new field with its first value line.
    pub fn new(name: impl Into<String>, first_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![first_value.into()],
        }
    }

    /// Append a continuation line.
    pub fn push_continuation(&mut self, line: impl Into<String>) {
        self.values.push(line.into());
    }

    /// The field name in canonical form (`content-TYPE` → `Content-Type`).
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.name)
    }

    /// The value lines trimmed and joined by single spaces.
    pub fn value(&self) -> String {
        let mut result = String::new();
        for line in &self.values {
            if !result.is_empty() {
                result.push(' ');
            }
            result.push_str(line.trim());
        }
        result
    }
}

/// Canonicalize a field name: trim, then capitalize each hyphen-separated
/// segment and lower-case the rest of it.
pub fn canonical_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for (i, segment) in name.trim().split('-').enumerate() {
        if i > 0 {
            result.push('-');
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.extend(chars.flat_map(char::to_lowercase));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name_variants() {
        for input in ["foo-bar", "Foo-bar", "FOO-BAR", "fOO-bAR", "foo-Bar"] {
            assert_eq!(canonical_name(input), "Foo-Bar", "input {input}");
        }
        for input in ["foo", "Foo", "FOO", "fOO"] {
            assert_eq!(canonical_name(input), "Foo", "input {input}");
        }
    }

    #[test]
    fn test_canonical_name_trims() {
        assert_eq!(canonical_name(" message-id "), "Message-Id");
        assert_eq!(canonical_name("mime-version"), "Mime-Version");
    }

    #[test]
    fn test_value_joins_trimmed_lines() {
        let mut field = Field::new("Subject", " This is a long");
        field.push_continuation("\tsubject line  ");
        assert_eq!(field.value(), "This is a long subject line");
    }

    #[test]
    fn test_value_single_line() {
        let field = Field::new("To", " bar");
        assert_eq!(field.value(), "bar");
        assert_eq!(field.canonical_name(), "To");
    }
}
