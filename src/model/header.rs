//! Header storage and the accessors derived from it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::address::Address;
use super::field::{canonical_name, Field};
use crate::decode::charset::CharsetRegistry;
use crate::error::{MimeError, Result};
use crate::parser::header::{decode_encoded_words, extract_message_ids, parse_date};

/// Default content type of an ordinary part.
pub const TEXT_PLAIN: &str = "text/plain";

/// Default content type of the children of a `multipart/digest`.
pub const MESSAGE_RFC822: &str = "message/rfc822";

/// Fields consulted by [`Header::recipients`], in order.
pub const RECIPIENT_FIELDS: &[&str] = &["To", "Cc", "Bcc"];

/// A message or message-part header.
///
/// Fields keep their wire order. The default content type is dictated by
/// context: `text/plain` normally, `message/rfc822` for the children of a
/// `multipart/digest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub fields: Vec<Field>,
    pub default_type: String,
}

impl Header {
    /// Create an empty header with the given default content type.
    pub fn new(default_type: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            default_type: default_type.into(),
        }
    }

    /// Open a new field.
    pub fn push_field(&mut self, name: impl Into<String>, first_value: impl Into<String>) {
        self.fields.push(Field::new(name, first_value));
    }

    /// Extend the most recently opened field with a continuation line.
    pub fn push_continuation(&mut self, line: impl Into<String>) -> Result<()> {
        let field = self
            .fields
            .last_mut()
            .ok_or_else(|| MimeError::header_syntax("unexpected continuation line"))?;
        field.push_continuation(line);
        Ok(())
    }

    /// `true` when the header holds no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The last field whose canonical name matches `name`.
    pub fn field(&self, name: &str) -> Option<&Field> {
        let wanted = canonical_name(name);
        self.fields
            .iter()
            .rev()
            .find(|f| f.canonical_name() == wanted)
    }

    /// Combined value of the last field named `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.field(name).map(Field::value)
    }

    /// The content type in canonical `major/minor` form.
    ///
    /// Falls back to the default type when the field is absent or does not
    /// hold a well-formed `major/minor` pair of tokens.
    pub fn content_type(&self) -> String {
        match self.get("Content-Type").and_then(|v| parse_media_type(&v)) {
            Some((media_type, _)) if media_type.contains('/') => media_type,
            _ => self.default_type.clone(),
        }
    }

    /// The major part of [`Header::content_type`].
    pub fn major_type(&self) -> String {
        let ct = self.content_type();
        ct.split_once('/').map_or(ct.as_str(), |(major, _)| major).to_string()
    }

    /// The minor part of [`Header::content_type`].
    pub fn minor_type(&self) -> String {
        let ct = self.content_type();
        ct.split_once('/').map_or("", |(_, minor)| minor).to_string()
    }

    /// Content-Type parameters, keyed by lower-case name. Empty when absent.
    pub fn params(&self) -> BTreeMap<String, String> {
        self.get("Content-Type")
            .and_then(|v| parse_media_type(&v))
            .map(|(_, params)| params)
            .unwrap_or_default()
    }

    /// Disposition token and parameters; `("inline", {})` when absent.
    pub fn disposition(&self) -> (String, BTreeMap<String, String>) {
        self.get("Content-Disposition")
            .and_then(|v| parse_media_type(&v))
            .unwrap_or_else(|| ("inline".to_string(), BTreeMap::new()))
    }

    /// The declared charset label, `us-ascii` by default.
    pub fn charset(&self) -> String {
        self.params()
            .remove("charset")
            .unwrap_or_else(|| "us-ascii".to_string())
    }

    /// The decoded Subject, or an empty string when absent or undecodable.
    pub fn subject(&self) -> String {
        let Some(raw) = self.get("Subject") else {
            return String::new();
        };
        match decode_encoded_words(&raw, &CharsetRegistry::default()) {
            Ok(subject) => subject,
            Err(e) => {
                warn!(subject = %raw, error = %e, "Could not decode Subject");
                String::new()
            }
        }
    }

    /// The parsed Date, or the Unix epoch when absent or unparsable.
    pub fn date(&self) -> DateTime<Utc> {
        let Some(raw) = self.get("Date") else {
            return DateTime::UNIX_EPOCH;
        };
        match parse_date(&raw) {
            Some(dt) => dt.with_timezone(&Utc),
            None => {
                warn!(date = %raw.trim(), "Could not parse Date");
                DateTime::UNIX_EPOCH
            }
        }
    }

    /// The Content-Transfer-Encoding, `7bit` by default.
    pub fn transfer_encoding(&self) -> String {
        self.get("Content-Transfer-Encoding")
            .unwrap_or_else(|| "7bit".to_string())
    }

    /// The From address, if it parses as a single mailbox.
    pub fn sender(&self) -> Option<Address> {
        self.get("From").and_then(|v| Address::parse(&v))
    }

    /// All To, Cc and Bcc addresses in field order.
    pub fn recipients(&self) -> Vec<Address> {
        self.recipients_in(RECIPIENT_FIELDS)
    }

    /// Addresses from the named fields, in the order given.
    ///
    /// Fields that do not parse as an address list are skipped.
    pub fn recipients_in(&self, names: &[&str]) -> Vec<Address> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .filter_map(|value| Address::parse_list(&value))
            .flatten()
            .collect()
    }

    /// The Message-Id without angle brackets, or an empty string.
    pub fn message_id(&self) -> String {
        self.message_ids("Message-Id")
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Message ids listed in In-Reply-To.
    pub fn in_reply_to(&self) -> Vec<String> {
        self.message_ids("In-Reply-To")
    }

    /// Message ids listed in References.
    pub fn references(&self) -> Vec<String> {
        self.message_ids("References")
    }

    fn message_ids(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|v| extract_message_ids(&v))
            .unwrap_or_default()
    }
}

/// Split a `token; key=value` header value with the media-type grammar.
///
/// The leading value must be a token, optionally followed by `/` and a
/// second token. Anything else rejects the whole value.
fn parse_media_type(value: &str) -> Option<(String, BTreeMap<String, String>)> {
    let parsed = mailparse::parse_content_type(value);
    let media_type = parsed.mimetype.trim().to_lowercase();
    let valid = match media_type.split_once('/') {
        Some((major, minor)) => is_token(major) && is_token(minor),
        None => is_token(&media_type),
    };
    valid.then(|| (media_type, parsed.params))
}

/// RFC 2045 token: one or more ASCII characters, excluding SPACE, controls
/// and tspecials.
fn is_token(s: &str) -> bool {
    const TSPECIALS: &[u8] = b"()<>@,;:\\\"/[]?=";
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_graphic() && !TSPECIALS.contains(&b))
}
