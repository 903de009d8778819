//! RFC 5322 header parsing: field lines, folding, encoded-words (RFC 2047),
//! dates, and message-id lists.

use std::io::BufRead;

use base64::Engine;
use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::decode::charset::CharsetRegistry;
use crate::decode::transfer::BASE64_LENIENT;
use crate::error::{MimeError, Result};
use crate::model::header::Header;

/// Where a header block is being read, which decides how end of input is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderEnd {
    /// Only a blank line ends the block.
    BlankLine,
    /// End of input at the start of a line also ends the block.
    BlankLineOrEof,
}

/// Read one header block from `r`, up to and including its terminating blank line.
pub fn read_header(r: &mut dyn BufRead, default_type: &str, end: HeaderEnd) -> Result<Header> {
    let mut header = Header::new(default_type);
    loop {
        let Some(line) = read_field_line(r)? else {
            if end == HeaderEnd::BlankLineOrEof {
                return Ok(header);
            }
            return Err(MimeError::UnexpectedEof {
                context: "header fields",
            });
        };
        if line.is_empty() {
            return Ok(header);
        }
        if is_continuation_line(&line) {
            header.push_continuation(line)?;
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(MimeError::header_syntax(format!(
                "field line without a colon: {line:?}"
            )));
        };
        header.push_field(name, value);
    }
}

/// Read one header line without its terminating `\n` (and a `\r` right before it).
///
/// Returns `None` at a clean end of input. A final line with no `\n` is an error.
fn read_field_line(r: &mut dyn BufRead) -> Result<Option<String>> {
    let mut buf = Vec::new();
    if r.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    if buf.pop() != Some(b'\n') {
        return Err(MimeError::UnexpectedEof {
            context: "a header line",
        });
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(decode_header_bytes(&buf)))
}

fn is_continuation_line(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Whitespace between two adjacent encoded words is dropped (RFC 2047 §6.2).
/// Malformed words are kept as literal text. A word naming a charset the
/// registry cannot resolve fails the whole value.
pub fn decode_encoded_words(input: &str, charsets: &CharsetRegistry) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut after_word = false;
    let mut rest = input;

    while let Some(start) = rest.find("=?") {
        let (literal, candidate) = rest.split_at(start);
        match EncodedWord::split_off(candidate) {
            Some((word, tail)) => {
                if !(after_word && literal.trim().is_empty()) {
                    out.push_str(literal);
                }
                out.push_str(&word.decode(charsets)?);
                after_word = true;
                rest = tail;
            }
            None => {
                out.push_str(literal);
                out.push_str("=?");
                after_word = false;
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// One `=?charset?encoding?text?=` token.
#[derive(Debug, PartialEq, Eq)]
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: char,
    text: &'a str,
}

impl<'a> EncodedWord<'a> {
    /// Parse a word at the start of `s`, returning it and the text after it.
    fn split_off(s: &'a str) -> Option<(Self, &'a str)> {
        let body = s.strip_prefix("=?")?;
        let (charset, body) = body.split_once('?')?;
        let (encoding, body) = body.split_once('?')?;
        let (text, tail) = body.split_once("?=")?;
        let encoding = match encoding {
            "B" | "b" => 'B',
            "Q" | "q" => 'Q',
            _ => return None,
        };
        if charset.is_empty() || text.contains(char::is_whitespace) {
            return None;
        }
        // RFC 2231 language suffix: charset*lang
        let charset = charset.split('*').next().unwrap_or(charset);
        Some((
            Self {
                charset,
                encoding,
                text,
            },
            tail,
        ))
    }

    fn decode(&self, charsets: &CharsetRegistry) -> Result<String> {
        let encoding = charsets.resolve(self.charset)?;
        let bytes = match self.encoding {
            'B' => BASE64_LENIENT.decode(self.text).ok(),
            _ => {
                let escaped = self.text.replace('_', "=20");
                quoted_printable::decode(escaped, quoted_printable::ParseMode::Robust).ok()
            }
        };
        match bytes {
            Some(bytes) => Ok(encoding.decode(&bytes).0.into_owned()),
            None => {
                debug!(word = self.text, "Undecodable encoded word kept as text");
                Ok(format!("=?{}?{}?{}?=", self.charset, self.encoding, self.text))
            }
        }
    }
}

/// Parse an RFC 5322 date.
///
/// If the first attempt fails and the value ends in a parenthesised comment,
/// the comment is stripped and parsing is retried once.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt);
    }
    if let Some(without_comment) = strip_trailing_comment(trimmed) {
        if let Ok(dt) = DateTime::parse_from_rfc2822(without_comment) {
            return Some(dt);
        }
    }
    None
}

/// `"Thu, 04 Jan 2024 10:00:00 +0000 (UTC)"` → `"Thu, 04 Jan 2024 10:00:00 +0000"`.
fn strip_trailing_comment(s: &str) -> Option<&str> {
    if !s.ends_with(')') {
        return None;
    }
    let open = s.rfind('(')?;
    Some(s[..open].trim_end())
}

/// Extract message ids from a Message-Id, In-Reply-To or References value.
///
/// An id is the text strictly between a `<` and the next `<` or `>`, kept
/// only when that next character is `>` and the text contains `@`. Quoted
/// angle brackets inside an id are not recognised.
pub fn extract_message_ids(s: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut remaining = s;
    while let Some(start) = remaining.find('<') {
        let after = &remaining[start + 1..];
        let Some(end) = after.find(['<', '>']) else {
            break;
        };
        if after[end..].starts_with('>') {
            let id = &after[..end];
            if id.contains('@') {
                result.push(id.to_string());
            }
            remaining = &after[end + 1..];
        } else {
            remaining = &after[end..];
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str) -> String {
        decode_encoded_words(input, &CharsetRegistry::default()).unwrap()
    }

    fn read(input: &str, end: HeaderEnd) -> Result<Header> {
        read_header(&mut input.as_bytes(), "text/plain", end)
    }

    #[test]
    fn test_read_header_fields_and_continuations() {
        let h = read(
            "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n\nbody",
            HeaderEnd::BlankLine,
        )
        .unwrap();
        assert_eq!(h.fields.len(), 2);
        assert_eq!(h.fields[0].name, "Subject");
        assert_eq!(h.fields[0].values, vec![" This is a long", "\tsubject line"]);
        assert_eq!(h.get("subject").unwrap(), "This is a long subject line");
    }

    #[test]
    fn test_read_header_stops_at_blank_line() {
        let mut input: &[u8] = b"To: bar\r\n\r\nrest\n";
        let h = read_header(&mut input, "text/plain", HeaderEnd::BlankLine).unwrap();
        assert_eq!(h.fields[0].values, vec![" bar"]);
        assert_eq!(input, b"rest\n");
    }

    #[test]
    fn test_read_header_leading_whitespace_is_error() {
        let err = read(" folded\n\n", HeaderEnd::BlankLine).unwrap_err();
        assert!(matches!(err, MimeError::HeaderSyntax { .. }));
    }

    #[test]
    fn test_read_header_missing_colon_is_error() {
        let err = read("not a field\n\n", HeaderEnd::BlankLine).unwrap_err();
        assert!(matches!(err, MimeError::HeaderSyntax { .. }));
    }

    #[test]
    fn test_read_header_eof_handling() {
        let err = read("To: bar\n", HeaderEnd::BlankLine).unwrap_err();
        assert!(matches!(err, MimeError::UnexpectedEof { .. }));

        let h = read("To: bar\n", HeaderEnd::BlankLineOrEof).unwrap();
        assert_eq!(h.fields.len(), 1);

        let err = read("To: bar", HeaderEnd::BlankLineOrEof).unwrap_err();
        assert!(matches!(err, MimeError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_read_header_keeps_lone_cr() {
        let h = read("X-Odd: a\rb\n\n", HeaderEnd::BlankLine).unwrap();
        assert_eq!(h.fields[0].values, vec![" a\rb"]);
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode("=?ISO-8859-1?Q?caf=E9?="), "café");
        assert_eq!(decode("=?ISO-8859-1?Q?R=E9sum=E9_du_projet?="), "Résumé du projet");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        assert_eq!(decode("=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        assert_eq!(decode("Re: =?UTF-8?B?SG9sYQ==?= there"), "Re: Hola there");
    }

    #[test]
    fn test_decode_malformed_word_kept() {
        assert_eq!(decode("price =?not an encoded word"), "price =?not an encoded word");
    }

    #[test]
    fn test_encoded_word_split_off() {
        let (word, tail) = EncodedWord::split_off("=?utf-8*en?q?a_b?= rest").unwrap();
        assert_eq!(
            word,
            EncodedWord {
                charset: "utf-8",
                encoding: 'Q',
                text: "a_b"
            }
        );
        assert_eq!(tail, " rest");
        assert!(EncodedWord::split_off("=?utf-8?X?abc?=").is_none());
        assert!(EncodedWord::split_off("=??Q?abc?=").is_none());
    }

    #[test]
    fn test_decode_q_trailing_underscore() {
        assert_eq!(decode("=?UTF-8?Q?end_?=x"), "end x");
    }

    #[test]
    fn test_decode_unknown_charset_fails() {
        let result = decode_encoded_words("=?x-klingon?Q?abc?=", &CharsetRegistry::default());
        assert!(matches!(result, Err(MimeError::Charset(_))));
    }

    #[test]
    fn test_decode_utf8_base64_japanese() {
        assert_eq!(decode("=?UTF-8?B?5bGx55Sw5aSq6YOO?="), "山田太郎");
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-04");
    }

    #[test]
    fn test_parse_date_trailing_comment() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 -0500 (EST)").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_parse_date_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("not a date (really)").is_none());
    }

    #[test]
    fn test_extract_message_ids() {
        assert_eq!(extract_message_ids(" <a@b> "), vec!["a@b"]);
        assert_eq!(extract_message_ids("<c@d> <e@f>"), vec!["c@d", "e@f"]);
        assert_eq!(extract_message_ids("<<x@y>"), vec!["x@y"]);
        assert!(extract_message_ids("<no-at-sign>").is_empty());
        assert!(extract_message_ids("<unterminated@x").is_empty());
    }
}
