//! On-demand decoding of leaf bodies.
//!
//! Nothing is decoded at parse time. [`Part::body`] builds a lazy pipeline
//! over the stored raw bytes:
//!
//! 1. transfer decoding (`quoted-printable`, `base64`),
//! 2. for `text/*`, charset conversion to UTF-8,
//! 3. for `text/plain; format=flowed`, [`flowed::FlowedText`],
//! 4. for `text/*`, [`text::CollapseBlankLines`].
//!
//! Each stage pulls from the one before it, so the decoded body is produced
//! only as fast as the caller consumes it.

pub mod charset;
pub mod flowed;
pub mod text;
pub mod transfer;

use std::io::{self, BufRead, BufReader, Read};

use crate::error::{MimeError, Result};
use crate::model::{Body, Part};
use charset::CharsetRegistry;
use flowed::FlowedText;
use text::{CollapseBlankLines, TextLines};

type Lines<'a> = Box<dyn Iterator<Item = io::Result<String>> + 'a>;

/// A decoded text body: a single-pass sequence of lines.
///
/// Iterate it for lines without terminators, or [`Read`] it for UTF-8
/// bytes with every line ending in `\n`.
pub struct TextBody<'a> {
    lines: Lines<'a>,
    pending: Vec<u8>,
    pos: usize,
}

impl<'a> TextBody<'a> {
    fn new(lines: Lines<'a>) -> Self {
        Self {
            lines,
            pending: Vec::new(),
            pos: 0,
        }
    }
}

impl Iterator for TextBody<'_> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

impl Read for TextBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            let Some(line) = self.lines.next() else {
                return Ok(0);
            };
            self.pending = line?.into_bytes();
            self.pending.push(b'\n');
            self.pos = 0;
        }
        let rest = &self.pending[self.pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// The decoded body of a leaf part.
pub enum DecodedBody<'a> {
    /// A `text/*` body, converted to UTF-8 and normalized line by line.
    Text(TextBody<'a>),
    /// Any other body with only the transfer encoding removed.
    Binary(Box<dyn BufRead + 'a>),
}

impl Read for DecodedBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Text(text) => text.read(buf),
            Self::Binary(binary) => binary.read(buf),
        }
    }
}

impl Part {
    /// Decode a leaf body using the default charset registry.
    ///
    /// Fails with [`MimeError::NotLeaf`] for `multipart/*` and `message/*`
    /// parts, and with [`MimeError::Charset`] when a text part names a
    /// charset that cannot be resolved.
    pub fn body(&self) -> Result<DecodedBody<'_>> {
        self.body_with(&CharsetRegistry::default())
    }

    /// Decode a leaf body, resolving charsets with `charsets`.
    pub fn body_with(&self, charsets: &CharsetRegistry) -> Result<DecodedBody<'_>> {
        if !self.is_leaf() {
            return Err(MimeError::NotLeaf(self.header.content_type()));
        }
        let Body::Text(raw) = &self.body else {
            return Err(MimeError::BodyMismatch {
                content_type: self.header.content_type(),
                body: self.body.kind_name(),
            });
        };

        let decoded = transfer::decoder(raw, &self.header.transfer_encoding());
        if self.header.major_type() != "text" {
            return Ok(DecodedBody::Binary(decoded));
        }

        let utf8 = BufReader::new(charsets.reader(&self.header.charset(), decoded)?);
        let mut lines: Lines<'_> = Box::new(TextLines::new(utf8));
        if self.header.minor_type() == "plain" {
            let params = self.header.params();
            let flag = |name: &str| {
                params
                    .get(name)
                    .map(|v| v.trim().to_ascii_lowercase())
                    .unwrap_or_default()
            };
            if flag("format") == "flowed" {
                lines = Box::new(FlowedText::new(lines, flag("delsp") == "yes"));
            }
        }
        Ok(DecodedBody::Text(TextBody::new(Box::new(
            CollapseBlankLines::new(lines),
        ))))
    }
}
