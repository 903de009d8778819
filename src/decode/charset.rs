//! Charset label resolution and streaming conversion to UTF-8.

use std::io::{self, BufRead, Read};

use encoding_rs::{Decoder, Encoding};

use crate::error::{MimeError, Result};

/// Labels seen in the wild that are rewritten before the registry lookup.
pub const CHARSET_ALIASES: &[(&str, &str)] = &[
    ("ascii", "us-ascii"),
    ("us_ascii", "us-ascii"),
    ("utf8", "utf-8"),
    ("utf_8", "utf-8"),
    ("latin1", "iso-8859-1"),
    ("latin-1", "iso-8859-1"),
    ("iso8859-1", "iso-8859-1"),
    ("iso8859-15", "iso-8859-15"),
    ("cp1252", "windows-1252"),
    ("win-1252", "windows-1252"),
];

/// Maps charset labels to encodings.
///
/// The alias table is plain data owned by the registry; the default one
/// uses [`CHARSET_ALIASES`].
#[derive(Debug, Clone, Copy)]
pub struct CharsetRegistry {
    aliases: &'static [(&'static str, &'static str)],
}

impl Default for CharsetRegistry {
    fn default() -> Self {
        Self::new(CHARSET_ALIASES)
    }
}

impl CharsetRegistry {
    pub fn new(aliases: &'static [(&'static str, &'static str)]) -> Self {
        Self { aliases }
    }

    /// Lower-case and trim a label, then apply the alias table.
    pub fn normalize(&self, label: &str) -> String {
        let label = label.trim().to_ascii_lowercase();
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == label)
            .map_or(label, |(_, canonical)| (*canonical).to_string())
    }

    /// Find the encoding for a label.
    pub fn resolve(&self, label: &str) -> Result<&'static Encoding> {
        let normalized = self.normalize(label);
        Encoding::for_label(normalized.as_bytes()).ok_or_else(|| MimeError::Charset(normalized))
    }

    /// Wrap `inner` so that it yields UTF-8 decoded from `label`.
    pub fn reader<R: BufRead>(&self, label: &str, inner: R) -> Result<CharsetReader<R>> {
        Ok(CharsetReader::new(self.resolve(label)?, inner))
    }
}

/// Converts a byte stream in some encoding into UTF-8, one buffer at a time.
///
/// Malformed sequences become U+FFFD.
pub struct CharsetReader<R> {
    inner: R,
    decoder: Decoder,
    out: String,
    pos: usize,
    finished: bool,
}

impl<R: BufRead> CharsetReader<R> {
    pub fn new(encoding: &'static Encoding, inner: R) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder_with_bom_removal(),
            out: String::new(),
            pos: 0,
            finished: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        self.out.clear();
        self.pos = 0;
        let input = self.inner.fill_buf()?;
        let last = input.is_empty();
        let needed = self
            .decoder
            .max_utf8_buffer_length(input.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "charset buffer overflow"))?;
        self.out.reserve(needed);
        let (_, read, _) = self.decoder.decode_to_string(input, &mut self.out, last);
        self.inner.consume(read);
        self.finished = last;
        Ok(())
    }
}

impl<R: BufRead> Read for CharsetReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.out.len() {
            if self.finished {
                return Ok(0);
            }
            self.fill()?;
        }
        let pending = &self.out.as_bytes()[self.pos..];
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        self.pos += n;
        Ok(n)
    }
}
