//! Multipart body framing (RFC 2046 §5.1).
//!
//! The body is read line by line. Everything before the first delimiter is
//! the preamble, the bytes between two delimiters are one child part, and
//! everything after the closing delimiter is the postamble. All three are
//! kept verbatim so the body can be written back unchanged.

use std::io::BufRead;

use tracing::debug;

use super::part::read_part;
use crate::error::{FramingError, Result};
use crate::model::header::Header;
use crate::model::Multipart;

/// What a scanned line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Next,
    Final,
}

/// Splits a multipart body on one boundary token.
struct BoundaryScanner<'b> {
    boundary: &'b [u8],
    line: Vec<u8>,
}

impl<'b> BoundaryScanner<'b> {
    fn new(boundary: &'b str) -> Self {
        Self {
            boundary: boundary.as_bytes(),
            line: Vec::with_capacity(256),
        }
    }

    /// Read up to the next delimiter line, returning the bytes before it.
    ///
    /// The delimiter line itself is consumed. Running out of input first is
    /// [`FramingError::Truncated`].
    fn read_until_delimiter(&mut self, r: &mut dyn BufRead) -> Result<(Vec<u8>, Delimiter)> {
        let mut content = Vec::new();
        loop {
            self.line.clear();
            if r.read_until(b'\n', &mut self.line)? == 0 {
                return Err(FramingError::Truncated.into());
            }
            if let Some(delimiter) = self.match_delimiter() {
                return Ok((content, delimiter));
            }
            content.extend_from_slice(&self.line);
        }
    }

    /// Whether the current line is `--boundary` or `--boundary--`, followed
    /// only by linear whitespace and the line ending.
    fn match_delimiter(&self) -> Option<Delimiter> {
        let rest = self.line.strip_prefix(b"--")?.strip_prefix(self.boundary)?;
        let (rest, delimiter) = match rest.strip_prefix(b"--") {
            Some(after) => (after, Delimiter::Final),
            None => (rest, Delimiter::Next),
        };
        let rest = rest.strip_suffix(b"\n").unwrap_or(rest);
        rest.iter()
            .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\x0b' | b'\x0c'))
            .then_some(delimiter)
    }
}

/// Read the body of a `multipart/*` part whose header has just been read.
///
/// Each child is parsed with `header` as its context, so the children of a
/// `multipart/digest` default to `message/rfc822`.
pub fn read_multipart(r: &mut dyn BufRead, header: &Header) -> Result<Multipart> {
    if header.field("Content-Type").is_none() {
        return Err(FramingError::MissingContentType.into());
    }
    let boundary = header
        .params()
        .remove("boundary")
        .filter(|b| !b.is_empty())
        .ok_or(FramingError::MissingBoundary)?;

    let mut scanner = BoundaryScanner::new(&boundary);
    let (preamble, delimiter) = scanner.read_until_delimiter(r)?;
    if delimiter == Delimiter::Final {
        return Err(FramingError::FinalBeforeFirst.into());
    }

    let mut parts = Vec::new();
    loop {
        let (content, delimiter) = scanner.read_until_delimiter(r)?;
        parts.push(read_part(&mut content.as_slice(), Some(header))?);
        if delimiter == Delimiter::Final {
            break;
        }
    }

    let mut postamble = Vec::new();
    r.read_to_end(&mut postamble)?;

    debug!(
        boundary = %boundary,
        children = parts.len(),
        "Parsed multipart body"
    );
    Ok(Multipart {
        preamble,
        parts,
        postamble,
    })
}
