//! Content-Transfer-Encoding removal as streaming readers.

use std::io::{self, BufRead, BufReader, Read};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::read::DecoderReader;

/// Standard-alphabet base64 that tolerates missing padding and stray trailing bits.
pub static BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Wrap `raw` in a reader that removes the named transfer encoding.
///
/// `quoted-printable` and `base64` are decoded; anything else (`7bit`,
/// `8bit`, `binary`, unknown tokens) passes through unchanged.
pub fn decoder<'a>(raw: &'a [u8], encoding: &str) -> Box<dyn BufRead + 'a> {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "quoted-printable" => Box::new(BufReader::new(QuotedPrintableReader::new(raw))),
        "base64" => Box::new(BufReader::new(DecoderReader::new(
            SkipWhitespace::new(raw),
            &BASE64_LENIENT,
        ))),
        _ => Box::new(raw),
    }
}

/// Drops ASCII whitespace so that line-wrapped base64 can be fed to a strict decoder.
struct SkipWhitespace<R> {
    inner: R,
}

impl<R> SkipWhitespace<R> {
    fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for SkipWhitespace<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let b = buf[i];
                if !b.is_ascii_whitespace() {
                    buf[kept] = b;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

/// Decodes quoted-printable one encoded line at a time.
///
/// Soft line breaks (`=` at end of line) join lines; hard line breaks come
/// out as a bare `\n`.
struct QuotedPrintableReader<R> {
    inner: R,
    line: Vec<u8>,
    out: Vec<u8>,
    pos: usize,
}

impl<R> QuotedPrintableReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            line: Vec::new(),
            out: Vec::new(),
            pos: 0,
        }
    }
}

impl<R: BufRead> Read for QuotedPrintableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.out.len() {
            self.line.clear();
            if self.inner.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(0);
            }
            self.decode_line()?;
        }
        let pending = &self.out[self.pos..];
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl<R> QuotedPrintableReader<R> {
    fn decode_line(&mut self) -> io::Result<()> {
        let mut content = self.line.as_slice();
        let hard_break = content.ends_with(b"\n");
        if let Some(rest) = content.strip_suffix(b"\n") {
            content = rest.strip_suffix(b"\r").unwrap_or(rest);
        }
        // Trailing whitespace is transport padding (RFC 2045 §6.7 rule 3)
        while let [rest @ .., b' ' | b'\t'] = content {
            content = rest;
        }
        let (content, soft_break) = match content.strip_suffix(b"=") {
            Some(rest) => (rest, true),
            None => (content, false),
        };
        // Whitespace before a soft break is literal; the codec would trim it
        let literal_tail = content
            .iter()
            .rev()
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count();
        let (encoded, tail) = content.split_at(content.len() - literal_tail);
        self.out = quoted_printable::decode(encoded, quoted_printable::ParseMode::Robust)
            .map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("quoted-printable: {e:?}"))
            })?;
        self.out.extend_from_slice(tail);
        if hard_break && !soft_break {
            self.out.push(b'\n');
        }
        self.pos = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(raw: &[u8], encoding: &str) -> Vec<u8> {
        let mut out = Vec::new();
        decoder(raw, encoding).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_identity_encodings() {
        assert_eq!(decode_all(b"plain\n", "7bit"), b"plain\n");
        assert_eq!(decode_all(b"plain\n", "8bit"), b"plain\n");
        assert_eq!(decode_all(b"=41\n", "x-unknown"), b"=41\n");
    }

    #[test]
    fn test_base64_with_line_breaks() {
        let raw = b"SGVsbG8s\r\nIHdvcmxk\r\nIQ==\r\n";
        assert_eq!(decode_all(raw, "base64"), b"Hello, world!");
        assert_eq!(decode_all(raw, " Base64 "), b"Hello, world!");
    }

    #[test]
    fn test_base64_without_padding() {
        assert_eq!(decode_all(b"SGk", "base64"), b"Hi");
    }

    #[test]
    fn test_base64_garbage_is_error() {
        let mut out = Vec::new();
        let result = decoder(b"!!!!", "base64").read_to_end(&mut out);
        assert!(result.is_err());
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let raw = b"caf=C3=A9 au =\nlait\n";
        let out = decode_all(raw, "quoted-printable");
        assert_eq!(String::from_utf8(out).unwrap(), "café au lait\n");
    }

    #[test]
    fn test_quoted_printable_hard_breaks_and_padding() {
        let raw = b"line one  \r\nline=20two\r\nlast";
        let out = decode_all(raw, "quoted-printable");
        assert_eq!(out, b"line one\nline two\nlast");
    }
}
