//! Centralized error types for mimetree.

use thiserror::Error;

/// All errors produced by the mimetree library.
#[derive(Error, Debug)]
pub enum MimeError {
    /// I/O error from the underlying byte source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header line could not be parsed, or a continuation line appeared
    /// before any field was opened.
    #[error("Bad syntax in header: {reason}")]
    HeaderSyntax { reason: String },

    /// The byte source ended in the middle of a header block.
    #[error("Unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    /// The body of a multipart part is not framed correctly.
    #[error("Multipart framing error: {0}")]
    MultipartFraming(#[from] FramingError),

    /// The content type is recognised but not supported.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// A `message/*` subtype that is not known at all.
    #[error("Unknown message subtype: {0}")]
    UnknownSubtype(String),

    /// The charset label does not resolve to a known encoding.
    #[error("Unknown charset: {0}")]
    Charset(String),

    /// Decoding was requested on a multipart or message part.
    #[error("Cannot decode the body of a non-leaf part ({0})")]
    NotLeaf(String),

    /// The body variant stored in a part disagrees with its content type.
    #[error("Content type is {content_type} but the body is {body}")]
    BodyMismatch {
        content_type: String,
        body: &'static str,
    },
}

/// Ways in which a multipart body can be malformed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// The multipart header has no `Content-Type` field.
    #[error("no Content-Type field in multipart header")]
    MissingContentType,

    /// The `Content-Type` field lacks a `boundary` parameter.
    #[error("no boundary parameter in multipart Content-Type field")]
    MissingBoundary,

    /// The closing delimiter came before any ordinary delimiter.
    #[error("final multipart boundary encountered before any others")]
    FinalBeforeFirst,

    /// The input ended before the next delimiter was found.
    #[error("input ended before the next multipart boundary")]
    Truncated,
}

/// Convenience alias for `Result<T, MimeError>`.
pub type Result<T> = std::result::Result<T, MimeError>;

impl MimeError {
    /// Create a `HeaderSyntax` variant from a reason.
    pub fn header_syntax(reason: impl Into<String>) -> Self {
        Self::HeaderSyntax {
            reason: reason.into(),
        }
    }

    /// Whether this error is a multipart framing error of the given kind.
    pub fn is_framing(&self, kind: FramingError) -> bool {
        matches!(self, Self::MultipartFraming(k) if *k == kind)
    }
}
