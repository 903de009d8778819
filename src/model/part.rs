//! The part tree: a header plus a body whose shape follows the content type.

use std::ops::Deref;

use serde::{Serialize, Serializer};

use super::header::Header;
use crate::error::{MimeError, Result};

/// A message part, consisting of a header and a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    pub header: Header,
    pub body: Body,
}

/// A part that can serve as a top-level e-mail message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Message(pub Part);

/// The body of a part. The variant is fixed at parse time by the content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Body {
    /// An opaque leaf body, still transfer-encoded.
    Text(#[serde(serialize_with = "lossy")] Vec<u8>),
    /// A `message/rfc822` or `message/news` body.
    NestedMessage(Box<Message>),
    /// A `message/delivery-status` body.
    DeliveryStatus(DeliveryStatus),
    /// A `multipart/*` body.
    Multipart(Multipart),
}

/// The body of a `multipart/*` part.
///
/// The boundary is not stored; it is taken from the owning header when the
/// part is written out again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Multipart {
    #[serde(serialize_with = "lossy")]
    pub preamble: Vec<u8>,
    pub parts: Vec<Part>,
    #[serde(serialize_with = "lossy")]
    pub postamble: Vec<u8>,
}

/// A parsed `message/delivery-status` body (RFC 3464): one per-message
/// field block followed by per-recipient field blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryStatus {
    pub message: Header,
    pub recipients: Vec<Header>,
}

/// How a body is read and written, as chosen by the content type.
///
/// The parser and the writer both dispatch through [`BodyKind::of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Leaf,
    Message,
    DeliveryStatus,
    Multipart,
}

impl BodyKind {
    /// Classify a header's content type.
    pub fn of(header: &Header) -> Result<Self> {
        let major = header.major_type();
        let minor = header.minor_type();
        match major.as_str() {
            "multipart" => Ok(Self::Multipart),
            "message" => match minor.as_str() {
                // message/news is message/rfc822 per RFC 5537
                "rfc822" | "news" => Ok(Self::Message),
                "delivery-status" => Ok(Self::DeliveryStatus),
                "external-body" | "partial" => {
                    Err(MimeError::Unimplemented(header.content_type()))
                }
                _ => Err(MimeError::UnknownSubtype(minor)),
            },
            _ => Ok(Self::Leaf),
        }
    }
}

impl Body {
    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::NestedMessage(_) => "message",
            Self::DeliveryStatus(_) => "delivery-status",
            Self::Multipart(_) => "multipart",
        }
    }
}

impl Part {
    /// `true` when the part is neither `multipart/*` nor `message/*`.
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self.header.major_type().as_str(),
            "multipart" | "message"
        )
    }

    /// Child parts of a multipart body; empty for any other body.
    pub fn children(&self) -> &[Part] {
        match &self.body {
            Body::Multipart(multipart) => &multipart.parts,
            _ => &[],
        }
    }

    /// Find a descendant by 1-based child indices.
    ///
    /// An empty path addresses `self`. A nested message is transparent: the
    /// path continues into the enclosed message's own body.
    pub fn find(&self, path: &[usize]) -> Option<&Part> {
        let Some((&index, rest)) = path.split_first() else {
            return Some(self);
        };
        match &self.body {
            Body::Multipart(multipart) => multipart.parts.get(index.checked_sub(1)?)?.find(rest),
            Body::NestedMessage(message) => message.0.find(path),
            _ => None,
        }
    }

    /// The part itself, or for a nested message the innermost enclosed part.
    ///
    /// Lets a path that stops at a `message/rfc822` wrapper reach the
    /// enclosed message when that message has a leaf body.
    pub fn enclosed(&self) -> &Part {
        let mut part = self;
        while let Body::NestedMessage(message) = &part.body {
            part = &message.0;
        }
        part
    }

    /// Length of the stored leaf body in bytes, if this is a leaf.
    pub fn raw_len(&self) -> Option<usize> {
        match &self.body {
            Body::Text(raw) => Some(raw.len()),
            _ => None,
        }
    }
}

impl Deref for Message {
    type Target = Part;

    fn deref(&self) -> &Part {
        &self.0
    }
}

impl From<Part> for Message {
    fn from(part: Part) -> Self {
        Self(part)
    }
}

/// Parse a dotted part path such as `1.2.3`.
pub fn parse_path(path: &str) -> Option<Vec<usize>> {
    if path.trim().is_empty() {
        return Some(Vec::new());
    }
    path.split('.')
        .map(|segment| segment.trim().parse::<usize>().ok().filter(|&n| n > 0))
        .collect()
}

fn lossy<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::header::{MESSAGE_RFC822, TEXT_PLAIN};

    fn typed(content_type: &str) -> Header {
        let mut h = Header::new(TEXT_PLAIN);
        h.push_field("Content-Type", format!(" {content_type}"));
        h
    }

    fn leaf(text: &str) -> Part {
        Part {
            header: Header::new(TEXT_PLAIN),
            body: Body::Text(text.as_bytes().to_vec()),
        }
    }

    #[test]
    fn test_body_kind_dispatch() {
        assert_eq!(BodyKind::of(&Header::new(TEXT_PLAIN)).unwrap(), BodyKind::Leaf);
        assert_eq!(
            BodyKind::of(&Header::new(MESSAGE_RFC822)).unwrap(),
            BodyKind::Message
        );
        assert_eq!(BodyKind::of(&typed("message/news")).unwrap(), BodyKind::Message);
        assert_eq!(
            BodyKind::of(&typed("message/delivery-status")).unwrap(),
            BodyKind::DeliveryStatus
        );
        assert_eq!(
            BodyKind::of(&typed("multipart/alternative; boundary=x")).unwrap(),
            BodyKind::Multipart
        );
        assert_eq!(BodyKind::of(&typed("image/png")).unwrap(), BodyKind::Leaf);
    }

    #[test]
    fn test_body_kind_errors() {
        assert!(matches!(
            BodyKind::of(&typed("message/partial; id=1")),
            Err(MimeError::Unimplemented(_))
        ));
        assert!(matches!(
            BodyKind::of(&typed("message/external-body")),
            Err(MimeError::Unimplemented(_))
        ));
        assert!(matches!(
            BodyKind::of(&typed("message/bogus")),
            Err(MimeError::UnknownSubtype(ref s)) if s == "bogus"
        ));
    }

    #[test]
    fn test_find_by_path() {
        let inner = Part {
            header: Header::new(MESSAGE_RFC822),
            body: Body::NestedMessage(Box::new(Message(Part {
                header: typed("multipart/mixed; boundary=b"),
                body: Body::Multipart(Multipart {
                    parts: vec![leaf("x"), leaf("y")],
                    ..Multipart::default()
                }),
            }))),
        };
        let root = Part {
            header: typed("multipart/mixed; boundary=a"),
            body: Body::Multipart(Multipart {
                parts: vec![leaf("first"), inner],
                ..Multipart::default()
            }),
        };

        assert_eq!(root.find(&[]).unwrap(), &root);
        assert_eq!(root.find(&[1]).unwrap().raw_len(), Some(5));
        assert_eq!(root.find(&[2, 2]).unwrap().body, Body::Text(b"y".to_vec()));
        assert!(root.find(&[3]).is_none());
        assert!(root.find(&[0]).is_none());
        assert!(root.find(&[1, 1]).is_none());
        assert_eq!(root.children().len(), 2);
        assert!(!root.is_leaf());
    }

    #[test]
    fn test_enclosed_descends_nested_messages() {
        let forwarded = Part {
            header: Header::new(MESSAGE_RFC822),
            body: Body::NestedMessage(Box::new(Message(leaf("forwarded")))),
        };
        assert_eq!(forwarded.enclosed().body, Body::Text(b"forwarded".to_vec()));
        assert!(forwarded.find(&[1]).is_none());

        let plain = leaf("plain");
        assert_eq!(plain.enclosed(), &plain);
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("1.2.3"), Some(vec![1, 2, 3]));
        assert_eq!(parse_path(""), Some(vec![]));
        assert_eq!(parse_path("1.0"), None);
        assert_eq!(parse_path("a"), None);
    }
}
