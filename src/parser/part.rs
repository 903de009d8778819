//! Recursive construction of the part tree.

use std::io::{BufRead, BufReader, Read};

use super::header::{read_header, HeaderEnd};
use super::multipart::read_multipart;
use crate::error::Result;
use crate::model::header::{Header, MESSAGE_RFC822, TEXT_PLAIN};
use crate::model::{Body, BodyKind, DeliveryStatus, Message, Part};

/// Read one part: its header, then a body shaped by the content type.
///
/// `parent` is the header of the enclosing multipart, if any. It decides the
/// default content type (`message/rfc822` inside a `multipart/digest`).
/// A part inside a multipart must have a header terminated by a blank line;
/// a top-level part may also end right after its last field.
pub fn read_part(r: &mut dyn BufRead, parent: Option<&Header>) -> Result<Part> {
    let (default_type, end) = match parent {
        Some(parent) if parent.content_type() == "multipart/digest" => {
            (MESSAGE_RFC822, HeaderEnd::BlankLine)
        }
        Some(_) => (TEXT_PLAIN, HeaderEnd::BlankLine),
        None => (TEXT_PLAIN, HeaderEnd::BlankLineOrEof),
    };
    let header = read_header(r, default_type, end)?;
    let body = read_body(r, &header)?;
    Ok(Part { header, body })
}

/// Read the rest of `r` as the body described by `header`.
pub fn read_body(r: &mut dyn BufRead, header: &Header) -> Result<Body> {
    let body = match BodyKind::of(header)? {
        BodyKind::Message => Body::NestedMessage(Box::new(read_message(r)?)),
        BodyKind::DeliveryStatus => Body::DeliveryStatus(read_delivery_status(r)?),
        BodyKind::Multipart => Body::Multipart(read_multipart(r, header)?),
        BodyKind::Leaf => {
            let mut raw = Vec::new();
            r.read_to_end(&mut raw)?;
            Body::Text(raw)
        }
    };
    Ok(body)
}

/// Read a complete message from `r`.
pub fn read_message(r: &mut dyn BufRead) -> Result<Message> {
    read_part(r, None).map(Message)
}

/// One per-message field block, then per-recipient blocks until the input
/// ends or a block comes back empty (RFC 3464 §2.1).
fn read_delivery_status(r: &mut dyn BufRead) -> Result<DeliveryStatus> {
    let message = read_header(r, TEXT_PLAIN, HeaderEnd::BlankLineOrEof)?;
    let mut recipients = Vec::new();
    loop {
        let block = read_header(r, TEXT_PLAIN, HeaderEnd::BlankLineOrEof)?;
        if block.is_empty() {
            break;
        }
        recipients.push(block);
    }
    Ok(DeliveryStatus {
        message,
        recipients,
    })
}

impl Message {
    /// Parse a message from any byte source.
    pub fn parse<R: Read>(source: R) -> Result<Self> {
        let mut reader = BufReader::new(source);
        read_message(&mut reader)
    }

    /// Parse a message held in memory.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        read_message(&mut &bytes[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MimeError;

    #[test]
    fn test_simple_message() {
        let msg = Message::parse_bytes(b"From: foo\nTo: bar\n\nhello\n").unwrap();
        assert_eq!(msg.header.fields.len(), 2);
        assert_eq!(msg.body, Body::Text(b"hello\n".to_vec()));
    }

    #[test]
    fn test_header_only_message() {
        let msg = Message::parse_bytes(b"Subject: x\n").unwrap();
        assert_eq!(msg.header.subject(), "x");
        assert_eq!(msg.body, Body::Text(Vec::new()));
    }

    #[test]
    fn test_parse_from_reader() {
        let msg = Message::parse(&b"Subject: hi\n\nbody"[..]).unwrap();
        assert_eq!(msg.raw_len(), Some(4));
    }

    #[test]
    fn test_nested_message() {
        let msg = Message::parse_bytes(
            b"Content-Type: message/rfc822\n\nSubject: inner\n\ninner body\n",
        )
        .unwrap();
        let Body::NestedMessage(inner) = &msg.body else {
            panic!("expected nested message");
        };
        assert_eq!(inner.header.subject(), "inner");
        assert_eq!(inner.body, Body::Text(b"inner body\n".to_vec()));
    }

    #[test]
    fn test_delivery_status() {
        let raw = b"Content-Type: message/delivery-status\n\n\
Reporting-MTA: dns; mx.example.com\n\n\
Final-Recipient: rfc822; a@example.com\nAction: failed\n\n\
Final-Recipient: rfc822; b@example.com\nAction: delayed\n";
        let msg = Message::parse_bytes(raw).unwrap();
        let Body::DeliveryStatus(ds) = &msg.body else {
            panic!("expected delivery status");
        };
        assert_eq!(ds.message.get("Reporting-MTA").unwrap(), "dns; mx.example.com");
        assert_eq!(ds.recipients.len(), 2);
        assert_eq!(ds.recipients[1].get("action").unwrap(), "delayed");
    }

    #[test]
    fn test_delivery_status_stops_at_empty_block() {
        let raw = b"Content-Type: message/delivery-status\n\nX: 1\n\nY: 2\n\n\n";
        let msg = Message::parse_bytes(raw).unwrap();
        let Body::DeliveryStatus(ds) = &msg.body else {
            panic!("expected delivery status");
        };
        assert_eq!(ds.recipients.len(), 1);
    }

    #[test]
    fn test_unimplemented_and_unknown_subtypes() {
        let err = Message::parse_bytes(b"Content-Type: message/partial; id=x\n\n").unwrap_err();
        assert!(matches!(err, MimeError::Unimplemented(_)));
        let err = Message::parse_bytes(b"Content-Type: message/weird\n\n").unwrap_err();
        assert!(matches!(err, MimeError::UnknownSubtype(_)));
    }
}
