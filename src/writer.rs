//! Re-emit a part tree as wire bytes.
//!
//! The writer works from the tree alone. Leaf bodies, preambles, postambles
//! and header value lines are written exactly as they were read; multipart
//! delimiters are rebuilt from the boundary parameter of the owning header.
//!
//! Every stored value line of a field is written as `Name:line`, including
//! continuation lines. A folded header therefore comes back unfolded into
//! repeated fields rather than byte-for-byte.

use std::io::Write;

use crate::error::{MimeError, Result};
use crate::model::{Body, BodyKind, DeliveryStatus, Field, Header, Message, Multipart, Part};

/// Boundary used when a multipart header has no `boundary` parameter.
pub const PLACEHOLDER_BOUNDARY: &str = "x";

impl Field {
    pub fn write_to(&self, w: &mut dyn Write) -> Result<()> {
        for line in &self.values {
            writeln!(w, "{}:{}", self.name, line)?;
        }
        Ok(())
    }
}

impl Header {
    /// Write every field followed by the blank line that ends the header.
    pub fn write_to(&self, w: &mut dyn Write) -> Result<()> {
        for field in &self.fields {
            field.write_to(w)?;
        }
        w.write_all(b"\n")?;
        Ok(())
    }
}

impl DeliveryStatus {
    pub fn write_to(&self, w: &mut dyn Write) -> Result<()> {
        self.message.write_to(w)?;
        for recipient in &self.recipients {
            recipient.write_to(w)?;
        }
        Ok(())
    }
}

impl Part {
    /// Write the header and then the body, dispatching on the content type.
    ///
    /// A body variant that does not match the content type is
    /// [`MimeError::BodyMismatch`]; a `message/*` subtype with no structured
    /// body form is [`MimeError::Unimplemented`].
    pub fn write_to(&self, w: &mut dyn Write) -> Result<()> {
        self.header.write_to(w)?;
        let kind = BodyKind::of(&self.header).map_err(|e| match e {
            MimeError::UnknownSubtype(_) => MimeError::Unimplemented(self.header.content_type()),
            other => other,
        })?;
        match (kind, &self.body) {
            (BodyKind::Leaf, Body::Text(raw)) => w.write_all(raw)?,
            (BodyKind::Message, Body::NestedMessage(message)) => message.write_to(w)?,
            (BodyKind::DeliveryStatus, Body::DeliveryStatus(ds)) => ds.write_to(w)?,
            (BodyKind::Multipart, Body::Multipart(multipart)) => {
                let boundary = self.header.params().remove("boundary");
                let boundary = boundary
                    .as_deref()
                    .filter(|b| !b.is_empty())
                    .unwrap_or(PLACEHOLDER_BOUNDARY);
                write_multipart(w, multipart, boundary)?;
            }
            (_, body) => {
                return Err(MimeError::BodyMismatch {
                    content_type: self.header.content_type(),
                    body: body.kind_name(),
                })
            }
        }
        Ok(())
    }

    /// The wire form of this part.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

impl Message {
    pub fn write_to(&self, w: &mut dyn Write) -> Result<()> {
        self.0.write_to(w)
    }
}

fn write_multipart(w: &mut dyn Write, multipart: &Multipart, boundary: &str) -> Result<()> {
    w.write_all(&multipart.preamble)?;
    for part in &multipart.parts {
        writeln!(w, "--{boundary}")?;
        part.write_to(w)?;
    }
    writeln!(w, "--{boundary}--")?;
    w.write_all(&multipart.postamble)?;
    Ok(())
}
