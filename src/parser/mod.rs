//! Message parsing: header blocks, multipart framing, and the recursive part reader.

pub mod header;
pub mod multipart;
pub mod part;

pub use part::read_part;
