//! Core data model: fields, headers, addresses, and the part tree.

pub mod address;
pub mod field;
pub mod header;
pub mod part;

pub use address::Address;
pub use field::Field;
pub use header::Header;
pub use part::{Body, BodyKind, DeliveryStatus, Message, Multipart, Part};
