//! `mimetree`: parse RFC 5322 / MIME messages into a structural tree.
//!
//! A message is read once, forward-only, into a tree of [`model::Part`]s.
//! Leaf bodies are kept undecoded so that [`writer`] can re-emit the original
//! wire bytes; [`decode`] turns a leaf body into text on demand.

pub mod config;
pub mod decode;
pub mod error;
pub mod model;
pub mod parser;
pub mod writer;

pub use error::{FramingError, MimeError, Result};
pub use model::{Address, Body, DeliveryStatus, Field, Header, Message, Multipart, Part};
