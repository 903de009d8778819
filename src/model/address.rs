//! Email addresses (RFC 5322 §3.4), produced by the address grammar.

use mailparse::{MailAddr, SingleInfo};
use serde::Serialize;

/// A parsed mailbox.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `name = Some("Juan García")`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `name = None`, `address = "user@example.com"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    /// Display name, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The bare address spec (`user@domain`).
    pub address: String,
}

impl Address {
    /// Parse a header value holding exactly one mailbox.
    ///
    /// Returns `None` when the grammar rejects the value or when it holds a
    /// list, a group, or an empty address.
    pub fn parse(raw: &str) -> Option<Self> {
        let list = mailparse::addrparse(raw).ok()?;
        if list.len() != 1 {
            return None;
        }
        match list.iter().next()? {
            MailAddr::Single(info) => Self::from_info(info),
            MailAddr::Group(_) => None,
        }
    }

    /// Parse an address list, flattening groups into their members.
    ///
    /// Returns `None` when the grammar rejects the whole value.
    pub fn parse_list(raw: &str) -> Option<Vec<Self>> {
        let list = mailparse::addrparse(raw).ok()?;
        let mut result = Vec::new();
        for addr in list.iter() {
            match addr {
                MailAddr::Single(info) => result.extend(Self::from_info(info)),
                MailAddr::Group(group) => {
                    result.extend(group.addrs.iter().filter_map(Self::from_info));
                }
            }
        }
        Some(result)
    }

    fn from_info(info: &SingleInfo) -> Option<Self> {
        let address = info.addr.trim();
        if !is_addr_spec(address) {
            return None;
        }
        let name = info
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from);
        Some(Self {
            name,
            address: address.to_string(),
        })
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{name} <{}>", self.address),
            None => self.address.clone(),
        }
    }
}

/// `local@domain` with both sides non-empty and no whitespace.
fn is_addr_spec(address: &str) -> bool {
    match address.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !address.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
