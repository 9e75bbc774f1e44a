//! Error types for ipacl.

use thiserror::Error;

/// Syntax errors raised while parsing an address literal or CIDR entry.
///
/// Every variant carries the offending text so an editor can tell the
/// operator exactly what to fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty address")]
    Empty,

    #[error("invalid IPv4 address '{0}': expected 4 dot-separated octets")]
    Ipv4OctetCount(String),

    #[error("invalid IPv4 octet '{octet}' in '{input}': expected decimal digits")]
    Ipv4Octet { input: String, octet: String },

    #[error("IPv4 octet '{octet}' in '{input}' is out of range (0-255)")]
    Ipv4OctetRange { input: String, octet: String },

    #[error("invalid IPv6 address '{0}': wrong number of groups")]
    Ipv6GroupCount(String),

    #[error("invalid IPv6 group '{group}' in '{input}': expected 1-4 hex digits")]
    Ipv6Group { input: String, group: String },

    #[error("invalid IPv6 address '{0}': '::' may appear only once")]
    Ipv6MultipleCompression(String),

    #[error("invalid prefix length '{prefix}' in '{input}'")]
    Prefix { input: String, prefix: String },

    #[error("prefix length /{prefix} in '{input}' exceeds /{max}")]
    PrefixRange { input: String, prefix: u32, max: u8 },
}

/// An entry of a textual policy list that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{list} entry #{} '{literal}': {source}", .index + 1)]
pub struct EntryError {
    /// Which list the entry belongs to (whitelist, blacklist, trusted_proxies)
    pub list: String,
    /// Zero-based position in the list
    pub index: usize,
    /// The literal as it was submitted
    pub literal: String,
    #[source]
    pub source: ParseError,
}

/// All entry failures of one policy, collected rather than stopping at the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} invalid {}: {}", .0.len(), entries_noun(.0), join_errors(.0))]
pub struct PolicyErrors(pub Vec<EntryError>);

fn entries_noun(errors: &[EntryError]) -> &'static str {
    if errors.len() == 1 {
        "entry"
    } else {
        "entries"
    }
}

fn join_errors(errors: &[EntryError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum AclError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid policy for '{resource}': {errors}")]
    InvalidPolicy {
        resource: String,
        errors: PolicyErrors,
    },

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
