//! CIDR entry matching.

use crate::address::Address;
use crate::entry::Entry;

/// Check whether `address` falls inside `entry`.
///
/// Addresses and entries of different families never match. A network entry
/// matches when the top `prefix_len` bits agree; its prefix is clamped to the
/// family width.
///
/// # Examples
/// ```
/// use ipacl::{address, entry::Entry, matcher::matches};
/// let net = Entry::parse("10.0.0.0/8").unwrap();
/// assert!(matches(address::parse("10.1.2.3").unwrap(), &net));
/// assert!(!matches(address::parse("11.0.0.1").unwrap(), &net));
/// ```
pub fn matches(address: Address, entry: &Entry) -> bool {
    if address.family() != entry.family() {
        return false;
    }
    match entry {
        Entry::Literal(literal) => address == *literal,
        Entry::Network { base, prefix_len } => {
            let mask = address.family().prefix_mask(*prefix_len);
            address.bits() & mask == base.bits() & mask
        }
    }
}

/// Check whether `address` matches any of `entries`. An empty list never matches.
pub fn matches_any(address: Address, entries: &[Entry]) -> bool {
    entries.iter().any(|entry| matches(address, entry))
}

/// First entry matching `address`, in list order.
pub fn first_match(address: Address, entries: &[Entry]) -> Option<&Entry> {
    entries.iter().find(|entry| matches(address, entry))
}
