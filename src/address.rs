//! Address parsing and normalization.
//!
//! Literals are folded into fixed-width integers at parse time, so two
//! spellings of the same IPv6 address (`2001:db8::1` and
//! `2001:0DB8:0:0:0:0:0:1`) produce equal [`Address`] values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::ParseError;

const IPV6_GROUPS: usize = 8;

/// Address family of an [`Address`] or entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Width of the family in bits (32 or 128).
    pub const fn width(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }

    /// All bits of the family set.
    pub const fn all_ones(self) -> u128 {
        match self {
            AddressFamily::V4 => u32::MAX as u128,
            AddressFamily::V6 => u128::MAX,
        }
    }

    /// Mask keeping the top `prefix_len` bits of an address of this family.
    ///
    /// `prefix_len` is clamped to the family width, so `/0` yields an empty
    /// mask and anything at or above the width yields [`Self::all_ones`].
    pub fn prefix_mask(self, prefix_len: u8) -> u128 {
        let width = self.width();
        let mask_width = width - prefix_len.min(width);
        // Shifting by the full 128 bits overflows; the mask is empty then.
        self.all_ones()
            .checked_shl(u32::from(mask_width))
            .unwrap_or(0)
            & self.all_ones()
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// A parsed IPv4 or IPv6 address.
///
/// IPv4 addresses occupy the low 32 bits of `bits`. Equality is bitwise
/// within the family; an IPv4 address never equals an IPv6 one, including
/// its IPv4-mapped form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    family: AddressFamily,
    bits: u128,
}

impl Address {
    pub const fn v4(bits: u32) -> Self {
        Self {
            family: AddressFamily::V4,
            bits: bits as u128,
        }
    }

    pub const fn v6(bits: u128) -> Self {
        Self {
            family: AddressFamily::V6,
            bits,
        }
    }

    pub const fn family(&self) -> AddressFamily {
        self.family
    }

    pub const fn bits(&self) -> u128 {
        self.bits
    }

    pub const fn is_ipv4(&self) -> bool {
        matches!(self.family, AddressFamily::V4)
    }

    pub const fn is_ipv6(&self) -> bool {
        matches!(self.family, AddressFamily::V6)
    }

    /// Keep only the top `prefix_len` bits.
    pub fn truncate(&self, prefix_len: u8) -> Self {
        Self {
            family: self.family,
            bits: self.bits & self.family.prefix_mask(prefix_len),
        }
    }

    pub fn to_ip_addr(&self) -> IpAddr {
        match self.family {
            // Low 32 bits only, guaranteed by the constructors.
            AddressFamily::V4 => IpAddr::V4(Ipv4Addr::from(self.bits as u32)),
            AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(self.bits)),
        }
    }
}

/// Parse an IPv4 or IPv6 literal.
///
/// Anything containing a colon is treated as IPv6. The input must be the
/// bare literal: no surrounding whitespace, brackets, zone id or prefix.
/// IPv6 groups are hex only; a dotted IPv4 tail (`::ffff:192.0.2.1`) is
/// rejected.
///
/// # Examples
/// ```
/// use ipacl::address::{parse, AddressFamily};
/// let addr = parse("2001:DB8::1").unwrap();
/// assert_eq!(addr.family(), AddressFamily::V6);
/// assert_eq!(addr, parse("2001:db8:0:0:0:0:0:1").unwrap());
/// assert!(parse("10.0.0.256").is_err());
/// ```
pub fn parse(text: &str) -> Result<Address, ParseError> {
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    if text.contains(':') {
        parse_v6(text).map(Address::v6)
    } else {
        parse_v4(text).map(Address::v4)
    }
}

fn parse_v4(text: &str) -> Result<u32, ParseError> {
    let octets: Vec<&str> = text.split('.').collect();
    if octets.len() != 4 {
        return Err(ParseError::Ipv4OctetCount(text.to_string()));
    }

    octets.iter().try_fold(0u32, |acc, octet| {
        let value = parse_decimal(octet).ok_or_else(|| ParseError::Ipv4Octet {
            input: text.to_string(),
            octet: octet.to_string(),
        })?;
        match value {
            Some(v) if v <= 255 => Ok((acc << 8) | v),
            _ => Err(ParseError::Ipv4OctetRange {
                input: text.to_string(),
                octet: octet.to_string(),
            }),
        }
    })
}

/// Parse a run of ASCII decimal digits.
///
/// Returns `None` on a syntax error and `Some(None)` when the value does not
/// fit in a `u32`.
pub(crate) fn parse_decimal(digits: &str) -> Option<Option<u32>> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.bytes().try_fold(0u32, |acc, b| {
        acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
    }))
}

fn parse_v6(text: &str) -> Result<u128, ParseError> {
    let halves: Vec<&str> = text.split("::").collect();

    let groups = match halves.as_slice() {
        [all] => {
            let groups = parse_groups(text, all)?;
            if groups.len() != IPV6_GROUPS {
                return Err(ParseError::Ipv6GroupCount(text.to_string()));
            }
            groups
        }
        [head, tail] => {
            let leading = parse_groups(text, head)?;
            let trailing = parse_groups(text, tail)?;
            // `::` stands for at least one zero group.
            if leading.len() + trailing.len() >= IPV6_GROUPS {
                return Err(ParseError::Ipv6GroupCount(text.to_string()));
            }
            let omitted = IPV6_GROUPS - (leading.len() + trailing.len());
            let mut groups = leading;
            groups.extend(std::iter::repeat(0u16).take(omitted));
            groups.extend(trailing);
            groups
        }
        _ => return Err(ParseError::Ipv6MultipleCompression(text.to_string())),
    };

    Ok(groups
        .iter()
        .fold(0u128, |acc, &group| (acc << 16) | u128::from(group)))
}

fn parse_groups(input: &str, part: &str) -> Result<Vec<u16>, ParseError> {
    if part.is_empty() {
        return Ok(Vec::new());
    }
    part.split(':')
        .map(|group| {
            let valid =
                (1..=4).contains(&group.len()) && group.bytes().all(|b| b.is_ascii_hexdigit());
            valid
                .then(|| u16::from_str_radix(group, 16).ok())
                .flatten()
                .ok_or_else(|| ParseError::Ipv6Group {
                    input: input.to_string(),
                    group: group.to_string(),
                })
        })
        .collect()
}

/// RFC 5952 text: lowercase hex, the longest run of two or more zero groups
/// (leftmost on a tie) compressed to `::`, never a dotted IPv4 tail.
fn format_v6(bits: u128) -> String {
    let groups = Ipv6Addr::from(bits).segments();

    let (mut best_start, mut best_len) = (0, 0);
    let (mut run_start, mut run_len) = (0, 0);
    for (i, &group) in groups.iter().enumerate() {
        if group == 0 {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if run_len > best_len {
                (best_start, best_len) = (run_start, run_len);
            }
        } else {
            run_len = 0;
        }
    }

    let join = |groups: &[u16]| {
        groups
            .iter()
            .map(|g| format!("{:x}", g))
            .collect::<Vec<_>>()
            .join(":")
    };
    if best_len < 2 {
        join(&groups)
    } else {
        format!(
            "{}::{}",
            join(&groups[..best_start]),
            join(&groups[best_start + best_len..])
        )
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            AddressFamily::V4 => self.to_ip_addr().fmt(f),
            AddressFamily::V6 => f.pad(&format_v6(self.bits)),
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Address::v4(u32::from(v4)),
            IpAddr::V6(v6) => Address::v6(u128::from(v6)),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address::v4(u32::from(ip))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Address::v6(u128::from(ip))
    }
}

impl From<Address> for IpAddr {
    fn from(addr: Address) -> Self {
        addr.to_ip_addr()
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(serde::de::Error::custom)
    }
}
