//! Policy list entries: a literal address or a CIDR network.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address::{self, parse_decimal, Address, AddressFamily};
use crate::error::ParseError;

/// One whitelist, blacklist or trusted-proxy entry.
///
/// `Network` keeps the base address as written (`10.1.2.3/8` is not
/// rewritten to `10.0.0.0/8`); host bits are ignored when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Entry {
    Literal(Address),
    Network { base: Address, prefix_len: u8 },
}

impl Entry {
    pub fn literal(address: Address) -> Self {
        Entry::Literal(address)
    }

    /// Build a network entry, rejecting prefixes wider than the family.
    pub fn network(base: Address, prefix_len: u8) -> Result<Self, ParseError> {
        let max = base.family().width();
        if prefix_len > max {
            return Err(ParseError::PrefixRange {
                input: format!("{}/{}", base, prefix_len),
                prefix: u32::from(prefix_len),
                max,
            });
        }
        Ok(Entry::Network { base, prefix_len })
    }

    /// Parse `address` or `address/prefix`.
    ///
    /// # Examples
    /// ```
    /// use ipacl::entry::Entry;
    /// assert!(Entry::parse("10.0.0.0/8").is_ok());
    /// assert!(Entry::parse("2001:db8::1").is_ok());
    /// assert!(Entry::parse("10.0.0.0/33").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let Some((addr, prefix)) = text.split_once('/') else {
            return address::parse(text).map(Entry::Literal);
        };

        let base = address::parse(addr)?;
        let max = base.family().width();
        match parse_decimal(prefix) {
            None => Err(ParseError::Prefix {
                input: text.to_string(),
                prefix: prefix.to_string(),
            }),
            Some(Some(len)) if len <= u32::from(max) => Ok(Entry::Network {
                base,
                prefix_len: len as u8,
            }),
            Some(len) => Err(ParseError::PrefixRange {
                input: text.to_string(),
                prefix: len.unwrap_or(u32::MAX),
                max,
            }),
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.base().family()
    }

    /// The address as written in the entry.
    pub fn base(&self) -> Address {
        match self {
            Entry::Literal(addr) => *addr,
            Entry::Network { base, .. } => *base,
        }
    }

    /// Prefix length; a literal behaves like a full-width network.
    ///
    /// Never exceeds the family width, even for a `Network` built directly
    /// with a larger value.
    pub fn prefix_len(&self) -> u8 {
        match self {
            Entry::Literal(addr) => addr.family().width(),
            Entry::Network { base, prefix_len } => (*prefix_len).min(base.family().width()),
        }
    }

    /// The base address with host bits cleared.
    pub fn network_address(&self) -> Address {
        self.base().truncate(self.prefix_len())
    }

    pub fn to_ipnet(&self) -> IpNet {
        let prefix_len = self.prefix_len();
        match self.base().to_ip_addr() {
            std::net::IpAddr::V4(ip) => Ipv4Net::new(ip, prefix_len)
                .map(IpNet::V4)
                .unwrap_or_else(|_| IpNet::from(std::net::IpAddr::V4(ip))),
            std::net::IpAddr::V6(ip) => Ipv6Net::new(ip, prefix_len)
                .map(IpNet::V6)
                .unwrap_or_else(|_| IpNet::from(std::net::IpAddr::V6(ip))),
        }
    }
}

impl FromStr for Entry {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entry::parse(s)
    }
}

impl TryFrom<String> for Entry {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Entry::parse(&value)
    }
}

impl From<Entry> for String {
    fn from(entry: Entry) -> Self {
        entry.to_string()
    }
}

impl From<Address> for Entry {
    fn from(address: Address) -> Self {
        Entry::Literal(address)
    }
}

impl From<IpNet> for Entry {
    fn from(net: IpNet) -> Self {
        Entry::Network {
            base: Address::from(net.addr()),
            prefix_len: net.prefix_len(),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Literal(addr) => write!(f, "{}", addr),
            Entry::Network { base, prefix_len } => write!(f, "{}/{}", base, prefix_len),
        }
    }
}
