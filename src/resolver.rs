//! Effective client address resolution behind reverse proxies.
//!
//! Forwarding headers are only honored when the policy opts in and the
//! direct peer is a configured trusted proxy. Otherwise a client could pick
//! its own address by sending `X-Forwarded-For`.

use tracing::debug;

use crate::address::{self, Address};
use crate::entry::Entry;
use crate::matcher::matches_any;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Addresses and networks allowed to supply forwarding headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedProxySet {
    entries: Vec<Entry>,
}

impl TrustedProxySet {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn contains(&self, address: Address) -> bool {
        matches_any(address, &self.entries)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<Entry> for TrustedProxySet {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Raw forwarding header values of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedHeaders {
    pub x_forwarded_for: Option<String>,
    pub x_real_ip: Option<String>,
}

impl ForwardedHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forwarded_for(mut self, value: impl Into<String>) -> Self {
        self.x_forwarded_for = Some(value.into());
        self
    }

    pub fn with_real_ip(mut self, value: impl Into<String>) -> Self {
        self.x_real_ip = Some(value.into());
        self
    }

    /// Collect the forwarding headers from `(name, value)` pairs.
    ///
    /// Names are matched case-insensitively. Repeated `X-Forwarded-For`
    /// lines are joined in order, as if sent as one comma-separated header;
    /// for `X-Real-IP` the first occurrence is kept.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut headers = Self::default();
        for (name, value) in pairs {
            if name.eq_ignore_ascii_case(X_FORWARDED_FOR) {
                headers.x_forwarded_for = Some(match headers.x_forwarded_for.take() {
                    Some(existing) => format!("{}, {}", existing, value),
                    None => value.to_string(),
                });
            } else if name.eq_ignore_ascii_case(X_REAL_IP) && headers.x_real_ip.is_none() {
                headers.x_real_ip = Some(value.to_string());
            }
        }
        headers
    }
}

/// Derive the address a policy should be evaluated against.
///
/// Returns `peer` unless `trust_forwarded_for` is set and `peer` is in
/// `trusted_proxies`. In that case the leftmost `X-Forwarded-For` element
/// wins, then `X-Real-IP`, then `peer`. A header that does not parse falls
/// through to the next source.
///
/// # Examples
/// ```
/// use ipacl::address::parse;
/// use ipacl::entry::Entry;
/// use ipacl::resolver::{resolve_effective_address, ForwardedHeaders, TrustedProxySet};
///
/// let proxies: TrustedProxySet = [Entry::parse("192.0.2.0/24").unwrap()].into_iter().collect();
/// let headers = ForwardedHeaders::new().with_forwarded_for("198.51.100.7, 192.0.2.1");
///
/// let peer = parse("192.0.2.1").unwrap();
/// let client = resolve_effective_address(peer, &headers, true, &proxies);
/// assert_eq!(client.to_string(), "198.51.100.7");
///
/// let stranger = parse("203.0.113.9").unwrap();
/// assert_eq!(resolve_effective_address(stranger, &headers, true, &proxies), stranger);
/// ```
pub fn resolve_effective_address(
    peer: Address,
    headers: &ForwardedHeaders,
    trust_forwarded_for: bool,
    trusted_proxies: &TrustedProxySet,
) -> Address {
    if !trust_forwarded_for || !trusted_proxies.contains(peer) {
        return peer;
    }

    if let Some(client) = headers.x_forwarded_for.as_deref().and_then(from_forwarded_for) {
        return client;
    }

    if let Some(client) = headers.x_real_ip.as_deref().and_then(from_real_ip) {
        return client;
    }

    peer
}

/// Leftmost element of an `X-Forwarded-For` value: the originating client.
fn from_forwarded_for(value: &str) -> Option<Address> {
    let first = value.split(',').next().unwrap_or_default().trim();
    match address::parse(first) {
        Ok(addr) => Some(addr),
        Err(e) => {
            debug!("Ignoring X-Forwarded-For '{}': {}", value, e);
            None
        }
    }
}

fn from_real_ip(value: &str) -> Option<Address> {
    match address::parse(value.trim()) {
        Ok(addr) => Some(addr),
        Err(e) => {
            debug!("Ignoring X-Real-IP '{}': {}", value, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::parse;

    fn proxies(list: &[&str]) -> TrustedProxySet {
        list.iter().map(|s| Entry::parse(s).unwrap()).collect()
    }

    fn addr(s: &str) -> Address {
        parse(s).unwrap()
    }

    #[test]
    fn test_trusted_peer_uses_leftmost_forwarded_for() {
        let headers = ForwardedHeaders::new().with_forwarded_for("198.51.100.7, 192.0.2.1");
        let resolved = resolve_effective_address(addr("192.0.2.1"), &headers, true, &proxies(&["192.0.2.1"]));
        assert_eq!(resolved, addr("198.51.100.7"));
    }

    #[test]
    fn test_untrusted_peer_ignores_headers() {
        let headers = ForwardedHeaders::new()
            .with_forwarded_for("198.51.100.7, 192.0.2.1")
            .with_real_ip("198.51.100.8");
        let peer = addr("203.0.113.9");
        assert_eq!(resolve_effective_address(peer, &headers, true, &proxies(&["192.0.2.1"])), peer);
    }

    #[test]
    fn test_trust_flag_off_ignores_headers() {
        let headers = ForwardedHeaders::new().with_forwarded_for("198.51.100.7");
        let peer = addr("192.0.2.1");
        assert_eq!(resolve_effective_address(peer, &headers, false, &proxies(&["192.0.2.1"])), peer);
    }

    #[test]
    fn test_empty_trusted_set_trusts_nobody() {
        let headers = ForwardedHeaders::new().with_forwarded_for("198.51.100.7");
        let peer = addr("192.0.2.1");
        assert_eq!(resolve_effective_address(peer, &headers, true, &TrustedProxySet::default()), peer);
    }

    #[test]
    fn test_real_ip_used_without_forwarded_for() {
        let headers = ForwardedHeaders::new().with_real_ip(" 2001:db8::7 ");
        let resolved = resolve_effective_address(addr("10.0.0.1"), &headers, true, &proxies(&["10.0.0.0/8"]));
        assert_eq!(resolved, addr("2001:db8::7"));
    }

    #[test]
    fn test_malformed_forwarded_for_falls_back_to_real_ip() {
        let headers = ForwardedHeaders::new()
            .with_forwarded_for("unknown, 192.0.2.1")
            .with_real_ip("198.51.100.8");
        let resolved = resolve_effective_address(addr("10.0.0.1"), &headers, true, &proxies(&["10.0.0.0/8"]));
        assert_eq!(resolved, addr("198.51.100.8"));
    }

    #[test]
    fn test_all_headers_malformed_falls_back_to_peer() {
        let headers = ForwardedHeaders::new()
            .with_forwarded_for("")
            .with_real_ip("not-an-ip");
        let peer = addr("10.0.0.1");
        assert_eq!(resolve_effective_address(peer, &headers, true, &proxies(&["10.0.0.0/8"])), peer);
    }

    #[test]
    fn test_no_headers_returns_peer() {
        let peer = addr("::1");
        assert_eq!(
            resolve_effective_address(peer, &ForwardedHeaders::new(), true, &proxies(&["::1"])),
            peer
        );
    }

    #[test]
    fn test_forwarded_for_ipv6_client() {
        let headers = ForwardedHeaders::new().with_forwarded_for("2001:db8::42,10.0.0.2");
        let resolved = resolve_effective_address(addr("10.0.0.2"), &headers, true, &proxies(&["10.0.0.0/8"]));
        assert_eq!(resolved, addr("2001:db8::42"));
    }

    #[test]
    fn test_from_pairs_case_insensitive_and_joined() {
        let headers = ForwardedHeaders::from_pairs([
            ("X-Forwarded-For", "198.51.100.7"),
            ("Host", "api.example.com"),
            ("x-forwarded-for", "10.0.0.5"),
            ("X-REAL-IP", "198.51.100.9"),
            ("x-real-ip", "198.51.100.10"),
        ]);
        assert_eq!(headers.x_forwarded_for.as_deref(), Some("198.51.100.7, 10.0.0.5"));
        assert_eq!(headers.x_real_ip.as_deref(), Some("198.51.100.9"));
    }

    #[test]
    fn test_trusted_proxy_set() {
        let set = proxies(&["10.0.0.0/8", "::1"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(addr("10.20.30.40")));
        assert!(set.contains(addr("::1")));
        assert!(!set.contains(addr("127.0.0.1")));
    }
}
