//! Static analysis of policy lists: overlaps, duplicates, coverage.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::collections::HashSet;

use crate::entry::Entry;

/// A whitelist entry that can never allow anything because a blacklist
/// entry covers it completely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shadowed {
    pub whitelist: Entry,
    pub blacklist: Entry,
}

/// Find whitelist entries fully contained in a blacklist entry.
///
/// Partial overlaps are not reported: part of such a whitelist entry still
/// takes effect.
pub fn shadowed_entries(whitelist: &[Entry], blacklist: &[Entry]) -> Vec<Shadowed> {
    whitelist
        .iter()
        .filter_map(|allowed| {
            blacklist
                .iter()
                .find(|blocked| contains(&blocked.to_ipnet(), &allowed.to_ipnet()))
                .map(|blocked| Shadowed {
                    whitelist: *allowed,
                    blacklist: *blocked,
                })
        })
        .collect()
}

/// Check if `container` fully contains `contained`.
fn contains(container: &IpNet, contained: &IpNet) -> bool {
    match (container, contained) {
        (IpNet::V4(c), IpNet::V4(t)) => c.contains(t),
        (IpNet::V6(c), IpNet::V6(t)) => c.contains(t),
        _ => false,
    }
}

/// Entries that cover exactly the same addresses as an earlier entry.
///
/// `10.0.0.0/8` and `10.1.2.3/8` are duplicates; a literal and the
/// equivalent full-width network are too.
pub fn duplicates(entries: &[Entry]) -> Vec<Entry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| !seen.insert(entry.to_ipnet().trunc()))
        .copied()
        .collect()
}

/// Merge a list into the smallest equivalent set of networks.
///
/// IPv4 networks come first, each family sorted.
/// For example: [192.168.0.0/25, 192.168.0.128/25] -> [192.168.0.0/24]
pub fn aggregate(entries: &[Entry]) -> Vec<Entry> {
    let (v4_nets, v6_nets): (Vec<IpNet>, Vec<IpNet>) = entries
        .iter()
        .map(Entry::to_ipnet)
        .partition(|net| matches!(net, IpNet::V4(_)));

    let v4_nets: Vec<Ipv4Net> = v4_nets
        .into_iter()
        .filter_map(|n| match n {
            IpNet::V4(v4) => Some(v4),
            IpNet::V6(_) => None,
        })
        .collect();
    let v6_nets: Vec<Ipv6Net> = v6_nets
        .into_iter()
        .filter_map(|n| match n {
            IpNet::V6(v6) => Some(v6),
            IpNet::V4(_) => None,
        })
        .collect();

    Ipv4Net::aggregate(&v4_nets)
        .into_iter()
        .map(IpNet::V4)
        .chain(Ipv6Net::aggregate(&v6_nets).into_iter().map(IpNet::V6))
        .map(Entry::from)
        .collect()
}

/// Total number of addresses covered by the entries, overlaps counted once
/// per entry.
///
/// Uses saturating arithmetic so an IPv6 /0 does not overflow.
pub fn count_addresses(entries: &[Entry]) -> u128 {
    entries
        .iter()
        .map(|entry| {
            let shift = u32::from(entry.family().width() - entry.prefix_len());
            1u128.checked_shl(shift).unwrap_or(u128::MAX)
        })
        .fold(0u128, |acc, count| acc.saturating_add(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(list: &[&str]) -> Vec<Entry> {
        list.iter().map(|s| Entry::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_shadowed_by_larger_blacklist() {
        let shadowed = shadowed_entries(
            &entries(&["10.1.0.0/16", "192.168.0.0/24"]),
            &entries(&["10.0.0.0/8"]),
        );
        assert_eq!(shadowed.len(), 1);
        assert_eq!(shadowed[0].whitelist.to_string(), "10.1.0.0/16");
        assert_eq!(shadowed[0].blacklist.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_literal_shadowed_by_equal_literal() {
        let shadowed = shadowed_entries(&entries(&["2001:db8::1"]), &entries(&["2001:db8::1"]));
        assert_eq!(shadowed.len(), 1);
    }

    #[test]
    fn test_partial_overlap_not_shadowed() {
        let shadowed = shadowed_entries(&entries(&["10.0.0.0/8"]), &entries(&["10.1.0.0/16"]));
        assert!(shadowed.is_empty());
    }

    #[test]
    fn test_cross_family_not_shadowed() {
        let shadowed = shadowed_entries(&entries(&["::/0"]), &entries(&["0.0.0.0/0"]));
        assert!(shadowed.is_empty());
    }

    #[test]
    fn test_duplicates() {
        let dups = duplicates(&entries(&["10.0.0.0/8", "10.1.2.3/8", "10.0.0.1", "10.0.0.1/32", "::1"]));
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].to_string(), "10.1.2.3/8");
        assert_eq!(dups[1].to_string(), "10.0.0.1/32");
    }

    #[test]
    fn test_duplicates_empty() {
        assert!(duplicates(&[]).is_empty());
    }

    #[test]
    fn test_aggregate_contiguous() {
        let aggregated = aggregate(&entries(&["192.168.0.0/25", "192.168.0.128/25"]));
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].to_string(), "192.168.0.0/24");
    }

    #[test]
    fn test_aggregate_mixed_families() {
        let aggregated = aggregate(&entries(&["2001:db8::/33", "10.0.0.0/8", "2001:db8:8000::/33"]));
        let text: Vec<String> = aggregated.iter().map(ToString::to_string).collect();
        assert_eq!(text, vec!["10.0.0.0/8", "2001:db8::/32"]);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_count_addresses() {
        let count = count_addresses(&entries(&["192.168.0.0/24", "10.0.0.0/8", "10.0.0.1"]));
        assert_eq!(count, 256 + 16_777_216 + 1);
    }

    #[test]
    fn test_count_addresses_overflow_protection() {
        assert_eq!(count_addresses(&entries(&["0.0.0.0/0"])), 1u128 << 32);
        assert_eq!(count_addresses(&entries(&["::/0"])), u128::MAX);
        assert_eq!(count_addresses(&entries(&["::/0", "::/1"])), u128::MAX);
    }

    #[test]
    fn test_count_addresses_oversized_prefix() {
        // Built without `Entry::network`, so the prefix was never checked
        let wide = Entry::Network {
            base: crate::address::Address::v4(0x0a00_0000),
            prefix_len: 40,
        };
        assert_eq!(count_addresses(&[wide]), 1);
        assert_eq!(aggregate(&[wide])[0].to_string(), "10.0.0.0/32");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::address::Address;
    use crate::matcher::matches_any;
    use proptest::prelude::*;

    fn ipv4_entry_strategy() -> impl Strategy<Value = Entry> {
        (any::<u32>(), 0u8..=32).prop_map(|(bits, prefix_len)| Entry::Network {
            base: Address::v4(bits),
            prefix_len,
        })
    }

    proptest! {
        /// Aggregation should never increase the number of entries
        #[test]
        fn prop_aggregate_reduces_or_maintains_size(list in prop::collection::vec(ipv4_entry_strategy(), 0..50)) {
            prop_assert!(aggregate(&list).len() <= list.len());
        }

        /// Aggregated lists match exactly the same addresses
        #[test]
        fn prop_aggregate_preserves_membership(
            list in prop::collection::vec(ipv4_entry_strategy(), 0..20),
            probe in any::<u32>(),
        ) {
            let probe = Address::v4(probe);
            prop_assert_eq!(matches_any(probe, &aggregate(&list)), matches_any(probe, &list));
        }

        /// A shadowed whitelist entry is always blacklisted in full, so its base is too
        #[test]
        fn prop_shadowed_base_is_blacklisted(
            whitelist in prop::collection::vec(ipv4_entry_strategy(), 0..10),
            blacklist in prop::collection::vec(ipv4_entry_strategy(), 0..10),
        ) {
            for shadowed in shadowed_entries(&whitelist, &blacklist) {
                prop_assert!(matches_any(shadowed.whitelist.base(), &blacklist));
            }
        }
    }
}
