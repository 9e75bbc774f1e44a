//! Policy evaluation: blacklist first, then the whitelist mode.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::entry::Entry;
use crate::matcher::{first_match, matches_any};

/// How addresses absent from the blacklist are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyMode {
    /// Everything not blacklisted is allowed
    #[default]
    #[serde(rename = "allow_all")]
    AllowAll,
    /// Only whitelisted addresses are allowed
    #[serde(rename = "whitelist")]
    WhitelistOnly,
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyMode::AllowAll => f.write_str("allow_all"),
            PolicyMode::WhitelistOnly => f.write_str("whitelist"),
        }
    }
}

impl std::str::FromStr for PolicyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow_all" => Ok(PolicyMode::AllowAll),
            "whitelist" => Ok(PolicyMode::WhitelistOnly),
            _ => Err(format!("Unknown policy mode: {}. Use allow_all or whitelist", s)),
        }
    }
}

/// Access policy attached to one protected resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub mode: PolicyMode,
    pub whitelist: Vec<Entry>,
    pub blacklist: Vec<Entry>,
    /// Honor X-Forwarded-For / X-Real-IP from trusted proxies
    pub trust_forwarded_for: bool,
}

impl Policy {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn whitelist_only(whitelist: Vec<Entry>) -> Self {
        Self {
            mode: PolicyMode::WhitelistOnly,
            whitelist,
            ..Self::default()
        }
    }

    pub fn with_blacklist(mut self, blacklist: Vec<Entry>) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn evaluate(&self, address: Address) -> Decision {
        evaluate(address, self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Blacklisted,
    NotWhitelisted,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Blacklisted => f.write_str("blacklisted"),
            DenyReason::NotWhitelisted => f.write_str("not whitelisted"),
        }
    }
}

/// Outcome of a policy check. `reason` is set exactly when `allowed` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
}

impl Decision {
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub const fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Decide whether `address` may access a resource protected by `policy`.
///
/// 1. A blacklist match denies, whatever the mode.
/// 2. `AllowAll` allows everything else.
/// 3. `WhitelistOnly` allows only whitelist matches. An empty whitelist
///    therefore denies every address.
///
/// # Examples
/// ```
/// use ipacl::{address, entry::Entry, policy::{evaluate, Decision, DenyReason, Policy}};
/// let policy = Policy::whitelist_only(vec![Entry::parse("10.0.0.0/8").unwrap()])
///     .with_blacklist(vec![Entry::parse("10.6.6.6").unwrap()]);
/// let addr = address::parse("10.6.6.6").unwrap();
/// assert_eq!(evaluate(addr, &policy), Decision::deny(DenyReason::Blacklisted));
/// ```
pub fn evaluate(address: Address, policy: &Policy) -> Decision {
    if matches_any(address, &policy.blacklist) {
        return Decision::deny(DenyReason::Blacklisted);
    }
    match policy.mode {
        PolicyMode::AllowAll => Decision::allow(),
        PolicyMode::WhitelistOnly if matches_any(address, &policy.whitelist) => Decision::allow(),
        PolicyMode::WhitelistOnly => Decision::deny(DenyReason::NotWhitelisted),
    }
}

/// A decision together with the entry that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub decision: Decision,
    /// Blacklist entry for a blacklist denial, whitelist entry for a
    /// whitelist allow, `None` otherwise
    pub matched: Option<Entry>,
}

/// Same as [`evaluate`], also reporting which entry decided.
pub fn explain(address: Address, policy: &Policy) -> Explanation {
    if let Some(hit) = first_match(address, &policy.blacklist) {
        return Explanation {
            decision: Decision::deny(DenyReason::Blacklisted),
            matched: Some(*hit),
        };
    }
    let matched = match policy.mode {
        PolicyMode::AllowAll => None,
        PolicyMode::WhitelistOnly => first_match(address, &policy.whitelist).copied(),
    };
    Explanation {
        decision: evaluate(address, policy),
        matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::parse;

    fn entries(list: &[&str]) -> Vec<Entry> {
        list.iter().map(|s| Entry::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_blacklist_wins_over_whitelist() {
        let policy = Policy::whitelist_only(entries(&["10.0.0.0/8"]))
            .with_blacklist(entries(&["203.0.113.50"]));
        let decision = evaluate(parse("203.0.113.50").unwrap(), &policy);
        assert_eq!(decision, Decision::deny(DenyReason::Blacklisted));
    }

    #[test]
    fn test_blacklist_wins_when_also_whitelisted() {
        let policy = Policy::whitelist_only(entries(&["10.0.0.0/8"]))
            .with_blacklist(entries(&["10.6.0.0/16"]));
        let decision = evaluate(parse("10.6.1.1").unwrap(), &policy);
        assert_eq!(decision.reason, Some(DenyReason::Blacklisted));
    }

    #[test]
    fn test_blacklist_applies_in_allow_all() {
        let policy = Policy::allow_all().with_blacklist(entries(&["2001:db8::/32"]));
        assert!(!evaluate(parse("2001:db8::7").unwrap(), &policy).allowed);
        assert!(evaluate(parse("2001:db9::7").unwrap(), &policy).allowed);
    }

    #[test]
    fn test_allow_all_empty_lists() {
        let policy = Policy::allow_all();
        assert_eq!(evaluate(parse("192.0.2.1").unwrap(), &policy), Decision::allow());
        assert_eq!(evaluate(parse("::1").unwrap(), &policy), Decision::allow());
    }

    #[test]
    fn test_allow_all_ignores_whitelist() {
        let policy = Policy {
            whitelist: entries(&["10.0.0.0/8"]),
            ..Policy::allow_all()
        };
        assert!(evaluate(parse("8.8.8.8").unwrap(), &policy).allowed);
    }

    #[test]
    fn test_whitelist_only() {
        let policy = Policy::whitelist_only(entries(&["10.0.0.0/8", "2001:db8::1"]));
        assert!(evaluate(parse("10.1.1.1").unwrap(), &policy).allowed);
        assert!(evaluate(parse("2001:db8::1").unwrap(), &policy).allowed);
        assert_eq!(
            evaluate(parse("192.0.2.1").unwrap(), &policy),
            Decision::deny(DenyReason::NotWhitelisted)
        );
    }

    #[test]
    fn test_empty_whitelist_denies_everything() {
        let policy = Policy::whitelist_only(vec![]);
        assert_eq!(
            evaluate(parse("10.0.0.1").unwrap(), &policy),
            Decision::deny(DenyReason::NotWhitelisted)
        );
    }

    #[test]
    fn test_dual_stack_whitelist_is_family_strict() {
        let policy = Policy::whitelist_only(entries(&["0.0.0.0/0"]));
        assert!(evaluate(parse("1.2.3.4").unwrap(), &policy).allowed);
        assert!(!evaluate(parse("::1").unwrap(), &policy).allowed);
    }

    #[test]
    fn test_explain_reports_matching_entry() {
        let policy = Policy::whitelist_only(entries(&["10.0.0.0/8"]))
            .with_blacklist(entries(&["10.6.6.6"]));

        let denied = explain(parse("10.6.6.6").unwrap(), &policy);
        assert_eq!(denied.decision.reason, Some(DenyReason::Blacklisted));
        assert_eq!(denied.matched.unwrap().to_string(), "10.6.6.6");

        let allowed = explain(parse("10.1.1.1").unwrap(), &policy);
        assert!(allowed.decision.allowed);
        assert_eq!(allowed.matched.unwrap().to_string(), "10.0.0.0/8");

        let outside = explain(parse("8.8.8.8").unwrap(), &policy);
        assert_eq!(outside.decision.reason, Some(DenyReason::NotWhitelisted));
        assert!(outside.matched.is_none());
    }

    #[test]
    fn test_decision_json() {
        let json = serde_json::to_string(&Decision::deny(DenyReason::NotWhitelisted)).unwrap();
        assert_eq!(json, r#"{"allowed":false,"reason":"not_whitelisted"}"#);
        let json = serde_json::to_string(&Decision::allow()).unwrap();
        assert_eq!(json, r#"{"allowed":true,"reason":null}"#);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("allow_all".parse::<PolicyMode>().unwrap(), PolicyMode::AllowAll);
        assert_eq!("whitelist".parse::<PolicyMode>().unwrap(), PolicyMode::WhitelistOnly);
        assert!("deny".parse::<PolicyMode>().is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_address() -> impl Strategy<Value = Address> {
        prop_oneof![
            any::<u32>().prop_map(Address::v4),
            any::<u128>().prop_map(Address::v6),
        ]
    }

    fn any_entry() -> impl Strategy<Value = Entry> {
        prop_oneof![
            any_address().prop_map(Entry::Literal),
            (any::<u32>(), 0u8..=32)
                .prop_map(|(b, prefix_len)| Entry::Network { base: Address::v4(b), prefix_len }),
            (any::<u128>(), 0u8..=128)
                .prop_map(|(b, prefix_len)| Entry::Network { base: Address::v6(b), prefix_len }),
        ]
    }

    fn any_policy() -> impl Strategy<Value = Policy> {
        (
            prop_oneof![Just(PolicyMode::AllowAll), Just(PolicyMode::WhitelistOnly)],
            prop::collection::vec(any_entry(), 0..8),
            prop::collection::vec(any_entry(), 0..8),
            any::<bool>(),
        )
            .prop_map(|(mode, whitelist, blacklist, trust_forwarded_for)| Policy {
                mode,
                whitelist,
                blacklist,
                trust_forwarded_for,
            })
    }

    proptest! {
        /// A blacklisted address is denied whatever the mode and whitelist
        #[test]
        fn prop_blacklist_precedence(addr in any_address(), mut policy in any_policy()) {
            policy.blacklist.push(Entry::Literal(addr));
            policy.whitelist.push(Entry::Literal(addr));
            prop_assert_eq!(evaluate(addr, &policy), Decision::deny(DenyReason::Blacklisted));
        }

        /// Same inputs, same decision
        #[test]
        fn prop_deterministic(addr in any_address(), policy in any_policy()) {
            let first = evaluate(addr, &policy);
            let snapshot = policy.clone();
            for _ in 0..3 {
                prop_assert_eq!(evaluate(addr, &snapshot), first);
            }
        }

        /// `reason` is present exactly on denial
        #[test]
        fn prop_reason_iff_denied(addr in any_address(), policy in any_policy()) {
            let decision = evaluate(addr, &policy);
            prop_assert_eq!(decision.allowed, decision.reason.is_none());
        }

        /// explain() never disagrees with evaluate()
        #[test]
        fn prop_explain_consistent(addr in any_address(), policy in any_policy()) {
            prop_assert_eq!(explain(addr, &policy).decision, evaluate(addr, &policy));
        }
    }
}
