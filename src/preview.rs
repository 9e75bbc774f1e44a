//! Pre-save consistency preview for the admin console.
//!
//! Before a policy edit is saved, the console asks whether the operator's
//! own address would be denied by the candidate policy. The answer comes
//! from the same [`resolve_effective_address`] and [`evaluate`] used on the
//! request path, so the warning cannot disagree with enforcement. Warnings
//! never block the save.

use serde::Serialize;
use std::fmt;

use crate::address::Address;
use crate::analysis::{duplicates, shadowed_entries};
use crate::entry::Entry;
use crate::policy::{evaluate, Decision, DenyReason, Policy, PolicyMode};
use crate::resolver::{resolve_effective_address, ForwardedHeaders, TrustedProxySet};
use crate::validation::{BLACKLIST, WHITELIST};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewWarning {
    /// The operator's own address would be denied
    SelfLockout { address: Address, reason: DenyReason },
    /// Whitelist-only mode with nothing whitelisted denies every address
    EmptyWhitelist,
    /// A whitelist entry lies entirely inside a blacklist entry
    Shadowed { whitelist: Entry, blacklist: Entry },
    /// An entry covers the same addresses as an earlier one in the same list
    Duplicate { list: &'static str, entry: Entry },
}

impl fmt::Display for PreviewWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewWarning::SelfLockout { address, reason } => write!(
                f,
                "your address {} would be denied ({}) by this policy",
                address, reason
            ),
            PreviewWarning::EmptyWhitelist => {
                f.write_str("whitelist mode with an empty whitelist denies every address")
            }
            PreviewWarning::Shadowed { whitelist, blacklist } => write!(
                f,
                "whitelist entry {} has no effect: blacklist entry {} covers it",
                whitelist, blacklist
            ),
            PreviewWarning::Duplicate { list, entry } => {
                write!(f, "{} entry {} duplicates an earlier entry", list, entry)
            }
        }
    }
}

/// Result of previewing a candidate policy for one operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub effective_address: Address,
    pub decision: Decision,
    pub warnings: Vec<PreviewWarning>,
}

impl Preview {
    pub fn locks_out_operator(&self) -> bool {
        !self.decision.allowed
    }
}

/// Preview `candidate` for an operator connecting from `peer` with `headers`.
pub fn preview(
    peer: Address,
    headers: &ForwardedHeaders,
    trusted_proxies: &TrustedProxySet,
    candidate: &Policy,
) -> Preview {
    let effective_address =
        resolve_effective_address(peer, headers, candidate.trust_forwarded_for, trusted_proxies);
    let decision = evaluate(effective_address, candidate);

    let mut warnings = Vec::new();
    if let Some(reason) = decision.reason {
        warnings.push(PreviewWarning::SelfLockout {
            address: effective_address,
            reason,
        });
    }
    warnings.extend(policy_warnings(candidate));

    Preview {
        effective_address,
        decision,
        warnings,
    }
}

/// Warnings about the policy itself, independent of who is asking.
pub fn policy_warnings(policy: &Policy) -> Vec<PreviewWarning> {
    let mut warnings = Vec::new();

    if policy.mode == PolicyMode::WhitelistOnly && policy.whitelist.is_empty() {
        warnings.push(PreviewWarning::EmptyWhitelist);
    }

    warnings.extend(
        shadowed_entries(&policy.whitelist, &policy.blacklist)
            .into_iter()
            .map(|s| PreviewWarning::Shadowed {
                whitelist: s.whitelist,
                blacklist: s.blacklist,
            }),
    );

    for (list, entries) in [(WHITELIST, &policy.whitelist), (BLACKLIST, &policy.blacklist)] {
        warnings.extend(
            duplicates(entries)
                .into_iter()
                .map(|entry| PreviewWarning::Duplicate { list, entry }),
        );
    }

    warnings
}
