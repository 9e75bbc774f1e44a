//! Validation boundary between textual policies and typed ones.
//!
//! This module provides:
//! - [`PolicySpec`] - the textual policy as persisted by the console
//! - [`validate_policy`] - strict conversion for the save path, reporting every bad literal
//! - [`load_policy_lenient`] - conversion for stored policies, dropping bad literals
//! - single-value helpers used by the CLI

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::address::{self, Address};
use crate::entry::Entry;
use crate::error::{EntryError, PolicyErrors};
use crate::policy::{Policy, PolicyMode};
use crate::resolver::TrustedProxySet;

pub const WHITELIST: &str = "whitelist";
pub const BLACKLIST: &str = "blacklist";
pub const TRUSTED_PROXIES: &str = "trusted_proxies";

/// Textual form of a [`Policy`]: two string lists, a mode and the proxy-trust flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySpec {
    pub mode: PolicyMode,
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub trust_forwarded_for: bool,
}

impl From<&Policy> for PolicySpec {
    fn from(policy: &Policy) -> Self {
        Self {
            mode: policy.mode,
            whitelist: policy.whitelist.iter().map(ToString::to_string).collect(),
            blacklist: policy.blacklist.iter().map(ToString::to_string).collect(),
            trust_forwarded_for: policy.trust_forwarded_for,
        }
    }
}

/// Parse one list entry as submitted by an editor. Surrounding whitespace is ignored.
fn parse_list_entry(list: &str, index: usize, literal: &str) -> Result<Entry, EntryError> {
    Entry::parse(literal.trim()).map_err(|source| EntryError {
        list: list.to_string(),
        index,
        literal: literal.to_string(),
        source,
    })
}

/// Parse every entry of a list, collecting all failures.
pub fn validate_entries(list: &str, literals: &[String]) -> Result<Vec<Entry>, Vec<EntryError>> {
    let mut entries = Vec::with_capacity(literals.len());
    let mut errors = Vec::new();
    for (index, literal) in literals.iter().enumerate() {
        match parse_list_entry(list, index, literal) {
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(entries)
    } else {
        Err(errors)
    }
}

/// Strict conversion used when an administrator saves a policy.
///
/// Nothing is accepted unless every literal parses; the error lists each
/// failing literal with its list, position and reason.
pub fn validate_policy(spec: &PolicySpec) -> Result<Policy, PolicyErrors> {
    let whitelist = validate_entries(WHITELIST, &spec.whitelist);
    let blacklist = validate_entries(BLACKLIST, &spec.blacklist);
    match (whitelist, blacklist) {
        (Ok(whitelist), Ok(blacklist)) => Ok(Policy {
            mode: spec.mode,
            whitelist,
            blacklist,
            trust_forwarded_for: spec.trust_forwarded_for,
        }),
        (whitelist, blacklist) => {
            let mut errors = whitelist.err().unwrap_or_default();
            errors.extend(blacklist.err().unwrap_or_default());
            Err(PolicyErrors(errors))
        }
    }
}

/// Conversion for policies read back from storage.
///
/// Stored policies were validated when saved, so a bad literal here is an
/// anomaly. It is logged and dropped, which makes it a non-matching entry:
/// evaluation itself never fails.
pub fn load_policy_lenient(resource: &str, spec: &PolicySpec) -> Policy {
    Policy {
        mode: spec.mode,
        whitelist: lenient_entries(resource, WHITELIST, &spec.whitelist),
        blacklist: lenient_entries(resource, BLACKLIST, &spec.blacklist),
        trust_forwarded_for: spec.trust_forwarded_for,
    }
}

fn lenient_entries(resource: &str, list: &str, literals: &[String]) -> Vec<Entry> {
    literals
        .iter()
        .enumerate()
        .filter_map(|(index, literal)| match parse_list_entry(list, index, literal) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Ignoring stored entry of '{}': {}", resource, e);
                None
            }
        })
        .collect()
}

/// Strict conversion of the trusted proxy list.
pub fn validate_trusted_proxies(literals: &[String]) -> Result<TrustedProxySet, PolicyErrors> {
    validate_entries(TRUSTED_PROXIES, literals)
        .map(TrustedProxySet::new)
        .map_err(PolicyErrors)
}

/// Validate an address string and return the parsed [`Address`].
///
/// # Examples
/// ```
/// use ipacl::validation::validate_address;
/// assert!(validate_address("192.168.1.1").is_ok());
/// assert!(validate_address(" ::1 ").is_ok());
/// assert!(validate_address("invalid").is_err());
/// ```
pub fn validate_address(text: &str) -> Result<Address> {
    address::parse(text.trim()).map_err(|e| anyhow::anyhow!("Invalid IP address '{}': {}", text, e))
}

/// Validate an address or CIDR string and return the parsed [`Entry`].
///
/// # Examples
/// ```
/// use ipacl::validation::validate_entry;
/// assert!(validate_entry("192.168.1.1").is_ok());
/// assert!(validate_entry("192.168.0.0/24").is_ok());
/// assert!(validate_entry("192.168.0.0/40").is_err());
/// ```
pub fn validate_entry(text: &str) -> Result<Entry> {
    let kind = if text.contains('/') { "CIDR" } else { "IP address" };
    Entry::parse(text.trim()).map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", kind, text, e))
}

/// Validate a resource name: non-empty, ASCII letters, digits, `-`, `_` and `.`.
///
/// # Examples
/// ```
/// use ipacl::validation::validate_resource_name;
/// assert!(validate_resource_name("billing-api").is_ok());
/// assert!(validate_resource_name("bad name").is_err());
/// ```
pub fn validate_resource_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Resource name cannot be empty");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        bail!(
            "Invalid resource name '{}'. Use ASCII letters, digits, '-', '_' or '.'",
            name
        );
    }
    Ok(())
}
