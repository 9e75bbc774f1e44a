//! Entry command implementation: edit a resource's whitelist or blacklist.
//!
//! Every edit goes through the same strict validation as the admin console's
//! save path before the configuration is written back.

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::analysis::{aggregate, count_addresses};
use crate::cli::{EntryAction, ListKind};
use crate::config::Config;
use crate::entry::Entry;
use crate::policy::PolicyMode;
use crate::preview::{policy_warnings, preview, PreviewWarning};
use crate::resolver::ForwardedHeaders;
use crate::utils::format_count_with_separator;
use crate::validation::{validate_address, validate_entry, validate_resource_name, PolicySpec};

/// Run the entry command
pub fn run(action: EntryAction, config_path: &Path) -> Result<()> {
    match action {
        EntryAction::Add {
            resource,
            list,
            entry,
            operator,
        } => add(&resource, list, &entry, operator.as_deref(), config_path),
        EntryAction::Del {
            resource,
            list,
            entry,
        } => remove(&resource, list, &entry, config_path),
        EntryAction::List { resource, compact } => show(&resource, compact, config_path),
    }
}

fn list_mut(spec: &mut PolicySpec, list: ListKind) -> &mut Vec<String> {
    match list {
        ListKind::Whitelist => &mut spec.whitelist,
        ListKind::Blacklist => &mut spec.blacklist,
    }
}

/// Add `text` to a resource's list, creating the resource if needed.
///
/// Returns the stored entry, or `None` when an equivalent entry is already present.
pub fn add_entry(
    config: &mut Config,
    resource: &str,
    list: ListKind,
    text: &str,
) -> Result<Option<Entry>> {
    validate_resource_name(resource)?;
    let entry = validate_entry(text)?;

    // Same key as `analysis::duplicates`: `10.1.2.3/8` is `10.0.0.0/8`
    let key = entry.to_ipnet().trunc();
    let literals = list_mut(config.policies.entry(resource.to_string()).or_default(), list);
    if literals.iter().any(|existing| {
        Entry::parse(existing.trim()).is_ok_and(|parsed| parsed.to_ipnet().trunc() == key)
    }) {
        return Ok(None);
    }
    literals.push(entry.to_string());

    config.validate()?;
    Ok(Some(entry))
}

/// Remove every literal of a resource's list equal to `text`.
///
/// Comparison is on the parsed entry, so `2001:DB8::1` removes `2001:db8::1`.
/// A literal that does not parse can still be removed by its exact text.
pub fn remove_entry(config: &mut Config, resource: &str, list: ListKind, text: &str) -> Result<bool> {
    let spec = config
        .policies
        .get_mut(resource)
        .ok_or_else(|| anyhow!("No policy configured for resource '{}'", resource))?;

    let target = text.trim();
    let parsed = Entry::parse(target).ok();
    let literals = list_mut(spec, list);
    let original_len = literals.len();
    literals.retain(|literal| {
        let literal = literal.trim();
        literal != target && (parsed.is_none() || Entry::parse(literal).ok() != parsed)
    });

    Ok(literals.len() != original_len)
}

/// Add an IP/CIDR to a resource's list
fn add(
    resource: &str,
    list: ListKind,
    text: &str,
    operator: Option<&str>,
    config_path: &Path,
) -> Result<()> {
    let operator = operator.map(validate_address).transpose()?;

    let mut config = super::load_config(config_path)?;
    let Some(entry) = add_entry(&mut config, resource, list, text)? else {
        println!("{} is already in the {} of '{}'", text, list.as_str(), resource);
        return Ok(());
    };

    // Warn, but never refuse, when the edit locks the operator out
    let policy = config.policy(resource)?;
    let warnings: Vec<PreviewWarning> = match operator {
        Some(peer) => {
            let trusted = config.trusted_proxy_set()?;
            preview(peer, &ForwardedHeaders::new(), &trusted, &policy).warnings
        }
        None => policy_warnings(&policy),
    };

    config.save(config_path)?;

    println!("[OK] Added {} to {} of '{}'", entry, list.as_str(), resource);
    for warning in &warnings {
        println!("[WARN] {}", warning);
    }

    Ok(())
}

/// Remove an IP/CIDR from a resource's list
fn remove(resource: &str, list: ListKind, text: &str, config_path: &Path) -> Result<()> {
    let mut config = super::load_config(config_path)?;

    if !remove_entry(&mut config, resource, list, text)? {
        println!("{} was not in the {} of '{}'", text, list.as_str(), resource);
        return Ok(());
    }

    config.validate()?;
    config.save(config_path)?;

    println!("[OK] Removed {} from {} of '{}'", text, list.as_str(), resource);
    Ok(())
}

/// List a resource's policy
fn show(resource: &str, compact: bool, config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    let policy = config.policy(resource)?;

    println!();
    println!("Policy '{}':", resource);
    println!(
        "  mode: {}",
        match policy.mode {
            PolicyMode::AllowAll => "allow all (blacklist only)",
            PolicyMode::WhitelistOnly => "whitelist only",
        }
    );
    println!("  trust forwarded headers: {}", if policy.trust_forwarded_for { "yes" } else { "no" });

    for (name, entries) in [("Whitelist", &policy.whitelist), ("Blacklist", &policy.blacklist)] {
        println!();
        println!("{} ({} entries):", name, entries.len());
        if entries.is_empty() {
            println!("  (empty)");
            continue;
        }
        for entry in entries.iter() {
            println!("  {}", entry);
        }

        let merged = aggregate(entries);
        if compact {
            println!("  compacted to {} networks:", merged.len());
            for net in &merged {
                println!("    {}", net);
            }
        }
        println!(
            "  covers {} addresses",
            format_count_with_separator(count_addresses(&merged))
        );
    }

    let warnings = policy_warnings(&policy);
    if !warnings.is_empty() {
        println!();
        for warning in &warnings {
            println!("[WARN] {}", warning);
        }
    }
    println!();

    Ok(())
}
