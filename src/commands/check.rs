//! Check command implementation.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::Path;

use crate::address::Address;
use crate::cli::HeaderArgs;
use crate::entry::Entry;
use crate::policy::{explain, DenyReason};
use crate::validation::validate_address;

/// Outcome of one check, as printed with `--json`
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub resource: String,
    pub peer: Address,
    pub effective_address: Address,
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    pub matched: Option<Entry>,
}

/// Run the check command
///
/// Exits with status 1 when the request would be denied.
pub fn run(
    ip_str: &str,
    resource: &str,
    headers: &HeaderArgs,
    json: bool,
    config_path: &Path,
) -> Result<()> {
    let report = check(ip_str, resource, headers, config_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        if report.effective_address != report.peer {
            println!(
                "Client {} (via trusted proxy {})",
                report.effective_address, report.peer
            );
        }
        match report.reason {
            None => println!(
                "Request from {} to '{}' is ALLOWED",
                report.effective_address, resource
            ),
            Some(reason) => println!(
                "Request from {} to '{}' is DENIED ({})",
                report.effective_address, resource, reason
            ),
        }
        if let Some(entry) = report.matched {
            println!("  matched: {}", entry);
        }
        println!();
    }

    if !report.allowed {
        std::process::exit(1);
    }

    Ok(())
}

/// Evaluate a request the way the gateway would.
pub fn check(
    ip_str: &str,
    resource: &str,
    headers: &HeaderArgs,
    config_path: &Path,
) -> Result<CheckReport> {
    let peer = validate_address(ip_str)?;
    let config = super::load_config(config_path)?;
    let gate = config.gatekeeper()?;

    let (effective_address, decision) = gate
        .check(resource, peer, &headers.to_headers())
        .ok_or_else(|| anyhow!("No policy configured for resource '{}'", resource))?;

    let matched = gate
        .registry()
        .get(resource)
        .and_then(|policy| explain(effective_address, &policy).matched);

    Ok(CheckReport {
        resource: resource.to_string(),
        peer,
        effective_address,
        allowed: decision.allowed,
        reason: decision.reason,
        matched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
trusted_proxies: ["192.0.2.1"]
policies:
  billing-api:
    mode: whitelist
    whitelist: ["198.51.100.0/24"]
    blacklist: ["198.51.100.66"]
    trust_forwarded_for: true
"#;

    fn write_config(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();
        path
    }

    #[test]
    fn test_check_allowed_through_proxy() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);
        let headers = HeaderArgs {
            forwarded_for: Some("198.51.100.7, 192.0.2.1".to_string()),
            real_ip: None,
        };

        let report = check("192.0.2.1", "billing-api", &headers, &path).unwrap();
        assert!(report.allowed);
        assert_eq!(report.effective_address.to_string(), "198.51.100.7");
        assert_eq!(report.matched.unwrap().to_string(), "198.51.100.0/24");
    }

    #[test]
    fn test_check_blacklisted() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);

        let report = check("198.51.100.66", "billing-api", &HeaderArgs::default(), &path).unwrap();
        assert!(!report.allowed);
        assert_eq!(report.reason, Some(DenyReason::Blacklisted));
        assert_eq!(report.matched.unwrap().to_string(), "198.51.100.66");
    }

    #[test]
    fn test_check_unknown_resource() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);

        let err = check("10.0.0.1", "nope", &HeaderArgs::default(), &path).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_check_invalid_ip() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir);

        assert!(check("10.0.0", "billing-api", &HeaderArgs::default(), &path).is_err());
    }
}
