//! Preview command implementation.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::HeaderArgs;
use crate::config::Config;
use crate::preview::{preview, Preview};
use crate::validation::validate_address;

/// Run the preview command
pub fn run(
    resource: &str,
    peer_str: &str,
    headers: &HeaderArgs,
    json: bool,
    config_path: &Path,
) -> Result<()> {
    let result = preview_resource(resource, peer_str, headers, config_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("Policy '{}' as seen from {}:", resource, result.effective_address);
    match result.decision.reason {
        None => println!("  [OK] allowed"),
        Some(reason) => println!("  [FAIL] denied ({})", reason),
    }
    if !result.warnings.is_empty() {
        println!();
        for warning in &result.warnings {
            println!("  [WARN] {}", warning);
        }
    }
    println!();

    Ok(())
}

/// Preview the stored policy of `resource` for an operator.
///
/// The policy is validated strictly, as it would be on save; the rest of
/// the file may contain unrelated invalid entries.
pub fn preview_resource(
    resource: &str,
    peer_str: &str,
    headers: &HeaderArgs,
    config_path: &Path,
) -> Result<Preview> {
    let peer = validate_address(peer_str)?;
    let config = if config_path.exists() {
        Config::load_unvalidated(config_path)?
    } else {
        Config::default()
    };

    let candidate = config
        .policy(resource)
        .with_context(|| format!("Cannot preview policy '{}'", resource))?;
    let trusted = config.trusted_proxy_set()?;

    Ok(preview(peer, &headers.to_headers(), &trusted, &candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewWarning;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
trusted_proxies: ["10.0.0.1"]
policies:
  admin:
    mode: whitelist
    whitelist: ["10.20.0.0/16"]
    trust_forwarded_for: true
  locked:
    mode: whitelist
  broken:
    blacklist: ["10.0.0.0/40"]
"#;

    fn setup() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();
        (dir, path)
    }

    #[test]
    fn test_preview_operator_behind_proxy() {
        let (_dir, path) = setup();
        let headers = HeaderArgs {
            forwarded_for: Some("10.20.1.1".to_string()),
            real_ip: None,
        };

        let result = preview_resource("admin", "10.0.0.1", &headers, &path).unwrap();
        assert!(result.decision.allowed);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_preview_warns_on_lockout() {
        let (_dir, path) = setup();

        let result = preview_resource("locked", "10.20.1.1", &HeaderArgs::default(), &path).unwrap();
        assert!(result.locks_out_operator());
        assert!(result.warnings.contains(&PreviewWarning::EmptyWhitelist));
    }

    #[test]
    fn test_preview_reports_invalid_policy() {
        let (_dir, path) = setup();

        let err = preview_resource("broken", "10.0.0.2", &HeaderArgs::default(), &path).unwrap_err();
        assert!(format!("{:#}", err).contains("10.0.0.0/40"));
    }
}
