//! Validate command implementation.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::validation::validate_resource_name;

/// Run the validate command
///
/// Every problem is listed, not just the first one.
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load_unvalidated(config_path)?;
    let problems = problems(&config);

    if problems.is_empty() {
        println!(
            "[OK] {:?} is valid ({} trusted proxies, {} policies)",
            config_path,
            config.trusted_proxies.len(),
            config.policies.len()
        );
        return Ok(());
    }

    for problem in &problems {
        println!("[FAIL] {}", problem);
    }
    bail!(
        "{} problem{} found in {:?}",
        problems.len(),
        if problems.len() == 1 { "" } else { "s" },
        config_path
    );
}

/// Human-readable description of every problem in `config`.
pub fn problems(config: &Config) -> Vec<String> {
    let names = config
        .policies
        .keys()
        .filter_map(|name| validate_resource_name(name).err())
        .map(|e| e.to_string());

    names
        .chain(config.issues().iter().map(ToString::to_string))
        .collect()
}
