//! Resolve command implementation.

use anyhow::Result;
use std::path::Path;

use crate::address::Address;
use crate::cli::HeaderArgs;
use crate::resolver::resolve_effective_address;
use crate::validation::validate_address;

/// Run the resolve command
pub fn run(
    peer_str: &str,
    resource: Option<&str>,
    trust: bool,
    headers: &HeaderArgs,
    config_path: &Path,
) -> Result<()> {
    let peer = validate_address(peer_str)?;
    let client = resolve(peer, resource, trust, headers, config_path)?;

    if client == peer {
        println!("{}", client);
    } else {
        println!("{} (via trusted proxy {})", client, peer);
    }

    Ok(())
}

/// Effective client address of a connection from `peer`.
///
/// With a resource, the proxy-trust flag comes from its policy; otherwise
/// from `trust`.
pub fn resolve(
    peer: Address,
    resource: Option<&str>,
    trust: bool,
    headers: &HeaderArgs,
    config_path: &Path,
) -> Result<Address> {
    let config = super::load_config(config_path)?;
    let proxies = config.trusted_proxy_set()?;

    let trust_forwarded_for = match resource {
        Some(name) => config.policy_spec(name)?.trust_forwarded_for,
        None => trust,
    };

    Ok(resolve_effective_address(
        peer,
        &headers.to_headers(),
        trust_forwarded_for,
        &proxies,
    ))
}
