//! Configuration management for ipacl.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AclError, EntryError, PolicyErrors};
use crate::policy::Policy;
use crate::resolver::TrustedProxySet;
use crate::snapshot::Gatekeeper;
use crate::validation::{
    load_policy_lenient, validate_policy, validate_resource_name, validate_trusted_proxies,
    PolicySpec, TRUSTED_PROXIES,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/ipacl/config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Proxies allowed to supply X-Forwarded-For / X-Real-IP (IPs/CIDRs)
    pub trusted_proxies: Vec<String>,

    /// Access policies keyed by resource name
    pub policies: BTreeMap<String, PolicySpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trusted_proxies: default_trusted_proxies(),
            policies: BTreeMap::new(),
        }
    }
}

fn default_trusted_proxies() -> Vec<String> {
    vec!["127.0.0.1".to_string(), "::1".to_string()]
}

/// One invalid entry and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// `trusted_proxies` or the resource name
    pub scope: String,
    pub error: EntryError,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.scope == TRUSTED_PROXIES {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{}: {}", self.scope, self.error)
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::load_unvalidated(path.as_ref())?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Load without validating entries, so they can be reported one by one.
    pub fn load_unvalidated<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for name in self.policies.keys() {
            validate_resource_name(name)?;
        }

        let issues = self.issues();
        if let Some(first) = issues.first() {
            let more = match issues.len() {
                1 => String::new(),
                n => format!(" (and {} more)", n - 1),
            };
            return Err(AclError::Config(format!("{}{}", first, more)).into());
        }

        Ok(())
    }

    /// Every entry of the configuration that does not parse.
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let proxies = validate_trusted_proxies(&self.trusted_proxies)
            .err()
            .map(|PolicyErrors(errors)| errors)
            .unwrap_or_default()
            .into_iter()
            .map(|error| ConfigIssue {
                scope: TRUSTED_PROXIES.to_string(),
                error,
            });

        let policies = self.policies.iter().flat_map(|(name, spec)| {
            validate_policy(spec)
                .err()
                .map(|PolicyErrors(errors)| errors)
                .unwrap_or_default()
                .into_iter()
                .map(move |error| ConfigIssue {
                    scope: name.clone(),
                    error,
                })
        });

        proxies.chain(policies).collect()
    }

    /// Save configuration to YAML file atomically
    ///
    /// Uses tempfile + rename pattern to prevent corruption on crash.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let path = path.as_ref();
        let content = serde_yaml::to_string(self).with_context(|| "Failed to serialize config")?;

        // Create temporary file in the same directory for atomic rename
        let parent_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for config")?;

        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(path)
            .with_context(|| format!("Failed to persist config file: {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn trusted_proxy_set(&self) -> Result<TrustedProxySet, AclError> {
        validate_trusted_proxies(&self.trusted_proxies).map_err(|errors| AclError::InvalidPolicy {
            resource: TRUSTED_PROXIES.to_string(),
            errors,
        })
    }

    pub fn policy_spec(&self, resource: &str) -> Result<&PolicySpec, AclError> {
        self.policies
            .get(resource)
            .ok_or_else(|| AclError::UnknownResource(resource.to_string()))
    }

    /// Strictly validated policy of `resource`.
    pub fn policy(&self, resource: &str) -> Result<Policy, AclError> {
        validate_policy(self.policy_spec(resource)?).map_err(|errors| AclError::InvalidPolicy {
            resource: resource.to_string(),
            errors,
        })
    }

    /// Build the request-path evaluator.
    ///
    /// Stored policies are loaded leniently: an entry that does not parse is
    /// logged and ignored rather than taking the resource down.
    pub fn gatekeeper(&self) -> Result<Gatekeeper, AclError> {
        let gate = Gatekeeper::new(self.trusted_proxy_set()?);
        gate.registry().replace_all(
            self.policies
                .iter()
                .map(|(name, spec)| (name.clone(), load_policy_lenient(name, spec))),
        );
        Ok(gate)
    }
}
