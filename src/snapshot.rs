//! Whole-value publication of policies and the trusted proxy set.
//!
//! Readers take an `Arc` snapshot and evaluate against it without holding
//! any lock; writers replace the whole value. An in-flight evaluation never
//! sees a half-updated policy.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::address::Address;
use crate::policy::{evaluate, Decision, Policy};
use crate::resolver::{resolve_effective_address, ForwardedHeaders, TrustedProxySet};

/// A value replaced atomically as a whole.
#[derive(Debug, Default)]
pub struct Snapshot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// Current value. The lock is held only for the `Arc` clone.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Publish a new value, returning the previous one.
    pub fn store(&self, value: T) -> Arc<T> {
        std::mem::replace(&mut *self.current.write(), Arc::new(value))
    }
}

impl<T: Clone> Snapshot<T> {
    /// Publish a modified copy of the current value.
    ///
    /// Concurrent `update` calls are serialized by the write lock, so none of
    /// them is lost.
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        let mut guard = self.current.write();
        let mut next = T::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }
}

/// Policies of all protected resources, keyed by resource name.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: Snapshot<HashMap<String, Arc<Policy>>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the policy of `resource`.
    pub fn publish(&self, resource: &str, policy: Policy) {
        let policy = Arc::new(policy);
        self.policies.update(|map| {
            map.insert(resource.to_string(), policy);
        });
        info!("Published policy for '{}'", resource);
    }

    /// Replace every policy at once (configuration reload).
    pub fn replace_all<I>(&self, policies: I)
    where
        I: IntoIterator<Item = (String, Policy)>,
    {
        let map: HashMap<String, Arc<Policy>> = policies
            .into_iter()
            .map(|(name, policy)| (name, Arc::new(policy)))
            .collect();
        let count = map.len();
        self.policies.store(map);
        info!("Published {} policies", count);
    }

    pub fn remove(&self, resource: &str) -> bool {
        let mut removed = false;
        self.policies.update(|map| removed = map.remove(resource).is_some());
        removed
    }

    pub fn get(&self, resource: &str) -> Option<Arc<Policy>> {
        self.policies.load().get(resource).cloned()
    }

    pub fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.policies.load().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.policies.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.load().is_empty()
    }
}

/// Request-path entry point: resolve the client address and evaluate the
/// resource's policy against consistent snapshots.
#[derive(Debug, Default)]
pub struct Gatekeeper {
    trusted_proxies: Snapshot<TrustedProxySet>,
    registry: PolicyRegistry,
}

impl Gatekeeper {
    pub fn new(trusted_proxies: TrustedProxySet) -> Self {
        Self {
            trusted_proxies: Snapshot::new(trusted_proxies),
            registry: PolicyRegistry::new(),
        }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn trusted_proxies(&self) -> Arc<TrustedProxySet> {
        self.trusted_proxies.load()
    }

    pub fn reload_trusted_proxies(&self, proxies: TrustedProxySet) {
        let count = proxies.len();
        self.trusted_proxies.store(proxies);
        info!("Reloaded trusted proxies ({} entries)", count);
    }

    /// Check a request against the policy of `resource`.
    ///
    /// Returns `None` for a resource without a policy; the caller decides
    /// what an unprotected resource means.
    pub fn check(
        &self,
        resource: &str,
        peer: Address,
        headers: &ForwardedHeaders,
    ) -> Option<(Address, Decision)> {
        let policy = self.registry.get(resource)?;
        let proxies = self.trusted_proxies.load();
        let client = resolve_effective_address(peer, headers, policy.trust_forwarded_for, &proxies);
        let decision = evaluate(client, &policy);
        debug!(
            "{} {} (peer {}) -> {}",
            resource,
            client,
            peer,
            match decision.reason {
                None => "allowed".to_string(),
                Some(reason) => format!("denied: {}", reason),
            }
        );
        Some((client, decision))
    }
}
