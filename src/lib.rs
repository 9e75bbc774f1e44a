//! # ipacl - IP Access-Control Policy Evaluator
//!
//! One implementation of the per-resource IP access policy of an API
//! gateway, shared by the request path and the admin console's pre-save
//! preview so the two can never disagree.
//!
//! ## Features
//!
//! - **Dual-stack** - IPv4 and IPv6 literals and CIDR networks, normalized at parse time
//! - **Blacklist first** - a blacklist match denies regardless of mode or whitelist
//! - **Proxy aware** - X-Forwarded-For / X-Real-IP honored only from trusted proxies
//! - **Pure** - evaluation performs no I/O and never fails
//! - **Consistent snapshots** - policies are published as whole-value swaps
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         ipacl                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  address   parse IPv4/IPv6 literals into fixed-width ints   │
//! │  entry     literal | network/prefix                         │
//! │  matcher   CIDR containment, family isolation               │
//! │  policy    blacklist → allow_all | whitelist                │
//! │  resolver  effective client address behind proxies         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  preview     self-lockout and list warnings for editors     │
//! │  validation  textual policy ⇄ typed policy                  │
//! │  analysis    overlaps, duplicates, aggregation (ipnet)      │
//! │  snapshot    Gatekeeper, PolicyRegistry (parking_lot)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap) + Config (serde_yaml)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use ipacl::address;
//! use ipacl::policy::{evaluate, DenyReason};
//! use ipacl::resolver::{resolve_effective_address, ForwardedHeaders, TrustedProxySet};
//! use ipacl::validation::{validate_policy, PolicySpec};
//! use ipacl::entry::Entry;
//!
//! let spec: PolicySpec = serde_yaml::from_str(r#"
//! mode: whitelist
//! whitelist: ["198.51.100.0/24"]
//! blacklist: ["198.51.100.66"]
//! trust_forwarded_for: true
//! "#).unwrap();
//! let policy = validate_policy(&spec).unwrap();
//!
//! let proxies: TrustedProxySet = [Entry::parse("192.0.2.1").unwrap()].into_iter().collect();
//! let headers = ForwardedHeaders::new().with_forwarded_for("198.51.100.66, 192.0.2.1");
//! let peer = address::parse("192.0.2.1").unwrap();
//!
//! let client = resolve_effective_address(peer, &headers, policy.trust_forwarded_for, &proxies);
//! let decision = evaluate(client, &policy);
//! assert_eq!(decision.reason, Some(DenyReason::Blacklisted));
//! ```
//!
//! ## Modules
//!
//! - [`address`] - Address parsing and normalization
//! - [`entry`] - Literal and CIDR list entries
//! - [`matcher`] - Entry matching
//! - [`policy`] - Policy evaluation
//! - [`resolver`] - Effective client address resolution
//! - [`preview`] - Pre-save consistency preview
//! - [`validation`] - Textual policy validation
//! - [`analysis`] - Overlap and duplicate detection, aggregation
//! - [`snapshot`] - Whole-value policy publication
//! - [`config`] - Configuration parsing and validation
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`utils`] - Output formatting helpers

pub mod address;
pub mod analysis;
pub mod cli;
pub mod commands;
pub mod config;
pub mod entry;
pub mod error;
pub mod matcher;
pub mod policy;
pub mod preview;
pub mod resolver;
pub mod snapshot;
pub mod utils;
pub mod validation;

pub use address::{parse, Address, AddressFamily};
pub use config::Config;
pub use entry::Entry;
pub use error::{AclError, ParseError};
pub use matcher::{matches, matches_any};
pub use policy::{evaluate, Decision, DenyReason, Policy, PolicyMode};
pub use preview::{preview, Preview, PreviewWarning};
pub use resolver::{resolve_effective_address, ForwardedHeaders, TrustedProxySet};
pub use snapshot::{Gatekeeper, PolicyRegistry};
