//! CLI argument parsing with clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::resolver::ForwardedHeaders;

#[derive(Parser)]
#[command(name = "ipacl")]
#[command(author, version, about = "IP access-control policy evaluator for API gateways")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Forwarding headers as seen by the gateway for one request
#[derive(clap::Args, Debug, Clone, Default)]
pub struct HeaderArgs {
    /// X-Forwarded-For header value
    #[arg(long)]
    pub forwarded_for: Option<String>,

    /// X-Real-IP header value
    #[arg(long)]
    pub real_ip: Option<String>,
}

impl HeaderArgs {
    pub fn to_headers(&self) -> ForwardedHeaders {
        ForwardedHeaders {
            x_forwarded_for: self.forwarded_for.clone(),
            x_real_ip: self.real_ip.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether a request from an address is allowed for a resource
    Check {
        /// Direct peer address of the connection
        ip: String,

        /// Protected resource (policy name)
        #[arg(long, short)]
        resource: String,

        #[command(flatten)]
        headers: HeaderArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the effective client address for a connection
    Resolve {
        /// Direct peer address of the connection
        #[arg(long)]
        peer: String,

        /// Take the proxy-trust flag from this resource's policy
        #[arg(long, short)]
        resource: Option<String>,

        /// Trust forwarding headers (ignored when --resource is given)
        #[arg(long)]
        trust: bool,

        #[command(flatten)]
        headers: HeaderArgs,
    },

    /// Preview a resource's policy for an operator before saving
    Preview {
        /// Protected resource (policy name)
        #[arg(long, short)]
        resource: String,

        /// Operator's direct peer address
        #[arg(long)]
        peer: String,

        #[command(flatten)]
        headers: HeaderArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration, listing every invalid entry
    Validate,

    /// Print the canonical form of an address or CIDR entry
    Normalize {
        /// Address or CIDR
        value: String,
    },

    /// Manage whitelist/blacklist entries of a resource
    Entry {
        #[command(subcommand)]
        action: EntryAction,
    },

    /// Show version
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    Whitelist,
    Blacklist,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Whitelist => crate::validation::WHITELIST,
            ListKind::Blacklist => crate::validation::BLACKLIST,
        }
    }
}

#[derive(Subcommand)]
pub enum EntryAction {
    /// Add an IP/CIDR to a resource's list
    Add {
        /// Protected resource (created if missing)
        resource: String,
        /// Target list
        #[arg(value_enum)]
        list: ListKind,
        /// IP or CIDR to add
        entry: String,
        /// Your own address: warn if the edited policy would lock you out
        #[arg(long = "as")]
        operator: Option<String>,
    },
    /// Remove an IP/CIDR from a resource's list
    Del {
        /// Protected resource
        resource: String,
        /// Target list
        #[arg(value_enum)]
        list: ListKind,
        /// IP or CIDR to remove
        entry: String,
    },
    /// List a resource's policy
    List {
        /// Protected resource
        resource: String,
        /// Also show the lists merged into minimal networks
        #[arg(long)]
        compact: bool,
    },
}
