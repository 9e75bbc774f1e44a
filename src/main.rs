//! ipacl - IP access-control policy evaluator for API gateways
//!
//! Operator front-end over the policy library: check, resolve, preview and edit.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ipacl::cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    match cli.command {
        Commands::Check {
            ip,
            resource,
            headers,
            json,
        } => ipacl::commands::check::run(&ip, &resource, &headers, json, &cli.config),
        Commands::Resolve {
            peer,
            resource,
            trust,
            headers,
        } => ipacl::commands::resolve::run(&peer, resource.as_deref(), trust, &headers, &cli.config),
        Commands::Preview {
            resource,
            peer,
            headers,
            json,
        } => ipacl::commands::preview::run(&resource, &peer, &headers, json, &cli.config),
        Commands::Validate => ipacl::commands::validate::run(&cli.config),
        Commands::Normalize { value } => ipacl::commands::normalize::run(&value),
        Commands::Entry { action } => ipacl::commands::entry::run(action, &cli.config),
        Commands::Version => {
            println!("ipacl {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
