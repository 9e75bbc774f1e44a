//! Normalize command implementation.

use anyhow::Result;

use crate::entry::Entry;
use crate::validation::validate_entry;

/// Run the normalize command
pub fn run(value: &str) -> Result<()> {
    let entry = validate_entry(value)?;
    println!("{}", entry);
    if let Some(network) = network_form(&entry) {
        println!("network: {}", network);
    }
    Ok(())
}

/// The entry with host bits cleared, if that differs from the entry as written.
pub fn network_form(entry: &Entry) -> Option<Entry> {
    match *entry {
        Entry::Network { base, prefix_len } if entry.network_address() != base => {
            Some(Entry::Network {
                base: entry.network_address(),
                prefix_len,
            })
        }
        _ => None,
    }
}
