//! CLI command implementations.

pub mod check;
pub mod entry;
pub mod normalize;
pub mod preview;
pub mod resolve;
pub mod validate;

use anyhow::Result;
use std::path::Path;

use crate::config::Config;

/// Load the configuration, falling back to defaults when the file does not exist.
pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        Config::load(config_path)
    } else {
        Ok(Config::default())
    }
}
