//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Write a default config file under the base directory
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let config = Config::load_from(base_dir)?;

    if config.paths.config_file.exists() && !force {
        return Err(Error::Config(format!(
            "Already initialized at {}",
            config.paths.config_file.display()
        )));
    }

    config.save()?;
    Ok(config.paths.config_file.clone())
}
