use std::path::Path;

use clap::Subcommand;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "config_cmd_tests.rs"]
mod tests;

/// Subcommands for the config command
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create an initial configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the configuration file
    Validate,
}

/// Execute the config command against the file at `path`
#[instrument(skip(cmd))]
pub fn execute(cmd: &ConfigCommands, path: &Path) -> Result<Value, Error> {
    match cmd {
        ConfigCommands::Init { force } => init_config(path, *force),
        ConfigCommands::Validate => validate_config(path),
    }
}

fn init_config(path: &Path, force: bool) -> Result<Value, Error> {
    if path.exists() && !force {
        let err = Error::Config(format!(
            "Configuration file already exists at {:?}",
            path
        ));
        error!(message = "Configuration file already exists", path = ?path);
        return Err(err);
    }

    AppConfig::default().save(path)?;
    info!(message = "Configuration initialized", path = ?path);
    Ok(json!({ "configFile": path.display().to_string() }))
}

fn validate_config(path: &Path) -> Result<Value, Error> {
    let config = AppConfig::load(path)?;
    config.validate()?;
    info!(message = "Configuration is valid", path = ?path);
    Ok(json!({
        "configFile": path.display().to_string(),
        "projectHome": config.project_home.display().to_string(),
        "baseUrl": config.api.base_url,
        "valid": true,
    }))
}
