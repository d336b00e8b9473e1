//! Configuration file of the CLI.
//!
//! The configuration is stored as TOML. It names the folder that holds the
//! project folders and the API host the pipelines talk to.
//!
//! ```toml
//! project_home = "/home/me/pipelines"
//! translate_remote_errors = true
//!
//! [api]
//! base_url = "https://akab-xxxx.luna.akamaiapis.net"
//! account_switch_key = "1-5C0YLB:1-8BYUX"
//!
//! [api.headers]
//! Authorization = "EG1-HMAC-SHA256 ..."
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use papi_client::{ClientConfig, PapiClient};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "devops.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Settings shared by every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Folder holding one sub folder per project
    #[serde(default = "default_project_home")]
    pub project_home: PathBuf,

    /// Map locations in remote validation errors back to template and variable files
    #[serde(default = "default_translate_remote_errors")]
    pub translate_remote_errors: bool,

    /// Remote API connection
    #[serde(default)]
    pub api: ClientConfig,
}

fn default_project_home() -> PathBuf {
    PathBuf::from(".")
}

fn default_translate_remote_errors() -> bool {
    true
}

impl AppConfig {
    /// Loads configuration from a TOML file at the specified path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file doesn't exist, can't be read, or
    /// contains invalid TOML.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read configuration file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse configuration file: {}", e)))
    }

    /// Saves the configuration as pretty TOML, creating parent folders as needed.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        debug!("Saving configuration to {:?}", path);

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
            }
        }

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write configuration file: {}", e)))?;

        info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Checks that the configuration can be used to run commands.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the API base URL is missing, or when a client
    /// can't be built from the API settings.
    pub fn validate(&self) -> Result<(), Error> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url must be set".to_string()));
        }
        if self.project_home.as_os_str().is_empty() {
            return Err(Error::Config("project_home must not be empty".to_string()));
        }
        self.client().map(|_| ())
    }

    /// Builds the API client described by the `[api]` table.
    pub fn client(&self) -> Result<PapiClient, Error> {
        PapiClient::new(&self.api).map_err(|e| Error::Config(e.to_string()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_home: default_project_home(),
            translate_remote_errors: default_translate_remote_errors(),
            api: ClientConfig::default(),
        }
    }
}
