//! Persisted state of one environment.

use papi_client::{Network, VersionInfo};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;

/// Everything the pipeline remembers about an environment between runs.
///
/// The hashes drive change detection: `environment_hash` is the fingerprint of the
/// last merge, and the other hashes record which fingerprint was last validated or
/// saved. Fields not modelled here are kept in `extra`. The four feedback lists
/// are always written, empty or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentRecord {
    pub name: String,
    pub property_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_tree_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved_hostnames_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_rule_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version_info: Option<VersionInfo>,
    #[serde(
        rename = "activeIn_STAGING_Info",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub active_in_staging_info: Option<VersionInfo>,
    #[serde(
        rename = "activeIn_PRODUCTION_Info",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub active_in_production_info: Option<VersionInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pending_activations: BTreeMap<Network, u64>,
    #[serde(default)]
    pub last_save_errors: Vec<Value>,
    #[serde(default)]
    pub last_save_warnings: Vec<Value>,
    #[serde(default)]
    pub last_save_hostname_errors: Vec<Value>,
    #[serde(default)]
    pub last_save_hostname_warnings: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EnvironmentRecord {
    pub fn new(name: impl Into<String>, property_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_name: property_name.into(),
            ..Default::default()
        }
    }

    /// Snapshot of the version last seen active on `network`.
    pub fn active_info(&self, network: Network) -> Option<&VersionInfo> {
        match network {
            Network::Staging => self.active_in_staging_info.as_ref(),
            Network::Production => self.active_in_production_info.as_ref(),
        }
    }

    pub fn active_info_mut(&mut self, network: Network) -> Option<&mut VersionInfo> {
        match network {
            Network::Staging => self.active_in_staging_info.as_mut(),
            Network::Production => self.active_in_production_info.as_mut(),
        }
    }

    pub fn set_active_info(&mut self, network: Network, info: Option<VersionInfo>) {
        match network {
            Network::Staging => self.active_in_staging_info = info,
            Network::Production => self.active_in_production_info = info,
        }
    }

    /// Id of the activation in flight on `network`, if any.
    pub fn pending_activation(&self, network: Network) -> Option<u64> {
        self.pending_activations.get(&network).copied()
    }
}
