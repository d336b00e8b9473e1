//! Wire models for the property API.
//!
//! Objects that are persisted by callers keep any fields this crate does not model
//! in an `extra` map so they survive a load/save round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Activation target network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Staging,
    Production,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Staging, Network::Production];

    /// The complementary network.
    pub fn other(self) -> Network {
        match self {
            Network::Staging => Network::Production,
            Network::Production => Network::Staging,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Staging => "STAGING",
            Network::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STAGING" => Ok(Network::Staging),
            "PRODUCTION" => Ok(Network::Production),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Status of a version or activation on one network.
///
/// Values the API reports that are not listed here are kept verbatim in
/// [`ActivationStatus::Other`] and treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivationStatus {
    Pending,
    Active,
    Failed,
    Aborted,
    Deactivated,
    Inactive,
    Other(String),
}

impl ActivationStatus {
    /// Returns `true` once the status can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActivationStatus::Active
                | ActivationStatus::Failed
                | ActivationStatus::Aborted
                | ActivationStatus::Deactivated
                | ActivationStatus::Inactive
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActivationStatus::Pending => "PENDING",
            ActivationStatus::Active => "ACTIVE",
            ActivationStatus::Failed => "FAILED",
            ActivationStatus::Aborted => "ABORTED",
            ActivationStatus::Deactivated => "DEACTIVATED",
            ActivationStatus::Inactive => "INACTIVE",
            ActivationStatus::Other(status) => status,
        }
    }
}

impl From<String> for ActivationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => ActivationStatus::Pending,
            "ACTIVE" => ActivationStatus::Active,
            "FAILED" => ActivationStatus::Failed,
            "ABORTED" => ActivationStatus::Aborted,
            "DEACTIVATED" => ActivationStatus::Deactivated,
            "INACTIVE" => ActivationStatus::Inactive,
            _ => ActivationStatus::Other(value),
        }
    }
}

impl From<ActivationStatus> for String {
    fn from(value: ActivationStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an activation makes a version live or takes it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivationType {
    #[default]
    Activate,
    Deactivate,
}

/// Snapshot of one property version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub property_version: u64,
    pub staging_status: ActivationStatus,
    pub production_status: ActivationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_format: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VersionInfo {
    pub fn status(&self, network: Network) -> &ActivationStatus {
        match network {
            Network::Staging => &self.staging_status,
            Network::Production => &self.production_status,
        }
    }

    pub fn set_status(&mut self, network: Network, status: ActivationStatus) {
        match network {
            Network::Staging => self.staging_status = status,
            Network::Production => self.production_status = status,
        }
    }
}

/// Errors and warnings reported for a rule tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesFeedback {
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub warnings: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// State of an activation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    pub property_version: u64,
    pub network: Network,
    pub status: ActivationStatus,
    #[serde(default)]
    pub activation_type: ActivationType,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a property creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
    pub product_id: String,
    pub property_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_format: Option<String>,
}

/// Body of an activation or deactivation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationRequest {
    pub property_version: u64,
    pub network: Network,
    pub note: String,
    pub notify_emails: Vec<String>,
    pub acknowledge_all_warnings: bool,
    pub activation_type: ActivationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_record: Option<ComplianceRecord>,
}

impl ActivationRequest {
    pub fn new(
        property_version: u64,
        network: Network,
        activation_type: ActivationType,
        notify_emails: Vec<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            property_version,
            network,
            note: note.into(),
            notify_emails,
            acknowledge_all_warnings: true,
            activation_type,
            compliance_record: Some(ComplianceRecord::default()),
        }
    }
}

/// Change management compliance information attached to activations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceRecord {
    pub noncompliance_reason: String,
}

impl Default for ComplianceRecord {
    fn default() -> Self {
        Self {
            noncompliance_reason: "NO_PRODUCTION_TRAFFIC".to_string(),
        }
    }
}

/// A hostname served by a property version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyHostname {
    pub cname_from: String,
    pub cname_to: Option<String>,
    #[serde(default = "default_cname_type")]
    pub cname_type: String,
    pub edge_hostname_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_version_behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_enrollment_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_provisioning_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_cname_type() -> String {
    "EDGE_HOSTNAME".to_string()
}

impl PropertyHostname {
    /// A hostname record pointing `cname_from` at `cname_to`, not yet bound to an edge hostname.
    pub fn new(cname_from: impl Into<String>, cname_to: impl Into<String>) -> Self {
        Self {
            cname_from: cname_from.into(),
            cname_to: Some(cname_to.into()),
            cname_type: default_cname_type(),
            edge_hostname_id: None,
            ip_version_behavior: None,
            cert_enrollment_id: None,
            cert_provisioning_type: None,
            extra: Map::new(),
        }
    }
}

/// An existing edge hostname.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeHostname {
    pub edge_hostname_id: Value,
    pub edge_hostname_domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_version_behavior: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EdgeHostname {
    /// Numeric id, accepting both `123` and `"ehn_123"`.
    pub fn id(&self) -> Result<u64, Error> {
        let id = match &self.edge_hostname_id {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.strip_prefix("ehn_").unwrap_or(text).parse().ok(),
            _ => None,
        };
        id.ok_or_else(|| {
            Error::InvalidResponse(format!(
                "edge hostname '{}' has invalid id {}",
                self.edge_hostname_domain, self.edge_hostname_id
            ))
        })
    }
}

/// Body of an edge hostname creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEdgeHostnameRequest {
    pub product_id: String,
    pub ip_version_behavior: String,
    pub domain_prefix: String,
    pub domain_suffix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_enrollment_id: Option<u64>,
}

/// `{"items": [...]}` collection envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VersionsEnvelope {
    pub versions: Items<VersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ActivationsEnvelope {
    pub activations: Items<Activation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EdgeHostnamesEnvelope {
    pub edge_hostnames: Items<EdgeHostname>,
}
