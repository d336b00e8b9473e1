//! Resource links returned by create operations and the ids embedded in them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "links_tests.rs"]
mod tests;

static PROPERTY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/papi/v0/properties/(?:prp_)?(\d+)(?:[/?]|$)").unwrap());
static VERSION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/papi/v0/properties/(?:prp_)?\d+/versions/(\d+)").unwrap());
static ACTIVATION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/papi/v0/properties/(?:prp_)?\d+/activations/(?:atv_)?(\d+)").unwrap()
});
static EDGE_HOSTNAME_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/papi/v[01]/edgehostnames/(?:ehn_)?(\d+)").unwrap());

fn extract(regex: &Regex, link: &str) -> Result<u64> {
    let id = regex
        .captures(link)
        .and_then(|captures| captures.get(1))
        .and_then(|id| id.as_str().parse().ok())
        .ok_or_else(|| Error::InvalidLink(link.to_string()))?;
    debug!(link = link, id = id, "Extracted id from link");
    Ok(id)
}

/// Response of a property creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyLink {
    pub property_link: String,
}

impl PropertyLink {
    pub fn property_id(&self) -> Result<u64> {
        extract(&PROPERTY_ID, &self.property_link)
    }
}

/// Response of a version creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionLink {
    pub version_link: String,
}

impl VersionLink {
    pub fn version(&self) -> Result<u64> {
        extract(&VERSION_ID, &self.version_link)
    }
}

/// Response of an activation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationLink {
    pub activation_link: String,
}

impl ActivationLink {
    pub fn activation_id(&self) -> Result<u64> {
        extract(&ACTIVATION_ID, &self.activation_link)
    }
}

/// Response of an edge hostname creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeHostnameLink {
    pub edge_hostname_link: String,
}

impl EdgeHostnameLink {
    pub fn edge_hostname_id(&self) -> Result<u64> {
        extract(&EDGE_HOSTNAME_ID, &self.edge_hostname_link)
    }
}
