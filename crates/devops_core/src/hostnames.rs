//! Edge hostname provisioning.
//!
//! This module provides the [`HostnameProvisioner`], which makes sure every hostname
//! record of an environment points at an existing edge hostname, creating missing
//! edge hostnames where the domain allows it.

use papi_client::{CreateEdgeHostnameRequest, EdgeHostname, PropertyClient, PropertyHostname};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::store::ProjectInfo;

#[cfg(test)]
#[path = "hostnames_tests.rs"]
mod tests;

const EDGESUITE_SUFFIX: &str = "edgesuite.net";
const EDGEKEY_SUFFIX: &str = "edgekey.net";
const DEFAULT_IP_VERSION_BEHAVIOR: &str = "IPV6_COMPLIANCE";
const DEFAULT_CERT_PROVISIONING: &str = "DEFAULT";

/// A hostname problem found during provisioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostnameIssue {
    pub message: String,
    pub message_id: String,
    #[serde(rename = "edgehostname", default, skip_serializing_if = "Option::is_none")]
    pub edge_hostname: Option<String>,
}

impl HostnameIssue {
    fn new(message: impl Into<String>, message_id: &str, edge_hostname: Option<&str>) -> Self {
        Self {
            message: message.into(),
            message_id: message_id.to_string(),
            edge_hostname: edge_hostname.map(str::to_string),
        }
    }
}

/// An edge hostname bound to a hostname record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundEdgeHostname {
    pub name: String,
    pub id: u64,
}

/// Summary of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResult {
    pub hostnames_created: Vec<BoundEdgeHostname>,
    pub hostnames_found: Vec<BoundEdgeHostname>,
    pub errors: Vec<HostnameIssue>,
}

impl ProvisionResult {
    /// Returns `true` when any hostname record was changed.
    pub fn has_changes(&self) -> bool {
        !self.hostnames_created.is_empty() || !self.hostnames_found.is_empty()
    }
}

/// Binds hostname records to edge hostnames.
///
/// Problems with individual records are collected in [`ProvisionResult::errors`]
/// and never stop the remaining records from being processed.
pub struct HostnameProvisioner<'a> {
    client: &'a dyn PropertyClient,
    project: &'a ProjectInfo,
    existing: Option<HashMap<String, EdgeHostname>>,
}

impl<'a> HostnameProvisioner<'a> {
    pub fn new(client: &'a dyn PropertyClient, project: &'a ProjectInfo) -> Self {
        Self {
            client,
            project,
            existing: None,
        }
    }

    /// Fills in `edgeHostnameId` for every record that lacks one.
    ///
    /// # Behavior
    ///
    /// 1. Records that already have an id, or rely on default certificate
    ///    provisioning without an enrollment, are skipped
    /// 2. An existing edge hostname with the same domain is reused
    /// 3. Otherwise a new edge hostname is created under `edgesuite.net`, or under
    ///    `edgekey.net` when a certificate enrollment is given
    pub async fn provision(&mut self, hostnames: &mut [PropertyHostname]) -> ProvisionResult {
        info!(
            project = %self.project.name,
            hostname_count = hostnames.len(),
            "Provisioning edge hostnames"
        );
        let mut result = ProvisionResult::default();

        for hostname in hostnames.iter_mut() {
            if let Some(id) = hostname.edge_hostname_id {
                debug!(hostname = %hostname.cname_from, id = id, "Edge hostname already bound");
                continue;
            }
            if hostname.cert_provisioning_type.as_deref() == Some(DEFAULT_CERT_PROVISIONING)
                && hostname.cert_enrollment_id.is_none()
            {
                debug!(hostname = %hostname.cname_from, "Certificate provisioned by default, skipping");
                continue;
            }
            let Some(cname_to) = hostname.cname_to.clone() else {
                result.errors.push(HostnameIssue::new(
                    format!("cnameTo of hostname '{}' is null", hostname.cname_from),
                    "null_hostname_cnameTo",
                    None,
                ));
                continue;
            };

            match self.bind_existing(hostname, &cname_to).await {
                Ok(Some(bound)) => {
                    result.hostnames_found.push(bound);
                    continue;
                }
                Ok(None) => {}
                Err(issue) => {
                    result.errors.push(issue);
                    continue;
                }
            }

            match self.create(hostname, &cname_to).await {
                Ok(bound) => result.hostnames_created.push(bound),
                Err(issue) => result.errors.push(issue),
            }
        }

        for issue in &result.errors {
            warn!(
                message_id = %issue.message_id,
                edge_hostname = ?issue.edge_hostname,
                "{}",
                issue.message
            );
        }
        info!(
            created = result.hostnames_created.len(),
            found = result.hostnames_found.len(),
            errors = result.errors.len(),
            "Edge hostname provisioning complete"
        );
        result
    }

    /// Binds the record to an existing edge hostname with the same domain.
    async fn bind_existing(
        &mut self,
        hostname: &mut PropertyHostname,
        cname_to: &str,
    ) -> Result<Option<BoundEdgeHostname>, HostnameIssue> {
        let existing = self.existing_edge_hostnames(cname_to).await?;
        let Some(found) = existing.get(cname_to) else {
            return Ok(None);
        };

        if let Some(requested) = &hostname.ip_version_behavior {
            if found.ip_version_behavior.as_ref() != Some(requested) {
                return Err(HostnameIssue::new(
                    format!(
                        "'{cname_to}' already exists with ipVersionBehavior '{}', can't use '{requested}'",
                        found.ip_version_behavior.as_deref().unwrap_or("unknown")
                    ),
                    "hostname_exists",
                    Some(cname_to),
                ));
            }
        }
        let id = found.id().map_err(|e| {
            HostnameIssue::new(e.to_string(), "edgehostname_request_failed", Some(cname_to))
        })?;

        hostname.edge_hostname_id = Some(id);
        hostname.ip_version_behavior = found.ip_version_behavior.clone();
        info!(edge_hostname = cname_to, id = id, "Using existing edge hostname");
        Ok(Some(BoundEdgeHostname {
            name: cname_to.to_string(),
            id,
        }))
    }

    /// Lists the edge hostnames of the project's contract and group once per run.
    async fn existing_edge_hostnames(
        &mut self,
        cname_to: &str,
    ) -> Result<&HashMap<String, EdgeHostname>, HostnameIssue> {
        if self.existing.is_none() {
            let listed = self
                .client
                .list_edge_hostnames(&self.project.contract_id, &self.project.group_id.to_string())
                .await
                .map_err(|e| {
                    HostnameIssue::new(e.to_string(), "edgehostname_request_failed", Some(cname_to))
                })?;
            debug!(count = listed.len(), "Listed existing edge hostnames");
            self.existing = Some(
                listed
                    .into_iter()
                    .map(|edge| (edge.edge_hostname_domain.clone(), edge))
                    .collect(),
            );
        }
        Ok(self.existing.get_or_insert_with(HashMap::new))
    }

    async fn create(
        &self,
        hostname: &mut PropertyHostname,
        cname_to: &str,
    ) -> Result<BoundEdgeHostname, HostnameIssue> {
        let ip_version_behavior = hostname
            .ip_version_behavior
            .clone()
            .unwrap_or_else(|| DEFAULT_IP_VERSION_BEHAVIOR.to_string());

        let request = if let Some(prefix) = strip_domain(cname_to, EDGESUITE_SUFFIX) {
            CreateEdgeHostnameRequest {
                product_id: self.project.product_id.clone(),
                ip_version_behavior,
                domain_prefix: prefix.to_string(),
                domain_suffix: EDGESUITE_SUFFIX.to_string(),
                secure: None,
                cert_enrollment_id: None,
            }
        } else if let Some(prefix) = strip_domain(cname_to, EDGEKEY_SUFFIX) {
            let Some(enrollment) = hostname.cert_enrollment_id else {
                return Err(HostnameIssue::new(
                    format!("'{cname_to}' needs a certEnrollmentId to be created under '{EDGEKEY_SUFFIX}'"),
                    "missing_certEnrollmentId",
                    Some(cname_to),
                ));
            };
            CreateEdgeHostnameRequest {
                product_id: self.project.product_id.clone(),
                ip_version_behavior,
                domain_prefix: prefix.to_string(),
                domain_suffix: EDGEKEY_SUFFIX.to_string(),
                secure: Some(true),
                cert_enrollment_id: Some(enrollment),
            }
        } else {
            return Err(HostnameIssue::new(
                format!(
                    "'{cname_to}' is not a supported edge hostname for creation, needs to be under '{EDGESUITE_SUFFIX}' domain"
                ),
                "unsupported_edgehostname",
                Some(cname_to),
            ));
        };

        info!(
            edge_hostname = cname_to,
            domain_suffix = %request.domain_suffix,
            "Creating edge hostname"
        );
        let id = self
            .client
            .create_edge_hostname(
                &self.project.contract_id,
                &self.project.group_id.to_string(),
                &request,
            )
            .await
            .and_then(|link| link.edge_hostname_id())
            .map_err(|e| {
                HostnameIssue::new(e.to_string(), "edgehostname_request_failed", Some(cname_to))
            })?;

        hostname.edge_hostname_id = Some(id);
        Ok(BoundEdgeHostname {
            name: cname_to.to_string(),
            id,
        })
    }
}

/// The part of `domain` in front of `.{suffix}`, if any.
fn strip_domain<'d>(domain: &'d str, suffix: &str) -> Option<&'d str> {
    domain
        .strip_suffix(suffix)
        .and_then(|rest| rest.strip_suffix('.'))
        .filter(|prefix| !prefix.is_empty())
}
