//! Crate for interacting with the property configuration REST API.
//!
//! The [`PropertyClient`] trait is the contract the pipeline engine consumes. The
//! [`PapiClient`] implements it over HTTP. Request signing is not performed here:
//! any authentication headers are supplied through [`ClientConfig::headers`] or by
//! a proxy in front of the API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};
use url::Url;

pub mod errors;
pub use errors::{Error, Result};

pub mod links;
pub use links::{ActivationLink, EdgeHostnameLink, PropertyLink, VersionLink};

pub mod models;
pub use models::{
    Activation, ActivationRequest, ActivationStatus, ActivationType, ComplianceRecord,
    CreateEdgeHostnameRequest, CreatePropertyRequest, EdgeHostname, Network, PropertyHostname,
    RulesFeedback, VersionInfo,
};
use models::{ActivationsEnvelope, EdgeHostnamesEnvelope, VersionsEnvelope};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Operations of the property API used by the pipeline.
#[async_trait]
pub trait PropertyClient: Send + Sync {
    /// Creates a property in the given contract and group.
    async fn create_property(
        &self,
        contract_id: &str,
        group_id: &str,
        request: &CreatePropertyRequest,
    ) -> Result<PropertyLink>;

    /// Creates a new editable version based on `create_from_version`.
    async fn create_property_version(
        &self,
        property_id: u64,
        create_from_version: u64,
        etag: Option<&str>,
    ) -> Result<VersionLink>;

    /// Fetches the most recent version of a property.
    async fn get_latest_version(&self, property_id: u64) -> Result<VersionInfo>;

    /// Fetches a specific version of a property.
    async fn get_version(&self, property_id: u64, version: u64) -> Result<VersionInfo>;

    /// Validates a rule tree against a version without storing it.
    ///
    /// Schema violations may be reported either in the response or as a 400
    /// error, see [`Error::is_validation_feedback`].
    async fn validate_rules(
        &self,
        property_id: u64,
        version: u64,
        rules: &Value,
        rule_format: Option<&str>,
    ) -> Result<RulesFeedback>;

    /// Stores a rule tree on a version.
    async fn store_rules(
        &self,
        property_id: u64,
        version: u64,
        rules: &Value,
        rule_format: Option<&str>,
    ) -> Result<RulesFeedback>;

    /// Replaces the hostnames of a version.
    async fn store_hostnames(
        &self,
        property_id: u64,
        version: u64,
        hostnames: &[PropertyHostname],
    ) -> Result<Value>;

    /// Requests activation or deactivation of a version on a network.
    async fn activate(
        &self,
        property_id: u64,
        request: &ActivationRequest,
    ) -> Result<ActivationLink>;

    /// Fetches the state of an activation request.
    async fn get_activation(&self, property_id: u64, activation_id: u64) -> Result<Activation>;

    /// Lists the edge hostnames available in a contract and group.
    async fn list_edge_hostnames(
        &self,
        contract_id: &str,
        group_id: &str,
    ) -> Result<Vec<EdgeHostname>>;

    /// Creates an edge hostname.
    async fn create_edge_hostname(
        &self,
        contract_id: &str,
        group_id: &str,
        request: &CreateEdgeHostnameRequest,
    ) -> Result<EdgeHostnameLink>;
}

/// Settings used to construct a [`PapiClient`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API host, e.g. `https://akab-xxxx.luna.akamaiapis.net`
    pub base_url: String,
    /// Account switch key appended to every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_switch_key: Option<String>,
    /// Extra headers sent with every request
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// HTTP implementation of [`PropertyClient`].
#[derive(Debug, Clone)]
pub struct PapiClient {
    http: reqwest::Client,
    base_url: Url,
    account_switch_key: Option<String>,
}

impl PapiClient {
    /// Creates a client from the given settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if the base URL cannot be parsed, the
    /// account switch key contains query delimiters, or a header is malformed.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::InvalidConfiguration(format!("invalid base url '{}': {e}", config.base_url))
        })?;

        if let Some(key) = &config.account_switch_key {
            if key.contains(['?', '&', '=']) {
                return Err(Error::InvalidConfiguration(format!(
                    "account switch key '{key}' must not contain '?', '&' or '='"
                )));
            }
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::InvalidConfiguration(format!("invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::InvalidConfiguration(format!("invalid value for header '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            account_switch_key: config.account_switch_key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> Result<RequestBuilder> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| Error::InvalidConfiguration(format!("invalid request path '{path}': {e}")))?;

        let mut pairs: Vec<(&str, &str)> = query.to_vec();
        if let Some(key) = &self.account_switch_key {
            pairs.push(("accountSwitchKey", key.as_str()));
        }
        if !pairs.is_empty() {
            let mut serializer = url.query_pairs_mut();
            for (name, value) in pairs {
                serializer.append_pair(name, value);
            }
        }

        debug!(method = %method, url = %url, "Sending API request");
        Ok(self.http.request(method, url))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "API request could not be sent");
            Error::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let body = serde_json::from_str(&body).unwrap_or(Value::String(body));
            error!(status = status.as_u16(), body = %body, "API request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(status = status.as_u16(), error = %e, "Failed to deserialize API response");
            Error::Deserialization(e)
        })
    }

    fn rules_request(
        &self,
        property_id: u64,
        version: u64,
        rules: &Value,
        rule_format: Option<&str>,
        dry_run: bool,
    ) -> Result<RequestBuilder> {
        let path = format!("/papi/v0/properties/{property_id}/versions/{version}/rules");
        let query: &[(&str, &str)] = if dry_run { &[("dryRun", "true")] } else { &[] };
        let content_type = match rule_format {
            Some(format) => format!("application/vnd.akamai.papirules.{format}+json"),
            None => "application/json".to_string(),
        };
        let mut request = self
            .request(Method::PUT, &path, query)?
            .header(CONTENT_TYPE, content_type.as_str())
            .body(rules.to_string());
        if rule_format.is_some() && !dry_run {
            request = request.header(ACCEPT, content_type);
        }
        Ok(request)
    }
}

#[async_trait]
impl PropertyClient for PapiClient {
    #[instrument(skip(self, request), fields(property_name = %request.property_name))]
    async fn create_property(
        &self,
        contract_id: &str,
        group_id: &str,
        request: &CreatePropertyRequest,
    ) -> Result<PropertyLink> {
        info!(
            contract_id = contract_id,
            group_id = group_id,
            product_id = %request.product_id,
            "Creating property"
        );
        let builder = self
            .request(
                Method::POST,
                "/papi/v0/properties",
                &[("contractId", contract_id), ("groupId", group_id)],
            )?
            .json(request);
        self.send(builder).await
    }

    #[instrument(skip(self, etag))]
    async fn create_property_version(
        &self,
        property_id: u64,
        create_from_version: u64,
        etag: Option<&str>,
    ) -> Result<VersionLink> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CreateVersion<'a> {
            create_from_version: u64,
            #[serde(skip_serializing_if = "Option::is_none")]
            create_from_version_etag: Option<&'a str>,
        }

        info!("Creating property version");
        let builder = self
            .request(
                Method::POST,
                &format!("/papi/v0/properties/{property_id}/versions/"),
                &[],
            )?
            .json(&CreateVersion {
                create_from_version,
                create_from_version_etag: etag,
            });
        self.send(builder).await
    }

    #[instrument(skip(self))]
    async fn get_latest_version(&self, property_id: u64) -> Result<VersionInfo> {
        let builder = self.request(
            Method::GET,
            &format!("/papi/v0/properties/{property_id}/versions/latest"),
            &[],
        )?;
        let envelope: VersionsEnvelope = self.send(builder).await?;
        first_item(envelope.versions.items, "versions")
    }

    #[instrument(skip(self))]
    async fn get_version(&self, property_id: u64, version: u64) -> Result<VersionInfo> {
        let builder = self.request(
            Method::GET,
            &format!("/papi/v0/properties/{property_id}/versions/{version}"),
            &[],
        )?;
        let envelope: VersionsEnvelope = self.send(builder).await?;
        first_item(envelope.versions.items, "versions")
    }

    #[instrument(skip(self, rules))]
    async fn validate_rules(
        &self,
        property_id: u64,
        version: u64,
        rules: &Value,
        rule_format: Option<&str>,
    ) -> Result<RulesFeedback> {
        info!("Validating rule tree");
        let builder = self.rules_request(property_id, version, rules, rule_format, true)?;
        self.send(builder).await
    }

    #[instrument(skip(self, rules))]
    async fn store_rules(
        &self,
        property_id: u64,
        version: u64,
        rules: &Value,
        rule_format: Option<&str>,
    ) -> Result<RulesFeedback> {
        info!("Storing rule tree");
        let builder = self.rules_request(property_id, version, rules, rule_format, false)?;
        self.send(builder).await
    }

    #[instrument(skip(self, hostnames), fields(hostname_count = hostnames.len()))]
    async fn store_hostnames(
        &self,
        property_id: u64,
        version: u64,
        hostnames: &[PropertyHostname],
    ) -> Result<Value> {
        info!("Storing property hostnames");
        let builder = self
            .request(
                Method::PUT,
                &format!("/papi/v0/properties/{property_id}/versions/{version}/hostnames"),
                &[],
            )?
            .json(hostnames);
        self.send(builder).await
    }

    #[instrument(skip(self, request), fields(network = %request.network, version = request.property_version))]
    async fn activate(
        &self,
        property_id: u64,
        request: &ActivationRequest,
    ) -> Result<ActivationLink> {
        info!(activation_type = ?request.activation_type, "Requesting activation");
        let builder = self
            .request(
                Method::POST,
                &format!("/papi/v0/properties/{property_id}/activations"),
                &[],
            )?
            .json(request);
        self.send(builder).await
    }

    #[instrument(skip(self))]
    async fn get_activation(&self, property_id: u64, activation_id: u64) -> Result<Activation> {
        let builder = self.request(
            Method::GET,
            &format!("/papi/v0/properties/{property_id}/activations/{activation_id}"),
            &[],
        )?;
        let envelope: ActivationsEnvelope = self.send(builder).await?;
        first_item(envelope.activations.items, "activations")
    }

    #[instrument(skip(self))]
    async fn list_edge_hostnames(
        &self,
        contract_id: &str,
        group_id: &str,
    ) -> Result<Vec<EdgeHostname>> {
        let builder = self.request(
            Method::GET,
            "/papi/v0/edgehostnames",
            &[("contractId", contract_id), ("groupId", group_id)],
        )?;
        let envelope: EdgeHostnamesEnvelope = self.send(builder).await?;
        info!(
            count = envelope.edge_hostnames.items.len(),
            "Listed edge hostnames"
        );
        Ok(envelope.edge_hostnames.items)
    }

    #[instrument(skip(self, request), fields(prefix = %request.domain_prefix, suffix = %request.domain_suffix))]
    async fn create_edge_hostname(
        &self,
        contract_id: &str,
        group_id: &str,
        request: &CreateEdgeHostnameRequest,
    ) -> Result<EdgeHostnameLink> {
        info!("Creating edge hostname");
        let builder = self
            .request(
                Method::POST,
                "/papi/v0/edgehostnames",
                &[("contractId", contract_id), ("groupId", group_id)],
            )?
            .json(request);
        self.send(builder).await
    }
}

fn first_item<T>(items: Vec<T>, collection: &str) -> Result<T> {
    items.into_iter().next().ok_or_else(|| {
        Error::InvalidResponse(format!("response contained no {collection} items"))
    })
}

