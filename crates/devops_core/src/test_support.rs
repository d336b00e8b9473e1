//! In-memory collaborators shared by the unit tests of this crate.

use async_trait::async_trait;
use papi_client::{
    Activation, ActivationLink, ActivationRequest, ActivationStatus, ActivationType,
    CreateEdgeHostnameRequest, CreatePropertyRequest, EdgeHostname, EdgeHostnameLink, PropertyClient,
    PropertyHostname, PropertyLink, RulesFeedback, VersionInfo, VersionLink,
};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use template_engine::SourceDocument;

use crate::errors::{DevOpsError, DevOpsResult};
use crate::record::EnvironmentRecord;
use crate::store::{ProjectInfo, ProjectStore};

pub(crate) const PROPERTY_ID: u64 = 411089;

fn version(number: u64) -> VersionInfo {
    VersionInfo {
        property_version: number,
        staging_status: ActivationStatus::Inactive,
        production_status: ActivationStatus::Inactive,
        etag: Some(format!("etag-{number}")),
        rule_format: Some("v2017-06-19".to_string()),
        extra: Map::new(),
    }
}

fn not_found(what: &str) -> papi_client::Error {
    papi_client::Error::Api {
        status: 404,
        body: json!({"title": format!("{what} not found")}),
    }
}

#[derive(Default)]
struct RemoteState {
    versions: BTreeMap<u64, VersionInfo>,
    activations: BTreeMap<u64, Activation>,
    edge_hostnames: Vec<EdgeHostname>,
    validation_feedback: RulesFeedback,
    store_feedback: RulesFeedback,
    schema_invalid_body: Option<Value>,
    fail_edge_hostname_creation: bool,
}

/// Simulates the property API for a single property and records every call.
#[derive(Default)]
pub(crate) struct MockPropertyClient {
    calls: Mutex<Vec<String>>,
    state: Mutex<RemoteState>,
}

impl MockPropertyClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls to the named operation.
    pub(crate) fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.split(' ').next() == Some(operation))
            .count()
    }

    pub(crate) fn with_validation_feedback(self, feedback: RulesFeedback) -> Self {
        self.state.lock().unwrap().validation_feedback = feedback;
        self
    }

    pub(crate) fn with_store_feedback(self, feedback: RulesFeedback) -> Self {
        self.state.lock().unwrap().store_feedback = feedback;
        self
    }

    /// Makes validation answer with a 400 schema violation carrying `body`.
    pub(crate) fn with_schema_invalid_response(self, body: Value) -> Self {
        self.state.lock().unwrap().schema_invalid_body = Some(body);
        self
    }

    pub(crate) fn with_edge_hostname(self, domain: &str, id: &str, ip_version: &str) -> Self {
        self.state.lock().unwrap().edge_hostnames.push(EdgeHostname {
            edge_hostname_id: json!(id),
            edge_hostname_domain: domain.to_string(),
            ip_version_behavior: Some(ip_version.to_string()),
            extra: Map::new(),
        });
        self
    }

    pub(crate) fn with_failing_edge_hostname_creation(self) -> Self {
        self.state.lock().unwrap().fail_edge_hostname_creation = true;
        self
    }

    pub(crate) fn remote_version(&self, number: u64) -> Option<VersionInfo> {
        self.state.lock().unwrap().versions.get(&number).cloned()
    }

    /// Moves an activation to `status`, updating version states like the API does.
    pub(crate) fn complete_activation(&self, activation_id: u64, status: ActivationStatus) {
        let mut state = self.state.lock().unwrap();
        let Some(activation) = state.activations.get_mut(&activation_id) else {
            panic!("unknown activation {activation_id}");
        };
        activation.status = status.clone();
        let activation = activation.clone();
        if status != ActivationStatus::Active {
            return;
        }
        match activation.activation_type {
            ActivationType::Activate => {
                for info in state.versions.values_mut() {
                    if info.status(activation.network) == &ActivationStatus::Active {
                        info.set_status(activation.network, ActivationStatus::Deactivated);
                    }
                }
                if let Some(info) = state.versions.get_mut(&activation.property_version) {
                    info.set_status(activation.network, ActivationStatus::Active);
                }
            }
            ActivationType::Deactivate => {
                if let Some(info) = state.versions.get_mut(&activation.property_version) {
                    info.set_status(activation.network, ActivationStatus::Deactivated);
                }
            }
        }
    }

    fn rules_feedback(&self, feedback: RulesFeedback) -> papi_client::Result<RulesFeedback> {
        match &self.state.lock().unwrap().schema_invalid_body {
            Some(body) => Err(papi_client::Error::Api {
                status: 400,
                body: body.clone(),
            }),
            None => Ok(feedback),
        }
    }
}

#[async_trait]
impl PropertyClient for MockPropertyClient {
    async fn create_property(
        &self,
        contract_id: &str,
        group_id: &str,
        request: &CreatePropertyRequest,
    ) -> papi_client::Result<PropertyLink> {
        self.record(format!("create_property {}", request.property_name));
        self.state.lock().unwrap().versions.insert(1, version(1));
        Ok(PropertyLink {
            property_link: format!(
                "/papi/v0/properties/prp_{PROPERTY_ID}?contractId={contract_id}&groupId={group_id}"
            ),
        })
    }

    async fn create_property_version(
        &self,
        property_id: u64,
        create_from_version: u64,
        _etag: Option<&str>,
    ) -> papi_client::Result<VersionLink> {
        self.record(format!("create_property_version {property_id} {create_from_version}"));
        let mut state = self.state.lock().unwrap();
        let next = state.versions.keys().max().copied().unwrap_or(0) + 1;
        state.versions.insert(next, version(next));
        Ok(VersionLink {
            version_link: format!("/papi/v0/properties/prp_{property_id}/versions/{next}"),
        })
    }

    async fn get_latest_version(&self, property_id: u64) -> papi_client::Result<VersionInfo> {
        self.record(format!("get_latest_version {property_id}"));
        let state = self.state.lock().unwrap();
        state
            .versions
            .values()
            .last()
            .cloned()
            .ok_or_else(|| not_found("property"))
    }

    async fn get_version(&self, property_id: u64, version: u64) -> papi_client::Result<VersionInfo> {
        self.record(format!("get_version {property_id} {version}"));
        self.remote_version(version)
            .ok_or_else(|| not_found("version"))
    }

    async fn validate_rules(
        &self,
        property_id: u64,
        version: u64,
        _rules: &Value,
        _rule_format: Option<&str>,
    ) -> papi_client::Result<RulesFeedback> {
        self.record(format!("validate_rules {property_id} {version}"));
        let feedback = self.state.lock().unwrap().validation_feedback.clone();
        self.rules_feedback(feedback)
    }

    async fn store_rules(
        &self,
        property_id: u64,
        version: u64,
        _rules: &Value,
        _rule_format: Option<&str>,
    ) -> papi_client::Result<RulesFeedback> {
        self.record(format!("store_rules {property_id} {version}"));
        let mut feedback = self.state.lock().unwrap().store_feedback.clone();
        feedback.etag = Some(format!("stored-etag-{version}"));
        self.rules_feedback(feedback)
    }

    async fn store_hostnames(
        &self,
        property_id: u64,
        version: u64,
        hostnames: &[PropertyHostname],
    ) -> papi_client::Result<Value> {
        self.record(format!("store_hostnames {property_id} {version}"));
        Ok(json!({"hostnames": {"items": hostnames}}))
    }

    async fn activate(
        &self,
        property_id: u64,
        request: &ActivationRequest,
    ) -> papi_client::Result<ActivationLink> {
        self.record(format!(
            "activate {property_id} {} {} {:?}",
            request.property_version, request.network, request.activation_type
        ));
        let mut state = self.state.lock().unwrap();
        let id = 5964934 + state.activations.len() as u64;
        state.activations.insert(
            id,
            Activation {
                property_version: request.property_version,
                network: request.network,
                status: ActivationStatus::Pending,
                activation_type: request.activation_type,
                extra: Map::new(),
            },
        );
        Ok(ActivationLink {
            activation_link: format!("/papi/v0/properties/prp_{property_id}/activations/atv_{id}"),
        })
    }

    async fn get_activation(
        &self,
        property_id: u64,
        activation_id: u64,
    ) -> papi_client::Result<Activation> {
        self.record(format!("get_activation {property_id} {activation_id}"));
        let state = self.state.lock().unwrap();
        state
            .activations
            .get(&activation_id)
            .cloned()
            .ok_or_else(|| not_found("activation"))
    }

    async fn list_edge_hostnames(
        &self,
        contract_id: &str,
        group_id: &str,
    ) -> papi_client::Result<Vec<EdgeHostname>> {
        self.record(format!("list_edge_hostnames {contract_id} {group_id}"));
        Ok(self.state.lock().unwrap().edge_hostnames.clone())
    }

    async fn create_edge_hostname(
        &self,
        contract_id: &str,
        group_id: &str,
        request: &CreateEdgeHostnameRequest,
    ) -> papi_client::Result<EdgeHostnameLink> {
        self.record(format!(
            "create_edge_hostname {}.{}",
            request.domain_prefix, request.domain_suffix
        ));
        let mut state = self.state.lock().unwrap();
        if state.fail_edge_hostname_creation {
            return Err(papi_client::Error::Api {
                status: 403,
                body: json!({"title": "Forbidden"}),
            });
        }
        let id = 2922843 + state.edge_hostnames.len() as u64;
        state.edge_hostnames.push(EdgeHostname {
            edge_hostname_id: json!(format!("ehn_{id}")),
            edge_hostname_domain: format!("{}.{}", request.domain_prefix, request.domain_suffix),
            ip_version_behavior: Some(request.ip_version_behavior.clone()),
            extra: Map::new(),
        });
        Ok(EdgeHostnameLink {
            edge_hostname_link: format!(
                "/papi/v0/edgehostnames/ehn_{id}?contractId={contract_id}&groupId={group_id}"
            ),
        })
    }
}

/// Project kept entirely in memory.
pub(crate) struct MemoryProjectStore {
    info: ProjectInfo,
    definitions: Mutex<Option<Value>>,
    values: Mutex<HashMap<String, Value>>,
    templates: Mutex<HashMap<String, Value>>,
    records: Mutex<HashMap<String, EnvironmentRecord>>,
    hostnames: Mutex<HashMap<String, Vec<PropertyHostname>>>,
    merged: Mutex<HashMap<String, Value>>,
    record_writes: Mutex<usize>,
}

impl MemoryProjectStore {
    pub(crate) fn new(project: &str, environments: &[&str]) -> Self {
        Self {
            info: ProjectInfo {
                product_id: "Web_App_Accel".to_string(),
                contract_id: "1-1TJZH5".to_string(),
                group_id: 61726,
                environments: environments.iter().map(|e| e.to_string()).collect(),
                name: project.to_string(),
                extra: Map::new(),
            },
            definitions: Mutex::new(Some(json!({"definitions": {}}))),
            values: Mutex::new(HashMap::new()),
            templates: Mutex::new(HashMap::new()),
            records: Mutex::new(HashMap::new()),
            hostnames: Mutex::new(HashMap::new()),
            merged: Mutex::new(HashMap::new()),
            record_writes: Mutex::new(0),
        }
    }

    /// A two environment project with a template using one variable with a default
    /// and one variable supplied per environment.
    pub(crate) fn with_sample_project() -> Self {
        let store = Self::new("testproject.com", &["qa", "prod"]);
        store.set_definitions(json!({
            "definitions": {
                "cpCode": {"type": "cpCode", "default": 244510},
                "originHostname": {"type": "hostname", "default": null}
            }
        }));
        store.set_values("qa", json!({"originHostname": "origin-qa.testproject.com"}));
        store.set_values("prod", json!({"originHostname": "origin-prod.testproject.com"}));
        store.set_template(
            "main.json",
            json!({
                "rules": {
                    "name": "default",
                    "options": {"is_secure": false},
                    "behaviors": [
                        {"name": "origin", "options": {"hostname": "${env.originHostname}"}},
                        {"name": "cpCode", "options": {"value": {"id": "${env.cpCode}"}}}
                    ]
                }
            }),
        );
        store
    }

    pub(crate) fn set_definitions(&self, document: Value) {
        *self.definitions.lock().unwrap() = Some(document);
    }

    pub(crate) fn remove_definitions(&self) {
        *self.definitions.lock().unwrap() = None;
    }

    pub(crate) fn set_values(&self, environment: &str, document: Value) {
        self.values
            .lock()
            .unwrap()
            .insert(environment.to_string(), document);
    }

    pub(crate) fn set_template(&self, name: &str, document: Value) {
        self.templates
            .lock()
            .unwrap()
            .insert(name.to_string(), document);
    }

    pub(crate) fn record(&self, environment: &str) -> EnvironmentRecord {
        self.records
            .lock()
            .unwrap()
            .get(environment)
            .cloned()
            .unwrap_or_else(|| panic!("no record for {environment}"))
    }

    pub(crate) fn put_record(&self, record: EnvironmentRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.name.clone(), record);
    }

    pub(crate) fn merged(&self, resource_name: &str) -> Option<Value> {
        self.merged.lock().unwrap().get(resource_name).cloned()
    }

    pub(crate) fn record_writes(&self) -> usize {
        *self.record_writes.lock().unwrap()
    }
}

fn missing(what: String) -> DevOpsError {
    DevOpsError::dependency(format!("{what} does not exist!"), "missing_file")
}

impl ProjectStore for MemoryProjectStore {
    fn project_name(&self) -> &str {
        &self.info.name
    }

    fn project_info(&self) -> DevOpsResult<ProjectInfo> {
        Ok(self.info.clone())
    }

    fn environment_record(&self, environment: &str) -> DevOpsResult<Option<EnvironmentRecord>> {
        Ok(self.records.lock().unwrap().get(environment).cloned())
    }

    fn store_environment_record(&self, record: &EnvironmentRecord) -> DevOpsResult<()> {
        *self.record_writes.lock().unwrap() += 1;
        self.put_record(record.clone());
        Ok(())
    }

    fn hostnames(&self, environment: &str) -> DevOpsResult<Vec<PropertyHostname>> {
        self.hostnames
            .lock()
            .unwrap()
            .get(environment)
            .cloned()
            .ok_or_else(|| missing(format!("hostnames of {environment}")))
    }

    fn store_hostnames(
        &self,
        environment: &str,
        hostnames: &[PropertyHostname],
    ) -> DevOpsResult<()> {
        self.hostnames
            .lock()
            .unwrap()
            .insert(environment.to_string(), hostnames.to_vec());
        Ok(())
    }

    fn variable_definitions(&self) -> DevOpsResult<SourceDocument> {
        self.definitions
            .lock()
            .unwrap()
            .clone()
            .map(|document| SourceDocument::new(document, "environments/variableDefinitions.json"))
            .ok_or_else(|| missing("environments/variableDefinitions.json".to_string()))
    }

    fn variable_values(&self, environment: &str) -> DevOpsResult<SourceDocument> {
        let document = self
            .values
            .lock()
            .unwrap()
            .get(environment)
            .cloned()
            .unwrap_or_else(|| json!({}));
        Ok(SourceDocument::new(
            document,
            format!("environments/{environment}/variables.json"),
        ))
    }

    fn template(&self, name: &str) -> DevOpsResult<SourceDocument> {
        self.templates
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .map(|document| SourceDocument::new(document, format!("templates/{name}")))
            .ok_or_else(|| missing(format!("templates/{name}")))
    }

    fn store_merged_document(
        &self,
        resource_name: &str,
        document: &Value,
    ) -> DevOpsResult<String> {
        self.merged
            .lock()
            .unwrap()
            .insert(resource_name.to_string(), document.clone());
        Ok(format!("{resource_name}.papi.json"))
    }
}
