//! Promotion state machine of a single environment.
//!
//! An [`Environment`] holds no state of its own between calls. Every operation
//! loads the persisted [`EnvironmentRecord`] from the [`ProjectStore`], talks to the
//! property API, and writes the record back. Change detection is fingerprint based:
//! a merge records the fingerprint of its inputs, and validation, saving and
//! promotion compare that fingerprint against the ones they last acted on.

use papi_client::{
    Activation, ActivationRequest, ActivationStatus, ActivationType, CreatePropertyRequest,
    Network, PropertyClient, PropertyHostname, RulesFeedback, VersionInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use template_engine::{document_hash, MergeMode, MergeResult, Merger, PathResolution};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{DevOpsError, DevOpsResult};
use crate::hostnames::{HostnameProvisioner, ProvisionResult};
use crate::naming::{NamingStrategy, PipelineNaming};
use crate::record::EnvironmentRecord;
use crate::store::{ProjectStore, StoreMergeSource};

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;

/// Name of the template every merge starts from.
pub const ENTRY_TEMPLATE: &str = "main.json";

const DEFAULT_ACTIVATION_NOTE: &str = "Pipeline activation";

/// Options of [`Environment::create`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Reuse a property already recorded for the environment.
    pub retry: bool,
    /// Serve the environment's hostnames over TLS.
    pub secure: bool,
    /// Bind to this property instead of creating one.
    pub property_id: Option<u64>,
}

/// Result of [`Environment::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// File the merged document was written to
    pub file_name: String,
    /// Fingerprint of the merge inputs
    pub hash: Option<String>,
    pub changes_detected: bool,
    pub validation_performed: bool,
    pub validation_warnings: Vec<Value>,
    pub validation_errors: Vec<Value>,
}

/// Result of [`Environment::save`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    #[serde(flatten)]
    pub merge: MergeOutcome,
    pub stored_rules: bool,
    pub edge_hostnames: ProvisionResult,
    pub stored_hostnames: bool,
    pub hostname_errors: Vec<Value>,
}

/// Result of [`Environment::promote`] and [`Environment::deactivate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionOutcome {
    pub network: Network,
    pub activation_id: u64,
    pub record: EnvironmentRecord,
}

/// Versions known to be latest and live on each network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionStatus {
    pub latest_version: Option<u64>,
    pub active_in_staging_version: Option<u64>,
    pub active_in_production_version: Option<u64>,
}

impl PromotionStatus {
    fn of(record: &EnvironmentRecord) -> Self {
        Self {
            latest_version: record
                .latest_version_info
                .as_ref()
                .map(|info| info.property_version),
            active_in_staging_version: record
                .active_info(Network::Staging)
                .map(|info| info.property_version),
            active_in_production_version: record
                .active_info(Network::Production)
                .map(|info| info.property_version),
        }
    }
}

/// Result of [`Environment::check_promotions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionCheck {
    /// Latest state of every activation that was pending, per network
    #[serde(rename = "promotionUpdates")]
    pub updates: BTreeMap<Network, Activation>,
    #[serde(rename = "promotionStatus")]
    pub status: PromotionStatus,
}

/// One stage of a pipeline, backed by one remote property.
pub struct Environment {
    name: String,
    store: Arc<dyn ProjectStore>,
    client: Arc<dyn PropertyClient>,
    naming: Arc<dyn NamingStrategy>,
    merge_mode: MergeMode,
    translate_errors: bool,
}

impl Environment {
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn ProjectStore>,
        client: Arc<dyn PropertyClient>,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            client,
            naming: Arc::new(PipelineNaming),
            merge_mode: MergeMode::Declared,
            translate_errors: false,
        }
    }

    pub fn with_naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_merge_mode(mut self, merge_mode: MergeMode) -> Self {
        self.merge_mode = merge_mode;
        self
    }

    /// Translates error locations reported by the API back to template sources.
    pub fn with_error_translation(mut self, enabled: bool) -> Self {
        self.translate_errors = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the remote property backing this environment.
    pub fn resource_name(&self) -> String {
        self.naming
            .resource_name(self.store.project_name(), &self.name)
    }

    /// The persisted record.
    ///
    /// # Errors
    ///
    /// `Dependency` when the environment has not been created yet.
    pub fn record(&self) -> DevOpsResult<EnvironmentRecord> {
        self.store
            .environment_record(&self.name)?
            .ok_or_else(|| {
                DevOpsError::dependency(
                    format!("Environment '{}' has not been created yet", self.name),
                    "missing_environment_info",
                )
            })
    }

    fn store_record(&self, record: &EnvironmentRecord) -> DevOpsResult<()> {
        self.store.store_environment_record(record)
    }

    /// Creates the remote property and records its latest version.
    ///
    /// In retry mode a property already recorded for the environment is reused, and
    /// `options.property_id` binds the environment to a property created elsewhere.
    /// The secure flag sticks once set.
    /// The environment's hostname records are rewritten from the naming strategy.
    #[instrument(skip(self), fields(environment = %self.name))]
    pub async fn create(&self, options: CreateOptions) -> DevOpsResult<EnvironmentRecord> {
        let project = self.store.project_info()?;
        let property_name = self.resource_name();
        let mut record = self
            .store
            .environment_record(&self.name)?
            .unwrap_or_else(|| EnvironmentRecord::new(&self.name, &property_name));

        let property_id = match (record.property_id, options.property_id) {
            (_, Some(shared)) => {
                info!(
                    property = %property_name,
                    property_id = shared,
                    "Binding environment to existing property"
                );
                if record.property_id != Some(shared) {
                    record.property_id = Some(shared);
                    record.latest_version_info = None;
                }
                shared
            }
            (Some(id), None) if options.retry => {
                info!(
                    property = %property_name,
                    property_id = id,
                    "Property already exists and is tied to environment"
                );
                id
            }
            _ => {
                info!(property = %property_name, "Creating property");
                let request = CreatePropertyRequest {
                    product_id: project.product_id.clone(),
                    property_name: property_name.clone(),
                    rule_format: None,
                };
                let link = self
                    .client
                    .create_property(&project.contract_id, &project.group_id.to_string(), &request)
                    .await?;
                let id = link.property_id()?;
                record.property_id = Some(id);
                record.latest_version_info = None;
                id
            }
        };
        let secure = options.secure || record.is_secure == Some(true);
        if secure {
            record.is_secure = Some(true);
        }
        if record.latest_version_info.is_none() {
            let latest = self.client.get_latest_version(property_id).await?;
            debug!(version = latest.property_version, "Fetched latest version");
            record.latest_version_info = Some(latest);
        }
        self.store_record(&record)?;

        let hostnames =
            self.naming
                .hostname_records(self.store.project_name(), &self.name, secure);
        self.store.store_hostnames(&self.name, &hostnames)?;
        info!(property_id = property_id, "Environment created");
        Ok(record)
    }

    /// Returns `true` when the latest version can no longer be edited because it is
    /// (or was) active or pending on a network.
    pub fn is_locked(&self) -> DevOpsResult<bool> {
        Ok(is_locked(&self.record()?))
    }

    pub fn is_active(&self, network: Network) -> DevOpsResult<bool> {
        Ok(self.record()?.active_info(network).is_some())
    }

    pub fn is_pending_promotion(&self) -> DevOpsResult<bool> {
        Ok(!self.record()?.pending_activations.is_empty())
    }

    /// Returns `true` when the merged rules or the hostnames changed since the last
    /// save. Runs a merge to bring the fingerprint up to date.
    pub async fn is_dirty(&self) -> DevOpsResult<bool> {
        self.merge(false).await?;
        let record = self.record()?;
        let hostnames_hash = hostnames_hash(&self.store.hostnames(&self.name)?);
        Ok(rules_dirty(&record)
            || record.last_saved_hostnames_hash.as_deref() != Some(hostnames_hash.as_str()))
    }

    /// Versions currently recorded as latest and active.
    pub fn promotion_status(&self) -> DevOpsResult<PromotionStatus> {
        Ok(PromotionStatus::of(&self.record()?))
    }

    fn merge_document(&self) -> DevOpsResult<MergeResult> {
        let source = StoreMergeSource {
            store: self.store.as_ref(),
            environment: &self.name,
        };
        Ok(Merger::new(&source)
            .with_mode(self.merge_mode)
            .merge(ENTRY_TEMPLATE)?)
    }

    /// Maps a `/` separated location in the merged document back to the template
    /// and variable files it came from.
    pub fn resolve_path(&self, path: &str) -> DevOpsResult<PathResolution> {
        let source = StoreMergeSource {
            store: self.store.as_ref(),
            environment: &self.name,
        };
        Ok(Merger::new(&source)
            .with_mode(self.merge_mode)
            .resolve_path(path, ENTRY_TEMPLATE)?)
    }

    /// Merges the environment's template and variables into a rule tree.
    ///
    /// The merged document is always written out. When the fingerprint changed, or
    /// the current fingerprint was never validated, the record is updated and, if
    /// `validate` is set, the rule tree is validated remotely. Otherwise the results
    /// of the last save are reported again.
    #[instrument(skip(self), fields(environment = %self.name))]
    pub async fn merge(&self, validate: bool) -> DevOpsResult<MergeOutcome> {
        let (outcome, _) = self.merge_and_validate(validate).await?;
        Ok(outcome)
    }

    async fn merge_and_validate(&self, validate: bool) -> DevOpsResult<(MergeOutcome, Value)> {
        let mut record = self.record()?;
        let merged = self.merge_document()?;
        let file_name = self
            .store
            .store_merged_document(&self.resource_name(), &merged.document)?;
        let mut outcome = MergeOutcome {
            file_name,
            hash: record.environment_hash.clone(),
            ..Default::default()
        };

        let changed = record.environment_hash.as_deref() != Some(merged.fingerprint.as_str());
        if !changed && record.last_validated_hash == record.environment_hash {
            debug!("No changes since last validation");
            outcome.validation_warnings = record.last_save_warnings.clone();
            outcome.validation_errors = record.last_save_errors.clone();
            return Ok((outcome, merged.document));
        }

        if changed {
            info!(fingerprint = %merged.fingerprint, "Merge inputs changed");
            outcome.changes_detected = true;
            outcome.hash = Some(merged.fingerprint.clone());
            record.environment_hash = Some(merged.fingerprint.clone());
            record.rule_tree_hash = Some(merged.document_hash.clone());
            self.store_record(&record)?;
        }

        if validate && record.last_validated_hash != record.environment_hash {
            let property_id = property_id(&record)?;
            let version = self.ensure_editable_version(&mut record).await?;
            info!(property_id = property_id, version = version, "Validating rule tree");
            let feedback = match self
                .client
                .validate_rules(
                    property_id,
                    version,
                    &merged.document,
                    record.suggested_rule_format.as_deref(),
                )
                .await
            {
                Ok(feedback) => {
                    outcome.validation_performed = true;
                    record.last_validated_hash = record.environment_hash.clone();
                    feedback
                }
                Err(e) if e.is_validation_feedback() => {
                    warn!("Rule tree rejected by schema validation");
                    e.validation_feedback().unwrap_or_default()
                }
                Err(e) => {
                    error!(error = %e, "Validation request failed");
                    return Err(e.into());
                }
            };
            self.record_feedback(&mut record, feedback);
            outcome.validation_warnings = record.last_save_warnings.clone();
            outcome.validation_errors = record.last_save_errors.clone();
            self.store_record(&record)?;
        }
        Ok((outcome, merged.document))
    }

    /// Stores the merged rule tree and the hostnames on the latest version.
    ///
    /// Each half is only sent when its hash differs from the last successful save,
    /// so saving twice without changes makes no remote store calls. Validation
    /// errors and hostname problems are recorded and returned rather than raised.
    #[instrument(skip(self), fields(environment = %self.name))]
    pub async fn save(&self) -> DevOpsResult<SaveOutcome> {
        let (merge, document) = self.merge_and_validate(false).await?;
        let mut record = self.record()?;
        let property_id = property_id(&record)?;
        let mut hostnames = self.store.hostnames(&self.name)?;
        let hostnames_dirty = record.last_saved_hostnames_hash.as_deref()
            != Some(hostnames_hash(&hostnames).as_str());
        let rules_dirty = rules_dirty(&record);

        let mut outcome = SaveOutcome {
            merge,
            ..Default::default()
        };
        if !rules_dirty && !hostnames_dirty {
            info!("Nothing to save");
            outcome.hostname_errors = record.last_save_hostname_errors.clone();
            return Ok(outcome);
        }

        let version = self.ensure_editable_version(&mut record).await?;

        if rules_dirty {
            info!(property_id = property_id, version = version, "Storing rule tree");
            match self
                .client
                .store_rules(
                    property_id,
                    version,
                    &document,
                    record.suggested_rule_format.as_deref(),
                )
                .await
            {
                Ok(feedback) => {
                    if let Some(latest) = record.latest_version_info.as_mut() {
                        if feedback.etag.is_some() {
                            latest.etag = feedback.etag.clone();
                        }
                    }
                    record.last_saved_hash = record.environment_hash.clone();
                    record.last_validated_hash = record.environment_hash.clone();
                    outcome.stored_rules = true;
                    self.record_feedback(&mut record, feedback);
                }
                Err(e) if e.is_validation_feedback() => {
                    warn!("Rule tree rejected by schema validation");
                    self.record_feedback(&mut record, e.validation_feedback().unwrap_or_default());
                }
                Err(e) => {
                    error!(error = %e, "Storing rule tree failed");
                    return Err(e.into());
                }
            }
            self.store_record(&record)?;
        }
        outcome.merge.validation_warnings = record.last_save_warnings.clone();
        outcome.merge.validation_errors = record.last_save_errors.clone();

        if hostnames_dirty {
            let project = self.store.project_info()?;
            let provisioned = HostnameProvisioner::new(self.client.as_ref(), &project)
                .provision(&mut hostnames)
                .await;
            if provisioned.has_changes() {
                self.store.store_hostnames(&self.name, &hostnames)?;
            }
            record.last_save_hostname_errors =
                provisioned.errors.iter().map(|issue| json!(issue)).collect();
            if provisioned.errors.is_empty() {
                info!(property_id = property_id, version = version, "Storing hostnames");
                self.client
                    .store_hostnames(property_id, version, &hostnames)
                    .await?;
                record.last_saved_hostnames_hash = Some(hostnames_hash(&hostnames));
                outcome.stored_hostnames = true;
            } else {
                warn!(
                    error_count = provisioned.errors.len(),
                    "Hostnames not stored because of edge hostname problems"
                );
            }
            outcome.edge_hostnames = provisioned;
            self.store_record(&record)?;
        }
        outcome.hostname_errors = record.last_save_hostname_errors.clone();
        Ok(outcome)
    }

    /// Activates the latest version on `network`.
    ///
    /// Saves first, then refuses when validation or hostname errors are recorded,
    /// when the latest version is already active on the network, or when the saved
    /// state does not match the current merge inputs.
    #[instrument(skip(self, notify_emails), fields(environment = %self.name))]
    pub async fn promote(
        &self,
        network: Network,
        notify_emails: &[String],
        message: Option<&str>,
    ) -> DevOpsResult<PromotionOutcome> {
        check_pending(&self.record()?, network)?;
        self.save().await?;

        let mut record = self.record()?;
        if !record.last_save_errors.is_empty() {
            return Err(DevOpsError::validation(
                format!(
                    "Environment '{}' has validation errors, please fix before promoting",
                    self.name
                ),
                "validation_errors_present",
                record.last_save_errors.clone(),
            ));
        }
        if !record.last_save_hostname_errors.is_empty() {
            return Err(DevOpsError::validation(
                format!(
                    "Environment '{}' has hostname errors, please fix before promoting",
                    self.name
                ),
                "hostname_errors_present",
                record.last_save_hostname_errors.clone(),
            ));
        }
        let latest = latest_version(&record)?;
        if latest.status(network) == &ActivationStatus::Active {
            return Err(DevOpsError::AlreadyActive {
                network,
                version: latest.property_version,
            });
        }
        check_saved_state(&record, &hostnames_hash(&self.store.hostnames(&self.name)?))?;

        let version = latest.property_version;
        let activation_id = self
            .request_activation(
                &record,
                version,
                network,
                ActivationType::Activate,
                notify_emails,
                message,
            )
            .await?;
        if let Some(latest) = record.latest_version_info.as_mut() {
            latest.set_status(network, ActivationStatus::Pending);
        }
        mark_other_snapshot_pending(&mut record, network, version);
        record.pending_activations.insert(network, activation_id);
        self.store_record(&record)?;

        Ok(PromotionOutcome {
            network,
            activation_id,
            record,
        })
    }

    /// Takes the version active on `network` down.
    #[instrument(skip(self, notify_emails), fields(environment = %self.name))]
    pub async fn deactivate(
        &self,
        network: Network,
        notify_emails: &[String],
        message: Option<&str>,
    ) -> DevOpsResult<PromotionOutcome> {
        let mut record = self.record()?;
        check_pending(&record, network)?;
        let version = record
            .active_info(network)
            .map(|info| info.property_version)
            .ok_or(DevOpsError::NotActive { network })?;

        let activation_id = self
            .request_activation(
                &record,
                version,
                network,
                ActivationType::Deactivate,
                notify_emails,
                message,
            )
            .await?;
        if let Some(active) = record.active_info_mut(network) {
            active.set_status(network, ActivationStatus::Pending);
        }
        if let Some(latest) = record.latest_version_info.as_mut() {
            if latest.property_version == version {
                latest.set_status(network, ActivationStatus::Pending);
            }
        }
        mark_other_snapshot_pending(&mut record, network, version);
        record.pending_activations.insert(network, activation_id);
        self.store_record(&record)?;

        Ok(PromotionOutcome {
            network,
            activation_id,
            record,
        })
    }

    async fn request_activation(
        &self,
        record: &EnvironmentRecord,
        version: u64,
        network: Network,
        activation_type: ActivationType,
        notify_emails: &[String],
        message: Option<&str>,
    ) -> DevOpsResult<u64> {
        let property_id = property_id(record)?;
        let request = ActivationRequest::new(
            version,
            network,
            activation_type,
            notify_emails.to_vec(),
            message.unwrap_or(DEFAULT_ACTIVATION_NOTE),
        );
        info!(
            property_id = property_id,
            version = version,
            activation_type = ?activation_type,
            "Requesting activation"
        );
        let link = self.client.activate(property_id, &request).await?;
        let activation_id = link.activation_id()?;
        info!(activation_id = activation_id, "Activation requested");
        Ok(activation_id)
    }

    /// Polls every pending activation and records the ones that finished.
    #[instrument(skip(self), fields(environment = %self.name))]
    pub async fn check_promotions(&self) -> DevOpsResult<PromotionCheck> {
        let mut record = self.record()?;
        let mut updates = BTreeMap::new();
        if record.pending_activations.is_empty() {
            return Ok(PromotionCheck {
                updates,
                status: PromotionStatus::of(&record),
            });
        }
        let property_id = property_id(&record)?;
        let mut changed = false;

        let pending = record.pending_activations.clone();
        for (network, activation_id) in pending {
            let activation = self
                .client
                .get_activation(property_id, activation_id)
                .await?;
            debug!(
                network = %network,
                activation_id = activation_id,
                status = %activation.status,
                "Polled activation"
            );
            if activation.network == network && activation.status.is_terminal() {
                info!(
                    network = %network,
                    activation_id = activation_id,
                    status = %activation.status,
                    "Activation finished"
                );
                self.apply_finished_activation(&mut record, property_id, network, &activation)
                    .await?;
                record.pending_activations.remove(&network);
                changed = true;
            }
            updates.insert(network, activation);
        }

        if changed {
            self.store_record(&record)?;
        }
        Ok(PromotionCheck {
            updates,
            status: PromotionStatus::of(&record),
        })
    }

    async fn apply_finished_activation(
        &self,
        record: &mut EnvironmentRecord,
        property_id: u64,
        network: Network,
        activation: &Activation,
    ) -> DevOpsResult<()> {
        let version = activation.property_version;
        let info = self.client.get_version(property_id, version).await?;

        if record
            .latest_version_info
            .as_ref()
            .is_some_and(|latest| latest.property_version == version)
        {
            record.latest_version_info = Some(info.clone());
        }
        match (activation.activation_type, &activation.status) {
            (ActivationType::Activate, ActivationStatus::Active) => {
                record.set_active_info(network, Some(info.clone()));
            }
            (
                ActivationType::Deactivate,
                ActivationStatus::Active | ActivationStatus::Deactivated,
            ) => {
                record.set_active_info(network, None);
            }
            _ => {
                warn!(
                    network = %network,
                    status = %activation.status,
                    "Activation ended without taking effect"
                );
                if let Some(active) = record.active_info(network).map(|a| a.property_version) {
                    let refreshed = self.client.get_version(property_id, active).await?;
                    record.set_active_info(network, Some(refreshed));
                }
            }
        }

        let other = network.other();
        if let Some(other_version) = record.active_info(other).map(|a| a.property_version) {
            let refreshed = if other_version == version {
                info
            } else {
                self.client.get_version(property_id, other_version).await?
            };
            record.set_active_info(other, Some(refreshed));
        }
        Ok(())
    }

    /// Records validation feedback, translating error locations when enabled.
    fn record_feedback(&self, record: &mut EnvironmentRecord, feedback: RulesFeedback) {
        let RulesFeedback {
            mut errors,
            mut warnings,
            ..
        } = feedback;
        self.translate_locations(&mut errors);
        self.translate_locations(&mut warnings);
        if !errors.is_empty() {
            warn!(error_count = errors.len(), "Rule tree has validation errors");
        }
        record.last_save_errors = errors;
        record.last_save_warnings = warnings;
    }

    fn translate_locations(&self, entries: &mut [Value]) {
        if !self.translate_errors {
            return;
        }
        for entry in entries.iter_mut() {
            let Some(fields) = entry.as_object_mut() else {
                continue;
            };
            for key in ["errorLocation", "location"] {
                let Some(pointer) = fields.get(key).and_then(Value::as_str).map(str::to_string)
                else {
                    continue;
                };
                let path = pointer.trim_start_matches('#').trim_start_matches('/');
                match self.resolve_path(path) {
                    Ok(resolution) => {
                        fields.insert(key.to_string(), resolution_to_json(resolution));
                    }
                    Err(e) => {
                        warn!(location = %pointer, error = %e, "Can't translate error location");
                    }
                }
            }
        }
    }

    /// Makes sure the latest version is editable, creating a new version from it
    /// when it is locked. Returns the editable version number.
    async fn ensure_editable_version(&self, record: &mut EnvironmentRecord) -> DevOpsResult<u64> {
        let latest = latest_version(record)?;
        if !is_locked(record) {
            return Ok(latest.property_version);
        }
        check_pending(record, Network::Staging)?;
        check_pending(record, Network::Production)?;

        let property_id = property_id(record)?;
        let from_version = latest.property_version;
        info!(property_id = property_id, from_version = from_version, "Creating new version");
        let link = self
            .client
            .create_property_version(property_id, from_version, latest.etag.as_deref())
            .await?;
        let info = self.client.get_version(property_id, link.version()?).await?;
        let version = info.property_version;
        record.latest_version_info = Some(info);
        self.store_record(record)?;
        Ok(version)
    }
}

fn is_locked(record: &EnvironmentRecord) -> bool {
    record.latest_version_info.as_ref().is_some_and(|latest| {
        Network::ALL
            .iter()
            .any(|network| latest.status(*network) != &ActivationStatus::Inactive)
    })
}

fn rules_dirty(record: &EnvironmentRecord) -> bool {
    record.last_saved_hash.is_none() || record.last_saved_hash != record.environment_hash
}

fn hostnames_hash(hostnames: &[PropertyHostname]) -> String {
    document_hash(&json!(hostnames))
}

/// Fails unless the last save stored exactly the current rules and hostnames.
fn check_saved_state(record: &EnvironmentRecord, hostnames_hash: &str) -> DevOpsResult<()> {
    if rules_dirty(record) {
        return Err(DevOpsError::dependency(
            "Environment data has changed since last save, please merge and save first",
            "cannot_promote_unexpected_changes",
        ));
    }
    if record.last_saved_hostnames_hash.as_deref() != Some(hostnames_hash) {
        return Err(DevOpsError::dependency(
            "Hostname data has changed since last save, please merge and save first",
            "cannot_promote_unexpected_hostname_changes",
        ));
    }
    Ok(())
}

fn property_id(record: &EnvironmentRecord) -> DevOpsResult<u64> {
    record.property_id.ok_or_else(|| {
        DevOpsError::dependency(
            format!("Environment '{}' has no property, create it first", record.name),
            "missing_property_id",
        )
    })
}

fn latest_version(record: &EnvironmentRecord) -> DevOpsResult<VersionInfo> {
    record.latest_version_info.clone().ok_or_else(|| {
        DevOpsError::dependency(
            format!("Environment '{}' has no version information, create it first", record.name),
            "missing_latest_version",
        )
    })
}

fn check_pending(record: &EnvironmentRecord, network: Network) -> DevOpsResult<()> {
    match record.pending_activation(network) {
        Some(activation_id) => Err(DevOpsError::PendingActivation {
            network,
            activation_id,
        }),
        None => Ok(()),
    }
}

/// The other network's active snapshot describes the same version, so its status
/// on `network` changes as well.
fn mark_other_snapshot_pending(record: &mut EnvironmentRecord, network: Network, version: u64) {
    if let Some(other) = record.active_info_mut(network.other()) {
        if other.property_version == version {
            other.set_status(network, ActivationStatus::Pending);
        }
    }
}

fn resolution_to_json(resolution: PathResolution) -> Value {
    json!({
        "template": resolution.template,
        "variables": resolution.variables,
        "location": resolution.location,
        "value": resolution.value,
    })
}
