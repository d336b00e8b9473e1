//! Ordered set of environments sharing one project.

use papi_client::{Network, PropertyClient};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use template_engine::MergeMode;
use tracing::{info, instrument};

use crate::environment::{CreateOptions, Environment, PromotionOutcome};
use crate::errors::{DevOpsError, DevOpsResult};
use crate::naming::{NamingStrategy, PipelineNaming};
use crate::record::EnvironmentRecord;
use crate::store::ProjectStore;

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;

/// One row of [`Pipeline::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStatus {
    pub env_name: String,
    pub property_name: String,
    pub latest_version: Option<u64>,
    pub rule_format: Option<String>,
    pub staging_version: Option<u64>,
    pub production_version: Option<u64>,
}

/// Coordinates the environments of a project in promotion order.
///
/// The order comes from the project info; an environment may only be promoted
/// to a network once every environment before it is live there without pending
/// changes.
pub struct Pipeline {
    store: Arc<dyn ProjectStore>,
    client: Arc<dyn PropertyClient>,
    naming: Arc<dyn NamingStrategy>,
    merge_mode: MergeMode,
    translate_errors: bool,
}

impl Pipeline {
    pub fn new(store: Arc<dyn ProjectStore>, client: Arc<dyn PropertyClient>) -> Self {
        Self {
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

    pub fn with_error_translation(mut self, enabled: bool) -> Self {
        self.translate_errors = enabled;
        self
    }

    pub fn environment_names(&self) -> DevOpsResult<Vec<String>> {
        Ok(self.store.project_info()?.environments)
    }

    /// The environment called `name`.
    ///
    /// # Errors
    ///
    /// `Argument` when the project has no such environment.
    pub fn environment(&self, name: &str) -> DevOpsResult<Environment> {
        if !self.environment_names()?.iter().any(|known| known == name) {
            return Err(DevOpsError::argument(
                format!(
                    "'{name}' is not a known environment of project '{}'",
                    self.store.project_name()
                ),
                "unknown_environment",
            ));
        }
        Ok(self.build(name))
    }

    fn build(&self, name: &str) -> Environment {
        Environment::new(name, self.store.clone(), self.client.clone())
            .with_naming(self.naming.clone())
            .with_merge_mode(self.merge_mode)
            .with_error_translation(self.translate_errors)
    }

    /// Runs [`Environment::create`] for every environment in order.
    ///
    /// Environments that map to the same resource name share the property created
    /// for the first of them.
    #[instrument(skip(self), fields(project = %self.store.project_name()))]
    pub async fn create_environments(
        &self,
        options: CreateOptions,
    ) -> DevOpsResult<Vec<EnvironmentRecord>> {
        let mut records = Vec::new();
        let mut properties: HashMap<String, u64> = HashMap::new();
        for name in self.environment_names()? {
            let environment = self.build(&name);
            let resource_name = environment.resource_name();
            let options = CreateOptions {
                property_id: options
                    .property_id
                    .or_else(|| properties.get(&resource_name).copied()),
                ..options
            };
            let record = environment.create(options).await?;
            if let Some(id) = record.property_id {
                properties.entry(resource_name).or_insert(id);
            }
            records.push(record);
        }
        info!(count = records.len(), "Created environments");
        Ok(records)
    }

    /// Promotes `environment` to `network`.
    ///
    /// Unless `force` is set, every earlier environment must be active on `network`
    /// and have no unsaved changes. Earlier environments with pending activations
    /// are polled first so a just finished activation counts.
    #[instrument(skip(self, notify_emails), fields(project = %self.store.project_name()))]
    pub async fn promote(
        &self,
        environment: &str,
        network: Network,
        notify_emails: &[String],
        message: Option<&str>,
        force: bool,
    ) -> DevOpsResult<PromotionOutcome> {
        let target = self.environment(environment)?;
        if !force {
            for name in self.environment_names()? {
                if name == environment {
                    break;
                }
                let previous = self.build(&name);
                if previous.is_pending_promotion()? {
                    previous.check_promotions().await?;
                }
                if !previous.is_active(network)? || previous.is_dirty().await? {
                    return Err(DevOpsError::validation(
                        format!(
                            "Environment '{name}' needs to be active without any pending changes"
                        ),
                        "precursor_environment_not_active",
                        Vec::new(),
                    ));
                }
            }
        }
        target.promote(network, notify_emails, message).await
    }

    /// Polls pending activations of every environment and reports their versions.
    #[instrument(skip(self), fields(project = %self.store.project_name()))]
    pub async fn status(&self) -> DevOpsResult<Vec<EnvironmentStatus>> {
        let mut rows = Vec::new();
        for name in self.environment_names()? {
            let environment = self.build(&name);
            let check = environment.check_promotions().await?;
            let record = environment.record()?;
            rows.push(EnvironmentStatus {
                env_name: name,
                property_name: record.property_name,
                latest_version: check.status.latest_version,
                rule_format: record.suggested_rule_format.or_else(|| {
                    record
                        .latest_version_info
                        .and_then(|latest| latest.rule_format)
                }),
                staging_version: check.status.active_in_staging_version,
                production_version: check.status.active_in_production_version,
            });
        }
        Ok(rows)
    }
}
