//! Command implementations for the CLI.
//!
//! - `config_cmd`: create and check the configuration file
//! - `pipeline_cmd`: project wide commands (`new-pipeline`, `check-status`)
//! - `environment_cmd`: commands acting on one environment

pub mod config_cmd;
pub mod environment_cmd;
pub mod pipeline_cmd;

use std::sync::Arc;

use devops_core::{
    FileProjectStore, NamingStrategy, Pipeline, PipelineNaming, ProjectStore,
    SinglePropertyNaming,
};
use papi_client::Network;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::Error;

/// Builds the pipeline of an existing project.
///
/// # Errors
///
/// - `Error::InvalidArguments` when the project folder does not exist
/// - `Error::Config` when no API client can be built
/// - `Error::Operation` when the project info can't be read
pub fn open_pipeline(config: &AppConfig, project: &str) -> Result<Pipeline, Error> {
    let store = FileProjectStore::open(&config.project_home, project);
    if !store.exists() {
        return Err(Error::InvalidArguments(format!(
            "Project folder '{}' does not exist",
            store.root().display()
        )));
    }
    pipeline_for(config, store)
}

pub(crate) fn pipeline_for(config: &AppConfig, store: FileProjectStore) -> Result<Pipeline, Error> {
    let client = config.client()?;
    let info = store.project_info()?;
    let naming: Arc<dyn NamingStrategy> = if info.is_single_property() {
        Arc::new(SinglePropertyNaming)
    } else {
        Arc::new(PipelineNaming)
    };
    debug!(
        project = %info.name,
        single_property = info.is_single_property(),
        "Opened pipeline"
    );
    Ok(Pipeline::new(Arc::new(store), Arc::new(client))
        .with_naming(naming)
        .with_error_translation(config.translate_remote_errors))
}

/// Parses a network name, accepting any letter case.
pub fn parse_network(s: &str) -> Result<Network, String> {
    s.to_ascii_uppercase()
        .parse::<Network>()
        .map_err(|_| format!("unknown network `{s}`, expected STAGING or PRODUCTION"))
}
