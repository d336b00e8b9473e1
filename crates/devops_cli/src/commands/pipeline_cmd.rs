use clap::Args;
use devops_core::{CreateOptions, CreateProjectRequest, FileProjectStore};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::commands::{open_pipeline, pipeline_for};
use crate::config::AppConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "pipeline_cmd_tests.rs"]
mod tests;

/// Arguments of `new-pipeline`
#[derive(Args, Debug, Clone, PartialEq)]
pub struct NewPipelineArgs {
    /// Project name, also the folder name under the project home
    pub project: String,

    /// Environment names in promotion order, repeat for each environment
    #[arg(short = 'e', long = "environment", required_unless_present = "single_property")]
    pub environments: Vec<String>,

    /// Product id used for new properties
    #[arg(long = "product")]
    pub product_id: String,

    /// Contract id used for new properties and edge hostnames
    #[arg(long = "contract")]
    pub contract_id: String,

    /// Group id used for new properties and edge hostnames
    #[arg(long = "group")]
    pub group_id: u64,

    /// Continue a previously interrupted creation
    #[arg(long)]
    pub retry: bool,

    /// Use one property, with one environment named after the project
    #[arg(long)]
    pub single_property: bool,

    /// Serve the environment hostnames over TLS
    #[arg(long)]
    pub secure: bool,
}

/// Arguments of commands that act on a whole project
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ProjectArgs {
    /// Project name
    pub project: String,
}

/// Creates the project folder and one property per environment.
#[instrument(skip(config), fields(project = %args.project))]
pub async fn new_pipeline(config: &AppConfig, args: &NewPipelineArgs) -> Result<Value, Error> {
    // Fail on unusable API settings before anything is written.
    config.client()?;

    let request = CreateProjectRequest {
        name: args.project.clone(),
        product_id: args.product_id.clone(),
        contract_id: args.contract_id.clone(),
        group_id: args.group_id,
        environments: environments(args),
        retry: args.retry,
        single_property: args.single_property,
    };
    let store = FileProjectStore::create(&config.project_home, &request)?;
    let project_folder = store.root().display().to_string();
    let pipeline = pipeline_for(config, store)?;

    let records = pipeline
        .create_environments(CreateOptions {
            retry: args.retry,
            secure: args.secure,
            ..Default::default()
        })
        .await?;

    info!(environments = records.len(), "Pipeline created");
    Ok(json!({
        "projectFolder": project_folder,
        "environments": records,
    }))
}

fn environments(args: &NewPipelineArgs) -> Vec<String> {
    if args.single_property && args.environments.is_empty() {
        vec![args.project.clone()]
    } else {
        args.environments.clone()
    }
}

/// Polls pending activations and reports the versions of every environment.
#[instrument(skip(config), fields(project = %args.project))]
pub async fn check_status(config: &AppConfig, args: &ProjectArgs) -> Result<Value, Error> {
    let pipeline = open_pipeline(config, &args.project)?;
    let rows = pipeline.status().await?;
    Ok(serde_json::to_value(rows)?)
}
