use clap::Args;
use papi_client::Network;
use serde_json::{json, Value};
use tracing::instrument;

use crate::commands::{open_pipeline, parse_network};
use crate::config::AppConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "environment_cmd_tests.rs"]
mod tests;

/// Arguments of commands that act on one environment
#[derive(Args, Debug, Clone, PartialEq)]
pub struct EnvironmentArgs {
    /// Project name
    pub project: String,

    /// Environment name
    pub environment: String,
}

/// Arguments of `merge`
#[derive(Args, Debug, Clone, PartialEq)]
pub struct MergeArgs {
    #[command(flatten)]
    pub target: EnvironmentArgs,

    /// Skip remote validation of the merged rule tree
    #[arg(long)]
    pub no_validate: bool,
}

/// Arguments of `promote`
#[derive(Args, Debug, Clone, PartialEq)]
pub struct PromoteArgs {
    #[command(flatten)]
    pub target: EnvironmentArgs,

    /// STAGING or PRODUCTION
    #[arg(value_parser = parse_network)]
    pub network: Network,

    /// Address notified about the activation, repeat for more
    #[arg(short = 'e', long = "email", required = true)]
    pub emails: Vec<String>,

    /// Activation note
    #[arg(short, long)]
    pub message: Option<String>,

    /// Promote even if earlier environments are not active
    #[arg(long)]
    pub force: bool,
}

/// Arguments of `deactivate`
#[derive(Args, Debug, Clone, PartialEq)]
pub struct DeactivateArgs {
    #[command(flatten)]
    pub target: EnvironmentArgs,

    /// STAGING or PRODUCTION
    #[arg(value_parser = parse_network)]
    pub network: Network,

    /// Address notified about the deactivation, repeat for more
    #[arg(short = 'e', long = "email", required = true)]
    pub emails: Vec<String>,

    /// Deactivation note
    #[arg(short, long)]
    pub message: Option<String>,
}

/// Arguments of `resolve`
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub target: EnvironmentArgs,

    /// `/` separated location inside the merged rule tree
    pub path: String,
}

#[instrument(skip(config), fields(project = %args.target.project, environment = %args.target.environment))]
pub async fn merge(config: &AppConfig, args: &MergeArgs) -> Result<Value, Error> {
    let environment =
        open_pipeline(config, &args.target.project)?.environment(&args.target.environment)?;
    let outcome = environment.merge(!args.no_validate).await?;
    Ok(serde_json::to_value(outcome)?)
}

#[instrument(skip(config), fields(project = %args.project, environment = %args.environment))]
pub async fn save(config: &AppConfig, args: &EnvironmentArgs) -> Result<Value, Error> {
    let environment = open_pipeline(config, &args.project)?.environment(&args.environment)?;
    let outcome = environment.save().await?;
    Ok(serde_json::to_value(outcome)?)
}

#[instrument(
    skip(config, args),
    fields(
        project = %args.target.project,
        environment = %args.target.environment,
        network = %args.network
    )
)]
pub async fn promote(config: &AppConfig, args: &PromoteArgs) -> Result<Value, Error> {
    let pipeline = open_pipeline(config, &args.target.project)?;
    let outcome = pipeline
        .promote(
            &args.target.environment,
            args.network,
            &args.emails,
            args.message.as_deref(),
            args.force,
        )
        .await?;
    Ok(serde_json::to_value(outcome)?)
}

#[instrument(
    skip(config, args),
    fields(
        project = %args.target.project,
        environment = %args.target.environment,
        network = %args.network
    )
)]
pub async fn deactivate(config: &AppConfig, args: &DeactivateArgs) -> Result<Value, Error> {
    let environment =
        open_pipeline(config, &args.target.project)?.environment(&args.target.environment)?;
    let outcome = environment
        .deactivate(args.network, &args.emails, args.message.as_deref())
        .await?;
    Ok(serde_json::to_value(outcome)?)
}

/// Maps a location of the merged rule tree back to its template and variable files.
#[instrument(skip(config), fields(project = %args.target.project, environment = %args.target.environment))]
pub fn resolve(config: &AppConfig, args: &ResolveArgs) -> Result<Value, Error> {
    let environment =
        open_pipeline(config, &args.target.project)?.environment(&args.target.environment)?;
    let resolution = environment.resolve_path(&args.path)?;
    Ok(json!({
        "template": resolution.template,
        "variables": resolution.variables,
        "location": resolution.location,
        "value": resolution.value,
    }))
}
