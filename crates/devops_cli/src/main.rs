use std::path::PathBuf;

use clap::{Parser, Subcommand};
use devops_cli::commands::config_cmd::{self, ConfigCommands};
use devops_cli::commands::environment_cmd::{
    self, DeactivateArgs, EnvironmentArgs, MergeArgs, PromoteArgs, ResolveArgs,
};
use devops_cli::commands::pipeline_cmd::{self, NewPipelineArgs, ProjectArgs};
use devops_cli::config::{AppConfig, DEFAULT_CONFIG_FILENAME};
use devops_cli::errors::Error;
use devops_core::to_pretty_json;
use serde_json::Value;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Drive configuration pipelines from templates to activation
#[derive(Parser, Debug)]
#[command(name = "devops", version)]
#[command(about = "Merge, store and promote environment configurations", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "DEVOPS_CONFIG", default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Create a project and one property per environment
    NewPipeline(NewPipelineArgs),

    /// Merge templates and variables, validating the result
    Merge(MergeArgs),

    /// Store the merged rule tree and hostnames
    Save(EnvironmentArgs),

    /// Activate the latest version on a network
    Promote(PromoteArgs),

    /// Deactivate the active version on a network
    Deactivate(DeactivateArgs),

    /// Poll pending activations and show versions
    CheckStatus(ProjectArgs),

    /// Show which template and variable files produced a rule tree location
    Resolve(ResolveArgs),
}

async fn run(cli: &Cli) -> Result<Value, Error> {
    let load = || AppConfig::load(&cli.config);
    match &cli.command {
        Commands::Config(cmd) => config_cmd::execute(cmd, &cli.config),
        Commands::NewPipeline(args) => pipeline_cmd::new_pipeline(&load()?, args).await,
        Commands::Merge(args) => environment_cmd::merge(&load()?, args).await,
        Commands::Save(args) => environment_cmd::save(&load()?, args).await,
        Commands::Promote(args) => environment_cmd::promote(&load()?, args).await,
        Commands::Deactivate(args) => environment_cmd::deactivate(&load()?, args).await,
        Commands::CheckStatus(args) => pipeline_cmd::check_status(&load()?, args).await,
        Commands::Resolve(args) => environment_cmd::resolve(&load()?, args),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().pretty().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("DEVOPS_LOG"))
        .init();

    let cli = Cli::parse();
    let result = run(&cli)
        .await
        .and_then(|value| to_pretty_json(&value).map_err(Error::from));
    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            error!("Error: {e}");
            match to_pretty_json(&e.report()) {
                Ok(report) => eprintln!("{report}"),
                Err(_) => eprintln!("Error: {e}"),
            }
            std::process::exit(e.exit_code());
        }
    }
}
