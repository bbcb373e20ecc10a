//! spa-deploy - ship a single-page app bundle to S3 and refresh CloudFront
//!
//! ## Commands
//!
//! - `sync`: mirror the bundle directory into the stage's bucket
//! - `domain-info`: print the deployed CloudFront domain
//! - `invalidate-cache`: invalidate `/*` on the stage's distribution
//! - `run`: dispatch a host hook such as `syncToS3:sync`
//! - `commands`: show the registered host commands

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spa_deploy_core::registry::run_operation;
use spa_deploy_core::{
    init_tracing, CommandRegistry, DeployError, FailurePolicy, InvocationOptions, Operation,
    OperationOutcome, ServiceConfig, SpaDeployer,
};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "spa-deploy")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sync a single-page app to S3 and invalidate CloudFront", long_about = None)]
struct Cli {
    /// Service definition (YAML, JSON or TOML)
    #[arg(short, long, global = true, env = "SPA_DEPLOY_CONFIG", default_value = "serverless.yml")]
    config: PathBuf,

    /// Deployment stage
    #[arg(short, long, global = true)]
    stage: Option<String>,

    /// AWS region
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Deploy the bundle directory to the stage's bucket
    Sync {
        /// Log sync failures instead of failing
        #[arg(long)]
        lenient_sync: bool,
    },

    /// Fetch and print the deployed CloudFront domain
    DomainInfo,

    /// Invalidate the CloudFront cache
    InvalidateCache,

    /// Dispatch a registered host command or hook (e.g. `syncToS3:sync`)
    Run {
        /// Command name, lifecycle event, or `command:event`
        hook: String,
    },

    /// List the registered host commands
    #[command(name = "commands")]
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let registry = CommandRegistry::new();
    let operation = match &cli.command {
        Commands::List => {
            cmd_list(&registry);
            return Ok(());
        }
        Commands::Sync { .. } => Operation::Sync,
        Commands::DomainInfo => Operation::DomainInfo,
        Commands::InvalidateCache => Operation::InvalidateCache,
        Commands::Run { hook } => registry
            .lookup(hook)
            .map(|entry| entry.operation)
            .ok_or_else(|| DeployError::UnknownCommand(hook.clone()))?,
    };

    let mut config = ServiceConfig::from_path(&cli.config)
        .with_context(|| format!("Failed to load service definition {:?}", cli.config))?;
    if matches!(cli.command, Commands::Sync { lenient_sync: true }) {
        config.custom.spa.sync_failure_policy = Some(FailurePolicy::Lenient);
    }

    let invocation = InvocationOptions::new(cli.stage, cli.region);
    let deployer = SpaDeployer::connect(config, invocation).await;

    info!(operation = operation.name(), "Running");
    let outcome = run_operation(operation, &deployer).await?;

    report(&outcome);
    Ok(())
}

/// Print the registry
fn cmd_list(registry: &CommandRegistry) {
    for entry in registry.entries() {
        println!("{:<45} {}", entry.hook(), entry.usage);
    }
}

fn report(outcome: &OperationOutcome) {
    match outcome {
        OperationOutcome::Synced(report) => {
            info!(bucket = %report.bucket, exit_code = report.exit_code, "Sync finished");
        }
        OperationOutcome::Domain(domain) => println!("{domain}"),
        OperationOutcome::Invalidated(report) => {
            info!(distribution_id = %report.distribution_id, "Invalidation submitted");
        }
    }
}
