//! Bundle upload via `aws s3 sync`.

use crate::config::{DeploymentOptions, FailurePolicy};
use crate::error::DeployError;
use crate::runner::{run_logged, CommandRunner, CommandSpec};
use crate::Result;
use tracing::{info, warn};

/// Outcome of a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub bucket: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl SyncReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// `s3 sync <path> s3://<bucket>/ --delete [--profile <profile>]`
pub fn sync_command(options: &DeploymentOptions) -> Result<CommandSpec> {
    let bucket = options.require_bucket()?;
    let path = options.require_path()?;

    let args = vec![
        "s3".to_string(),
        "sync".to_string(),
        path.to_string(),
        format!("s3://{bucket}/"),
        "--delete".to_string(),
    ];
    Ok(CommandSpec::new(&options.aws_cli, args).with_profile(options.profile.as_deref()))
}

/// Mirror the local bundle into the bucket, deleting remote extras.
///
/// Under [`FailurePolicy::Strict`] a non-zero exit is a
/// [`DeployError::SyncFailed`]; under [`FailurePolicy::Lenient`] it is only
/// logged.
pub async fn sync_directory(
    runner: &dyn CommandRunner,
    options: &DeploymentOptions,
) -> Result<SyncReport> {
    let command = sync_command(options)?;
    let bucket = options.require_bucket()?.to_string();

    info!("Syncing to {}", bucket);
    let output = run_logged(runner, &command, options.command_timeout).await?;

    let report = SyncReport {
        bucket,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    };

    if report.succeeded() {
        info!("Successfully synced to the S3 bucket");
        return Ok(report);
    }

    match options.sync_policy {
        FailurePolicy::Strict => Err(DeployError::SyncFailed {
            bucket: report.bucket,
            exit_code: report.exit_code,
            stderr: report.stderr,
        }),
        FailurePolicy::Lenient => {
            warn!(
                exit_code = report.exit_code,
                "Sync exited with an error; continuing under the lenient policy"
            );
            Ok(report)
        }
    }
}
