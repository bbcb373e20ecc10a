//! Error types for spa-deploy-core

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while syncing or invalidating a deployment
#[derive(Error, Debug)]
pub enum DeployError {
    /// Required configuration missing after all fallbacks
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The stack has no usable web app domain output
    #[error("Could not extract Web App Domain from stack {stack_name}")]
    DomainNotFound { stack_name: String },

    /// No distribution is served from the resolved domain
    #[error("Could not find distribution with domain {domain}")]
    DistributionNotFound { domain: String },

    /// `create-invalidation` produced no output
    #[error("Failed invalidating CloudFront cache for distribution {distribution_id}")]
    Invalidation {
        distribution_id: String,
        stderr: String,
    },

    /// `s3 sync` exited non-zero under the strict policy
    #[error("Failed syncing to the S3 bucket {bucket} (exit code {exit_code})")]
    SyncFailed {
        bucket: String,
        exit_code: i32,
        stderr: String,
    },

    /// External command did not finish in time
    #[error("{program} timed out after {timeout:?}")]
    CommandTimeout { program: String, timeout: Duration },

    /// External command could not be started
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// CloudFormation or CloudFront request failed
    #[error("AWS request failed: {0}")]
    Provider(String),

    /// Service definition could not be parsed
    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// No registry entry for the requested command or hook
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Whether this is one of the lookup failures (domain or distribution).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DeployError::DomainNotFound { .. } | DeployError::DistributionNotFound { .. }
        )
    }

    /// Captured stderr of the failing external command, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            DeployError::Invalidation { stderr, .. } | DeployError::SyncFailed { stderr, .. } => {
                Some(stderr)
            }
            _ => None,
        }
    }
}
