//! spa-deploy-core: S3 sync and CloudFront invalidation for single-page apps
//!
//! Three operations driven by a Serverless-style service definition:
//!
//! - **sync**: mirror the built bundle into the stage's bucket with
//!   `aws s3 sync --delete`
//! - **domainInfo**: read the CloudFront domain from the stack outputs
//! - **invalidateCache**: find the distribution and invalidate `/*`
//!
//! Each operation resolves its options afresh, runs sequentially, and
//! surfaces every failure to the caller.

pub mod config;
pub mod deployer;
pub mod domain;
pub mod error;
pub mod fakes;
pub mod invalidate;
pub mod provider;
pub mod registry;
pub mod runner;
pub mod sync;
pub mod telemetry;

pub use config::{
    resolve_options, DeploymentOptions, FailurePolicy, InvocationOptions, ServiceConfig,
};
pub use deployer::{SpaDeployer, StackNamer};
pub use domain::{resolve_domain, WEB_APP_DOMAIN_OUTPUT};
pub use error::DeployError;
pub use invalidate::{invalidate_cache, InvalidationReport, INVALIDATION_PATHS};
pub use provider::{AwsProvider, CloudProvider, Distribution, StackOutput};
pub use registry::{CommandEntry, CommandRegistry, Operation, OperationOutcome};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use sync::{sync_directory, SyncReport};
pub use telemetry::init_tracing;

/// Result type for deploy operations
pub type Result<T> = std::result::Result<T, DeployError>;
