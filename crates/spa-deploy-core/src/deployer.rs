//! Entry point tying configuration, provider and runner together.

use std::sync::Arc;

use crate::config::{resolve_options, DeploymentOptions, InvocationOptions, ServiceConfig};
use crate::domain::resolve_domain;
use crate::invalidate::{invalidate_cache, InvalidationReport};
use crate::provider::{AwsProvider, CloudProvider};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::sync::{sync_directory, SyncReport};
use crate::Result;

/// Maps a stage to a CloudFormation stack name.
pub type StackNamer = dyn Fn(&str) -> String + Send + Sync;

/// Runs the three deploy operations for one service definition.
///
/// Options are resolved again on every call; nothing is cached between
/// operations.
pub struct SpaDeployer {
    config: ServiceConfig,
    invocation: InvocationOptions,
    provider: Arc<dyn CloudProvider>,
    runner: Arc<dyn CommandRunner>,
    stack_namer: Option<Box<StackNamer>>,
}

impl SpaDeployer {
    pub fn new(
        config: ServiceConfig,
        invocation: InvocationOptions,
        provider: Arc<dyn CloudProvider>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            invocation,
            provider,
            runner,
            stack_namer: None,
        }
    }

    /// Deployer backed by the AWS SDK and the `aws` CLI.
    pub async fn connect(config: ServiceConfig, invocation: InvocationOptions) -> Self {
        let region = invocation.effective_region(&config);
        let profile = config.profile();
        let provider =
            AwsProvider::connect(&region, profile.as_deref(), config.command_timeout()).await;

        Self::new(config, invocation, Arc::new(provider), Arc::new(ProcessRunner))
    }

    /// Replace the default `<service>-<stage>` stack naming.
    pub fn with_stack_namer<F>(mut self, namer: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.stack_namer = Some(Box::new(namer));
        self
    }

    /// Options for the active stage.
    pub fn options(&self) -> DeploymentOptions {
        resolve_options(&self.config, &self.invocation)
    }

    /// Stack name for the invocation stage.
    pub fn stack_name(&self) -> String {
        let stage = self.invocation.effective_stage(&self.config);
        match &self.stack_namer {
            Some(namer) => namer(&stage),
            None => self.config.stack_name(&stage),
        }
    }

    /// Upload the bundle directory to the bucket.
    pub async fn sync(&self) -> Result<SyncReport> {
        let options = self.options();
        sync_directory(self.runner.as_ref(), &options).await
    }

    /// Deployed web app domain.
    pub async fn domain_info(&self) -> Result<String> {
        resolve_domain(self.provider.as_ref(), &self.stack_name()).await
    }

    /// Invalidate every cached path on the distribution.
    pub async fn invalidate_cache(&self) -> Result<InvalidationReport> {
        let options = self.options();
        invalidate_cache(
            self.provider.as_ref(),
            self.runner.as_ref(),
            &options,
            &self.stack_name(),
        )
        .await
    }
}
