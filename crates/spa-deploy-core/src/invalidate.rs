//! CloudFront cache invalidation.
//!
//! The distribution id comes straight from configuration when set.
//! Otherwise the web app domain is read from the stack outputs and matched
//! against the account's distributions; the first match wins.

use crate::config::DeploymentOptions;
use crate::domain::resolve_domain;
use crate::error::DeployError;
use crate::provider::{CloudProvider, Distribution};
use crate::runner::{run_logged, CommandRunner, CommandSpec};
use crate::Result;
use tracing::{error, info};

/// Path pattern covering every cached object.
pub const INVALIDATION_PATHS: &str = "/*";

/// Outcome of a successful invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationReport {
    pub distribution_id: String,

    /// Domain used to find the distribution, when it was looked up.
    pub domain: Option<String>,

    /// Raw `create-invalidation` response.
    pub output: String,
}

/// `cloudfront create-invalidation --distribution-id <id> --paths /* [--profile <profile>]`
pub fn invalidation_command(options: &DeploymentOptions, distribution_id: &str) -> CommandSpec {
    let args = vec![
        "cloudfront".to_string(),
        "create-invalidation".to_string(),
        "--distribution-id".to_string(),
        distribution_id.to_string(),
        "--paths".to_string(),
        INVALIDATION_PATHS.to_string(),
    ];
    CommandSpec::new(&options.aws_cli, args).with_profile(options.profile.as_deref())
}

/// First distribution served from `domain`.
pub fn find_distribution<'a>(
    distributions: &'a [Distribution],
    domain: &str,
) -> Option<&'a Distribution> {
    distributions.iter().find(|d| d.domain_name == domain)
}

/// Invalidate every path on the deployment's distribution.
///
/// `stack_name` is only used when no distribution id is configured.
pub async fn invalidate_cache(
    provider: &dyn CloudProvider,
    runner: &dyn CommandRunner,
    options: &DeploymentOptions,
    stack_name: &str,
) -> Result<InvalidationReport> {
    let (distribution_id, domain) = match &options.distribution_id {
        Some(id) => (id.clone(), None),
        None => {
            let domain = resolve_domain(provider, stack_name).await?;
            let distributions = provider.list_distributions().await?;
            match find_distribution(&distributions, &domain) {
                Some(distribution) => (distribution.id.clone(), Some(domain)),
                None => {
                    let err = DeployError::DistributionNotFound { domain };
                    error!("{}", err);
                    return Err(err);
                }
            }
        }
    };

    info!(
        "Invalidating CloudFront distribution with id: {}",
        distribution_id
    );
    info!(
        "Using profile: {}",
        options.profile.as_deref().unwrap_or("default")
    );

    let command = invalidation_command(options, &distribution_id);
    let output = run_logged(runner, &command, options.command_timeout).await?;

    if output.stdout.trim().is_empty() {
        return Err(DeployError::Invalidation {
            distribution_id,
            stderr: output.stderr,
        });
    }

    info!("Successfully invalidated CloudFront cache");
    Ok(InvalidationReport {
        distribution_id,
        domain,
        output: output.stdout,
    })
}
