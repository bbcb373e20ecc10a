//! CloudFormation and CloudFront lookups
//!
//! [`CloudProvider`] is the seam between the deploy operations and AWS.
//! [`AwsProvider`] talks to the real services through the AWS SDK; the
//! [`crate::fakes`] module has an in-memory version for tests.

use crate::error::DeployError;
use crate::Result;
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::error::DisplayErrorContext;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// One declared output of a deployed stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
}

impl StackOutput {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A CloudFront distribution summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: String,
    pub domain_name: String,
}

impl Distribution {
    pub fn new(id: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain_name: domain_name.into(),
        }
    }
}

/// Read-only queries against the cloud provider
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Outputs of the first stack matching `stack_name`.
    async fn describe_stack_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>>;

    /// Every distribution in the account.
    async fn list_distributions(&self) -> Result<Vec<Distribution>>;
}

/// [`CloudProvider`] backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct AwsProvider {
    cloudformation: aws_sdk_cloudformation::Client,
    cloudfront: aws_sdk_cloudfront::Client,
}

impl AwsProvider {
    /// Build clients for `region`, optionally pinned to a named profile.
    ///
    /// Every request is bounded by `timeout` when one is given.
    pub async fn connect(region: &str, profile: Option<&str>, timeout: Option<Duration>) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));

        if let Some(timeout) = timeout {
            loader =
                loader.timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        }

        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }

        let config = loader.load().await;
        debug!(region = %region, profile = ?profile, "AWS clients configured");

        Self {
            cloudformation: aws_sdk_cloudformation::Client::new(&config),
            cloudfront: aws_sdk_cloudfront::Client::new(&config),
        }
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn describe_stack_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>> {
        let response = self
            .cloudformation
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| {
                DeployError::Provider(format!(
                    "DescribeStacks {stack_name}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let outputs = first_stack_outputs(response.stacks().iter().map(|stack| {
            stack
                .outputs()
                .iter()
                .map(|output| (output.output_key(), output.output_value()))
        }));

        Ok(outputs)
    }

    async fn list_distributions(&self) -> Result<Vec<Distribution>> {
        let client = &self.cloudfront;
        let distributions = collect_distribution_pages(|marker| async move {
            let response = client
                .list_distributions()
                .set_marker(marker)
                .send()
                .await
                .map_err(|e| {
                    DeployError::Provider(format!(
                        "ListDistributions: {}",
                        aws_sdk_cloudfront::error::DisplayErrorContext(&e)
                    ))
                })?;

            Ok(response
                .distribution_list()
                .map(DistributionPage::from_list)
                .unwrap_or_default())
        })
        .await?;

        debug!(count = distributions.len(), "Listed CloudFront distributions");
        Ok(distributions)
    }
}

/// One ListDistributions response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DistributionPage {
    pub items: Vec<Distribution>,
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

impl DistributionPage {
    fn from_list(list: &aws_sdk_cloudfront::types::DistributionList) -> Self {
        Self {
            items: list
                .items()
                .iter()
                .map(|summary| Distribution::new(summary.id(), summary.domain_name()))
                .collect(),
            is_truncated: list.is_truncated(),
            next_marker: list.next_marker().map(str::to_string),
        }
    }
}

/// Fetch pages until one is not truncated or carries no marker.
///
/// `fetch` receives the marker of the previous page, `None` for the first.
pub(crate) async fn collect_distribution_pages<F, Fut>(mut fetch: F) -> Result<Vec<Distribution>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<DistributionPage>>,
{
    let mut distributions = Vec::new();
    let mut marker = None;

    loop {
        let page = fetch(marker.take()).await?;
        distributions.extend(page.items);

        match page.next_marker {
            Some(next) if page.is_truncated => marker = Some(next),
            _ => break,
        }
    }

    Ok(distributions)
}

/// Outputs of the first stack; missing keys or values become empty strings.
fn first_stack_outputs<'a, S, O>(stacks: S) -> Vec<StackOutput>
where
    S: IntoIterator<Item = O>,
    O: IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
{
    stacks
        .into_iter()
        .next()
        .map(|outputs| {
            outputs
                .into_iter()
                .map(|(key, value)| {
                    StackOutput::new(key.unwrap_or_default(), value.unwrap_or_default())
                })
                .collect()
        })
        .unwrap_or_default()
}
