//! Web app domain lookup from stack outputs.

use crate::error::DeployError;
use crate::provider::{CloudProvider, StackOutput};
use crate::Result;
use tracing::info;

/// Stack output holding the CloudFront domain of the web app.
pub const WEB_APP_DOMAIN_OUTPUT: &str = "WebAppCloudFrontDistributionOutput";

/// Value of the first output named `key`.
pub fn find_output<'a>(outputs: &'a [StackOutput], key: &str) -> Option<&'a str> {
    outputs
        .iter()
        .find(|output| output.key == key)
        .map(|output| output.value.as_str())
}

/// Fetch the deployed web app domain from `stack_name`'s outputs.
///
/// A missing or empty output is a [`DeployError::DomainNotFound`].
pub async fn resolve_domain(provider: &dyn CloudProvider, stack_name: &str) -> Result<String> {
    let outputs = provider.describe_stack_outputs(stack_name).await?;

    match find_output(&outputs, WEB_APP_DOMAIN_OUTPUT).filter(|value| !value.is_empty()) {
        Some(domain) => {
            info!("Web App Domain: {}", domain);
            Ok(domain.to_string())
        }
        None => {
            info!("Web App Domain: Not Found");
            Err(DeployError::DomainNotFound {
                stack_name: stack_name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryProvider;

    #[tokio::test]
    async fn test_resolve_domain_returns_output_value() {
        let provider = MemoryProvider::new().with_stack(
            "webapp-dev",
            vec![
                StackOutput::new("ServiceEndpoint", "https://api.example.com"),
                StackOutput::new(WEB_APP_DOMAIN_OUTPUT, "d123.cloudfront.net"),
            ],
        );

        let domain = resolve_domain(&provider, "webapp-dev").await.unwrap();
        assert_eq!(domain, "d123.cloudfront.net");
    }

    #[tokio::test]
    async fn test_missing_output_is_not_found() {
        let provider = MemoryProvider::new().with_stack(
            "webapp-dev",
            vec![StackOutput::new("ServiceEndpoint", "https://api.example.com")],
        );

        let err = resolve_domain(&provider, "webapp-dev").await.unwrap_err();
        assert!(matches!(err, DeployError::DomainNotFound { ref stack_name } if stack_name == "webapp-dev"));
        assert!(err.to_string().contains("Could not extract Web App Domain"));
    }

    #[tokio::test]
    async fn test_empty_output_value_is_not_found() {
        let provider = MemoryProvider::new()
            .with_stack("webapp-dev", vec![StackOutput::new(WEB_APP_DOMAIN_OUTPUT, "")]);

        let err = resolve_domain(&provider, "webapp-dev").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = MemoryProvider::new();
        let err = resolve_domain(&provider, "missing-stack").await.unwrap_err();
        assert!(matches!(err, DeployError::Provider(_)));
    }

    #[test]
    fn test_find_output_first_match() {
        let outputs = vec![
            StackOutput::new("Key", "first"),
            StackOutput::new("Key", "second"),
        ];
        assert_eq!(find_output(&outputs, "Key"), Some("first"));
        assert_eq!(find_output(&outputs, "Other"), None);
    }
}
