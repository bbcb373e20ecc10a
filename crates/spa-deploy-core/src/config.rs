//! Service definition and per-invocation option resolution
//!
//! The host hands over a Serverless-style service definition. Only the keys
//! read here are modelled; everything else in the file is ignored.
//!
//! Bucket fallback order: `custom.spa.bucket{Prod,Dev}` for the active stage,
//! then `custom.resources.s3Bucket`, then `custom.resources.s3WebappBucket`.
//! Path fallback order: `custom.spa.path`, then `custom.spaPath`.

use crate::error::DeployError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Stage used when neither the config nor the invocation names one
pub const DEFAULT_STAGE: &str = "dev";

/// Region used when neither the invocation nor the provider names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Upper bound for a single external command or AWS request
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Program used for `s3 sync` and `cloudfront create-invalidation`
pub const DEFAULT_AWS_CLI: &str = "aws";

/// Top-level service definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Service name, used for default stack naming
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub custom: CustomConfig,
}

/// `provider` block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Named AWS credentials profile
    pub profile: Option<String>,
    pub region: Option<String>,
    pub stage: Option<String>,
    /// Explicit CloudFormation stack name, overrides `<service>-<stage>`
    pub stack_name: Option<String>,
}

/// `custom` block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomConfig {
    #[serde(default)]
    pub spa: SpaConfig,
    #[serde(default)]
    pub resources: LegacyResources,
    /// Legacy single path setting
    pub spa_path: Option<String>,
}

/// `custom.spa` block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpaConfig {
    pub bucket_prod: Option<String>,
    pub bucket_dev: Option<String>,
    pub distribution_prod: Option<String>,
    pub distribution_dev: Option<String>,
    /// Local directory holding the built bundle
    pub path: Option<String>,
    /// Pins the deployment stage regardless of `--stage`
    pub stage: Option<String>,
    pub sync_failure_policy: Option<FailurePolicy>,
    pub command_timeout_secs: Option<u64>,
    /// Alternative `aws` executable
    pub aws_cli: Option<String>,
}

/// Legacy `custom.resources` bucket settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyResources {
    pub s3_bucket: Option<String>,
    pub s3_webapp_bucket: Option<String>,
}

/// How the synchronizer treats a failing `s3 sync`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Non-zero exit fails the operation
    #[default]
    Strict,
    /// Output is logged and the operation succeeds regardless
    Lenient,
}

impl ServiceConfig {
    /// Load a service definition, picking the format from the file extension.
    ///
    /// `.json` and `.toml` are parsed as such; anything else is read as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let shown = path.display().to_string();
        let parse_err = |message: String| DeployError::ConfigParse {
            path: shown.clone(),
            message,
        };

        let config: ServiceConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
            Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
            _ => serde_yaml_ng::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        };

        debug!(path = %shown, "Loaded service definition");
        Ok(config)
    }

    /// Named credentials profile from the provider block.
    pub fn profile(&self) -> Option<String> {
        non_empty(&self.provider.profile)
    }

    /// Bound for each external command and AWS request.
    ///
    /// `commandTimeoutSecs: 0` disables the bound.
    pub fn command_timeout(&self) -> Option<Duration> {
        match self
            .custom
            .spa
            .command_timeout_secs
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS)
        {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// CloudFormation stack name for a stage.
    pub fn stack_name(&self, stage: &str) -> String {
        match non_empty(&self.provider.stack_name) {
            Some(name) => name,
            None => format!("{}-{}", self.service, stage),
        }
    }
}

/// Host-global flags for the current invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOptions {
    pub stage: Option<String>,
    pub region: Option<String>,
}

impl InvocationOptions {
    pub fn new(stage: Option<String>, region: Option<String>) -> Self {
        Self { stage, region }
    }

    /// Invocation stage, then `provider.stage`, then [`DEFAULT_STAGE`].
    pub fn effective_stage(&self, config: &ServiceConfig) -> String {
        non_empty(&self.stage)
            .or_else(|| non_empty(&config.provider.stage))
            .unwrap_or_else(|| DEFAULT_STAGE.to_string())
    }

    /// Invocation region, then `provider.region`, then [`DEFAULT_REGION`].
    pub fn effective_region(&self, config: &ServiceConfig) -> String {
        non_empty(&self.region)
            .or_else(|| non_empty(&config.provider.region))
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

/// Options for one operation, recomputed on every invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOptions {
    pub stage: String,
    pub bucket: Option<String>,
    pub path: Option<String>,
    pub profile: Option<String>,
    pub distribution_id: Option<String>,
    pub sync_policy: FailurePolicy,
    /// `None` runs commands unbounded.
    pub command_timeout: Option<Duration>,
    pub aws_cli: String,
}

impl DeploymentOptions {
    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket.as_deref().ok_or_else(|| {
            DeployError::Configuration(format!(
                "no bucket configured for stage {} (set custom.spa.bucketProd/bucketDev or custom.resources.s3Bucket)",
                self.stage
            ))
        })
    }

    pub fn require_path(&self) -> Result<&str> {
        self.path.as_deref().ok_or_else(|| {
            DeployError::Configuration("no local path configured (set custom.spa.path)".to_string())
        })
    }
}

/// Resolve the options for the active stage.
///
/// Never fails; missing fields stay `None` and are rejected by the
/// operation that needs them.
pub fn resolve_options(config: &ServiceConfig, invocation: &InvocationOptions) -> DeploymentOptions {
    let spa = &config.custom.spa;
    let stage = resolve_stage(config, invocation);

    let bucket = select_for_stage(&stage, &spa.bucket_prod, &spa.bucket_dev)
        .or_else(|| non_empty(&config.custom.resources.s3_bucket))
        .or_else(|| non_empty(&config.custom.resources.s3_webapp_bucket));
    let distribution_id = select_for_stage(&stage, &spa.distribution_prod, &spa.distribution_dev);
    let path = non_empty(&spa.path).or_else(|| non_empty(&config.custom.spa_path));

    DeploymentOptions {
        stage,
        bucket,
        path,
        profile: config.profile(),
        distribution_id,
        sync_policy: spa.sync_failure_policy.unwrap_or_default(),
        command_timeout: config.command_timeout(),
        aws_cli: non_empty(&spa.aws_cli).unwrap_or_else(|| DEFAULT_AWS_CLI.to_string()),
    }
}

fn resolve_stage(config: &ServiceConfig, invocation: &InvocationOptions) -> String {
    if let Some(stage) = non_empty(&config.custom.spa.stage) {
        return stage;
    }

    let stage = invocation.effective_stage(config);
    warn!(
        stage = %stage,
        "custom.spa.stage is not set; falling back to the invocation stage. Set it explicitly to pin the deployment target"
    );
    stage
}

fn select_for_stage(stage: &str, prod: &Option<String>, dev: &Option<String>) -> Option<String> {
    match stage {
        "prod" => non_empty(prod),
        "dev" => non_empty(dev),
        _ => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn spa_config(stage: Option<&str>) -> ServiceConfig {
        ServiceConfig {
            service: "webapp".to_string(),
            custom: CustomConfig {
                spa: SpaConfig {
                    bucket_prod: Some("webapp-prod".to_string()),
                    bucket_dev: Some("webapp-dev".to_string()),
                    distribution_prod: Some("EPROD".to_string()),
                    distribution_dev: Some("EDEV".to_string()),
                    path: Some("client/dist".to_string()),
                    stage: stage.map(str::to_string),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_prod_stage_selects_prod_fields() {
        let opts = resolve_options(&spa_config(Some("prod")), &InvocationOptions::default());
        assert_eq!(opts.stage, "prod");
        assert_eq!(opts.bucket.as_deref(), Some("webapp-prod"));
        assert_eq!(opts.distribution_id.as_deref(), Some("EPROD"));
    }

    #[test]
    fn test_dev_stage_selects_dev_fields() {
        let opts = resolve_options(&spa_config(Some("dev")), &InvocationOptions::default());
        assert_eq!(opts.bucket.as_deref(), Some("webapp-dev"));
        assert_eq!(opts.distribution_id.as_deref(), Some("EDEV"));
    }

    #[test]
    fn test_other_stage_selects_nothing() {
        let opts = resolve_options(&spa_config(Some("staging")), &InvocationOptions::default());
        assert_eq!(opts.bucket, None);
        assert_eq!(opts.distribution_id, None);
        assert!(opts.require_bucket().is_err());
    }

    #[test]
    fn test_other_stage_falls_back_to_legacy_bucket() {
        let mut config = spa_config(Some("staging"));
        config.custom.resources.s3_webapp_bucket = Some("legacy-webapp".to_string());
        let opts = resolve_options(&config, &InvocationOptions::default());
        assert_eq!(opts.bucket.as_deref(), Some("legacy-webapp"));
        assert_eq!(opts.distribution_id, None);

        config.custom.resources.s3_bucket = Some("legacy".to_string());
        let opts = resolve_options(&config, &InvocationOptions::default());
        assert_eq!(opts.bucket.as_deref(), Some("legacy"));
    }

    #[test]
    fn test_missing_spa_stage_uses_invocation_stage() {
        let config = spa_config(None);
        let invocation = InvocationOptions::new(Some("prod".to_string()), None);
        let opts = resolve_options(&config, &invocation);
        assert_eq!(opts.stage, "prod");
        assert_eq!(opts.bucket.as_deref(), Some("webapp-prod"));
    }

    #[test]
    fn test_configured_stage_wins_over_invocation() {
        let config = spa_config(Some("dev"));
        let invocation = InvocationOptions::new(Some("prod".to_string()), None);
        assert_eq!(resolve_options(&config, &invocation).stage, "dev");
    }

    #[test]
    fn test_stage_defaults_to_dev() {
        let opts = resolve_options(&spa_config(None), &InvocationOptions::default());
        assert_eq!(opts.stage, DEFAULT_STAGE);
    }

    #[test]
    fn test_empty_strings_count_as_missing() {
        let mut config = spa_config(Some("prod"));
        config.custom.spa.bucket_prod = Some("  ".to_string());
        config.custom.spa.path = Some(String::new());
        config.custom.spa_path = Some("legacy/dist".to_string());
        let opts = resolve_options(&config, &InvocationOptions::default());
        assert_eq!(opts.bucket, None);
        assert_eq!(opts.path.as_deref(), Some("legacy/dist"));
    }

    #[test]
    fn test_policy_timeout_and_cli_defaults() {
        let opts = resolve_options(&spa_config(Some("dev")), &InvocationOptions::default());
        assert_eq!(opts.sync_policy, FailurePolicy::Strict);
        assert_eq!(
            opts.command_timeout,
            Some(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS))
        );
        assert_eq!(opts.aws_cli, DEFAULT_AWS_CLI);
        assert_eq!(opts.profile, None);
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let mut config = spa_config(Some("dev"));
        config.custom.spa.command_timeout_secs = Some(0);
        let opts = resolve_options(&config, &InvocationOptions::default());
        assert_eq!(opts.command_timeout, None);

        config.custom.spa.command_timeout_secs = Some(45);
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_effective_region_fallbacks() {
        let mut config = ServiceConfig::default();
        assert_eq!(InvocationOptions::default().effective_region(&config), DEFAULT_REGION);

        config.provider.region = Some("eu-west-1".to_string());
        assert_eq!(InvocationOptions::default().effective_region(&config), "eu-west-1");

        let invocation = InvocationOptions::new(None, Some("ap-south-1".to_string()));
        assert_eq!(invocation.effective_region(&config), "ap-south-1");
    }

    #[test]
    fn test_stack_name() {
        let mut config = spa_config(None);
        assert_eq!(config.stack_name("dev"), "webapp-dev");

        config.provider.stack_name = Some("custom-stack".to_string());
        assert_eq!(config.stack_name("dev"), "custom-stack");
    }

    #[test]
    fn test_load_yaml_service_definition() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("serverless.yml");
        std::fs::write(
            &path,
            r#"
service: webapp
provider:
  name: aws
  profile: deployer
  region: eu-central-1
functions:
  api:
    handler: handler.main
custom:
  spa:
    bucketProd: webapp-prod
    bucketDev: webapp-dev
    distributionProd: EPROD
    path: client/dist
    syncFailurePolicy: lenient
    commandTimeoutSecs: 30
  resources:
    s3Bucket: legacy
"#,
        )
        .unwrap();

        let config = ServiceConfig::from_path(&path).unwrap();
        assert_eq!(config.service, "webapp");
        assert_eq!(config.provider.profile.as_deref(), Some("deployer"));
        assert_eq!(config.custom.spa.bucket_prod.as_deref(), Some("webapp-prod"));
        assert_eq!(config.custom.spa.sync_failure_policy, Some(FailurePolicy::Lenient));
        assert_eq!(config.custom.spa.command_timeout_secs, Some(30));
        assert_eq!(config.custom.resources.s3_bucket.as_deref(), Some("legacy"));
    }

    #[test]
    fn test_load_json_service_definition() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("serverless.json");
        std::fs::write(
            &path,
            r#"{"service":"webapp","custom":{"spa":{"bucketDev":"webapp-dev","stage":"dev"},"resources":{"s3WebappBucket":"legacy-webapp"}}}"#,
        )
        .unwrap();

        let config = ServiceConfig::from_path(&path).unwrap();
        assert_eq!(config.custom.spa.bucket_dev.as_deref(), Some("webapp-dev"));
        assert_eq!(
            config.custom.resources.s3_webapp_bucket.as_deref(),
            Some("legacy-webapp")
        );
    }

    #[test]
    fn test_load_toml_service_definition() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("service.toml");
        std::fs::write(
            &path,
            r#"
service = "webapp"

[provider]
stackName = "webapp-stack"

[custom]
spaPath = "dist"

[custom.spa]
bucketDev = "webapp-dev"
"#,
        )
        .unwrap();

        let config = ServiceConfig::from_path(&path).unwrap();
        assert_eq!(config.stack_name("dev"), "webapp-stack");
        assert_eq!(config.custom.spa_path.as_deref(), Some("dist"));
    }

    #[test]
    fn test_malformed_config_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = ServiceConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, DeployError::ConfigParse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
