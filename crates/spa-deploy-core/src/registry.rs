//! Host command registry.
//!
//! The host knows the plugin by command name and lifecycle event
//! (`syncToS3:sync` and friends). The registry maps those names onto
//! [`Operation`]s and runs them against a [`SpaDeployer`].

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::deployer::SpaDeployer;
use crate::error::DeployError;
use crate::invalidate::InvalidationReport;
use crate::sync::SyncReport;
use crate::Result;

/// The deploy operations exposed to the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Sync,
    DomainInfo,
    InvalidateCache,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Sync => "sync",
            Operation::DomainInfo => "domainInfo",
            Operation::InvalidateCache => "invalidateCache",
        }
    }
}

/// One host-visible command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: &'static str,
    pub lifecycle_event: &'static str,
    pub usage: &'static str,
    pub operation: Operation,
}

impl CommandEntry {
    /// `command:event` hook string.
    pub fn hook(&self) -> String {
        format!("{}:{}", self.command, self.lifecycle_event)
    }
}

/// Result of a dispatched operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Synced(SyncReport),
    Domain(String),
    Invalidated(InvalidationReport),
}

/// Name-to-operation table.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self {
            entries: vec![
                CommandEntry {
                    command: "syncToS3",
                    lifecycle_event: "sync",
                    usage: "Deploys the `app` directory to your bucket",
                    operation: Operation::Sync,
                },
                CommandEntry {
                    command: "domainInfo",
                    lifecycle_event: "domainInfo",
                    usage: "Fetches and prints out the deployed CloudFront domain names",
                    operation: Operation::DomainInfo,
                },
                CommandEntry {
                    command: "invalidateCloudFrontCache",
                    lifecycle_event: "invalidateCache",
                    usage: "Invalidates CloudFront cache",
                    operation: Operation::InvalidateCache,
                },
            ],
        }
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Find an entry by command name, lifecycle event, or `command:event`.
    pub fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        match name.split_once(':') {
            Some((command, event)) => self
                .entries
                .iter()
                .find(|e| e.command == command && e.lifecycle_event == event),
            None => self
                .entries
                .iter()
                .find(|e| e.command == name)
                .or_else(|| self.entries.iter().find(|e| e.lifecycle_event == name)),
        }
    }

    /// Run the operation registered under `name`.
    pub async fn dispatch(&self, name: &str, deployer: &SpaDeployer) -> Result<OperationOutcome> {
        let entry = self
            .lookup(name)
            .ok_or_else(|| DeployError::UnknownCommand(name.to_string()))?;

        info!(hook = %entry.hook(), "Dispatching");
        run_operation(entry.operation, deployer).await
    }
}

/// Run one operation directly.
pub async fn run_operation(operation: Operation, deployer: &SpaDeployer) -> Result<OperationOutcome> {
    match operation {
        Operation::Sync => deployer.sync().await.map(OperationOutcome::Synced),
        Operation::DomainInfo => deployer.domain_info().await.map(OperationOutcome::Domain),
        Operation::InvalidateCache => deployer
            .invalidate_cache()
            .await
            .map(OperationOutcome::Invalidated),
    }
}
