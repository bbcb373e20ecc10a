//! In-memory fakes for the provider and runner seams (testing only)
//!
//! `MemoryProvider` serves canned stack outputs and distributions;
//! `RecordingRunner` records every command and replays canned output.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DeployError;
use crate::provider::{CloudProvider, Distribution, StackOutput};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::Result;

// ---------------------------------------------------------------------------
// MemoryProvider
// ---------------------------------------------------------------------------

/// In-memory provider keyed by stack name.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    stacks: Mutex<HashMap<String, Vec<StackOutput>>>,
    distributions: Mutex<Vec<Distribution>>,
    describe_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stack and its outputs.
    pub fn with_stack(self, stack_name: &str, outputs: Vec<StackOutput>) -> Self {
        self.stacks
            .lock()
            .unwrap()
            .insert(stack_name.to_string(), outputs);
        self
    }

    pub fn with_distribution(self, distribution: Distribution) -> Self {
        self.distributions.lock().unwrap().push(distribution);
        self
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CloudProvider for MemoryProvider {
    async fn describe_stack_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.stacks
            .lock()
            .unwrap()
            .get(stack_name)
            .cloned()
            .ok_or_else(|| {
                DeployError::Provider(format!("Stack with id {stack_name} does not exist"))
            })
    }

    async fn list_distributions(&self) -> Result<Vec<Distribution>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.distributions.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingRunner
// ---------------------------------------------------------------------------

/// Runner that never spawns anything.
///
/// Queued outputs are returned in order; once the queue is empty every
/// command gets the fallback output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    queued: Mutex<VecDeque<CommandOutput>>,
    fallback: CommandOutput,
    calls: Mutex<Vec<CommandSpec>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose commands all succeed with the given stdout.
    pub fn succeeding(stdout: &str) -> Self {
        Self {
            fallback: CommandOutput {
                stdout: stdout.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn push_output(&self, output: CommandOutput) {
        self.queued.lock().unwrap().push_back(output);
    }

    /// Every command run so far, oldest first.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        _timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());
        let output = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Ok(output)
    }
}
