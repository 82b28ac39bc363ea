use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::process::{run_invocation, ExecutionResult, Invocation};

/// Spawns external commands on behalf of the lifecycle and session layers.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &Invocation, log: &Path) -> Result<ExecutionResult>;
}

pub trait Effects: Send + Sync {
    fn runner(&self) -> &dyn ProcessRunner;
}

pub struct SystemEffects {
    runner: Arc<SystemProcessRunner>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: Arc::new(SystemProcessRunner),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }
}

struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &Invocation, log: &Path) -> Result<ExecutionResult> {
        run_invocation(invocation, log)
    }
}

pub type SharedEffects = Arc<dyn Effects>;
