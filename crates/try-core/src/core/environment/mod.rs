//! Temporary workspace and isolated interpreter environment lifecycle.
//!
//! `Uninitialized → Created → Activated → (TornDown | Retained)`. All state
//! lives in an [`EnvironmentHandle`] owned by one orchestration run.

mod overlay;
mod virtualenv;
mod workspace;

use std::path::{Path, PathBuf};

use serde::Serialize;

pub use overlay::EnvOverlay;
pub use virtualenv::{
    activate, attach_environment, create_environment, find_environment_file, EnvCreator,
};
pub use workspace::{create_workspace, teardown, Teardown, LOG_FILE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Workspace exists, no interpreter environment yet.
    Uninitialized,
    Created,
    Activated,
    TornDown,
    Retained,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentHandle {
    pub workspace_path: PathBuf,
    pub env_path: Option<PathBuf>,
    pub log_path: PathBuf,
    pub is_external: bool,
    pub retain: bool,
    pub failed: bool,
    state: LifecycleState,
}

impl EnvironmentHandle {
    pub(crate) fn new(workspace_path: PathBuf, log_path: PathBuf, retain: bool) -> Self {
        Self {
            workspace_path,
            env_path: None,
            log_path,
            is_external: false,
            retain,
            failed: false,
            state: LifecycleState::Uninitialized,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: LifecycleState) {
        self.state = state;
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Teardown removes the workspace only for a clean run on a fresh environment.
    #[must_use]
    pub fn should_delete(&self) -> bool {
        !self.retain && !self.failed && !self.is_external
    }

    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace_path
    }

    #[must_use]
    pub fn log(&self) -> &Path {
        &self.log_path
    }
}
