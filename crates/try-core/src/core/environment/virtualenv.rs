use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::overlay::EnvOverlay;
use super::{EnvironmentHandle, LifecycleState};
use crate::core::runtime::effects::Effects;
use crate::core::runtime::executor::run_step;
use crate::core::runtime::process::{append_log_line, Invocation};
use crate::core::tooling::errors::{FailureKind, TryError};

const ENV_DIR_NAME: &str = "env";
const ACTIVATE: &str = "activate";

/// Tool used to build a fresh environment inside the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvCreator {
    /// `virtualenv env -p <python>`
    Virtualenv,
    /// `<python> -m venv env`
    Venv,
}

impl EnvCreator {
    /// `virtualenv` when it is on `search_path`, otherwise the stdlib `venv`.
    #[must_use]
    pub fn detect(search_path: Option<OsString>, cwd: &Path) -> Self {
        match which::which_in("virtualenv", search_path, cwd) {
            Ok(found) => {
                debug!(virtualenv = %found.display(), "using virtualenv");
                Self::Virtualenv
            }
            Err(_) => {
                debug!("virtualenv not found, falling back to venv");
                Self::Venv
            }
        }
    }

    fn invocation(self, python: &str, workspace: &Path) -> Invocation {
        match self {
            Self::Virtualenv => {
                Invocation::new("virtualenv", workspace).args([ENV_DIR_NAME, "-p", python])
            }
            Self::Venv => Invocation::new(python, workspace).args(["-m", "venv", ENV_DIR_NAME]),
        }
    }
}

impl FromStr for EnvCreator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "virtualenv" => Ok(Self::Virtualenv),
            "venv" => Ok(Self::Venv),
            other => Err(format!("unknown environment creator `{other}`")),
        }
    }
}

impl fmt::Display for EnvCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Virtualenv => "virtualenv",
            Self::Venv => "venv",
        })
    }
}

/// Locate `file_name` in the environment's `Scripts/` or `bin/` directory.
#[must_use]
pub fn find_environment_file(env_path: &Path, file_name: &str) -> Option<PathBuf> {
    ["Scripts", "bin"]
        .iter()
        .map(|dir| env_path.join(dir).join(file_name))
        .find(|candidate| candidate.is_file())
}

fn invalid_environment(handle: &mut EnvironmentHandle, path: &Path) -> TryError {
    handle.mark_failed();
    let line = format!("error: {} has no {ACTIVATE} script", path.display());
    if let Err(err) = append_log_line(handle.log(), &line) {
        warn!(log = %handle.log().display(), error = %err, "could not write log");
    }
    TryError::InvalidEnvironment {
        path: path.to_path_buf(),
        log_path: Some(handle.log().to_path_buf()),
    }
}

/// Use an environment the caller already owns. It is flagged external, so
/// teardown never removes it.
///
/// # Errors
/// Returns [`TryError::InvalidEnvironment`] when `path` has no activation
/// entry point.
pub fn attach_environment(handle: &mut EnvironmentHandle, path: &Path) -> Result<(), TryError> {
    let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if find_environment_file(&resolved, ACTIVATE).is_none() {
        return Err(invalid_environment(handle, path));
    }
    handle.is_external = true;
    handle.env_path = Some(resolved);
    handle.set_state(LifecycleState::Created);
    info!(env = %path.display(), "attached existing environment");
    Ok(())
}

/// Build `env/` inside the workspace with `python` and check the result.
///
/// # Errors
/// Returns [`TryError::Command`] when the creator exits non-zero and
/// [`TryError::InvalidEnvironment`] when it produced no usable layout.
pub fn create_environment(
    effects: &dyn Effects,
    handle: &mut EnvironmentHandle,
    python: &str,
    creator: EnvCreator,
) -> Result<(), TryError> {
    let invocation = creator.invocation(python, handle.workspace());
    run_step(effects, handle, FailureKind::EnvironmentCreation, &invocation)?;

    let env_path = handle.workspace().join(ENV_DIR_NAME);
    if find_environment_file(&env_path, ACTIVATE).is_none() {
        return Err(invalid_environment(handle, &env_path));
    }
    info!(env = %env_path.display(), %creator, python, "created environment");
    handle.env_path = Some(env_path);
    handle.set_state(LifecycleState::Created);
    Ok(())
}

/// Compute the variable overlay for the handle's environment. Nothing inside
/// the environment is executed.
///
/// # Errors
/// Returns [`TryError::InvalidEnvironment`] when no environment was created
/// or attached first.
pub fn activate(
    handle: &mut EnvironmentHandle,
    base_path: Option<OsString>,
) -> Result<EnvOverlay, TryError> {
    let Some(env_path) = handle.env_path.clone() else {
        let workspace = handle.workspace().to_path_buf();
        return Err(invalid_environment(handle, &workspace));
    };
    let overlay = EnvOverlay::for_environment(&env_path, base_path);
    handle.set_state(LifecycleState::Activated);
    debug!(bin = %overlay.bin_dir().display(), "activated environment");
    Ok(overlay)
}
