use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::{EnvironmentHandle, LifecycleState};
use crate::core::fs::remove_dir_all_writable;
use crate::core::tooling::errors::TryError;

pub const LOG_FILE_NAME: &str = "logs";
const WORKSPACE_PREFIX: &str = "try-";

/// Creates a fresh, uniquely named workspace under `base` (created when
/// absent) or the platform temp root, with an empty log inside.
///
/// # Errors
/// Returns [`TryError::Io`] when the directories or the log cannot be created.
pub fn create_workspace(base: Option<&Path>, retain: bool) -> Result<EnvironmentHandle, TryError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(WORKSPACE_PREFIX);
    let dir = match base {
        Some(base) => {
            fs::create_dir_all(base).map_err(|err| {
                TryError::io(format!("failed to create {}", base.display()), err)
            })?;
            builder.tempdir_in(base)
        }
        None => builder.tempdir(),
    }
    .map_err(|err| TryError::io("failed to create try workspace", err))?;
    let workspace = dir.keep();

    let log_path = workspace.join(LOG_FILE_NAME);
    File::create(&log_path)
        .map_err(|err| TryError::io(format!("failed to create {}", log_path.display()), err))?;
    info!(workspace = %workspace.display(), "created workspace");
    Ok(EnvironmentHandle::new(workspace, log_path, retain))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Teardown {
    Removed,
    Retained { path: PathBuf, reasons: Vec<&'static str> },
}

/// Deletes the workspace iff `!retain && !failed && !is_external`; otherwise
/// leaves it on disk for inspection.
///
/// # Errors
/// Returns [`TryError::Io`] when removal of the workspace fails.
pub fn teardown(handle: &mut EnvironmentHandle) -> Result<Teardown, TryError> {
    if handle.should_delete() {
        remove_dir_all_writable(handle.workspace()).map_err(|err| {
            TryError::io(
                format!("failed to remove {}", handle.workspace().display()),
                std::io::Error::other(format!("{err:#}")),
            )
        })?;
        handle.set_state(LifecycleState::TornDown);
        info!(workspace = %handle.workspace().display(), "removed workspace");
        return Ok(Teardown::Removed);
    }

    let mut reasons = Vec::new();
    if handle.retain {
        reasons.push("keep");
    }
    if handle.failed {
        reasons.push("failed");
    }
    if handle.is_external {
        reasons.push("external");
    }
    handle.set_state(LifecycleState::Retained);
    if handle.failed {
        warn!(workspace = %handle.workspace().display(), "keeping workspace after failure");
    } else {
        info!(workspace = %handle.workspace().display(), ?reasons, "keeping workspace");
    }
    Ok(Teardown::Retained {
        path: handle.workspace().to_path_buf(),
        reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_created_under_missing_base() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().join("nested").join("base");
        let handle = create_workspace(Some(&base), false).expect("workspace");
        assert!(handle.workspace().starts_with(&base));
        assert!(handle
            .workspace()
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(WORKSPACE_PREFIX)));
        assert!(handle.log().is_file());
    }

    #[test]
    fn workspaces_are_unique() {
        let temp = tempfile::tempdir().expect("tempdir");
        let first = create_workspace(Some(temp.path()), false).expect("first");
        let second = create_workspace(Some(temp.path()), false).expect("second");
        assert_ne!(first.workspace(), second.workspace());
    }

    #[test]
    fn clean_run_is_removed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut handle = create_workspace(Some(temp.path()), false).expect("workspace");
        assert_eq!(teardown(&mut handle).expect("teardown"), Teardown::Removed);
        assert!(!handle.workspace().exists());
        assert_eq!(handle.state(), LifecycleState::TornDown);
    }

    #[test]
    fn each_flag_alone_retains() {
        let temp = tempfile::tempdir().expect("tempdir");
        for flag in ["keep", "failed", "external"] {
            let mut handle = create_workspace(Some(temp.path()), flag == "keep").expect("workspace");
            handle.failed = flag == "failed";
            handle.is_external = flag == "external";
            let outcome = teardown(&mut handle).expect("teardown");
            assert_eq!(
                outcome,
                Teardown::Retained {
                    path: handle.workspace().to_path_buf(),
                    reasons: vec![flag],
                }
            );
            assert!(handle.workspace().exists(), "{flag} should retain");
            assert_eq!(handle.state(), LifecycleState::Retained);
        }
    }
}
