use std::io;

use tracing::{debug, warn};

use crate::core::environment::EnvironmentHandle;
use crate::core::runtime::effects::Effects;
use crate::core::runtime::process::{append_log_line, Invocation};
use crate::core::tooling::errors::{CommandError, FailureKind};

/// Runs one step of the orchestration.
///
/// A non-zero exit, or a program that cannot be started, marks `handle` as
/// failed and becomes a [`CommandError`] pointing at the handle's log.
pub(crate) fn run_step(
    effects: &dyn Effects,
    handle: &mut EnvironmentHandle,
    kind: FailureKind,
    invocation: &Invocation,
) -> Result<(), CommandError> {
    let command = invocation.command_text();
    debug!(%command, cwd = %invocation.cwd.display(), "running");
    let exit_code = match effects.runner().run(invocation, handle.log()) {
        Ok(result) if result.success() => return Ok(()),
        Ok(result) => result.exit_code,
        Err(err) => {
            let line = format!("error: could not run `{command}`: {err:#}");
            if let Err(log_err) = append_log_line(handle.log(), &line) {
                warn!(log = %handle.log().display(), error = %log_err, "could not write log");
            }
            spawn_failure_code(&err)
        }
    };
    handle.mark_failed();
    warn!(%command, exit_code, step = %kind, "command failed");
    Err(CommandError {
        kind,
        command,
        exit_code,
        log_path: handle.log().to_path_buf(),
    })
}

/// 127 for a missing program, mirroring shells; 1 for any other start failure.
fn spawn_failure_code(err: &anyhow::Error) -> i32 {
    let not_found = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io_err| io_err.kind() == io::ErrorKind::NotFound);
    if not_found {
        127
    } else {
        1
    }
}
