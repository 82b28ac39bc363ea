//! Launches the user's session inside an activated environment.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use try_domain::{SessionMode, SessionRequest, ShellCommand};

use crate::core::config::TryOptions;
use crate::core::environment::{EnvOverlay, EnvironmentHandle};
use crate::core::runtime::effects::Effects;
use crate::core::runtime::executor::run_step;
use crate::core::runtime::process::Invocation;
use crate::core::tooling::errors::{FailureKind, TryError};

pub(crate) const STARTUP_FILE: &str = "startup.py";
pub(crate) const SCRIPT_FILE: &str = "main.py";
const IMPORTS_PLACEHOLDER: &str = "{imports}";
const SCRIPT_TEMPLATE: &str = include_str!("../../templates/script.py.template");

/// One `import` line per symbol, newline terminated.
pub(crate) fn render_preamble(symbols: &[&str]) -> String {
    symbols
        .iter()
        .map(|symbol| format!("import {symbol}\n"))
        .collect()
}

/// The script template with the import block at its substitution point.
pub(crate) fn render_script(symbols: &[&str]) -> String {
    let imports = symbols
        .iter()
        .map(|symbol| format!("import {symbol}"))
        .collect::<Vec<_>>()
        .join("\n");
    SCRIPT_TEMPLATE.replacen(IMPORTS_PLACEHOLDER, &imports, 1)
}

fn write_workspace_file(handle: &EnvironmentHandle, name: &str, body: &str) -> Result<PathBuf, TryError> {
    let path = handle.workspace().join(name);
    fs::write(&path, body)
        .map_err(|err| TryError::io(format!("failed to write {}", path.display()), err))?;
    Ok(path)
}

/// Run the session the request asks for and block until it ends.
///
/// # Errors
/// Returns [`TryError::Command`] when the shell, editor or script exits
/// non-zero, and [`TryError::Io`] when the generated files cannot be written.
pub(crate) fn launch(
    effects: &dyn Effects,
    handle: &mut EnvironmentHandle,
    overlay: &EnvOverlay,
    request: &SessionRequest,
    options: &TryOptions,
) -> Result<(), TryError> {
    match request.mode {
        SessionMode::Interpreter | SessionMode::Shell => launch_interactive(
            effects,
            handle,
            overlay,
            &request.interactive_shell(),
            &request.import_symbols(),
            &options.cwd,
        ),
        SessionMode::Editor => launch_editor(
            effects,
            handle,
            overlay,
            &options.editor,
            &request.import_symbols(),
            &options.cwd,
        ),
    }
}

fn launch_interactive(
    effects: &dyn Effects,
    handle: &mut EnvironmentHandle,
    overlay: &EnvOverlay,
    shell: &ShellCommand,
    symbols: &[&str],
    cwd: &Path,
) -> Result<(), TryError> {
    let startup = write_workspace_file(handle, STARTUP_FILE, &render_preamble(symbols))?;
    info!(shell = %shell.display(), "starting interactive session");
    let invocation = Invocation::new(shell.program.clone(), cwd)
        .args(shell.args.iter().cloned())
        .envs(&overlay.with("PYTHONSTARTUP", startup.display().to_string()))
        .interactive();
    run_step(effects, handle, FailureKind::Session, &invocation)?;
    Ok(())
}

fn launch_editor(
    effects: &dyn Effects,
    handle: &mut EnvironmentHandle,
    overlay: &EnvOverlay,
    editor: &ShellCommand,
    symbols: &[&str],
    cwd: &Path,
) -> Result<(), TryError> {
    let script = write_workspace_file(handle, SCRIPT_FILE, &render_script(symbols))?;
    let script_arg = script.display().to_string();
    info!(editor = %editor.display(), script = %script_arg, "opening editor");

    let edit = Invocation::new(editor.program.clone(), cwd)
        .args(editor.args.iter().cloned())
        .arg(script_arg.clone())
        .envs(overlay.vars())
        .interactive();
    run_step(effects, handle, FailureKind::Session, &edit)?;

    let interpreter = ShellCommand::interpreter();
    let run = Invocation::new(interpreter.program, cwd)
        .arg(script_arg)
        .envs(overlay.vars())
        .interactive();
    run_step(effects, handle, FailureKind::Session, &run)?;
    Ok(())
}
