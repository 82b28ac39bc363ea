use std::{
    env,
    ffi::OsString,
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

use anyhow::{Context, Result};
#[cfg(unix)]
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::warn;
use try_domain::ShellCommand;

/// Variables an overlay clears by mapping them to an empty value.
const UNSET_WHEN_EMPTY: [&str; 2] = ["PYTHONHOME", "__PYVENV_LAUNCHER__"];

fn is_unset_marker(key: &str, value: &str) -> bool {
    value.is_empty() && UNSET_WHEN_EMPTY.contains(&key)
}

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessIo {
    /// stdout and stderr are appended to the log; stdin is closed.
    Logged,
    /// The child owns the terminal. Only the command line reaches the log.
    Interactive,
}

/// One external command, fully described as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub envs: Vec<(String, String)>,
    pub io: ProcessIo,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            envs: Vec::new(),
            io: ProcessIo::Logged,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn envs(mut self, envs: &[(String, String)]) -> Self {
        self.envs.extend(envs.iter().cloned());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn interactive(mut self) -> Self {
        self.io = ProcessIo::Interactive;
        self
    }

    /// Shell-quoted rendering used in logs and error messages.
    #[must_use]
    pub fn command_text(&self) -> String {
        ShellCommand {
            program: self.program.clone(),
            args: self.args.clone(),
        }
        .display()
    }

    /// The search path the child will see, if the invocation overrides it.
    fn search_path(&self) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(key, _)| key == "PATH")
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub command_text: String,
}

impl ExecutionResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute an invocation, appending a `$ <command>` header and, for
/// [`ProcessIo::Logged`], the combined output to `log`. Blocks until exit.
///
/// # Errors
///
/// Returns an error when the log cannot be opened or the program cannot be
/// spawned or waited on.
pub fn run_invocation(invocation: &Invocation, log: &Path) -> Result<ExecutionResult> {
    let command_text = invocation.command_text();
    let mut log_file = open_log(log)?;
    writeln!(log_file, "$ {command_text}")
        .with_context(|| format!("failed to write {}", log.display()))?;

    let mut command = configured_command(invocation);
    let mut interrupts = None;
    match invocation.io {
        ProcessIo::Logged => {
            let stdout = log_file
                .try_clone()
                .with_context(|| format!("failed to share {}", log.display()))?;
            command.stdin(Stdio::null());
            command.stdout(Stdio::from(stdout));
            command.stderr(Stdio::from(log_file));
        }
        ProcessIo::Interactive => {
            drop(log_file);
            command.stdin(Stdio::inherit());
            command.stdout(Stdio::inherit());
            command.stderr(Stdio::inherit());
            interrupts = Some(InterruptGuard::install());
        }
    }

    let status = command
        .status()
        .with_context(|| format!("failed to start {}", invocation.program))?;
    drop(interrupts);
    Ok(ExecutionResult {
        exit_code: exit_code(status),
        command_text,
    })
}

/// Shells report death by signal `n` as `128 + n`; so do we.
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|number| 128 + number))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Keeps terminal interrupts away from `try` while a child owns the terminal.
///
/// Ctrl-C reaches the whole foreground process group. The child handles it;
/// the parent has to outlive the child to tear the workspace down. A caught
/// signal (unlike an ignored one) is reset to its default across `exec`, so
/// the child still sees ordinary Ctrl-C behaviour.
#[cfg(unix)]
struct InterruptGuard {
    previous: Vec<(Signal, SigAction)>,
}

#[cfg(unix)]
extern "C" fn swallow_interrupt(_signal: i32) {}

#[cfg(unix)]
impl InterruptGuard {
    fn install() -> Self {
        let action = SigAction::new(
            SigHandler::Handler(swallow_interrupt),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        let previous = [Signal::SIGINT, Signal::SIGQUIT]
            .into_iter()
            .filter_map(|sig| {
                // SAFETY: the handler does nothing, which is async-signal-safe.
                match unsafe { signal::sigaction(sig, &action) } {
                    Ok(old) => Some((sig, old)),
                    Err(err) => {
                        warn!(signal = %sig, %err, "could not shield try from interrupts");
                        None
                    }
                }
            })
            .collect();
        Self { previous }
    }
}

#[cfg(unix)]
impl Drop for InterruptGuard {
    fn drop(&mut self) {
        for (sig, old) in &self.previous {
            // SAFETY: restores the disposition captured in `install`.
            if let Err(err) = unsafe { signal::sigaction(*sig, old) } {
                warn!(signal = %sig, %err, "could not restore signal handler");
            }
        }
    }
}

#[cfg(not(unix))]
struct InterruptGuard;

#[cfg(not(unix))]
impl InterruptGuard {
    fn install() -> Self {
        Self
    }
}

/// Append a free-form line to the log, creating it if needed.
///
/// # Errors
///
/// Returns an error when the log cannot be opened or written.
pub fn append_log_line(log: &Path, line: &str) -> Result<()> {
    let mut file = open_log(log)?;
    writeln!(file, "{line}").with_context(|| format!("failed to write {}", log.display()))
}

fn open_log(log: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .with_context(|| format!("failed to open log {}", log.display()))
}

fn configured_command(invocation: &Invocation) -> Command {
    let mut command = Command::new(resolve_program(invocation));
    command.args(&invocation.args);
    for (key, value) in &invocation.envs {
        if is_unset_marker(key, value) {
            command.env_remove(key);
            continue;
        }
        command.env(key, value);
    }
    command.current_dir(&invocation.cwd);
    command
}

/// Bare program names are looked up on the child's search path so an overlay
/// that prepends an environment's bin directory wins over the parent PATH.
fn resolve_program(invocation: &Invocation) -> OsString {
    let program = invocation.program.as_str();
    if program.contains(['/', '\\']) {
        return OsString::from(program);
    }
    let search_path = invocation
        .search_path()
        .map(OsString::from)
        .or_else(|| env::var_os("PATH"));
    match which::which_in(program, search_path, &invocation.cwd) {
        Ok(path) => path.into_os_string(),
        Err(_) => OsString::from(program),
    }
}
