use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use try_domain::SpecError;

/// Which orchestration step a failing command belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    EnvironmentCreation,
    Install,
    Session,
}

impl FailureKind {
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::EnvironmentCreation => "environment_creation_failed",
            Self::Install => "install_failed",
            Self::Session => "session_failed",
        }
    }

    fn summary(self) -> &'static str {
        match self {
            Self::EnvironmentCreation => "failed to create the virtualenv",
            Self::Install => "package installation failed",
            Self::Session => "session exited with an error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.summary())
    }
}

/// A child process that exited non-zero, or could not be started at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Command '{command}' exited with error code: {exit_code}. See {}", .log_path.display())]
pub struct CommandError {
    pub kind: FailureKind,
    pub command: String,
    pub exit_code: i32,
    pub log_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum TryError {
    #[error("invalid package token: {0}")]
    SpecResolution(#[from] SpecError),
    #[error("Given directory {} is not a virtualenv.", .path.display())]
    InvalidEnvironment {
        path: PathBuf,
        log_path: Option<PathBuf>,
    },
    #[error("invalid shell command '{value}'")]
    InvalidShell { value: String },
    #[error("invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
    #[error("{0}")]
    Command(#[from] CommandError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
        log_path: Option<PathBuf>,
    },
}

impl TryError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
            log_path: None,
        }
    }

    /// Point an I/O failure at the workspace log it happened alongside.
    #[must_use]
    pub(crate) fn in_workspace(self, log: &Path) -> Self {
        match self {
            Self::Io {
                context,
                source,
                log_path: None,
            } => Self::Io {
                context,
                source,
                log_path: Some(log.to_path_buf()),
            },
            other => other,
        }
    }

    /// Log file referenced by this error, when one was written.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        match self {
            Self::Command(err) => Some(&err.log_path),
            Self::InvalidEnvironment { log_path, .. } | Self::Io { log_path, .. } => {
                log_path.as_deref()
            }
            _ => None,
        }
    }

    /// Whether the user can fix this by changing their invocation.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::SpecResolution(_)
                | Self::InvalidEnvironment { .. }
                | Self::InvalidShell { .. }
                | Self::Config { .. }
        )
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SpecResolution(_) => "invalid_package_spec",
            Self::InvalidEnvironment { .. } => "invalid_virtualenv",
            Self::InvalidShell { .. } => "invalid_shell",
            Self::Config { .. } => "invalid_config",
            Self::Command(err) => err.kind.reason(),
            Self::Io { .. } => "io_error",
        }
    }

    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::SpecResolution(err) => err.hint().map(str::to_string),
            Self::InvalidEnvironment { .. } => {
                Some("point --virtualenv at a directory containing bin/activate".to_string())
            }
            Self::InvalidShell { .. } => Some("check the quoting of --shell".to_string()),
            Self::Config { .. } => {
                Some("booleans in [env] accept 1/0, yes/no, true/false, on/off".to_string())
            }
            Self::Command(err) => Some(match err.kind {
                FailureKind::EnvironmentCreation => {
                    "check that the requested python version is installed".to_string()
                }
                FailureKind::Install => format!(
                    "inspect {} for the installer output",
                    err.log_path.display()
                ),
                FailureKind::Session => {
                    "the try environment was kept so you can inspect it".to_string()
                }
            }),
            Self::Io { .. } => None,
        }
    }

    #[must_use]
    pub fn details(&self) -> Value {
        let mut details = json!({ "reason": self.reason() });
        if let Value::Object(map) = &mut details {
            if let Some(hint) = self.hint() {
                map.insert("hint".into(), json!(hint));
            }
            if let Some(log) = self.log_path() {
                map.insert("log".into(), json!(log.display().to_string()));
                if let Some(workspace) = log.parent() {
                    map.insert("workspace".into(), json!(workspace.display().to_string()));
                }
            }
            match self {
                Self::Command(err) => {
                    map.insert("command".into(), json!(err.command));
                    map.insert("code".into(), json!(err.exit_code));
                }
                Self::InvalidEnvironment { path, .. } => {
                    map.insert("virtualenv".into(), json!(path.display().to_string()));
                }
                Self::InvalidShell { value } => {
                    map.insert("shell".into(), json!(value));
                }
                Self::Config { path, .. } => {
                    map.insert("config".into(), json!(path.display().to_string()));
                }
                Self::Io { source, .. } => {
                    map.insert("error".into(), json!(source.to_string()));
                }
                Self::SpecResolution(_) => {}
            }
        }
        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_message_names_command_and_log() {
        let err = TryError::from(CommandError {
            kind: FailureKind::Install,
            command: "python -m pip install nope".into(),
            exit_code: 1,
            log_path: PathBuf::from("/tmp/try-abc/logs"),
        });
        assert_eq!(
            err.to_string(),
            "Command 'python -m pip install nope' exited with error code: 1. See /tmp/try-abc/logs"
        );
        assert!(!err.is_user_error());
        let details = err.details();
        assert_eq!(details["reason"], "install_failed");
        assert_eq!(details["code"], 1);
        assert_eq!(details["workspace"], "/tmp/try-abc");
    }

    #[test]
    fn spec_errors_are_user_errors_with_hints() {
        let err = TryError::from(SpecError::Empty);
        assert!(err.is_user_error());
        assert_eq!(err.reason(), "invalid_package_spec");
        assert!(err.details()["hint"].is_string());
        assert!(err.log_path().is_none());
    }

    #[test]
    fn io_error_inside_workspace_names_it() {
        let source = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = TryError::io("failed to write /tmp/try-abc/startup.py", source);
        assert!(err.details().get("workspace").is_none());

        let err = err.in_workspace(Path::new("/tmp/try-abc/logs"));
        let details = err.details();
        assert_eq!(details["reason"], "io_error");
        assert_eq!(details["workspace"], "/tmp/try-abc");
        assert_eq!(details["log"], "/tmp/try-abc/logs");
        assert_eq!(details["error"], "denied");
    }
}
