#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

mod core;

pub use crate::core::api::{error_outcome, execute, resolve_packages, run, session_request};
pub use crate::core::config::context::CommandContext;
pub use crate::core::config::{FileSettings, GlobalOptions, OptionOverrides, TryOptions};
pub use crate::core::environment::{
    activate, attach_environment, create_environment, create_workspace, find_environment_file,
    teardown, EnvCreator, EnvOverlay, EnvironmentHandle, LifecycleState, Teardown, LOG_FILE_NAME,
};
pub use crate::core::orchestrator::{try_packages, TryReport};
pub use crate::core::python::normalize_python_version;
pub use crate::core::runtime::effects::{Effects, ProcessRunner, SharedEffects, SystemEffects};
pub use crate::core::runtime::process::{
    append_log_line, run_invocation, ExecutionResult, Invocation, ProcessIo,
};
pub use crate::core::tooling::errors::{CommandError, FailureKind, TryError};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
