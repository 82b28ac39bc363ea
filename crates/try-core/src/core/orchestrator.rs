use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};
use try_domain::SessionRequest;

use crate::core::config::context::CommandContext;
use crate::core::config::TryOptions;
use crate::core::environment::{
    activate, attach_environment, create_environment, create_workspace, teardown, EnvOverlay,
    EnvironmentHandle, Teardown,
};
use crate::core::runtime::effects::Effects;
use crate::core::runtime::executor::run_step;
use crate::core::runtime::process::Invocation;
use crate::core::session;
use crate::core::tooling::errors::{FailureKind, TryError};

/// What a finished run leaves behind.
#[derive(Debug, Clone, Serialize)]
pub struct TryReport {
    pub workspace: PathBuf,
    pub log: PathBuf,
    pub env: Option<PathBuf>,
    pub teardown: Teardown,
}

impl TryReport {
    fn from_handle(handle: &EnvironmentHandle, teardown: Teardown) -> Self {
        Self {
            workspace: handle.workspace().to_path_buf(),
            log: handle.log().to_path_buf(),
            env: handle.env_path.clone(),
            teardown,
        }
    }

    #[must_use]
    pub fn kept(&self) -> bool {
        matches!(self.teardown, Teardown::Retained { .. })
    }
}

/// Provision an environment, install the request's packages, run the
/// session and tear down. Teardown runs on every path once the workspace
/// exists; a failed step leaves the workspace behind.
///
/// # Errors
/// Propagates the first failing step. Later steps are skipped.
pub fn try_packages(ctx: &CommandContext, request: &SessionRequest) -> Result<TryReport, TryError> {
    let options = ctx.options();
    let mut handle = create_workspace(options.tmpdir.as_deref(), options.keep)?;

    let result = provision_and_launch(ctx.effects(), &mut handle, request, options)
        .map_err(|err| err.in_workspace(handle.log()));
    if result.is_err() {
        handle.mark_failed();
    }

    let cleanup = teardown(&mut handle);
    result?;
    let teardown = cleanup?;
    info!(kept = matches!(teardown, Teardown::Retained { .. }), "try finished");
    Ok(TryReport::from_handle(&handle, teardown))
}

fn provision_and_launch(
    effects: &dyn Effects,
    handle: &mut EnvironmentHandle,
    request: &SessionRequest,
    options: &TryOptions,
) -> Result<(), TryError> {
    match options.virtualenv.as_deref() {
        Some(existing) => attach_environment(handle, existing)?,
        None => create_environment(effects, handle, &options.python, options.creator)?,
    }
    let overlay = activate(handle, options.base_path.clone())?;

    for spec in &request.specs {
        install(effects, handle, &overlay, &spec.source_locator, options)?;
    }
    if let Some(tool) = request
        .shell_command
        .as_ref()
        .and_then(|shell| shell.installable_tool())
    {
        install(effects, handle, &overlay, tool, options)?;
    }

    session::launch(effects, handle, &overlay, request, options)
}

fn install(
    effects: &dyn Effects,
    handle: &mut EnvironmentHandle,
    overlay: &EnvOverlay,
    target: &str,
    options: &TryOptions,
) -> Result<(), TryError> {
    let mut invocation = Invocation::new("python", handle.workspace())
        .args(["-m", "pip", "install"])
        .envs(overlay.vars());
    if let Some(index) = options.index.as_deref() {
        invocation = invocation.args(["-i", index]);
    }
    let invocation = invocation.arg(target);
    info!(package = target, "installing");
    run_step(effects, handle, FailureKind::Install, &invocation).map_err(|err| {
        warn!(package = target, "install failed");
        TryError::from(err)
    })
}
