use serde_json::{json, Value};
use try_domain::{PackageSpec, SessionRequest};

use crate::core::config::context::CommandContext;
use crate::core::orchestrator::{try_packages, TryReport};
use crate::core::tooling::errors::TryError;
use crate::core::tooling::outcome::ExecutionOutcome;

/// Strictly parse every positional token, stopping at the first bad one.
///
/// # Errors
/// Returns [`TryError::SpecResolution`] for the first token outside the
/// grammar.
pub fn resolve_packages<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<PackageSpec>, TryError> {
    tokens
        .iter()
        .map(|token| try_domain::parse(token.as_ref()).map_err(TryError::from))
        .collect()
}

/// The session the resolved options ask for.
#[must_use]
pub fn session_request(ctx: &CommandContext, specs: Vec<PackageSpec>) -> SessionRequest {
    let options = ctx.options();
    SessionRequest::new(specs, options.shell.clone(), options.use_editor)
}

fn packages_json(specs: &[PackageSpec]) -> Value {
    Value::Array(
        specs
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "source": spec.source_locator,
                    "import": spec.import_symbol,
                    "repository": spec.is_repository(),
                })
            })
            .collect(),
    )
}

fn report_details(report: &TryReport, specs: &[PackageSpec]) -> Value {
    json!({
        "workspace": report.workspace.display().to_string(),
        "log": report.log.display().to_string(),
        "env": report.env.as_ref().map(|env| env.display().to_string()),
        "kept": report.kept(),
        "teardown": report.teardown,
        "packages": packages_json(specs),
    })
}

/// Map a [`TryError`] onto the outcome envelope.
#[must_use]
pub fn error_outcome(err: &TryError, specs: &[PackageSpec]) -> ExecutionOutcome {
    let mut details = err.details();
    if let Value::Object(map) = &mut details {
        if err.log_path().is_some() {
            map.insert("kept".into(), json!(true));
        }
        if !specs.is_empty() {
            map.insert("packages".into(), packages_json(specs));
        }
    }
    if err.is_user_error() {
        ExecutionOutcome::user_error(err.to_string(), details)
    } else {
        ExecutionOutcome::failure(err.to_string(), details)
    }
}

/// Run a prepared request and wrap the result for rendering.
#[must_use]
pub fn run(ctx: &CommandContext, request: &SessionRequest) -> ExecutionOutcome {
    match try_packages(ctx, request) {
        Ok(report) => {
            let message = if report.kept() {
                format!("try environment kept at {}", report.workspace.display())
            } else {
                "try environment removed".to_string()
            };
            ExecutionOutcome::success(message, report_details(&report, &request.specs))
        }
        Err(err) => error_outcome(&err, &request.specs),
    }
}

/// Resolve `tokens`, then provision, launch and tear down.
#[must_use]
pub fn execute<S: AsRef<str>>(ctx: &CommandContext, tokens: &[S]) -> ExecutionOutcome {
    match resolve_packages(tokens) {
        Ok(specs) => run(ctx, &session_request(ctx, specs)),
        Err(err) => error_outcome(&err, &[]),
    }
}
