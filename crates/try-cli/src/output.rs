use atty::Stream;
use color_eyre::Result;
use serde_json::{json, Value};
use try_core::{CommandStatus, ExecutionOutcome, TryOptions};
use try_domain::PackageSpec;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

impl OutputOptions {
    pub fn style(self) -> Style {
        Style::new(self.no_color, atty::is(Stream::Stdout))
    }

    fn human(self) -> bool {
        !self.quiet && !self.json
    }
}

/// Lines printed before the session takes over the terminal.
pub fn banner_lines(style: &Style, options: &TryOptions, specs: &[PackageSpec]) -> Vec<String> {
    let mut lines = vec![format!("==> Use python {}", style.emphasis(&options.python))];
    if let Some(shell) = &options.shell {
        lines.push(format!("==> Use shell {}", style.emphasis(&shell.display())));
    }
    let locators = specs
        .iter()
        .map(|spec| spec.source_locator.as_str())
        .collect::<Vec<_>>()
        .join(",");
    lines.push(format!(
        "[*] Downloading packages: {}",
        style.emphasis(&locators)
    ));
    lines
}

pub fn print_banner(opts: OutputOptions, options: &TryOptions, specs: &[PackageSpec]) {
    if !opts.human() {
        return;
    }
    let style = opts.style();
    for line in banner_lines(&style, options, specs) {
        println!("{line}");
    }
}

pub fn emit_output(opts: OutputOptions, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = opts.style();

    if opts.json {
        let payload = json!({
            "status": outcome.status,
            "message": outcome.message,
            "details": outcome.details,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if opts.quiet {
        if outcome.status != CommandStatus::Ok {
            eprintln!("{}", outcome.message);
        }
    } else {
        println!("{}", style.status(&outcome.status, &outcome.message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            println!("{}", style.info(&format!("Hint: {hint}")));
        }
        if let Some(workspace) = kept_workspace(&outcome.details) {
            println!("==> Have a look at the try environment at: {workspace}");
        }
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn kept_workspace(details: &Value) -> Option<&str> {
    let map = details.as_object()?;
    if !map.get("kept").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    map.get("workspace").and_then(Value::as_str)
}
