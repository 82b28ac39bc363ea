use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use try_core::{CommandContext, ExecutionOutcome, SharedEffects, SystemEffects};

mod cli;
mod output;
mod style;

use cli::TryCli;
use output::OutputOptions;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = TryCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
        no_color: cli.no_color,
    };
    let outcome = run(&cli, opts);
    let code = output::emit_output(opts, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn run(cli: &TryCli, opts: OutputOptions) -> ExecutionOutcome {
    let global = cli.global_options();
    let effects: SharedEffects = Arc::new(SystemEffects::new());
    let ctx = match CommandContext::new(&global, cli.overrides(), effects) {
        Ok(ctx) => ctx,
        Err(err) => return try_core::error_outcome(&err, &[]),
    };
    let specs = match try_core::resolve_packages(&cli.packages) {
        Ok(specs) => specs,
        Err(err) => return try_core::error_outcome(&err, &[]),
    };

    output::print_banner(opts, ctx.options(), &specs);
    let request = try_core::session_request(&ctx, specs);
    try_core::run(&ctx, &request)
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = std::env::var("TRY_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| format!("try_core={level},try_cli={level}"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
