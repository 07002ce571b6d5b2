use std::process::ExitCode;

use anyhow::{Context, Result};
use wf::cli::{self, Invocation, USAGE, UsageError};
use wf::{CommandTemplate, EventLoop, InotifyService, Settings, WatchError, WatchRegistry, exec, logging};

fn main() -> ExitCode {
    let invocation = match Invocation::parse_from(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(UsageError::Clap(e)) => e.exit(),
        Err(e) => {
            eprintln!("wf: {e}");
            eprintln!("Usage: {USAGE}");
            return ExitCode::from(e.exit_code());
        }
    };

    match run(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("wf: {e:#}");
            ExitCode::from(cli::exit_code(&e))
        }
    }
}

fn run(invocation: Invocation) -> Result<()> {
    let Invocation { cli, command } = invocation;

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut settings);

    logging::init_with_config(&settings.logging);

    let template = CommandTemplate::new(command)?;
    if !template.has_substitutions() {
        wf::debug_event!("template", "no substitutions", "command runs unchanged for every file");
    }

    let mut service = InotifyService::new().map_err(|source| WatchError::InitFailed { source })?;
    let registry = WatchRegistry::register_all(&mut service, cli.paths);
    let dispatcher = exec::dispatcher_for(settings.exec.mode, settings.exec.shell);

    EventLoop::new(service, registry, template, dispatcher).run()?;
    Ok(())
}
