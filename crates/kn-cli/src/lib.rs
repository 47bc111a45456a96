//! Command-line runtime for the `kn` client.
//!
//! The runtime owns argument parsing, configuration bootstrapping, plugin
//! discovery, and dispatch. Plugins are `kn-*` executables (or in-process
//! built-ins) that may share context such as the current service between
//! invocations; see [`kn_plugins`] for the sharing model. The entry points
//! take explicit IO handles so tests can substitute buffers.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use kn_plugins::CancellationFlag;
use signal_hook::consts::signal::{SIGINT, SIGTERM};

mod cli;
mod commands;
mod config;
mod errors;
mod telemetry;

use cli::Cli;
use commands::Session;
use config::{command_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;

/// Runs the CLI using the provided arguments and IO handles.
///
/// `SIGINT` and `SIGTERM` cancel in-flight manifest probes instead of
/// terminating the process, so the context cache is never left half
/// written.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cancel = CancellationFlag::new();
    for signal in [SIGINT, SIGTERM] {
        if let Err(error) = signal_hook::flag::register(signal, Arc::clone(cancel.as_atomic())) {
            let _ = writeln!(stderr, "warning: failed to watch signal {signal}: {error}");
        }
    }
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader, &cancel)
}

/// Runs the CLI with a custom configuration loader and cancellation flag.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    cancel: &CancellationFlag,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let cli = match Cli::try_parse_from(command_arguments(&args, &split)) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            return match write!(stdout, "{}", error.render()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    let result = loader
        .load(&split.config_arguments)
        .and_then(|config| {
            telemetry::initialise(&config)?;
            Session::open(&config, cancel.clone())
        })
        .and_then(|mut session| session.dispatch(cli, stdout));

    match result {
        Ok(exit_code) => exit_code,
        Err(error) => report(stderr, &error),
    }
}

fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    match error {
        AppError::CliUsage(usage) => {
            let _ = write!(stderr, "{}", usage.render());
        }
        other => {
            let _ = writeln!(stderr, "kn: {other}");
        }
    }
    ExitCode::FAILURE
}
