//! Entry point for the `kn` command-line client.
//!
//! Everything happens in [`kn_cli::run`]: configuration loading, plugin
//! discovery, context resolution, and dispatch.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    kn_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
