//! Child-process plumbing for external plugins.
//!
//! Two operations live here. [`probe_manifest`] runs `<plugin> manifest`
//! with stdout captured, enforcing a timeout and honouring a
//! [`CancellationFlag`]; the child is killed when either fires.
//! [`run_plugin`] runs a plugin interactively with inherited stdio and
//! optional context injected through the environment.

use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::PluginError;
use crate::manifest::MANIFEST_SUBCOMMAND;

/// Tracing target for plugin process operations.
const PROCESS_TARGET: &str = "kn_plugins::process";

/// Upper bound on captured manifest output.
const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared flag used to abort in-flight plugin probes.
///
/// Cloning yields a handle to the same flag. The CLI registers the inner
/// [`AtomicBool`] with its signal handlers so Ctrl-C stops a hung probe.
///
/// # Example
///
/// ```
/// use kn_plugins::CancellationFlag;
///
/// let flag = CancellationFlag::new();
/// let handle = flag.clone();
/// handle.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Creates a flag in the "not cancelled" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Exposes the underlying atomic for signal registration.
    #[must_use]
    pub const fn as_atomic(&self) -> &Arc<AtomicBool> {
        &self.cancelled
    }
}

/// Runs `<path> manifest` and returns its stdout.
///
/// # Errors
///
/// Returns [`PluginError::SpawnFailed`] when the executable cannot start,
/// [`PluginError::Timeout`] or [`PluginError::Cancelled`] when the child had
/// to be killed, [`PluginError::NonZeroExit`] for a failing exit status, and
/// [`PluginError::Io`] when stdout could not be read.
pub fn probe_manifest(
    name: &str,
    path: &Path,
    timeout: Duration,
    cancel: &CancellationFlag,
) -> Result<Vec<u8>, PluginError> {
    let mut command = Command::new(path);
    command
        .arg(MANIFEST_SUBCOMMAND)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(
        target: PROCESS_TARGET,
        plugin = name,
        executable = %path.display(),
        "probing plugin manifest"
    );

    let mut child = command.spawn().map_err(|err| PluginError::SpawnFailed {
        name: name.to_owned(),
        message: err.to_string(),
        source: Some(Arc::new(err)),
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| PluginError::SpawnFailed {
            name: name.to_owned(),
            message: String::from("failed to capture stdout"),
            source: None,
        })?;
    let stdout_rx = spawn_reader(stdout);
    let stderr_rx = child.stderr.take().map(spawn_reader);

    let start = Instant::now();
    let status = wait_for_exit(name, &mut child, start, timeout, cancel)?;
    let remaining = timeout.saturating_sub(start.elapsed());
    let output = collect_output(name, &stdout_rx, remaining, timeout)?;
    if let Some(rx) = stderr_rx {
        drain_stderr(name, &rx);
    }

    if !status.success() {
        return Err(PluginError::NonZeroExit {
            name: name.to_owned(),
            status: status.code().unwrap_or(-1),
        });
    }

    debug!(
        target: PROCESS_TARGET,
        plugin = name,
        bytes_read = output.len(),
        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "read manifest output"
    );
    Ok(output)
}

/// Runs a plugin with inherited stdio and returns its exit status.
///
/// `env` adds one variable to the child's environment.
///
/// # Errors
///
/// Returns [`PluginError::SpawnFailed`] when the executable cannot start and
/// [`PluginError::Io`] when waiting on it fails.
pub fn run_plugin(
    name: &str,
    path: &Path,
    args: &[String],
    env: Option<(&str, &str)>,
) -> Result<i32, PluginError> {
    let mut command = Command::new(path);
    command.args(args);
    if let Some((key, value)) = env {
        command.env(key, value);
    }

    debug!(
        target: PROCESS_TARGET,
        plugin = name,
        executable = %path.display(),
        with_context = env.is_some(),
        "running plugin"
    );

    let status = command
        .spawn()
        .map_err(|err| PluginError::SpawnFailed {
            name: name.to_owned(),
            message: err.to_string(),
            source: Some(Arc::new(err)),
        })?
        .wait()
        .map_err(|err| PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(err),
        })?;

    Ok(exit_code(name, status))
}

fn exit_code(name: &str, status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            debug!(target: PROCESS_TARGET, plugin = name, signal, "plugin killed by signal");
            return 128 + signal;
        }
    }
    debug!(target: PROCESS_TARGET, plugin = name, ?status, "plugin exit status unavailable");
    1
}

/// Reads a pipe to completion on a helper thread.
///
/// The result arrives on the returned channel. A reader left blocked by a
/// killed child's descendants is detached rather than joined.
fn spawn_reader(pipe: impl Read + Send + 'static) -> Receiver<std::io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let result = BufReader::new(pipe)
            .take(MAX_MANIFEST_BYTES)
            .read_to_end(&mut buffer)
            .map(|_| buffer);
        drop(tx.send(result));
    });
    rx
}

/// Waits for the child to exit, killing it on timeout or cancellation.
fn wait_for_exit(
    name: &str,
    child: &mut Child,
    start: Instant,
    timeout: Duration,
    cancel: &CancellationFlag,
) -> Result<ExitStatus, PluginError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: PROCESS_TARGET, plugin = name, ?status, "plugin process exited");
                return Ok(status);
            }
            Ok(None) => {
                if cancel.is_cancelled() {
                    debug!(target: PROCESS_TARGET, plugin = name, "probe cancelled, killing process");
                    kill(child);
                    return Err(PluginError::Cancelled {
                        name: name.to_owned(),
                    });
                }
                if start.elapsed() > timeout {
                    warn!(
                        target: PROCESS_TARGET,
                        plugin = name,
                        timeout_ms = millis(timeout),
                        "plugin manifest probe timed out, killing process"
                    );
                    kill(child);
                    return Err(PluginError::Timeout {
                        name: name.to_owned(),
                        timeout_ms: millis(timeout),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                kill(child);
                return Err(PluginError::Io {
                    name: name.to_owned(),
                    source: Arc::new(err),
                });
            }
        }
    }
}

fn collect_output(
    name: &str,
    rx: &Receiver<std::io::Result<Vec<u8>>>,
    remaining: Duration,
    timeout: Duration,
) -> Result<Vec<u8>, PluginError> {
    match rx.recv_timeout(remaining.max(POLL_INTERVAL)) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(err),
        }),
        Err(RecvTimeoutError::Timeout) => Err(PluginError::Timeout {
            name: name.to_owned(),
            timeout_ms: millis(timeout),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(std::io::Error::other("stdout reader terminated")),
        }),
    }
}

/// Logs whatever the plugin wrote to stderr, without waiting for it.
fn drain_stderr(name: &str, rx: &Receiver<std::io::Result<Vec<u8>>>) {
    if let Ok(Ok(buffer)) = rx.recv_timeout(POLL_INTERVAL) {
        if !buffer.is_empty() {
            debug!(
                target: PROCESS_TARGET,
                plugin = name,
                stderr = %String::from_utf8_lossy(&buffer).trim(),
                "plugin stderr output"
            );
        }
    }
}

fn kill(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
