//! Manifest retrieval for a single plugin.
//!
//! [`ManifestFetcher`] is the strategy the
//! [`ContextDataManager`](crate::manager::ContextDataManager) uses to learn a
//! plugin's context keys. The production [`ProcessManifestFetcher`] probes
//! external executables with the `manifest` subcommand and asks built-in
//! plugins through their optional [`ManifestProvider`] capability. Failing to
//! obtain a manifest is an ordinary outcome and never an error.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::PluginError;
use crate::manifest::Manifest;
use crate::plugin::Plugin;
use crate::process::{self, CancellationFlag};

/// Tracing target for manifest discovery.
const FETCH_TARGET: &str = "kn_plugins::fetcher";

/// Default budget for an external manifest probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Strategy for obtaining a plugin's manifest.
pub trait ManifestFetcher {
    /// Returns the manifest for `plugin`.
    ///
    /// `None` means the plugin offers no way to describe itself (a built-in
    /// without the manifest capability). External plugins always yield a
    /// manifest, with `hasManifest = false` when the probe fails.
    fn fetch(&self, plugin: &dyn Plugin) -> Option<Manifest>;
}

/// Fetches manifests by probing executables or querying built-ins.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use kn_plugins::{CancellationFlag, ProcessManifestFetcher};
///
/// let cancel = CancellationFlag::new();
/// let fetcher = ProcessManifestFetcher::new(Duration::from_secs(2), cancel.clone());
/// assert_eq!(fetcher.timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct ProcessManifestFetcher {
    timeout: Duration,
    cancel: CancellationFlag,
}

impl ProcessManifestFetcher {
    /// Creates a fetcher with the given probe budget and cancellation flag.
    #[must_use]
    pub const fn new(timeout: Duration, cancel: CancellationFlag) -> Self {
        Self { timeout, cancel }
    }

    /// Returns the probe timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch_external(&self, name: &str, path: &Path) -> Manifest {
        let output = match process::probe_manifest(name, path, self.timeout, &self.cancel) {
            Ok(output) => output,
            Err(err) => {
                debug!(
                    target: FETCH_TARGET,
                    plugin = name,
                    error = %err,
                    "plugin did not provide a manifest"
                );
                let absent = Manifest::absent().with_path(path);
                return match err {
                    PluginError::Timeout { .. } | PluginError::Cancelled { .. } => {
                        absent.provisional()
                    }
                    _ => absent,
                };
            }
        };

        match Manifest::decode(&output) {
            Ok(manifest) => {
                debug!(
                    target: FETCH_TARGET,
                    plugin = name,
                    has_manifest = manifest.has_manifest(),
                    produces = ?manifest.produces_keys(),
                    consumes = ?manifest.consumes_keys(),
                    "decoded plugin manifest"
                );
                manifest.with_path(path)
            }
            Err(err) => {
                debug!(
                    target: FETCH_TARGET,
                    plugin = name,
                    error = %err,
                    "plugin wrote an unreadable manifest"
                );
                Manifest::absent().with_path(path)
            }
        }
    }
}

impl Default for ProcessManifestFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT, CancellationFlag::new())
    }
}

impl ManifestFetcher for ProcessManifestFetcher {
    fn fetch(&self, plugin: &dyn Plugin) -> Option<Manifest> {
        if let Some(path) = plugin.path() {
            return Some(self.fetch_external(plugin.name(), path));
        }
        let manifest = plugin
            .manifest_provider()
            .and_then(|provider| provider.manifest());
        if manifest.is_none() {
            debug!(
                target: FETCH_TARGET,
                plugin = plugin.name(),
                "built-in plugin declares no manifest"
            );
        }
        manifest
    }
}
