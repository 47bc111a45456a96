//! Plugin registry: enumerating installed plugins.
//!
//! [`PluginRegistry`] is the contract the context manager consumes. The
//! production [`PluginManager`] combines plugins compiled into the CLI with
//! `kn-*` executables found in the plugins directory and, optionally, on
//! `PATH`. Enumeration order is stable: built-ins in registration order,
//! then the plugins directory, then `PATH` entries, each directory sorted by
//! file name. The first plugin seen for a name wins.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::PluginError;
use crate::plugin::{ExternalPlugin, PLUGIN_PREFIX, Plugin};

/// Tracing target for plugin discovery.
const REGISTRY_TARGET: &str = "kn_plugins::registry";

/// Source of installed plugins.
pub trait PluginRegistry {
    /// Lists every installed plugin.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the installed plugins cannot be
    /// enumerated.
    fn list_plugins(&self) -> Result<Vec<Arc<dyn Plugin>>, PluginError>;
}

/// Registry of built-in plugins plus discovered executables.
///
/// # Example
///
/// ```
/// use kn_plugins::{PluginManager, PluginRegistry};
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// let manager = PluginManager::new(dir.path());
/// assert!(manager.list_plugins().expect("list").is_empty());
/// ```
#[derive(Default)]
pub struct PluginManager {
    builtins: Vec<Arc<dyn Plugin>>,
    plugins_dir: Option<PathBuf>,
    search_path: Vec<PathBuf>,
}

impl PluginManager {
    /// Creates a manager scanning `plugins_dir` for executables.
    #[must_use]
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: Some(plugins_dir.into()),
            ..Self::default()
        }
    }

    /// Creates a manager that only knows registered built-ins.
    #[must_use]
    pub fn builtin_only() -> Self {
        Self::default()
    }

    /// Also scans `dirs`, in order, after the plugins directory.
    #[must_use]
    pub fn with_search_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_path = dirs;
        self
    }

    /// Also scans the directories listed in the `PATH` environment variable.
    #[must_use]
    pub fn with_env_path(self) -> Self {
        let dirs = std::env::var_os("PATH")
            .map(|value| std::env::split_paths(&value).collect())
            .unwrap_or_default();
        self.with_search_path(dirs)
    }

    /// Registers an in-process plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Duplicate`] when a built-in with the same name
    /// is already registered.
    pub fn register_builtin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        if self
            .builtins
            .iter()
            .any(|existing| existing.name() == plugin.name())
        {
            return Err(PluginError::Duplicate {
                name: plugin.name().to_owned(),
            });
        }
        self.builtins.push(plugin);
        Ok(())
    }

    /// Returns the configured plugins directory.
    #[must_use]
    pub fn plugins_dir(&self) -> Option<&Path> {
        self.plugins_dir.as_deref()
    }
}

impl PluginRegistry for PluginManager {
    fn list_plugins(&self) -> Result<Vec<Arc<dyn Plugin>>, PluginError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut plugins: Vec<Arc<dyn Plugin>> = Vec::new();

        for plugin in &self.builtins {
            if seen.insert(plugin.name().to_owned()) {
                plugins.push(Arc::clone(plugin));
            }
        }

        let mut external = Vec::new();
        if let Some(dir) = &self.plugins_dir {
            external.extend(scan_directory(dir)?);
        }
        for dir in &self.search_path {
            match scan_directory(dir) {
                Ok(found) => external.extend(found),
                Err(err) => debug!(
                    target: REGISTRY_TARGET,
                    directory = %dir.display(),
                    error = %err,
                    "skipping unreadable PATH entry"
                ),
            }
        }

        for plugin in external {
            if seen.insert(plugin.name().to_owned()) {
                plugins.push(Arc::new(plugin));
            } else {
                debug!(
                    target: REGISTRY_TARGET,
                    plugin = plugin.name(),
                    executable = %plugin.executable().display(),
                    "plugin shadowed by an earlier plugin with the same name"
                );
            }
        }

        debug!(target: REGISTRY_TARGET, count = plugins.len(), "listed plugins");
        Ok(plugins)
    }
}

/// Collects `kn-*` executables in `dir`, sorted by file name.
///
/// A missing directory yields no plugins.
fn scan_directory(dir: &Path) -> Result<Vec<ExternalPlugin>, PluginError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(PluginError::Discovery {
                path: dir.to_path_buf(),
                source: Arc::new(err),
            });
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PluginError::Discovery {
            path: dir.to_path_buf(),
            source: Arc::new(err),
        })?;
        let path = entry.path();
        let is_candidate = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(PLUGIN_PREFIX));
        if is_candidate && is_executable(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .iter()
        .filter_map(|path| ExternalPlugin::from_path(path))
        .collect())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// A plugin selected by command tokens.
pub struct PluginMatch {
    /// The selected plugin.
    pub plugin: Arc<dyn Plugin>,
    /// Number of leading tokens that named the plugin.
    pub consumed: usize,
}

/// Finds the plugin whose command parts are the longest prefix of `tokens`.
///
/// `kn service log hello` resolves to `kn-service-log` with one remaining
/// argument when that plugin exists, and to `kn-service` otherwise.
///
/// # Errors
///
/// Propagates the registry's enumeration error.
pub fn find_plugin<R>(registry: &R, tokens: &[String]) -> Result<Option<PluginMatch>, PluginError>
where
    R: PluginRegistry + ?Sized,
{
    let mut best: Option<PluginMatch> = None;
    for plugin in registry.list_plugins()? {
        let parts = plugin.command_parts();
        if parts.is_empty() || !tokens.starts_with(&parts) {
            continue;
        }
        if best
            .as_ref()
            .is_none_or(|current| parts.len() > current.consumed)
        {
            best = Some(PluginMatch {
                consumed: parts.len(),
                plugin,
            });
        }
    }
    Ok(best)
}
