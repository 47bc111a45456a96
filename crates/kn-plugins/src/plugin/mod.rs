//! Plugin abstraction shared by built-in and external plugins.
//!
//! Every plugin has a stable name and can be executed. Two optional
//! capabilities extend that contract and are queried explicitly through
//! accessor methods that default to `None`:
//!
//! - [`ManifestProvider`]: an in-process plugin describing its context keys.
//! - [`ContextConsumer`]: a plugin accepting resolved context data on
//!   invocation.

use std::path::{Path, PathBuf};

use crate::context::{CONTEXT_ENV_VAR, ContextData};
use crate::error::PluginError;
use crate::manifest::Manifest;
use crate::process;

/// File-name prefix identifying plugin executables.
pub const PLUGIN_PREFIX: &str = "kn-";

/// An installed command extension.
///
/// # Example
///
/// ```
/// use kn_plugins::{Plugin, PluginError};
///
/// struct Version;
///
/// impl Plugin for Version {
///     fn name(&self) -> &str {
///         "kn-version-check"
///     }
///     fn execute(&self, _args: &[String]) -> Result<i32, PluginError> {
///         Ok(0)
///     }
/// }
///
/// assert_eq!(Version.command_parts(), ["version", "check"]);
/// assert!(Version.path().is_none());
/// assert!(Version.manifest_provider().is_none());
/// ```
pub trait Plugin {
    /// Unique, stable plugin name (for example `kn-service-log`).
    fn name(&self) -> &str;

    /// Executable path for external plugins; `None` for built-ins.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Command tokens that select this plugin (`kn service log` for
    /// `kn-service-log`).
    fn command_parts(&self) -> Vec<String> {
        command_parts(self.name())
    }

    /// Runs the plugin with `args`, returning its exit status.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the plugin cannot be started or fails.
    fn execute(&self, args: &[String]) -> Result<i32, PluginError>;

    /// Manifest capability of an in-process plugin.
    fn manifest_provider(&self) -> Option<&dyn ManifestProvider> {
        None
    }

    /// Context-consumer capability.
    fn context_consumer(&self) -> Option<&dyn ContextConsumer> {
        None
    }
}

/// Optional capability: an in-process plugin declaring its own manifest.
pub trait ManifestProvider {
    /// Returns the plugin's manifest, or `None` when it has none.
    fn manifest(&self) -> Option<Manifest>;
}

/// Optional capability: a plugin that accepts context data on invocation.
pub trait ContextConsumer {
    /// Runs the plugin with `args` and the resolved context `data`.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the plugin cannot be started or fails.
    fn execute_with_context(&self, args: &[String], data: &ContextData)
    -> Result<i32, PluginError>;
}

/// Splits a plugin name into its command tokens.
///
/// The `kn-` prefix is removed and the remainder split on `-`.
#[must_use]
pub fn command_parts(name: &str) -> Vec<String> {
    let stem = name.strip_prefix(PLUGIN_PREFIX).unwrap_or(name);
    stem.split('-')
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

/// A plugin shipped as a separate `kn-*` executable.
///
/// External plugins always accept context: it travels as JSON in the
/// [`CONTEXT_ENV_VAR`] environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPlugin {
    name: String,
    path: PathBuf,
}

impl ExternalPlugin {
    /// Creates a plugin descriptor for the executable at `path`.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Derives a descriptor from an executable path.
    ///
    /// Returns `None` unless the file name starts with [`PLUGIN_PREFIX`] and
    /// names at least one command token.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let name = file_name
            .strip_suffix(std::env::consts::EXE_SUFFIX)
            .unwrap_or(file_name);
        if command_parts(name).is_empty() || !name.starts_with(PLUGIN_PREFIX) {
            return None;
        }
        Some(Self::new(name, path))
    }

    /// Returns the executable path.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.path
    }
}

impl Plugin for ExternalPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn execute(&self, args: &[String]) -> Result<i32, PluginError> {
        process::run_plugin(&self.name, &self.path, args, None)
    }

    fn context_consumer(&self) -> Option<&dyn ContextConsumer> {
        Some(self)
    }
}

impl ContextConsumer for ExternalPlugin {
    fn execute_with_context(
        &self,
        args: &[String],
        data: &ContextData,
    ) -> Result<i32, PluginError> {
        let encoded = serde_json::to_string(data).map_err(|source| PluginError::EncodeContext {
            name: self.name.clone(),
            source,
        })?;
        process::run_plugin(&self.name, &self.path, args, Some((CONTEXT_ENV_VAR, &encoded)))
    }
}
