//! Shared configuration for the `kn` command-line client.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a
//! configuration file, then `KN_*` environment variables, then command-line
//! flags. The resolved [`Config`] drives plugin discovery, context sharing,
//! and logging.

use camino::Utf8PathBuf;
pub use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod paths;

pub use defaults::{
    APP_DIRECTORY, DEFAULT_LOG_FILTER, DEFAULT_MANIFEST_TIMEOUT_SECS, default_config_dir,
    default_log_filter_string, default_log_format, default_manifest_timeout_secs,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{CONTEXT_CACHE_FILE, ConfigPaths, ConfigPathsError, PLUGINS_DIRECTORY};

/// Resolved configuration for the CLI and its plugin layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "KN")]
pub struct Config {
    /// Directory holding the CLI configuration and the context cache.
    pub config_dir: Option<Utf8PathBuf>,
    /// Directory scanned for plugin executables.
    pub plugins_dir: Option<Utf8PathBuf>,
    /// Also discover `kn-*` executables on `PATH`.
    #[ortho_config(default = false)]
    pub lookup_plugins_in_path: bool,
    /// Disables manifest discovery and the persisted context cache.
    #[ortho_config(default = false)]
    pub no_context_sharing: bool,
    /// Upper bound, in seconds, for one external `manifest` probe.
    #[ortho_config(default = default_manifest_timeout_secs())]
    pub manifest_timeout_secs: u64,
    /// Tracing filter expression (for example `kn_plugins=debug`).
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log line format written to stderr.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: None,
            plugins_dir: None,
            lookup_plugins_in_path: false,
            no_context_sharing: false,
            manifest_timeout_secs: default_manifest_timeout_secs(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Configuration directory, falling back to the platform default.
    ///
    /// `None` when neither is available.
    pub fn config_dir(&self) -> Option<Utf8PathBuf> {
        self.config_dir.clone().or_else(default_config_dir)
    }

    /// Explicitly configured plugins directory, if any.
    pub fn plugins_dir(&self) -> Option<&Utf8PathBuf> {
        self.plugins_dir.as_ref()
    }

    /// Whether `PATH` is scanned for plugins.
    pub const fn lookup_plugins_in_path(&self) -> bool {
        self.lookup_plugins_in_path
    }

    /// Whether context sharing is enabled.
    pub const fn context_sharing(&self) -> bool {
        !self.no_context_sharing
    }

    /// Timeout applied to external manifest probes.
    pub const fn manifest_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.manifest_timeout_secs)
    }

    /// Tracing filter expression.
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Configured log format.
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
