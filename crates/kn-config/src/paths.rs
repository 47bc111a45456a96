//! Derives the filesystem locations shared by the CLI and the plugin layer.
//!
//! Both the plugin registry and the context cache need to agree on where the
//! configuration directory lives, so the derivation happens once here and the
//! resulting [`ConfigPaths`] is threaded through the composition root.

use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::Config;

/// File name of the persisted context-sharing cache.
pub const CONTEXT_CACHE_FILE: &str = "context.json";

/// Directory name, beneath the configuration directory, holding plugins.
pub const PLUGINS_DIRECTORY: &str = "plugins";

/// Canonical paths derived from the resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    config_dir: PathBuf,
    plugins_dir: PathBuf,
    context_cache_path: PathBuf,
}

impl ConfigPaths {
    /// Derives paths from the shared configuration.
    ///
    /// Directories are not created here; writers create what they need.
    pub fn from_config(config: &Config) -> Result<Self, ConfigPathsError> {
        Self::derive(config, config.config_dir())
    }

    fn derive(
        config: &Config,
        config_dir: Option<Utf8PathBuf>,
    ) -> Result<Self, ConfigPathsError> {
        let config_dir = require_absolute(config_dir.ok_or(ConfigPathsError::NoConfigDir)?)?;
        let plugins_dir = match config.plugins_dir() {
            Some(dir) => require_absolute(dir.clone())?,
            None => config_dir.join(PLUGINS_DIRECTORY),
        };
        Ok(Self {
            context_cache_path: config_dir.join(CONTEXT_CACHE_FILE),
            plugins_dir,
            config_dir,
        })
    }

    /// Directory holding the configuration and the context cache.
    pub fn config_dir(&self) -> &Path {
        self.config_dir.as_path()
    }

    /// Directory scanned for `kn-*` plugin executables.
    pub fn plugins_dir(&self) -> &Path {
        self.plugins_dir.as_path()
    }

    /// Path to the persisted context cache.
    pub fn context_cache_path(&self) -> &Path {
        self.context_cache_path.as_path()
    }
}

fn require_absolute(path: Utf8PathBuf) -> Result<PathBuf, ConfigPathsError> {
    if path.is_absolute() {
        Ok(path.into_std_path_buf())
    } else {
        Err(ConfigPathsError::RelativePath {
            path: path.to_string(),
        })
    }
}

/// Errors raised while deriving configuration paths.
#[derive(Debug, Error)]
pub enum ConfigPathsError {
    /// A configured directory was not absolute.
    #[error("configured directory '{path}' must be an absolute path")]
    RelativePath { path: String },
    /// No configuration directory was configured and the platform offers none.
    #[error("no configuration directory available; set KN_CONFIG_DIR or --config-dir")]
    NoConfigDir,
}
