//! Domain errors raised by plugin and context-cache operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.
//!
//! Manifest absence is deliberately not represented here: a plugin that
//! cannot describe itself is recorded with `hasManifest = false` instead.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin discovery and execution.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin with the same name is already registered.
    #[error("plugin '{name}' is already registered")]
    Duplicate {
        /// Conflicting plugin name.
        name: String,
    },

    /// A plugin directory could not be enumerated.
    #[error("failed to list plugins in '{}': {source}", .path.display())]
    Discovery {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The plugin did not complete within the configured budget.
    #[error("plugin '{name}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Plugin name.
        name: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The caller cancelled the operation while the plugin was running.
    #[error("plugin '{name}' was cancelled")]
    Cancelled {
        /// Plugin name.
        name: String,
    },

    /// The plugin exited with a non-zero status code.
    #[error("plugin '{name}' exited with non-zero status {status}")]
    NonZeroExit {
        /// Plugin name.
        name: String,
        /// Process exit status.
        status: i32,
    },

    /// Context data could not be encoded for a consumer.
    #[error("failed to encode context data for plugin '{name}': {source}")]
    EncodeContext {
        /// Plugin name.
        name: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An I/O error occurred while communicating with the plugin process.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Errors arising while reading or writing the context cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file exists but could not be read.
    #[error("failed to read context cache '{}': {source}", .path.display())]
    Read {
        /// Cache file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The cache file is not a valid cache document.
    #[error("failed to decode context cache '{}': {source}", .path.display())]
    Decode {
        /// Cache file path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The manager state could not be serialised.
    #[error("failed to encode context cache: {0}")]
    Encode(#[source] serde_json::Error),

    /// The cache file path has no parent directory.
    #[error("context cache path '{}' has no parent directory", .path.display())]
    MissingParent {
        /// Cache file path.
        path: PathBuf,
    },

    /// Writing the temporary file or its directory failed.
    #[error("failed to write context cache '{}': {source}", .path.display())]
    Write {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Renaming the temporary file over the cache failed.
    #[error("failed to replace context cache '{}': {source}", .path.display())]
    Persist {
        /// Cache file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

#[cfg(test)]
mod tests;
