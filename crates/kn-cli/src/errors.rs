//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use kn_config::ConfigPathsError;
use kn_plugins::{CacheError, PluginError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("invalid configuration: {0}")]
    Paths(#[from] ConfigPathsError),
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("unknown command '{0}'; run 'kn plugin list' to see installed plugins")]
    UnknownCommand(String),
    #[error("context sharing is disabled; unset KN_NO_CONTEXT_SHARING to enable it")]
    ContextSharingDisabled,
    #[error("failed to save context: {0}")]
    SaveContext(#[source] CacheError),
    #[error("interrupted")]
    Interrupted,
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Emit(#[from] io::Error),
}
