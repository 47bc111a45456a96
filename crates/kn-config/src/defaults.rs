use camino::Utf8PathBuf;

use dirs::config_dir;

/// Directory name used beneath the platform configuration root.
pub const APP_DIRECTORY: &str = "kn";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default budget for a single `manifest` probe of an external plugin.
pub const DEFAULT_MANIFEST_TIMEOUT_SECS: u64 = 5;

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Default manifest probe timeout.
pub const fn default_manifest_timeout_secs() -> u64 {
    DEFAULT_MANIFEST_TIMEOUT_SECS
}

/// Computes the default configuration directory, `<config root>/kn`.
///
/// Returns `None` when the platform exposes no UTF-8 configuration root (for
/// example a stripped container without `$HOME`). Shared locations such as
/// the temporary directory are never substituted: plugins found there would
/// be executed.
pub fn default_config_dir() -> Option<Utf8PathBuf> {
    config_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .map(|base| base.join(APP_DIRECTORY))
}
