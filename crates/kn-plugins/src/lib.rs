//! Plugin context sharing for the `kn` command-line client.
//!
//! The `kn-plugins` crate lets plugins, whether compiled into the CLI or
//! shipped as separate `kn-*` executables, exchange a small amount of ambient
//! state such as the current service or namespace. Each plugin may declare a
//! [`Manifest`] naming the context keys it produces and consumes. The
//! [`ContextDataManager`] discovers those manifests through a
//! [`PluginRegistry`], indexes producers and consumers per key, and persists
//! the named context maps to a JSON cache beside the CLI configuration.
//!
//! # Architecture
//!
//! - [`registry`] enumerates built-in and external plugins.
//! - [`fetcher`] obtains manifests, probing external executables with the
//!   reserved `manifest` subcommand under a timeout.
//! - [`context`] holds the named key-value maps.
//! - [`cache`] reads and atomically rewrites `context.json`.
//! - [`manager`] ties the above together and owns the derived indexes.
//! - [`runner`] executes a plugin, injecting the context it consumes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use kn_plugins::{
//!     ContextDataManager, Manifest, ManifestProvider, Plugin, PluginError, PluginManager,
//!     ProcessManifestFetcher,
//! };
//!
//! struct Describe;
//!
//! impl Plugin for Describe {
//!     fn name(&self) -> &str {
//!         "kn-service-describe"
//!     }
//!     fn execute(&self, _args: &[String]) -> Result<i32, PluginError> {
//!         Ok(0)
//!     }
//!     fn manifest_provider(&self) -> Option<&dyn ManifestProvider> {
//!         Some(self)
//!     }
//! }
//!
//! impl ManifestProvider for Describe {
//!     fn manifest(&self) -> Option<Manifest> {
//!         Some(Manifest::new(Vec::new(), vec!["service".into()]))
//!     }
//! }
//!
//! let mut plugins = PluginManager::builtin_only();
//! plugins.register_builtin(Arc::new(Describe)).expect("unique name");
//!
//! let mut manager = ContextDataManager::in_memory();
//! manager
//!     .fetch_manifests(&plugins, &ProcessManifestFetcher::default())
//!     .expect("registry lists plugins");
//! assert_eq!(manager.get_consumes_keys("kn-service-describe"), ["service"]);
//! ```

pub mod cache;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod manager;
pub mod manifest;
pub mod plugin;
pub mod process;
pub mod registry;
pub mod runner;

#[cfg(test)]
mod tests;

pub use self::cache::{CacheDocument, ContextCache};
pub use self::context::{CONTEXT_ENV_VAR, ContextData, ContextStore, DEFAULT_CONTEXT};
pub use self::error::{CacheError, PluginError};
pub use self::fetcher::{ManifestFetcher, ProcessManifestFetcher};
pub use self::manager::{ContextDataManager, KeyIndex};
pub use self::manifest::{MANIFEST_SUBCOMMAND, Manifest, ManifestTable};
pub use self::plugin::{ContextConsumer, ExternalPlugin, ManifestProvider, Plugin};
pub use self::process::CancellationFlag;
pub use self::registry::{PluginManager, PluginMatch, PluginRegistry, find_plugin};
pub use self::runner::PluginRunner;
