//! The context-data manager.
//!
//! [`ContextDataManager`] owns the named context maps, the per-plugin
//! manifests, and the producer/consumer indexes derived from them. The CLI
//! builds one manager at start-up, optionally backed by a [`ContextCache`],
//! and passes it by reference to whatever needs it.
//!
//! Each plugin name moves through a one-shot life cycle within a process:
//! it starts unknown, and the first [`fetch_manifests`] that sees it records
//! either a manifest or the "no manifest" marker. Later fetches skip it.
//! A marker left by a probe that timed out or was interrupted is not saved,
//! so the next process asks that plugin again.
//!
//! [`fetch_manifests`]: ContextDataManager::fetch_manifests

mod index;

use tracing::{debug, warn};

use crate::cache::{CacheDocument, ContextCache};
use crate::context::{ContextData, ContextStore, DEFAULT_CONTEXT};
use crate::error::{CacheError, PluginError};
use crate::fetcher::ManifestFetcher;
use crate::manifest::{Manifest, ManifestTable};
use crate::registry::PluginRegistry;

pub use self::index::KeyIndex;

/// Tracing target for manager life-cycle events.
const MANAGER_TARGET: &str = "kn_plugins::manager";

/// Context state shared across plugin invocations.
#[derive(Debug, Default)]
pub struct ContextDataManager {
    contexts: ContextStore,
    manifests: ManifestTable,
    producers: KeyIndex,
    consumers: KeyIndex,
    cache: Option<ContextCache>,
}

impl ContextDataManager {
    /// Creates an empty manager that never touches the filesystem.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            contexts: ContextStore::new(),
            manifests: ManifestTable::new(),
            producers: KeyIndex::new(),
            consumers: KeyIndex::new(),
            cache: None,
        }
    }

    /// Creates a manager backed by `cache`, loading any saved state.
    ///
    /// A missing cache starts empty. An unreadable or undecodable cache also
    /// starts empty and logs a warning; the next save replaces it.
    #[must_use]
    pub fn load(cache: ContextCache) -> Self {
        let document = match cache.load() {
            Ok(Some(document)) => document,
            Ok(None) => CacheDocument::default(),
            Err(err) => {
                warn!(
                    target: MANAGER_TARGET,
                    path = %cache.path().display(),
                    error = %err,
                    "ignoring unusable context cache"
                );
                CacheDocument::default()
            }
        };
        let (producers, consumers) = index::derive(&document.manifests);
        debug!(
            target: MANAGER_TARGET,
            contexts = document.context_data.names().count(),
            manifests = document.manifests.len(),
            "loaded context state"
        );
        Self {
            contexts: document.context_data,
            manifests: document.manifests,
            producers,
            consumers,
            cache: Some(cache),
        }
    }

    /// The cache backing this manager, if any.
    #[must_use]
    pub const fn cache(&self) -> Option<&ContextCache> {
        self.cache.as_ref()
    }

    /// Data stored for context `name`; empty when the context is unknown.
    #[must_use]
    pub fn get_context(&self, name: &str) -> ContextData {
        self.contexts.get(name)
    }

    /// Data stored for the `"default"` context.
    #[must_use]
    pub fn get_default(&self) -> ContextData {
        self.get_context(DEFAULT_CONTEXT)
    }

    /// Keys `plugin` declares producing; empty when unknown or manifest-less.
    #[must_use]
    pub fn get_produces_keys(&self, plugin: &str) -> &[String] {
        self.manifests
            .get(plugin)
            .map(Manifest::produces_keys)
            .unwrap_or_default()
    }

    /// Keys `plugin` declares consuming; empty when unknown or manifest-less.
    #[must_use]
    pub fn get_consumes_keys(&self, plugin: &str) -> &[String] {
        self.manifests
            .get(plugin)
            .map(Manifest::consumes_keys)
            .unwrap_or_default()
    }

    /// Plugins producing `key`, in discovery order.
    #[must_use]
    pub fn producers(&self, key: &str) -> &[String] {
        self.producers.get(key)
    }

    /// Plugins consuming `key`, in discovery order.
    #[must_use]
    pub fn consumers(&self, key: &str) -> &[String] {
        self.consumers.get(key)
    }

    /// Full producer index.
    #[must_use]
    pub const fn producer_index(&self) -> &KeyIndex {
        &self.producers
    }

    /// Full consumer index.
    #[must_use]
    pub const fn consumer_index(&self) -> &KeyIndex {
        &self.consumers
    }

    /// Stored manifest for `plugin`.
    #[must_use]
    pub fn manifest(&self, plugin: &str) -> Option<&Manifest> {
        self.manifests.get(plugin)
    }

    /// All stored manifests in discovery order.
    #[must_use]
    pub const fn manifests(&self) -> &ManifestTable {
        &self.manifests
    }

    /// All stored contexts.
    #[must_use]
    pub const fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    /// Names of the contexts holding data.
    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        self.contexts.names()
    }

    /// Fetches manifests for every listed plugin not yet known.
    ///
    /// A plugin without a manifest is recorded with `hasManifest = false`
    /// and the remaining plugins are still fetched. Returns the number of
    /// newly recorded plugins.
    ///
    /// # Errors
    ///
    /// Propagates the registry's enumeration error; no state changes in
    /// that case.
    pub fn fetch_manifests<R, F>(&mut self, registry: &R, fetcher: &F) -> Result<usize, PluginError>
    where
        R: PluginRegistry + ?Sized,
        F: ManifestFetcher + ?Sized,
    {
        let plugins = registry.list_plugins()?;
        let mut recorded = 0;
        for plugin in plugins {
            let name = plugin.name();
            if self.manifests.contains(name) {
                continue;
            }
            let manifest = fetcher
                .fetch(plugin.as_ref())
                .unwrap_or_else(Manifest::absent);
            if self.record(name, manifest) {
                recorded += 1;
            }
        }
        debug!(
            target: MANAGER_TARGET,
            recorded,
            known = self.manifests.len(),
            "fetched plugin manifests"
        );
        Ok(recorded)
    }

    fn record(&mut self, name: &str, manifest: Manifest) -> bool {
        if self.manifests.contains(name) {
            return false;
        }
        self.producers.record(name, manifest.produces_keys());
        self.consumers.record(name, manifest.consumes_keys());
        self.manifests.insert_if_absent(name, manifest)
    }

    /// Sets `key` to `value` in `context`, returning the previous value.
    pub fn set_value(&mut self, context: &str, key: &str, value: &str) -> Option<String> {
        self.contexts.set(context, key, value)
    }

    /// Removes `key` from `context`, returning the removed value.
    pub fn remove_value(&mut self, context: &str, key: &str) -> Option<String> {
        self.contexts.remove(context, key)
    }

    /// Context data of `context` restricted to the keys `plugin` consumes.
    #[must_use]
    pub fn resolve_for(&self, plugin: &str, context: &str) -> ContextData {
        self.contexts
            .resolve(context, self.get_consumes_keys(plugin))
    }

    /// Saves contexts and manifests to the backing cache.
    ///
    /// Does nothing for an in-memory manager.
    ///
    /// # Errors
    ///
    /// Returns the [`CacheError`] from writing the cache. The in-memory
    /// state stays valid.
    pub fn write_cache(&self) -> Result<(), CacheError> {
        let Some(cache) = &self.cache else {
            debug!(target: MANAGER_TARGET, "no context cache configured; skipping save");
            return Ok(());
        };
        cache.store(&self.contexts, &self.manifests)
    }
}
