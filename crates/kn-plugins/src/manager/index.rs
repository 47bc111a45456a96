//! Key-to-plugin indexes derived from the manifest table.

use std::collections::BTreeMap;

use crate::manifest::ManifestTable;

/// Maps a context key to the plugins declaring it, in discovery order.
///
/// The same plugin name may appear under many keys and many plugins may
/// share a key; a plugin is listed at most once per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl KeyIndex {
    /// Creates an empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Plugins declaring `key`; empty when none do.
    #[must_use]
    pub fn get(&self, key: &str) -> &[String] {
        self.entries
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Appends `plugin` under each of `keys`.
    pub fn record(&mut self, plugin: &str, keys: &[String]) {
        for key in keys {
            let plugins = self.entries.entry(key.clone()).or_default();
            if plugins.last().map(String::as_str) != Some(plugin) {
                plugins.push(plugin.to_owned());
            }
        }
    }

    /// Iterates over keys and their plugins in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, plugins)| (key.as_str(), plugins.as_slice()))
    }

    /// Returns `true` when no key is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replays `manifests` in order into fresh producer and consumer indexes.
pub(crate) fn derive(manifests: &ManifestTable) -> (KeyIndex, KeyIndex) {
    let mut producers = KeyIndex::new();
    let mut consumers = KeyIndex::new();
    for (name, manifest) in manifests.iter() {
        producers.record(name, manifest.produces_keys());
        consumers.record(name, manifest.consumes_keys());
    }
    (producers, consumers)
}
