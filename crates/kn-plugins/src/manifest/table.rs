//! Insertion-ordered manifest map.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Manifest;

/// Manifests keyed by plugin name, kept in discovery order.
///
/// The order matters: the producer and consumer indexes are defined as a
/// replay of this table, so it survives a round trip through the cache as a
/// JSON object whose members appear in discovery order. The first entry
/// recorded for a name is never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestTable {
    entries: Vec<(String, Manifest)>,
}

impl ManifestTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Looks up the manifest recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Manifest> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, manifest)| manifest)
    }

    /// Returns `true` when `name` already has an entry.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Records `manifest` for `name` unless an entry exists.
    ///
    /// Returns `true` when the entry was added.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, manifest: Manifest) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, manifest));
        true
    }

    /// Iterates over `(plugin name, manifest)` pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Manifest)> {
        self.entries
            .iter()
            .map(|(name, manifest)| (name.as_str(), manifest))
    }

    /// Number of recorded plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Provisional entries are skipped.
impl Serialize for ManifestTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().filter(|(_, manifest)| !manifest.is_provisional()))
    }
}

impl<'de> Deserialize<'de> for ManifestTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor)
    }
}

struct TableVisitor;

impl<'de> Visitor<'de> for TableVisitor {
    type Value = ManifestTable;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of plugin names to manifests")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = ManifestTable::new();
        while let Some((name, manifest)) = access.next_entry::<String, Manifest>()? {
            table.insert_if_absent(name, manifest);
        }
        Ok(table)
    }
}
