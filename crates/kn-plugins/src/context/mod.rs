//! Named context maps shared between plugin invocations.
//!
//! A context is a flat string-to-string map such as
//! `{"service": "hello", "namespace": "default"}`. The [`ContextStore`] keeps
//! one map per context name; [`DEFAULT_CONTEXT`] is the fallback name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known fallback context name.
pub const DEFAULT_CONTEXT: &str = "default";

/// Environment variable carrying resolved context data to external consumers.
///
/// The value is a JSON object holding only the keys the plugin declared
/// consuming, for example `{"namespace":"default","service":"hello"}`.
pub const CONTEXT_ENV_VAR: &str = "KN_PLUGIN_CONTEXT";

/// Flat key-value context for one context name.
pub type ContextData = BTreeMap<String, String>;

/// Mapping from context name to its [`ContextData`].
///
/// # Example
///
/// ```
/// use kn_plugins::{ContextStore, DEFAULT_CONTEXT};
///
/// let mut store = ContextStore::new();
/// store.set(DEFAULT_CONTEXT, "service", "hello");
/// assert_eq!(store.get(DEFAULT_CONTEXT).get("service").map(String::as_str), Some("hello"));
/// assert!(store.get("staging").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextStore {
    contexts: BTreeMap<String, ContextData>,
}

impl ContextStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            contexts: BTreeMap::new(),
        }
    }

    /// Returns the data stored under `name`, or an empty map.
    #[must_use]
    pub fn get(&self, name: &str) -> ContextData {
        self.contexts.get(name).cloned().unwrap_or_default()
    }

    /// Sets `key` in context `name`, returning the previous value.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.contexts
            .entry(name.into())
            .or_default()
            .insert(key.into(), value.into())
    }

    /// Removes `key` from context `name`, returning the removed value.
    ///
    /// A context left without keys is dropped.
    pub fn remove(&mut self, name: &str, key: &str) -> Option<String> {
        let data = self.contexts.get_mut(name)?;
        let removed = data.remove(key);
        if data.is_empty() {
            self.contexts.remove(name);
        }
        removed
    }

    /// Returns the subset of context `name` restricted to `keys`.
    ///
    /// Keys absent from the context are skipped rather than filled with
    /// empty strings.
    #[must_use]
    pub fn resolve(&self, name: &str, keys: &[String]) -> ContextData {
        let Some(data) = self.contexts.get(name) else {
            return ContextData::new();
        };
        keys.iter()
            .filter_map(|key| data.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }

    /// Iterates over the known context names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    /// Returns `true` when no context holds any data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
