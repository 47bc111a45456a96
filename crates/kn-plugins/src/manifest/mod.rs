//! Manifest types describing which context keys a plugin exchanges.
//!
//! A [`Manifest`] is a plugin's self-declaration for context sharing: the keys
//! it can produce and the keys it wants to consume. External plugins print
//! one as JSON when invoked with the reserved [`MANIFEST_SUBCOMMAND`];
//! built-in plugins hand one over through
//! [`ManifestProvider`](crate::plugin::ManifestProvider).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

mod table;

pub use table::ManifestTable;

/// Subcommand token passed to an external plugin to request its manifest.
pub const MANIFEST_SUBCOMMAND: &str = "manifest";

/// Context-sharing declaration for a single plugin.
///
/// When [`has_manifest`](Self::has_manifest) is false the key accessors
/// return empty slices, whatever was stored.
///
/// # Example
///
/// ```
/// use kn_plugins::Manifest;
///
/// let manifest = Manifest::new(Vec::new(), vec!["service".into(), "namespace".into()]);
/// assert!(manifest.has_manifest());
/// assert_eq!(manifest.consumes_keys(), ["service", "namespace"]);
///
/// let absent = Manifest::absent();
/// assert!(absent.consumes_keys().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(default)]
    has_manifest: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    produces_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    consumes_keys: Vec<String>,
    #[serde(skip)]
    provisional: bool,
}

/// Wire form printed by external plugins.
///
/// `hasManifest` is optional on the wire: a plugin that prints a decodable
/// object without it is taken to have a manifest. Missing and `null` key
/// lists both read as empty.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument {
    #[serde(default)]
    has_manifest: Option<bool>,
    #[serde(default)]
    produces_keys: Option<Vec<String>>,
    #[serde(default)]
    consumes_keys: Option<Vec<String>>,
}

impl Manifest {
    /// Creates a present manifest with the given key declarations.
    ///
    /// Blank keys are dropped and repeated keys keep their first position.
    #[must_use]
    pub fn new(produces_keys: Vec<String>, consumes_keys: Vec<String>) -> Self {
        Self {
            path: None,
            has_manifest: true,
            produces_keys: normalise_keys(produces_keys),
            consumes_keys: normalise_keys(consumes_keys),
            provisional: false,
        }
    }

    /// Creates the "no manifest" marker.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            path: None,
            has_manifest: false,
            produces_keys: Vec::new(),
            consumes_keys: Vec::new(),
            provisional: false,
        }
    }

    /// Marks this result as valid for the current process only.
    ///
    /// Provisional entries are left out of the saved cache, so the plugin is
    /// asked again on the next start. Used when a probe timed out or was
    /// interrupted rather than answered.
    #[must_use]
    pub const fn provisional(mut self) -> Self {
        self.provisional = true;
        self
    }

    /// Whether this result is kept out of the saved cache.
    #[must_use]
    pub const fn is_provisional(&self) -> bool {
        self.provisional
    }

    /// Records the executable path of the owning plugin.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Decodes the JSON an external plugin printed on stdout.
    ///
    /// Only the first JSON value is read; anything printed after it is
    /// ignored. Any `path` field in the document is ignored too; callers
    /// attach the path they invoked with [`with_path`](Self::with_path).
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the output does not
    /// start with a manifest object.
    pub fn decode(output: &[u8]) -> Result<Self, serde_json::Error> {
        let document = serde_json::Deserializer::from_slice(output)
            .into_iter::<ManifestDocument>()
            .next()
            .unwrap_or_else(|| Err(serde::de::Error::custom("no manifest in output")))?;
        let manifest = Self::new(
            document.produces_keys.unwrap_or_default(),
            document.consumes_keys.unwrap_or_default(),
        );
        if document.has_manifest.unwrap_or(true) {
            Ok(manifest)
        } else {
            Ok(Self::absent())
        }
    }

    /// Path of the owning plugin executable; `None` for built-ins.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a manifest was successfully obtained.
    #[must_use]
    pub const fn has_manifest(&self) -> bool {
        self.has_manifest
    }

    /// Context keys the plugin can write.
    #[must_use]
    pub fn produces_keys(&self) -> &[String] {
        if self.has_manifest {
            &self.produces_keys
        } else {
            &[]
        }
    }

    /// Context keys the plugin wants to read.
    #[must_use]
    pub fn consumes_keys(&self) -> &[String] {
        if self.has_manifest {
            &self.consumes_keys
        } else {
            &[]
        }
    }

    /// Returns `true` when the plugin declares at least one consumed key.
    #[must_use]
    pub fn is_consumer(&self) -> bool {
        !self.consumes_keys().is_empty()
    }
}

fn normalise_keys(keys: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(keys.len());
    for key in keys {
        let trimmed = key.trim();
        if trimmed.is_empty() || seen.iter().any(|existing: &String| existing == trimmed) {
            continue;
        }
        seen.push(trimmed.to_owned());
    }
    seen
}
