//! Persistence of context data and manifests to `context.json`.
//!
//! The cache is a pretty-printed JSON document:
//!
//! ```json
//! {
//!     "contextData": {
//!         "default": {
//!             "service": "hello"
//!         }
//!     },
//!     "manifests": {
//!         "kn-service-log": {
//!             "path": "/usr/local/bin/kn-service-log",
//!             "hasManifest": true,
//!             "consumesKeys": ["service"]
//!         }
//!     }
//! }
//! ```
//!
//! Writes go to a temporary file in the same directory that is then renamed
//! over the cache, so readers observe either the old or the new document.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::context::ContextStore;
use crate::error::CacheError;
use crate::manifest::ManifestTable;

/// Tracing target for cache persistence.
const CACHE_TARGET: &str = "kn_plugins::cache";

/// On-disk shape of the context cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDocument {
    /// Context maps keyed by context name.
    #[serde(default)]
    pub context_data: ContextStore,
    /// Manifests keyed by plugin name, in discovery order.
    #[serde(default)]
    pub manifests: ManifestTable,
}

/// Handle on the cache file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextCache {
    path: PathBuf,
}

impl ContextCache {
    /// Creates a handle for the cache at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cache file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cache.
    ///
    /// Returns `Ok(None)` when no cache has been written yet.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] when the file exists but cannot be read
    /// and [`CacheError::Decode`] when it does not hold a cache document.
    pub fn load(&self) -> Result<Option<CacheDocument>, CacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(target: CACHE_TARGET, path = %self.path.display(), "no context cache yet");
                return Ok(None);
            }
            Err(err) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    source: Arc::new(err),
                });
            }
        };
        let document = serde_json::from_slice(&bytes).map_err(|source| CacheError::Decode {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(document))
    }

    /// Atomically replaces the cache with `contexts` and `manifests`.
    ///
    /// The parent directory is created when missing. On Unix the directory
    /// is restricted to the owner and the file to mode `0600`.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when encoding, writing, or renaming fails. A
    /// failed write leaves any previous cache untouched.
    pub fn store(&self, contexts: &ContextStore, manifests: &ManifestTable) -> Result<(), CacheError> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .ok_or_else(|| CacheError::MissingParent {
                path: self.path.clone(),
            })?;
        create_private_dir(parent).map_err(|err| self.write_error(err))?;

        let encoded = encode(contexts, manifests)?;
        let mut file = tempfile::Builder::new()
            .prefix(".context-")
            .suffix(".json.tmp")
            .tempfile_in(parent)
            .map_err(|err| self.write_error(err))?;
        file.write_all(&encoded)
            .and_then(|()| file.as_file().sync_all())
            .map_err(|err| self.write_error(err))?;
        restrict_to_owner(file.as_file()).map_err(|err| self.write_error(err))?;

        file.persist(&self.path)
            .map_err(|err| CacheError::Persist {
                path: self.path.clone(),
                source: Arc::new(err.error),
            })?;
        debug!(target: CACHE_TARGET, path = %self.path.display(), "wrote context cache");
        Ok(())
    }

    fn write_error(&self, err: io::Error) -> CacheError {
        CacheError::Write {
            path: self.path.clone(),
            source: Arc::new(err),
        }
    }
}

/// Serialises the document with four-space indentation and a final newline.
fn encode(contexts: &ContextStore, manifests: &ManifestTable) -> Result<Vec<u8>, CacheError> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Borrowed<'a> {
        context_data: &'a ContextStore,
        manifests: &'a ManifestTable,
    }

    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    Borrowed {
        context_data: contexts,
        manifests,
    }
    .serialize(&mut serializer)
    .map_err(CacheError::Encode)?;
    buffer.push(b'\n');
    Ok(buffer)
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    if dir.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn restrict_to_owner(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests;
