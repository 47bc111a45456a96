//! Shell-script plugins written into a temporary directory.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub(crate) struct FakePlugins {
    dir: TempDir,
}

impl FakePlugins {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to allocate plugin directory"),
        }
    }

    pub(crate) fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Writes an executable `/bin/sh` script named `name`.
    pub(crate) fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write plugin script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("mark plugin executable");
        path
    }

    /// Writes a plugin that prints `manifest` for the manifest subcommand.
    pub(crate) fn manifest_plugin(&self, name: &str, manifest: &str) -> PathBuf {
        let body = format!(
            "if [ \"$1\" = \"manifest\" ]; then\n  cat <<'JSON'\n{manifest}\nJSON\n  exit 0\nfi\nexit 0"
        );
        self.script(name, &body)
    }

    /// Writes a regular, non-executable file.
    pub(crate) fn plain_file(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, "not a plugin\n").expect("write plain file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644))
            .expect("set file permissions");
        path
    }
}
