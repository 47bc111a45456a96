//! Unit tests for the context cache file.

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::manifest::Manifest;

#[fixture]
fn cache_dir() -> TempDir {
    TempDir::new().expect("temp dir")
}

fn sample_state() -> (ContextStore, ManifestTable) {
    let mut contexts = ContextStore::new();
    contexts.set("default", "service", "hello");
    contexts.set("default", "namespace", "default");
    contexts.set("staging", "namespace", "stage");

    let mut manifests = ManifestTable::new();
    manifests.insert_if_absent(
        "kn-service-log",
        Manifest::new(Vec::new(), vec!["service".into(), "namespace".into()])
            .with_path("/usr/local/bin/kn-service-log"),
    );
    manifests.insert_if_absent("kn-legacy", Manifest::absent().with_path("/opt/kn-legacy"));
    manifests.insert_if_absent("kn-builtin", Manifest::absent());
    (contexts, manifests)
}

#[rstest]
fn missing_cache_loads_as_none(cache_dir: TempDir) {
    let cache = ContextCache::new(cache_dir.path().join("context.json"));
    assert_eq!(cache.load().expect("missing file is not an error"), None);
}

#[rstest]
fn stored_state_loads_back(cache_dir: TempDir) {
    let cache = ContextCache::new(cache_dir.path().join("context.json"));
    let (contexts, manifests) = sample_state();
    cache.store(&contexts, &manifests).expect("store");

    let document = cache.load().expect("load").expect("document present");
    assert_eq!(document.context_data, contexts);
    assert_eq!(document.manifests, manifests);
    let order: Vec<_> = document.manifests.iter().map(|(name, _)| name).collect();
    assert_eq!(order, ["kn-service-log", "kn-legacy", "kn-builtin"]);
}

#[rstest]
fn store_writes_indented_camel_case_json(cache_dir: TempDir) {
    let cache = ContextCache::new(cache_dir.path().join("context.json"));
    let (contexts, manifests) = sample_state();
    cache.store(&contexts, &manifests).expect("store");

    let text = fs::read_to_string(cache.path()).expect("read cache");
    assert!(text.starts_with("{\n    \"contextData\": {"), "{text}");
    assert!(text.contains("\"hasManifest\": true"), "{text}");
    assert!(text.contains("\"consumesKeys\""), "{text}");
    assert!(text.ends_with("}\n"), "{text}");
}

#[rstest]
fn store_creates_missing_parent_directories(cache_dir: TempDir) {
    let path = cache_dir.path().join("nested").join("kn").join("context.json");
    let cache = ContextCache::new(&path);
    cache
        .store(&ContextStore::new(), &ManifestTable::new())
        .expect("store");
    assert!(path.is_file());
}

#[rstest]
fn store_replaces_previous_contents_without_leftovers(cache_dir: TempDir) {
    let cache = ContextCache::new(cache_dir.path().join("context.json"));
    let (contexts, manifests) = sample_state();
    cache.store(&contexts, &manifests).expect("first store");
    cache
        .store(&ContextStore::new(), &ManifestTable::new())
        .expect("second store");

    let document = cache.load().expect("load").expect("document present");
    assert_eq!(document, CacheDocument::default());
    let entries: Vec<_> = fs::read_dir(cache_dir.path())
        .expect("list dir")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    assert_eq!(entries, [std::ffi::OsString::from("context.json")]);
}

#[rstest]
#[case::not_json("not json at all")]
#[case::wrong_shape("[1, 2, 3]")]
#[case::bad_context_value(r#"{"contextData": {"default": {"service": 3}}}"#)]
fn undecodable_cache_is_reported(cache_dir: TempDir, #[case] contents: &str) {
    let path = cache_dir.path().join("context.json");
    fs::write(&path, contents).expect("seed cache");
    let err = ContextCache::new(&path).load().expect_err("decode fails");
    assert!(matches!(err, CacheError::Decode { .. }), "{err}");
}

#[rstest]
fn sections_default_when_omitted(cache_dir: TempDir) {
    let path = cache_dir.path().join("context.json");
    fs::write(&path, r#"{"contextData": {"default": {"service": "hello"}}}"#).expect("seed");
    let document = ContextCache::new(&path).load().expect("load").expect("present");
    assert!(document.manifests.is_empty());
    assert_eq!(
        document.context_data.get("default").get("service").map(String::as_str),
        Some("hello")
    );
}

#[test]
fn bare_file_name_has_no_parent() {
    let cache = ContextCache::new("context.json");
    let err = cache
        .store(&ContextStore::new(), &ManifestTable::new())
        .expect_err("no parent");
    assert!(matches!(err, CacheError::MissingParent { .. }), "{err}");
}

#[cfg(unix)]
#[rstest]
fn cache_file_is_owner_only(cache_dir: TempDir) {
    use std::os::unix::fs::PermissionsExt;

    let cache = ContextCache::new(cache_dir.path().join("kn").join("context.json"));
    cache
        .store(&ContextStore::new(), &ManifestTable::new())
        .expect("store");
    let mode = fs::metadata(cache.path()).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    let dir_mode = fs::metadata(cache_dir.path().join("kn"))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(dir_mode & 0o777, 0o700);
}
