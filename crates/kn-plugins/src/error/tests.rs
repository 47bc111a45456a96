//! Unit tests for plugin and cache error types.

use std::path::PathBuf;
use std::sync::Arc;

use rstest::rstest;

use super::*;

#[test]
fn duplicate_error_message_includes_name() {
    let error = PluginError::Duplicate {
        name: "kn-service-log".into(),
    };
    let message = error.to_string();
    assert!(
        message.contains("kn-service-log"),
        "expected name in message: {message}"
    );
    assert!(
        message.contains("already registered"),
        "expected 'already registered' in message: {message}"
    );
}

#[test]
fn spawn_failed_error_message_includes_details() {
    let error = PluginError::SpawnFailed {
        name: "kn-source-kafka".into(),
        message: "permission denied".into(),
        source: None,
    };
    let message = error.to_string();
    assert!(message.contains("kn-source-kafka"), "{message}");
    assert!(message.contains("permission denied"), "{message}");
}

#[rstest]
#[case::timeout(
    PluginError::Timeout {
        name: "slow".into(),
        timeout_ms: 1500,
    },
    "1500"
)]
#[case::non_zero_exit(
    PluginError::NonZeroExit {
        name: "buggy".into(),
        status: 127,
    },
    "127"
)]
fn error_message_includes_numeric_field(#[case] error: PluginError, #[case] expected_value: &str) {
    let message = error.to_string();
    assert!(
        message.contains(expected_value),
        "expected {expected_value} in message: {message}"
    );
}

#[test]
fn errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PluginError>();
    assert_send_sync::<CacheError>();
}

#[test]
fn discovery_error_includes_directory() {
    let error = PluginError::Discovery {
        path: PathBuf::from("/home/dev/.config/kn/plugins"),
        source: Arc::new(std::io::Error::other("denied")),
    };
    let message = error.to_string();
    assert!(message.contains("/home/dev/.config/kn/plugins"), "{message}");
    assert!(message.contains("denied"), "{message}");
}

#[test]
fn cache_persist_error_includes_path() {
    let error = CacheError::Persist {
        path: PathBuf::from("/home/dev/.config/kn/context.json"),
        source: Arc::new(std::io::Error::other("read-only file system")),
    };
    let message = error.to_string();
    assert!(message.contains("context.json"), "{message}");
    assert!(message.contains("read-only file system"), "{message}");
}
