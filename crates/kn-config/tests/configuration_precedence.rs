//! Layering checks for the `ortho_config`-derived loader.

use std::ffi::{OsStr, OsString};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use kn_config::{Config, DEFAULT_LOG_FILTER, OrthoConfig};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let previous = std::env::var_os(key);
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }

    fn lock_only() -> MutexGuard<'static, ()> {
        ENV_MUTEX.lock().expect("env mutex poisoned")
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

fn args(tokens: &[&str]) -> Vec<OsString> {
    tokens.iter().map(OsString::from).collect()
}

#[test]
fn cli_flag_overrides_default_filter() {
    let _guard = EnvOverride::lock_only();
    let config = Config::load_from_iter(args(&["kn", "--log-filter", "kn_plugins=debug"]))
        .expect("load configuration");
    assert_eq!(config.log_filter(), "kn_plugins=debug");
}

#[test]
fn environment_overrides_default_filter() {
    let _env = EnvOverride::set_var("KN_LOG_FILTER", OsStr::new("trace"));
    let config = Config::load_from_iter(args(&["kn"])).expect("load configuration");
    assert_eq!(config.log_filter(), "trace");
}

#[test]
fn bare_invocation_keeps_defaults() {
    let _guard = EnvOverride::lock_only();
    if std::env::var_os("KN_LOG_FILTER").is_some() {
        return;
    }
    let config = Config::load_from_iter(args(&["kn"])).expect("load configuration");
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
}

#[test]
fn context_sharing_is_enabled_without_overrides() {
    let _guard = EnvOverride::lock_only();
    if std::env::var_os("KN_NO_CONTEXT_SHARING").is_some() {
        return;
    }
    let config = Config::load_from_iter(args(&["kn"])).expect("load configuration");
    assert!(config.context_sharing());
}

#[test]
fn cli_switch_disables_context_sharing() {
    let _guard = EnvOverride::lock_only();
    let config = Config::load_from_iter(args(&["kn", "--no-context-sharing"]))
        .expect("load configuration");
    assert!(!config.context_sharing());
}

#[test]
fn environment_disables_context_sharing() {
    let _env = EnvOverride::set_var("KN_NO_CONTEXT_SHARING", OsStr::new("true"));
    let config = Config::load_from_iter(args(&["kn"])).expect("load configuration");
    assert!(!config.context_sharing());
}
