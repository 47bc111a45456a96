//! Configuration loading helpers for the `kn` CLI.
//!
//! Configuration flags are peeled off the front of the argument list and
//! handed to `ortho_config`; everything from the first other token onward is
//! parsed as the command.

use std::ffi::{OsStr, OsString};

use kn_config::{Config, OrthoConfig};

use crate::AppError;

/// Configuration flags that take a value.
///
/// Keep in sync with the fields of [`kn_config::Config`].
const CONFIG_VALUE_FLAGS: &[&str] = &[
    "--config-path",
    "--config-dir",
    "--plugins-dir",
    "--manifest-timeout-secs",
    "--log-filter",
    "--log-format",
];

/// Boolean configuration switches.
const CONFIG_SWITCH_FLAGS: &[&str] = &["--lookup-plugins-in-path", "--no-context-sharing"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// Configuration flags must precede the command; later occurrences are
    /// passed to the command (and so to plugins) untouched.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn classify(argument: &OsStr) -> FlagAction {
    let Some(text) = argument.to_str() else {
        return FlagAction::Skip;
    };
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text, false),
    };

    if CONFIG_VALUE_FLAGS.contains(&flag) {
        return FlagAction::Include {
            needs_value: !has_inline_value,
        };
    }
    if CONFIG_SWITCH_FLAGS.contains(&flag) {
        return FlagAction::Include { needs_value: false };
    }
    FlagAction::Skip
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter();
    while let Some(argument) = remaining.next() {
        match classify(argument) {
            FlagAction::Skip => break,
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                if needs_value {
                    if let Some(value) = remaining.next() {
                        config_arguments.push(value.clone());
                    }
                }
            }
        }
    }

    ConfigArgumentSplit {
        command_start: config_arguments.len(),
        config_arguments,
    }
}

/// Program name followed by the command tokens.
pub(crate) fn command_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}
