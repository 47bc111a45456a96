//! Command-line surface of `kn`.

use clap::{Parser, Subcommand};
use kn_plugins::DEFAULT_CONTEXT;

/// Command-line interface for `kn`.
#[derive(Parser, Debug)]
#[command(name = "kn", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Context whose data is shared with plugins.
    #[arg(long, global = true, value_name = "NAME", default_value = DEFAULT_CONTEXT)]
    pub(crate) context: String,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Inspects installed plugins.
    Plugin {
        #[command(subcommand)]
        action: PluginAction,
    },
    /// Reads and edits the context shared with plugins.
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },
    /// Runs a plugin: `kn service log hello` runs `kn-service-log hello`.
    #[command(external_subcommand)]
    External(Vec<String>),
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub(crate) enum PluginAction {
    /// Lists discovered plugins.
    List,
    /// Prints every known plugin manifest as JSON.
    Manifests,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum ContextAction {
    /// Prints a context as JSON.
    Get {
        /// Context to print; defaults to `--context`.
        name: Option<String>,
    },
    /// Sets keys in the selected context.
    Set {
        /// Assignments of the form `KEY=VALUE`.
        #[arg(required = true, value_name = "KEY=VALUE", value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },
    /// Removes keys from the selected context.
    Unset {
        /// Keys to remove.
        #[arg(required = true, value_name = "KEY")]
        keys: Vec<String>,
    },
    /// Prints the keys a plugin produces and consumes.
    Keys {
        /// Plugin name, with or without the `kn-` prefix.
        plugin: String,
    },
}

fn parse_assignment(text: &str) -> Result<(String, String), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, found '{text}'"))?;
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(format!("missing key in '{text}'"));
    }
    Ok((trimmed.to_owned(), value.to_owned()))
}
