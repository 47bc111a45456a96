//! Command dispatch over one CLI session.
//!
//! A [`Session`] is the composition root: it owns the plugin registry, the
//! context-data manager, and the manifest fetcher for the lifetime of one
//! `kn` invocation.

use std::io::Write;
use std::process::ExitCode;

use kn_config::{Config, ConfigPaths};
use kn_plugins::plugin::PLUGIN_PREFIX;
use kn_plugins::{
    CancellationFlag, ContextCache, ContextDataManager, PluginManager, PluginRegistry,
    PluginRunner, ProcessManifestFetcher, find_plugin,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::AppError;
use crate::cli::{CliCommand, ContextAction, PluginAction};

/// Tracing target for CLI dispatch.
const CLI_TARGET: &str = "kn_cli";

pub(crate) struct Session {
    registry: PluginManager,
    manager: ContextDataManager,
    fetcher: ProcessManifestFetcher,
    cancel: CancellationFlag,
    context_sharing: bool,
}

impl Session {
    pub(crate) fn open(config: &Config, cancel: CancellationFlag) -> Result<Self, AppError> {
        let paths = ConfigPaths::from_config(config)?;
        let mut registry = PluginManager::new(paths.plugins_dir());
        if config.lookup_plugins_in_path() {
            registry = registry.with_env_path();
        }

        let manager = if config.context_sharing() {
            ContextDataManager::load(ContextCache::new(paths.context_cache_path()))
        } else {
            debug!(target: CLI_TARGET, "context sharing disabled");
            ContextDataManager::in_memory()
        };

        Ok(Self {
            registry,
            manager,
            fetcher: ProcessManifestFetcher::new(config.manifest_timeout(), cancel.clone()),
            cancel,
            context_sharing: config.context_sharing(),
        })
    }

    pub(crate) fn dispatch<W: Write>(
        &mut self,
        cli: crate::cli::Cli,
        stdout: &mut W,
    ) -> Result<ExitCode, AppError> {
        match cli.command {
            CliCommand::Plugin {
                action: PluginAction::List,
            } => self.list_plugins(stdout),
            CliCommand::Plugin {
                action: PluginAction::Manifests,
            } => self.print_manifests(stdout),
            CliCommand::Context { action } => self.context(action, &cli.context, stdout),
            CliCommand::External(tokens) => self.run_plugin(&tokens, &cli.context),
        }
    }

    fn list_plugins<W: Write>(&self, stdout: &mut W) -> Result<ExitCode, AppError> {
        for plugin in self.registry.list_plugins()? {
            match plugin.path() {
                Some(path) => writeln!(stdout, "{}\t{}", plugin.name(), path.display())?,
                None => writeln!(stdout, "{}\tbuilt-in", plugin.name())?,
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn print_manifests<W: Write>(&mut self, stdout: &mut W) -> Result<ExitCode, AppError> {
        self.refresh()?;
        write_json(stdout, self.manager.manifests())?;
        self.save_or_warn();
        Ok(ExitCode::SUCCESS)
    }

    fn context<W: Write>(
        &mut self,
        action: ContextAction,
        selected: &str,
        stdout: &mut W,
    ) -> Result<ExitCode, AppError> {
        match action {
            ContextAction::Get { name } => {
                let data = self.manager.get_context(name.as_deref().unwrap_or(selected));
                write_json(stdout, &data)?;
            }
            ContextAction::Set { assignments } => {
                self.require_sharing()?;
                for (key, value) in &assignments {
                    self.manager.set_value(selected, key, value);
                }
                self.manager.write_cache().map_err(AppError::SaveContext)?;
            }
            ContextAction::Unset { keys } => {
                self.require_sharing()?;
                for key in &keys {
                    if self.manager.remove_value(selected, key).is_none() {
                        warn!(
                            target: CLI_TARGET,
                            context = selected,
                            key = key.as_str(),
                            "key was not set"
                        );
                    }
                }
                self.manager.write_cache().map_err(AppError::SaveContext)?;
            }
            ContextAction::Keys { plugin } => {
                self.refresh()?;
                let name = qualified_name(&plugin);
                let keys = PluginKeys {
                    produces: self.manager.get_produces_keys(&name),
                    consumes: self.manager.get_consumes_keys(&name),
                    plugin: &name,
                };
                write_json(stdout, &keys)?;
                self.save_or_warn();
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn run_plugin(&mut self, tokens: &[String], context: &str) -> Result<ExitCode, AppError> {
        let share = match self.refresh() {
            Ok(_) => self.context_sharing,
            Err(AppError::Interrupted) => return Err(AppError::Interrupted),
            Err(error) => {
                warn!(target: CLI_TARGET, %error, "running plugin without context");
                false
            }
        };

        let Some(found) = find_plugin(&self.registry, tokens)? else {
            return Err(AppError::UnknownCommand(tokens.join(" ")));
        };
        let args = tokens.get(found.consumed..).unwrap_or_default();

        let runner = if share {
            PluginRunner::new(&self.manager)
        } else {
            PluginRunner::without_context()
        };
        let status = runner.with_context(context).run(found.plugin.as_ref(), args)?;
        debug!(target: CLI_TARGET, plugin = found.plugin.name(), status, "plugin finished");

        if share {
            self.save_or_warn();
        }
        Ok(exit_code(status))
    }

    /// Fetches manifests for newly installed plugins.
    fn refresh(&mut self) -> Result<usize, AppError> {
        if !self.context_sharing {
            return Ok(0);
        }
        let recorded = self.manager.fetch_manifests(&self.registry, &self.fetcher)?;
        if self.cancel.is_cancelled() {
            return Err(AppError::Interrupted);
        }
        Ok(recorded)
    }

    fn require_sharing(&self) -> Result<(), AppError> {
        if self.context_sharing {
            Ok(())
        } else {
            Err(AppError::ContextSharingDisabled)
        }
    }

    fn save_or_warn(&self) {
        if let Err(error) = self.manager.write_cache() {
            warn!(target: CLI_TARGET, %error, "failed to save context cache");
        }
    }
}

#[derive(Serialize)]
struct PluginKeys<'a> {
    plugin: &'a str,
    produces: &'a [String],
    consumes: &'a [String],
}

/// `service log` and `service-log` both name `kn-service-log`.
fn qualified_name(plugin: &str) -> String {
    let joined = plugin.split_whitespace().collect::<Vec<_>>().join("-");
    if joined.starts_with(PLUGIN_PREFIX) {
        joined
    } else {
        format!("{PLUGIN_PREFIX}{joined}")
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(stdout: &mut W, value: &T) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

pub(crate) fn exit_code(status: i32) -> ExitCode {
    u8::try_from(status).map_or(ExitCode::FAILURE, ExitCode::from)
}
