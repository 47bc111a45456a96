//! Plugin execution with context injection.
//!
//! [`PluginRunner`] asks the [`ContextDataManager`] which keys a plugin
//! consumes, resolves them from the active context, and hands the result to
//! the plugin's [`ContextConsumer`](crate::plugin::ContextConsumer)
//! capability. Plugins that consume nothing, or cannot accept context, run
//! through [`Plugin::execute`] unchanged.

use tracing::debug;

use crate::context::DEFAULT_CONTEXT;
use crate::error::PluginError;
use crate::manager::ContextDataManager;
use crate::plugin::Plugin;

/// Tracing target for plugin execution.
const RUNNER_TARGET: &str = "kn_plugins::runner";

/// Executes plugins, injecting the context they consume.
#[derive(Debug, Clone)]
pub struct PluginRunner<'a> {
    manager: Option<&'a ContextDataManager>,
    context: String,
}

impl<'a> PluginRunner<'a> {
    /// Creates a runner drawing context from `manager`'s default context.
    #[must_use]
    pub fn new(manager: &'a ContextDataManager) -> Self {
        Self {
            manager: Some(manager),
            context: DEFAULT_CONTEXT.to_owned(),
        }
    }

    /// Creates a runner that never injects context.
    #[must_use]
    pub fn without_context() -> Self {
        Self {
            manager: None,
            context: DEFAULT_CONTEXT.to_owned(),
        }
    }

    /// Selects the context name to resolve.
    #[must_use]
    pub fn with_context(mut self, name: impl Into<String>) -> Self {
        self.context = name.into();
        self
    }

    /// Active context name.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Runs `plugin` with `args` and returns its exit status.
    ///
    /// # Errors
    ///
    /// Returns the plugin's [`PluginError`] when it cannot run.
    pub fn run(&self, plugin: &dyn Plugin, args: &[String]) -> Result<i32, PluginError> {
        let consumed = self
            .manager
            .map(|manager| manager.get_consumes_keys(plugin.name()))
            .unwrap_or_default();
        let consumer = plugin.context_consumer();

        match (self.manager, consumer) {
            (Some(manager), Some(consumer)) if !consumed.is_empty() => {
                let data = manager.resolve_for(plugin.name(), &self.context);
                debug!(
                    target: RUNNER_TARGET,
                    plugin = plugin.name(),
                    context = %self.context,
                    keys = ?data.keys().collect::<Vec<_>>(),
                    "running plugin with context"
                );
                consumer.execute_with_context(args, &data)
            }
            _ => {
                debug!(target: RUNNER_TARGET, plugin = plugin.name(), "running plugin");
                plugin.execute(args)
            }
        }
    }
}
