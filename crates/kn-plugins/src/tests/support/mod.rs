//! Shared fixtures for plugin and context tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use crate::context::ContextData;
use crate::error::PluginError;
use crate::fetcher::{ManifestFetcher, ProcessManifestFetcher};
use crate::manifest::Manifest;
use crate::plugin::{ContextConsumer, ManifestProvider, Plugin};
use crate::registry::PluginRegistry;

#[cfg(unix)]
mod fake;

#[cfg(unix)]
pub(crate) use self::fake::FakePlugins;

/// How a [`StubPlugin`] answers manifest queries.
#[derive(Clone)]
enum ManifestAnswer {
    Unsupported,
    Declined,
    Declares(Manifest),
}

/// One recorded invocation of a [`StubPlugin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Invocation {
    Plain(Vec<String>),
    WithContext(Vec<String>, ContextData),
}

/// In-process plugin whose capabilities are chosen per test.
pub(crate) struct StubPlugin {
    name: String,
    answer: ManifestAnswer,
    consumer: bool,
    exit_status: i32,
    invocations: RefCell<Vec<Invocation>>,
}

impl StubPlugin {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            answer: ManifestAnswer::Unsupported,
            consumer: false,
            exit_status: 0,
            invocations: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.answer = ManifestAnswer::Declares(manifest);
        self
    }

    pub(crate) fn with_declined_manifest(mut self) -> Self {
        self.answer = ManifestAnswer::Declined;
        self
    }

    pub(crate) const fn consuming(mut self) -> Self {
        self.consumer = true;
        self
    }

    pub(crate) const fn exiting_with(mut self, status: i32) -> Self {
        self.exit_status = status;
        self
    }

    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }
}

impl Plugin for StubPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, args: &[String]) -> Result<i32, PluginError> {
        self.invocations
            .borrow_mut()
            .push(Invocation::Plain(args.to_vec()));
        Ok(self.exit_status)
    }

    fn manifest_provider(&self) -> Option<&dyn ManifestProvider> {
        match self.answer {
            ManifestAnswer::Unsupported => None,
            ManifestAnswer::Declined | ManifestAnswer::Declares(_) => Some(self),
        }
    }

    fn context_consumer(&self) -> Option<&dyn ContextConsumer> {
        self.consumer.then_some(self as &dyn ContextConsumer)
    }
}

impl ManifestProvider for StubPlugin {
    fn manifest(&self) -> Option<Manifest> {
        match &self.answer {
            ManifestAnswer::Declares(manifest) => Some(manifest.clone()),
            ManifestAnswer::Unsupported | ManifestAnswer::Declined => None,
        }
    }
}

impl ContextConsumer for StubPlugin {
    fn execute_with_context(
        &self,
        args: &[String],
        data: &ContextData,
    ) -> Result<i32, PluginError> {
        self.invocations
            .borrow_mut()
            .push(Invocation::WithContext(args.to_vec(), data.clone()));
        Ok(self.exit_status)
    }
}

mockall::mock! {
    pub(crate) Registry {}

    impl PluginRegistry for Registry {
        fn list_plugins(&self) -> Result<Vec<Arc<dyn Plugin>>, PluginError>;
    }
}

/// Registry returning a fixed plugin list.
#[derive(Default)]
pub(crate) struct StaticRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl StaticRegistry {
    pub(crate) const fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub(crate) fn push(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }
}

impl PluginRegistry for StaticRegistry {
    fn list_plugins(&self) -> Result<Vec<Arc<dyn Plugin>>, PluginError> {
        Ok(self.plugins.clone())
    }
}

/// Fetcher answering from a table and recording every request.
///
/// Plugins without a scripted answer fall through to the production fetcher.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    answers: HashMap<String, Option<Manifest>>,
    requests: RefCell<Vec<String>>,
    fallback: ProcessManifestFetcher,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn answer(&mut self, name: &str, manifest: Option<Manifest>) {
        self.answers.insert(name.to_owned(), manifest);
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ManifestFetcher for ScriptedFetcher {
    fn fetch(&self, plugin: &dyn Plugin) -> Option<Manifest> {
        self.requests.borrow_mut().push(plugin.name().to_owned());
        match self.answers.get(plugin.name()) {
            Some(answer) => answer.clone(),
            None => self.fallback.fetch(plugin),
        }
    }
}

/// In-memory sink for formatted tracing output.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let buffer = self.buffer.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `action` under a scoped subscriber and returns its formatted events.
pub(crate) fn capture_logs<T>(action: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, action);
    (result, logs.contents())
}
