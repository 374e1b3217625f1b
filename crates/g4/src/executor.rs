// Sandboxed Executor - Starts and stops plugin scripts

use std::rc::Rc;

use g4_js_runtime::{EmptyHostFeature, Evaluation, HostFeature, Sandbox};

use crate::error::{PluginError, Result};
use crate::plugin::Plugin;

/// Runs plugin scripts in fresh sandboxes.
///
/// The same host feature is installed into every sandbox this executor
/// creates.
#[derive(Clone)]
pub struct SandboxedExecutor {
    host_feature: Rc<dyn HostFeature>,
}

impl SandboxedExecutor {
    pub fn new(host_feature: Rc<dyn HostFeature>) -> Self {
        Self { host_feature }
    }

    /// Start `plugin`. A no-op if it is already running.
    ///
    /// The script is read before any sandbox exists, so an unreadable script
    /// leaves the plugin stopped. A script that throws still leaves the
    /// plugin running; the exception is in its console.
    pub fn run(&self, plugin: &mut Plugin) -> Result<()> {
        if plugin.is_running() {
            tracing::debug!(plugin = %plugin.id(), "Plugin already running");
            return Ok(());
        }

        let path = plugin.script_path();
        let source = std::fs::read_to_string(&path)
            .map_err(|source| PluginError::ScriptUnreadable { path, source })?;

        let sandbox = Sandbox::new(plugin.console().clone(), self.host_feature.as_ref())?;
        match sandbox.evaluate(&source) {
            Evaluation::Completed => {
                tracing::info!(
                    plugin = %plugin.id(),
                    handlers = sandbox.handler_count(),
                    "Started plugin: {} v{}",
                    plugin.manifest().name,
                    plugin.manifest().version
                );
            }
            Evaluation::Crashed(error) => {
                tracing::warn!(
                    plugin = %plugin.id(),
                    handlers = sandbox.handler_count(),
                    %error,
                    "Plugin script threw during start"
                );
            }
        }

        plugin.attach(sandbox);
        Ok(())
    }

    /// Stop `plugin`, discarding its sandbox and every registered handler.
    /// Returns `false` if it was not running.
    pub fn stop(&self, plugin: &mut Plugin) -> bool {
        match plugin.detach() {
            Some(sandbox) => {
                drop(sandbox);
                tracing::info!(plugin = %plugin.id(), "Stopped plugin");
                true
            }
            None => false,
        }
    }
}

impl Default for SandboxedExecutor {
    fn default() -> Self {
        Self::new(Rc::new(EmptyHostFeature))
    }
}
