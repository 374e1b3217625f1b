// Event Dispatcher - Delivers host events to running plugins

use g4_js_runtime::Delivery;

use crate::plugin::Plugin;

/// Outcome of one `dispatch` call across all plugins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Running plugins with at least one matching handler
    pub plugins: usize,
    pub invoked: usize,
    pub failed: usize,
}

/// Deliver `event_type` with `payload` to every running plugin.
///
/// Stopped plugins are skipped. A failing handler is recorded in its own
/// plugin's console and never stops delivery to the rest.
pub fn dispatch<'a, I>(plugins: I, event_type: &str, payload: &serde_json::Value) -> DispatchReport
where
    I: IntoIterator<Item = &'a Plugin>,
{
    let mut report = DispatchReport::default();

    for plugin in plugins {
        let Some(sandbox) = plugin.sandbox() else {
            continue;
        };

        let delivery: Delivery = sandbox.dispatch(event_type, payload);
        if delivery.invoked > 0 {
            report.plugins += 1;
            report.invoked += delivery.invoked;
            report.failed += delivery.failed;
        }
    }

    tracing::debug!(
        event_type,
        plugins = report.plugins,
        invoked = report.invoked,
        failed = report.failed,
        "Dispatched event"
    );
    report
}
