//! Plugin Console
//!
//! Every message a plugin produces, whether through `plugin.log()` and friends
//! or through a captured exception, lands here. Messages are kept for later
//! inspection and emitted to the tracing sink at the same moment.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Tracing target for plugin output.
pub const PLUGIN_LOG_TARGET: &str = "g4::plugin";

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Severity of a console message, one per `plugin.*` logging method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Severity {
    Log,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single console entry attributed to one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DebugMessage {
    pub plugin_id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub text: String,
}

/// A failure raised by plugin code and contained at the plugin boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The script threw while its top-level code was evaluated.
    PluginCrashed,
    /// A handler threw while an event was dispatched to it.
    HandlerFailed { event_type: String },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PluginCrashed => f.write_str("PluginCrashed"),
            Self::HandlerFailed { event_type } => write!(f, "HandlerFailed({event_type})"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Debug Log
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only console of a single plugin.
///
/// Cloning yields another handle to the same log. The plugin record keeps one
/// handle and the sandbox hands further clones to the `plugin.*` functions, so
/// the history outlives any one sandbox.
#[derive(Debug, Clone)]
pub struct DebugLog {
    plugin_id: Rc<str>,
    messages: Rc<RefCell<Vec<DebugMessage>>>,
}

impl DebugLog {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        let plugin_id: String = plugin_id.into();
        Self {
            plugin_id: Rc::from(plugin_id),
            messages: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Append a message and surface it through tracing.
    pub fn record(&self, severity: Severity, text: impl Into<String>) {
        let message = DebugMessage {
            plugin_id: self.plugin_id.to_string(),
            timestamp: Utc::now(),
            severity,
            text: text.into(),
        };
        emit(&message);
        self.messages.borrow_mut().push(message);
    }

    /// Record a contained failure as an error entry.
    pub fn record_fault(&self, fault: &Fault, description: &str) {
        self.record(Severity::Error, format!("{fault}: {description}"));
    }

    /// Copy of every message recorded so far, oldest first.
    pub fn messages(&self) -> Vec<DebugMessage> {
        self.messages.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

fn emit(message: &DebugMessage) {
    let id = message.plugin_id.as_str();
    match message.severity {
        Severity::Log | Severity::Info => {
            tracing::info!(target: PLUGIN_LOG_TARGET, plugin = %id, "[PLUGIN {}] {}", id, message.text)
        }
        Severity::Warn => {
            tracing::warn!(target: PLUGIN_LOG_TARGET, plugin = %id, "[PLUGIN {}] {}", id, message.text)
        }
        Severity::Error => {
            tracing::error!(target: PLUGIN_LOG_TARGET, plugin = %id, "[PLUGIN {}] {}", id, message.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_in_order() {
        let log = DebugLog::new("alpha");
        log.record(Severity::Log, "first");
        log.record(Severity::Warn, "second");

        let messages = log.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[0].severity, Severity::Log);
        assert_eq!(messages[1].severity, Severity::Warn);
        assert!(messages.iter().all(|m| m.plugin_id == "alpha"));
    }

    #[test]
    fn test_clones_share_history() {
        let log = DebugLog::new("alpha");
        let handle = log.clone();
        handle.record(Severity::Info, "from clone");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_record_fault_is_error() {
        let log = DebugLog::new("alpha");
        log.record_fault(
            &Fault::HandlerFailed {
                event_type: "tick".into(),
            },
            "Error: boom",
        );

        let messages = log.messages();
        assert_eq!(messages[0].severity, Severity::Error);
        assert_eq!(messages[0].text, "HandlerFailed(tick): Error: boom");
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let log = DebugLog::new("alpha");
        log.record(Severity::Error, "bad");
        let json = serde_json::to_value(&log.messages()[0]).unwrap();
        assert_eq!(json["pluginId"], "alpha");
        assert_eq!(json["severity"], "error");
    }
}
