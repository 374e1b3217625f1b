//! Read-only view of a plugin for the plugin list UI.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use g4_js_runtime::DebugMessage;

use crate::plugin::RunState;

/// Everything the plugin list needs to render one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PluginSnapshot {
    /// Directory id, used for every operation on the plugin
    pub id: String,
    pub name: String,
    pub author: String,
    pub description: String,
    /// Absolute icon path
    pub icon: String,
    pub version: String,
    pub run_state: RunState,
    pub handler_count: usize,
    pub debug_messages: Vec<DebugMessage>,
}
