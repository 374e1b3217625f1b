//! G4 JavaScript Plugin Sandbox
//!
//! Runs plugin scripts in QuickJS. Each running plugin gets its own runtime
//! and context; the only host objects reachable from a script are:
//!
//! - `plugin.addEventListener(type, handler)` - subscribe a function to a host event
//! - `plugin.removeEventListener(type, handler)` - drop the first matching subscription
//! - `plugin.log(msg)` / `plugin.info(msg)` / `plugin.warn(msg)` / `plugin.error(msg)` - console output
//! - `hostFeature` - host-defined actions, empty unless the host installs a [`HostFeature`]
//!
//! # Example
//!
//! ```javascript
//! function onTick(event) {
//!     plugin.log("tick #" + event.count);
//! }
//!
//! plugin.addEventListener("tick", onTick);
//! plugin.info("ready");
//! ```

mod capability;
mod console;
mod convert;
mod error;
mod sandbox;

pub use capability::{EmptyHostFeature, HandlerId, HandlerRegistration, HostFeature};
pub use console::{DebugLog, DebugMessage, Fault, Severity, PLUGIN_LOG_TARGET};
pub use convert::json_to_js;
pub use error::{JsError, JsResult};
pub use sandbox::{Delivery, Evaluation, Sandbox, HOST_FEATURE_GLOBAL, PLUGIN_GLOBAL};

/// Re-exported so host features can be written without a direct dependency.
pub use rquickjs;
