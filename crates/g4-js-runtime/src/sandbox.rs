//! Plugin Sandbox
//!
//! One QuickJS runtime and context per running plugin. The context's global
//! object carries the language built-ins plus exactly two host bindings,
//! `plugin` and `hostFeature`. Dropping the sandbox discards the context and
//! every handler registered inside it.

use rquickjs::context::EvalOptions;
use rquickjs::convert::Coerced;
use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Function, Persistent, Runtime, Value as JsValue};

use crate::capability::{
    host_feature_object, plugin_object, HandlerRegistration, HostFeature, SharedHandlers,
};
use crate::console::{DebugLog, Fault};
use crate::convert::json_to_js;
use crate::error::{JsError, JsResult};

/// Global name of the capability object.
pub const PLUGIN_GLOBAL: &str = "plugin";

/// Global name of the host feature object.
pub const HOST_FEATURE_GLOBAL: &str = "hostFeature";

/// Result of evaluating a plugin script's top-level code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Completed,
    /// The script threw. The description has already been recorded in the
    /// plugin's console.
    Crashed(String),
}

/// Counts for one event delivered into one sandbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub invoked: usize,
    pub failed: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sandbox
// ─────────────────────────────────────────────────────────────────────────────

/// Isolated evaluation context of one running plugin.
///
/// Field order matters: the handler table must release its persistent
/// handles before the context and runtime are freed.
pub struct Sandbox {
    console: DebugLog,
    handlers: SharedHandlers,
    context: Context,
    runtime: Runtime,
}

impl Sandbox {
    /// Create a fresh runtime and bind the capability surface into it.
    pub fn new(console: DebugLog, host_feature: &dyn HostFeature) -> JsResult<Self> {
        let runtime = Runtime::new().map_err(|e| JsError::RuntimeCreation(e.to_string()))?;
        let context = Context::full(&runtime).map_err(|e| JsError::RuntimeCreation(e.to_string()))?;
        let handlers = SharedHandlers::default();

        context
            .with(|ctx| -> rquickjs::Result<()> {
                let globals = ctx.globals();
                globals.set(PLUGIN_GLOBAL, plugin_object(&ctx, &console, &handlers)?)?;
                globals.set(
                    HOST_FEATURE_GLOBAL,
                    host_feature_object(&ctx, host_feature, &console)?,
                )?;
                Ok(())
            })
            .map_err(|e| JsError::Install(e.to_string()))?;

        Ok(Self {
            console,
            handlers,
            context,
            runtime,
        })
    }

    pub fn plugin_id(&self) -> &str {
        self.console.plugin_id()
    }

    /// Run a script's top-level code to completion.
    ///
    /// A thrown exception is recorded as `PluginCrashed` in the console; any
    /// listener registered before the throw stays registered.
    pub fn evaluate(&self, source: &str) -> Evaluation {
        let result = self.context.with(|ctx| {
            let mut options = EvalOptions::default();
            options.global = true;
            options.strict = false;
            options.backtrace_barrier = true;

            ctx.eval_with_options::<JsValue, _>(source, options)
                .catch(&ctx)
                .map(|_| ())
                .map_err(|e| describe(&ctx, e))
        });

        let evaluation = match result {
            Ok(()) => Evaluation::Completed,
            Err(description) => {
                self.console.record_fault(&Fault::PluginCrashed, &description);
                Evaluation::Crashed(description)
            }
        };

        self.drain_jobs(&Fault::PluginCrashed);
        evaluation
    }

    /// Invoke every handler registered for `event_type`, in registration order.
    ///
    /// Handlers are collected before the first one runs, so registrations
    /// made or removed by a handler apply from the next dispatch on.
    pub fn dispatch(&self, event_type: &str, payload: &serde_json::Value) -> Delivery {
        let matching = self.handlers.borrow().matching(event_type);
        let mut delivery = Delivery::default();
        if matching.is_empty() {
            return delivery;
        }

        let fault = Fault::HandlerFailed {
            event_type: event_type.to_string(),
        };

        self.context.with(|ctx| {
            for (id, handler) in matching {
                delivery.invoked += 1;
                if let Err(description) = invoke(&ctx, handler, payload) {
                    delivery.failed += 1;
                    tracing::debug!(
                        plugin = %self.plugin_id(),
                        handler = id.get(),
                        event_type,
                        "Handler failed"
                    );
                    self.console.record_fault(&fault, &description);
                }
            }
        });

        self.drain_jobs(&fault);
        delivery
    }

    /// Current registrations, in registration order.
    pub fn registrations(&self) -> Vec<HandlerRegistration> {
        self.handlers.borrow().registrations()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Run promise jobs queued by the last evaluation or dispatch.
    fn drain_jobs(&self, fault: &Fault) {
        while self.runtime.is_job_pending() {
            match self.runtime.execute_pending_job() {
                Ok(true) => continue,
                Ok(false) => break,
                Err(_) => self
                    .console
                    .record_fault(fault, "uncaught exception in pending job"),
            }
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        self.handlers.borrow_mut().clear();
        self.runtime.run_gc();
        tracing::debug!(plugin = %self.plugin_id(), "Sandbox discarded");
    }
}

fn invoke<'js>(
    ctx: &Ctx<'js>,
    handler: Persistent<Function<'static>>,
    payload: &serde_json::Value,
) -> Result<(), String> {
    let handler = handler.restore(ctx).map_err(|e| e.to_string())?;
    let payload = json_to_js(ctx, payload).map_err(|e| e.to_string())?;
    handler
        .call::<_, JsValue>((payload,))
        .catch(ctx)
        .map(|_| ())
        .map_err(|e| describe(ctx, e))
}

/// Console text for a caught exception. Thrown non-error values are
/// rendered with JavaScript string conversion.
fn describe<'js>(ctx: &Ctx<'js>, error: CaughtError<'js>) -> String {
    let text = match error {
        CaughtError::Value(value) => match value.get::<Coerced<String>>() {
            Ok(text) => text.0,
            Err(_) => {
                // Clear the exception raised by the failed conversion.
                let _ = ctx.catch();
                format!("uncaught {}", value.type_name())
            }
        },
        other => other.to_string(),
    };
    text.trim().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
