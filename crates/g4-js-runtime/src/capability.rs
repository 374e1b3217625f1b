//! Capability Surface
//!
//! Builds the two objects a plugin script can see of the host:
//!
//! - `plugin`: event subscription and console output
//! - `hostFeature`: domain actions installed by the host through [`HostFeature`]
//!
//! Nothing else is bound into a plugin's context.

use std::cell::RefCell;
use std::rc::Rc;

use rquickjs::convert::Coerced;
use rquickjs::function::Opt;
use rquickjs::{Ctx, Function, Object, Persistent, Result, Value as JsValue};

use crate::console::{DebugLog, Severity};

// ─────────────────────────────────────────────────────────────────────────────
// Handler Table
// ─────────────────────────────────────────────────────────────────────────────

/// Host-side token for one `addEventListener` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// What the host can see of a registration. The callable itself stays in
/// the plugin's context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRegistration {
    pub id: HandlerId,
    pub event_type: String,
}

pub(crate) struct HandlerEntry {
    pub(crate) id: HandlerId,
    pub(crate) event_type: String,
    pub(crate) handler: Persistent<Function<'static>>,
}

/// Registrations of one running plugin, in registration order.
#[derive(Default)]
pub(crate) struct HandlerTable {
    next_id: u64,
    entries: Vec<HandlerEntry>,
}

pub(crate) type SharedHandlers = Rc<RefCell<HandlerTable>>;

impl HandlerTable {
    /// Append a registration. Duplicate (event type, handler) pairs are kept.
    pub(crate) fn add(&mut self, event_type: String, handler: Persistent<Function<'static>>) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.entries.push(HandlerEntry {
            id,
            event_type,
            handler,
        });
        id
    }

    /// Remove the first registration matching `event_type` whose handler is
    /// the very same function object as `handler`.
    pub(crate) fn remove_first<'js>(
        &mut self,
        ctx: &Ctx<'js>,
        event_type: &str,
        handler: &JsValue<'js>,
    ) -> Result<Option<HandlerId>> {
        let mut found = None;
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.event_type != event_type {
                continue;
            }
            let registered = entry.handler.clone().restore(ctx)?;
            if registered.as_value() == handler {
                found = Some(index);
                break;
            }
        }

        Ok(found.map(|index| self.entries.remove(index).id))
    }

    /// Handlers for `event_type`, in registration order.
    pub(crate) fn matching(&self, event_type: &str) -> Vec<(HandlerId, Persistent<Function<'static>>)> {
        self.entries
            .iter()
            .filter(|entry| entry.event_type == event_type)
            .map(|entry| (entry.id, entry.handler.clone()))
            .collect()
    }

    pub(crate) fn registrations(&self) -> Vec<HandlerRegistration> {
        self.entries
            .iter()
            .map(|entry| HandlerRegistration {
                id: entry.id,
                event_type: entry.event_type.clone(),
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every persistent handle. Must run before the owning runtime goes away.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host Feature
// ─────────────────────────────────────────────────────────────────────────────

/// Extension point for host actions exposed to plugins as `hostFeature`.
///
/// Implementors add members to `target`, the single object every plugin sees
/// as `hostFeature`. `console` belongs to the plugin being set up, so a
/// feature can attribute its own messages to that plugin.
pub trait HostFeature {
    fn install<'js>(&self, ctx: &Ctx<'js>, target: &Object<'js>, console: &DebugLog) -> Result<()>;
}

/// The base host feature: an empty object.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHostFeature;

impl HostFeature for EmptyHostFeature {
    fn install<'js>(&self, _ctx: &Ctx<'js>, _target: &Object<'js>, _console: &DebugLog) -> Result<()> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Installation
// ─────────────────────────────────────────────────────────────────────────────

const CONSOLE_METHODS: [Severity; 4] = [Severity::Log, Severity::Info, Severity::Warn, Severity::Error];

/// Build the `plugin` object for one plugin.
///
/// `addEventListener` only accepts functions. Any other listener, including
/// an object with a `handleEvent` method, throws a conversion error in the
/// calling script and nothing is registered.
pub(crate) fn plugin_object<'js>(
    ctx: &Ctx<'js>,
    console: &DebugLog,
    handlers: &SharedHandlers,
) -> Result<Object<'js>> {
    let plugin = Object::new(ctx.clone())?;

    let table = handlers.clone();
    plugin.set(
        "addEventListener",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, event_type: Coerced<String>, handler: Function<'js>| {
                let handler = Persistent::save(&ctx, handler);
                table.borrow_mut().add(event_type.0, handler);
            },
        )?,
    )?;

    let table = handlers.clone();
    plugin.set(
        "removeEventListener",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, event_type: Coerced<String>, handler: Opt<JsValue<'js>>| -> Result<()> {
                if let Some(handler) = handler.0 {
                    table.borrow_mut().remove_first(&ctx, &event_type.0, &handler)?;
                }
                Ok(())
            },
        )?,
    )?;

    for severity in CONSOLE_METHODS {
        let console = console.clone();
        plugin.set(
            severity.as_str(),
            Function::new(ctx.clone(), move |message: Opt<Coerced<String>>| {
                console.record(severity, message.0.map(|m| m.0).unwrap_or_default());
            })?,
        )?;
    }

    Ok(plugin)
}

/// Build the `hostFeature` object for one plugin.
pub(crate) fn host_feature_object<'js>(
    ctx: &Ctx<'js>,
    feature: &dyn HostFeature,
    console: &DebugLog,
) -> Result<Object<'js>> {
    let target = Object::new(ctx.clone())?;
    feature.install(ctx, &target, console)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    /// Run `script` against a bare `plugin` object and return what it left behind.
    fn eval_with_plugin(script: &str) -> (DebugLog, Vec<HandlerRegistration>) {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        let console = DebugLog::new("test");
        let handlers = SharedHandlers::default();

        context.with(|ctx| {
            let plugin = plugin_object(&ctx, &console, &handlers).unwrap();
            ctx.globals().set("plugin", plugin).unwrap();
            let _: JsValue = ctx.eval(script).unwrap();
        });

        let registrations = handlers.borrow().registrations();
        handlers.borrow_mut().clear();
        (console, registrations)
    }

    #[test]
    fn test_plugin_object_methods() {
        let (console, _) = eval_with_plugin(
            r#"
            for (const name of ["addEventListener", "removeEventListener", "log", "info", "warn", "error"]) {
                if (typeof plugin[name] !== "function") plugin.error("missing " + name);
            }
            "#,
        );
        assert!(console.is_empty());
    }

    #[test]
    fn test_console_methods_record_severity() {
        let (console, _) =
            eval_with_plugin("plugin.log('a'); plugin.info('b'); plugin.warn('c'); plugin.error(42);");

        let messages = console.messages();
        let severities: Vec<Severity> = messages.iter().map(|m| m.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Log, Severity::Info, Severity::Warn, Severity::Error]
        );
        assert_eq!(messages[3].text, "42");
    }

    #[test]
    fn test_remove_takes_first_match_only() {
        let (_, registrations) = eval_with_plugin(
            r#"
            function h() {}
            function other() {}
            plugin.addEventListener("tick", h);
            plugin.addEventListener("tick", h);
            plugin.addEventListener("tick", other);
            plugin.removeEventListener("tick", h);
            plugin.removeEventListener("tock", other);
            "#,
        );

        assert_eq!(registrations.len(), 2);
        // The surviving `h` is the second one registered.
        assert_eq!(registrations[0].id.get(), 2);
        assert_eq!(registrations[1].id.get(), 3);
    }

    #[test]
    fn test_non_callable_listener_is_rejected() {
        let (console, registrations) = eval_with_plugin(
            r#"
            try {
                plugin.addEventListener("tick", { handleEvent() {} });
            } catch (e) {
                plugin.error("rejected");
            }
            "#,
        );

        assert!(registrations.is_empty());
        let messages = console.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "rejected");
    }

    #[test]
    fn test_remove_unknown_handler_is_noop() {
        let (_, registrations) = eval_with_plugin(
            r#"
            plugin.addEventListener("tick", function () {});
            plugin.removeEventListener("tick", function () {});
            plugin.removeEventListener("tick");
            "#,
        );

        assert_eq!(registrations.len(), 1);
    }
}
