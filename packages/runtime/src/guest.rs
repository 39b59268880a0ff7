//! The guest runtime driver: one Lua state running one widget script.

use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use mlua::{Lua, MultiValue};

use luawidget_bridge::{args_to_guest, to_host_data, Value};
use luawidget_net::{Completion, RequestId};

use crate::capability;
use crate::error::{guest_message, Result, RuntimeError};
use crate::host::{Continuation, GuestState, HostServices, Surface};

/// Names of the lifecycle entry points a widget may define.
pub mod entry {
    pub const ON_LOAD: &str = "on_load";
    pub const ON_RESUME: &str = "on_resume";
    pub const ON_CLICK: &str = "on_click";
    pub const ON_LONG_CLICK: &str = "on_long_click";
    pub const ON_CONTEXT_MENU_CLICK: &str = "on_context_menu_click";
    pub const ON_NETWORK_RESULT: &str = "on_network_result";
    pub const ON_NETWORK_ERROR: &str = "on_network_error";
}

/// Configuration for a guest runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// The shortest wait of [`GuestRuntime::settle_default`]. The wait is
    /// stretched while requests are in flight that may still complete
    /// later, up to the network's own bound for them.
    pub settle_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            settle_timeout: Duration::from_secs(5),
        }
    }
}

/// Result of invoking an entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// The entry point ran and returned these values.
    Returned(Vec<Value>),
    /// The script does not define the entry point.
    Missing,
}

/// What a [`GuestRuntime::settle`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettleReport {
    /// Completions delivered to the guest.
    pub dispatched: usize,
    /// Requests still pending when the wait ended.
    pub remaining: usize,
    pub timed_out: bool,
}

/// A loaded widget script.
///
/// Every runtime owns a fresh Lua state, so two loads of the same source
/// never share globals. Dropping the runtime releases every retained
/// callback and abandons its outstanding requests.
pub struct GuestRuntime {
    lua: Lua,
    state: Rc<GuestState>,
    config: RuntimeConfig,
}

impl GuestRuntime {
    /// Compile `source`, install the capabilities and run its top-level
    /// statements.
    pub fn load(
        source: &str,
        chunk_name: &str,
        services: HostServices,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let lua = Lua::new();
        let state = Rc::new(GuestState::new(chunk_name, services));
        capability::install(&lua, &state)?;

        let function = lua
            .load(source)
            .set_name(format!("={chunk_name}"))
            .into_function()
            .map_err(|error| match error {
                mlua::Error::SyntaxError { message, .. } => RuntimeError::Syntax {
                    chunk: chunk_name.to_string(),
                    message,
                },
                other => RuntimeError::Lua(other),
            })?;

        // Built before the chunk runs so requests issued at top level are
        // abandoned if loading fails.
        let runtime = Self { lua, state, config };
        if let Err(error) = function.call::<()>(()) {
            let message = guest_message(&error);
            tracing::warn!(chunk = chunk_name, %message, "script failed while loading");
            return Err(RuntimeError::Init {
                chunk: chunk_name.to_string(),
                message,
            });
        }
        tracing::debug!(chunk = chunk_name, "script loaded");
        Ok(runtime)
    }

    /// [`load`](Self::load) the script at `path`, named after the path.
    pub fn load_file(path: &Path, services: HostServices, config: RuntimeConfig) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|error| RuntimeError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::load(&source, &path.display().to_string(), services, config)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn chunk_name(&self) -> &str {
        &self.state.chunk
    }

    pub fn services(&self) -> &HostServices {
        &self.state.services
    }

    /// Whether the script defines a global `entry` function.
    pub fn has_entry(&self, entry: &str) -> bool {
        matches!(
            self.lua.globals().raw_get::<mlua::Value>(entry),
            Ok(mlua::Value::Function(_))
        )
    }

    /// Invoke the global function `entry` with `args`.
    ///
    /// An undefined entry point is not an error. A guest error is logged
    /// and returned; the runtime stays usable either way.
    pub fn call(&self, entry: &str, args: &[Value]) -> Result<Invocation> {
        let function = match self.lua.globals().raw_get::<mlua::Value>(entry)? {
            mlua::Value::Nil => return Ok(Invocation::Missing),
            mlua::Value::Function(function) => function,
            other => {
                return Err(RuntimeError::NotCallable {
                    entry: entry.to_string(),
                    kind: other.type_name(),
                })
            }
        };

        let args = args_to_guest(&self.lua, args, &self.state.callbacks)?;
        tracing::debug!(chunk = %self.state.chunk, entry, "invoking entry point");
        match function.call::<MultiValue>(args) {
            Ok(returned) => {
                let values = returned
                    .iter()
                    .map(to_host_data)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Invocation::Returned(values))
            }
            Err(error) => {
                let message = guest_message(&error);
                tracing::warn!(chunk = %self.state.chunk, entry, %message, "entry point failed");
                Err(RuntimeError::Guest {
                    entry: entry.to_string(),
                    message,
                })
            }
        }
    }

    /// Deliver network completions to the guest until none of this
    /// runtime's requests are pending or `timeout` passes.
    ///
    /// Requests issued by the callbacks being dispatched are waited for
    /// too, within the same deadline.
    pub fn settle(&self, timeout: Duration) -> SettleReport {
        self.settle_until(Instant::now() + timeout, false)
    }

    /// Settle for at least the configured timeout, and for as long as
    /// the network allows any request still in flight to take.
    pub fn settle_default(&self) -> SettleReport {
        self.settle_until(Instant::now() + self.config.settle_timeout, true)
    }

    fn settle_until(&self, mut deadline: Instant, follow_network: bool) -> SettleReport {
        let mut report = SettleReport::default();

        while !self.state.pending.borrow().is_empty() {
            if follow_network {
                if let Some(due) = self.state.services.network.borrow().due_by() {
                    deadline = deadline.max(due);
                }
            }
            let completion = {
                let pending = &self.state.pending;
                let wanted = |id: RequestId| pending.borrow().contains_key(&id);
                self.state
                    .services
                    .network
                    .borrow_mut()
                    .next_completion(&wanted, deadline)
            };
            let Some(completion) = completion else {
                report.timed_out = true;
                break;
            };

            let continuation = self.state.pending.borrow_mut().remove(&completion.id);
            if let Some(continuation) = continuation {
                self.dispatch(continuation, completion);
                report.dispatched += 1;
            }
        }

        report.remaining = self.state.pending.borrow().len();
        if report.timed_out {
            tracing::warn!(
                chunk = %self.state.chunk,
                remaining = report.remaining,
                "requests still pending after settle timeout"
            );
        }
        report
    }

    fn dispatch(&self, continuation: Continuation, completion: Completion) {
        let outcome = &completion.outcome;
        let args = [
            outcome.body().map(Value::from).unwrap_or_default(),
            Value::from(i64::from(outcome.status())),
        ];

        match continuation {
            Continuation::Callback(handle) => {
                let context = format!("http {} {}", completion.method, completion.url);
                self.state
                    .callbacks
                    .invoke(&self.lua, handle, &args, &context);
                self.state.callbacks.release(&self.lua, handle);
            }
            Continuation::Entry { id } => {
                let suffix = id.map(|id| format!("_{id}")).unwrap_or_default();
                let mut candidates = Vec::with_capacity(2);
                if outcome.is_transport_failure() {
                    candidates.push(format!("{}{suffix}", entry::ON_NETWORK_ERROR));
                }
                candidates.push(format!("{}{suffix}", entry::ON_NETWORK_RESULT));

                for name in &candidates {
                    match self.call(name, &args) {
                        Ok(Invocation::Missing) => continue,
                        Ok(Invocation::Returned(_)) | Err(_) => return,
                    }
                }
                tracing::debug!(
                    chunk = %self.state.chunk,
                    id = completion.id,
                    tried = ?candidates,
                    "no entry point for network result"
                );
            }
        }
    }

    /// A snapshot of the rendered surface.
    pub fn surface(&self) -> Surface {
        self.state.surface.borrow().clone()
    }

    pub fn output(&self) -> String {
        self.state.surface.borrow().output.clone()
    }

    /// Take the labels of a context menu shown since the last call.
    pub fn take_menu(&self) -> Option<Vec<String>> {
        self.state.surface.borrow_mut().menu.take()
    }

    /// Requests issued by this runtime and not yet delivered.
    pub fn pending_requests(&self) -> usize {
        self.state.pending.borrow().len()
    }

    pub fn retained_callbacks(&self) -> usize {
        self.state.callbacks.len()
    }

    /// Copy the guest global `name` into the host.
    pub fn global(&self, name: &str) -> Result<Value> {
        let value: mlua::Value = self.lua.globals().raw_get(name)?;
        Ok(to_host_data(&value)?)
    }
}

impl Drop for GuestRuntime {
    fn drop(&mut self) {
        let ids: Vec<RequestId> = match self.state.pending.try_borrow_mut() {
            Ok(mut pending) => std::mem::take(&mut *pending).into_keys().collect(),
            Err(_) => Vec::new(),
        };
        if !ids.is_empty() {
            tracing::debug!(chunk = %self.state.chunk, count = ids.len(), "abandoning requests");
            if let Ok(mut network) = self.state.services.network.try_borrow_mut() {
                network.abandon(ids);
            }
        }
        self.state.callbacks.clear(&self.lua);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(source: &str) -> Result<GuestRuntime> {
        GuestRuntime::load(source, "test.lua", HostServices::in_memory(), RuntimeConfig::default())
    }

    #[test]
    fn syntax_errors_are_load_errors() {
        let error = load("function on_resume(").err().unwrap();
        assert!(matches!(error, RuntimeError::Syntax { .. }), "{error:?}");
        assert!(error.is_load_error());
    }

    #[test]
    fn top_level_errors_are_init_errors() {
        let error = load(r#"error("no config")"#).err().unwrap();
        match error {
            RuntimeError::Init { chunk, message } => {
                assert_eq!(chunk, "test.lua");
                assert!(message.contains("no config"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_and_non_callable_entries() {
        let runtime = load("on_click = 5").unwrap();
        assert_eq!(runtime.call(entry::ON_RESUME, &[]).unwrap(), Invocation::Missing);
        match runtime.call(entry::ON_CLICK, &[]) {
            Err(RuntimeError::NotCallable { entry, kind }) => {
                assert_eq!(entry, "on_click");
                assert_eq!(kind, "integer");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!runtime.has_entry(entry::ON_CLICK));
    }

    #[test]
    fn guest_errors_leave_runtime_usable() {
        let runtime = load(
            r#"
            count = 0
            function on_click() error("boom") end
            function on_resume() count = count + 1 return count, "ok" end
            "#,
        )
        .unwrap();

        match runtime.call(entry::ON_CLICK, &[]) {
            Err(RuntimeError::Guest { entry, message }) => {
                assert_eq!(entry, "on_click");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            runtime.call(entry::ON_RESUME, &[]).unwrap(),
            Invocation::Returned(vec![Value::Number(1.0), Value::from("ok")])
        );
    }

    #[test]
    fn arguments_arrive_as_integers() {
        let runtime = load(
            r#"
            function on_context_menu_click(i) picked = math.type(i) .. ":" .. i end
            "#,
        )
        .unwrap();
        runtime
            .call(entry::ON_CONTEXT_MENU_CLICK, &[Value::from(2_i64)])
            .unwrap();
        assert_eq!(runtime.global("picked").unwrap(), Value::from("integer:2"));
    }

    #[test]
    fn loads_are_isolated() {
        let source = "counter = 0 function on_resume() counter = counter + 1 end";
        let a = load(source).unwrap();
        let b = load(source).unwrap();
        a.call(entry::ON_RESUME, &[]).unwrap();
        b.call(entry::ON_RESUME, &[]).unwrap();
        assert_eq!(a.global("counter").unwrap(), Value::Number(1.0));
        assert_eq!(b.global("counter").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn settle_without_requests_returns_at_once() {
        let runtime = load("").unwrap();
        let report = runtime.settle(Duration::from_secs(10));
        assert_eq!(report, SettleReport::default());
    }

    #[test]
    fn menu_is_taken_once() {
        let runtime = load(r#"ui:show_context_menu({"a", "b"})"#).unwrap();
        assert_eq!(runtime.take_menu(), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(runtime.take_menu(), None);
    }

    #[test]
    fn load_file_reports_missing_file() {
        let error = GuestRuntime::load_file(
            Path::new("/nonexistent/widget.lua"),
            HostServices::in_memory(),
            RuntimeConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(error, RuntimeError::Io { .. }));
    }
}
