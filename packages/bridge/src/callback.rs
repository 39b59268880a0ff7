//! Guest functions retained by the host.
//!
//! A guest function handed to the host (an HTTP completion callback, for
//! instance) must stay reachable until the host calls it. The registry
//! pins each one in the Lua registry and gives the host a plain integer
//! handle in return.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use mlua::{Function, Lua, RegistryKey};

use crate::convert::args_to_guest;
use crate::error::Result;
use crate::value::Value;

/// Opaque host-owned reference to a retained guest function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackHandle(u64);

impl CallbackHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback#{}", self.0)
    }
}

/// Retained guest functions for one interpreter.
///
/// All methods take `&self`: a guest callback may re-enter the host and
/// retain further callbacks while an invocation is in progress, so no
/// borrow is held across a guest call.
#[derive(Default)]
pub struct CallbackRegistry {
    next: Cell<u64>,
    entries: RefCell<BTreeMap<u64, RegistryKey>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `function` and return a handle for it.
    pub fn retain(&self, lua: &Lua, function: Function) -> Result<CallbackHandle> {
        let key = lua.create_registry_value(function)?;
        let id = self.next.get() + 1;
        self.next.set(id);
        self.entries.borrow_mut().insert(id, key);
        Ok(CallbackHandle(id))
    }

    /// The function behind `handle`, if it is still retained.
    pub fn function(&self, lua: &Lua, handle: CallbackHandle) -> Option<Function> {
        let entries = self.entries.borrow();
        let key = entries.get(&handle.0)?;
        match lua.registry_value::<Function>(key) {
            Ok(function) => Some(function),
            Err(error) => {
                tracing::debug!(%handle, %error, "retained callback unreadable");
                None
            }
        }
    }

    pub fn contains(&self, handle: CallbackHandle) -> bool {
        self.entries.borrow().contains_key(&handle.0)
    }

    /// Call the function behind `handle` with `args`.
    ///
    /// The call is protected. Returns `true` when the function ran to
    /// completion; a guest error is logged with `context` and yields
    /// `false`, as does an unknown or released handle.
    pub fn invoke(&self, lua: &Lua, handle: CallbackHandle, args: &[Value], context: &str) -> bool {
        let Some(function) = self.function(lua, handle) else {
            tracing::debug!(%handle, context, "invoke on released callback ignored");
            return false;
        };

        let guest_args = match args_to_guest(lua, args, self) {
            Ok(a) => a,
            Err(error) => {
                tracing::warn!(%handle, context, %error, "callback arguments not convertible");
                return false;
            }
        };

        match function.call::<()>(guest_args) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    %handle,
                    context,
                    args = %summarize(args),
                    %error,
                    "guest callback failed"
                );
                false
            }
        }
    }

    /// Drop the pin on `handle`. Returns whether it was retained.
    pub fn release(&self, lua: &Lua, handle: CallbackHandle) -> bool {
        let removed = self.entries.borrow_mut().remove(&handle.0);
        match removed {
            Some(key) => {
                if let Err(error) = lua.remove_registry_value(key) {
                    tracing::debug!(%handle, %error, "registry slot already gone");
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Release every retained function.
    pub fn clear(&self, lua: &Lua) {
        let drained = std::mem::take(&mut *self.entries.borrow_mut());
        for (_, key) in drained {
            // A key from a different or closed state is harmless to drop.
            let _ = lua.remove_registry_value(key);
        }
    }
}

fn summarize(args: &[Value]) -> String {
    args.iter()
        .map(Value::summary)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(lua: &Lua) -> Function {
        lua.load(
            r#"
            seen = {}
            return function(x) seen[#seen + 1] = x end
            "#,
        )
        .eval()
        .unwrap()
    }

    fn seen(lua: &Lua) -> String {
        lua.load("return table.concat(seen, ',')").eval().unwrap()
    }

    #[test]
    fn invoke_n_times_in_order() {
        let lua = Lua::new();
        let registry = CallbackRegistry::new();
        let handle = registry.retain(&lua, recorder(&lua)).unwrap();

        for i in 1..=3 {
            assert!(registry.invoke(&lua, handle, &[Value::from(i as f64)], "test"));
        }
        assert_eq!(seen(&lua), "1,2,3");
    }

    #[test]
    fn retain_without_invoke_has_no_effect() {
        let lua = Lua::new();
        let registry = CallbackRegistry::new();
        registry.retain(&lua, recorder(&lua)).unwrap();
        assert_eq!(seen(&lua), "");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn guest_error_is_contained() {
        let lua = Lua::new();
        let registry = CallbackRegistry::new();
        let failing: Function = lua.load("return function() error('nope') end").eval().unwrap();
        let handle = registry.retain(&lua, failing).unwrap();

        assert!(!registry.invoke(&lua, handle, &[], "test"));
        // Still retained; a failure is not a release.
        assert!(registry.contains(handle));
    }

    #[test]
    fn released_handle_is_noop() {
        let lua = Lua::new();
        let registry = CallbackRegistry::new();
        let handle = registry.retain(&lua, recorder(&lua)).unwrap();

        assert!(registry.release(&lua, handle));
        assert!(!registry.release(&lua, handle));
        assert!(!registry.invoke(&lua, handle, &[Value::from(1.0)], "test"));
        assert_eq!(seen(&lua), "");
    }

    #[test]
    fn retained_function_survives_collection() {
        let lua = Lua::new();
        let registry = CallbackRegistry::new();
        let handle = {
            let f: Function = lua.load("return function() marker = 'ran' end").eval().unwrap();
            registry.retain(&lua, f).unwrap()
        };
        lua.gc_collect().unwrap();
        lua.gc_collect().unwrap();

        assert!(registry.invoke(&lua, handle, &[], "test"));
        let marker: String = lua.globals().get("marker").unwrap();
        assert_eq!(marker, "ran");
    }

    #[test]
    fn callback_may_retain_while_running() {
        let lua = Lua::new();
        let registry = std::rc::Rc::new(CallbackRegistry::new());

        let inner = registry.clone();
        let hook = lua
            .create_function(move |lua, f: Function| Ok(inner.retain(lua, f)?.id()))
            .unwrap();
        lua.globals().set("hook", hook).unwrap();

        let outer: Function = lua
            .load("return function() hook(function() end) end")
            .eval()
            .unwrap();
        let handle = registry.retain(&lua, outer).unwrap();

        assert!(registry.invoke(&lua, handle, &[], "test"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn clear_releases_everything() {
        let lua = Lua::new();
        let registry = CallbackRegistry::new();
        let a = registry.retain(&lua, recorder(&lua)).unwrap();
        registry.retain(&lua, recorder(&lua)).unwrap();
        registry.clear(&lua);
        assert!(registry.is_empty());
        assert!(!registry.invoke(&lua, a, &[], "test"));
    }
}
