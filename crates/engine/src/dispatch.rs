use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, warn};

pub type Handler<C> = Box<dyn FnMut(&mut C)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Missing,
    Panicked,
}

/// Name-keyed handler table. Dispatch never fails outward: a missing name or
/// a panicking handler is logged and reported through [`DispatchOutcome`].
pub struct EventDispatcher<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for EventDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EventDispatcher")
            .field("handlers", &names)
            .finish()
    }
}

impl<C> EventDispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when an earlier handler for `name` was replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&mut C) + 'static,
    ) -> bool {
        let name = name.into();
        let replaced = self.handlers.insert(name.clone(), Box::new(handler)).is_some();
        if replaced {
            debug!(event = name.as_str(), "handler_overridden");
        }
        replaced
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(&mut self, name: &str, ctx: &mut C) -> DispatchOutcome {
        let Some(handler) = self.handlers.get_mut(name) else {
            warn!(event = name, "handler_missing");
            return DispatchOutcome::Missing;
        };

        if contain(name, || handler(ctx)) {
            debug!(event = name, "event_dispatched");
            DispatchOutcome::Handled
        } else {
            DispatchOutcome::Panicked
        }
    }
}

/// Runs scene code, logging a panic under `name` instead of unwinding into
/// the caller. Returns `false` when `run` panicked.
pub fn contain(name: &str, run: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(()) => true,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(event = name, message = message.as_str(), "handler_panicked");
            false
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
