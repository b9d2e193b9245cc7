//! Handler Registry and Synchronous Emit

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors raised while registering handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The registry could not grow to hold another handler
    #[error("failed to allocate space for handler '{0}'")]
    AllocationFailed(String),
}

/// The argument passed from [`Dispatcher::emit`] to each handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Payload<'a> {
    /// No argument
    #[default]
    Empty,
    /// The raw input line, for handlers that parse their own argument
    Line(&'a str),
}

impl<'a> Payload<'a> {
    /// Returns the carried line, if any.
    pub fn line(&self) -> Option<&'a str> {
        match self {
            Payload::Empty => None,
            Payload::Line(line) => Some(line),
        }
    }
}

/// A registered callback. It receives the shared context and the payload.
pub type Handler<C> = Box<dyn Fn(&mut C, Payload<'_>)>;

/// Maps command names to ordered handler lists.
///
/// Names are case-sensitive. Several handlers may share a name; they run in
/// the order they were registered, each exactly once per emit.
///
/// # Example
///
/// ```
/// use sprepl::dispatch::{Dispatcher, Payload};
///
/// let mut dispatcher: Dispatcher<Vec<String>> = Dispatcher::new();
/// dispatcher
///     .register("greet", |log: &mut Vec<String>, payload: Payload<'_>| {
///         log.push(format!("hello {}", payload.line().unwrap_or("world")));
///     })
///     .unwrap();
///
/// let mut log = Vec::new();
/// dispatcher.emit("greet", &mut log, Payload::Line("there"));
/// dispatcher.emit("unknown", &mut log, Payload::Empty);
/// assert_eq!(log, ["hello there"]);
/// ```
pub struct Dispatcher<C> {
    handlers: HashMap<String, Vec<Handler<C>>>,
}

impl<C> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, list) in &self.handlers {
            map.entry(name, &list.len());
        }
        map.finish()
    }
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Appends `handler` to the list for `name`, creating the list if absent.
    pub fn register<F>(&mut self, name: &str, handler: F) -> Result<(), DispatchError>
    where
        F: Fn(&mut C, Payload<'_>) + 'static,
    {
        if !self.handlers.contains_key(name) {
            self.handlers
                .try_reserve(1)
                .map_err(|_| DispatchError::AllocationFailed(name.to_string()))?;
        }

        let list = self.handlers.entry(name.to_string()).or_default();
        list.try_reserve(1)
            .map_err(|_| DispatchError::AllocationFailed(name.to_string()))?;
        list.push(Box::new(handler));

        debug!(command = name, handlers = list.len(), "Registered handler");
        Ok(())
    }

    /// Runs every handler registered for `name`, in registration order.
    ///
    /// Emitting a name with no handlers does nothing.
    pub fn emit(&self, name: &str, ctx: &mut C, payload: Payload<'_>) {
        let Some(list) = self.handlers.get(name) else {
            trace!(command = name, "No handlers registered");
            return;
        };

        trace!(command = name, handlers = list.len(), "Emitting");
        for handler in list {
            handler(&mut *ctx, payload);
        }
    }

    /// Removes every handler registered for `name`, returning how many there were.
    pub fn remove(&mut self, name: &str) -> usize {
        self.handlers.remove(name).map(|list| list.len()).unwrap_or(0)
    }

    /// Returns the number of handlers registered for `name`.
    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.get(name).map(Vec::len).unwrap_or(0)
    }

    /// Returns true if at least one handler is registered for `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.handler_count(name) > 0
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Calls = Vec<String>;

    fn recorder(tag: &'static str) -> impl Fn(&mut Calls, Payload<'_>) {
        move |calls: &mut Calls, payload: Payload<'_>| {
            calls.push(format!("{}:{}", tag, payload.line().unwrap_or("-")));
        }
    }

    #[test]
    fn test_emit_runs_handlers_in_order() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("get", recorder("first")).unwrap();
        dispatcher.register("get", recorder("second")).unwrap();
        dispatcher.register("get", recorder("third")).unwrap();

        let mut calls = Calls::new();
        dispatcher.emit("get", &mut calls, Payload::Line("get a"));
        assert_eq!(calls, ["first:get a", "second:get a", "third:get a"]);
    }

    #[test]
    fn test_emit_each_keyword_once() {
        let mut dispatcher = Dispatcher::new();
        for name in ["help", "get", "exit", "list", "count"] {
            dispatcher.register(name, recorder(name)).unwrap();
        }

        for name in ["help", "get", "exit", "list", "count"] {
            let mut calls = Calls::new();
            dispatcher.emit(name, &mut calls, Payload::Empty);
            assert_eq!(calls, [format!("{}:-", name)]);
        }
    }

    #[test]
    fn test_emit_unregistered_is_noop() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("help", recorder("help")).unwrap();

        let mut calls = Calls::new();
        dispatcher.emit("frobnicate", &mut calls, Payload::Empty);
        dispatcher.emit("HELP", &mut calls, Payload::Empty);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_handler_mutates_context() {
        let mut dispatcher: Dispatcher<bool> = Dispatcher::new();
        dispatcher
            .register("exit", |quit: &mut bool, _: Payload<'_>| *quit = true)
            .unwrap();

        let mut quit = false;
        dispatcher.emit("exit", &mut quit, Payload::Empty);
        assert!(quit);
    }

    #[test]
    fn test_reentrant_emit() {
        let inner: Rc<RefCell<Dispatcher<Calls>>> = Rc::new(RefCell::new(Dispatcher::new()));
        inner
            .borrow_mut()
            .register("leaf", recorder("leaf"))
            .unwrap();

        let handle = Rc::clone(&inner);
        inner
            .borrow_mut()
            .register("root", move |calls: &mut Calls, payload: Payload<'_>| {
                calls.push("root".to_string());
                handle.borrow().emit("leaf", calls, payload);
            })
            .unwrap();

        let mut calls = Calls::new();
        inner.borrow().emit("root", &mut calls, Payload::Empty);
        assert_eq!(calls, ["root", "leaf:-"]);
    }

    #[test]
    fn test_registry_queries() {
        let mut dispatcher: Dispatcher<Calls> = Dispatcher::new();
        dispatcher.register("list", recorder("a")).unwrap();
        dispatcher.register("count", recorder("b")).unwrap();
        dispatcher.register("count", recorder("c")).unwrap();

        assert_eq!(dispatcher.names(), ["count", "list"]);
        assert_eq!(dispatcher.handler_count("count"), 2);
        assert!(dispatcher.is_registered("list"));
        assert!(!dispatcher.is_registered("get"));

        assert_eq!(dispatcher.remove("count"), 2);
        assert_eq!(dispatcher.remove("count"), 0);
        assert!(!dispatcher.is_registered("count"));
    }
}
