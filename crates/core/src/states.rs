//! Named presentation states with enter/exit handlers
//!
//! A presentation host reports transitions as a `(before, after)` pair of
//! state names. The registry runs the exit handler of `before`, then the
//! enter handler of `after`. Unchanged states and unknown names do nothing.

use std::collections::HashMap;

/// Handler run against the caller's context
pub type Handler<C> = Box<dyn Fn(&mut C)>;

/// Enter/exit pair for one state; unset handlers are no-ops
pub struct StateHandlers<C> {
    pub enter: Option<Handler<C>>,
    pub exit: Option<Handler<C>>,
}

impl<C> Default for StateHandlers<C> {
    fn default() -> Self {
        Self {
            enter: None,
            exit: None,
        }
    }
}

impl<C> StateHandlers<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter(mut self, f: impl Fn(&mut C) + 'static) -> Self {
        self.enter = Some(Box::new(f));
        self
    }

    pub fn on_exit(mut self, f: impl Fn(&mut C) + 'static) -> Self {
        self.exit = Some(Box::new(f));
        self
    }
}

/// What a call to [`StateRegistry::transition`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Changed,
}

/// State name -> handlers
pub struct StateRegistry<C> {
    states: HashMap<String, StateHandlers<C>>,
}

impl<C> Default for StateRegistry<C> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
        }
    }
}

impl<C> StateRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handlers of a state
    pub fn register(&mut self, name: impl Into<String>, handlers: StateHandlers<C>) {
        self.states.insert(name.into(), handlers);
    }

    /// Set the enter handler of a state, keeping its exit handler
    pub fn on_enter(&mut self, name: impl Into<String>, f: impl Fn(&mut C) + 'static) {
        self.states.entry(name.into()).or_default().enter = Some(Box::new(f));
    }

    /// Set the exit handler of a state, keeping its enter handler
    pub fn on_exit(&mut self, name: impl Into<String>, f: impl Fn(&mut C) + 'static) {
        self.states.entry(name.into()).or_default().exit = Some(Box::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Registered state names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Apply a state change: exit `before`, then enter `after`
    pub fn transition(&self, before: Option<&str>, after: Option<&str>, ctx: &mut C) -> Transition {
        if before == after {
            return Transition::Unchanged;
        }

        if let Some(exit) = before
            .and_then(|name| self.states.get(name))
            .and_then(|h| h.exit.as_ref())
        {
            exit(ctx);
        }

        if let Some(enter) = after
            .and_then(|name| self.states.get(name))
            .and_then(|h| h.enter.as_ref())
        {
            enter(ctx);
        }

        Transition::Changed
    }
}
