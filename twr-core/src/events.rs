//! Typed observer channels for store notifications.
//!
//! The store exposes three channels (`change`, `decision`, `navigate`), each a
//! [`Signal`] over its own event type. Listeners run synchronously, in
//! registration order, inside the mutating call. A listener that panics is
//! caught and logged; the mutation still completes and the remaining
//! listeners still run.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::history::HistoryAction;
use crate::types::{Decision, NavigationMode, Verdict};

/// General "something changed, re-render" notification.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ChangeEvent {
    /// A new session was loaded by `init`.
    Initialized { fix_count: usize },
    /// One or more decisions were written by a forward operation.
    Decisions { indices: Vec<usize> },
    /// An action was reverted.
    Undo(HistoryAction),
    /// An action was reapplied.
    Redo(HistoryAction),
    /// The navigation ordering was recomputed.
    NavigationMode(NavigationMode),
    /// Search query or filters changed.
    Filters,
    /// Saved progress was loaded into the session.
    Restored,
    /// The session was torn down.
    Reset,
}

/// Per-fix decision notification.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DecisionEvent {
    /// A single fix was decided, cleared, or had its note edited.
    /// `decision` is `None` after a clear.
    Single {
        index: usize,
        decision: Option<Decision>,
    },
    /// A batch of fixes received the same verdict.
    Bulk {
        indices: Vec<usize>,
        verdict: Verdict,
    },
}

/// Cursor movement notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateEvent {
    /// Fix index now under the cursor.
    pub index: usize,
    /// 1-based position of `index` within the current navigation order.
    pub position: usize,
}

/// Handle returned by [`Signal::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// An ordered list of listeners for one event type.
pub struct Signal<T> {
    name: &'static str,
    next_id: u64,
    listeners: Vec<(ListenerId, Listener<T>)>,
}

impl<T> Signal<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    /// Appends a listener; it runs after every listener registered before it.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&T) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if `id` was not subscribed here.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers `event` to every listener, isolating panics per listener.
    ///
    /// Returns the number of listeners that panicked.
    pub fn emit(&mut self, event: &T) -> usize {
        let mut failures = 0;
        for (id, listener) in &mut self.listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(event)));
            if outcome.is_err() {
                failures += 1;
                tracing::error!(signal = self.name, listener = id.0, "listener panicked");
            }
        }
        failures
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
