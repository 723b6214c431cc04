//! Central application state for twr.
//!
//! Owns the decision store, the unsaved-changes flag, and a queue of output
//! lines. The command dispatcher mutates this state; the main loop drains
//! `messages` to stdout after every event. No terminal I/O lives here.

use twr_core::{ChangeEvent, DecisionHistoryStore};

/// All mutable shell state.
pub struct AppState {
    /// The review session.
    pub store: DecisionHistoryStore,
    /// Set by any change that should be persisted; cleared by a successful save.
    pub dirty: bool,
    /// Lines waiting to be printed by the main loop.
    pub messages: Vec<String>,
}

impl AppState {
    pub fn new(store: DecisionHistoryStore) -> Self {
        Self {
            store,
            dirty: false,
            messages: Vec::new(),
        }
    }

    pub fn say(&mut self, line: impl Into<String>) {
        self.messages.push(line.into());
    }

    /// Drains queued output lines.
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    /// Updates the unsaved flag from a store `change` notification.
    ///
    /// `Initialized` and `Restored` describe state that already matches the
    /// backend, so they leave the flag alone.
    pub fn note_change(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::Decisions { .. }
            | ChangeEvent::Undo(_)
            | ChangeEvent::Redo(_)
            | ChangeEvent::NavigationMode(_)
            | ChangeEvent::Filters => self.dirty = true,
            _ => {}
        }
    }

    /// Saves progress if anything changed since the last save.
    ///
    /// Returns `true` when a save was written. Failures are reported to the
    /// reviewer and keep the dirty flag set so the next tick retries.
    pub fn save_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.save()
    }

    /// Saves unconditionally.
    pub fn save(&mut self) -> bool {
        match self.store.save_progress() {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                self.say(format!("could not save progress: {e}"));
                false
            }
        }
    }
}
