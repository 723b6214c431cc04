//! Event bus for twr.
//!
//! Stdin commands, store notifications, and autosave ticks are normalised
//! into a single `AppEvent` enum and sent over a tokio unbounded MPSC channel.
//! The main loop receives from this channel and dispatches accordingly.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::interval;
use twr_core::{ChangeEvent, DecisionEvent, NavigateEvent};

/// All events the application can receive from any source.
#[derive(Debug)]
#[non_exhaustive]
pub enum AppEvent {
    /// One line typed by the reviewer (trailing newline stripped).
    Command(String),
    /// Forwarded from the store's `change` channel.
    Changed(ChangeEvent),
    /// Forwarded from the store's `decision` channel.
    Decided(DecisionEvent),
    /// Forwarded from the store's `navigate` channel.
    Navigated(NavigateEvent),
    /// Autosave interval elapsed.
    AutosaveTick,
    /// Stdin closed or a quit signal arrived.
    Quit,
}

/// Holds the sender and receiver ends of the unified event channel.
///
/// The sender (`tx`) is cloned and distributed to background tasks and store
/// listeners; the receiver (`rx`) is owned by the main event loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the task that turns stdin lines into `AppEvent::Command`.
///
/// Sends `AppEvent::Quit` once stdin reaches EOF or fails. Send errors are
/// ignored: a dropped receiver means the main loop has already exited.
pub fn spawn_input_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let _ = tx.send(AppEvent::Command(line));
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
        let _ = tx.send(AppEvent::Quit);
    });
}

/// Spawns the autosave ticker.
///
/// The first tick of a tokio `interval` fires immediately, so it is consumed
/// before the loop to avoid saving an untouched session at startup.
pub fn spawn_autosave_task(tx: mpsc::UnboundedSender<AppEvent>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if tx.send(AppEvent::AutosaveTick).is_err() {
                break;
            }
        }
    });
}
