//! twr: line-oriented review shell over the twr-core decision store.
//!
//! Usage: `twr <fixes.json> [doc-id]`. The JSON file holds a
//! `{"fixes": [...], "groups": [...]}` document; `doc-id` defaults to the
//! file stem and keys the saved progress.
//!
//! # Startup sequence
//!
//! 1. Tracing subscriber on stderr, filtered by `TWR_LOG`.
//! 2. Config from XDG, panic hook, SIGTERM flag.
//! 3. Open the SQLite progress database, `init` the store, apply the
//!    configured navigation mode, then try `restore_progress`.
//! 4. Forward store signals into the event channel, spawn stdin and
//!    autosave tasks, and run the select loop until quit.
//!
//! Every exit path out of the loop falls through to a final save.

mod app;
mod commands;
mod config;
mod event;
mod render;
mod shutdown;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use twr_core::{DecisionHistoryStore, ReviewInput, SqliteStore, SystemClock};

use crate::app::AppState;
use crate::commands::CommandAction;
use crate::event::AppEvent;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TWR_LOG")
        .unwrap_or_else(|_| EnvFilter::new("twr=info,twr_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_messages(state: &mut AppState) {
    for line in state.take_messages() {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = config::load();
    shutdown::install_panic_hook();
    let term_flag = shutdown::register_sigterm()?;

    let mut args = std::env::args().skip(1);
    let Some(input_path) = args.next() else {
        eprintln!("usage: twr <fixes.json> [doc-id]");
        std::process::exit(2);
    };
    let doc_id = args.next().unwrap_or_else(|| {
        Path::new(&input_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| input_path.clone())
    });

    let raw = std::fs::read_to_string(&input_path)?;
    let input: ReviewInput = serde_json::from_str(&raw)?;

    if let Some(dir) = Path::new(&config.db_path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let backend = SqliteStore::open(&config.db_path)?;
    let mut store = DecisionHistoryStore::new(backend, SystemClock);
    store.init(doc_id.clone(), input.fixes, input.groups)?;
    store.set_navigation_mode(config.navigation_mode)?;

    let handler = event::EventHandler::new();
    let mut rx = handler.rx;
    {
        let signals = store.signals();
        let tx = handler.tx.clone();
        signals.change.subscribe(move |e| {
            let _ = tx.send(AppEvent::Changed(e.clone()));
        });
        let tx = handler.tx.clone();
        signals.decision.subscribe(move |e| {
            let _ = tx.send(AppEvent::Decided(e.clone()));
        });
        let tx = handler.tx.clone();
        signals.navigate.subscribe(move |e| {
            let _ = tx.send(AppEvent::Navigated(*e));
        });
    }

    let mut state = AppState::new(store);
    match state.store.restore_progress(&doc_id) {
        Ok(true) => state.say(format!("resumed saved progress for {doc_id}")),
        Ok(false) => commands::show_current(&mut state),
        Err(e) => {
            tracing::warn!(error = %e, "could not read saved progress");
            commands::show_current(&mut state);
        }
    }
    print_messages(&mut state);

    event::spawn_input_task(handler.tx.clone());
    if config.autosave {
        event::spawn_autosave_task(handler.tx.clone(), Duration::from_secs(config.autosave_secs.max(1)));
    }
    tracing::info!(doc_id = %doc_id, fixes = state.store.fix_count(), "review session started");

    'event_loop: loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Command(line)) => {
                        if handle_line(&line, &mut state) == CommandAction::Quit {
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Changed(change)) => state.note_change(&change),
                    Some(AppEvent::Decided(decision)) => {
                        tracing::debug!(?decision, "decision recorded");
                    }
                    Some(AppEvent::Navigated(_)) => commands::show_current(&mut state),
                    Some(AppEvent::AutosaveTick) => {
                        if state.save_if_dirty() {
                            tracing::debug!("autosaved");
                        }
                    }
                    Some(AppEvent::Quit) | None => break 'event_loop,
                }
                print_messages(&mut state);
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    if state.save() {
        tracing::info!(doc_id = %doc_id, "progress saved");
    }
    print_messages(&mut state);
    Ok(())
}

fn handle_line(line: &str, state: &mut AppState) -> CommandAction {
    tracing::trace!(command = line, "input");
    commands::handle_command(line, state)
}
