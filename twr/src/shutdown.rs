//! Process shutdown hooks for twr.
//!
//! Both hooks exist so an interrupted review still gets a final save attempt:
//! SIGTERM flips a flag the main loop polls, and a panic is logged through
//! `tracing` before the default printer runs.

use std::panic;
use std::sync::{atomic::AtomicBool, Arc};

use signal_hook::consts::SIGTERM;
use signal_hook::flag::register;

/// Chains a panic hook that records the panic in the log.
///
/// The previously installed hook still runs afterwards, so the default
/// message reaches stderr as usual.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(%location, "twr panicked");
        original_hook(panic_info);
    }));
}

/// Registers a SIGTERM handler that sets the returned flag.
///
/// The flag goes from `false` to `true` once the signal arrives; the main
/// loop polls it on every heartbeat.
///
/// # Errors
///
/// Returns `Err` if the OS refuses to register the handler.
pub fn register_sigterm() -> std::io::Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    register(SIGTERM, Arc::clone(&term))?;
    Ok(term)
}
