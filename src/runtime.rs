// SPDX-License-Identifier: PMPL-1.0-or-later

//! Process-scoped state set once at startup
//!
//! The debug bit (from `CARET_DEBUG`), the tracing subscriber and the panic
//! hook that turns unexpected failures into a `PROGRAM ERROR` line.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub const DEBUG_ENV: &str = "CARET_DEBUG";

static DEBUG: AtomicBool = AtomicBool::new(false);
static INIT: Once = Once::new();

/// Read the environment, install logging and the panic hook.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init() {
    INIT.call_once(|| {
        let debug = std::env::var(DEBUG_ENV)
            .map(|value| !value.is_empty())
            .unwrap_or(false);
        DEBUG.store(debug, Ordering::Relaxed);

        let level = if debug { "debug" } else { "warn" };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(level))
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .try_init();

        if !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }

        std::panic::set_hook(Box::new(|info| {
            let detail = if let Some(text) = info.payload().downcast_ref::<&str>() {
                (*text).to_string()
            } else if let Some(text) = info.payload().downcast_ref::<String>() {
                text.clone()
            } else {
                "unexpected failure".to_string()
            };
            match info.location() {
                Some(loc) => eprintln!(
                    "PROGRAM ERROR: {} ({}:{})",
                    detail,
                    loc.file(),
                    loc.line()
                ),
                None => eprintln!("PROGRAM ERROR: {}", detail),
            }
        }));
    });
}

pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}
