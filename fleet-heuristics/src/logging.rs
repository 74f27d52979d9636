//! Callback-based progress/info reporting.
//!
//! The optimization core never writes to stdout or a logging framework
//! directly: callers (the pipeline orchestrator, the LNS and QUBO refiners)
//! accept an [`InfoLogger`] and invoke it with a human-readable line. This
//! keeps the core usable both from a CLI (print the line) and from a service
//! (forward it into a progress channel) without a hard dependency either way.

use std::sync::Arc;

/// A shareable callback used to report a single line of progress/info.
pub type InfoLogger = Arc<dyn Fn(&str) + Send + Sync>;

/// Creates a no-op logger, useful as a default when the caller doesn't care.
pub fn silent_logger() -> InfoLogger {
    Arc::new(|_| {})
}
