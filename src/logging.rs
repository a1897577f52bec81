//! Diagnostic sink injected into the cache.

use crate::prelude::{debug, warn};

/// Receives diagnostic messages. Implementations must not block.
pub trait Logger: Send + Sync {
    /// Records a debug-level message.
    fn debug(&self, msg: &str);

    /// Records a warning.
    fn warn(&self, msg: &str);
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
}

/// Forwards messages to `tracing` or `log`, whichever feature is enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeLogger;

impl Logger for FacadeLogger {
    fn debug(&self, msg: &str) {
        debug!("{}", msg);
    }

    fn warn(&self, msg: &str) {
        warn!("{}", msg);
    }
}
