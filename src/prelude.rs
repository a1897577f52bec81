// Internal logging facade.
// Provides `debug!` and `warn!` macros backed by
// either `tracing`, `log`, or no-op depending on enabled features.

pub(crate) use crate::observability::{log_debug as debug, log_warn as warn};
