//! Console logging setup.
//!
//! One process-wide `tracing` subscriber; every worker logs through it and
//! line output is serialized by the subscriber itself.

use tracing_subscriber::fmt::format::FmtSpan;

pub struct EventLogger;

impl EventLogger {
    /// Installs the fmt subscriber. Repeated calls are ignored.
    pub fn init() {
        let _ = tracing_subscriber::fmt()
            .with_span_events(FmtSpan::NONE)
            .with_thread_names(true)
            .with_target(false)
            .try_init();
    }
}
