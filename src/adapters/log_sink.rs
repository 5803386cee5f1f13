//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured link events to the
//! `log` facade (serial console on target, `tracing-subscriber` in the
//! simulator).

use log::{error, info, warn};

use crate::app::events::{LinkEvent, PersistOutcome};
use crate::app::ports::EventSink;

/// Adapter that logs every [`LinkEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::MessageDropped(e) => {
                warn!("LINK | dropped message: {}", e);
            }
            LinkEvent::WorkerBusy { cmd } => {
                warn!("LINK | worker busy, dropped cmd=0x{:02X}", cmd);
            }
            LinkEvent::MessageRejected { cmd, error: e } => {
                error!("LINK | cmd=0x{:02X} rejected: {}", cmd, e);
            }
            LinkEvent::Connected => {
                info!("LINK | companion connected");
            }
            LinkEvent::FieldUpdated { key, persist } => {
                let persist = match persist {
                    PersistOutcome::NotRequested => "live",
                    PersistOutcome::Saved => "saved",
                    PersistOutcome::Failed => "live (save FAILED)",
                };
                info!("SET  | {} updated, {}", key, persist);
            }
            LinkEvent::FieldSent { key, frames } => {
                info!("GET  | {} sent in {} frames", key, frames);
            }
        }
    }
}
