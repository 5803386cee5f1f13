//! Port traits: the boundary between the protocol core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FieldRegistry / Dispatcher
//! ```
//!
//! Driven adapters (flash store, event sinks) implement these traits.  The
//! core consumes them via generics, so it never touches hardware directly.

use crate::error::StorageError;
use crate::registry::ConfigKey;

// ───────────────────────────────────────────────────────────────
// Persistence port (driven adapter: registry ↔ flash)
// ───────────────────────────────────────────────────────────────

/// Key → bytes non-volatile store.
///
/// Page discovery, erase and wear-levelling belong to the implementation.
/// Writes MUST be atomic per key: a power loss leaves either the old or
/// the new record, never a torn one.
pub trait PersistencePort {
    /// Load the record stored under `key`, at its stored length.
    fn load(&self, key: ConfigKey) -> Result<Vec<u8>, StorageError>;

    /// Store `data` under `key`, replacing any previous record.
    fn store(&mut self, key: ConfigKey, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging / diagnostics)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`LinkEvent`](super::events::LinkEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::LinkEvent);
}

/// Sink that discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &super::events::LinkEvent) {}
}
