//! Outbound link events.
//!
//! The [`Dispatcher`](crate::rpc::engine::Dispatcher) and the receive path
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! The log sink renders them on the console; tests record and assert on
//! them.

use crate::error::{DispatchError, ProtocolError};
use crate::registry::ConfigKey;

/// What happened to the persistence request of a SET_CONFIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Save flag clear, or the field is volatile.
    NotRequested,
    Saved,
    /// Flash write failed; the live value was still updated.
    Failed,
}

/// Structured events emitted by the configuration link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Framing failed; the partial message was discarded.
    MessageDropped(ProtocolError),

    /// A complete message arrived while the worker was still busy.
    WorkerBusy { cmd: u8 },

    /// A complete message was rejected without side effects.
    MessageRejected { cmd: u8, error: DispatchError },

    /// CONNECT acknowledged.
    Connected,

    /// SET_CONFIG changed a live value.
    FieldUpdated { key: ConfigKey, persist: PersistOutcome },

    /// GET_CONFIG reply fully streamed.
    FieldSent { key: ConfigKey, frames: usize },
}
