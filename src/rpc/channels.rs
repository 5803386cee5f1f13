//! Worker handoff channel.
//!
//! Uses an `embassy-sync` bounded channel to carry completed messages from
//! the receive context to the dispatch worker.  The receive side only ever
//! calls `try_send`, so it never blocks; the worker awaits `receive`.
//!
//! ```text
//! ┌────────────────┐   Message    ┌──────────────────┐
//! │ ReceivePath    │─────────────▶│ Dispatch worker  │
//! │ (transport cb) │   depth 1    │ (async, thread)  │
//! └────────────────┘              └──────────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use super::chunked::Message;
use crate::config::MESSAGE_QUEUE_DEPTH;

/// Completed-message handoff between the receive context and the worker.
pub type MessageChannel = Channel<CriticalSectionRawMutex, Message, MESSAGE_QUEUE_DEPTH>;

/// Process-wide handoff for firmware with exactly one configuration link.
///
/// Tests and hosts running several links construct their own
/// [`MessageChannel`] and leak or share it instead.
pub static MESSAGE_CHANNEL: MessageChannel = Channel::new();
