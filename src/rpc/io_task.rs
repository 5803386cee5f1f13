//! Receive path and dispatch worker.
//!
//! Two execution contexts, fully serialized through one channel:
//!
//! 1. **Receive** runs in the transport's read callback.  It feeds each
//!    frame to the [`Reassembler`] and hands completed messages over with
//!    `try_send`; it never blocks and never touches the registry.
//! 2. **Worker** is a long-lived thread driving an async loop with
//!    `futures_lite::future::block_on`.  It wakes on
//!    `channel.receive().await` and runs each message through the
//!    [`Dispatcher`], reply included, before taking the next one.
//!
//! The channel holds one message.  While the worker streams a reply, one
//! further message may complete reassembly and wait in that slot; it is
//! not dispatched until the current reply has finished.  Anything
//! completing while the slot is occupied is dropped as `WorkerBusy`.
//!
//! ```text
//!  transport rx ──▶ ReceivePath::on_frame ──try_send──▶ MessageChannel
//!                                                          │
//!  transport tx ◀── ReplyTransmitter ◀── Dispatcher ◀──receive──┘
//! ```

use log::{info, warn};

use super::channels::MessageChannel;
use super::chunked::{Ingest, Reassembler};
use super::engine::Dispatcher;
use super::transport::FrameTransport;
use crate::app::events::LinkEvent;
use crate::app::ports::{EventSink, PersistencePort};
use crate::config::LinkConfig;

/// Worker stack; persistence and the log backend run on it.
const WORKER_STACK_SIZE: usize = 64 * 1024;

// ── Receive context ──────────────────────────────────────────

/// Per-link receive state: sole owner of the reassembly buffer.
pub struct ReceivePath<'c, E: EventSink> {
    reassembler: Reassembler,
    channel: &'c MessageChannel,
    sink: E,
}

impl<'c, E: EventSink> ReceivePath<'c, E> {
    pub fn new(channel: &'c MessageChannel, config: &LinkConfig, sink: E) -> Self {
        Self {
            reassembler: Reassembler::new(config.max_message_size as usize),
            channel,
            sink,
        }
    }

    /// Handle one inbound frame.  Returns `true` when it completed a
    /// message that was handed to the worker.
    pub fn on_frame(&mut self, frame: &[u8]) -> bool {
        match self.reassembler.ingest(frame) {
            Ingest::Incomplete => false,
            Ingest::Complete(msg) => {
                let cmd = msg.cmd();
                if self.channel.try_send(msg).is_err() {
                    warn!("IO: worker busy, dropping cmd=0x{:02X}", cmd);
                    self.sink.emit(&LinkEvent::WorkerBusy { cmd });
                    return false;
                }
                true
            }
            Ingest::Error(e) => {
                warn!("IO: frame rejected: {}", e);
                self.sink.emit(&LinkEvent::MessageDropped(e));
                false
            }
        }
    }

    /// Whether a message is partially received.
    pub fn in_progress(&self) -> bool {
        self.reassembler.is_active()
    }

    /// Drop any partial message, e.g. on USB reset.
    pub fn reset(&mut self) {
        self.reassembler.reset();
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }
}

// ── Worker ───────────────────────────────────────────────────

/// Take one message from `channel` and dispatch it.
pub async fn serve_one<P, T, E, const N: usize>(
    channel: &MessageChannel,
    dispatcher: &mut Dispatcher<P, T, E, N>,
) where
    P: PersistencePort,
    T: FrameTransport,
    E: EventSink,
{
    let msg = channel.receive().await;
    // Outcome is already reported to the dispatcher's sink.
    let _ = dispatcher.dispatch(&msg).await;
}

/// Dispatch messages forever.
pub async fn run_worker<P, T, E, const N: usize>(
    channel: &MessageChannel,
    mut dispatcher: Dispatcher<P, T, E, N>,
) where
    P: PersistencePort,
    T: FrameTransport,
    E: EventSink,
{
    loop {
        serve_one(channel, &mut dispatcher).await;
    }
}

/// Spawn the dispatch worker on its own thread.
pub fn spawn<P, T, E, const N: usize>(
    channel: &'static MessageChannel,
    dispatcher: Dispatcher<P, T, E, N>,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    P: PersistencePort + Send + 'static,
    T: FrameTransport + Send + 'static,
    E: EventSink + Send + 'static,
{
    std::thread::Builder::new()
        .name("cfg-worker".into())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || {
            info!("IO: dispatch worker started");
            futures_lite::future::block_on(run_worker(channel, dispatcher));
        })
}

// ── Tests ────────────────────────────────────────────────────
