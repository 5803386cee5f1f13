//! Reply transmitter: chunks a payload into frames and writes them one at
//! a time through the frame gate.
//!
//! ```text
//!   send(cmd, payload)
//!     for each chunk:
//!       gate.acquire(timeout) ──timeout──▶ SendTimeout
//!       transport.write_frame ──error────▶ gate.release, Transport
//!       Timer::after(pacing)
//!   transport completion ──▶ gate.release
//! ```
//!
//! Only one frame is ever in flight.  A failure abandons the remaining
//! chunks; nothing already sent is retried or recalled.

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{trace, warn};

use super::codec::{Command, encode_frame, plan_chunks};
use super::transport::FrameTransport;
use crate::config::LinkConfig;
use crate::error::TransmitError;

/// Single-in-flight-frame gate.
///
/// Starts released.  `acquire` consumes the release; the transport's
/// completion context calls `release` once the frame has left.
pub struct FrameGate {
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl FrameGate {
    pub fn new() -> Self {
        let signal = Signal::new();
        signal.signal(());
        Self { signal }
    }

    /// Mark the previous frame complete.  Safe to call from any context.
    pub fn release(&self) {
        self.signal.signal(());
    }

    /// Wait up to `timeout` for the gate.  Returns `false` on expiry.
    pub async fn acquire(&self, timeout: Duration) -> bool {
        futures_lite::future::or(
            async {
                self.signal.wait().await;
                true
            },
            async {
                async_io_mini::Timer::after(timeout).await;
                false
            },
        )
        .await
    }

    /// Whether the gate is currently free.
    pub fn is_released(&self) -> bool {
        self.signal.signaled()
    }
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Streams reply payloads over a [`FrameTransport`].
pub struct ReplyTransmitter<T: FrameTransport> {
    transport: T,
    gate: std::sync::Arc<FrameGate>,
    gate_timeout: Duration,
    pacing: Duration,
}

impl<T: FrameTransport> ReplyTransmitter<T> {
    pub fn new(transport: T, gate: std::sync::Arc<FrameGate>, config: &LinkConfig) -> Self {
        Self {
            transport,
            gate,
            gate_timeout: Duration::from_millis(u64::from(config.gate_timeout_ms)),
            pacing: Duration::from_millis(u64::from(config.pacing_ms)),
        }
    }

    /// Send `payload` as one logical message.  Returns the number of frames
    /// written.
    pub async fn send(&mut self, cmd: Command, payload: &[u8]) -> Result<usize, TransmitError> {
        let mut sent = 0;
        for header in plan_chunks(cmd, payload.len())? {
            if !self.gate.acquire(self.gate_timeout).await {
                warn!(
                    "TX: cmd=0x{:02X} gate timeout after {} frames",
                    header.cmd, sent
                );
                return Err(TransmitError::SendTimeout { sent });
            }

            let start = header.chunk_offset as usize;
            let end = start + header.chunk_size as usize;
            let frame = encode_frame(&header, &payload[start..end]);

            if let Err(e) = self.transport.write_frame(&frame) {
                // No completion will arrive for a rejected write.
                self.gate.release();
                warn!("TX: write failed after {} frames: {:?}", sent, e);
                return Err(TransmitError::Transport { sent });
            }
            sent += 1;
            trace!(
                "TX: cmd=0x{:02X} offset={} len={}",
                header.cmd, header.chunk_offset, header.chunk_size
            );

            if !self.pacing.is_zero() {
                async_io_mini::Timer::after(self.pacing).await;
            }
        }
        Ok(sent)
    }

    pub fn gate(&self) -> &std::sync::Arc<FrameGate> {
        &self.gate
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
