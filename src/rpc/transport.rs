//! Frame transport abstraction.
//!
//! Concrete implementations:
//! - USB HID interrupt IN endpoint (on target)
//! - [`Loopback`](crate::adapters::loopback::Loopback) capture (simulator, tests)
//!
//! A write only *starts* a transfer.  The transport signals completion by
//! calling [`FrameGate::release`](super::transmit::FrameGate::release) from
//! its completion context; the transmitter waits on that before issuing the
//! next frame.  The receive direction needs no trait: the transport's read
//! callback hands each frame to
//! [`ReceivePath::on_frame`](super::io_task::ReceivePath::on_frame).

use super::codec::Frame;

/// Outbound frame channel.
pub trait FrameTransport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Queue one frame for transmission.
    ///
    /// `Ok` means the transfer was accepted; completion is reported
    /// separately through the frame gate.  On `Err` no completion will
    /// ever be signalled for this frame.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), Self::Error>;
}

/// A null transport that accepts and discards every frame.
///
/// It never signals completion, so it is only useful with a gate that is
/// released elsewhere, or for a single-frame reply.
pub struct NullTransport;

impl FrameTransport for NullTransport {
    type Error = ();

    fn write_frame(&mut self, _frame: &Frame) -> Result<(), ()> {
        Ok(())
    }
}
