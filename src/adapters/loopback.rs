//! Loopback frame transport.
//!
//! Captures every written frame in memory and completes it immediately by
//! releasing the frame gate, the way a USB interrupt endpoint's
//! transfer-complete callback would.  Captured frames are shared with a
//! [`FrameTap`], so the simulator can read replies back while the
//! transport itself lives on the dispatch worker.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::trace;

use crate::rpc::codec::Frame;
use crate::rpc::transmit::FrameGate;
use crate::rpc::transport::FrameTransport;

/// Why a loopback write was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackError {
    /// Injected failure.
    Stalled,
}

type Captured = Arc<Mutex<Vec<Frame>>>;

fn lock(captured: &Captured) -> MutexGuard<'_, Vec<Frame>> {
    captured.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Loopback {
    gate: Arc<FrameGate>,
    captured: Captured,
    written: usize,
    /// Refuse writes once this many frames have been written.
    fail_after: Option<usize>,
    /// Capture without signalling completion.
    hold_completion: bool,
}

impl Loopback {
    pub fn new(gate: Arc<FrameGate>) -> Self {
        Self {
            gate,
            captured: Arc::new(Mutex::new(Vec::new())),
            written: 0,
            fail_after: None,
            hold_completion: false,
        }
    }

    /// Stall the endpoint after `n` successful writes.
    #[must_use]
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Never signal completion, so the next gate acquisition times out.
    #[must_use]
    pub fn holding_completion(mut self) -> Self {
        self.hold_completion = true;
        self
    }

    /// A handle onto the captured frames.
    pub fn tap(&self) -> FrameTap {
        FrameTap(Arc::clone(&self.captured))
    }

    /// Copy of the frames captured and not yet taken.
    pub fn frames(&self) -> Vec<Frame> {
        lock(&self.captured).clone()
    }
}

impl FrameTransport for Loopback {
    type Error = LoopbackError;

    fn write_frame(&mut self, frame: &Frame) -> Result<(), LoopbackError> {
        if self.fail_after.is_some_and(|n| self.written >= n) {
            return Err(LoopbackError::Stalled);
        }
        lock(&self.captured).push(*frame);
        self.written += 1;
        trace!("Loopback: captured frame {}", self.written);
        if !self.hold_completion {
            self.gate.release();
        }
        Ok(())
    }
}

/// Reader side of a [`Loopback`].
#[derive(Clone)]
pub struct FrameTap(Captured);

impl FrameTap {
    /// Drain the captured frames.
    pub fn take(&self) -> Vec<Frame> {
        std::mem::take(&mut *lock(&self.0))
    }

    pub fn len(&self) -> usize {
        lock(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
