//! Link configuration parameters
//!
//! Wire-format constants are fixed by the HID report descriptor and live
//! here as `const`s.  Timing and size limits that a build may tune are in
//! [`LinkConfig`].

use serde::{Deserialize, Serialize};

use crate::error::Error;

// --- Wire format ---

/// Report identifier of every configuration frame.
pub const REPORT_ID: u8 = 0x05;
/// Fixed transport report size, including the report id byte.
pub const FRAME_SIZE: usize = 32;
/// Message header carried at the start of every chunk.
pub const HEADER_SIZE: usize = 8;
/// Payload bytes available in one frame after the header.
pub const PAYLOAD_CAPACITY: usize = FRAME_SIZE - HEADER_SIZE;

// --- Registry ---

/// Largest value a single field may hold.
pub const MAX_FIELD_SIZE: usize = 512;
/// Default registry capacity used by the simulator.
pub const DEFAULT_MAX_FIELDS: usize = 16;

// --- Worker handoff ---

/// Completed messages waiting for the dispatch worker.
pub const MESSAGE_QUEUE_DEPTH: usize = 1;

/// Runtime link configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkConfig {
    /// Bound on waiting for the previous frame's completion (milliseconds).
    pub gate_timeout_ms: u32,
    /// Delay after each outbound frame (milliseconds).
    pub pacing_ms: u32,
    /// Largest inbound logical message accepted by the reassembler.
    pub max_message_size: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            gate_timeout_ms: 30,
            pacing_ms: 1,
            max_message_size: 1024,
        }
    }
}

impl LinkConfig {
    /// Range-check every parameter.
    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=1000).contains(&self.gate_timeout_ms) {
            return Err(Error::Config("gate_timeout_ms must be 1–1000"));
        }
        if self.pacing_ms > 100 {
            return Err(Error::Config("pacing_ms must be 0–100"));
        }
        // A SET_CONFIG for the largest field must still fit.
        if (self.max_message_size as usize) < MAX_FIELD_SIZE + 5 {
            return Err(Error::Config(
                "max_message_size must hold the largest SET_CONFIG request",
            ));
        }
        Ok(())
    }
}
