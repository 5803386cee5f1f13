//! Reassembly of logical messages from fixed-size frames.
//!
//! ```text
//! Frame 1: [hdr off=0  len=24] payload[0..24]
//! Frame 2: [hdr off=24 len=24] payload[24..48]
//!   ...
//! Frame N: [hdr off=k  len=r ] payload[k..size]   → Complete
//! ```
//!
//! A frame is a *chunk start* (carries a header) when the previous chunk's
//! declared bytes have all arrived, and a *continuation* (raw payload
//! only) otherwise.  Continuations only occur when the transport hands
//! over a chunk in more than one read.
//!
//! Every header inside a message is checked against the first one and
//! against the bytes accumulated so far before anything is copied; any
//! inconsistency discards the message.  Continuation copies are clamped to
//! the bytes actually present in the frame.

use log::debug;

use super::codec::{Command, MessageHeader};
use crate::config::{HEADER_SIZE, PAYLOAD_CAPACITY, REPORT_ID};
use crate::error::ProtocolError;

/// A fully reassembled message, owned by whoever receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Header of the first chunk.
    pub header: MessageHeader,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn cmd(&self) -> u8 {
        self.header.cmd
    }

    pub fn command(&self) -> Option<Command> {
        self.header.command()
    }
}

/// Result of feeding one frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Ingest {
    /// More frames are needed.
    Incomplete,
    Complete(Message),
    /// The frame was rejected and any partial message discarded.
    Error(ProtocolError),
}

struct InProgress {
    first: MessageHeader,
    buffer: Vec<u8>,
    /// Bytes of the current chunk still expected.
    chunk_remaining: usize,
}

/// Single-message reassembly state machine.
pub struct Reassembler {
    max_message_size: usize,
    state: Option<InProgress>,
}

impl Reassembler {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            state: None,
        }
    }

    /// Feed one frame.
    pub fn ingest(&mut self, frame: &[u8]) -> Ingest {
        match self.step(frame) {
            Ok(Some(msg)) => Ingest::Complete(msg),
            Ok(None) => Ingest::Incomplete,
            Err(e) => {
                self.reset();
                Ingest::Error(e)
            }
        }
    }

    /// Discard any partial message.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Whether a message is partially received.
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Bytes of the in-flight message received so far.
    pub fn received(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.buffer.len())
    }

    fn step(&mut self, frame: &[u8]) -> Result<Option<Message>, ProtocolError> {
        let data = match self.state.as_mut() {
            Some(s) if s.chunk_remaining > 0 => {
                let n = s.chunk_remaining.min(frame.len());
                s.chunk_remaining -= n;
                &frame[..n]
            }
            _ => {
                let header = MessageHeader::parse(frame)?;
                let available = &frame[HEADER_SIZE..];
                let state = match self.state.take() {
                    None => self.begin(header)?,
                    Some(s) => s,
                };
                let state = self.state.insert(state);
                Self::check_chunk(state, &header)?;

                let n = (header.chunk_size as usize).min(available.len());
                state.chunk_remaining = header.chunk_size as usize - n;
                &available[..n]
            }
        };

        // Offsets were checked against the total size, so this never
        // grows the buffer past `size`.
        let Some(state) = self.state.as_mut() else {
            return Ok(None);
        };
        state.buffer.extend_from_slice(data);

        if state.buffer.len() == state.first.size as usize {
            let state = self.state.take().map(|s| Message {
                header: s.first,
                payload: s.buffer,
            });
            if let Some(msg) = &state {
                debug!(
                    "Reassembler: cmd=0x{:02X} complete ({} bytes)",
                    msg.header.cmd,
                    msg.payload.len()
                );
            }
            return Ok(state);
        }
        Ok(None)
    }

    fn begin(&self, header: MessageHeader) -> Result<InProgress, ProtocolError> {
        if header.report_id != REPORT_ID {
            return Err(ProtocolError::InvalidProtocolId(header.report_id));
        }
        let size = header.size as usize;
        if size > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size,
                limit: self.max_message_size,
            });
        }
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(size)
            .map_err(|_| ProtocolError::OutOfMemory { requested: size })?;
        Ok(InProgress {
            first: header,
            buffer,
            chunk_remaining: 0,
        })
    }

    fn check_chunk(state: &InProgress, header: &MessageHeader) -> Result<(), ProtocolError> {
        if header.report_id != REPORT_ID {
            return Err(ProtocolError::InvalidProtocolId(header.report_id));
        }
        if header.cmd != state.first.cmd || header.size != state.first.size {
            return Err(ProtocolError::InconsistentHeader);
        }
        let offset = header.chunk_offset as usize;
        if offset != state.buffer.len() {
            return Err(ProtocolError::OutOfOrder {
                expected: state.buffer.len(),
                got: offset,
            });
        }
        let size = header.chunk_size as usize;
        let total = state.first.size as usize;
        let empty_message = total == 0 && size == 0;
        if !empty_message && (size == 0 || size > PAYLOAD_CAPACITY || offset + size > total) {
            return Err(ProtocolError::ChunkOverrun { offset, size });
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────
