//! Fixed-size report codec.
//!
//! Wire format (one 32-byte interrupt report, little-endian):
//! ```text
//! ┌────┬─────┬──────────┬───────┬────────────┬─────┬──────────────────┐
//! │ id │ cmd │ size u16 │ chunk │ offset u16 │ crc │ payload (24 B)   │
//! │ 0  │ 1   │ 2..4     │ 4     │ 5..7       │ 7   │ 8..32            │
//! └────┴─────┴──────────┴───────┴────────────┴─────┴──────────────────┘
//! ```
//!
//! A logical message of `size` bytes is carried in chunks of at most
//! [`PAYLOAD_CAPACITY`] bytes, each prefixed by a header whose `offset`
//! is the number of message bytes that precede it.  The CRC byte is
//! carried end-to-end but not computed or checked.
//!
//! This module also holds the payload layouts of the two configuration
//! commands, for both the device side (decode request, encode reply) and
//! the companion side (encode request, decode reply).

use crate::config::{FRAME_SIZE, HEADER_SIZE, PAYLOAD_CAPACITY, REPORT_ID};
use crate::error::{DispatchError, ProtocolError, TransmitError};
use crate::registry::ConfigKey;

/// One transport report.
pub type Frame = [u8; FRAME_SIZE];

// ── Commands ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Reserved; always rejected.
    Invalid = 0x00,
    /// Link check.
    Connect = 0x01,
    SetConfig = 0x11,
    GetConfig = 0x12,
}

impl Command {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(Self::Invalid),
            0x01 => Some(Self::Connect),
            0x11 => Some(Self::SetConfig),
            0x12 => Some(Self::GetConfig),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

// ── Header ───────────────────────────────────────────────────

/// Header at the start of every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub report_id: u8,
    pub cmd: u8,
    /// Total logical message size.
    pub size: u16,
    /// Payload bytes in this chunk.
    pub chunk_size: u8,
    /// Message bytes preceding this chunk.
    pub chunk_offset: u16,
    /// Reserved, not validated.
    pub crc: u8,
}

impl MessageHeader {
    pub fn new(cmd: Command, size: u16, chunk_offset: u16, chunk_size: u8) -> Self {
        Self {
            report_id: REPORT_ID,
            cmd: cmd.as_u8(),
            size,
            chunk_size,
            chunk_offset,
            crc: 0,
        }
    }

    /// Parse the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let Some(h) = bytes.get(..HEADER_SIZE) else {
            return Err(ProtocolError::MalformedHeader { len: bytes.len() });
        };
        Ok(Self {
            report_id: h[0],
            cmd: h[1],
            size: u16::from_le_bytes([h[2], h[3]]),
            chunk_size: h[4],
            chunk_offset: u16::from_le_bytes([h[5], h[6]]),
            crc: h[7],
        })
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let size = self.size.to_le_bytes();
        let offset = self.chunk_offset.to_le_bytes();
        [
            self.report_id,
            self.cmd,
            size[0],
            size[1],
            self.chunk_size,
            offset[0],
            offset[1],
            self.crc,
        ]
    }

    pub fn command(&self) -> Option<Command> {
        Command::from_u8(self.cmd)
    }
}

// ── Frames ───────────────────────────────────────────────────

/// Build one zero-padded frame from a header and its chunk.
///
/// `chunk` must not exceed [`PAYLOAD_CAPACITY`]; longer input is cut.
pub fn encode_frame(header: &MessageHeader, chunk: &[u8]) -> Frame {
    let mut frame = [0u8; FRAME_SIZE];
    frame[..HEADER_SIZE].copy_from_slice(&header.encode());
    let n = chunk.len().min(PAYLOAD_CAPACITY);
    frame[HEADER_SIZE..HEADER_SIZE + n].copy_from_slice(&chunk[..n]);
    frame
}

/// Header for every chunk of a `payload`-sized message, in send order.
///
/// An empty payload still yields one header-only chunk.
pub fn plan_chunks(
    cmd: Command,
    payload_len: usize,
) -> Result<impl Iterator<Item = MessageHeader>, TransmitError> {
    let total = u16::try_from(payload_len)
        .map_err(|_| TransmitError::PayloadTooLarge { len: payload_len })?;
    let count = payload_len.div_ceil(PAYLOAD_CAPACITY).max(1);
    Ok((0..count).map(move |i| {
        let offset = i * PAYLOAD_CAPACITY;
        let chunk = (payload_len - offset).min(PAYLOAD_CAPACITY);
        MessageHeader::new(cmd, total, offset as u16, chunk as u8)
    }))
}

/// Encode a whole message as a sequence of frames.
pub fn encode_message(cmd: Command, payload: &[u8]) -> Result<Vec<Frame>, TransmitError> {
    Ok(plan_chunks(cmd, payload.len())?
        .map(|h| {
            let start = h.chunk_offset as usize;
            let end = start + h.chunk_size as usize;
            encode_frame(&h, &payload[start..end])
        })
        .collect())
}

// ── SET_CONFIG ───────────────────────────────────────────────

/// `key:u16, size:u16, save:u8, data[size]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetConfigRequest<'a> {
    pub key: ConfigKey,
    pub declared_size: usize,
    pub save: bool,
    pub data: &'a [u8],
}

/// `key:u16, size:u16, save:u8` ahead of the data bytes.
const SET_PREFIX_LEN: usize = 5;
/// `key:u16, size:u16` ahead of the data bytes.
const REPLY_PREFIX_LEN: usize = 4;

impl<'a> SetConfigRequest<'a> {
    pub const PREFIX_LEN: usize = SET_PREFIX_LEN;

    /// Decode a request.  The payload must hold exactly `size` data bytes.
    pub fn decode(payload: &'a [u8]) -> Result<Self, DispatchError> {
        let malformed = DispatchError::Malformed { len: payload.len() };
        let (prefix, data) = payload
            .split_first_chunk::<SET_PREFIX_LEN>()
            .ok_or(malformed)?;
        let declared_size = u16::from_le_bytes([prefix[2], prefix[3]]) as usize;
        if data.len() != declared_size {
            return Err(malformed);
        }
        Ok(Self {
            key: ConfigKey::from_le_bytes([prefix[0], prefix[1]]),
            declared_size,
            save: prefix[4] != 0,
            data,
        })
    }

    pub fn encode(key: ConfigKey, save: bool, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PREFIX_LEN + data.len());
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.push(u8::from(save));
        out.extend_from_slice(data);
        out
    }
}

// ── GET_CONFIG ───────────────────────────────────────────────

/// `key:u16, max_size:u16`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetConfigRequest {
    pub key: ConfigKey,
    pub max_size: usize,
}

impl GetConfigRequest {
    pub const LEN: usize = 4;

    /// Decode a request.  Trailing bytes are ignored.
    pub fn decode(payload: &[u8]) -> Result<Self, DispatchError> {
        let Some(p) = payload.first_chunk::<{ Self::LEN }>() else {
            return Err(DispatchError::Malformed { len: payload.len() });
        };
        Ok(Self {
            key: ConfigKey::from_le_bytes([p[0], p[1]]),
            max_size: u16::from_le_bytes([p[2], p[3]]) as usize,
        })
    }

    pub fn encode(key: ConfigKey, max_size: u16) -> [u8; Self::LEN] {
        let k = key.to_le_bytes();
        let m = max_size.to_le_bytes();
        [k[0], k[1], m[0], m[1]]
    }
}

/// `key:u16, size:u16, data[size]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetConfigReply<'a> {
    pub key: ConfigKey,
    pub data: &'a [u8],
}

impl<'a> GetConfigReply<'a> {
    pub const PREFIX_LEN: usize = REPLY_PREFIX_LEN;

    pub fn encode(key: ConfigKey, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::PREFIX_LEN + data.len());
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    pub fn decode(payload: &'a [u8]) -> Result<Self, DispatchError> {
        let malformed = DispatchError::Malformed { len: payload.len() };
        let (prefix, data) = payload
            .split_first_chunk::<REPLY_PREFIX_LEN>()
            .ok_or(malformed)?;
        let size = u16::from_le_bytes([prefix[2], prefix[3]]) as usize;
        if data.len() != size {
            return Err(malformed);
        }
        Ok(Self {
            key: ConfigKey::from_le_bytes([prefix[0], prefix[1]]),
            data,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────
