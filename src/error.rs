//! Unified error types for the BoardPilot configuration link.
//!
//! One enum per failure class, each convertible into the top-level
//! [`Error`].  All variants are `Copy` so they can be handed from the
//! receive context to the worker and into log events without allocation.
//!
//! Nothing in this crate is process-fatal: a protocol error drops the
//! message, a validation error rejects it, a persistence error only shows
//! up in field flags, and a transport error abandons the rest of a reply.

use core::fmt;

use crate::registry::ConfigKey;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Framing failed; the message was dropped and reassembly reset.
    Protocol(ProtocolError),
    /// Field registry operation failed.
    Registry(RegistryError),
    /// A complete message was rejected by the dispatcher.
    Dispatch(DispatchError),
    /// An outbound reply could not be (fully) transmitted.
    Transmit(TransmitError),
    /// The persistence collaborator failed.
    Storage(StorageError),
    /// A keymap record or binding could not be converted.
    Keymap(KeymapError),
    /// Link configuration is out of range.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::Transmit(e) => write!(f, "transmit: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Keymap(e) => write!(f, "keymap: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Protocol (framing) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Chunk-start frame shorter than the message header.
    MalformedHeader { len: usize },
    /// Report id was not 0x05.
    InvalidProtocolId(u8),
    /// Reassembly buffer could not be allocated.
    OutOfMemory { requested: usize },
    /// Declared total size exceeds the configured message limit.
    MessageTooLarge { size: usize, limit: usize },
    /// Chunk offset does not continue where the previous chunk ended.
    OutOfOrder { expected: usize, got: usize },
    /// Command or total size changed in the middle of a message.
    InconsistentHeader,
    /// Chunk is empty, exceeds frame capacity, or runs past the total size.
    ChunkOverrun { offset: usize, size: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHeader { len } => write!(f, "frame too short for header ({len} bytes)"),
            Self::InvalidProtocolId(id) => write!(f, "invalid report id 0x{id:02X}"),
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory allocating {requested} bytes")
            }
            Self::MessageTooLarge { size, limit } => {
                write!(f, "message of {size} bytes exceeds limit of {limit}")
            }
            Self::OutOfOrder { expected, got } => {
                write!(f, "chunk offset {got}, expected {expected}")
            }
            Self::InconsistentHeader => write!(f, "header changed mid-message"),
            Self::ChunkOverrun { offset, size } => {
                write!(f, "chunk {size}@{offset} out of bounds")
            }
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Key 0x0000 is reserved.
    InvalidKey,
    /// The key is already bound.
    DuplicateKey(ConfigKey),
    /// Every registry slot is taken.
    CapacityExceeded,
    /// Field size is zero or above the per-field limit.
    FieldTooLarge { size: usize },
    /// No field is bound under this key.
    NotFound(ConfigKey),
    /// The field is volatile and never touches flash.
    NotSaveable(ConfigKey),
    /// A value did not match the field's fixed size.
    SizeMismatch { expected: usize, got: usize },
    /// The persistence collaborator failed.
    Storage(StorageError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "key 0x0000 is reserved"),
            Self::DuplicateKey(k) => write!(f, "field {k} already bound"),
            Self::CapacityExceeded => write!(f, "field registry full"),
            Self::FieldTooLarge { size } => write!(f, "field size {size} out of range"),
            Self::NotFound(k) => write!(f, "field {k} not found"),
            Self::NotSaveable(k) => write!(f, "field {k} is not saveable"),
            Self::SizeMismatch { expected, got } => {
                write!(f, "size mismatch ({got} given, {expected} defined)")
            }
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<StorageError> for RegistryError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Dispatch (validation) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// Command byte 0x00 or an unknown command.
    InvalidCommand(u8),
    /// Request payload has the wrong length for its command.
    Malformed { len: usize },
    /// No field bound under the requested key.
    NotFound(ConfigKey),
    /// SET_CONFIG declared a size different from the field's.
    SizeMismatch {
        key: ConfigKey,
        declared: usize,
        defined: usize,
    },
    /// GET_CONFIG reply would not fit the requester's declared maximum.
    TooLarge {
        key: ConfigKey,
        max: usize,
        defined: usize,
    },
    /// The reply was abandoned mid-stream.
    Transmit(TransmitError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand(cmd) => write!(f, "invalid command 0x{cmd:02X}"),
            Self::Malformed { len } => write!(f, "malformed payload ({len} bytes)"),
            Self::NotFound(k) => write!(f, "field {k} not found"),
            Self::SizeMismatch {
                key,
                declared,
                defined,
            } => write!(
                f,
                "field {key} size not correct ({declared} received, {defined} defined)"
            ),
            Self::TooLarge { key, max, defined } => write!(
                f,
                "field {key} does not fit ({max} requested < {defined} defined)"
            ),
            Self::Transmit(e) => write!(f, "reply failed: {e}"),
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<TransmitError> for DispatchError {
    fn from(e: TransmitError) -> Self {
        Self::Transmit(e)
    }
}

// ---------------------------------------------------------------------------
// Transmit (transport) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitError {
    /// The frame gate was not released in time.
    SendTimeout { sent: usize },
    /// The transport rejected a frame.
    Transport { sent: usize },
    /// Payload does not fit the 16-bit total size field.
    PayloadTooLarge { len: usize },
}

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendTimeout { sent } => write!(f, "frame gate timeout after {sent} frames"),
            Self::Transport { sent } => write!(f, "transport write failed after {sent} frames"),
            Self::PayloadTooLarge { len } => write!(f, "payload of {len} bytes too large"),
        }
    }
}

impl From<TransmitError> for Error {
    fn from(e: TransmitError) -> Self {
        Self::Transmit(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors from [`PersistencePort`](crate::app::ports::PersistencePort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Keymap errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeymapError {
    /// Record names a device id outside the behavior table.
    UnknownDeviceId(u8),
    /// Binding names a behavior that has no id.
    UnknownDeviceName,
    /// Layer does not fit the 4-bit layer field.
    InvalidLayer(u8),
    /// Position does not fit the 12-bit position field.
    InvalidPosition(u16),
    /// Record payload is not a whole number of records.
    Malformed { len: usize },
}

impl fmt::Display for KeymapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDeviceId(id) => write!(f, "unknown device id {id}"),
            Self::UnknownDeviceName => write!(f, "unknown device name"),
            Self::InvalidLayer(l) => write!(f, "layer {l} out of range (0-15)"),
            Self::InvalidPosition(p) => write!(f, "position {p} out of range (0-4095)"),
            Self::Malformed { len } => write!(f, "{len} bytes is not a whole number of records"),
        }
    }
}

impl From<KeymapError> for Error {
    fn from(e: KeymapError) -> Self {
        Self::Keymap(e)
    }
}
