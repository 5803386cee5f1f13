//! Transport-agnostic configuration link.
//!
//! Chunked request/reply protocol over fixed 32-byte reports.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Config link                           │
//! │                                                              │
//! │  ┌───────────┐   ┌────────────┐   ┌────────┐   ┌──────────┐  │
//! │  │ transport │──▶│ Reassembler│──▶│channel │──▶│Dispatcher│  │
//! │  │  (rx cb)  │   │ (chunked)  │   │(depth 1│   │ (engine) │  │
//! │  └───────────┘   └────────────┘   └────────┘   └────┬─────┘  │
//! │       ▲                                             │        │
//! │       │          ┌───────────────────┐              │        │
//! │  ┌───────────┐   │ ReplyTransmitter  │◀─────────────┘        │
//! │  │ transport │◀──│ (gate + pacing)   │                       │
//! │  │  (write)  │   └───────────────────┘                       │
//! │  └───────────┘                                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod chunked;
pub mod codec;
pub mod engine;
pub mod io_task;
pub mod transmit;
pub mod transport;
