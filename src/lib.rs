//! BoardPilot configuration link.
//!
//! Lets a host companion read and write named configuration fields on an
//! input device over fixed-size HID reports, with selective flash-backed
//! persistence.  The transport and the flash driver are supplied by the
//! firmware through the [`rpc::transport::FrameTransport`] and
//! [`app::ports::PersistencePort`] traits.
//!
//! Gate timeouts and frame pacing run on `async-io-mini` timers, which read
//! the embassy time driver.  Host builds link embassy-time's std driver;
//! ESP-IDF firmware provides `_embassy_time_now` and
//! `_embassy_time_schedule_wake` from the system timer.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
#[cfg(feature = "keymap")]
pub mod keymap;
pub mod registry;
pub mod rpc;

// Pulls the time driver into every binary that links this crate.
#[cfg(not(target_os = "espidf"))]
use embassy_time as _;
