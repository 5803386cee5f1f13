//! Application boundary: port traits and outbound events.
//!
//! The protocol core never touches flash or a logger directly.  It talks
//! to the persistence collaborator through [`ports::PersistencePort`] and
//! reports what it did through [`ports::EventSink`], keeping the
//! dispatcher and registry testable without real peripherals.

pub mod events;
pub mod ports;
