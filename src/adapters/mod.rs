//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements       | Connects to                 |
//! |------------|------------------|-----------------------------|
//! | `log_sink` | EventSink        | `log` facade                |
//! | `loopback` | FrameTransport   | In-memory frame capture     |
//! | `nvs`      | PersistencePort  | In-memory flash, postcard   |

pub mod log_sink;
pub mod loopback;
pub mod nvs;
