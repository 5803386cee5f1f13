//! Mock collaborators for integration tests.
//!
//! A flash store with injectable failures, an event sink whose history
//! stays readable after the sink moves onto the worker, and a helper that
//! assembles a complete device-side link over a loopback transport.

use std::sync::{Arc, Mutex};

use boardpilot::adapters::loopback::{FrameTap, Loopback};
use boardpilot::adapters::nvs::MemoryStore;
use boardpilot::app::events::LinkEvent;
use boardpilot::app::ports::{EventSink, PersistencePort};
use boardpilot::config::LinkConfig;
use boardpilot::error::StorageError;
use boardpilot::registry::{ConfigKey, FieldRegistry};
use boardpilot::rpc::chunked::{Ingest, Message, Reassembler};
use boardpilot::rpc::codec::Frame;
use boardpilot::rpc::engine::Dispatcher;
use boardpilot::rpc::transmit::{FrameGate, ReplyTransmitter};

// ── Flash store ───────────────────────────────────────────────

/// In-memory store whose reads or writes can be made to fail.
pub struct MockFlash {
    pub inner: MemoryStore,
    pub fail_loads: bool,
    pub fail_stores: bool,
    pub stores: usize,
}

#[allow(dead_code)]
impl MockFlash {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_loads: false,
            fail_stores: false,
            stores: 0,
        }
    }

    pub fn with_record(mut self, key: ConfigKey, data: &[u8]) -> Self {
        self.inner.insert_raw(key, data);
        self
    }
}

impl PersistencePort for MockFlash {
    fn load(&self, key: ConfigKey) -> Result<Vec<u8>, StorageError> {
        if self.fail_loads {
            return Err(StorageError::IoError);
        }
        self.inner.load(key)
    }

    fn store(&mut self, key: ConfigKey, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_stores {
            return Err(StorageError::Full);
        }
        self.stores += 1;
        self.inner.store(key, data)
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink(pub Arc<Mutex<Vec<LinkEvent>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<LinkEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<LinkEvent> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &LinkEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Assembled link ────────────────────────────────────────────

pub type TestRegistry = FieldRegistry<MockFlash, 8>;
pub type TestDispatcher = Dispatcher<MockFlash, Loopback, RecordingSink, 8>;

/// Device side of a link with immediate completion and no pacing.
pub fn device(registry: TestRegistry) -> (TestDispatcher, FrameTap, RecordingSink) {
    device_with(registry, |lb| lb)
}

pub fn device_with(
    registry: TestRegistry,
    transport: impl FnOnce(Loopback) -> Loopback,
) -> (TestDispatcher, FrameTap, RecordingSink) {
    let gate = Arc::new(FrameGate::new());
    let loopback = transport(Loopback::new(Arc::clone(&gate)));
    let tap = loopback.tap();
    let config = LinkConfig {
        gate_timeout_ms: 10,
        pacing_ms: 0,
        ..LinkConfig::default()
    };
    let sink = RecordingSink::default();
    let dispatcher = Dispatcher::new(
        Arc::new(registry),
        ReplyTransmitter::new(loopback, gate, &config),
        sink.clone(),
    );
    (dispatcher, tap, sink)
}

/// Reassemble every reply contained in `frames`.
pub fn replies(frames: &[Frame]) -> Vec<Message> {
    let mut r = Reassembler::new(4096);
    frames
        .iter()
        .filter_map(|f| match r.ingest(f) {
            Ingest::Complete(msg) => Some(msg),
            _ => None,
        })
        .collect()
}
