//! Fuzz target: `Reassembler::ingest`
//!
//! Splits the input into frame-sized pieces (the first byte of each piece
//! picks its length, so short reads and continuations are exercised) and
//! asserts that reassembly never panics and never yields a message whose
//! length differs from its header.
//!
//! cargo fuzz run fuzz_reassembler

#![no_main]

use boardpilot::config::FRAME_SIZE;
use boardpilot::rpc::chunked::{Ingest, Reassembler};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut r = Reassembler::new(1024);
    let mut rest = data;

    while let Some((&len, tail)) = rest.split_first() {
        let n = (len as usize % (FRAME_SIZE + 1)).min(tail.len());
        let (frame, next) = tail.split_at(n);
        rest = next;

        if let Ingest::Complete(msg) = r.ingest(frame) {
            assert_eq!(msg.payload.len(), msg.header.size as usize);
        }
        assert!(r.received() <= 1024, "buffer grew past the message limit");
    }

    r.reset();
    assert!(!r.is_active());
});
