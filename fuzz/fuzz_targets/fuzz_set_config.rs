//! Fuzz target: `SetConfigRequest::decode`
//!
//! Any payload either decodes to a request whose data length equals its
//! declared size, or is rejected.  Accepted requests re-encode to the
//! same bytes.
//!
//! cargo fuzz run fuzz_set_config

#![no_main]

use boardpilot::rpc::codec::SetConfigRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(req) = SetConfigRequest::decode(data) {
        assert_eq!(req.data.len(), req.declared_size);
        if data[4] <= 1 {
            assert_eq!(SetConfigRequest::encode(req.key, req.save, req.data), data);
        }
    }
});
