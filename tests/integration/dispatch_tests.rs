//! End-to-end dispatch: frames in through the receive path, one message
//! served by the dispatcher, reply frames out of the loopback.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use boardpilot::app::events::{LinkEvent, PersistOutcome};
use boardpilot::app::ports::NullSink;
use boardpilot::config::LinkConfig;
use boardpilot::error::{DispatchError, TransmitError};
use boardpilot::registry::{ConfigKey, FieldBinding, FieldFlags};
use boardpilot::rpc::channels::MessageChannel;
use boardpilot::rpc::codec::{
    Command, GetConfigReply, GetConfigRequest, MessageHeader, SetConfigRequest, encode_message,
};
use boardpilot::rpc::io_task::{ReceivePath, serve_one};
use futures_lite::future::block_on;

use crate::mock_hw::{MockFlash, TestDispatcher, TestRegistry, device, device_with, replies};

/// Feed `payload` as frames and serve the resulting message.
fn exchange(d: &mut TestDispatcher, cmd: Command, payload: &[u8]) {
    let channel = MessageChannel::new();
    let mut rx = ReceivePath::new(&channel, &LinkConfig::default(), NullSink);
    let frames = encode_message(cmd, payload).unwrap();
    let handed: Vec<bool> = frames.iter().map(|f| rx.on_frame(f)).collect();
    assert_eq!(handed.iter().filter(|h| **h).count(), 1);
    assert!(handed.last().copied().unwrap());
    block_on(serve_one(&channel, d));
}

#[test]
fn hundred_byte_field_set_and_read_back() {
    let mut reg = TestRegistry::new(MockFlash::new());
    let field = reg
        .bind(FieldBinding::new(ConfigKey::KEYMAP, &[0u8; 100]).saveable())
        .unwrap();
    let (mut d, tap, sink) = device(reg);

    let value: Vec<u8> = (0..100).map(|i| (i * 3) as u8).collect();
    exchange(
        &mut d,
        Command::SetConfig,
        &SetConfigRequest::encode(ConfigKey::KEYMAP, true, &value),
    );
    assert_eq!(field.snapshot(), value);
    assert_eq!(
        sink.last(),
        Some(LinkEvent::FieldUpdated {
            key: ConfigKey::KEYMAP,
            persist: PersistOutcome::Saved
        })
    );

    exchange(
        &mut d,
        Command::GetConfig,
        &GetConfigRequest::encode(ConfigKey::KEYMAP, 100),
    );
    let frames = tap.take();
    assert_eq!(frames.len(), 5);

    let headers: Vec<MessageHeader> = frames
        .iter()
        .map(|f| MessageHeader::parse(f).unwrap())
        .collect();
    for (i, h) in headers.iter().enumerate() {
        assert_eq!(h.chunk_offset as usize, i * 24);
        assert_eq!(h.size, 104);
    }
    let last = headers.last().unwrap();
    assert_eq!(last.chunk_offset as usize + last.chunk_size as usize, 104);

    let reply = &replies(&frames)[0];
    let decoded = GetConfigReply::decode(&reply.payload).unwrap();
    assert_eq!(decoded.key, ConfigKey::KEYMAP);
    assert_eq!(decoded.data, value.as_slice());
}

#[test]
fn get_with_exact_max_size_is_accepted() {
    let mut reg = TestRegistry::new(MockFlash::new());
    reg.bind(FieldBinding::new(ConfigKey::SCROLL_SENSITIVITY, &[3, 4]))
        .unwrap();
    let (mut d, tap, _) = device(reg);

    exchange(
        &mut d,
        Command::GetConfig,
        &GetConfigRequest::encode(ConfigKey::SCROLL_SENSITIVITY, 2),
    );
    let reply = &replies(&tap.take())[0];
    assert_eq!(reply.payload, vec![0x41, 0x00, 2, 0, 3, 4]);
}

#[test]
fn save_failure_still_updates_and_notifies() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let mut flash = MockFlash::new();
    flash.fail_stores = true;
    let mut reg = TestRegistry::new(flash);
    let field = reg
        .bind(
            FieldBinding::new(ConfigKey::PAN_SENSITIVITY, &[1])
                .saveable()
                .on_update(|_| {
                    CALLS.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();
    let (mut d, _, sink) = device(reg);

    exchange(
        &mut d,
        Command::SetConfig,
        &SetConfigRequest::encode(ConfigKey::PAN_SENSITIVITY, true, &[9]),
    );
    assert_eq!(field.snapshot(), vec![9]);
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert!(!field.flags().contains(FieldFlags::WRITTEN));
    assert_eq!(
        sink.last(),
        Some(LinkEvent::FieldUpdated {
            key: ConfigKey::PAN_SENSITIVITY,
            persist: PersistOutcome::Failed
        })
    );
}

#[test]
fn update_callback_reads_its_own_field() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_cb = Arc::clone(&seen);
    let mut reg = TestRegistry::new(MockFlash::new());
    reg.bind(
        FieldBinding::new(ConfigKey::MOUSE_SENSITIVITY, &[5])
            .saveable()
            .on_update(move |field| {
                seen_cb.lock().unwrap().push(field.snapshot());
            }),
    )
    .unwrap();
    let (mut d, _, _) = device(reg);

    exchange(
        &mut d,
        Command::SetConfig,
        &SetConfigRequest::encode(ConfigKey::MOUSE_SENSITIVITY, true, &[9]),
    );
    assert_eq!(*seen.lock().unwrap(), vec![vec![9]]);
}

#[test]
fn save_flag_on_volatile_field_is_ignored() {
    let mut reg = TestRegistry::new(MockFlash::new());
    reg.bind(FieldBinding::new(ConfigKey::DATETIME, &[0; 8])).unwrap();
    let (mut d, _, sink) = device(reg);

    exchange(
        &mut d,
        Command::SetConfig,
        &SetConfigRequest::encode(ConfigKey::DATETIME, true, &[1; 8]),
    );
    assert_eq!(d.registry().with_store(|s| s.stores), 0);
    assert_eq!(
        sink.last(),
        Some(LinkEvent::FieldUpdated {
            key: ConfigKey::DATETIME,
            persist: PersistOutcome::NotRequested
        })
    );
}

#[test]
fn truncated_set_payload_is_rejected_untouched() {
    let mut reg = TestRegistry::new(MockFlash::new());
    let field = reg
        .bind(FieldBinding::new(ConfigKey::SLEEP_TIMEOUT, &[1, 2]))
        .unwrap();
    let (mut d, tap, sink) = device(reg);

    // Declares 2 data bytes but carries 1.
    let mut payload = SetConfigRequest::encode(ConfigKey::SLEEP_TIMEOUT, false, &[7, 7]);
    payload.pop();
    exchange(&mut d, Command::SetConfig, &payload);

    assert_eq!(field.snapshot(), vec![1, 2]);
    assert!(tap.is_empty());
    assert_eq!(
        sink.last(),
        Some(LinkEvent::MessageRejected {
            cmd: 0x11,
            error: DispatchError::Malformed { len: 6 }
        })
    );
}

#[test]
fn stalled_endpoint_abandons_reply() {
    let mut reg = TestRegistry::new(MockFlash::new());
    reg.bind(FieldBinding::new(ConfigKey::DISPLAY_CODE, &[0xEE; 60]))
        .unwrap();
    let (mut d, tap, sink) = device_with(reg, |lb| lb.failing_after(2));

    exchange(
        &mut d,
        Command::GetConfig,
        &GetConfigRequest::encode(ConfigKey::DISPLAY_CODE, 64),
    );
    assert_eq!(tap.len(), 2);
    assert!(d.transmitter().gate().is_released());
    assert_eq!(
        sink.last(),
        Some(LinkEvent::MessageRejected {
            cmd: 0x12,
            error: DispatchError::Transmit(TransmitError::Transport { sent: 2 })
        })
    );
}

#[test]
fn missing_completion_times_out_after_first_frame() {
    let mut reg = TestRegistry::new(MockFlash::new());
    reg.bind(FieldBinding::new(ConfigKey::DISPLAY_CODE, &[0; 30]))
        .unwrap();
    let (mut d, tap, sink) = device_with(reg, |lb| lb.holding_completion());

    exchange(
        &mut d,
        Command::GetConfig,
        &GetConfigRequest::encode(ConfigKey::DISPLAY_CODE, 64),
    );
    assert_eq!(tap.len(), 1);
    assert_eq!(
        sink.last(),
        Some(LinkEvent::MessageRejected {
            cmd: 0x12,
            error: DispatchError::Transmit(TransmitError::SendTimeout { sent: 1 })
        })
    );
}

#[test]
fn connect_is_answered_and_reported() {
    let (mut d, tap, sink) = device(TestRegistry::new(MockFlash::new()));
    exchange(&mut d, Command::Connect, &[]);
    let reply = &replies(&tap.take())[0];
    assert_eq!(reply.command(), Some(Command::Connect));
    assert!(reply.payload.is_empty());
    assert_eq!(sink.events(), vec![LinkEvent::Connected]);
}

#[test]
fn registry_is_shared_with_feature_code() {
    let mut reg = TestRegistry::new(MockFlash::new());
    let field = reg
        .bind(FieldBinding::new(ConfigKey::TP_CLICK_TYPE, &[0]))
        .unwrap();
    let (mut d, tap, _) = device(reg);

    // Feature module changes the live value between requests.
    field.set_value(&[2]).unwrap();
    exchange(
        &mut d,
        Command::GetConfig,
        &GetConfigRequest::encode(ConfigKey::TP_CLICK_TYPE, 1),
    );
    let reply = &replies(&tap.take())[0];
    assert_eq!(reply.payload.last(), Some(&2));
    assert_eq!(Arc::strong_count(d.registry()), 1);
}
