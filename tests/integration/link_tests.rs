//! Receive path and a spawned dispatch worker, wired the way firmware
//! wires them.

use std::time::{Duration, Instant};

use boardpilot::app::events::LinkEvent;
use boardpilot::config::LinkConfig;
use boardpilot::error::ProtocolError;
use boardpilot::registry::{ConfigKey, FieldBinding};
use boardpilot::rpc::channels::MessageChannel;
use boardpilot::rpc::codec::{
    Command, GetConfigReply, GetConfigRequest, MessageHeader, SetConfigRequest, encode_frame,
    encode_message,
};
use boardpilot::rpc::io_task::{self, ReceivePath};

use crate::mock_hw::{MockFlash, RecordingSink, TestRegistry, device, replies};

fn leaked_channel() -> &'static MessageChannel {
    Box::leak(Box::new(MessageChannel::new()))
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn worker_thread_serves_set_then_get() {
    let mut reg = TestRegistry::new(MockFlash::new());
    let field = reg
        .bind(FieldBinding::new(ConfigKey::SLEEP_TIMEOUT, &[0x58, 0x02]).saveable())
        .unwrap();
    let (dispatcher, tap, sink) = device(reg);
    let channel = leaked_channel();
    io_task::spawn(channel, dispatcher).unwrap();

    let mut rx = ReceivePath::new(channel, &LinkConfig::default(), RecordingSink::default());
    let set = SetConfigRequest::encode(ConfigKey::SLEEP_TIMEOUT, true, &[0x84, 0x03]);
    for f in encode_message(Command::SetConfig, &set).unwrap() {
        rx.on_frame(&f);
    }
    assert!(wait_until(|| field.snapshot() == vec![0x84, 0x03]));
    assert!(wait_until(|| channel.is_empty()));

    let get = GetConfigRequest::encode(ConfigKey::SLEEP_TIMEOUT, 2);
    for f in encode_message(Command::GetConfig, &get).unwrap() {
        rx.on_frame(&f);
    }
    assert!(wait_until(|| !tap.is_empty()));
    let reply = &replies(&tap.take())[0];
    let decoded = GetConfigReply::decode(&reply.payload).unwrap();
    assert_eq!(decoded.data, &[0x84, 0x03]);

    assert!(wait_until(|| sink.events().len() == 2));
    assert!(rx.sink().events().is_empty());
}

#[test]
fn message_arriving_while_worker_busy_is_dropped() {
    // No worker draining the channel: the first message occupies it.
    let channel = MessageChannel::new();
    let sink = RecordingSink::default();
    let mut rx = ReceivePath::new(&channel, &LinkConfig::default(), sink.clone());

    let connect = encode_message(Command::Connect, &[]).unwrap();
    let get = encode_message(Command::GetConfig, &GetConfigRequest::encode(ConfigKey::KEYMAP, 64))
        .unwrap();
    assert!(rx.on_frame(&connect[0]));
    assert!(!rx.on_frame(&get[0]));

    assert_eq!(sink.events(), vec![LinkEvent::WorkerBusy { cmd: 0x12 }]);
    assert_eq!(channel.try_receive().unwrap().command(), Some(Command::Connect));
}

#[test]
fn out_of_order_chunk_drops_message_and_recovers() {
    let channel = MessageChannel::new();
    let sink = RecordingSink::default();
    let mut rx = ReceivePath::new(&channel, &LinkConfig::default(), sink.clone());

    let frames = encode_message(Command::SetConfig, &[0x11; 100]).unwrap();
    rx.on_frame(&frames[0]);
    rx.on_frame(&frames[1]);
    rx.on_frame(&frames[3]);
    assert!(!rx.in_progress());
    assert_eq!(
        sink.events(),
        vec![LinkEvent::MessageDropped(ProtocolError::OutOfOrder {
            expected: 48,
            got: 72
        })]
    );

    // Remaining frames of the broken message are rejected one by one.
    assert!(!rx.on_frame(&frames[4]));

    let fresh = encode_message(Command::Connect, &[]).unwrap();
    assert!(rx.on_frame(&fresh[0]));
}

#[test]
fn overrunning_chunk_never_grows_the_message() {
    let channel = MessageChannel::new();
    let sink = RecordingSink::default();
    let mut rx = ReceivePath::new(&channel, &LinkConfig::default(), sink.clone());

    let first = MessageHeader::new(Command::SetConfig, 30, 0, 24);
    let overrun = MessageHeader::new(Command::SetConfig, 30, 24, 24);
    rx.on_frame(&encode_frame(&first, &[0; 24]));
    rx.on_frame(&encode_frame(&overrun, &[0; 24]));

    assert!(channel.is_empty());
    assert_eq!(
        sink.last(),
        Some(LinkEvent::MessageDropped(ProtocolError::ChunkOverrun {
            offset: 24,
            size: 24
        }))
    );
}

#[test]
fn oversized_message_is_refused_up_front() {
    let channel = MessageChannel::new();
    let sink = RecordingSink::default();
    let config = LinkConfig {
        max_message_size: 600,
        ..LinkConfig::default()
    };
    let mut rx = ReceivePath::new(&channel, &config, sink.clone());

    let frames = encode_message(Command::SetConfig, &[0; 700]).unwrap();
    rx.on_frame(&frames[0]);
    assert_eq!(
        sink.last(),
        Some(LinkEvent::MessageDropped(ProtocolError::MessageTooLarge {
            size: 700,
            limit: 600
        }))
    );
}
