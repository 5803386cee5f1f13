//! BoardPilot host simulator.
//!
//! Runs the device side of the configuration link against a loopback
//! transport and an in-memory flash, and plays a companion session
//! against it.
//!
//! ```text
//! boardpilot-sim [link.json] [flash.img]
//! ```
//!
//! `link.json` is an optional [`LinkConfig`]; `flash.img` is loaded if it
//! exists and written back on exit, so saved fields survive between runs.
//!
//! ```text
//! ┌──────────────┐ frames ┌─────────────┐ Message ┌──────────────────┐
//! │ companion    │───────▶│ ReceivePath │────────▶│ worker thread    │
//! │ (this main)  │        └─────────────┘         │ Dispatcher       │
//! │              │◀───────── FrameTap ◀───────────│ Loopback + gate  │
//! └──────────────┘                                └──────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use boardpilot::adapters::log_sink::LogEventSink;
use boardpilot::adapters::loopback::{FrameTap, Loopback};
use boardpilot::adapters::nvs::MemoryStore;
use boardpilot::config::{DEFAULT_MAX_FIELDS, LinkConfig};
use boardpilot::error::Error;
use boardpilot::keymap::{self, BehaviorBinding};
use boardpilot::registry::{ConfigKey, FieldBinding, FieldRegistry};
use boardpilot::rpc::channels::MESSAGE_CHANNEL;
use boardpilot::rpc::chunked::{Ingest, Message, Reassembler};
use boardpilot::rpc::codec::{
    Command, GetConfigReply, GetConfigRequest, SetConfigRequest, encode_message,
};
use boardpilot::rpc::engine::Dispatcher;
use boardpilot::rpc::io_task::{self, ReceivePath};
use boardpilot::rpc::transmit::{FrameGate, ReplyTransmitter};

type Registry = FieldRegistry<MemoryStore, DEFAULT_MAX_FIELDS>;

const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(Path::new(&path))?,
        None => LinkConfig::default(),
    };
    config.validate().map_err(Error::from)?;
    let image_path = args.next();

    let store = match &image_path {
        Some(path) if Path::new(path).exists() => {
            let image = std::fs::read(path).with_context(|| format!("reading {path}"))?;
            MemoryStore::from_image(&image).map_err(Error::from)?
        }
        _ => MemoryStore::new(),
    };

    let registry = Arc::new(bind_fields(store)?);
    info!(
        "SIM | {} fields bound ({} slots)",
        registry.len(),
        registry.capacity()
    );

    // ── Device side ──────────────────────────────────────────
    let gate = Arc::new(FrameGate::new());
    let loopback = Loopback::new(Arc::clone(&gate));
    let tap = loopback.tap();
    let transmitter = ReplyTransmitter::new(loopback, gate, &config);
    let dispatcher = Dispatcher::new(Arc::clone(&registry), transmitter, LogEventSink::new());
    io_task::spawn(&MESSAGE_CHANNEL, dispatcher).context("spawning dispatch worker")?;

    let mut link = Companion {
        rx: ReceivePath::new(&MESSAGE_CHANNEL, &config, LogEventSink::new()),
        tap,
        max_message_size: config.max_message_size as usize,
    };

    // ── Companion session ────────────────────────────────────
    if link.request(Command::Connect, &[])?.is_none() {
        bail!("device did not answer CONNECT");
    }
    info!("SIM | link up");

    let timeout = link.get(ConfigKey::SLEEP_TIMEOUT)?;
    info!("SIM | sleep timeout = {} s", le_u16(&timeout));

    link.set(ConfigKey::SLEEP_TIMEOUT, true, &900u16.to_le_bytes())?;
    link.set(ConfigKey::MOUSE_SENSITIVITY, true, &[14])?;
    link.set(ConfigKey::DATETIME, false, &1_760_000_000u64.to_le_bytes())?;

    let sensitivity = link.get(ConfigKey::MOUSE_SENSITIVITY)?;
    info!("SIM | mouse sensitivity = {}", sensitivity[0]);

    let remap = keymap::to_record(
        &BehaviorBinding {
            device: "MO",
            param1: 2,
            param2: 0,
        },
        0,
        41,
    )
    .map_err(Error::from)?;
    let mut records = keymap::decode_records(&link.get(ConfigKey::KEYMAP)?).map_err(Error::from)?;
    records[0] = remap;
    link.set(ConfigKey::KEYMAP, true, &keymap::encode_records(&records))?;
    for record in keymap::decode_records(&link.get(ConfigKey::KEYMAP)?).map_err(Error::from)? {
        let binding = keymap::to_binding(&record).map_err(Error::from)?;
        info!(
            "SIM | layer {} pos {:>4}: {}({}, {})",
            record.layer(),
            record.position(),
            binding.device,
            binding.param1,
            binding.param2
        );
    }

    // USB reset halfway through a keymap write: the partial request is
    // discarded and the stored keymap is unchanged.
    let partial = SetConfigRequest::encode(ConfigKey::KEYMAP, true, &[0; 2 * 11]);
    link.interrupt(Command::SetConfig, &partial)?;
    if keymap::decode_records(&link.get(ConfigKey::KEYMAP)?).map_err(Error::from)?[0] != remap {
        bail!("keymap changed by an interrupted write");
    }

    // Rejected requests: no reply, reported by the device's event sink.
    link.send(Command::GetConfig, &GetConfigRequest::encode(ConfigKey::DATETIME, 4))?;
    link.send(Command::GetConfig, &GetConfigRequest::encode(ConfigKey(0x0BAD), 16))?;
    link.send(
        Command::SetConfig,
        &SetConfigRequest::encode(ConfigKey::MOUSE_SENSITIVITY, false, &[1, 2]),
    )?;
    link.send(Command::Invalid, &[])?;

    if let Some(path) = image_path {
        let image = registry
            .with_store(|s| s.to_image())
            .map_err(Error::from)?;
        std::fs::write(&path, image).with_context(|| format!("writing {path}"))?;
        info!("SIM | flash image saved to {}", path);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<LinkConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn bind_fields(store: MemoryStore) -> Result<Registry> {
    let mut registry = Registry::new(store);

    registry
        .bind(
            FieldBinding::new(ConfigKey::SLEEP_TIMEOUT, &600u16.to_le_bytes())
                .saveable()
                .on_update(|f| info!("APP | sleep timeout now {} s", f.with_value(le_u16))),
        )
        .map_err(Error::from)?;
    registry
        .bind(
            FieldBinding::new(ConfigKey::MOUSE_SENSITIVITY, &[10])
                .saveable()
                .on_update(|f| info!("APP | mouse sensitivity now {}", f.snapshot()[0])),
        )
        .map_err(Error::from)?;
    registry
        .bind(FieldBinding::new(ConfigKey::DATETIME, &[0; 8]).device("rtc"))
        .map_err(Error::from)?;

    let defaults = [
        keymap::ConfigBinding {
            key: 40 << 4,
            device: keymap::Behavior::KeyPress.id(),
            param1: 0x2C,
            param2: 0,
        },
        keymap::ConfigBinding {
            key: (12 << 4) | 1,
            device: keymap::Behavior::Trans.id(),
            param1: 0,
            param2: 0,
        },
    ];
    registry
        .bind(FieldBinding::new(ConfigKey::KEYMAP, &keymap::encode_records(&defaults)).saveable())
        .map_err(Error::from)?;

    Ok(registry)
}

fn le_u16(bytes: &[u8]) -> u16 {
    match bytes {
        [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
        _ => 0,
    }
}

/// Companion end of the simulated link.
struct Companion<'c> {
    rx: ReceivePath<'c, LogEventSink>,
    tap: FrameTap,
    max_message_size: usize,
}

impl Companion<'_> {
    /// Deliver one request and wait until the worker has taken it.
    fn send(&mut self, cmd: Command, payload: &[u8]) -> Result<()> {
        for frame in encode_message(cmd, payload).map_err(Error::from)? {
            self.rx.on_frame(&frame);
        }
        let deadline = Instant::now() + REPLY_TIMEOUT;
        while !MESSAGE_CHANNEL.is_empty() {
            if Instant::now() > deadline {
                bail!("worker did not take cmd=0x{:02X}", cmd.as_u8());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    /// Deliver only the first frame of a request, then reset the link.
    fn interrupt(&mut self, cmd: Command, payload: &[u8]) -> Result<()> {
        let frames = encode_message(cmd, payload).map_err(Error::from)?;
        if frames.len() < 2 {
            bail!("cmd=0x{:02X} fits one frame", cmd.as_u8());
        }
        self.rx.on_frame(&frames[0]);
        if !self.rx.in_progress() {
            bail!("first frame of cmd=0x{:02X} not accepted", cmd.as_u8());
        }
        self.rx.reset();
        info!("SIM | link reset, partial cmd=0x{:02X} dropped", cmd.as_u8());
        Ok(())
    }

    /// Send a request and collect its reply, if one arrives in time.
    fn request(&mut self, cmd: Command, payload: &[u8]) -> Result<Option<Message>> {
        self.send(cmd, payload)?;
        let mut reassembler = Reassembler::new(self.max_message_size);
        let deadline = Instant::now() + REPLY_TIMEOUT;
        while Instant::now() < deadline {
            for frame in self.tap.take() {
                match reassembler.ingest(&frame) {
                    Ingest::Incomplete => {}
                    Ingest::Complete(msg) => return Ok(Some(msg)),
                    Ingest::Error(e) => warn!("SIM | bad reply frame: {}", e),
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(None)
    }

    fn get(&mut self, key: ConfigKey) -> Result<Vec<u8>> {
        let request = GetConfigRequest::encode(key, u16::MAX);
        let Some(reply) = self.request(Command::GetConfig, &request)? else {
            bail!("no reply to GET {key}");
        };
        let reply = GetConfigReply::decode(&reply.payload).map_err(Error::from)?;
        if reply.key != key {
            bail!("GET {key} answered for {}", reply.key);
        }
        Ok(reply.data.to_vec())
    }

    fn set(&mut self, key: ConfigKey, save: bool, data: &[u8]) -> Result<()> {
        self.send(Command::SetConfig, &SetConfigRequest::encode(key, save, data))
    }
}
