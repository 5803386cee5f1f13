//! Command dispatcher: executes one reassembled message against the field
//! registry and streams the reply.
//!
//! Runs on the dispatch worker only, one message end to end at a time.
//! Validation happens before any side effect, so a rejected message
//! leaves every field untouched and sends nothing.
//!
//! | cmd          | request                         | reply                      |
//! |--------------|---------------------------------|----------------------------|
//! | `CONNECT`    | empty                           | header-only `CONNECT`      |
//! | `SET_CONFIG` | key u16, size u16, save u8, data | none                      |
//! | `GET_CONFIG` | key u16, max_size u16           | key u16, size u16, data    |
//! | other        |                                 | rejected                   |

use std::sync::Arc;

use log::{debug, warn};

use super::chunked::Message;
use super::codec::{Command, GetConfigReply, GetConfigRequest, SetConfigRequest};
use super::transmit::ReplyTransmitter;
use super::transport::FrameTransport;
use crate::app::events::{LinkEvent, PersistOutcome};
use crate::app::ports::{EventSink, PersistencePort};
use crate::error::DispatchError;
use crate::registry::{ConfigField, ConfigKey, FieldRegistry};

/// Single-worker command dispatcher.
pub struct Dispatcher<P, T, E, const N: usize>
where
    P: PersistencePort,
    T: FrameTransport,
    E: EventSink,
{
    registry: Arc<FieldRegistry<P, N>>,
    transmitter: ReplyTransmitter<T>,
    sink: E,
}

impl<P, T, E, const N: usize> Dispatcher<P, T, E, N>
where
    P: PersistencePort,
    T: FrameTransport,
    E: EventSink,
{
    pub fn new(registry: Arc<FieldRegistry<P, N>>, transmitter: ReplyTransmitter<T>, sink: E) -> Self {
        Self {
            registry,
            transmitter,
            sink,
        }
    }

    /// Execute `msg` and report the outcome to the event sink.
    pub async fn dispatch(&mut self, msg: &Message) -> Result<LinkEvent, DispatchError> {
        let result = self.handle(msg).await;
        match &result {
            Ok(event) => self.sink.emit(event),
            Err(error) => {
                warn!("RPC: cmd=0x{:02X} failed: {}", msg.cmd(), error);
                self.sink.emit(&LinkEvent::MessageRejected {
                    cmd: msg.cmd(),
                    error: *error,
                });
            }
        }
        result
    }

    /// Execute `msg` without reporting.
    pub async fn handle(&mut self, msg: &Message) -> Result<LinkEvent, DispatchError> {
        match msg.command() {
            Some(Command::Connect) => {
                self.transmitter.send(Command::Connect, &[]).await?;
                Ok(LinkEvent::Connected)
            }
            Some(Command::SetConfig) => self.set_config(&msg.payload),
            Some(Command::GetConfig) => self.get_config(&msg.payload).await,
            Some(Command::Invalid) | None => Err(DispatchError::InvalidCommand(msg.cmd())),
        }
    }

    fn set_config(&self, payload: &[u8]) -> Result<LinkEvent, DispatchError> {
        let req = SetConfigRequest::decode(payload)?;
        let field = self.lookup(req.key)?;
        if req.declared_size != field.size() {
            return Err(DispatchError::SizeMismatch {
                key: req.key,
                declared: req.declared_size,
                defined: field.size(),
            });
        }

        field.lock().copy_from_slice(req.data);

        let persist = if req.save && field.is_saveable() {
            match self.registry.write(req.key) {
                Ok(()) => PersistOutcome::Saved,
                Err(e) => {
                    warn!("RPC: {} updated but not saved: {}", req.key, e);
                    PersistOutcome::Failed
                }
            }
        } else {
            PersistOutcome::NotRequested
        };

        field.notify_updated();
        debug!("RPC: SET {} ({} bytes, {:?})", req.key, req.data.len(), persist);
        Ok(LinkEvent::FieldUpdated {
            key: req.key,
            persist,
        })
    }

    async fn get_config(&mut self, payload: &[u8]) -> Result<LinkEvent, DispatchError> {
        let req = GetConfigRequest::decode(payload)?;
        let field = self.lookup(req.key)?;
        if field.size() > req.max_size {
            return Err(DispatchError::TooLarge {
                key: req.key,
                max: req.max_size,
                defined: field.size(),
            });
        }

        let reply = field.with_value(|data| GetConfigReply::encode(req.key, data));
        let frames = self.transmitter.send(Command::GetConfig, &reply).await?;
        debug!("RPC: GET {} ({} bytes in {} frames)", req.key, reply.len(), frames);
        Ok(LinkEvent::FieldSent {
            key: req.key,
            frames,
        })
    }

    fn lookup(&self, key: ConfigKey) -> Result<Arc<ConfigField>, DispatchError> {
        self.registry
            .get(key)
            .cloned()
            .ok_or(DispatchError::NotFound(key))
    }

    pub fn registry(&self) -> &Arc<FieldRegistry<P, N>> {
        &self.registry
    }

    pub fn transmitter(&self) -> &ReplyTransmitter<T> {
        &self.transmitter
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }
}

// ── Tests ────────────────────────────────────────────────────
