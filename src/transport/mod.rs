//! Transport boundary: named events in, named events out.
//!
//! The wire itself belongs to someone else. This module only fixes the event
//! names, the frame shape, and the outbound contract ([`Transport`]).
//! [`TransportBridge`] stamps every outbound payload with the session id;
//! [`ChannelTransport`] is an in-process duplex built on bounded crossbeam
//! channels; [`parse_frames`] reads recorded `{event, payload}` JSON lines.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::{DashError, Result};

/// Inbound event names.
pub mod events {
    pub const CONNECT: &str = "connect";
    pub const RECONNECTING: &str = "reconnecting";
    pub const DISCONNECT: &str = "disconnect";
    pub const FULL_REFRESH: &str = "ui-controls";
    pub const REPLAY_DONE: &str = "ui-replay-done";
    pub const CONTROL: &str = "update-value";
    pub const TOAST: &str = "show-toast";
    pub const AUDIO: &str = "ui-audio";
}

/// Key under which the session id rides on every outbound payload.
pub const SESSION_FIELD: &str = "socketid";

/// Default bound for in-process channels.
pub const CHANNEL_CAPACITY: usize = 1024;

/// One named event with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    #[must_use]
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Outbound half of a transport.
pub trait Transport {
    fn send(&mut self, frame: Frame) -> Result<()>;
}

// ──────────────────── bridge ────────────────────

/// Session-aware sender. Outbound object payloads gain a `socketid` field;
/// anything else is wrapped as `{"payload": <value>, "socketid": <id>}`.
#[derive(Debug)]
pub struct TransportBridge<T> {
    inner: T,
    session_id: String,
}

impl<T: Transport> TransportBridge<T> {
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            session_id: String::new(),
        }
    }

    pub fn set_session(&mut self, session_id: &str) {
        session_id.clone_into(&mut self.session_id);
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Send `event` with the session id attached.
    pub fn emit(&mut self, event: &str, payload: Value) -> Result<()> {
        let payload = augment(payload, &self.session_id);
        self.inner.send(Frame::new(event, payload))
    }
}

fn augment(payload: Value, session_id: &str) -> Value {
    let mut obj = match payload {
        Value::Object(obj) => obj,
        other => {
            let mut wrapped = Map::new();
            wrapped.insert("payload".to_string(), other);
            wrapped
        }
    };
    obj.insert(
        SESSION_FIELD.to_string(),
        Value::String(session_id.to_owned()),
    );
    Value::Object(obj)
}

// ──────────────────── in-process channels ────────────────────

/// Client-side outbound sender over a bounded channel. Never blocks.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: Sender<Frame>,
}

impl Transport for ChannelTransport {
    fn send(&mut self, frame: Frame) -> Result<()> {
        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => DashError::Runtime {
                details: "outbound transport channel full".to_string(),
            },
            TrySendError::Disconnected(_) => DashError::ChannelClosed {
                component: "transport",
            },
        })
    }
}

/// Dashboard side of a duplex link.
#[derive(Debug)]
pub struct ClientEnd {
    pub transport: ChannelTransport,
    pub inbound: Receiver<Frame>,
}

/// Server (or test) side of a duplex link.
#[derive(Debug)]
pub struct ServerEnd {
    pub tx: Sender<Frame>,
    pub outbound: Receiver<Frame>,
}

impl ServerEnd {
    /// Push an inbound event to the dashboard.
    pub fn push(&self, event: &str, payload: Value) -> Result<()> {
        self.tx
            .send(Frame::new(event, payload))
            .map_err(|_| DashError::ChannelClosed {
                component: "transport",
            })
    }
}

/// Build a bounded duplex link.
#[must_use]
pub fn duplex(capacity: usize) -> (ClientEnd, ServerEnd) {
    let (in_tx, in_rx) = bounded(capacity);
    let (out_tx, out_rx) = bounded(capacity);
    (
        ClientEnd {
            transport: ChannelTransport { tx: out_tx },
            inbound: in_rx,
        },
        ServerEnd {
            tx: in_tx,
            outbound: out_rx,
        },
    )
}

/// Transport that keeps every frame it is asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    pub sent: Vec<Frame>,
}

impl Transport for RecordingTransport {
    fn send(&mut self, frame: Frame) -> Result<()> {
        self.sent.push(frame);
        Ok(())
    }
}

// ──────────────────── recorded frames ────────────────────

/// Parse newline-delimited frames. Blank lines are skipped; any other line
/// that is not a `{event, payload}` object fails with its 1-based line number.
pub fn parse_frames(bytes: &[u8]) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    let mut start = 0;
    let mut line_no = 0;
    let ends = memchr::memchr_iter(b'\n', bytes).chain(std::iter::once(bytes.len()));

    for end in ends {
        line_no += 1;
        let line = bytes[start..end].trim_ascii();
        start = end + 1;
        if line.is_empty() {
            continue;
        }
        let frame: Frame =
            serde_json::from_slice(line).map_err(|e| DashError::MalformedFrame {
                line: line_no,
                details: e.to_string(),
            })?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Read and parse a frame file.
pub fn load_frames(path: &Path) -> Result<Vec<Frame>> {
    let bytes = fs::read(path).map_err(|e| DashError::io(path, e))?;
    parse_frames(&bytes)
}
