//! Messages into the reducer and commands out of it.
//!
//! Inbound transport frames are parsed into [`DashboardMsg`] values here, once,
//! with the same leniency as the model: unexpected shapes become "absent"
//! rather than errors. Side-effects the reducer wants performed are described
//! as [`StoreCmd`] values and executed by the store.

use std::time::Duration;

use serde_json::{Map, Value};

use super::model::{opt_string, present, truthy};
use crate::logger::jsonl::EventType;
use crate::transport::events;

// ──────────────────── messages ────────────────────

/// Everything that can drive a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardMsg {
    /// Transport connected with the given session id.
    Connect { session_id: String },
    /// Transport is attempting to reconnect.
    Reconnecting,
    /// Transport dropped. Menu and toasts are left as they are.
    Disconnect,
    /// Full menu/config replacement.
    FullRefresh(FullRefresh),
    /// Server finished replaying state.
    ReplayDone,
    /// Per-control patch and/or tab/group directives.
    ControlUpdate(ControlUpdate),
    /// Raw toast payload; parsed by the reducer so it can assign fallback ids.
    Toast(Value),
    /// Audio/TTS side channel. Does not touch state.
    Audio(AudioEvent),
    /// User picked a tab.
    SelectTab(usize),
    /// User dismissed a toast.
    DismissToast(String),
    /// A toast's display time elapsed.
    ToastExpired(String),
    /// Inbound event nobody handles.
    Ignored { event: String },
}

impl DashboardMsg {
    /// Parse a named inbound transport event.
    #[must_use]
    pub fn from_event(event: &str, payload: &Value) -> Self {
        match event {
            events::CONNECT => Self::Connect {
                session_id: session_id_from(payload),
            },
            events::RECONNECTING => Self::Reconnecting,
            events::DISCONNECT => Self::Disconnect,
            events::FULL_REFRESH => Self::FullRefresh(FullRefresh::from_value(payload)),
            events::REPLAY_DONE => Self::ReplayDone,
            events::CONTROL => Self::ControlUpdate(ControlUpdate::from_value(payload)),
            events::TOAST => Self::Toast(payload.clone()),
            events::AUDIO => Self::Audio(AudioEvent::from_value(payload)),
            other => Self::Ignored {
                event: other.to_owned(),
            },
        }
    }
}

fn session_id_from(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        Value::Object(obj) => opt_string(obj.get("id").or_else(|| obj.get("socketid")))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

// ──────────────────── full refresh ────────────────────

/// Full-state payload. `None` fields were absent or malformed and leave the
/// previous value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullRefresh {
    pub menu: Option<Vec<Value>>,
    pub globals: Option<Vec<Value>>,
    pub site: Option<Value>,
    pub theme: Option<Value>,
    pub locales: Option<Value>,
    pub lang: Option<Value>,
}

impl FullRefresh {
    #[must_use]
    pub fn from_value(payload: &Value) -> Self {
        let Some(obj) = payload.as_object() else {
            return Self::default();
        };
        Self {
            menu: obj.get("menu").and_then(Value::as_array).cloned(),
            globals: obj.get("globals").and_then(Value::as_array).cloned(),
            site: present(obj.get("site")).cloned(),
            theme: present(obj.get("theme")).cloned(),
            locales: present(obj.get("locales")).cloned(),
            lang: present(obj.get("lang")).cloned(),
        }
    }
}

// ──────────────────── control update ────────────────────

/// Id-targeted control change.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPatch {
    /// Shallow-merge `patch` onto the control.
    Merge { id: Value, patch: Map<String, Value> },
    /// Replace a selection widget's options.
    Options {
        id: Value,
        options: Value,
        /// `value ?? payload`; `None` leaves the current value alone.
        value: Option<Value>,
        reset_selection: bool,
    },
}

impl ControlPatch {
    #[must_use]
    pub fn id(&self) -> &Value {
        match self {
            Self::Merge { id, .. } | Self::Options { id, .. } => id,
        }
    }
}

/// Tab show/hide/enable/disable lists, keyed by tab display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabVisibility {
    pub show: Vec<String>,
    pub hide: Vec<String>,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

/// Group show/hide/collapse/expand lists, keyed by composite group key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupVisibility {
    pub show: Vec<String>,
    pub hide: Vec<String>,
    pub collapse: Vec<String>,
    pub expand: Vec<String>,
}

/// Tab navigation directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabTarget {
    /// Absolute index.
    Index(usize),
    /// `"+1"` / `"-1"`.
    Step(isize),
    /// Select by `header` or `name`.
    Name(String),
    /// Empty string: deliberate no-op.
    Refresh,
}

impl TabTarget {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(f64_to_u64))
                .and_then(|i| usize::try_from(i).ok())
                .map(Self::Index),
            Value::String(s) => Some(match s.as_str() {
                "" => Self::Refresh,
                "+1" => Self::Step(1),
                "-1" => Self::Step(-1),
                name => Self::Name(name.to_owned()),
            }),
            _ => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn f64_to_u64(f: f64) -> u64 {
    f as u64
}

/// All directives one control-update payload may carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlUpdate {
    pub patch: Option<ControlPatch>,
    pub tabs: Option<TabVisibility>,
    pub group: Option<GroupVisibility>,
    pub tab: Option<TabTarget>,
}

impl ControlUpdate {
    #[must_use]
    pub fn from_value(payload: &Value) -> Self {
        let Some(obj) = payload.as_object() else {
            return Self::default();
        };
        Self {
            patch: parse_patch(obj),
            tabs: obj
                .get("tabs")
                .and_then(Value::as_object)
                .map(|t| TabVisibility {
                    show: names(t.get("show")),
                    hide: names(t.get("hide")),
                    enable: names(t.get("enable")),
                    disable: names(t.get("disable")),
                }),
            group: obj
                .get("group")
                .and_then(Value::as_object)
                .map(|g| GroupVisibility {
                    show: names(g.get("show")),
                    hide: names(g.get("hide")),
                    collapse: names(g.get("collapse")),
                    expand: names(g.get("expand")),
                }),
            tab: obj.get("tab").and_then(TabTarget::from_value),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patch.is_none() && self.tabs.is_none() && self.group.is_none() && self.tab.is_none()
    }
}

fn parse_patch(obj: &Map<String, Value>) -> Option<ControlPatch> {
    let id = present(obj.get("id"))?.clone();
    if let Some(patch) = obj.get("control").and_then(Value::as_object) {
        return Some(ControlPatch::Merge {
            id,
            patch: patch.clone(),
        });
    }
    let options = present(obj.get("options"))?.clone();
    let value = present(obj.get("value"))
        .or_else(|| present(obj.get("payload")))
        .cloned();
    let reset_selection = truthy(present(obj.get("resetSearch")).or_else(|| obj.get("resetSelection")));
    Some(ControlPatch::Options {
        id,
        options,
        value,
        reset_selection,
    })
}

/// String list; a bare string counts as a one-element list, non-strings are skipped.
fn names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

// ──────────────────── audio ────────────────────

/// Where playable audio comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Url(String),
    Bytes(Vec<u8>),
}

/// Speech synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Option<String>,
    pub lang: Option<String>,
}

/// Audio/TTS side-channel event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    Speak(SpeechRequest),
    Play(AudioSource),
    Stop,
    /// Payload carried nothing playable.
    Empty,
}

impl AudioEvent {
    #[must_use]
    pub fn from_value(payload: &Value) -> Self {
        let Some(obj) = payload.as_object() else {
            return Self::Empty;
        };
        if let Some(text) = obj.get("tts").and_then(Value::as_str) {
            return Self::Speak(SpeechRequest {
                text: text.to_owned(),
                voice: opt_string(obj.get("voice")),
                lang: opt_string(obj.get("lang")),
            });
        }
        if let Some(source) = obj.get("audio").and_then(audio_source) {
            return Self::Play(source);
        }
        if truthy(obj.get("reset")) {
            return Self::Stop;
        }
        Self::Empty
    }
}

fn audio_source(value: &Value) -> Option<AudioSource> {
    match value {
        Value::String(url) if !url.is_empty() => Some(AudioSource::Url(url.clone())),
        Value::Array(items) => bytes(items).map(AudioSource::Bytes),
        // Node-style serialized buffer: {"type": "Buffer", "data": [...]}
        Value::Object(obj) => obj
            .get("data")
            .and_then(Value::as_array)
            .and_then(|items| bytes(items))
            .map(AudioSource::Bytes),
        _ => None,
    }
}

fn bytes(items: &[Value]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

// ──────────────────── commands ────────────────────

/// Durable-store writes requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOp {
    /// Tab flags are always stored explicitly as `"true"`/`"false"`.
    TabFlags {
        index: usize,
        name: String,
        hidden: bool,
        disabled: bool,
    },
    /// `true` stores `"true"`, `false` deletes the key.
    GroupHidden { key: String, hidden: bool },
    /// `true` stores `"true"`, `false` deletes the key.
    GroupCollapsed { key: String, collapsed: bool },
}

/// Structured note for the activity journal. The store stamps the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalNote {
    pub event: EventType,
    pub tab_index: Option<usize>,
    pub control_id: Option<String>,
    pub toast_id: Option<String>,
    pub details: Option<String>,
}

impl JournalNote {
    #[must_use]
    pub fn new(event: EventType) -> Self {
        Self {
            event,
            tab_index: None,
            control_id: None,
            toast_id: None,
            details: None,
        }
    }
}

/// Side-effects returned by the update function for the store to execute.
///
/// The update function never performs I/O directly, keeping the state machine
/// deterministic and testable.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCmd {
    /// No side-effect.
    None,
    /// Execute multiple commands in order.
    Batch(Vec<Self>),
    /// Write to the durable key-value store.
    Persist(PersistOp),
    /// Arm (or re-arm) the expiry timer for a toast.
    ScheduleToastExpiry { id: String, after: Duration },
    /// Send an event to the server through the transport.
    Emit { event: String, payload: Value },
    /// Update the `#/<index>` fragment.
    SetRoute(String),
    /// Speak text.
    Speak(SpeechRequest),
    /// Play an audio clip.
    PlayAudio(AudioSource),
    /// Stop any speech or audio.
    StopAudio,
    /// Append to the activity journal.
    Journal(JournalNote),
}

impl StoreCmd {
    /// Collapse a list into the smallest equivalent command.
    #[must_use]
    pub fn batch(mut cmds: Vec<Self>) -> Self {
        cmds.retain(|c| !matches!(c, Self::None));
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Flatten nested batches into execution order.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}
