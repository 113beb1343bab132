//! View model for the dashboard.
//!
//! All display state lives in [`DashboardState`]. The server pushes a menu of
//! tabs ([`MenuItem`]), each holding groups ([`Group`]) of controls
//! ([`Control`]). Parsing from wire JSON is lenient: a field with the wrong
//! shape is treated as absent, never as a failure.
//!
//! **Design invariant:** the model is plain data. No I/O happens here.

use serde::Serialize;
use serde_json::{Map, Value};

use super::widget::WidgetKind;

// ──────────────────── connection ────────────────────

/// Transport connection phase. Anything but `Ready` shows a loading placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Ready,
}

impl ConnectionState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
        }
    }
}

// ──────────────────── lenient field access ────────────────────

/// Truthiness of a loosely-typed flag as the server sends it.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

pub(crate) fn opt_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_owned)
}

/// Non-null value, treating JSON `null` like an absent field.
pub(crate) fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn extra_fields(obj: &Map<String, Value>, known: &[&str]) -> Map<String, Value> {
    obj.iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

// ──────────────────── control ────────────────────

/// A single widget instance: an opaque key/value bag.
///
/// The core only reads `id` (patch targeting) and `type` (widget kind);
/// everything else belongs to the widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Control(Map<String, Value>);

impl Control {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from wire JSON. Non-objects are not controls.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|obj| Self(obj.clone()))
    }

    /// Control id; `null` counts as no id.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        present(self.0.get("id"))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_owned(), value);
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Shallow merge: patch fields overwrite, fields absent from the patch are kept.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Widget kind resolved from the `type` field.
    #[must_use]
    pub fn kind(&self) -> WidgetKind {
        self.0
            .get("type")
            .and_then(Value::as_str)
            .map_or(WidgetKind::Unknown(String::new()), WidgetKind::parse)
    }
}

// ──────────────────── groups ────────────────────

/// Per-group display flags pushed by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupConfig {
    pub hidden: bool,
    pub collapsed: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GroupConfig {
    fn from_value(value: Option<&Value>) -> Self {
        value.and_then(Value::as_object).map_or_else(Self::default, |obj| Self {
            hidden: truthy(obj.get("hidden")),
            collapsed: truthy(obj.get("collapsed")),
            extra: extra_fields(obj, &["hidden", "collapsed"]),
        })
    }
}

/// Group header: name, optional id, and display config.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub config: GroupConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GroupHeader {
    fn from_value(value: Option<&Value>) -> Self {
        value.and_then(Value::as_object).map_or_else(Self::default, |obj| Self {
            name: opt_string(obj.get("name")),
            id: present(obj.get("id")).cloned(),
            config: GroupConfig::from_value(obj.get("config")),
            extra: extra_fields(obj, &["name", "id", "config"]),
        })
    }
}

/// A named cluster of controls within a tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Group {
    pub header: GroupHeader,
    pub items: Vec<Control>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            header: GroupHeader::from_value(obj.get("header")),
            items: parse_list(obj.get("items"), Control::from_value),
            extra: extra_fields(obj, &["header", "items"]),
        })
    }

    /// Group name used in composite keys (`header.name`, else empty).
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.header.name.as_deref().unwrap_or("")
    }
}

// ──────────────────── tabs ────────────────────

/// A top-level navigable tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MenuItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub items: Vec<Group>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub disabled: bool,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MenuItem {
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            id: present(obj.get("id")).cloned(),
            header: opt_string(obj.get("header")),
            name: opt_string(obj.get("name")),
            items: parse_list(obj.get("items"), Group::from_value),
            link: opt_string(obj.get("link")),
            disabled: truthy(obj.get("disabled")),
            hidden: truthy(obj.get("hidden")),
            theme: present(obj.get("theme")).cloned(),
            extra: extra_fields(
                obj,
                &[
                    "id", "header", "name", "items", "link", "disabled", "hidden", "theme",
                ],
            ),
        })
    }

    /// Human-readable tab name: `header`, else `name`, else empty.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.header
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("")
    }

    /// Whether automatic tab selection may land on this tab.
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        !self.hidden && !self.disabled
    }

    /// Matches navigation by `header` or `name`.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.header.as_deref() == Some(name) || self.name.as_deref() == Some(name)
    }
}

/// Parse a JSON array, silently skipping malformed entries.
pub(crate) fn parse_list<T>(value: Option<&Value>, parse: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse).collect())
        .unwrap_or_default()
}

// ──────────────────── toasts ────────────────────

/// Toast severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl ToastLevel {
    /// Parse a level string; unknown levels fall back to `Info`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// A timed notification. At most one toast per id is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastMessage {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub level: ToastLevel,
    /// Milliseconds until auto-dismiss; `<= 0` means persistent.
    pub display_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl ToastMessage {
    /// Build a toast from an inbound payload.
    ///
    /// `fallback_id` is used when the payload carries no usable id; numeric
    /// ids are stringified. Returns `None` for non-object payloads.
    #[must_use]
    pub fn from_value(value: &Value, fallback_id: &str, default_display_ms: i64) -> Option<Self> {
        let obj = value.as_object()?;
        let id = match present(obj.get("id")) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => fallback_id.to_owned(),
        };
        let display_time = present(obj.get("displayTime"))
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(float_millis)))
            .unwrap_or(default_display_ms);
        Some(Self {
            id,
            title: text_field(obj.get("title")),
            message: text_field(obj.get("message")),
            level: obj
                .get("level")
                .and_then(Value::as_str)
                .map(ToastLevel::parse)
                .unwrap_or_default(),
            display_time,
            class_name: opt_string(obj.get("className")),
        })
    }

    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.display_time <= 0
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_millis(ms: f64) -> i64 {
    if ms.is_finite() { ms.round() as i64 } else { 0 }
}

/// Strings pass through; numbers and booleans are rendered as text.
fn text_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        _ => None,
    }
}

// ──────────────────── root state ────────────────────

/// Complete dashboard view state.
///
/// The store replaces this value wholesale on every transition; readers holding
/// an older snapshot never observe a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub connection: ConnectionState,
    /// Transport session identity; empty until connected.
    pub socket_id: String,
    /// Tabs in server-declared order. Index is the addressing scheme.
    pub menu: Vec<MenuItem>,
    /// Controls not tied to a tab.
    pub globals: Vec<Value>,
    pub site: Value,
    pub theme: Value,
    pub locales: Value,
    pub lang: Value,
    /// Always indexes an existing `menu` entry when set.
    pub selected_tab_index: Option<usize>,
    pub replay_done: bool,
    pub toasts: Vec<ToastMessage>,
    /// Counter for ids of toasts that arrive without one.
    #[serde(skip)]
    pub next_toast_seq: u64,
}

impl DashboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The tab at `selected_tab_index`, if any.
    #[must_use]
    pub fn selected_tab(&self) -> Option<&MenuItem> {
        self.selected_tab_index.and_then(|i| self.menu.get(i))
    }

    /// Whether a loading placeholder replaces content.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.connection != ConnectionState::Ready
    }

    /// First control anywhere in the tree with the given id.
    #[must_use]
    pub fn find_control(&self, id: &Value) -> Option<&Control> {
        self.menu
            .iter()
            .flat_map(|tab| &tab.items)
            .flat_map(|group| &group.items)
            .find(|control| control.id() == Some(id))
    }

    /// Live toast by id.
    #[must_use]
    pub fn toast(&self, id: &str) -> Option<&ToastMessage> {
        self.toasts.iter().find(|t| t.id == id)
    }
}

// ──────────────────── tests ────────────────────
