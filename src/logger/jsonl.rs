//! Activity journal: one JSON object per line for every dashboard transition
//! and every failed edge operation (storage, transport).
//!
//! Journaling is a debugging aid for the embedder and must never disturb the
//! store. A failing file demotes the sink to stderr, and a failing stderr
//! closes it. Nothing here returns an error to the caller.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DashError, Result};

/// Severity level for journal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Journal event types matching the dashboard activity model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Connect,
    Disconnect,
    FullRefresh,
    ReplayDone,
    ControlPatch,
    PatchDropped,
    TabVisibility,
    TabNavigation,
    GroupVisibility,
    Toast,
    ToastDismissed,
    Audio,
    TabSelected,
    Emit,
    StorageError,
    TransportError,
    Error,
}

/// A single JSONL journal entry. All fields are optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Event type identifier.
    pub event: EventType,
    /// Severity level.
    pub severity: Severity,
    /// Transport session id at the time of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Selected or targeted tab index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_index: Option<usize>,
    /// Targeted control id, rendered as JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_id: Option<String>,
    /// Durable-store key or outbound event name involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Toast id involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast_id: Option<String>,
    /// DSH error code if an edge operation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: now_rfc3339(),
            event,
            severity,
            session: None,
            tab_index: None,
            control_id: None,
            key: None,
            toast_id: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    /// Attach an edge-operation failure.
    #[must_use]
    pub fn with_error(mut self, err: &DashError) -> Self {
        self.error_code = Some(err.code().to_string());
        self.error_message = Some(err.to_string());
        self
    }

    /// Attach the storage key or event name involved.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach free-form context, e.g. which flush failed.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Journal file location and roll-over size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalConfig {
    pub path: PathBuf,
    /// Once the file would grow past this, it is moved to `<path>.1` (replacing
    /// any previous one) and a fresh file is started.
    pub max_bytes: u64,
}

impl JournalConfig {
    pub const DEFAULT_MAX_BYTES: u64 = 4 * 1024 * 1024;

    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: Self::DEFAULT_MAX_BYTES,
        }
    }
}

#[derive(Debug)]
enum Sink {
    File { out: BufWriter<File>, len: u64 },
    Stderr,
    Closed,
}

/// Best-effort line writer for [`LogEntry`] values.
#[derive(Debug)]
pub struct JsonlWriter {
    config: JournalConfig,
    sink: Sink,
}

impl JsonlWriter {
    /// Open (or create) the journal file. An unusable path starts on stderr.
    pub fn open(config: JournalConfig) -> Self {
        let sink = match open_append(&config.path) {
            Ok(sink) => sink,
            Err(err) => {
                eprintln!("[DASHPANEL-JOURNAL] {err}; journaling to stderr");
                Sink::Stderr
            }
        };
        Self { config, sink }
    }

    /// Where lines currently go: `"file"`, `"stderr"` or `"closed"`.
    #[must_use]
    pub const fn sink_name(&self) -> &'static str {
        match self.sink {
            Sink::File { .. } => "file",
            Sink::Stderr => "stderr",
            Sink::Closed => "closed",
        }
    }

    /// Append one entry as a single `write_all`, so a tailing reader never
    /// sees half a line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let Ok(mut line) = serde_json::to_string(entry) else {
            return;
        };
        line.push('\n');

        if let Sink::File { len, .. } = &self.sink
            && len.saturating_add(line.len() as u64) > self.config.max_bytes
        {
            self.roll_over();
        }
        if self.emit(&line).is_err() {
            self.demote();
            if self.emit(&line).is_err() {
                self.demote();
            }
        }
    }

    pub fn flush(&mut self) {
        let flushed = match &mut self.sink {
            Sink::File { out, .. } => out.flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::Closed => Ok(()),
        };
        if flushed.is_err() {
            self.demote();
        }
    }

    fn emit(&mut self, line: &str) -> io::Result<()> {
        match &mut self.sink {
            Sink::File { out, len } => {
                out.write_all(line.as_bytes())?;
                *len += line.len() as u64;
                Ok(())
            }
            Sink::Stderr => write!(io::stderr(), "[DASHPANEL-JOURNAL] {line}"),
            Sink::Closed => Ok(()),
        }
    }

    fn demote(&mut self) {
        self.sink = match self.sink {
            Sink::File { .. } => {
                eprintln!(
                    "[DASHPANEL-JOURNAL] write to {} failed; journaling to stderr",
                    self.config.path.display()
                );
                Sink::Stderr
            }
            Sink::Stderr | Sink::Closed => Sink::Closed,
        };
    }

    fn roll_over(&mut self) {
        if let Sink::File { out, .. } = &mut self.sink {
            let _ = out.flush();
        }
        let previous = rolled_path(&self.config.path);
        self.sink = match fs::rename(&self.config.path, &previous)
            .map_err(|source| DashError::io(&previous, source))
            .and_then(|()| open_append(&self.config.path))
        {
            Ok(sink) => sink,
            Err(err) => {
                eprintln!("[DASHPANEL-JOURNAL] roll-over failed: {err}; journaling to stderr");
                Sink::Stderr
            }
        };
    }
}

fn open_append(path: &Path) -> Result<Sink> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DashError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| DashError::io(path, source))?;
    let len = file.metadata().map_or(0, |m| m.len());
    Ok(Sink::File {
        out: BufWriter::new(file),
        len,
    })
}

/// `activity.jsonl` -> `activity.jsonl.1`.
fn rolled_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
