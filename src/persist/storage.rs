//! Durable key-value storage for visibility flags.
//!
//! A flat string→string table, like browser local storage. Values are the
//! literal strings `"true"`/`"false"`, and an absent key is meaningful: it
//! means "default". [`VisibilityStore`] layers the flag write semantics on top
//! of any [`DurableStore`].
//!
//! # Persistence Strategy
//!
//! [`JsonFileStore`] keeps the table in memory and writes it atomically
//! (serialize → temp file → fsync → rename). Writes are debounced so a burst of
//! visibility toggles costs one save.
//!
//! # Error Philosophy
//!
//! Load errors fall back to an empty table. Write errors are returned to the
//! caller, which journals them and carries on: losing cross-session
//! persistence never affects in-memory state.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::keys::{group_collapsed_key, group_hidden_key, tab_disabled_key, tab_hidden_key};
use crate::core::errors::{DashError, Result};
use crate::state::msg::PersistOp;

const TRUE: &str = "true";
const FALSE: &str = "false";

/// Minimal durable key-value contract.
pub trait DurableStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    /// Persist buffered writes. `force` bypasses any debounce.
    fn flush(&mut self, _now: Instant, _force: bool) -> Result<()> {
        Ok(())
    }
}

impl<S: DurableStore + ?Sized> DurableStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn flush(&mut self, now: Instant, force: bool) -> Result<()> {
        (**self).flush(now, force)
    }
}

// ──────────────────── in-memory ────────────────────

/// Volatile store. Used in tests and when persistence is disabled by config.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage that refuses every call, like a browser with storage disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn error() -> DashError {
        DashError::StorageUnavailable {
            details: "durable storage is disabled".to_string(),
        }
    }
}

impl DurableStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Self::error())
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
        Err(Self::error())
    }

    fn remove(&mut self, _key: &str) -> Result<()> {
        Err(Self::error())
    }
}

// ──────────────────── file-backed ────────────────────

/// Load outcome from the persistence layer.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Successfully loaded. `skipped` counts non-string values that were dropped.
    Loaded { entries: usize, skipped: usize },
    /// File not found; normal on first launch. Starts empty.
    Missing,
    /// File exists but is corrupt or unparseable. Starts empty.
    Corrupt { details: String },
    /// I/O error reading the file. Starts empty.
    IoError { details: String },
}

impl LoadOutcome {
    /// Whether the load was successful (loaded or first-launch missing).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Loaded { .. } | Self::Missing)
    }
}

/// JSON-file store with debounced atomic writes.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    debounce: Duration,
    last_write: Option<Instant>,
    pending: bool,
}

impl JsonFileStore {
    /// Open the store at `path`, reading whatever is there.
    ///
    /// Never fails: unreadable files start an empty table and are reported
    /// through the returned [`LoadOutcome`].
    #[must_use]
    pub fn open(path: PathBuf, debounce: Duration) -> (Self, LoadOutcome) {
        let (entries, outcome) = load(&path);
        (
            Self {
                path,
                entries,
                debounce,
                last_write: None,
                pending: false,
            },
            outcome,
        )
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a save is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

impl DurableStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.entries.get(key).map(String::as_str) != Some(value) {
            self.entries.insert(key.to_owned(), value.to_owned());
            self.pending = true;
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.pending = true;
        }
        Ok(())
    }

    fn flush(&mut self, now: Instant, force: bool) -> Result<()> {
        if !self.pending {
            return Ok(());
        }
        if !force
            && let Some(last) = self.last_write
            && now.saturating_duration_since(last) < self.debounce
        {
            return Ok(()); // Too soon.
        }

        self.pending = false;
        self.last_write = Some(now);
        save(&self.entries, &self.path).map_err(|source| DashError::io(&self.path, source))
    }
}

fn load(path: &Path) -> (BTreeMap<String, String>, LoadOutcome) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return (BTreeMap::new(), LoadOutcome::Missing);
        }
        // Binary garbage / invalid UTF-8 is corrupt content, not an I/O error.
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            return (
                BTreeMap::new(),
                LoadOutcome::Corrupt {
                    details: format!("{e}"),
                },
            );
        }
        Err(e) => {
            return (
                BTreeMap::new(),
                LoadOutcome::IoError {
                    details: format!("{e}"),
                },
            );
        }
    };

    let raw: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(&content) {
        Ok(map) => map,
        Err(e) => {
            return (
                BTreeMap::new(),
                LoadOutcome::Corrupt {
                    details: format!("{e}"),
                },
            );
        }
    };

    let mut skipped = 0;
    let mut entries = BTreeMap::new();
    for (key, value) in raw {
        match value {
            serde_json::Value::String(s) => {
                entries.insert(key, s);
            }
            _ => skipped += 1,
        }
    }
    let outcome = LoadOutcome::Loaded {
        entries: entries.len(),
        skipped,
    };
    (entries, outcome)
}

/// Atomic save: serialize → temp file → fsync → rename.
fn save(entries: &BTreeMap<String, String>, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    // Same directory keeps the rename on one filesystem.
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)
}

// ──────────────────── visibility flags ────────────────────

/// Persisted tab flags as read back for bootstrap. `None` means never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabFlags {
    pub hidden: Option<bool>,
    pub disabled: Option<bool>,
}

/// Visibility-flag persistence over a [`DurableStore`].
///
/// Tabs store explicit `"true"`/`"false"`; groups store `"true"` or delete the
/// key. The asymmetry is kept exactly for compatibility with preferences
/// already on disk; new flags should not copy the group convention.
#[derive(Debug)]
pub struct VisibilityStore<S> {
    inner: S,
}

impl<S: DurableStore> VisibilityStore<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Execute one write requested by the reducer.
    pub fn apply(&mut self, op: &PersistOp) -> Result<()> {
        match op {
            PersistOp::TabFlags {
                index,
                name,
                hidden,
                disabled,
            } => {
                self.set_tab_hidden(*index, name, *hidden)?;
                self.set_tab_disabled(*index, name, *disabled)
            }
            PersistOp::GroupHidden { key, hidden } => self.set_group_hidden(key, *hidden),
            PersistOp::GroupCollapsed { key, collapsed } => {
                self.set_group_collapsed(key, *collapsed)
            }
        }
    }

    pub fn set_tab_hidden(&mut self, index: usize, name: &str, hidden: bool) -> Result<()> {
        self.inner
            .set(&tab_hidden_key(index, name), if hidden { TRUE } else { FALSE })
    }

    pub fn set_tab_disabled(&mut self, index: usize, name: &str, disabled: bool) -> Result<()> {
        self.inner
            .set(&tab_disabled_key(index, name), if disabled { TRUE } else { FALSE })
    }

    pub fn set_group_hidden(&mut self, composite_key: &str, hidden: bool) -> Result<()> {
        let key = group_hidden_key(composite_key);
        if hidden {
            self.inner.set(&key, TRUE)
        } else {
            self.inner.remove(&key)
        }
    }

    pub fn set_group_collapsed(&mut self, composite_key: &str, collapsed: bool) -> Result<()> {
        let key = group_collapsed_key(composite_key);
        if collapsed {
            self.inner.set(&key, TRUE)
        } else {
            self.inner.remove(&key)
        }
    }

    /// Stored tab flags, for seeding a fresh session.
    pub fn tab_flags(&self, index: usize, name: &str) -> Result<TabFlags> {
        Ok(TabFlags {
            hidden: self.inner.get(&tab_hidden_key(index, name))?.map(|v| v == TRUE),
            disabled: self
                .inner
                .get(&tab_disabled_key(index, name))?
                .map(|v| v == TRUE),
        })
    }

    /// Stored group-hidden flag; absent means visible.
    pub fn group_hidden(&self, composite_key: &str) -> Result<bool> {
        Ok(self.inner.get(&group_hidden_key(composite_key))?.as_deref() == Some(TRUE))
    }

    /// Stored group-collapsed flag; absent means expanded.
    pub fn group_collapsed(&self, composite_key: &str) -> Result<bool> {
        Ok(self.inner.get(&group_collapsed_key(composite_key))?.as_deref() == Some(TRUE))
    }

    pub fn flush(&mut self, now: Instant, force: bool) -> Result<()> {
        self.inner.flush(now, force)
    }
}

// ──────────────────── tests ────────────────────
