//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DashError, Result};

/// Full dashpanel configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub toasts: ToastConfig,
    pub layout: LayoutConfig,
    pub storage: StorageConfig,
    pub paths: PathsConfig,
}

/// Outbound emit behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransportConfig {
    /// Trailing debounce window for high-frequency control emits.
    pub emit_debounce_ms: u64,
    /// Outbound event name used for tab selection changes.
    pub tab_change_event: String,
}

/// Toast defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToastConfig {
    /// Display time applied when a toast payload omits `displayTime`.
    pub default_display_ms: i64,
}

/// Masonry packer knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub gutter_x: u32,
    pub gutter_y: u32,
    /// Debounce window coalescing resize/content-change recomputes.
    pub debounce_ms: u64,
    /// Constant added below the tallest column when sizing the container.
    pub container_padding: u32,
}

/// Durable key-value store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    pub file: PathBuf,
    pub flush_debounce_ms: u64,
}

/// Filesystem paths used by dashpanel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub journal: PathBuf,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            emit_debounce_ms: 200,
            tab_change_event: "ui-change".to_string(),
        }
    }
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            default_display_ms: 3_000,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gutter_x: 6,
            gutter_y: 6,
            debounce_ms: 50,
            container_padding: 4,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: data_dir().join("storage.json"),
            flush_debounce_ms: 500,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = home_dir();
        Self {
            config_file: home_dir
                .join(".config")
                .join("dashpanel")
                .join("config.toml"),
            journal: data_dir().join("activity.jsonl"),
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn emit_debounce(&self) -> Duration {
        Duration::from_millis(self.emit_debounce_ms)
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl StorageConfig {
    #[must_use]
    pub fn flush_debounce(&self) -> Duration {
        Duration::from_millis(self.flush_debounce_ms)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw =
                fs::read_to_string(&path_buf).map_err(|source| DashError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit_path {
            return Err(DashError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for journaling.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut var = |name: &'static str| lookup(name).map(|raw| (name, raw));

        if let Some((name, raw)) = var("DASHPANEL_EMIT_DEBOUNCE_MS") {
            self.transport.emit_debounce_ms = parse_env(name, &raw)?;
        }
        if let Some((_, raw)) = var("DASHPANEL_TAB_CHANGE_EVENT") {
            self.transport.tab_change_event = raw;
        }
        if let Some((name, raw)) = var("DASHPANEL_TOAST_DEFAULT_DISPLAY_MS") {
            self.toasts.default_display_ms = parse_env(name, &raw)?;
        }
        if let Some((name, raw)) = var("DASHPANEL_LAYOUT_GUTTER") {
            let gutter = parse_env(name, &raw)?;
            self.layout.gutter_x = gutter;
            self.layout.gutter_y = gutter;
        }
        if let Some((name, raw)) = var("DASHPANEL_LAYOUT_DEBOUNCE_MS") {
            self.layout.debounce_ms = parse_env(name, &raw)?;
        }
        if let Some((name, raw)) = var("DASHPANEL_STORAGE_ENABLED") {
            self.storage.enabled = parse_env(name, &raw)?;
        }
        if let Some((_, raw)) = var("DASHPANEL_STORAGE_FILE") {
            self.storage.file = PathBuf::from(raw);
        }
        if let Some((_, raw)) = var("DASHPANEL_JOURNAL") {
            self.paths.journal = PathBuf::from(raw);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.transport.emit_debounce_ms > 10_000 {
            return Err(DashError::InvalidConfig {
                details: format!(
                    "transport.emit_debounce_ms must be <= 10000, got {}",
                    self.transport.emit_debounce_ms
                ),
            });
        }
        if self.transport.tab_change_event.trim().is_empty() {
            return Err(DashError::InvalidConfig {
                details: "transport.tab_change_event must not be empty".to_string(),
            });
        }
        for (name, val) in [
            ("gutter_x", self.layout.gutter_x),
            ("gutter_y", self.layout.gutter_y),
            ("container_padding", self.layout.container_padding),
        ] {
            if val > 1_000 {
                return Err(DashError::InvalidConfig {
                    details: format!("layout.{name} must be <= 1000, got {val}"),
                });
            }
        }
        if self.layout.debounce_ms > 10_000 {
            return Err(DashError::InvalidConfig {
                details: format!(
                    "layout.debounce_ms must be <= 10000, got {}",
                    self.layout.debounce_ms
                ),
            });
        }
        if self.storage.enabled && self.storage.file.as_os_str().is_empty() {
            return Err(DashError::InvalidConfig {
                details: "storage.file must be set when storage is enabled".to_string(),
            });
        }
        Ok(())
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[DASHPANEL-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("dashpanel")
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

/// Parse a `DASHPANEL_*` value; the error names the variable and raw text.
fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse::<T>().map_err(|error| DashError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
