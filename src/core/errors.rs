//! DSH-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DashError>;

/// Top-level error type for dashpanel.
///
/// The reducer never produces these: protocol payload problems degrade to
/// no-ops. Errors only surface at the edges (config, storage, transport, CLI).
#[derive(Debug, Error)]
pub enum DashError {
    #[error("[DSH-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DSH-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DSH-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DSH-2001] malformed frame at line {line}: {details}")]
    MalformedFrame { line: usize, details: String },

    #[error("[DSH-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DSH-3001] durable store unavailable: {details}")]
    StorageUnavailable { details: String },

    #[error("[DSH-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DSH-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DSH-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DashError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DSH-1001",
            Self::MissingConfig { .. } => "DSH-1002",
            Self::ConfigParse { .. } => "DSH-1003",
            Self::MalformedFrame { .. } => "DSH-2001",
            Self::Serialization { .. } => "DSH-2101",
            Self::StorageUnavailable { .. } => "DSH-3001",
            Self::Io { .. } => "DSH-3002",
            Self::ChannelClosed { .. } => "DSH-3003",
            Self::Runtime { .. } => "DSH-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for DashError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DashError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
