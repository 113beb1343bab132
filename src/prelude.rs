//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dashpanel::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{DashError, Result};

// State
pub use crate::state::{
    ConnectionState, DashboardMsg, DashboardState, DashboardStore, MenuItem, StateHandle,
    StoreCmd, ToastMessage, UpdateContext, WidgetKind, reduce, update,
};

// Persistence
pub use crate::persist::{DurableStore, JsonFileStore, MemoryStore, VisibilityStore};

// Transport
pub use crate::transport::{Frame, RecordingTransport, Transport, TransportBridge, duplex};

// Layout
pub use crate::layout::{BlockSize, MasonryScheduler, PackOptions, PackResult, pack};
