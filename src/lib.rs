#![forbid(unsafe_code)]

//! dashpanel: client-side state sync for server-driven dashboards.
//!
//! A server pushes a tree of tabs, groups and controls over a bidirectional
//! event channel. This crate keeps a local view model in lockstep with it:
//!
//! 1. **State** ([`state`]): a pure reducer over inbound protocol events plus a
//!    store that executes the side effects it returns (emits, persistence,
//!    toast timers, routing).
//! 2. **Persistence** ([`persist`]): per-user visibility flags in a durable
//!    key/value store that may be missing or broken.
//! 3. **Layout** ([`layout`]): a masonry packer for variable-size blocks with a
//!    debounced, cancellable scheduler.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use dashpanel::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use dashpanel::core::config::Config;
//! use dashpanel::layout::{BlockSize, PackOptions, pack};
//! ```

pub mod prelude;

pub mod core;
pub mod layout;
pub mod logger;
pub mod persist;
pub mod state;
pub mod transport;
