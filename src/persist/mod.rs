//! Durable visibility preferences: key builders plus the store layer.

#![allow(missing_docs)]

pub mod keys;
pub mod storage;

pub use storage::{
    DurableStore, JsonFileStore, LoadOutcome, MemoryStore, TabFlags, UnavailableStore,
    VisibilityStore,
};
