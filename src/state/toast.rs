//! Toast expiry deadlines.
//!
//! One deadline per live toast id. The store arms a deadline when the reducer
//! asks for it and re-syncs the whole table against the toast list after every
//! transition, so ids that left the list (or became persistent) never fire.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::model::ToastMessage;

/// Per-id expiry table driven by an external clock.
#[derive(Debug, Default)]
pub struct ToastScheduler {
    deadlines: HashMap<String, Instant>,
}

impl ToastScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm or restart the timer for `id`.
    pub fn arm(&mut self, id: &str, after: Duration, now: Instant) {
        self.deadlines.insert(id.to_owned(), now + after);
    }

    /// Drop deadlines whose toast is gone or no longer expires.
    pub fn sync(&mut self, toasts: &[ToastMessage]) {
        self.deadlines.retain(|id, _| {
            toasts
                .iter()
                .any(|toast| toast.id == *id && !toast.is_persistent())
        });
    }

    /// Remove and return every id whose deadline has passed, oldest first.
    pub fn due(&mut self, now: Instant) -> Vec<String> {
        let mut expired: Vec<(Instant, String)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, deadline)| (*deadline, id.clone()))
            .collect();
        expired.sort();
        for (_, id) in &expired {
            self.deadlines.remove(id);
        }
        expired.into_iter().map(|(_, id)| id).collect()
    }

    /// Earliest pending deadline, for sizing a sleep.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.deadlines.len()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
