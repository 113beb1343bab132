//! Trailing-edge debounce keyed by an arbitrary id.
//!
//! Each key holds at most one pending value. Scheduling again replaces the
//! value and pushes the deadline out (cancel-and-reschedule), so only the most
//! recent value survives a burst. Time is passed in by the caller.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Pending<V> {
    value: V,
    deadline: Instant,
}

/// Lossy coalescing buffer with a fixed delay.
#[derive(Debug)]
pub struct TrailingDebouncer<K, V> {
    delay: Duration,
    pending: HashMap<K, Pending<V>>,
}

impl<K: Eq + Hash + Clone, V> TrailingDebouncer<K, V> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value for `key` and restart its timer.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) {
        self.pending.insert(
            key,
            Pending {
                value,
                deadline: now + self.delay,
            },
        );
    }

    /// Take every entry whose quiet period has elapsed, oldest deadline first.
    pub fn due(&mut self, now: Instant) -> Vec<(K, V)> {
        let mut ready: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();
        ready.sort_by_key(|k| self.pending.get(k).map(|p| p.deadline));
        ready
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p.value)))
            .collect()
    }

    /// Drop the pending value for `key` without firing it.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|p| p.value)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
