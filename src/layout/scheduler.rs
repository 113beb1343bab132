//! Debounced, cancellable masonry recomputation.
//!
//! Content changes and resizes arrive in bursts. Each one bumps a generation
//! counter and pushes the recompute deadline out by the debounce window. A
//! computation started under an older generation is discarded at commit time,
//! so a resize that lands mid-flight never applies stale positions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::masonry::{BlockSize, PackOptions, PackResult, pack};
use crate::core::config::LayoutConfig;

/// Snapshot of one in-flight computation.
///
/// Cheap to clone and `Send`, so the packing itself can run elsewhere.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    options: PackOptions,
    live: Arc<AtomicU64>,
}

impl Ticket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Whether newer input has superseded this computation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.live.load(Ordering::Acquire) != self.generation
    }

    /// Pack with this ticket's options unless already cancelled.
    #[must_use]
    pub fn run(&self, blocks: &[BlockSize]) -> Option<PackResult> {
        if self.is_cancelled() {
            return None;
        }
        Some(pack(blocks, &self.options))
    }
}

/// Coalesces layout triggers and hands out cancellable computations.
#[derive(Debug)]
pub struct MasonryScheduler {
    options: PackOptions,
    debounce: Duration,
    deadline: Option<Instant>,
    generation: Arc<AtomicU64>,
    last: Option<PackResult>,
}

impl MasonryScheduler {
    #[must_use]
    pub fn new(options: PackOptions, debounce: Duration) -> Self {
        Self {
            options,
            debounce,
            deadline: None,
            generation: Arc::new(AtomicU64::new(0)),
            last: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &LayoutConfig, container_width: u32) -> Self {
        Self::new(
            PackOptions::from_config(config, container_width),
            config.debounce(),
        )
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Block set or sizes changed.
    pub fn request(&mut self, now: Instant) {
        self.bump();
        self.deadline = Some(now + self.debounce);
    }

    /// Container width changed.
    pub fn resize(&mut self, container_width: u32, now: Instant) {
        self.options.container_width = container_width;
        self.request(now);
    }

    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Most recently committed layout.
    #[must_use]
    pub fn last(&self) -> Option<&PackResult> {
        self.last.as_ref()
    }

    /// Start a computation for the current generation.
    #[must_use]
    pub fn begin(&self) -> Ticket {
        Ticket {
            generation: self.generation(),
            options: self.options,
            live: Arc::clone(&self.generation),
        }
    }

    /// Accept a finished computation if nothing moved since `begin`.
    pub fn commit(&mut self, ticket: &Ticket, result: PackResult) -> Option<&PackResult> {
        if ticket.is_cancelled() {
            return None;
        }
        self.last = Some(result);
        self.last.as_ref()
    }

    /// Recompute synchronously once the debounce window has passed.
    pub fn poll(&mut self, now: Instant, blocks: &[BlockSize]) -> Option<&PackResult> {
        if !self.is_due(now) {
            return None;
        }
        self.deadline = None;
        let ticket = self.begin();
        let result = ticket.run(blocks)?;
        self.commit(&ticket, result)
    }

    /// Cancel the pending recompute and any computation in flight.
    pub fn teardown(&mut self) {
        self.bump();
        self.deadline = None;
        self.last = None;
    }
}
