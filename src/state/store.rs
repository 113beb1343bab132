//! Subscription-style store owning the dashboard state.
//!
//! The store is the only place side-effects happen. It feeds messages through
//! [`update::reduce`](super::update::reduce), swaps in the new snapshot, tells
//! subscribers, and then executes the returned [`StoreCmd`]s: durable writes,
//! outbound emits, timers, audio and journaling.
//!
//! Time is injected. Every entry point that can start or fire a timer takes
//! `now: Instant`, and [`DashboardStore::tick`] fires whatever is due. A host
//! loop sleeps until [`DashboardStore::next_deadline`] or the next inbound
//! frame, whichever comes first.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use serde_json::Value;

use super::debounce::TrailingDebouncer;
use super::model::{DashboardState, MenuItem};
use super::msg::{AudioSource, DashboardMsg, JournalNote, PersistOp, SpeechRequest, StoreCmd};
use super::routing::parse_hash;
use super::toast::ToastScheduler;
use super::update::{UpdateContext, reduce};
use super::widget::WidgetKind;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::persist::keys::{group_collapsed_key, group_hidden_key, tab_hidden_key};
use crate::persist::storage::{DurableStore, VisibilityStore};
use crate::transport::{Frame, Transport, TransportBridge};

// ──────────────────── snapshot handle ────────────────────

/// Shared read access to the latest snapshot.
///
/// Readers get an `Arc` to a complete state; the store swaps the pointer on
/// each transition, so a held snapshot is never torn.
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    inner: Arc<RwLock<Arc<DashboardState>>>,
}

impl StateHandle {
    #[must_use]
    pub fn load(&self) -> Arc<DashboardState> {
        Arc::clone(&self.inner.read())
    }

    fn replace(&self, next: Arc<DashboardState>) {
        *self.inner.write() = next;
    }
}

// ──────────────────── audio ────────────────────

/// Speech and clip playback, provided by the host.
pub trait AudioSink {
    fn speak(&mut self, request: &SpeechRequest);
    fn play(&mut self, source: &AudioSource);
    fn stop(&mut self);
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn speak(&mut self, _request: &SpeechRequest) {}
    fn play(&mut self, _source: &AudioSource) {}
    fn stop(&mut self) {}
}

// ──────────────────── store ────────────────────

pub type SubscriptionId = u64;

type Subscriber = Box<dyn FnMut(&DashboardState)>;

/// Pending throttled emit: event name and payload.
type PendingEmit = (String, Value);

/// Owner of [`DashboardState`] and executor of its side-effects.
pub struct DashboardStore<T, S> {
    state: Arc<DashboardState>,
    handle: StateHandle,
    ctx: UpdateContext,
    bridge: TransportBridge<T>,
    storage: VisibilityStore<S>,
    toasts: ToastScheduler,
    emits: TrailingDebouncer<String, PendingEmit>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
    journal: Option<JsonlWriter>,
    audio: Box<dyn AudioSink>,
    route: String,
}

impl<T: Transport, S: DurableStore> DashboardStore<T, S> {
    #[must_use]
    pub fn new(ctx: UpdateContext, emit_debounce: Duration, transport: T, storage: S) -> Self {
        Self {
            state: Arc::new(DashboardState::new()),
            handle: StateHandle::default(),
            ctx,
            bridge: TransportBridge::new(transport),
            storage: VisibilityStore::new(storage),
            toasts: ToastScheduler::new(),
            emits: TrailingDebouncer::new(emit_debounce),
            subscribers: Vec::new(),
            next_subscription: 0,
            journal: None,
            audio: Box::new(NullAudio),
            route: String::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config, transport: T, storage: S) -> Self {
        Self::new(
            UpdateContext::from_config(config),
            config.transport.emit_debounce(),
            transport,
            storage,
        )
    }

    #[must_use]
    pub fn with_journal(mut self, journal: JsonlWriter) -> Self {
        self.journal = Some(journal);
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    // ── reads ──

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<DashboardState> {
        Arc::clone(&self.state)
    }

    /// `menu[selected_tab_index]`, if any.
    #[must_use]
    pub fn selected_tab(&self) -> Option<&MenuItem> {
        self.state.selected_tab()
    }

    /// Handle other readers can poll for snapshots.
    #[must_use]
    pub fn handle(&self) -> StateHandle {
        self.handle.clone()
    }

    /// Current `#/<index>` fragment; empty until a tab is routed.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        self.bridge.inner()
    }

    #[must_use]
    pub fn storage(&self) -> &VisibilityStore<S> {
        &self.storage
    }

    #[must_use]
    pub fn pending_toast_timers(&self) -> usize {
        self.toasts.pending()
    }

    #[must_use]
    pub fn pending_emits(&self) -> usize {
        self.emits.len()
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.toasts.next_deadline(), self.emits.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ── subscriptions ──

    /// Register a callback run after every transition that changed state.
    pub fn subscribe(&mut self, callback: impl FnMut(&DashboardState) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns whether the id was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    // ── inbound ──

    /// Run one message through the reducer and execute its effects.
    pub fn dispatch(&mut self, msg: DashboardMsg, now: Instant) {
        let (next, cmd) = reduce(&self.state, msg, &self.ctx);

        if next != *self.state {
            if next.socket_id != self.bridge.session_id() {
                self.bridge.set_session(&next.socket_id);
            }
            self.state = Arc::new(next);
            self.handle.replace(Arc::clone(&self.state));
            for (_, callback) in &mut self.subscribers {
                callback(&self.state);
            }
        }
        self.toasts.sync(&self.state.toasts);

        for cmd in cmd.flatten() {
            self.execute(cmd, now);
        }
    }

    /// Dispatch a named inbound event.
    pub fn handle_event(&mut self, event: &str, payload: &Value, now: Instant) {
        self.dispatch(DashboardMsg::from_event(event, payload), now);
    }

    pub fn handle_frame(&mut self, frame: &Frame, now: Instant) {
        self.handle_event(&frame.event, &frame.payload, now);
    }

    /// Drain every frame already waiting on `inbound`, in arrival order.
    pub fn pump(&mut self, inbound: &Receiver<Frame>, now: Instant) -> usize {
        let mut handled = 0;
        for frame in inbound.try_iter() {
            self.handle_frame(&frame, now);
            handled += 1;
        }
        handled
    }

    // ── actions ──

    pub fn select_tab(&mut self, index: usize, now: Instant) {
        self.dispatch(DashboardMsg::SelectTab(index), now);
    }

    pub fn dismiss_toast(&mut self, id: &str, now: Instant) {
        self.dispatch(DashboardMsg::DismissToast(id.to_owned()), now);
    }

    /// Send an event to the server right away. Failures are journaled too.
    pub fn emit(&mut self, event: &str, payload: Value) -> Result<()> {
        let result = self.bridge.emit(event, payload);
        match &result {
            Ok(()) => self.write_journal(
                LogEntry::new(EventType::Emit, Severity::Info).with_key(event),
            ),
            Err(err) => self.write_journal(
                LogEntry::new(EventType::TransportError, Severity::Warning)
                    .with_key(event)
                    .with_error(err),
            ),
        }
        result
    }

    /// Widget-originated emit. High-frequency widgets are coalesced per
    /// control so only the latest value goes out after the quiet period.
    pub fn emit_control(
        &mut self,
        control_id: &str,
        kind: &WidgetKind,
        event: &str,
        payload: Value,
        now: Instant,
    ) -> Result<()> {
        if kind.is_high_frequency() {
            self.emits
                .schedule(control_id.to_owned(), (event.to_owned(), payload), now);
            return Ok(());
        }
        // A discrete action supersedes any half-finished drag on the same control.
        self.emits.cancel(&control_id.to_owned());
        self.emit(event, payload)
    }

    /// Follow a `#/<index>` fragment. Out-of-range or malformed fragments are
    /// ignored. Returns whether a tab was selected.
    pub fn navigate_hash(&mut self, fragment: &str, now: Instant) -> bool {
        match parse_hash(fragment) {
            Some(index) if index < self.state.menu.len() => {
                self.select_tab(index, now);
                true
            }
            _ => false,
        }
    }

    // ── timers ──

    /// Fire due toast expiries and throttled emits, and flush storage.
    pub fn tick(&mut self, now: Instant) {
        for id in self.toasts.due(now) {
            self.dispatch(DashboardMsg::ToastExpired(id), now);
        }
        for (_, (event, payload)) in self.emits.due(now) {
            // Already journaled on failure.
            let _ = self.emit(&event, payload);
        }
        self.flush_storage(now, false);
    }

    /// Cancel all timers and flush buffered writes.
    ///
    /// Pending throttled emits are dropped, not sent.
    pub fn teardown(&mut self, now: Instant) {
        self.toasts.clear();
        self.emits.clear();
        self.flush_storage(now, true);
        if let Some(journal) = self.journal.as_mut() {
            journal.flush();
        }
    }

    // ── effects ──

    fn execute(&mut self, cmd: StoreCmd, now: Instant) {
        match cmd {
            StoreCmd::None | StoreCmd::Batch(_) => {}
            StoreCmd::Persist(op) => {
                if let Err(err) = self.storage.apply(&op) {
                    self.write_journal(
                        LogEntry::new(EventType::StorageError, Severity::Warning)
                            .with_key(persist_key(&op))
                            .with_error(&err),
                    );
                }
            }
            StoreCmd::ScheduleToastExpiry { id, after } => self.toasts.arm(&id, after, now),
            StoreCmd::Emit { event, payload } => {
                let _ = self.emit(&event, payload);
            }
            StoreCmd::SetRoute(route) => self.route = route,
            StoreCmd::Speak(request) => self.audio.speak(&request),
            StoreCmd::PlayAudio(source) => self.audio.play(&source),
            StoreCmd::StopAudio => self.audio.stop(),
            StoreCmd::Journal(note) => {
                let entry = self.entry_from_note(note);
                self.write_journal(entry);
            }
        }
    }

    fn flush_storage(&mut self, now: Instant, force: bool) {
        if let Err(err) = self.storage.flush(now, force) {
            self.write_journal(
                LogEntry::new(EventType::StorageError, Severity::Warning)
                    .with_error(&err)
                    .with_details(if force { "teardown flush" } else { "debounced flush" }),
            );
        }
    }

    fn entry_from_note(&self, note: JournalNote) -> LogEntry {
        let severity = match note.event {
            EventType::PatchDropped | EventType::StorageError | EventType::TransportError => {
                Severity::Warning
            }
            EventType::Error => Severity::Critical,
            _ => Severity::Info,
        };
        let mut entry = LogEntry::new(note.event, severity);
        if !self.state.socket_id.is_empty() {
            entry.session = Some(self.state.socket_id.clone());
        }
        entry.tab_index = note.tab_index;
        entry.control_id = note.control_id;
        entry.toast_id = note.toast_id;
        entry.details = note.details;
        entry
    }

    fn write_journal(&mut self, entry: LogEntry) {
        if let Some(journal) = self.journal.as_mut() {
            journal.write_entry(&entry);
        }
    }
}

fn persist_key(op: &PersistOp) -> String {
    match op {
        PersistOp::TabFlags { index, name, .. } => tab_hidden_key(*index, name),
        PersistOp::GroupHidden { key, .. } => group_hidden_key(key),
        PersistOp::GroupCollapsed { key, .. } => group_collapsed_key(key),
    }
}

impl<T, S> std::fmt::Debug for DashboardStore<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardStore")
            .field("state", &self.state)
            .field("route", &self.route)
            .field("subscribers", &self.subscribers.len())
            .field("toast_timers", &self.toasts.pending())
            .field("pending_emits", &self.emits.len())
            .field("journal", &self.journal.as_ref().map(JsonlWriter::sink_name))
            .finish_non_exhaustive()
    }
}
