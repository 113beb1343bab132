//! Store-level protocol scenarios: a scripted server drives a
//! [`DashboardStore`] over the in-process duplex link, with file-backed
//! preferences and an activity journal in a temp directory.

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};

use dashpanel::core::config::Config;
use dashpanel::logger::jsonl::{JournalConfig, JsonlWriter};
use dashpanel::persist::{
    DurableStore, JsonFileStore, LoadOutcome, MemoryStore, TabFlags, UnavailableStore,
    VisibilityStore,
};
use dashpanel::state::{ConnectionState, DashboardStore, MenuItem, UpdateContext, WidgetKind};
use dashpanel::transport::{ChannelTransport, Frame, RecordingTransport, duplex, events};

fn menu() -> Value {
    json!({
        "menu": [
            {"header": "Main", "items": [
                {"header": {"name": "Sensors"}, "items": [
                    {"id": "temp", "type": "gauge", "value": 20},
                    {"id": "fan", "type": "slider", "value": 0},
                ]},
            ]},
            {"header": "Ops", "items": [
                {"header": {"name": "Logs"}, "items": [{"id": "tail", "type": "text"}]},
            ]},
            {"header": "Admin", "disabled": true, "items": []},
        ],
        "site": {"title": "plant"},
    })
}

fn journal(dir: &std::path::Path) -> JsonlWriter {
    JsonlWriter::open(JournalConfig::at(dir.join("activity.jsonl")))
}

fn journal_lines(dir: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(dir.join("activity.jsonl"))
        .unwrap_or_default()
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

fn recording_store<S: DurableStore>(storage: S) -> DashboardStore<RecordingTransport, S> {
    DashboardStore::new(
        UpdateContext::default(),
        Duration::from_millis(200),
        RecordingTransport::default(),
        storage,
    )
}

#[test]
fn duplex_session_round_trip() {
    let t0 = Instant::now();
    let (client, server) = duplex(16);
    let mut store = DashboardStore::new(
        UpdateContext::default(),
        Duration::from_millis(200),
        client.transport,
        MemoryStore::new(),
    );

    server.push(events::CONNECT, json!({"id": "sock-9"})).unwrap();
    server.push(events::FULL_REFRESH, menu()).unwrap();
    server.push(events::REPLAY_DONE, Value::Null).unwrap();
    assert_eq!(store.pump(&client.inbound, t0), 3);

    let state = store.state();
    assert_eq!(state.connection, ConnectionState::Ready);
    assert!(state.replay_done);
    assert_eq!(state.socket_id, "sock-9");
    assert_eq!(state.menu.len(), 3);
    assert_eq!(state.selected_tab_index, Some(0));
    assert_eq!(state.site, json!({"title": "plant"}));

    store.select_tab(1, t0);
    let outbound: Vec<Frame> = server.outbound.try_iter().collect();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].event, "ui-change");
    assert_eq!(outbound[0].payload, json!({"tab": 1, "socketid": "sock-9"}));
    assert_eq!(store.route(), "#/1");
}

#[test]
fn disconnect_keeps_content_and_reconnect_restores() {
    let t0 = Instant::now();
    let mut store = recording_store(MemoryStore::new());
    store.handle_event(events::CONNECT, &json!("a"), t0);
    store.handle_event(events::FULL_REFRESH, &menu(), t0);
    store.handle_event(events::TOAST, &json!({"id": "n", "displayTime": 0}), t0);

    store.handle_event(events::DISCONNECT, &Value::Null, t0);
    let state = store.state();
    assert!(state.is_loading());
    assert_eq!(state.menu.len(), 3);
    assert_eq!(state.toasts.len(), 1);

    store.handle_event(events::RECONNECTING, &Value::Null, t0);
    assert_eq!(store.state().connection, ConnectionState::Connecting);
    store.handle_event(events::CONNECT, &json!("b"), t0);
    assert_eq!(store.state().socket_id, "b");
    assert!(!store.state().is_loading());
}

#[test]
fn hidden_selection_moves_and_flags_reach_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let t0 = Instant::now();

    let (storage, outcome) = JsonFileStore::open(path.clone(), Duration::from_millis(500));
    assert!(matches!(outcome, LoadOutcome::Missing));
    let mut store = recording_store(storage);
    store.handle_event(events::FULL_REFRESH, &menu(), t0);
    assert_eq!(store.state().selected_tab_index, Some(0));

    store.handle_event(events::CONTROL, &json!({"tabs": {"hide": ["Main"]}}), t0);
    let state = store.state();
    assert!(state.menu[0].hidden);
    assert_eq!(state.selected_tab_index, Some(1));

    store.handle_event(
        events::CONTROL,
        &json!({"group": {"collapse": ["Ops_Logs"]}}),
        t0,
    );
    assert!(store.state().menu[1].items[0].header.config.collapsed);
    store.teardown(t0);

    let (reopened, outcome) = JsonFileStore::open(path, Duration::ZERO);
    assert!(outcome.is_ok());
    let prefs = VisibilityStore::new(reopened);
    assert_eq!(
        prefs.tab_flags(0, "Main").unwrap(),
        TabFlags {
            hidden: Some(true),
            disabled: Some(false),
        }
    );
    assert_eq!(
        prefs.tab_flags(2, "Admin").unwrap(),
        TabFlags {
            hidden: Some(false),
            disabled: Some(true),
        }
    );
    assert!(prefs.group_collapsed("Ops_Logs").unwrap());
    assert!(!prefs.group_hidden("Ops_Logs").unwrap());
}

#[test]
fn expanding_a_group_forgets_the_flag() {
    let t0 = Instant::now();
    let mut store = recording_store(MemoryStore::new());
    store.handle_event(events::FULL_REFRESH, &menu(), t0);
    store.handle_event(
        events::CONTROL,
        &json!({"group": {"collapse": "Main_Sensors", "hide": "Main_Sensors"}}),
        t0,
    );
    let entries = store.storage().inner().entries();
    assert_eq!(
        entries.get("group-Main_Sensors-collapsed").map(String::as_str),
        Some("true")
    );
    assert_eq!(
        entries.get("group-Main_Sensors-hidden").map(String::as_str),
        Some("true")
    );

    store.handle_event(
        events::CONTROL,
        &json!({"group": {"expand": ["Main_Sensors"], "show": ["Main_Sensors"]}}),
        t0,
    );
    let entries = store.storage().inner().entries();
    assert!(!entries.contains_key("group-Main_Sensors-collapsed"));
    assert!(!entries.contains_key("group-Main_Sensors-hidden"));
}

#[test]
fn control_patches_reach_every_subscriber_snapshot() {
    let t0 = Instant::now();
    let mut store = recording_store(MemoryStore::new());
    store.handle_event(events::FULL_REFRESH, &menu(), t0);

    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    let sub = store.subscribe(move |_| counter.set(counter.get() + 1));
    let handle = store.handle();

    store.handle_event(
        events::CONTROL,
        &json!({"id": "temp", "control": {"value": 31}}),
        t0,
    );
    assert_eq!(seen.get(), 1);
    let control = handle.load().find_control(&json!("temp")).cloned().unwrap();
    assert_eq!(control.get("value"), Some(&json!(31)));
    assert_eq!(control.kind(), WidgetKind::parse("gauge"));

    // Unknown id: no transition, no notification.
    store.handle_event(
        events::CONTROL,
        &json!({"id": "nope", "control": {"value": 1}}),
        t0,
    );
    assert_eq!(seen.get(), 1);

    assert!(store.unsubscribe(sub));
    store.handle_event(events::REPLAY_DONE, &Value::Null, t0);
    assert_eq!(seen.get(), 1);
}

#[test]
fn toasts_expire_on_tick_and_persistent_ones_stay() {
    let t0 = Instant::now();
    let mut store = recording_store(MemoryStore::new());
    store.handle_event(events::TOAST, &json!({"message": "saved", "displayTime": 1000}), t0);
    store.handle_event(events::TOAST, &json!({"id": "sticky", "displayTime": 0}), t0);
    assert_eq!(store.state().toasts.len(), 2);
    assert_eq!(store.pending_toast_timers(), 1);

    store.tick(t0 + Duration::from_millis(999));
    assert_eq!(store.state().toasts.len(), 2);
    store.tick(t0 + Duration::from_millis(1000));
    let state = store.state();
    assert_eq!(state.toasts.len(), 1);
    assert_eq!(state.toasts[0].id, "sticky");

    store.dismiss_toast("sticky", t0);
    assert!(store.state().toasts.is_empty());
    assert!(store.next_deadline().is_none());
}

#[test]
fn slider_drags_coalesce_into_one_emit() {
    let t0 = Instant::now();
    let mut store = recording_store(MemoryStore::new());
    let slider = WidgetKind::parse("slider");
    for (step, value) in [10, 20, 30].into_iter().enumerate() {
        let at = t0 + Duration::from_millis(50 * step as u64);
        store
            .emit_control("fan", &slider, "fan", json!({"value": value}), at)
            .unwrap();
    }
    assert!(store.transport().sent.is_empty());
    assert_eq!(store.pending_emits(), 1);

    store.tick(t0 + Duration::from_millis(100 + 199));
    assert!(store.transport().sent.is_empty());
    store.tick(t0 + Duration::from_millis(100 + 200));
    let sent = &store.transport().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload["value"], 30);
}

#[test]
fn broken_storage_is_journaled_and_state_still_moves() {
    let dir = tempfile::tempdir().unwrap();
    let t0 = Instant::now();
    let mut store = recording_store(UnavailableStore).with_journal(journal(dir.path()));
    store.handle_event(events::FULL_REFRESH, &menu(), t0);
    store.handle_event(events::CONTROL, &json!({"tabs": {"disable": ["Ops"]}}), t0);
    assert!(store.state().menu[1].disabled);
    store.teardown(t0);

    let lines = journal_lines(dir.path());
    let failures: Vec<&Value> = lines
        .iter()
        .filter(|entry| entry["event"] == "storage_error")
        .collect();
    assert!(!failures.is_empty(), "expected storage errors in {lines:?}");
    assert!(failures.iter().all(|entry| entry["error_code"] == "DSH-3001"));
    assert!(failures.iter().all(|entry| entry["severity"] == "warning"));
}

#[test]
fn closed_transport_is_journaled_and_selection_holds() {
    let dir = tempfile::tempdir().unwrap();
    let t0 = Instant::now();
    let (client, server) = duplex(4);
    let mut store: DashboardStore<ChannelTransport, MemoryStore> = DashboardStore::new(
        UpdateContext::default(),
        Duration::from_millis(200),
        client.transport,
        MemoryStore::new(),
    )
    .with_journal(journal(dir.path()));
    store.handle_event(events::FULL_REFRESH, &menu(), t0);
    drop(server);

    store.select_tab(1, t0);
    assert_eq!(
        store.selected_tab().map(MenuItem::display_name),
        Some("Ops")
    );
    store.teardown(t0);

    let lines = journal_lines(dir.path());
    assert!(lines.iter().any(|entry| {
        entry["event"] == "transport_error" && entry["error_code"] == "DSH-3003"
    }));
}

#[test]
fn hash_navigation_and_server_navigation_agree() {
    let t0 = Instant::now();
    let mut store = recording_store(MemoryStore::new());
    store.handle_event(events::FULL_REFRESH, &menu(), t0);

    assert!(store.navigate_hash("#/1", t0));
    assert_eq!(store.route(), "#/1");
    assert!(!store.navigate_hash("#/9", t0));
    assert!(!store.navigate_hash("#/x", t0));
    assert_eq!(store.state().selected_tab_index, Some(1));

    // Server steps forward onto a disabled tab: refused.
    store.handle_event(events::CONTROL, &json!({"tab": "+1"}), t0);
    assert_eq!(store.state().selected_tab_index, Some(1));
    store.handle_event(events::CONTROL, &json!({"tab": "Main"}), t0);
    assert_eq!(store.state().selected_tab_index, Some(0));
    assert_eq!(store.route(), "#/0");
}

#[test]
fn store_from_config_uses_configured_events() {
    let mut config = Config::default();
    config.transport.tab_change_event = "tab-switch".to_string();
    config.toasts.default_display_ms = 50;
    let t0 = Instant::now();
    let mut store =
        DashboardStore::from_config(&config, RecordingTransport::default(), MemoryStore::new());
    store.handle_event(events::FULL_REFRESH, &menu(), t0);
    store.select_tab(1, t0);
    assert_eq!(store.transport().sent[0].event, "tab-switch");

    store.handle_event(events::TOAST, &json!({"message": "quick"}), t0);
    store.tick(t0 + Duration::from_millis(50));
    assert!(store.state().toasts.is_empty());
}

#[test]
fn recorded_session_replays_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_frames(
        dir.path(),
        &[
            (events::CONNECT, json!("rec")),
            (events::FULL_REFRESH, menu()),
            (events::CONTROL, json!({"tab": 1})),
        ],
    );
    let frames = dashpanel::transport::load_frames(&path).unwrap();
    let t0 = Instant::now();
    let mut store = recording_store(MemoryStore::new());
    for frame in &frames {
        store.handle_frame(frame, t0);
    }
    assert_eq!(store.state().selected_tab_index, Some(1));
    assert_eq!(store.route(), "#/1");
}
