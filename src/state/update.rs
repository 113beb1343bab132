//! Pure transition functions for the dashboard state.
//!
//! `update()` takes the current state and a message, mutates the state, and
//! returns a command describing any side-effects the store should execute.
//!
//! **Design invariant:** this module performs zero I/O. All effects are
//! described as [`StoreCmd`] values. Every transition is total: malformed
//! input degrades to a no-op on the affected sub-field only.

use std::time::Duration;

use serde_json::{Value, json};

use super::model::{ConnectionState, Control, DashboardState, MenuItem, ToastMessage};
use super::msg::{
    AudioEvent, ControlPatch, ControlUpdate, DashboardMsg, FullRefresh, GroupVisibility,
    JournalNote, PersistOp, StoreCmd, TabTarget, TabVisibility,
};
use super::routing::hash_for;
use crate::core::config::Config;
use crate::logger::jsonl::EventType;
use crate::persist::keys::group_composite_key;

/// Configuration the reducer needs. Everything else it derives from state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateContext {
    /// Used when a toast payload carries no `displayTime`.
    pub default_toast_display_ms: i64,
    /// Outbound event name for tab selections.
    pub tab_change_event: String,
}

impl UpdateContext {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_toast_display_ms: config.toasts.default_display_ms,
            tab_change_event: config.transport.tab_change_event.clone(),
        }
    }
}

impl Default for UpdateContext {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Index of the first tab that is neither hidden nor disabled.
///
/// Falls back to `0` when nothing qualifies, and `None` for an empty menu.
#[must_use]
pub fn first_visible_tab(menu: &[MenuItem]) -> Option<usize> {
    if menu.is_empty() {
        return None;
    }
    Some(menu.iter().position(MenuItem::is_selectable).unwrap_or(0))
}

/// Functional form of [`update`]: the previous snapshot is left untouched.
#[must_use]
pub fn reduce(
    prev: &DashboardState,
    msg: DashboardMsg,
    ctx: &UpdateContext,
) -> (DashboardState, StoreCmd) {
    let mut next = prev.clone();
    let cmd = update(&mut next, msg, ctx);
    (next, cmd)
}

/// Apply a message to the state and return the next command for the store.
///
/// This is the core state machine of the dashboard. Every state transition
/// goes through this function, making the dashboard deterministic and testable.
pub fn update(state: &mut DashboardState, msg: DashboardMsg, ctx: &UpdateContext) -> StoreCmd {
    match msg {
        DashboardMsg::Connect { session_id } => {
            state.connection = ConnectionState::Ready;
            state.socket_id.clone_from(&session_id);
            journal(EventType::Connect, |note| note.details = Some(session_id))
        }

        DashboardMsg::Reconnecting => {
            state.connection = ConnectionState::Connecting;
            journal(EventType::Disconnect, |note| {
                note.details = Some("reconnecting".to_string());
            })
        }

        // Stale view stays until a fresh full refresh arrives.
        DashboardMsg::Disconnect => {
            state.connection = ConnectionState::Disconnected;
            journal(EventType::Disconnect, |_| {})
        }

        DashboardMsg::FullRefresh(refresh) => apply_full_refresh(state, refresh),

        DashboardMsg::ReplayDone => {
            state.replay_done = true;
            state.connection = ConnectionState::Ready;
            journal(EventType::ReplayDone, |_| {})
        }

        DashboardMsg::ControlUpdate(update) => apply_control_update(state, update),

        DashboardMsg::Toast(payload) => upsert_toast(state, &payload, ctx),

        DashboardMsg::Audio(event) => {
            let effect = match event {
                AudioEvent::Speak(request) => StoreCmd::Speak(request),
                AudioEvent::Play(source) => StoreCmd::PlayAudio(source),
                AudioEvent::Stop => StoreCmd::StopAudio,
                AudioEvent::Empty => return StoreCmd::None,
            };
            StoreCmd::batch(vec![effect, journal(EventType::Audio, |_| {})])
        }

        DashboardMsg::SelectTab(index) => {
            if index >= state.menu.len() {
                return StoreCmd::None;
            }
            state.selected_tab_index = Some(index);
            StoreCmd::batch(vec![
                StoreCmd::Emit {
                    event: ctx.tab_change_event.clone(),
                    payload: json!({ "tab": index }),
                },
                StoreCmd::SetRoute(hash_for(index)),
                journal(EventType::TabSelected, |note| note.tab_index = Some(index)),
            ])
        }

        DashboardMsg::DismissToast(id) => remove_toast(state, id, None),

        DashboardMsg::ToastExpired(id) => remove_toast(state, id, Some("expired")),

        DashboardMsg::Ignored { .. } => StoreCmd::None,
    }
}

fn journal(event: EventType, fill: impl FnOnce(&mut JournalNote)) -> StoreCmd {
    let mut note = JournalNote::new(event);
    fill(&mut note);
    StoreCmd::Journal(note)
}

// ──────────────────── full refresh ────────────────────

fn apply_full_refresh(state: &mut DashboardState, refresh: FullRefresh) -> StoreCmd {
    if let Some(menu) = refresh.menu {
        state.menu = menu.iter().filter_map(MenuItem::from_value).collect();
    }
    if let Some(globals) = refresh.globals {
        state.globals = globals;
    }
    if let Some(site) = refresh.site {
        state.site = site;
    }
    if let Some(theme) = refresh.theme {
        state.theme = theme;
    }
    if let Some(locales) = refresh.locales {
        state.locales = locales;
    }
    if let Some(lang) = refresh.lang {
        state.lang = lang;
    }
    state.selected_tab_index = first_visible_tab(&state.menu);

    let tabs = state.menu.len();
    let selected = state.selected_tab_index;
    journal(EventType::FullRefresh, |note| {
        note.tab_index = selected;
        note.details = Some(format!("tabs={tabs}"));
    })
}

// ──────────────────── control update ────────────────────

fn apply_control_update(state: &mut DashboardState, update: ControlUpdate) -> StoreCmd {
    let mut cmds = Vec::new();
    if let Some(patch) = update.patch {
        cmds.push(apply_patch(state, patch));
    }
    if let Some(tabs) = update.tabs {
        cmds.extend(apply_tab_visibility(state, &tabs));
    }
    if let Some(group) = update.group {
        cmds.extend(apply_group_visibility(state, &group));
    }
    if let Some(target) = update.tab {
        cmds.push(navigate(state, target));
    }
    StoreCmd::batch(cmds)
}

fn find_control_mut<'a>(menu: &'a mut [MenuItem], id: &Value) -> Option<&'a mut Control> {
    menu.iter_mut()
        .flat_map(|tab| tab.items.iter_mut())
        .flat_map(|group| group.items.iter_mut())
        .find(|control| control.id() == Some(id))
}

fn id_label(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn apply_patch(state: &mut DashboardState, patch: ControlPatch) -> StoreCmd {
    let label = id_label(patch.id());
    let Some(control) = find_control_mut(&mut state.menu, patch.id()) else {
        return journal(EventType::PatchDropped, |note| {
            note.control_id = Some(label);
            note.details = Some("unknown control id".to_string());
        });
    };

    match patch {
        ControlPatch::Merge { patch, .. } => control.merge(&patch),
        ControlPatch::Options {
            options,
            value,
            reset_selection,
            ..
        } => {
            control.set("options", options);
            // Neither `value` nor `payload`: the current value stands.
            if let Some(value) = value {
                control.set("value", value);
            }
            control.set("resetSelection", Value::Bool(reset_selection));
        }
    }
    journal(EventType::ControlPatch, |note| note.control_id = Some(label))
}

fn listed(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n == name)
}

fn selection_is_valid(state: &DashboardState) -> bool {
    state
        .selected_tab()
        .is_some_and(MenuItem::is_selectable)
}

fn apply_tab_visibility(state: &mut DashboardState, tabs: &TabVisibility) -> Vec<StoreCmd> {
    for tab in &mut state.menu {
        let name = tab.display_name().to_owned();
        if listed(&tabs.show, &name) {
            tab.hidden = false;
        }
        if listed(&tabs.hide, &name) {
            tab.hidden = true;
        }
        if listed(&tabs.enable, &name) {
            tab.disabled = false;
        }
        if listed(&tabs.disable, &name) {
            tab.disabled = true;
        }
    }

    let mut cmds: Vec<StoreCmd> = state
        .menu
        .iter()
        .enumerate()
        .map(|(index, tab)| {
            StoreCmd::Persist(PersistOp::TabFlags {
                index,
                name: tab.display_name().to_owned(),
                hidden: tab.hidden,
                disabled: tab.disabled,
            })
        })
        .collect();

    if !selection_is_valid(state) {
        state.selected_tab_index = first_visible_tab(&state.menu);
    }

    let selected = state.selected_tab_index;
    let changed = tabs.show.len() + tabs.hide.len() + tabs.enable.len() + tabs.disable.len();
    cmds.push(journal(EventType::TabVisibility, |note| {
        note.tab_index = selected;
        note.details = Some(format!("directives={changed}"));
    }));
    cmds
}

fn apply_group_visibility(state: &mut DashboardState, group: &GroupVisibility) -> Vec<StoreCmd> {
    let mut cmds = Vec::new();
    let mut touched = Vec::new();

    for tab in &mut state.menu {
        let tab_name = tab.display_name().to_owned();
        for g in &mut tab.items {
            let key = group_composite_key(&tab_name, g.display_name());
            let config = &mut g.header.config;
            let mut hit = false;

            if listed(&group.show, &key) {
                config.hidden = false;
                cmds.push(StoreCmd::Persist(PersistOp::GroupHidden {
                    key: key.clone(),
                    hidden: false,
                }));
                hit = true;
            }
            if listed(&group.hide, &key) {
                config.hidden = true;
                cmds.push(StoreCmd::Persist(PersistOp::GroupHidden {
                    key: key.clone(),
                    hidden: true,
                }));
                hit = true;
            }
            if listed(&group.collapse, &key) {
                config.collapsed = true;
                cmds.push(StoreCmd::Persist(PersistOp::GroupCollapsed {
                    key: key.clone(),
                    collapsed: true,
                }));
                hit = true;
            }
            if listed(&group.expand, &key) {
                config.collapsed = false;
                cmds.push(StoreCmd::Persist(PersistOp::GroupCollapsed {
                    key: key.clone(),
                    collapsed: false,
                }));
                hit = true;
            }
            if hit {
                touched.push(key);
            }
        }
    }

    if !touched.is_empty() {
        cmds.push(journal(EventType::GroupVisibility, |note| {
            note.details = Some(touched.join(","));
        }));
    }
    cmds
}

fn navigate(state: &mut DashboardState, target: TabTarget) -> StoreCmd {
    let len = state.menu.len();
    let index = match target {
        TabTarget::Refresh => return StoreCmd::None,
        TabTarget::Index(index) => Some(index).filter(|i| *i < len),
        TabTarget::Step(step) => {
            if len == 0 {
                return StoreCmd::None;
            }
            let current = state.selected_tab_index.unwrap_or(0);
            let target = current.saturating_add_signed(step).min(len - 1);
            // No skipping: a disabled neighbour blocks the step.
            Some(target).filter(|i| !state.menu[*i].disabled)
        }
        TabTarget::Name(name) => state
            .menu
            .iter()
            .position(|tab| tab.answers_to(&name))
            .filter(|i| !state.menu[*i].disabled),
    };

    let Some(index) = index else {
        return StoreCmd::None;
    };
    state.selected_tab_index = Some(index);
    StoreCmd::batch(vec![
        StoreCmd::SetRoute(hash_for(index)),
        journal(EventType::TabNavigation, |note| note.tab_index = Some(index)),
    ])
}

// ──────────────────── toasts ────────────────────

fn upsert_toast(state: &mut DashboardState, payload: &Value, ctx: &UpdateContext) -> StoreCmd {
    let fallback = format!("toast-{}", state.next_toast_seq);
    let Some(toast) = ToastMessage::from_value(payload, &fallback, ctx.default_toast_display_ms)
    else {
        return StoreCmd::None;
    };
    if toast.id == fallback {
        state.next_toast_seq += 1;
    }

    let id = toast.id.clone();
    let after = (!toast.is_persistent())
        .then(|| Duration::from_millis(u64::try_from(toast.display_time).unwrap_or(0)));

    if let Some(existing) = state.toasts.iter_mut().find(|t| t.id == id) {
        *existing = toast;
    } else {
        state.toasts.push(toast);
    }

    let mut cmds = Vec::new();
    if let Some(after) = after {
        cmds.push(StoreCmd::ScheduleToastExpiry {
            id: id.clone(),
            after,
        });
    }
    cmds.push(journal(EventType::Toast, |note| note.toast_id = Some(id)));
    StoreCmd::batch(cmds)
}

fn remove_toast(state: &mut DashboardState, id: String, reason: Option<&str>) -> StoreCmd {
    let before = state.toasts.len();
    state.toasts.retain(|t| t.id != id);
    if state.toasts.len() == before {
        return StoreCmd::None;
    }
    journal(EventType::ToastDismissed, |note| {
        note.toast_id = Some(id);
        note.details = reason.map(str::to_owned);
    })
}

// ──────────────────── tests ────────────────────
