//! Property-based tests for reducer invariants.
//!
//! Uses `proptest` to drive arbitrary message sequences through the reducer and
//! check that the selection always points at a real tab, patches to unknown ids
//! change nothing, toast ids stay unique, and full refreshes are idempotent.

use proptest::prelude::*;
use serde_json::{Value, json};

use super::model::{DashboardState, MenuItem};
use super::msg::{ControlUpdate, DashboardMsg, FullRefresh, StoreCmd};
use super::update::{UpdateContext, first_visible_tab, update};

// ──────────────────── strategies ────────────────────

const NAMES: [&str; 4] = ["Main", "Ops", "Logs", "Main"];
const GROUPS: [&str; 2] = ["Sensors", "Pumps"];

fn arb_tab() -> impl Strategy<Value = Value> {
    (0..NAMES.len(), any::<bool>(), any::<bool>(), 0..3usize).prop_map(
        |(name, hidden, disabled, groups)| {
            let items: Vec<Value> = (0..groups)
                .map(|g| {
                    json!({
                        "header": {"name": GROUPS[g % GROUPS.len()]},
                        "items": [{"id": g * 10 + name, "value": 0}],
                    })
                })
                .collect();
            json!({"header": NAMES[name], "hidden": hidden, "disabled": disabled, "items": items})
        },
    )
}

fn arb_refresh() -> impl Strategy<Value = Value> {
    prop::collection::vec(arb_tab(), 0..6).prop_map(|menu| json!({"menu": menu, "site": {"v": 1}}))
}

fn arb_name() -> impl Strategy<Value = String> {
    (0..NAMES.len()).prop_map(|i| NAMES[i].to_string())
}

fn arb_group_key() -> impl Strategy<Value = String> {
    (0..NAMES.len(), 0..GROUPS.len()).prop_map(|(t, g)| format!("{}_{}", NAMES[t], GROUPS[g]))
}

fn arb_control_payload() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0..40u64, any::<i32>()).prop_map(|(id, v)| json!({"id": id, "control": {"value": v}})),
        prop::collection::vec(arb_name(), 0..3).prop_map(|n| json!({"tabs": {"hide": n}})),
        prop::collection::vec(arb_name(), 0..3).prop_map(|n| json!({"tabs": {"show": n}})),
        prop::collection::vec(arb_name(), 0..3).prop_map(|n| json!({"tabs": {"disable": n}})),
        prop::collection::vec(arb_name(), 0..3).prop_map(|n| json!({"tabs": {"enable": n}})),
        prop::collection::vec(arb_group_key(), 0..3)
            .prop_map(|k| json!({"group": {"hide": k.clone(), "collapse": k}})),
        (0..8u64).prop_map(|i| json!({"tab": i})),
        prop_oneof![Just("+1"), Just("-1"), Just(""), Just("Ops")].prop_map(|s| json!({"tab": s})),
        Just(json!({"id": null, "options": 3, "tabs": 7, "group": "x", "tab": [1]})),
    ]
}

fn arb_toast() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0..4u8).prop_map(|i| json!({"id": format!("t{i}"), "message": "m"})),
        (0..4u8).prop_map(|i| json!({"id": i, "displayTime": 0})),
        Just(json!({"message": "anonymous"})),
        Just(json!("not an object")),
    ]
}

fn arb_msg() -> impl Strategy<Value = DashboardMsg> {
    prop_oneof![
        arb_refresh().prop_map(|v| DashboardMsg::FullRefresh(FullRefresh::from_value(&v))),
        arb_control_payload().prop_map(|v| DashboardMsg::ControlUpdate(ControlUpdate::from_value(&v))),
        arb_toast().prop_map(DashboardMsg::Toast),
        (0..4u8).prop_map(|i| DashboardMsg::DismissToast(format!("t{i}"))),
        (0..8usize).prop_map(DashboardMsg::SelectTab),
        Just(DashboardMsg::Disconnect),
        Just(DashboardMsg::ReplayDone),
    ]
}

fn assert_state_invariants(state: &DashboardState) {
    if let Some(index) = state.selected_tab_index {
        assert!(
            index < state.menu.len(),
            "selected index {index} out of range for {} tabs",
            state.menu.len()
        );
    } else {
        assert!(state.menu.is_empty(), "non-empty menu with no selection");
    }

    let mut ids: Vec<&str> = state.toasts.iter().map(|t| t.id.as_str()).collect();
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    assert_eq!(before, ids.len(), "duplicate toast ids");
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of messages keeps the selection valid and toast ids unique.
    #[test]
    fn reducer_preserves_invariants(
        msgs in prop::collection::vec(arb_msg(), 1..40)
    ) {
        let ctx = UpdateContext::default();
        let mut state = DashboardState::new();
        for msg in msgs {
            let _ = update(&mut state, msg, &ctx);
            assert_state_invariants(&state);
        }
    }

    /// Patching an id nobody owns leaves the state deep-equal.
    #[test]
    fn unknown_id_patch_is_identity(
        refresh in arb_refresh(),
        value in any::<i64>(),
    ) {
        let ctx = UpdateContext::default();
        let mut state = DashboardState::new();
        update(&mut state, DashboardMsg::FullRefresh(FullRefresh::from_value(&refresh)), &ctx);
        let before = state.clone();
        let patch = json!({"id": "no-such-control", "control": {"value": value}});
        update(&mut state, DashboardMsg::ControlUpdate(ControlUpdate::from_value(&patch)), &ctx);
        prop_assert_eq!(state, before);
    }

    /// Applying the same refresh twice lands on the same state.
    #[test]
    fn full_refresh_idempotent(
        refresh in arb_refresh(),
        noise in prop::collection::vec(arb_msg(), 0..10),
    ) {
        let ctx = UpdateContext::default();
        let mut state = DashboardState::new();
        for msg in noise {
            let _ = update(&mut state, msg, &ctx);
        }
        let msg = DashboardMsg::FullRefresh(FullRefresh::from_value(&refresh));
        update(&mut state, msg.clone(), &ctx);
        let once = state.clone();
        update(&mut state, msg, &ctx);
        prop_assert_eq!(&state.menu, &once.menu);
        prop_assert_eq!(&state.site, &once.site);
        prop_assert_eq!(state.selected_tab_index, once.selected_tab_index);
        prop_assert_eq!(state.selected_tab_index, first_visible_tab(&state.menu));
    }

    /// The rule picks a selectable tab whenever one exists.
    #[test]
    fn first_visible_tab_prefers_selectable(
        flags in prop::collection::vec((any::<bool>(), any::<bool>()), 0..8)
    ) {
        let menu: Vec<MenuItem> = flags
            .iter()
            .map(|(hidden, disabled)| MenuItem { hidden: *hidden, disabled: *disabled, ..MenuItem::default() })
            .collect();
        match first_visible_tab(&menu) {
            None => prop_assert!(menu.is_empty()),
            Some(i) if menu.iter().any(MenuItem::is_selectable) => {
                prop_assert!(menu[i].is_selectable());
                prop_assert!(menu[..i].iter().all(|t| !t.is_selectable()));
            }
            Some(i) => prop_assert_eq!(i, 0),
        }
    }

    /// Every tab-visibility message persists one flag pair per tab.
    #[test]
    fn tab_visibility_persists_every_tab(
        refresh in arb_refresh(),
        hide in prop::collection::vec(arb_name(), 0..3),
    ) {
        let ctx = UpdateContext::default();
        let mut state = DashboardState::new();
        update(&mut state, DashboardMsg::FullRefresh(FullRefresh::from_value(&refresh)), &ctx);
        let payload = json!({"tabs": {"hide": hide}});
        let cmds = update(&mut state, DashboardMsg::ControlUpdate(ControlUpdate::from_value(&payload)), &ctx)
            .flatten();
        let persisted = cmds.iter().filter(|c| matches!(c, StoreCmd::Persist(_))).count();
        prop_assert_eq!(persisted, state.menu.len());
    }
}
