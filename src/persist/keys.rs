//! Key builders for persisted visibility flags.
//!
//! Keys are built from display names, not ids, so a preference survives a
//! redeploy that renumbers nodes. The cost is that two same-named tabs (or
//! groups) share a key. Changing any format here orphans every preference
//! already stored in users' browsers.

/// Composite group key: `"<tab display name> <group name>"` with spaces as `_`.
#[must_use]
pub fn group_composite_key(tab_name: &str, group_name: &str) -> String {
    format!("{tab_name} {group_name}").replace(' ', "_")
}

#[must_use]
pub fn tab_hidden_key(index: usize, name: &str) -> String {
    format!("tab-{index}-{name}-hidden")
}

#[must_use]
pub fn tab_disabled_key(index: usize, name: &str) -> String {
    format!("tab-{index}-{name}-disabled")
}

#[must_use]
pub fn group_hidden_key(composite_key: &str) -> String {
    format!("group-{composite_key}-hidden")
}

#[must_use]
pub fn group_collapsed_key(composite_key: &str) -> String {
    format!("group-{composite_key}-collapsed")
}
