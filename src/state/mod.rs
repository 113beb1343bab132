//! Client state synchronization core.
//!
//! Elm-style split: `model` holds plain data, `msg` names every input and
//! effect, `update` is the pure transition function, and `store` is the only
//! piece that touches the outside world.

#![allow(missing_docs)]

pub mod debounce;
pub mod model;
pub mod msg;
pub mod routing;
pub mod store;
pub mod toast;
pub mod update;
pub mod widget;

#[cfg(test)]
mod test_properties;

pub use model::{ConnectionState, DashboardState, MenuItem, ToastMessage};
pub use msg::{DashboardMsg, StoreCmd};
pub use store::{DashboardStore, StateHandle};
pub use update::{UpdateContext, first_visible_tab, reduce, update};
pub use widget::WidgetKind;
