//! Masonry layout: a pure packer plus a debounced scheduler around it.

#![allow(missing_docs)]

pub mod masonry;
pub mod scheduler;

#[cfg(test)]
mod test_properties;

pub use masonry::{BlockSize, PackOptions, PackResult, Placement, pack};
pub use scheduler::{MasonryScheduler, Ticket};
