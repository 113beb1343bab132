//! First-fit skyline packing for group blocks.
//!
//! Blocks arrive in display order with measured sizes. Each is dropped into
//! the top-most, then left-most free region wide enough to hold it. Free
//! regions extend downward without bound; a region made stale by an earlier
//! placement is caught by an explicit collision check against every placed
//! block, which spawns a replacement region under the blocker.
//!
//! The packer is a pure function of its inputs: same sizes, same order, same
//! gutters, same placements.

#![allow(missing_docs)]

use std::collections::HashSet;

use serde::Serialize;

use crate::core::config::LayoutConfig;

/// Measured size of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockSize {
    pub width: u32,
    pub height: u32,
}

impl BlockSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Packing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    pub container_width: u32,
    pub gutter_x: u32,
    pub gutter_y: u32,
    /// Extra space under the last row.
    pub padding: u32,
}

impl PackOptions {
    #[must_use]
    pub const fn new(container_width: u32, gutter: u32) -> Self {
        Self {
            container_width,
            gutter_x: gutter,
            gutter_y: gutter,
            padding: 0,
        }
    }

    #[must_use]
    pub const fn from_config(config: &LayoutConfig, container_width: u32) -> Self {
        Self {
            container_width,
            gutter_x: config.gutter_x,
            gutter_y: config.gutter_y,
            padding: config.container_padding,
        }
    }

    /// Width left for blocks after a gutter on each side.
    #[must_use]
    pub const fn available_width(&self) -> u32 {
        self.container_width
            .saturating_sub(self.gutter_x.saturating_mul(2))
    }
}

/// Final position of one block. `x` already includes the centering offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Position of the block in the input slice.
    pub index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Whether the two rectangles share any interior area.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Output of one packing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackResult {
    /// One entry per input block, in input order.
    pub placements: Vec<Placement>,
    pub container_height: u32,
    /// Horizontal centering offset applied to every placement.
    pub offset_x: u32,
}

impl PackResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

// ──────────────────── packer ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Rect {
    const fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Overlap test with the gutter counted as part of each block.
    const fn collides(&self, other: &Self, gutter_x: u32, gutter_y: u32) -> bool {
        self.x < other.right().saturating_add(gutter_x)
            && other.x < self.right().saturating_add(gutter_x)
            && self.y < other.bottom().saturating_add(gutter_y)
            && other.y < self.bottom().saturating_add(gutter_y)
    }
}

#[derive(Debug, Clone, Copy)]
struct FreeRegion {
    x: u32,
    y: u32,
    width: u32,
    used: bool,
}

struct Packer {
    available: u32,
    gutter_x: u32,
    gutter_y: u32,
    free: Vec<FreeRegion>,
    /// `(x, y)` of every region ever created; one region per corner.
    seen: HashSet<(u32, u32)>,
    placed: Vec<Rect>,
}

impl Packer {
    fn new(options: &PackOptions) -> Self {
        let mut packer = Self {
            available: options.available_width(),
            gutter_x: options.gutter_x,
            gutter_y: options.gutter_y,
            free: Vec::new(),
            seen: HashSet::new(),
            placed: Vec::new(),
        };
        packer.add_region(0, 0, packer.available);
        packer
    }

    fn add_region(&mut self, x: u32, y: u32, width: u32) {
        if width > 0 && self.seen.insert((x, y)) {
            self.free.push(FreeRegion {
                x,
                y,
                width,
                used: false,
            });
        }
    }

    fn place(&mut self, size: BlockSize) -> Rect {
        let mut rejected = HashSet::new();
        loop {
            let candidate = self
                .free
                .iter()
                .enumerate()
                .filter(|(i, r)| !r.used && r.width >= size.width && !rejected.contains(i))
                .min_by_key(|(_, r)| (r.y, r.x))
                .map(|(i, r)| (i, *r));

            let Some((index, region)) = candidate else {
                return self.place_below_everything(size);
            };

            let rect = Rect {
                x: region.x,
                y: region.y,
                width: size.width,
                height: size.height,
            };

            // Stale region: retry from directly under whatever is in the way.
            if let Some(blocker) = self
                .placed
                .iter()
                .find(|p| rect.collides(p, self.gutter_x, self.gutter_y))
                .copied()
            {
                rejected.insert(index);
                self.add_region(
                    region.x,
                    blocker.bottom().saturating_add(self.gutter_y),
                    region.width,
                );
                continue;
            }

            self.free[index].used = true;
            self.placed.push(rect);
            self.add_region(
                rect.right().saturating_add(self.gutter_x),
                region.y,
                region
                    .width
                    .saturating_sub(size.width)
                    .saturating_sub(self.gutter_x),
            );
            self.add_region(
                region.x,
                rect.bottom().saturating_add(self.gutter_y),
                region.width,
            );
            return rect;
        }
    }

    /// Last resort for blocks no region can hold.
    fn place_below_everything(&mut self, size: BlockSize) -> Rect {
        let y = self
            .placed
            .iter()
            .map(Rect::bottom)
            .max()
            .map_or(0, |bottom| bottom.saturating_add(self.gutter_y));
        let rect = Rect {
            x: 0,
            y,
            width: size.width,
            height: size.height,
        };
        self.placed.push(rect);
        self.add_region(0, rect.bottom().saturating_add(self.gutter_y), self.available);
        rect
    }
}

/// Pack `blocks` in order. An empty input yields an empty result.
#[must_use]
pub fn pack(blocks: &[BlockSize], options: &PackOptions) -> PackResult {
    if blocks.is_empty() {
        return PackResult::default();
    }

    let mut packer = Packer::new(options);
    for size in blocks {
        packer.place(*size);
    }

    let max_x = packer.placed.iter().map(Rect::right).max().unwrap_or(0);
    let max_y = packer.placed.iter().map(Rect::bottom).max().unwrap_or(0);
    // Blocks wider than the available width shrink the offset so they still
    // end inside the container.
    let offset_x = options
        .gutter_x
        .saturating_add(packer.available.saturating_sub(max_x) / 2)
        .min(options.container_width.saturating_sub(max_x));

    let placements = packer
        .placed
        .iter()
        .enumerate()
        .map(|(index, rect)| Placement {
            index,
            x: rect.x.saturating_add(offset_x),
            y: rect.y,
            width: rect.width,
            height: rect.height,
        })
        .collect();

    PackResult {
        placements,
        container_height: max_y
            .saturating_add(options.gutter_y)
            .saturating_add(options.padding),
        offset_x,
    }
}
