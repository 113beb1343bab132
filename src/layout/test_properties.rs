//! Property-based tests for the masonry packer.
//!
//! Uses `proptest` for arbitrary block sets and seeded `rand` fixtures for a
//! few larger dashboards: no two placements overlap, every placement stays
//! inside the container, and packing is a pure function of its input.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::masonry::{BlockSize, PackOptions, PackResult, pack};

// ──────────────────── strategies ────────────────────

fn arb_options() -> impl Strategy<Value = PackOptions> {
    (100u32..1600, 0u32..20, 0u32..20, 0u32..10).prop_map(
        |(container_width, gutter_x, gutter_y, padding)| PackOptions {
            container_width,
            gutter_x,
            gutter_y,
            padding,
        },
    )
}

/// Blocks up to the full container width, including ones that only fit by
/// eating into the side gutters.
fn arb_blocks(options: PackOptions) -> impl Strategy<Value = Vec<BlockSize>> {
    let max_width = options.container_width;
    prop::collection::vec(
        (1u32..=max_width, 1u32..400).prop_map(|(w, h)| BlockSize::new(w, h)),
        0..24,
    )
}

fn arb_case() -> impl Strategy<Value = (PackOptions, Vec<BlockSize>)> {
    arb_options().prop_flat_map(|options| (Just(options), arb_blocks(options)))
}

fn assert_packing_invariants(blocks: &[BlockSize], options: &PackOptions, result: &PackResult) {
    assert_eq!(result.placements.len(), blocks.len());
    for (i, a) in result.placements.iter().enumerate() {
        assert_eq!(a.index, i);
        assert_eq!((a.width, a.height), (blocks[i].width, blocks[i].height));
        assert!(
            a.right() <= options.container_width,
            "placement {i} ends at {} past container {}",
            a.right(),
            options.container_width
        );
        assert!(a.bottom() <= result.container_height);
        for b in &result.placements[i + 1..] {
            assert!(!a.overlaps(b), "placements overlap: {a:?} and {b:?}");
        }
    }
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn packing_never_overlaps((options, blocks) in arb_case()) {
        let result = pack(&blocks, &options);
        assert_packing_invariants(&blocks, &options, &result);
    }

    #[test]
    fn packing_is_deterministic((options, blocks) in arb_case()) {
        prop_assert_eq!(pack(&blocks, &options), pack(&blocks, &options));
    }

    /// Identical blocks fill the first row left to right before wrapping.
    #[test]
    fn uniform_blocks_fill_rows(
        options in arb_options(),
        count in 1usize..12,
        height in 1u32..100,
    ) {
        let width = (options.available_width() / 4).max(1);
        let blocks = vec![BlockSize::new(width, height); count];
        let result = pack(&blocks, &options);
        let first_row = result.placements.iter().filter(|p| p.y == 0).count();
        let step = width + options.gutter_x;
        let fit = ((options.available_width() + options.gutter_x) / step).max(1) as usize;
        prop_assert_eq!(first_row, count.min(fit));
    }
}

#[test]
fn seeded_dashboards_pack_cleanly() {
    for seed in 0..32u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let options = PackOptions {
            container_width: rng.random_range(320..1920),
            gutter_x: 6,
            gutter_y: 6,
            padding: 4,
        };
        let max_width = options.container_width;
        let blocks: Vec<BlockSize> = (0..rng.random_range(1..60))
            .map(|_| {
                BlockSize::new(
                    rng.random_range(48..=max_width),
                    rng.random_range(24..600),
                )
            })
            .collect();
        let result = pack(&blocks, &options);
        assert_packing_invariants(&blocks, &options, &result);
    }
}
