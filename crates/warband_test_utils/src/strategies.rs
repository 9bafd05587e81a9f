//! Proptest strategies.
//!
//! These generate random but reproducible inputs for property-based tests of
//! targeting, production and squad bookkeeping.

use proptest::prelude::*;
use warband_core::components::Role;
use warband_core::math::{Fixed, TilePos};
use warband_core::production::ProductionRequest;
use warband_core::snapshot::{Target, TargetKind};

/// A tile on a 100x100 map.
pub fn arb_tile() -> impl Strategy<Value = TilePos> {
    (0i32..100, 0i32..100).prop_map(|(x, y)| TilePos::new(x, y))
}

/// Any target class.
pub fn arb_target_kind() -> impl Strategy<Value = TargetKind> {
    prop_oneof![
        Just(TargetKind::ProductionFacility),
        Just(TargetKind::Healer),
        Just(TargetKind::Worker),
        Just(TargetKind::Attacker),
        Just(TargetKind::Other),
    ]
}

/// A list of targets with distinct ids.
pub fn arb_targets(max_len: usize) -> impl Strategy<Value = Vec<Target>> {
    proptest::collection::vec((arb_tile(), arb_target_kind()), 0..max_len).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(index, (position, kind))| Target {
                id: 1000 + index as u64,
                position,
                kind,
            })
            .collect()
    })
}

/// A distance weight between 0 and 4.
pub fn arb_distance_weight() -> impl Strategy<Value = Fixed> {
    (0i32..=16).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4))
}

/// Any role that can be produced.
pub fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Harvester),
        Just(Role::Attacker),
        Just(Role::RangedAttacker),
    ]
}

/// A production request with a low tier.
pub fn arb_request() -> impl Strategy<Value = ProductionRequest> {
    (arb_role(), 1u8..4, 0u64..10_000).prop_map(|(role, tier, tick)| ProductionRequest::new(role, tier, tick))
}

/// Subset of squad members that die, as a bit mask over `members` units.
pub fn arb_deaths(members: usize) -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), members)
}
