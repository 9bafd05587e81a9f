//! Target selection strategies.
//!
//! Two strategies are kept side by side:
//!
//! - [`weighted_priority`] scores every candidate as
//!   `role_weight - distance_weight * range` and is what squad leaders use.
//! - [`nearest_by_path`] picks the cheapest candidate under a [`PathCost`]
//!   metric and is the fallback for units acting alone.
//!
//! Both are pure functions of their arguments. Ties always go to the
//! candidate that comes first in input order.

use crate::config::RoleWeights;
use crate::math::{Fixed, TilePos};
use crate::snapshot::{Target, TargetKind};

/// Metric used to rank candidates by travel cost.
pub trait PathCost {
    /// Cost of travelling from `from` to `to`, or `None` when unreachable.
    fn cost(&self, from: TilePos, to: TilePos) -> Option<u32>;
}

/// Straight-line grid range. The default metric on an open map.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChebyshevRange;

impl PathCost for ChebyshevRange {
    fn cost(&self, from: TilePos, to: TilePos) -> Option<u32> {
        Some(from.range_to(to))
    }
}

impl<F: Fn(TilePos, TilePos) -> Option<u32>> PathCost for F {
    fn cost(&self, from: TilePos, to: TilePos) -> Option<u32> {
        self(from, to)
    }
}

/// Base weight of a target class.
#[must_use]
pub const fn role_weight(kind: TargetKind, weights: &RoleWeights) -> i32 {
    match kind {
        TargetKind::ProductionFacility => weights.facility,
        TargetKind::Healer => weights.healer,
        TargetKind::Worker => weights.worker,
        TargetKind::Attacker => weights.attacker,
        TargetKind::Other => weights.other,
    }
}

/// Weighted score of `target` seen from `from`.
#[must_use]
pub fn score(from: TilePos, target: &Target, weights: &RoleWeights, distance_weight: Fixed) -> Fixed {
    let base = Fixed::from_num(role_weight(target.kind, weights));
    let range = Fixed::saturating_from_num(from.range_to(target.position));
    base.saturating_sub(distance_weight.saturating_mul(range))
}

/// Highest-scoring target, or `None` when there are no candidates.
#[must_use]
pub fn weighted_priority<'a>(
    from: TilePos,
    candidates: &'a [Target],
    weights: &RoleWeights,
    distance_weight: Fixed,
) -> Option<&'a Target> {
    let mut best: Option<(&Target, Fixed)> = None;
    for candidate in candidates {
        let value = score(from, candidate, weights, distance_weight);
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((candidate, value)),
        }
    }
    best.map(|(target, _)| target)
}

/// Cheapest candidate under `metric`. Unreachable candidates are skipped.
pub fn nearest_by_path<'a, T, I, P>(
    from: TilePos,
    candidates: I,
    position: impl Fn(&T) -> TilePos,
    metric: &P,
) -> Option<&'a T>
where
    I: IntoIterator<Item = &'a T>,
    T: 'a,
    P: PathCost + ?Sized,
{
    let mut best: Option<(&T, u32)> = None;
    for candidate in candidates {
        let Some(cost) = metric.cost(from, position(candidate)) else {
            continue;
        };
        match best {
            Some((_, lowest)) if cost >= lowest => {}
            _ => best = Some((candidate, cost)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: u64, x: i32, kind: TargetKind) -> Target {
        Target {
            id,
            position: TilePos::new(x, 0),
            kind,
        }
    }

    #[test]
    fn test_score_formula() {
        let weights = RoleWeights::default();
        let healer = target(1, 4, TargetKind::Healer);
        let value = score(TilePos::new(0, 0), &healer, &weights, Fixed::from_num(0.5));
        assert_eq!(value, Fixed::from_num(1));
    }

    #[test]
    fn test_weighted_priority_prefers_value_over_distance() {
        let weights = RoleWeights::default();
        let candidates = [
            target(1, 1, TargetKind::Attacker),
            target(2, 2, TargetKind::Healer),
        ];
        let best = weighted_priority(TilePos::new(0, 0), &candidates, &weights, Fixed::from_num(0.5));
        assert_eq!(best.map(|t| t.id), Some(2));
    }

    #[test]
    fn test_weighted_priority_ties_go_to_first() {
        let weights = RoleWeights::default();
        let candidates = [
            target(7, 3, TargetKind::Healer),
            target(8, -3, TargetKind::Healer),
        ];
        let best = weighted_priority(TilePos::new(0, 0), &candidates, &weights, Fixed::from_num(0.5));
        assert_eq!(best.map(|t| t.id), Some(7));
        assert!(weighted_priority(TilePos::new(0, 0), &[], &weights, Fixed::ZERO).is_none());
    }

    #[test]
    fn test_nearest_by_path_skips_unreachable() {
        let candidates = [
            target(1, 2, TargetKind::Other),
            target(2, 5, TargetKind::Other),
            target(3, 5, TargetKind::Other),
        ];
        let nearest = nearest_by_path(TilePos::new(0, 0), &candidates, |t| t.position, &ChebyshevRange);
        assert_eq!(nearest.map(|t| t.id), Some(1));

        let walled = |_from: TilePos, to: TilePos| (to.x != 2).then_some(to.x.unsigned_abs());
        let nearest = nearest_by_path(TilePos::new(0, 0), &candidates, |t| t.position, &walled);
        assert_eq!(nearest.map(|t| t.id), Some(2));
    }
}
