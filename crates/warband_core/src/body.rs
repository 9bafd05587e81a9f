//! Unit equipment: part kinds, costs, and the role → body table.
//!
//! A body is an ordered multiset of parts. The production scheduler resolves
//! a request's body from [`Body::for_role`], which scales a per-role base
//! layout by tier.

use serde::{Deserialize, Serialize};

use crate::components::Role;

/// Largest body the base can produce.
pub const MAX_BODY_PARTS: usize = 50;

/// Kind of a single body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartKind {
    /// Movement.
    Move,
    /// Construction / repair work.
    Work,
    /// Resource cargo.
    Carry,
    /// Melee attack.
    Attack,
    /// Ranged attack.
    RangedAttack,
    /// Healing.
    Heal,
    /// Armor plating.
    Tough,
}

impl PartKind {
    /// Resource cost of producing one part of this kind.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Move => 50,
            Self::Work => 100,
            Self::Carry => 50,
            Self::Attack => 80,
            Self::RangedAttack => 150,
            Self::Heal => 250,
            Self::Tough => 10,
        }
    }
}

/// Per-role layout: the tier-1 body and the segment appended per extra tier.
struct BodyTemplate {
    base: &'static [PartKind],
    growth: &'static [PartKind],
}

use PartKind::{Attack, Carry, Heal, Move, RangedAttack};

const HARVESTER_TEMPLATE: BodyTemplate = BodyTemplate {
    base: &[Move, Move, Carry],
    growth: &[Move, Carry],
};

const ATTACKER_TEMPLATE: BodyTemplate = BodyTemplate {
    base: &[Move, Move, Move, Attack, Attack, Heal],
    growth: &[Move, Attack],
};

const RANGED_TEMPLATE: BodyTemplate = BodyTemplate {
    base: &[Move, Move, RangedAttack, Heal],
    growth: &[Move, Move, RangedAttack],
};

const GENERIC_TEMPLATE: BodyTemplate = BodyTemplate {
    base: &[Move],
    growth: &[Move],
};

const fn template(role: Role) -> &'static BodyTemplate {
    match role {
        Role::Harvester => &HARVESTER_TEMPLATE,
        Role::Attacker => &ATTACKER_TEMPLATE,
        Role::RangedAttacker => &RANGED_TEMPLATE,
        Role::Generic => &GENERIC_TEMPLATE,
    }
}

/// Ordered multiset of body parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Body(Vec<PartKind>);

impl Body {
    /// Create a body from parts in order.
    #[must_use]
    pub fn new(parts: Vec<PartKind>) -> Self {
        Self(parts)
    }

    /// Resolve the body produced for `role` at `tier`.
    ///
    /// Tier 0 is treated as tier 1. Growth segments stop being appended once
    /// the next one would exceed [`MAX_BODY_PARTS`].
    #[must_use]
    pub fn for_role(role: Role, tier: u8) -> Self {
        let template = template(role);
        let mut parts = template.base.to_vec();
        for _ in 1..tier.max(1) {
            if parts.len() + template.growth.len() > MAX_BODY_PARTS {
                break;
            }
            parts.extend_from_slice(template.growth);
        }
        Self(parts)
    }

    /// Parts in production order.
    #[must_use]
    pub fn parts(&self) -> &[PartKind] {
        &self.0
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the body has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the body contains at least one part of `kind`.
    #[must_use]
    pub fn has(&self, kind: PartKind) -> bool {
        self.0.contains(&kind)
    }

    /// Number of parts of `kind`.
    #[must_use]
    pub fn count(&self, kind: PartKind) -> usize {
        self.0.iter().filter(|&&part| part == kind).count()
    }

    /// Total production cost.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.0.iter().map(|part| part.cost()).sum()
    }

    /// Check if the body can fight in melee or at range.
    #[must_use]
    pub fn can_fight(&self) -> bool {
        self.has(PartKind::Attack) || self.has(PartKind::RangedAttack)
    }

    /// Role a unit without stamped memory behaves as.
    ///
    /// Cargo wins over weapons, matching how unstamped units were always
    /// treated as workers first.
    #[must_use]
    pub fn inferred_role(&self) -> Role {
        if self.has(PartKind::Carry) {
            Role::Harvester
        } else if self.has(PartKind::RangedAttack) {
            Role::RangedAttacker
        } else if self.has(PartKind::Attack) {
            Role::Attacker
        } else {
            Role::Generic
        }
    }
}

impl From<Vec<PartKind>> for Body {
    fn from(parts: Vec<PartKind>) -> Self {
        Self(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_costs() {
        let body = Body::new(vec![Move, Move, Carry]);
        assert_eq!(body.cost(), 150);

        let body = Body::new(vec![RangedAttack, Heal, PartKind::Tough, PartKind::Work]);
        assert_eq!(body.cost(), 150 + 250 + 10 + 100);
    }

    #[test]
    fn test_harvester_tier_one_matches_table() {
        let body = Body::for_role(Role::Harvester, 1);
        assert_eq!(body.parts(), &[Move, Move, Carry]);
        assert_eq!(body.cost(), 150);

        // Tier 0 is clamped to tier 1
        assert_eq!(Body::for_role(Role::Harvester, 0), body);
    }

    #[test]
    fn test_tier_scaling_appends_growth() {
        let tier1 = Body::for_role(Role::RangedAttacker, 1);
        let tier3 = Body::for_role(Role::RangedAttacker, 3);
        assert_eq!(tier3.len(), tier1.len() + 6);
        assert_eq!(tier3.count(RangedAttack), 3);
        assert_eq!(&tier3.parts()[..tier1.len()], tier1.parts());
    }

    #[test]
    fn test_body_size_is_capped() {
        let body = Body::for_role(Role::Attacker, u8::MAX);
        assert!(body.len() <= MAX_BODY_PARTS);
    }

    #[test]
    fn test_inferred_role() {
        assert_eq!(Body::new(vec![Move, Carry]).inferred_role(), Role::Harvester);
        assert_eq!(
            Body::new(vec![Move, RangedAttack, Attack]).inferred_role(),
            Role::RangedAttacker
        );
        assert_eq!(Body::new(vec![Move, Attack]).inferred_role(), Role::Attacker);
        assert_eq!(Body::new(vec![Move, Heal]).inferred_role(), Role::Generic);
    }
}
