//! Harvester resource cycle.
//!
//! A harvester alternates between two phases decided by its cargo: while
//! there is free capacity it withdraws from the nearest storage node that
//! still holds resource, and once full it transfers everything to the base.

use crate::behavior::{Action, Attempt, TurnContext};
use crate::error::ActionError;
use crate::host::ActionApi;
use crate::snapshot::UnitView;
use crate::targeting::nearest_by_path;

/// Phase of the cycle, derived from cargo every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestPhase {
    /// Filling cargo at a storage node.
    Collect,
    /// Delivering cargo to the base.
    Deliver,
}

impl HarvestPhase {
    /// Phase for a unit with the given cargo.
    #[must_use]
    pub fn of(unit: &UnitView) -> Self {
        if unit.cargo.is_full() {
            Self::Deliver
        } else {
            Self::Collect
        }
    }
}

/// Run one step of the cycle.
pub fn harvest(unit: &UnitView, ctx: &TurnContext<'_>, api: &mut dyn ActionApi) -> Attempt {
    match HarvestPhase::of(unit) {
        HarvestPhase::Collect => collect(unit, ctx, api),
        HarvestPhase::Deliver => deliver(unit, ctx, api),
    }
}

fn collect(unit: &UnitView, ctx: &TurnContext<'_>, api: &mut dyn ActionApi) -> Attempt {
    let source = nearest_by_path(
        unit.position,
        ctx.snapshot.stocked_storages(),
        |storage| storage.position,
        ctx.path,
    );
    let Some(source) = source else {
        // Nothing left to collect: bring home whatever we carry.
        if unit.cargo.is_empty() {
            return Attempt::done(Action::Idle);
        }
        return deliver(unit, ctx, api);
    };

    let code = api.withdraw(unit.id, source.id);
    match code.into_result() {
        Ok(()) => Attempt::done(Action::Withdraw { source: source.id }),
        Err(ActionError::Range) => {
            api.move_toward(unit.id, source.position);
            Attempt::done(Action::Move {
                to: source.position,
            })
        }
        Err(error) => idle_on(unit, Action::Withdraw { source: source.id }, error),
    }
}

fn deliver(unit: &UnitView, ctx: &TurnContext<'_>, api: &mut dyn ActionApi) -> Attempt {
    let Some(base) = ctx.snapshot.own_base else {
        return Attempt::done(Action::Idle);
    };
    let base = base.structure;

    if base.store.is_full() {
        if !unit.position.in_range_of(base.position, 1) {
            api.move_toward(unit.id, base.position);
            return Attempt::done(Action::Move { to: base.position });
        }
        return Attempt::done(Action::Hold);
    }

    let code = api.transfer(unit.id, base.id);
    match code.into_result() {
        Ok(()) => Attempt::done(Action::Transfer {
            destination: base.id,
        }),
        Err(ActionError::Range) => {
            api.move_toward(unit.id, base.position);
            Attempt::done(Action::Move { to: base.position })
        }
        Err(error) => idle_on(unit, Action::Transfer { destination: base.id }, error),
    }
}

fn idle_on(unit: &UnitView, attempted: Action, error: ActionError) -> Attempt {
    match error {
        ActionError::Resource | ActionError::Capacity => {
            tracing::debug!(unit = unit.id, %error, ?attempted, "harvest step skipped");
        }
        _ => {
            tracing::warn!(unit = unit.id, %error, ?attempted, "harvest step failed");
        }
    }
    Attempt::failed(attempted, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, PartKind};
    use crate::components::Store;
    use crate::math::TilePos;
    use crate::memory::UnitMemory;

    fn harvester(used: u32) -> UnitView {
        UnitView {
            id: 1,
            position: TilePos::new(0, 0),
            hits: 100,
            hits_max: 100,
            body: Body::new(vec![PartKind::Move, PartKind::Carry]),
            cargo: Store::new(used, 50),
            spawning: false,
            memory: UnitMemory::default(),
        }
    }

    #[test]
    fn test_phase_follows_cargo() {
        assert_eq!(HarvestPhase::of(&harvester(0)), HarvestPhase::Collect);
        assert_eq!(HarvestPhase::of(&harvester(20)), HarvestPhase::Collect);
        assert_eq!(HarvestPhase::of(&harvester(50)), HarvestPhase::Deliver);
    }
}
