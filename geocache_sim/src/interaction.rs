//! Pick-up / merge state machine for a single cache.
//!
//! A cache is either `Present(v)` or `Empty` (see [`cache_state`]). Activating
//! a cell within range transitions it:
//!
//! - `Present(v)`, empty hands  → `Empty`, player carries `v`
//! - `Present(v)`, carrying `v` → `Present(2v)`, hands emptied
//! - `Present(v)`, carrying `w` → unchanged (mismatched merge)
//! - `Present(v)`, carrying `v`, `2v` past `u32` → unchanged
//! - `Empty`                    → unchanged
//!
//! Out-of-range activations are ignored. Ignored activations leave the player
//! and the store exactly as they were.

use bevy::prelude::Resource;

use crate::coords::{CellCoord, CellGrid};
use crate::field::CacheSpawner;
use crate::grid_store::{cache_state, CacheState, GridStore};
use crate::player::PlayerState;

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct InteractionRules {
    /// Activations at a distance `>= range` (cell units) are ignored.
    pub range: f64,
    pub score_goal: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionOutcome {
    PickedUp {
        cell: CellCoord,
        value: u32,
    },
    Merged {
        cell: CellCoord,
        value: u32,
        goal_reached: bool,
    },
    OutOfRange {
        cell: CellCoord,
        distance: f64,
    },
    Mismatch {
        cell: CellCoord,
        carried: u32,
        cache: u32,
    },
    NothingHere {
        cell: CellCoord,
    },
    /// Doubling `value` does not fit in a `u32`.
    Overflow {
        cell: CellCoord,
        value: u32,
    },
}

impl InteractionOutcome {
    pub fn cell(&self) -> CellCoord {
        match *self {
            InteractionOutcome::PickedUp { cell, .. }
            | InteractionOutcome::Merged { cell, .. }
            | InteractionOutcome::OutOfRange { cell, .. }
            | InteractionOutcome::Mismatch { cell, .. }
            | InteractionOutcome::NothingHere { cell }
            | InteractionOutcome::Overflow { cell, .. } => cell,
        }
    }

    /// True when the player's inventory and the store were updated.
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            InteractionOutcome::PickedUp { .. } | InteractionOutcome::Merged { .. }
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionOutcome::PickedUp { .. } => "picked_up",
            InteractionOutcome::Merged { .. } => "merged",
            InteractionOutcome::OutOfRange { .. } => "out_of_range",
            InteractionOutcome::Mismatch { .. } => "mismatch",
            InteractionOutcome::NothingHere { .. } => "nothing_here",
            InteractionOutcome::Overflow { .. } => "overflow",
        }
    }
}

pub fn resolve_interaction(
    cell: CellCoord,
    player: &mut PlayerState,
    store: &mut GridStore,
    spawner: &CacheSpawner,
    grid: &CellGrid,
    rules: &InteractionRules,
) -> InteractionOutcome {
    let distance = player.distance_to(cell, grid);
    if distance >= rules.range {
        return InteractionOutcome::OutOfRange { cell, distance };
    }

    let value = match cache_state(cell, store, spawner) {
        CacheState::Empty => return InteractionOutcome::NothingHere { cell },
        CacheState::Present(value) => value,
    };

    match player.inventory() {
        0 => {
            store.set(cell, 0);
            player.set_inventory(value);
            InteractionOutcome::PickedUp { cell, value }
        }
        carried if carried == value => {
            let Some(merged) = value.checked_mul(2) else {
                return InteractionOutcome::Overflow { cell, value };
            };
            store.set(cell, merged);
            player.set_inventory(0);
            InteractionOutcome::Merged {
                cell,
                value: merged,
                goal_reached: merged >= rules.score_goal,
            }
        }
        carried => InteractionOutcome::Mismatch {
            cell,
            carried,
            cache: value,
        },
    }
}
