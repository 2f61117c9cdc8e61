use bevy::prelude::Resource;

use crate::coords::{CellCoord, CellGrid, LatLng};
use geocache_proto::Direction;

/// Player position and the single carried cache value (0 = empty hands).
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct PlayerState {
    position: LatLng,
    inventory: u32,
}

impl PlayerState {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            inventory: 0,
        }
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn inventory(&self) -> u32 {
        self.inventory
    }

    pub fn is_carrying(&self) -> bool {
        self.inventory != 0
    }

    /// Unbounded relative move.
    pub fn move_by(&mut self, delta: LatLng) {
        self.position = self.position + delta;
    }

    pub fn step(&mut self, direction: Direction, step_degrees: f64) {
        self.move_by(direction.offset(step_degrees));
    }

    pub fn set_position(&mut self, position: LatLng) {
        self.position = position;
    }

    pub fn cell(&self, grid: &CellGrid) -> CellCoord {
        grid.cell_for(self.position)
    }

    /// Distance in cell units between the player's cell and `cell`.
    pub fn distance_to(&self, cell: CellCoord, grid: &CellGrid) -> f64 {
        self.cell(grid).distance(cell)
    }

    pub(crate) fn set_inventory(&mut self, value: u32) {
        self.inventory = value;
    }
}
