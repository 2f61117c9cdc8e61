use std::collections::HashMap;

use bevy::prelude::Resource;

use crate::coords::CellCoord;
use crate::field::CacheSpawner;

/// Sparse record of every cell whose cache has been touched.
///
/// Absence means "use the generated default". An entry holding `0` means the
/// cache was emptied and the cell must never regenerate one.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct GridStore {
    cells: HashMap<CellCoord, u32>,
}

impl GridStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: CellCoord) -> Option<u32> {
        self.cells.get(&cell).copied()
    }

    pub fn set(&mut self, cell: CellCoord, value: u32) {
        self.cells.insert(cell, value);
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains_key(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Overrides in row-major cell order.
    pub fn overrides(&self) -> Vec<(CellCoord, u32)> {
        let mut entries: Vec<_> = self.cells.iter().map(|(c, v)| (*c, *v)).collect();
        entries.sort_unstable_by_key(|(cell, _)| *cell);
        entries
    }
}

/// What a player finds at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Present(u32),
    Empty,
}

impl CacheState {
    pub fn value(self) -> Option<u32> {
        match self {
            CacheState::Present(value) => Some(value),
            CacheState::Empty => None,
        }
    }
}

/// Store override first, generated default second.
pub fn cache_state(cell: CellCoord, store: &GridStore, spawner: &CacheSpawner) -> CacheState {
    match store.get(cell) {
        Some(0) => CacheState::Empty,
        Some(value) => CacheState::Present(value),
        None => spawner
            .default_cache(cell)
            .map_or(CacheState::Empty, CacheState::Present),
    }
}
