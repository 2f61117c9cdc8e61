use std::collections::BTreeMap;

use bevy::prelude::Resource;

use crate::coords::{CellCoord, LatLng};
use crate::field::CacheSpawner;
use crate::grid_store::{cache_state, GridStore};

/// Where the map is currently looking.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
    dirty: bool,
}

impl Viewport {
    /// A fresh viewport starts dirty so the first frame populates it.
    pub fn new(center: LatLng, zoom: u8) -> Self {
        Self {
            center,
            zoom,
            dirty: true,
        }
    }

    pub fn recenter(&mut self, center: LatLng) {
        self.center = center;
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Caches materialised around the current viewport, rebuilt wholesale on
/// every regeneration.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct VisibleCaches {
    caches: BTreeMap<CellCoord, u32>,
    center: CellCoord,
    radius: u32,
    generation: u64,
}

impl VisibleCaches {
    pub fn get(&self, cell: CellCoord) -> Option<u32> {
        self.caches.get(&cell).copied()
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        self.caches.contains_key(&cell)
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Row-major iteration over `(cell, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, u32)> + '_ {
        self.caches.iter().map(|(cell, value)| (*cell, *value))
    }

    pub fn cells(&self) -> &BTreeMap<CellCoord, u32> {
        &self.caches
    }

    pub fn center(&self) -> CellCoord {
        self.center
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Number of regenerations applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn replace(
        &mut self,
        center: CellCoord,
        radius: u32,
        caches: BTreeMap<CellCoord, u32>,
    ) {
        self.caches = caches;
        self.center = center;
        self.radius = radius;
        self.generation += 1;
    }
}

/// Every cache in `[c.i - r, c.i + r) x [c.j - r, c.j + r)`.
pub fn regenerate_visible(
    center: CellCoord,
    radius: u32,
    store: &GridStore,
    spawner: &CacheSpawner,
) -> BTreeMap<CellCoord, u32> {
    let r = i32::try_from(radius).unwrap_or(i32::MAX);
    let mut caches = BTreeMap::new();
    for i in center.i.saturating_sub(r)..center.i.saturating_add(r) {
        for j in center.j.saturating_sub(r)..center.j.saturating_add(r) {
            let cell = CellCoord::new(i, j);
            if let Some(value) = cache_state(cell, store, spawner).value() {
                caches.insert(cell, value);
            }
        }
    }
    caches
}
