use bevy::prelude::Resource;

pub use geocache_proto::{CellCoord, LatLng};

/// Fraction of a cell treated as "already across the boundary". Whole-tile
/// steps accumulate floating-point drift, which would otherwise floor a
/// position sitting exactly on a tile edge into the previous cell.
const CELL_SNAP_EPSILON: f64 = 1e-6;

/// Real-world rectangle covered by a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl CellBounds {
    pub fn contains(&self, position: LatLng) -> bool {
        position.lat >= self.south_west.lat
            && position.lat < self.north_east.lat
            && position.lng >= self.south_west.lng
            && position.lng < self.north_east.lng
    }
}

/// The integer lattice laid over the map, anchored at `origin`.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct CellGrid {
    origin: LatLng,
    tile_degrees: f64,
}

impl CellGrid {
    pub fn new(origin: LatLng, tile_degrees: f64) -> Self {
        Self {
            origin,
            tile_degrees,
        }
    }

    pub fn origin(&self) -> LatLng {
        self.origin
    }

    pub fn tile_degrees(&self) -> f64 {
        self.tile_degrees
    }

    /// Floor-divide a position onto the lattice.
    pub fn cell_for(&self, position: LatLng) -> CellCoord {
        CellCoord::new(
            self.axis_index(position.lat - self.origin.lat),
            self.axis_index(position.lng - self.origin.lng),
        )
    }

    #[inline]
    fn axis_index(&self, offset: f64) -> i32 {
        (offset / self.tile_degrees + CELL_SNAP_EPSILON).floor() as i32
    }

    pub fn cell_bounds(&self, cell: CellCoord) -> CellBounds {
        let t = self.tile_degrees;
        CellBounds {
            south_west: LatLng::new(
                self.origin.lat + f64::from(cell.i) * t,
                self.origin.lng + f64::from(cell.j) * t,
            ),
            north_east: LatLng::new(
                self.origin.lat + f64::from(cell.i + 1) * t,
                self.origin.lng + f64::from(cell.j + 1) * t,
            ),
        }
    }

    pub fn cell_center(&self, cell: CellCoord) -> LatLng {
        let t = self.tile_degrees;
        LatLng::new(
            self.origin.lat + (f64::from(cell.i) + 0.5) * t,
            self.origin.lng + (f64::from(cell.j) + 0.5) * t,
        )
    }
}
