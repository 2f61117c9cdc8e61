//! Data contracts shared by the geocache simulation, its command surface and
//! whatever render adapter sits on top of them.
//!
//! Nothing in here depends on Bevy; the types are plain serde structs so a
//! browser or terminal front-end can decode snapshots without the core.

use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::num::ParseIntError;
use std::ops::Add;
use std::str::FromStr;

use ahash::RandomState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A continuous real-world position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl Add for LatLng {
    type Output = LatLng;

    fn add(self, rhs: LatLng) -> LatLng {
        LatLng::new(self.lat + rhs.lat, self.lng + rhs.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Integer lattice coordinate of a map tile. `i` follows latitude, `j` longitude.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct CellCoord {
    pub i: i32,
    pub j: i32,
}

impl CellCoord {
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Euclidean distance in cell units.
    pub fn distance(self, other: CellCoord) -> f64 {
        let di = f64::from(self.i) - f64::from(other.i);
        let dj = f64::from(self.j) - f64::from(other.j);
        (di * di + dj * dj).sqrt()
    }
}

/// Renders as `"i,j"`, the same key the grid store uses when serialised.
impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.i, self.j)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CellParseError {
    #[error("cell key '{0}' is not of the form i,j")]
    Shape(String),
    #[error("invalid cell component '{value}': {source}")]
    Component {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl FromStr for CellCoord {
    type Err = CellParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (i, j) = s
            .split_once(',')
            .ok_or_else(|| CellParseError::Shape(s.to_string()))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|source| CellParseError::Component {
                    value: part.to_string(),
                    source,
                })
        };
        Ok(CellCoord::new(parse(i)?, parse(j)?))
    }
}

/// Four-directional manual movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Real-world offset of a single step of `step_degrees`.
    pub fn offset(self, step_degrees: f64) -> LatLng {
        match self {
            Direction::North => LatLng::new(step_degrees, 0.0),
            Direction::South => LatLng::new(-step_degrees, 0.0),
            Direction::East => LatLng::new(0.0, step_degrees),
            Direction::West => LatLng::new(0.0, -step_degrees),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

/// Which input source currently owns the player position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    #[default]
    Manual,
    Sensor,
}

impl MovementMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementMode::Manual => "manual",
            MovementMode::Sensor => "sensor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleCacheState {
    pub cell: CellCoord,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ViewHeader {
    pub frame: u64,
    pub generation: u64,
    pub center: CellCoord,
    pub radius: u32,
    pub cache_count: u32,
    pub inventory: u32,
    pub hash: u64,
}

impl ViewHeader {
    pub fn new(
        frame: u64,
        generation: u64,
        center: CellCoord,
        radius: u32,
        cache_count: usize,
        inventory: u32,
    ) -> Self {
        Self {
            frame,
            generation,
            center,
            radius,
            cache_count: cache_count as u32,
            inventory,
            hash: 0,
        }
    }
}

/// Everything a render adapter needs to redraw the cache layer from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub header: ViewHeader,
    pub player: LatLng,
    pub caches: Vec<VisibleCacheState>,
}

/// Marker changes relative to the previous snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ViewDelta {
    pub generation: u64,
    pub upserted: Vec<VisibleCacheState>,
    pub removed: Vec<CellCoord>,
}

impl ViewDelta {
    pub fn is_empty(&self) -> bool {
        self.upserted.is_empty() && self.removed.is_empty()
    }
}

impl ViewSnapshot {
    pub fn finalize(mut self) -> Self {
        self.header.hash = hash_snapshot(&self);
        self
    }
}

/// Content hash that ignores the frame counter, so two sessions that reach
/// the same world state through different frame counts still compare equal.
pub fn hash_snapshot(snapshot: &ViewSnapshot) -> u64 {
    let mut clone = snapshot.clone();
    clone.header.hash = 0;
    clone.header.frame = 0;
    let encoded = bincode::serialize(&clone).expect("snapshot serialization for hashing");
    let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
    hasher.write(&encoded);
    hasher.finish()
}

pub fn encode_snapshot(snapshot: &ViewSnapshot) -> bincode::Result<Vec<u8>> {
    bincode::serialize(snapshot)
}

pub fn decode_snapshot(data: &[u8]) -> bincode::Result<ViewSnapshot> {
    bincode::deserialize(data)
}

pub fn encode_snapshot_json(snapshot: &ViewSnapshot) -> serde_json::Result<String> {
    serde_json::to_string(snapshot)
}

pub fn decode_snapshot_json(data: &str) -> serde_json::Result<ViewSnapshot> {
    serde_json::from_str(data)
}

pub fn encode_delta_json(delta: &ViewDelta) -> serde_json::Result<String> {
    serde_json::to_string(delta)
}

pub fn decode_delta_json(data: &str) -> serde_json::Result<ViewDelta> {
    serde_json::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot(frame: u64) -> ViewSnapshot {
        ViewSnapshot {
            header: ViewHeader::new(frame, 3, CellCoord::new(0, 0), 25, 2, 4),
            player: LatLng::new(36.99, -122.05),
            caches: vec![
                VisibleCacheState {
                    cell: CellCoord::new(0, 1),
                    value: 2,
                },
                VisibleCacheState {
                    cell: CellCoord::new(3, 0),
                    value: 8,
                },
            ],
        }
    }

    #[test]
    fn cell_key_parses_negative_components() {
        let cell: CellCoord = "-4,-2".parse().unwrap();
        assert_eq!(cell, CellCoord::new(-4, -2));
        assert_eq!(cell.to_string(), "-4,-2");
    }

    #[test]
    fn cell_key_rejects_garbage() {
        assert!(matches!(
            "12".parse::<CellCoord>(),
            Err(CellParseError::Shape(_))
        ));
        assert!(matches!(
            "1,x".parse::<CellCoord>(),
            Err(CellParseError::Component { .. })
        ));
    }

    #[test]
    fn cell_distance_is_euclidean() {
        let origin = CellCoord::new(0, 0);
        assert_eq!(origin.distance(CellCoord::new(3, 4)), 5.0);
        assert_eq!(CellCoord::new(-1, 2).distance(CellCoord::new(-1, 2)), 0.0);
    }

    #[test]
    fn direction_offsets_move_one_step() {
        let step = 1e-4;
        assert_eq!(Direction::North.offset(step), LatLng::new(step, 0.0));
        assert_eq!(Direction::West.offset(step), LatLng::new(0.0, -step));
    }

    #[test]
    fn snapshot_hash_ignores_frame_counter() {
        let a = sample_snapshot(10).finalize();
        let b = sample_snapshot(42).finalize();
        assert_eq!(a.header.hash, b.header.hash);

        let mut c = sample_snapshot(10);
        c.caches[0].value = 4;
        assert_ne!(a.header.hash, c.finalize().header.hash);
    }

    #[test]
    fn snapshot_json_survives_decode() {
        let snapshot = sample_snapshot(1).finalize();
        let json = encode_snapshot_json(&snapshot).unwrap();
        let decoded = decode_snapshot_json(&json).unwrap();
        assert_eq!(decoded.caches, snapshot.caches);
        assert_eq!(decoded.header.hash, snapshot.header.hash);
    }
}
