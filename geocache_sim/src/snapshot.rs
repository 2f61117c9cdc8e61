use std::collections::BTreeMap;

use bevy::prelude::*;
use geocache_proto::{
    encode_delta_json, encode_snapshot, CellCoord, ViewDelta, ViewHeader, ViewSnapshot,
    VisibleCacheState,
};
use tracing::warn;

use crate::{player::PlayerState, systems::SessionFrame, viewport::VisibleCaches};

#[derive(Resource, Default)]
pub struct ViewHistory {
    pub last_snapshot: Option<ViewSnapshot>,
    pub last_delta: Option<ViewDelta>,
    pub encoded_snapshot: Option<Vec<u8>>,
    pub encoded_delta: Option<String>,
    caches: BTreeMap<CellCoord, u32>,
}

pub fn capture_view_snapshot(
    frame: Res<SessionFrame>,
    visible: Res<VisibleCaches>,
    player: Res<PlayerState>,
    mut history: ResMut<ViewHistory>,
) {
    let caches: Vec<VisibleCacheState> = visible
        .iter()
        .map(|(cell, value)| VisibleCacheState { cell, value })
        .collect();

    let header = ViewHeader::new(
        frame.0,
        visible.generation(),
        visible.center(),
        visible.radius(),
        caches.len(),
        player.inventory(),
    );

    let snapshot = ViewSnapshot {
        header,
        player: player.position(),
        caches,
    }
    .finalize();

    history.update(snapshot);
}

impl ViewHistory {
    pub fn hash(&self) -> Option<u64> {
        self.last_snapshot.as_ref().map(|snapshot| snapshot.header.hash)
    }

    fn update(&mut self, snapshot: ViewSnapshot) -> ViewDelta {
        let index: BTreeMap<CellCoord, u32> = snapshot
            .caches
            .iter()
            .map(|state| (state.cell, state.value))
            .collect();

        let delta = ViewDelta {
            generation: snapshot.header.generation,
            upserted: diff_upserted(&self.caches, &index),
            removed: diff_removed(&self.caches, &index),
        };

        self.encoded_snapshot = match encode_snapshot(&snapshot) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(target: "geocache::viewport", error = %err, "snapshot.encode_failed");
                None
            }
        };
        self.encoded_delta = match encode_delta_json(&delta) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(target: "geocache::viewport", error = %err, "delta.encode_failed");
                None
            }
        };
        self.caches = index;
        self.last_snapshot = Some(snapshot);
        self.last_delta = Some(delta.clone());
        delta
    }
}

fn diff_upserted(
    previous: &BTreeMap<CellCoord, u32>,
    current: &BTreeMap<CellCoord, u32>,
) -> Vec<VisibleCacheState> {
    current
        .iter()
        .filter(|(cell, value)| previous.get(*cell) != Some(*value))
        .map(|(cell, value)| VisibleCacheState {
            cell: *cell,
            value: *value,
        })
        .collect()
}

fn diff_removed(
    previous: &BTreeMap<CellCoord, u32>,
    current: &BTreeMap<CellCoord, u32>,
) -> Vec<CellCoord> {
    previous
        .keys()
        .filter(|cell| !current.contains_key(*cell))
        .copied()
        .collect()
}
