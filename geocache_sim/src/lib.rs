//! Core of the geocache merge game.
//!
//! A player walks a lattice of map cells, picks up caches and merges equal
//! ones into larger powers of two. Cache placement is a pure function of the
//! cell coordinate, so only cells the player has touched are ever stored.
//! Each external input is resolved by a single frame of the chained systems
//! configured in [`build_session_app`].

pub mod coords;
pub mod field;
pub mod game_config;
pub mod grid_store;
mod hashing;
pub mod interaction;
pub mod persistence;
pub mod player;
pub mod position;
mod session;
mod snapshot;
mod status;
mod systems;
pub mod viewport;

use std::sync::Arc;

use bevy::ecs::event::EventUpdateSignal;
use bevy::prelude::*;

pub use coords::{CellBounds, CellCoord, CellGrid, LatLng};
pub use field::{CacheSpawner, DeterministicField, FieldKey};
pub use game_config::{
    load_game_config_from_env, GameConfig, GameConfigError, GameConfigHandle, GameConfigMetadata,
    GAME_CONFIG_ENV,
};
pub use grid_store::{cache_state, CacheState, GridStore};
pub use interaction::{resolve_interaction, InteractionOutcome, InteractionRules};
pub use persistence::{
    parse_inventory, JsonFileStore, KeyValueStore, MemoryStore, PersistenceError, SessionStore,
};
pub use player::PlayerState;
pub use position::{
    ManualInput, ManualSource, PositionBatch, PositionSource, PositionSourceError,
    PositionSources, PositionUpdate, SensorFeed, SensorSource,
};
pub use session::{render_ascii_map, GameSession};
pub use snapshot::ViewHistory;
pub use status::{StatusMessage, WinState};
pub use systems::{
    CacheActivated, GoalReached, InventoryChanged, LastInteraction, ModeChangeReason,
    MovementModeChanged, SessionFrame, SwitchMovementMode, ViewportChanged,
};
pub use viewport::{regenerate_visible, Viewport, VisibleCaches};

pub use geocache_proto::{Direction, MovementMode, ViewDelta, ViewSnapshot};

/// Channel handles for the input adapters of a session.
#[derive(Resource, Clone)]
pub struct PositionInputs {
    pub manual: ManualInput,
    pub sensor: SensorFeed,
}

/// Construct a Bevy [`App`] running the geocache frame pipeline.
pub fn build_session_app(config: Arc<GameConfig>, store: Box<dyn KeyValueStore>) -> App {
    let mut app = App::new();

    let start = config.start_position();
    let manual = ManualSource::new(config.step_degrees());
    let sensor = SensorSource::new();
    let inputs = PositionInputs {
        manual: manual.input(),
        sensor: sensor.feed(),
    };
    let sources = PositionSources::new(MovementMode::Manual, Box::new(manual), Box::new(sensor));

    app.add_plugins(MinimalPlugins);
    // Event queues swap every frame, not only after a fixed timestep tick.
    app.world.remove_resource::<EventUpdateSignal>();
    app.add_event::<CacheActivated>()
        .add_event::<ViewportChanged>()
        .add_event::<SwitchMovementMode>()
        .add_event::<GoalReached>()
        .add_event::<InventoryChanged>()
        .add_event::<MovementModeChanged>()
        .insert_resource(config.cell_grid())
        .insert_resource(config.spawner())
        .insert_resource(config.interaction_rules())
        .insert_resource(GridStore::new())
        .insert_resource(PlayerState::new(start))
        .insert_resource(Viewport::new(start, config.zoom))
        .insert_resource(VisibleCaches::default())
        .insert_resource(StatusMessage::default())
        .insert_resource(WinState::default())
        .insert_resource(LastInteraction::default())
        .insert_resource(SessionFrame::default())
        .insert_resource(SessionStore::new(store, config.inventory_key.clone()))
        .insert_resource(sources)
        .insert_resource(inputs)
        .insert_resource(ViewHistory::default())
        .insert_resource(GameConfigHandle::new(config))
        .add_systems(Startup, systems::restore_inventory)
        .add_systems(
            Update,
            (
                systems::apply_mode_switches,
                systems::poll_position_sources,
                systems::apply_viewport_changes,
                systems::resolve_cache_interactions,
                systems::regenerate_visible_caches,
                systems::persist_inventory,
                systems::advance_frame,
                snapshot::capture_view_snapshot,
            )
                .chain(),
        );

    app
}

/// Session using `GEOCACHE_CONFIG_PATH` (or the builtin config) and an
/// in-memory store.
pub fn build_default_session_app() -> App {
    let (config, metadata) = load_game_config_from_env();
    let mut app = build_session_app(config, Box::new(MemoryStore::new()));
    app.insert_resource(metadata);
    app
}

/// Execute a single frame.
///
/// Processes the chained systems configured in [`build_session_app`]
/// (mode switches → position → viewport → interactions → regeneration →
/// persistence → frame increment → snapshot).
pub fn run_frame(app: &mut App) {
    app.update();
}
