use bevy::{ecs::system::SystemParam, prelude::*};
use tracing::{debug, info, warn};

use crate::{
    coords::{CellCoord, CellGrid, LatLng},
    field::CacheSpawner,
    game_config::GameConfigHandle,
    grid_store::GridStore,
    interaction::{resolve_interaction, InteractionOutcome, InteractionRules},
    persistence::SessionStore,
    player::PlayerState,
    position::{PositionSources, PositionUpdate},
    status::{StatusMessage, WinState},
    viewport::{regenerate_visible, Viewport, VisibleCaches},
};
use geocache_proto::MovementMode;

/// The player clicked a cache marker.
#[derive(Event, Debug, Clone, Copy)]
pub struct CacheActivated {
    pub cell: CellCoord,
}

/// The render adapter finished a pan or zoom.
#[derive(Event, Debug, Clone, Copy)]
pub struct ViewportChanged {
    pub center: LatLng,
    pub zoom: Option<u8>,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct SwitchMovementMode {
    pub mode: MovementMode,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalReached {
    pub cell: CellCoord,
    pub value: u32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryChanged {
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeChangeReason {
    Requested,
    SensorFailure(String),
}

#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct MovementModeChanged {
    pub mode: MovementMode,
    pub reason: ModeChangeReason,
}

/// Frames run so far.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFrame(pub u64);

/// Outcome of the most recent activation, for adapters that want feedback.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct LastInteraction(pub Option<InteractionOutcome>);

#[derive(SystemParam)]
pub struct InteractionContext<'w> {
    pub spawner: Res<'w, CacheSpawner>,
    pub grid: Res<'w, CellGrid>,
    pub rules: Res<'w, InteractionRules>,
}

#[derive(SystemParam)]
pub struct InteractionFeedback<'w> {
    pub status: ResMut<'w, StatusMessage>,
    pub win: ResMut<'w, WinState>,
    pub last: ResMut<'w, LastInteraction>,
    pub goals: EventWriter<'w, GoalReached>,
    pub inventory: EventWriter<'w, InventoryChanged>,
}

pub fn restore_inventory(
    store: Res<SessionStore>,
    mut player: ResMut<PlayerState>,
    mut status: ResMut<StatusMessage>,
) {
    if let Some(value) = store.restore_inventory() {
        player.set_inventory(value);
        *status = StatusMessage::for_inventory(value);
        info!(
            target: "geocache::persistence",
            value,
            "inventory.restored"
        );
    }
}

pub fn apply_mode_switches(
    mut requests: EventReader<SwitchMovementMode>,
    mut sources: ResMut<PositionSources>,
    mut changed: EventWriter<MovementModeChanged>,
) {
    for request in requests.read() {
        if sources.switch_to(request.mode) {
            changed.send(MovementModeChanged {
                mode: request.mode,
                reason: ModeChangeReason::Requested,
            });
        }
    }
}

pub fn poll_position_sources(
    config: Res<GameConfigHandle>,
    mut sources: ResMut<PositionSources>,
    mut player: ResMut<PlayerState>,
    mut viewport: ResMut<Viewport>,
    mut changed: EventWriter<MovementModeChanged>,
) {
    let batch = sources.poll_active();

    // fixes that arrived before a failure still move the player
    if !batch.updates.is_empty() {
        for update in batch.updates {
            match update {
                PositionUpdate::Offset(delta) => player.move_by(delta),
                PositionUpdate::Fix(position) => player.set_position(position),
            }
        }
        debug!(
            target: "geocache::position",
            position = %player.position(),
            "player.moved"
        );
        if config.0.viewport_follows_player {
            viewport.recenter(player.position());
        }
    }

    if let Some(err) = batch.failure {
        if sources.fall_back_to_manual(&err) {
            changed.send(MovementModeChanged {
                mode: MovementMode::Manual,
                reason: ModeChangeReason::SensorFailure(err.to_string()),
            });
        }
    }
}

pub fn apply_viewport_changes(
    mut notifications: EventReader<ViewportChanged>,
    mut viewport: ResMut<Viewport>,
) {
    for change in notifications.read() {
        viewport.recenter(change.center);
        if let Some(zoom) = change.zoom {
            viewport.zoom = zoom;
        }
        debug!(
            target: "geocache::viewport",
            center = %change.center,
            zoom = viewport.zoom,
            "viewport.changed"
        );
    }
}

pub fn resolve_cache_interactions(
    mut activations: EventReader<CacheActivated>,
    ctx: InteractionContext,
    mut player: ResMut<PlayerState>,
    mut store: ResMut<GridStore>,
    mut viewport: ResMut<Viewport>,
    mut feedback: InteractionFeedback,
) {
    for activation in activations.read() {
        let outcome = resolve_interaction(
            activation.cell,
            &mut player,
            &mut store,
            &ctx.spawner,
            &ctx.grid,
            &ctx.rules,
        );
        feedback.last.0 = Some(outcome);

        match outcome {
            InteractionOutcome::PickedUp { value, .. } => {
                *feedback.status = StatusMessage::Carrying(value);
                feedback.inventory.send(InventoryChanged { value });
            }
            InteractionOutcome::Merged {
                cell,
                value,
                goal_reached,
            } => {
                feedback.win.record_merge(value, goal_reached);
                if goal_reached {
                    *feedback.status = StatusMessage::Won(value);
                    feedback.goals.send(GoalReached { cell, value });
                    info!(
                        target: "geocache::interaction",
                        cell = %cell,
                        value,
                        "goal.reached"
                    );
                } else {
                    *feedback.status = StatusMessage::Merged(value);
                }
                feedback.inventory.send(InventoryChanged { value: 0 });
            }
            InteractionOutcome::OutOfRange { .. }
            | InteractionOutcome::Mismatch { .. }
            | InteractionOutcome::NothingHere { .. }
            | InteractionOutcome::Overflow { .. } => {}
        }

        if outcome.mutated() {
            viewport.mark_dirty();
            info!(
                target: "geocache::interaction",
                cell = %outcome.cell(),
                outcome = outcome.as_str(),
                inventory = player.inventory(),
                "cache.activated"
            );
        } else {
            debug!(
                target: "geocache::interaction",
                cell = %outcome.cell(),
                outcome = outcome.as_str(),
                "cache.activation_ignored"
            );
        }
    }
}

pub fn regenerate_visible_caches(
    config: Res<GameConfigHandle>,
    grid: Res<CellGrid>,
    spawner: Res<CacheSpawner>,
    store: Res<GridStore>,
    mut viewport: ResMut<Viewport>,
    mut visible: ResMut<VisibleCaches>,
) {
    if !viewport.is_dirty() {
        return;
    }
    let center = grid.cell_for(viewport.center);
    let radius = config.0.neighborhood_size;
    let caches = regenerate_visible(center, radius, &store, &spawner);
    visible.replace(center, radius, caches);
    viewport.clear_dirty();
    debug!(
        target: "geocache::viewport",
        center = %center,
        caches = visible.len(),
        generation = visible.generation(),
        "visible.regenerated"
    );
}

/// Write the inventory once per frame, and only when it changed.
pub fn persist_inventory(
    mut changes: EventReader<InventoryChanged>,
    mut store: ResMut<SessionStore>,
) {
    let Some(latest) = changes.read().last().copied() else {
        return;
    };
    match store.persist_inventory(latest.value) {
        Ok(()) => debug!(
            target: "geocache::persistence",
            value = latest.value,
            "inventory.persisted"
        ),
        Err(err) => warn!(
            target: "geocache::persistence",
            error = %err,
            "inventory.persist_failed"
        ),
    }
}

pub fn advance_frame(mut frame: ResMut<SessionFrame>) {
    frame.0 += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_config::GameConfig;
    use crate::persistence::MemoryStore;
    use crate::position::{ManualSource, SensorSource};
    use bevy::ecs::event::Events;
    use bevy_ecs::system::RunSystemOnce;
    use std::sync::Arc;

    fn test_world(store: MemoryStore) -> World {
        let config = Arc::new(GameConfig {
            origin: LatLng::new(0.0, 0.0),
            neighborhood_size: 4,
            ..GameConfig::default()
        });

        let mut world = World::default();
        world.insert_resource(config.cell_grid());
        world.insert_resource(config.spawner());
        world.insert_resource(config.interaction_rules());
        world.insert_resource(GridStore::new());
        world.insert_resource(PlayerState::new(config.start_position()));
        world.insert_resource(Viewport::new(config.start_position(), config.zoom));
        world.insert_resource(VisibleCaches::default());
        world.insert_resource(StatusMessage::default());
        world.insert_resource(WinState::default());
        world.insert_resource(LastInteraction::default());
        world.insert_resource(SessionStore::new(
            Box::new(store),
            config.inventory_key.clone(),
        ));
        world.insert_resource(PositionSources::new(
            MovementMode::Manual,
            Box::new(ManualSource::new(config.step_degrees())),
            Box::new(SensorSource::new()),
        ));
        world.insert_resource(GameConfigHandle::new(config));
        world.init_resource::<Events<CacheActivated>>();
        world.init_resource::<Events<GoalReached>>();
        world.init_resource::<Events<InventoryChanged>>();
        world.init_resource::<Events<ViewportChanged>>();
        world
    }

    fn activate(world: &mut World, i: i32, j: i32) -> Option<InteractionOutcome> {
        world.send_event(CacheActivated {
            cell: CellCoord::new(i, j),
        });
        world.run_system_once(resolve_cache_interactions);
        world.resource::<LastInteraction>().0
    }

    #[test]
    fn restore_sets_inventory_and_status() {
        let mut world = test_world(MemoryStore::with_entry("playerInventory", "16"));
        world.run_system_once(restore_inventory);
        assert_eq!(world.resource::<PlayerState>().inventory(), 16);
        assert_eq!(
            *world.resource::<StatusMessage>(),
            StatusMessage::Carrying(16)
        );
    }

    #[test]
    fn malformed_restore_leaves_defaults() {
        let mut world = test_world(MemoryStore::with_entry("playerInventory", "abc"));
        world.run_system_once(restore_inventory);
        assert_eq!(world.resource::<PlayerState>().inventory(), 0);
        assert_eq!(*world.resource::<StatusMessage>(), StatusMessage::NoPoints);
    }

    #[test]
    fn pick_up_updates_status_and_marks_viewport() {
        let mut world = test_world(MemoryStore::new());
        world.resource_mut::<Viewport>().clear_dirty();
        let outcome = activate(&mut world, 0, 0);
        assert!(matches!(
            outcome,
            Some(InteractionOutcome::PickedUp { value: 4, .. })
        ));
        assert_eq!(
            *world.resource::<StatusMessage>(),
            StatusMessage::Carrying(4)
        );
        assert!(world.resource::<Viewport>().is_dirty());
        let changes = world.resource::<Events<InventoryChanged>>();
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn ignored_activation_keeps_viewport_clean() {
        let mut world = test_world(MemoryStore::new());
        world.resource_mut::<Viewport>().clear_dirty();
        let outcome = activate(&mut world, 3, 0);
        assert!(matches!(
            outcome,
            Some(InteractionOutcome::OutOfRange { .. })
        ));
        assert!(!world.resource::<Viewport>().is_dirty());
        assert!(world.resource::<Events<InventoryChanged>>().is_empty());
    }

    #[test]
    fn goal_merge_signals_win() {
        let mut world = test_world(MemoryStore::new());
        {
            let mut store = world.resource_mut::<GridStore>();
            store.set(CellCoord::new(1, 0), 16);
            store.set(CellCoord::new(0, 1), 16);
        }
        activate(&mut world, 1, 0);
        activate(&mut world, 0, 1);
        assert_eq!(*world.resource::<StatusMessage>(), StatusMessage::Won(32));
        let win = *world.resource::<WinState>();
        assert!(win.achieved);
        assert_eq!(win.signals, 1);
        assert_eq!(world.resource::<Events<GoalReached>>().len(), 1);
    }

    #[test]
    fn regeneration_only_runs_when_dirty() {
        let mut world = test_world(MemoryStore::new());
        world.run_system_once(regenerate_visible_caches);
        assert_eq!(world.resource::<VisibleCaches>().generation(), 1);
        assert_eq!(world.resource::<VisibleCaches>().len(), 6);
        world.run_system_once(regenerate_visible_caches);
        assert_eq!(world.resource::<VisibleCaches>().generation(), 1);
    }

    #[test]
    fn persisted_inventory_is_last_change_of_frame() {
        let mut world = test_world(MemoryStore::new());
        world.send_event(InventoryChanged { value: 4 });
        world.send_event(InventoryChanged { value: 0 });
        world.run_system_once(persist_inventory);
        let store = world.resource::<SessionStore>();
        assert_eq!(store.raw("playerInventory").as_deref(), Some("0"));
    }

    #[test]
    fn viewport_notification_recenters_and_zooms() {
        let mut world = test_world(MemoryStore::new());
        world.resource_mut::<Viewport>().clear_dirty();
        world.send_event(ViewportChanged {
            center: LatLng::new(0.01, 0.02),
            zoom: Some(17),
        });
        world.run_system_once(apply_viewport_changes);
        let viewport = world.resource::<Viewport>();
        assert!(viewport.is_dirty());
        assert_eq!(viewport.center, LatLng::new(0.01, 0.02));
        assert_eq!(viewport.zoom, 17);
    }
}
