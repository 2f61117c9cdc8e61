use std::sync::Arc;

use bevy::prelude::*;
use geocache_runtime::SessionCommand;

use crate::{
    build_default_session_app, build_session_app,
    coords::{CellCoord, CellGrid, LatLng},
    game_config::{GameConfig, GameConfigHandle},
    grid_store::GridStore,
    interaction::InteractionOutcome,
    persistence::KeyValueStore,
    player::PlayerState,
    position::{ManualInput, PositionSources, SensorFeed},
    run_frame,
    snapshot::ViewHistory,
    status::{StatusMessage, WinState},
    systems::{
        CacheActivated, LastInteraction, SessionFrame, SwitchMovementMode, ViewportChanged,
    },
    viewport::VisibleCaches,
    PositionInputs,
};
use geocache_proto::{Direction, MovementMode};

/// One independent game. Every input method delivers exactly one input and
/// runs exactly one frame, so inputs never interleave.
pub struct GameSession {
    app: App,
    inputs: PositionInputs,
}

impl GameSession {
    /// Build a session and run its first frame (inventory restore and the
    /// initial cache layer).
    pub fn new(config: Arc<GameConfig>, store: Box<dyn KeyValueStore>) -> Self {
        Self::from_app(build_session_app(config, store))
    }

    pub fn from_env() -> Self {
        Self::from_app(build_default_session_app())
    }

    fn from_app(mut app: App) -> Self {
        let inputs = app.world.resource::<PositionInputs>().clone();
        run_frame(&mut app);
        Self { app, inputs }
    }

    pub fn step(&mut self, direction: Direction) {
        self.inputs.manual.step(direction);
        run_frame(&mut self.app);
    }

    pub fn walk(&mut self, direction: Direction, steps: u32) {
        for _ in 0..steps {
            self.step(direction);
        }
    }

    /// Handle a click on `cell`. Returns how the click was resolved.
    pub fn activate(&mut self, cell: CellCoord) -> Option<InteractionOutcome> {
        self.app.world.resource_mut::<LastInteraction>().0 = None;
        self.app.world.send_event(CacheActivated { cell });
        run_frame(&mut self.app);
        self.app.world.resource::<LastInteraction>().0
    }

    pub fn notify_viewport(&mut self, center: LatLng, zoom: Option<u8>) {
        self.app.world.send_event(ViewportChanged { center, zoom });
        run_frame(&mut self.app);
    }

    pub fn switch_mode(&mut self, mode: MovementMode) -> MovementMode {
        self.app.world.send_event(SwitchMovementMode { mode });
        run_frame(&mut self.app);
        self.mode()
    }

    pub fn report_position(&mut self, position: LatLng) {
        self.inputs.sensor.report(position);
        run_frame(&mut self.app);
    }

    pub fn report_sensor_failure(&mut self, reason: impl Into<String>) {
        self.inputs.sensor.fail(reason);
        run_frame(&mut self.app);
    }

    pub fn run_frames(&mut self, count: u32) {
        for _ in 0..count {
            run_frame(&mut self.app);
        }
    }

    pub fn apply_command(&mut self, command: &SessionCommand) -> Option<InteractionOutcome> {
        match command {
            SessionCommand::Move { direction, steps } => self.walk(*direction, *steps),
            SessionCommand::Activate { cell } => return self.activate(*cell),
            SessionCommand::Viewport { center, zoom } => self.notify_viewport(*center, *zoom),
            SessionCommand::Mode { mode } => {
                self.switch_mode(*mode);
            }
            SessionCommand::SensorReading { position } => self.report_position(*position),
            SessionCommand::SensorFailure { reason } => {
                self.report_sensor_failure(reason.clone())
            }
            SessionCommand::Frame { count } => self.run_frames(*count),
            SessionCommand::Status => {}
        }
        None
    }

    /// Handle for pushing manual moves without running a frame.
    pub fn manual_input(&self) -> ManualInput {
        self.inputs.manual.clone()
    }

    /// Handle for pushing sensor readings without running a frame.
    pub fn sensor_feed(&self) -> SensorFeed {
        self.inputs.sensor.clone()
    }

    pub fn config(&self) -> Arc<GameConfig> {
        self.app.world.resource::<GameConfigHandle>().get()
    }

    pub fn grid(&self) -> CellGrid {
        *self.app.world.resource::<CellGrid>()
    }

    pub fn player(&self) -> &PlayerState {
        self.app.world.resource::<PlayerState>()
    }

    pub fn player_cell(&self) -> CellCoord {
        self.player().cell(&self.grid())
    }

    pub fn visible_caches(&self) -> &VisibleCaches {
        self.app.world.resource::<VisibleCaches>()
    }

    pub fn grid_store(&self) -> &GridStore {
        self.app.world.resource::<GridStore>()
    }

    pub fn status(&self) -> StatusMessage {
        *self.app.world.resource::<StatusMessage>()
    }

    pub fn win_state(&self) -> WinState {
        *self.app.world.resource::<WinState>()
    }

    pub fn mode(&self) -> MovementMode {
        self.app.world.resource::<PositionSources>().mode()
    }

    pub fn frame(&self) -> u64 {
        self.app.world.resource::<SessionFrame>().0
    }

    pub fn view_history(&self) -> &ViewHistory {
        self.app.world.resource::<ViewHistory>()
    }

    pub fn snapshot_hash(&self) -> Option<u64> {
        self.view_history().hash()
    }

    pub fn render_map(&self) -> String {
        render_ascii_map(self.visible_caches(), self.player_cell())
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }
}

/// North-up text rendering of the visible window. `@` is the player, `.` an
/// empty cell; caches of 1..8 print as their value and larger ones as letters
/// (`A` = 16, `B` = 32, ...).
pub fn render_ascii_map(visible: &VisibleCaches, player: CellCoord) -> String {
    let center = visible.center();
    let r = i32::try_from(visible.radius()).unwrap_or(i32::MAX);
    let mut out = String::new();
    for i in (center.i.saturating_sub(r)..center.i.saturating_add(r)).rev() {
        for j in center.j.saturating_sub(r)..center.j.saturating_add(r) {
            let cell = CellCoord::new(i, j);
            let glyph = if cell == player {
                '@'
            } else {
                visible.get(cell).map_or('.', cache_glyph)
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

fn cache_glyph(value: u32) -> char {
    match value {
        1 => '1',
        2 => '2',
        4 => '4',
        8 => '8',
        _ => {
            let exponent = value.trailing_zeros().saturating_sub(4);
            char::from_u32(u32::from(b'A') + exponent.min(25)).unwrap_or('?')
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("frame", &self.frame())
            .field("mode", &self.mode())
            .field("inventory", &self.player().inventory())
            .finish()
    }
}
