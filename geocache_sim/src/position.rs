//! Sources of player movement.
//!
//! Exactly one source owns the player position at a time. Input adapters push
//! into channels from whatever callback they live in; the session drains the
//! active source once per frame, so each update is applied to completion
//! before anything else runs.

use bevy::prelude::Resource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{info, warn};

use crate::coords::LatLng;
use geocache_proto::{Direction, MovementMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionUpdate {
    /// Relative move in degrees.
    Offset(LatLng),
    /// Absolute fix from a location sensor.
    Fix(LatLng),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionSourceError {
    #[error("location sensor failed: {0}")]
    Sensor(String),
}

/// Everything a source delivered in one poll. A failure ends the batch; the
/// updates that arrived ahead of it are still kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBatch {
    pub updates: Vec<PositionUpdate>,
    pub failure: Option<PositionSourceError>,
}

impl PositionBatch {
    fn updates(updates: Vec<PositionUpdate>) -> Self {
        Self {
            updates,
            failure: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.failure.is_none()
    }
}

pub trait PositionSource: Send + Sync {
    fn mode(&self) -> MovementMode;
    fn start(&mut self);
    /// Stop delivering updates. Anything queued before or after is discarded.
    fn stop(&mut self);
    fn is_active(&self) -> bool;
    fn poll(&mut self) -> PositionBatch;
}

/// Handle given to the button/keyboard adapter.
#[derive(Debug, Clone)]
pub struct ManualInput {
    sender: Sender<LatLng>,
    step_degrees: f64,
}

impl ManualInput {
    pub fn step(&self, direction: Direction) {
        let _ = self.sender.send(direction.offset(self.step_degrees));
    }

    pub fn nudge(&self, delta: LatLng) {
        let _ = self.sender.send(delta);
    }
}

#[derive(Debug)]
pub struct ManualSource {
    sender: Sender<LatLng>,
    receiver: Receiver<LatLng>,
    step_degrees: f64,
    active: bool,
}

impl ManualSource {
    pub fn new(step_degrees: f64) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            step_degrees,
            active: false,
        }
    }

    pub fn input(&self) -> ManualInput {
        ManualInput {
            sender: self.sender.clone(),
            step_degrees: self.step_degrees,
        }
    }

    fn discard_pending(&self) {
        while self.receiver.try_recv().is_ok() {}
    }
}

impl PositionSource for ManualSource {
    fn mode(&self) -> MovementMode {
        MovementMode::Manual
    }

    fn start(&mut self) {
        self.discard_pending();
        self.active = true;
    }

    fn stop(&mut self) {
        self.active = false;
        self.discard_pending();
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn poll(&mut self) -> PositionBatch {
        if !self.active {
            self.discard_pending();
            return PositionBatch::default();
        }
        PositionBatch::updates(self.receiver.try_iter().map(PositionUpdate::Offset).collect())
    }
}

/// What a geolocation callback reports.
pub type SensorReading = Result<LatLng, String>;

/// Handle given to the geolocation adapter.
#[derive(Debug, Clone)]
pub struct SensorFeed {
    sender: Sender<SensorReading>,
}

impl SensorFeed {
    pub fn report(&self, position: LatLng) {
        let _ = self.sender.send(Ok(position));
    }

    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.sender.send(Err(reason.into()));
    }
}

#[derive(Debug)]
pub struct SensorSource {
    sender: Sender<SensorReading>,
    receiver: Receiver<SensorReading>,
    active: bool,
}

impl SensorSource {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            active: false,
        }
    }

    pub fn feed(&self) -> SensorFeed {
        SensorFeed {
            sender: self.sender.clone(),
        }
    }

    fn discard_pending(&self) {
        while self.receiver.try_recv().is_ok() {}
    }
}

impl Default for SensorSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for SensorSource {
    fn mode(&self) -> MovementMode {
        MovementMode::Sensor
    }

    fn start(&mut self) {
        self.discard_pending();
        self.active = true;
    }

    fn stop(&mut self) {
        self.active = false;
        self.discard_pending();
    }

    fn is_active(&self) -> bool {
        self.active
    }

    /// Fixes up to the first failure. Readings queued behind a failure stay
    /// in the channel until the source is stopped.
    fn poll(&mut self) -> PositionBatch {
        if !self.active {
            self.discard_pending();
            return PositionBatch::default();
        }
        let mut batch = PositionBatch::default();
        for reading in self.receiver.try_iter() {
            match reading {
                Ok(position) => batch.updates.push(PositionUpdate::Fix(position)),
                Err(reason) => {
                    batch.failure = Some(PositionSourceError::Sensor(reason));
                    break;
                }
            }
        }
        batch
    }
}

/// Both sources plus the mode flag choosing between them.
#[derive(Resource)]
pub struct PositionSources {
    mode: MovementMode,
    manual: Box<dyn PositionSource>,
    sensor: Box<dyn PositionSource>,
}

impl PositionSources {
    pub fn new(
        mode: MovementMode,
        mut manual: Box<dyn PositionSource>,
        mut sensor: Box<dyn PositionSource>,
    ) -> Self {
        match mode {
            MovementMode::Manual => manual.start(),
            MovementMode::Sensor => sensor.start(),
        }
        Self {
            mode,
            manual,
            sensor,
        }
    }

    pub fn mode(&self) -> MovementMode {
        self.mode
    }

    fn source_mut(&mut self, mode: MovementMode) -> &mut dyn PositionSource {
        match mode {
            MovementMode::Manual => self.manual.as_mut(),
            MovementMode::Sensor => self.sensor.as_mut(),
        }
    }

    /// Tear the active source down before the other one starts, so the two
    /// never both feed the player. Returns false if already in `mode`.
    pub fn switch_to(&mut self, mode: MovementMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.source_mut(self.mode).stop();
        self.source_mut(mode).start();
        info!(
            target: "geocache::position",
            from = self.mode.as_str(),
            to = mode.as_str(),
            "movement_mode.switched"
        );
        self.mode = mode;
        true
    }

    pub fn poll_active(&mut self) -> PositionBatch {
        // inactive sources only get drained
        let inactive = match self.mode {
            MovementMode::Manual => MovementMode::Sensor,
            MovementMode::Sensor => MovementMode::Manual,
        };
        let _ = self.source_mut(inactive).poll();
        self.source_mut(self.mode).poll()
    }

    /// Sensor trouble is never fatal: fall back to manual movement.
    pub fn fall_back_to_manual(&mut self, error: &PositionSourceError) -> bool {
        warn!(
            target: "geocache::position",
            error = %error,
            mode = self.mode.as_str(),
            "position_source.failed"
        );
        self.switch_to(MovementMode::Manual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> (PositionSources, ManualInput, SensorFeed) {
        let manual = ManualSource::new(1e-4);
        let sensor = SensorSource::new();
        let input = manual.input();
        let feed = sensor.feed();
        (
            PositionSources::new(MovementMode::Manual, Box::new(manual), Box::new(sensor)),
            input,
            feed,
        )
    }

    #[test]
    fn manual_steps_arrive_as_offsets() {
        let (mut sources, input, _) = sources();
        input.step(Direction::North);
        input.step(Direction::East);
        let updates = sources.poll_active().updates;
        assert_eq!(
            updates,
            vec![
                PositionUpdate::Offset(LatLng::new(1e-4, 0.0)),
                PositionUpdate::Offset(LatLng::new(0.0, 1e-4)),
            ]
        );
        assert!(sources.poll_active().is_empty());
    }

    #[test]
    fn sensor_readings_ignored_while_manual() {
        let (mut sources, _, feed) = sources();
        feed.report(LatLng::new(1.0, 1.0));
        assert!(sources.poll_active().is_empty());
        // stale reading must not leak in after switching
        sources.switch_to(MovementMode::Sensor);
        assert!(sources.poll_active().is_empty());
        feed.report(LatLng::new(2.0, 2.0));
        assert_eq!(
            sources.poll_active().updates,
            vec![PositionUpdate::Fix(LatLng::new(2.0, 2.0))]
        );
    }

    #[test]
    fn switching_stops_the_previous_source() {
        let manual = ManualSource::new(1e-4);
        let sensor = SensorSource::new();
        assert!(!manual.is_active() && !sensor.is_active());

        let (mut sources, input, feed) = sources();
        assert!(sources.switch_to(MovementMode::Sensor));
        assert!(!sources.switch_to(MovementMode::Sensor));
        input.step(Direction::South);
        feed.report(LatLng::new(5.0, 5.0));
        assert_eq!(
            sources.poll_active().updates,
            vec![PositionUpdate::Fix(LatLng::new(5.0, 5.0))]
        );
        sources.switch_to(MovementMode::Manual);
        feed.report(LatLng::new(6.0, 6.0));
        assert!(sources.poll_active().is_empty());
    }

    #[test]
    fn sensor_failure_keeps_earlier_fixes_and_falls_back() {
        let (mut sources, _, feed) = sources();
        sources.switch_to(MovementMode::Sensor);
        feed.report(LatLng::new(1.0, 1.0));
        feed.fail("timeout");
        feed.report(LatLng::new(3.0, 3.0));
        let batch = sources.poll_active();
        assert_eq!(
            batch.updates,
            vec![PositionUpdate::Fix(LatLng::new(1.0, 1.0))]
        );
        let err = batch.failure.unwrap();
        assert_eq!(err, PositionSourceError::Sensor("timeout".to_string()));
        assert!(sources.fall_back_to_manual(&err));
        assert_eq!(sources.mode(), MovementMode::Manual);
        // whatever queued behind the failure went with the sensor
        assert!(sources.poll_active().is_empty());
    }
}
