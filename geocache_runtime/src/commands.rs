use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, Direction, LatLng, MovementMode};

/// Upper bound on `steps` and `count`; each one runs a frame.
pub const MAX_REPEAT: u32 = 1_000;

/// A single input delivered to a session by one of its adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionCommand {
    Move {
        direction: Direction,
        steps: u32,
    },
    Activate {
        cell: CellCoord,
    },
    Viewport {
        center: LatLng,
        zoom: Option<u8>,
    },
    Mode {
        mode: MovementMode,
    },
    SensorReading {
        position: LatLng,
    },
    SensorFailure {
        reason: String,
    },
    Frame {
        count: u32,
    },
    Status,
}

impl SessionCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            SessionCommand::Move { .. } => "move",
            SessionCommand::Activate { .. } => "click",
            SessionCommand::Viewport { .. } => "viewport",
            SessionCommand::Mode { .. } => "mode",
            SessionCommand::SensorReading { .. } => "sensor",
            SessionCommand::SensorFailure { .. } => "sensor_fail",
            SessionCommand::Frame { .. } => "frame",
            SessionCommand::Status => "status",
        }
    }
}

/// High-level representation of a command envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub payload: SessionCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<u64>,
}

/// Error returned when decoding a command envelope fails.
#[derive(Debug, Error)]
pub enum CommandDecodeError {
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("move command must take at least one step")]
    ZeroSteps,
    #[error("{verb} repeats {count} times, at most {max} allowed")]
    TooManyRepeats {
        verb: &'static str,
        count: u32,
        max: u32,
    },
}

impl CommandEnvelope {
    pub fn new(payload: SessionCommand) -> Self {
        Self {
            payload,
            correlation_id: None,
        }
    }

    pub fn with_correlation(payload: SessionCommand, correlation_id: u64) -> Self {
        Self {
            payload,
            correlation_id: Some(correlation_id),
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(data: &str) -> Result<Self, CommandDecodeError> {
        let envelope: CommandEnvelope = serde_json::from_str(data)?;
        let repeat = match envelope.payload {
            SessionCommand::Move { steps: 0, .. } => return Err(CommandDecodeError::ZeroSteps),
            SessionCommand::Move { steps, .. } => Some(steps),
            SessionCommand::Frame { count } => Some(count),
            _ => None,
        };
        if let Some(count) = repeat.filter(|&count| count > MAX_REPEAT) {
            return Err(CommandDecodeError::TooManyRepeats {
                verb: envelope.payload.verb(),
                count,
                max: MAX_REPEAT,
            });
        }
        Ok(envelope)
    }
}
