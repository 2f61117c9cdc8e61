use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::{CellCoord, Direction, LatLng, MovementMode, SessionCommand, MAX_REPEAT};

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("invalid float '{value}' for {context}: {source}")]
    InvalidFloat {
        value: String,
        context: &'static str,
        source: ParseFloatError,
    },
    #[error("invalid direction '{0}'")]
    InvalidDirection(String),
    #[error("invalid movement mode '{0}'")]
    InvalidMode(String),
    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),
    #[error("{context} of {value} exceeds the limit of {max}")]
    CountTooLarge {
        value: u32,
        context: &'static str,
        max: u32,
    },
}

pub fn parse_command_line(input: &str) -> Result<SessionCommand, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    match verb.as_str() {
        "move" | "go" => {
            let direction_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("direction"))?;
            let direction = parse_direction(direction_str)?;
            let steps = parse_repeat(parts.next(), "move steps")?;
            Ok(SessionCommand::Move { direction, steps })
        }
        "n" | "s" | "e" | "w" => {
            let direction = parse_direction(&verb)?;
            Ok(SessionCommand::Move {
                direction,
                steps: 1,
            })
        }
        "click" | "tap" | "activate" => {
            let i_str = parts.next().ok_or(CommandParseError::MissingArgument("i"))?;
            let j_str = parts.next().ok_or(CommandParseError::MissingArgument("j"))?;
            let cell = CellCoord::new(parse_i32(i_str, "cell i")?, parse_i32(j_str, "cell j")?);
            Ok(SessionCommand::Activate { cell })
        }
        "viewport" | "pan" => {
            let center = parse_lat_lng(&mut parts, "viewport")?;
            let zoom = parts
                .next()
                .map(|token| parse_u8(token, "viewport zoom"))
                .transpose()?;
            Ok(SessionCommand::Viewport { center, zoom })
        }
        "mode" => {
            let mode_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("mode"))?;
            Ok(SessionCommand::Mode {
                mode: parse_mode(mode_str)?,
            })
        }
        "sensor" => {
            let position = parse_lat_lng(&mut parts, "sensor")?;
            Ok(SessionCommand::SensorReading { position })
        }
        "sensor_fail" => {
            let reason = parts.collect::<Vec<_>>().join(" ");
            let reason = if reason.is_empty() {
                "position unavailable".to_string()
            } else {
                reason
            };
            Ok(SessionCommand::SensorFailure { reason })
        }
        "frame" | "tick" => {
            let count = parse_repeat(parts.next(), "frame count")?;
            Ok(SessionCommand::Frame { count })
        }
        "status" => Ok(SessionCommand::Status),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_lat_lng<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    context: &'static str,
) -> Result<LatLng, CommandParseError> {
    let lat_str = parts.next().ok_or(CommandParseError::MissingArgument("lat"))?;
    let lng_str = parts.next().ok_or(CommandParseError::MissingArgument("lng"))?;
    let lat = parse_f64(lat_str, context)?;
    let lng = parse_f64(lng_str, context)?;
    Ok(LatLng::new(lat, lng))
}

fn parse_direction(token: &str) -> Result<Direction, CommandParseError> {
    match token.to_ascii_lowercase().as_str() {
        "n" | "north" | "up" => Ok(Direction::North),
        "s" | "south" | "down" => Ok(Direction::South),
        "e" | "east" | "right" => Ok(Direction::East),
        "w" | "west" | "left" => Ok(Direction::West),
        other => Err(CommandParseError::InvalidDirection(other.to_string())),
    }
}

fn parse_mode(token: &str) -> Result<MovementMode, CommandParseError> {
    match token.to_ascii_lowercase().as_str() {
        "manual" | "buttons" | "keys" => Ok(MovementMode::Manual),
        "sensor" | "gps" | "geolocation" => Ok(MovementMode::Sensor),
        other => Err(CommandParseError::InvalidMode(other.to_string())),
    }
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32, CommandParseError> {
    value
        .parse::<u32>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

/// Optional repeat count, defaulting to 1 and bounded by [`MAX_REPEAT`].
fn parse_repeat(token: Option<&str>, context: &'static str) -> Result<u32, CommandParseError> {
    let value = parse_u32(token.unwrap_or("1"), context)?;
    match value {
        0 => Err(CommandParseError::ZeroCount(context)),
        value if value > MAX_REPEAT => Err(CommandParseError::CountTooLarge {
            value,
            context,
            max: MAX_REPEAT,
        }),
        value => Ok(value),
    }
}

fn parse_u8(value: &str, context: &'static str) -> Result<u8, CommandParseError> {
    value
        .parse::<u8>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_i32(value: &str, context: &'static str) -> Result<i32, CommandParseError> {
    value
        .parse::<i32>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_f64(value: &str, context: &'static str) -> Result<f64, CommandParseError> {
    value
        .parse::<f64>()
        .map_err(|source| CommandParseError::InvalidFloat {
            value: value.to_string(),
            context,
            source,
        })
}
