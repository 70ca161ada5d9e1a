/// Input validation for the HTTP routes
use thiserror::Error;
use uuid::Uuid;

use maintenance_store::PlayerName;

/// Longest countdown or schedule phase accepted over HTTP (one year).
pub const MAX_TIMER_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Player name cannot be empty")]
    PlayerNameEmpty,

    #[error("Player name too long (max 16 characters, got {0})")]
    PlayerNameTooLong(usize),

    #[error("Player name contains invalid characters (only alphanumeric and underscore allowed)")]
    PlayerNameInvalidChars,

    #[error("Invalid player identifier '{0}'")]
    InvalidPlayerId(String),

    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: i64 },

    #[error("{field} too long (max {max} seconds, got {value})")]
    TooLong {
        field: &'static str,
        max: i64,
        value: i64,
    },
}

/// Validates a Minecraft player name with the same rules the whitelist
/// applies, and reports which rule was broken
pub fn validate_player_name(name: &str) -> Result<PlayerName, ValidationError> {
    maintenance_store::parse_player_name(name).map_err(|_| {
        if name.is_empty() {
            ValidationError::PlayerNameEmpty
        } else if name.len() > 16 {
            ValidationError::PlayerNameTooLong(name.len())
        } else {
            ValidationError::PlayerNameInvalidChars
        }
    })
}

/// Validates a player UUID in any form `uuid` accepts (hyphenated or simple)
pub fn validate_player_id(id: &str) -> Result<Uuid, ValidationError> {
    maintenance_store::parse_player_id(id)
        .map_err(|_| ValidationError::InvalidPlayerId(id.to_string()))
}

/// Validates a countdown or schedule phase length in seconds
pub fn validate_seconds(field: &'static str, value: i64) -> Result<i64, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NotPositive { field, value });
    }

    if value > MAX_TIMER_SECONDS {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_TIMER_SECONDS,
            value,
        });
    }

    Ok(value)
}
