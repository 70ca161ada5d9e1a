use arrayvec::ArrayString;
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Minecraft player name - max 16 characters, stored inline (no heap allocation).
pub type PlayerName = ArrayString<16>;

/// A player allowed to join while maintenance is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistEntry {
  /// Mojang profile id (unique key)
  pub player_id: Uuid,
  /// Last known name, shown in listings
  pub display_name: PlayerName,
}

/// Parse a player name, enforcing Minecraft's username rules
/// (1-16 characters, alphanumeric or underscore).
pub fn parse_player_name(name: &str) -> Result<PlayerName> {
  if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(StoreError::InvalidName(name.to_string()));
  }
  PlayerName::try_from(name).map_err(|_| StoreError::InvalidName(name.to_string()))
}

/// Parse a hyphenated or simple-form UUID string.
pub fn parse_player_id(id: &str) -> Result<Uuid> {
  Uuid::parse_str(id.trim()).map_err(|_| StoreError::InvalidIdentifier(id.to_string()))
}
