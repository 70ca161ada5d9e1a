//! In-memory session tracking for the HTTP host adapter.
//!
//! The game server reports joins and leaves; this module remembers who is
//! online so the core can count players and kick them. Sessions resync on
//! reconnect, so durability isn't needed.

use std::sync::Arc;

use maintenance_store::{AccessControlList, PlayerName};
use scc::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::platform::{NotificationPort, Platform, PlatformError};

/// Host adapter backed by reports from the game server.
///
/// Broadcasts and console commands are forwarded to the log; the game server
/// picks them up from there. Kicked sessions are dropped from the table.
pub struct SessionPlatform {
    sessions: HashMap<Uuid, PlayerName>,
    whitelist: Arc<AccessControlList>,
    max_players: usize,
}

impl SessionPlatform {
    pub fn new(whitelist: Arc<AccessControlList>, max_players: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            whitelist,
            max_players,
        }
    }

    /// Record a player joining. Re-joining updates the stored name.
    pub async fn player_join(&self, player_id: Uuid, name: PlayerName) {
        if let Err((player_id, name)) = self.sessions.insert_async(player_id, name).await {
            self.sessions
                .update_async(&player_id, |_, stored| *stored = name)
                .await;
        }
    }

    /// Record a player leaving. Returns whether they were online.
    pub async fn player_leave(&self, player_id: Uuid) -> bool {
        self.sessions.remove_async(&player_id).await.is_some()
    }

    pub async fn is_online(&self, player_id: Uuid) -> bool {
        self.sessions.read_async(&player_id, |_, _| ()).await.is_some()
    }
}

impl NotificationPort for SessionPlatform {
    fn broadcast(&self, message: &str) {
        info!(target: "broadcast", "{}", message);
    }

    fn execute_console_command(&self, command: &str) -> Result<(), PlatformError> {
        if command.trim().is_empty() {
            return Err(PlatformError::CommandFailed {
                command: command.to_string(),
                reason: "empty command".to_string(),
            });
        }
        info!(target: "console", "{}", command.trim_start_matches('/'));
        Ok(())
    }

    fn kick_players(&self, reason: &str) {
        let whitelist = &self.whitelist;
        let mut kicked = 0;
        self.sessions.retain_sync(|player_id, _| {
            let stays = whitelist.contains(*player_id);
            if !stays {
                kicked += 1;
            }
            stays
        });
        info!(kicked, %reason, "kicked players for maintenance");
    }
}

impl Platform for SessionPlatform {
    fn online_players(&self) -> usize {
        self.sessions.len()
    }

    fn max_players(&self) -> usize {
        self.max_players
    }
}
