//! Seams between the maintenance core and the host server.
//!
//! The core never branches on what kind of host it runs in. A host adapter
//! implements [`Platform`]; the protocol layer consumes [`StatusQuery`] and
//! [`ConnectionGate`].

use maintenance_store::AccessControlList;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("console command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },
}

/// Observable side effects of the maintenance core.
///
/// Implementations are called while the core holds its state lock and must
/// not call back into the service.
pub trait NotificationPort: Send + Sync {
    /// Send a message to every connected session.
    fn broadcast(&self, message: &str);

    /// Run a command as the server console.
    fn execute_console_command(&self, command: &str) -> Result<(), PlatformError>;

    /// Disconnect every session that may not stay during maintenance.
    fn kick_players(&self, _reason: &str) {}
}

/// Everything the core needs from a host server.
pub trait Platform: NotificationPort {
    fn online_players(&self) -> usize;

    fn max_players(&self) -> usize;
}

/// Decides whether an identity may connect while maintenance is enabled.
pub trait ConnectionGate: Send + Sync {
    fn is_allowed(&self, player_id: Uuid) -> bool;
}

impl ConnectionGate for AccessControlList {
    fn is_allowed(&self, player_id: Uuid) -> bool {
        self.contains(player_id)
    }
}

/// Read-only view for status displays.
pub trait StatusQuery {
    fn is_maintenance(&self) -> bool;

    /// Remaining countdown time, or the "not running" text.
    fn timer_message(&self) -> String;
}
