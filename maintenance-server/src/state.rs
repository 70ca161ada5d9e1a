use maintenance_store::{ConfigDocument, StoreError};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::platform::NotificationPort;
use crate::settings::{self, Message, Settings};

/// Published once for every change of the maintenance flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceChanged {
    pub enabled: bool,
}

/// Owner of the maintenance flag and the crash-recovery end-timer.
pub struct MaintenanceState {
    doc: ConfigDocument,
    enabled: bool,
    events: broadcast::Sender<MaintenanceChanged>,
}

impl MaintenanceState {
    /// Wrap a loaded config document, migrating deprecated keys first.
    pub fn load(mut doc: ConfigDocument) -> Self {
        if let Err(e) = doc.migrate() {
            warn!(error = %e, "failed to save migrated config");
        }
        let enabled = Settings::new(&doc).maintenance_enabled();
        let (events, _) = broadcast::channel(16);
        info!(enabled, location = %doc.location(), "loaded maintenance state");
        Self {
            doc,
            enabled,
            events,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn settings(&self) -> Settings<'_> {
        Settings::new(&self.doc)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MaintenanceChanged> {
        self.events.subscribe()
    }

    /// Persist the flag and run the side effects of the transition. Setting
    /// the current value again still saves and notifies.
    pub fn set_mode(&mut self, enabled: bool, port: &dyn NotificationPort) {
        self.enabled = enabled;
        self.doc.set(settings::MAINTENANCE_ENABLED, enabled);
        if let Err(e) = self.doc.save() {
            warn!(error = %e, enabled, "failed to save maintenance flag");
        }

        let settings = Settings::new(&self.doc);
        if enabled {
            port.broadcast(&settings.message(Message::MaintenanceActivated));
            if settings.kick_on_maintenance() {
                port.kick_players(&settings.message(Message::KickMessage));
            }
        } else {
            port.broadcast(&settings.message(Message::MaintenanceDeactivated));
        }

        for command in settings.commands_for(enabled) {
            if let Err(e) = port.execute_console_command(&command) {
                error!(error = %e, %command, enabled, "maintenance command failed");
            }
        }

        // No subscribers is fine
        let _ = self.events.send(MaintenanceChanged { enabled });
        info!(enabled, "maintenance mode changed");
    }

    pub fn saved_end_timer(&self) -> Option<i64> {
        self.settings().saved_end_timer()
    }

    /// Persist the end-timer immediately. `None` clears it.
    pub fn set_saved_end_timer(&mut self, value: Option<i64>) {
        self.doc.set(settings::SAVED_END_TIMER, value.unwrap_or(0));
        if let Err(e) = self.doc.save() {
            warn!(error = %e, ?value, "failed to save end-timer");
        }
    }

    /// Re-read the document. The flag follows the stored value, without
    /// running transition side effects.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.reload_with(|| Ok(()))
    }

    /// Like [`reload`](Self::reload), but `also` runs after the document was
    /// read and before it is adopted. If either step fails nothing changes.
    pub fn reload_with(
        &mut self,
        also: impl FnOnce() -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        self.doc.reload_with(|_| also())?;
        self.enabled = self.settings().maintenance_enabled();
        Ok(())
    }
}
