//! Typed view over the main configuration document.

use std::collections::BTreeSet;

use maintenance_store::ConfigDocument;

/// Bundled document written on first start.
pub const DEFAULT_CONFIG: &str = include_str!("../resources/config.yml");

pub const MAINTENANCE_ENABLED: &str = "maintenance-enabled";
pub const SAVED_END_TIMER: &str = "saved-endtimer";
pub const SAVE_END_TIMER_ON_STOP: &str = "save-endtimer-on-stop";
pub const BROADCAST_THRESHOLDS: &str = "timer-broadcast-for-seconds";
pub const COMMANDS_ON_ENABLE: &str = "commands-on-enable";
pub const COMMANDS_ON_DISABLE: &str = "commands-on-disable";
pub const KICK_ON_MAINTENANCE: &str = "kick-on-maintenance";
pub const ENABLE_PING_MESSAGES: &str = "enable-ping-messages";
pub const PING_MESSAGES: &str = "pingmessages";

/// User-facing texts, looked up under `messages.<key>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    MaintenanceActivated,
    MaintenanceDeactivated,
    StartTimerBroadcast,
    EndTimerBroadcast,
    MotdTimer,
    MotdTimerNotRunning,
    KickMessage,
}

impl Message {
    pub fn key(self) -> &'static str {
        match self {
            Message::MaintenanceActivated => "maintenanceActivated",
            Message::MaintenanceDeactivated => "maintenanceDeactivated",
            Message::StartTimerBroadcast => "starttimerBroadcast",
            Message::EndTimerBroadcast => "endtimerBroadcast",
            Message::MotdTimer => "motdTimer",
            Message::MotdTimerNotRunning => "motdTimerNotRunning",
            Message::KickMessage => "kickMessage",
        }
    }

    /// Text used when the document has no entry.
    pub fn fallback(self) -> &'static str {
        match self {
            Message::MaintenanceActivated => "&cMaintenance mode is now enabled!",
            Message::MaintenanceDeactivated => "&aMaintenance mode is no longer enabled!",
            Message::StartTimerBroadcast => "&6Maintenance mode will be enabled in &a%TIME%&6.",
            Message::EndTimerBroadcast => "&6Maintenance mode will be disabled in &a%TIME%&6.",
            Message::MotdTimer => "%HOURS%:%MINUTES%:%SECONDS%",
            Message::MotdTimerNotRunning => "-",
            Message::KickMessage => "&cThe server is currently under maintenance!",
        }
    }
}

/// Borrowed, typed accessors for the known keys. Absent keys fall back to
/// `false` / empty lists / built-in messages.
#[derive(Clone, Copy)]
pub struct Settings<'a> {
    doc: &'a ConfigDocument,
}

impl<'a> Settings<'a> {
    pub fn new(doc: &'a ConfigDocument) -> Self {
        Self { doc }
    }

    pub fn maintenance_enabled(&self) -> bool {
        self.doc.get_bool(MAINTENANCE_ENABLED)
    }

    /// Persisted countdown deadline; `None` when unset or zero.
    pub fn saved_end_timer(&self) -> Option<i64> {
        self.doc.get_i64(SAVED_END_TIMER).filter(|&t| t > 0)
    }

    pub fn save_end_timer_on_stop(&self) -> bool {
        self.doc.get_bool(SAVE_END_TIMER_ON_STOP)
    }

    /// Countdown broadcast thresholds; negative entries are dropped.
    pub fn broadcast_thresholds(&self) -> BTreeSet<u64> {
        self.doc
            .get_int_list(BROADCAST_THRESHOLDS)
            .into_iter()
            .filter_map(|s| u64::try_from(s).ok())
            .collect()
    }

    /// Console commands for a transition into `enabled`.
    pub fn commands_for(&self, enabled: bool) -> Vec<String> {
        let path = if enabled {
            COMMANDS_ON_ENABLE
        } else {
            COMMANDS_ON_DISABLE
        };
        self.doc.get_string_list(path)
    }

    pub fn kick_on_maintenance(&self) -> bool {
        self.doc.get_bool(KICK_ON_MAINTENANCE)
    }

    pub fn enable_ping_messages(&self) -> bool {
        self.doc.get_bool(ENABLE_PING_MESSAGES)
    }

    /// Ping messages with color codes and `%NEWLINE%` resolved.
    pub fn ping_messages(&self) -> Vec<String> {
        self.doc
            .get_string_list(PING_MESSAGES)
            .iter()
            .map(|m| maintenance_store::translate_color_codes(m).replace("%NEWLINE%", "\n"))
            .collect()
    }

    pub fn message(&self, message: Message) -> String {
        self.doc
            .get_string_or(&format!("messages.{}", message.key()), message.fallback())
            .replace("%NEWLINE%", "\n")
    }
}
