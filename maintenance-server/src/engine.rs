//! Countdown and recurring schedules that flip maintenance mode over time.
//!
//! The engine holds at most one [`ScheduledTransition`]. It is advanced by
//! [`tick`](ScheduledTransitionEngine::tick) once per second and only ever
//! changes the maintenance flag through [`MaintenanceState::set_mode`].

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::helpers::format_hms;
use crate::platform::NotificationPort;
use crate::settings::{Message, Settings};
use crate::state::MaintenanceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    CountingDown,
    /// Last transition ran to zero; no transition is held.
    Completed,
    /// Last transition was cancelled; no transition is held.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    SingleShot,
    /// Alternates `delay_seconds` of normal operation with
    /// `maintenance_duration_seconds` of maintenance until cancelled.
    Recurring {
        delay_seconds: u64,
        maintenance_duration_seconds: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTransition {
    pub kind: TransitionKind,
    /// Mode applied when the countdown reaches zero.
    pub target_state: bool,
    pub seconds_remaining: u64,
    /// Remaining-second values at which a countdown broadcast fires.
    pub broadcast_thresholds: BTreeSet<u64>,
}

/// Outcome of [`ScheduledTransitionEngine::resume_from_persisted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// No end-timer was stored.
    NothingSaved,
    /// Maintenance was already off; the stale end-timer was cleared.
    AlreadyDisabled,
    /// The deadline passed while the process was down; maintenance was disabled.
    Expired,
    /// The countdown continues with this many seconds left.
    Resumed { seconds_remaining: u64 },
}

/// Caller-configurable engine behaviour, normally read from [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub broadcast_thresholds: BTreeSet<u64>,
    /// Persist the deadline of disable countdowns for crash recovery.
    pub persist_end_timer: bool,
    /// Broadcast templates for countdowns towards enable / disable; `%TIME%`
    /// is replaced by `HH:MM:SS`.
    pub enable_broadcast: String,
    pub disable_broadcast: String,
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings<'_>) -> Self {
        Self {
            broadcast_thresholds: settings.broadcast_thresholds(),
            persist_end_timer: settings.save_end_timer_on_stop(),
            enable_broadcast: settings.message(Message::StartTimerBroadcast),
            disable_broadcast: settings.message(Message::EndTimerBroadcast),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            broadcast_thresholds: BTreeSet::new(),
            persist_end_timer: true,
            enable_broadcast: Message::StartTimerBroadcast.fallback().to_string(),
            disable_broadcast: Message::EndTimerBroadcast.fallback().to_string(),
        }
    }
}

pub struct ScheduledTransitionEngine {
    options: EngineOptions,
    transition: Option<ScheduledTransition>,
    state: EngineState,
}

impl ScheduledTransitionEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            transition: None,
            state: EngineState::Idle,
        }
    }

    /// Replace the options. A running transition keeps the thresholds it was
    /// created with.
    pub fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.transition.is_some()
    }

    pub fn transition(&self) -> Option<&ScheduledTransition> {
        self.transition.as_ref()
    }

    pub fn seconds_remaining(&self) -> Option<u64> {
        self.transition.as_ref().map(|t| t.seconds_remaining)
    }

    /// Count down `duration_seconds` and then set maintenance to
    /// `target_state`. Ignored when the duration is not positive or the target
    /// is already the current mode. Replaces any running transition.
    pub fn start(
        &mut self,
        duration_seconds: i64,
        target_state: bool,
        state: &mut MaintenanceState,
        now_millis: i64,
    ) -> bool {
        let Ok(seconds) = u64::try_from(duration_seconds) else {
            return false;
        };
        if seconds == 0 || target_state == state.is_enabled() {
            return false;
        }

        self.arm(TransitionKind::SingleShot, target_state, seconds);

        if !target_state && self.options.persist_end_timer {
            let deadline = now_millis.saturating_add(duration_seconds.saturating_mul(1000));
            state.set_saved_end_timer(Some(deadline));
        } else if state.saved_end_timer().is_some() {
            // A replaced disable countdown must not be resumed after a restart
            state.set_saved_end_timer(None);
        }

        info!(seconds, target_state, "started maintenance countdown");
        true
    }

    /// Enable maintenance after `delay_seconds`, disable it again after
    /// `maintenance_duration_seconds`, and repeat until cancelled. Ignored
    /// when either interval is not positive. Never persisted.
    pub fn schedule(
        &mut self,
        delay_seconds: i64,
        maintenance_duration_seconds: i64,
        state: &mut MaintenanceState,
    ) -> bool {
        let (Ok(delay), Ok(duration)) = (
            u64::try_from(delay_seconds),
            u64::try_from(maintenance_duration_seconds),
        ) else {
            return false;
        };
        if delay == 0 || duration == 0 {
            return false;
        }

        let kind = TransitionKind::Recurring {
            delay_seconds: delay,
            maintenance_duration_seconds: duration,
        };
        self.arm(kind, true, delay);
        if state.saved_end_timer().is_some() {
            state.set_saved_end_timer(None);
        }

        info!(delay, duration, "scheduled recurring maintenance");
        true
    }

    fn arm(&mut self, kind: TransitionKind, target_state: bool, seconds: u64) {
        if self.transition.is_some() {
            debug!("replacing running transition");
        }
        self.transition = Some(ScheduledTransition {
            kind,
            target_state,
            seconds_remaining: seconds,
            broadcast_thresholds: self.options.broadcast_thresholds.clone(),
        });
        self.state = EngineState::CountingDown;
    }

    /// Advance the running transition by one second. Returns the mode that
    /// was applied if the countdown reached zero on this tick.
    pub fn tick(&mut self, state: &mut MaintenanceState, port: &dyn NotificationPort) -> Option<bool> {
        let transition = self.transition.as_mut()?;

        if transition
            .broadcast_thresholds
            .contains(&transition.seconds_remaining)
        {
            let template = if transition.target_state {
                &self.options.enable_broadcast
            } else {
                &self.options.disable_broadcast
            };
            port.broadcast(&template.replace("%TIME%", &format_hms(transition.seconds_remaining)));
        }

        transition.seconds_remaining = transition.seconds_remaining.saturating_sub(1);
        if transition.seconds_remaining > 0 {
            return None;
        }

        let target = transition.target_state;
        let kind = transition.kind;
        match kind {
            TransitionKind::SingleShot => {
                self.transition = None;
                self.state = EngineState::Completed;
                if state.saved_end_timer().is_some() {
                    state.set_saved_end_timer(None);
                }
                info!(target, "maintenance countdown finished");
            }
            TransitionKind::Recurring {
                delay_seconds,
                maintenance_duration_seconds,
            } => {
                transition.target_state = !target;
                transition.seconds_remaining = if target {
                    maintenance_duration_seconds
                } else {
                    delay_seconds
                };
                debug!(target, next_in = transition.seconds_remaining, "recurring maintenance phase");
            }
        }

        state.set_mode(target, port);
        Some(target)
    }

    /// Stop the running transition and clear any persisted end-timer.
    /// Returns `false` if nothing was running.
    pub fn cancel(&mut self, state: &mut MaintenanceState) -> bool {
        if self.transition.take().is_none() {
            return false;
        }
        self.state = EngineState::Cancelled;
        if state.saved_end_timer().is_some() {
            state.set_saved_end_timer(None);
        }
        info!("maintenance countdown cancelled");
        true
    }

    /// Continue a disable countdown that was running when the process
    /// stopped. `saved_end_timer` is the persisted deadline in epoch millis
    /// (0 = none). The stored deadline is left untouched while resuming.
    pub fn resume_from_persisted(
        &mut self,
        saved_end_timer: i64,
        now_millis: i64,
        state: &mut MaintenanceState,
        port: &dyn NotificationPort,
    ) -> Resume {
        if saved_end_timer == 0 {
            return Resume::NothingSaved;
        }

        if !state.is_enabled() {
            state.set_saved_end_timer(None);
            info!("maintenance already disabled, dropped saved end-timer");
            return Resume::AlreadyDisabled;
        }

        // Less than a full second left counts as expired
        let seconds = u64::try_from(saved_end_timer.saturating_sub(now_millis) / 1000).unwrap_or(0);
        if seconds == 0 {
            state.set_mode(false, port);
            state.set_saved_end_timer(None);
            info!("saved end-timer expired while stopped, maintenance disabled");
            return Resume::Expired;
        }

        self.arm(TransitionKind::SingleShot, false, seconds);
        info!(seconds, "resumed maintenance end-timer");
        Resume::Resumed {
            seconds_remaining: seconds,
        }
    }
}
