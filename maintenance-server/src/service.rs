use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use maintenance_store::{AccessControlList, StoreError};
use rand::seq::SliceRandom;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::engine::{
    EngineOptions, EngineState, Resume, ScheduledTransitionEngine, TransitionKind,
};
use crate::helpers::{fill_timer_template, now_millis};
use crate::platform::{ConnectionGate, Platform, StatusQuery};
use crate::settings::Message;
use crate::state::{MaintenanceChanged, MaintenanceState};

/// Snapshot of the running transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerStatus {
    pub seconds_remaining: u64,
    pub target_state: bool,
    pub recurring: bool,
}

struct Inner {
    state: MaintenanceState,
    engine: ScheduledTransitionEngine,
}

/// The maintenance core behind one lock.
///
/// Ticks, countdown requests and manual mode changes all go through the same
/// mutex, so a manual change can never interleave with a tick's own change.
/// Methods may block on storage I/O; async callers should use
/// [`crate::background::spawn_blocking`].
pub struct Maintenance {
    inner: Mutex<Inner>,
    whitelist: Arc<AccessControlList>,
    platform: Arc<dyn Platform>,
}

impl Maintenance {
    pub fn new(
        state: MaintenanceState,
        whitelist: Arc<AccessControlList>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        let engine = ScheduledTransitionEngine::new(EngineOptions::from_settings(&state.settings()));
        Self {
            inner: Mutex::new(Inner { state, engine }),
            whitelist,
            platform,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn whitelist(&self) -> &AccessControlList {
        &self.whitelist
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MaintenanceChanged> {
        self.lock().state.subscribe()
    }

    /// Switch maintenance immediately. Any running countdown is cancelled first.
    pub fn set_maintenance(&self, enabled: bool) {
        let mut guard = self.lock();
        let Inner { state, engine } = &mut *guard;
        engine.cancel(state);
        state.set_mode(enabled, self.platform.as_ref());
    }

    /// See [`ScheduledTransitionEngine::start`].
    pub fn start_timer(&self, seconds: i64, enable: bool) -> bool {
        let mut guard = self.lock();
        let Inner { state, engine } = &mut *guard;
        engine.start(seconds, enable, state, now_millis())
    }

    /// See [`ScheduledTransitionEngine::schedule`].
    pub fn schedule_timer(&self, delay_seconds: i64, maintenance_duration_seconds: i64) -> bool {
        let mut guard = self.lock();
        let Inner { state, engine } = &mut *guard;
        engine.schedule(delay_seconds, maintenance_duration_seconds, state)
    }

    pub fn cancel_timer(&self) -> bool {
        let mut guard = self.lock();
        let Inner { state, engine } = &mut *guard;
        engine.cancel(state)
    }

    /// One scheduler step; called once per second by the ticker.
    pub fn tick(&self) -> Option<bool> {
        let mut guard = self.lock();
        let Inner { state, engine } = &mut *guard;
        engine.tick(state, self.platform.as_ref())
    }

    /// Continue an interrupted disable countdown at startup.
    pub fn resume(&self) -> Resume {
        self.resume_at(now_millis())
    }

    pub fn resume_at(&self, now_millis: i64) -> Resume {
        let mut guard = self.lock();
        let Inner { state, engine } = &mut *guard;
        if !state.settings().save_end_timer_on_stop() {
            return Resume::NothingSaved;
        }
        let Some(saved) = state.saved_end_timer() else {
            return Resume::NothingSaved;
        };
        info!(saved, "found interrupted end-timer from last run");
        engine.resume_from_persisted(saved, now_millis, state, self.platform.as_ref())
    }

    pub fn engine_state(&self) -> EngineState {
        self.lock().engine.state()
    }

    pub fn timer_status(&self) -> Option<TimerStatus> {
        let guard = self.lock();
        guard.engine.transition().map(|t| TimerStatus {
            seconds_remaining: t.seconds_remaining,
            target_state: t.target_state,
            recurring: matches!(t.kind, TransitionKind::Recurring { .. }),
        })
    }

    pub fn saved_end_timer(&self) -> Option<i64> {
        self.lock().state.saved_end_timer()
    }

    /// Whether `player_id` may connect right now.
    pub fn admits(&self, player_id: Uuid) -> bool {
        !self.is_maintenance() || self.whitelist.is_allowed(player_id)
    }

    /// Disconnect reason shown to players refused during maintenance.
    pub fn deny_message(&self) -> String {
        self.lock().state.settings().message(Message::KickMessage)
    }

    /// A configured server-list message with `%TIMER%`, `%ONLINE%` and `%MAX%`
    /// filled in, or `None` when ping messages are disabled or empty.
    pub fn ping_message(&self) -> Option<String> {
        let guard = self.lock();
        let settings = guard.state.settings();
        if !settings.enable_ping_messages() {
            return None;
        }
        let message = settings.ping_messages().choose(&mut rand::thread_rng())?.clone();
        let timer = timer_message(&guard);
        drop(guard);

        Some(
            message
                .replace("%TIMER%", &timer)
                .replace("%ONLINE%", &self.platform.online_players().to_string())
                .replace("%MAX%", &self.platform.max_players().to_string()),
        )
    }

    /// Re-read the config and whitelist documents, all or nothing. Engine
    /// options are refreshed; a running transition is left alone.
    pub fn reload(&self) -> Result<(), StoreError> {
        let mut guard = self.lock();
        let Inner { state, engine } = &mut *guard;
        state.reload_with(|| self.whitelist.reload())?;
        engine.set_options(EngineOptions::from_settings(&state.settings()));
        info!("reloaded configuration");
        Ok(())
    }
}

fn timer_message(inner: &Inner) -> String {
    let settings = inner.state.settings();
    match inner.engine.seconds_remaining() {
        Some(seconds) => fill_timer_template(&settings.message(Message::MotdTimer), seconds),
        None => settings.message(Message::MotdTimerNotRunning),
    }
}

impl StatusQuery for Maintenance {
    fn is_maintenance(&self) -> bool {
        self.lock().state.is_enabled()
    }

    fn timer_message(&self) -> String {
        timer_message(&self.lock())
    }
}
