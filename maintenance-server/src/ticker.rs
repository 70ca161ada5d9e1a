use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::service::Maintenance;

/// Drive [`Maintenance::tick`] once per second until the handle is aborted.
///
/// Each tick runs on the blocking pool and is awaited before the next one,
/// so ticks never overlap.
pub fn spawn_ticker(service: Arc<Maintenance>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let service = service.clone();
            match tokio::task::spawn_blocking(move || service.tick()).await {
                Ok(Some(enabled)) => debug!(enabled, "scheduled transition applied"),
                Ok(None) => {}
                Err(e) => error!(error = %e, "maintenance tick failed"),
            }
        }
    })
}
