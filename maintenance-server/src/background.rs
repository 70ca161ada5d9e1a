//! Bounded background work.
//!
//! Every task gets a name and a timeout so a stuck storage write or a slow
//! collaborator is reported instead of silently hanging its caller.

use std::time::Duration;

use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task '{name}' timed out after {timeout:?}")]
    TimedOut { name: &'static str, timeout: Duration },

    #[error("task '{name}' failed: {source}")]
    Failed {
        name: &'static str,
        #[source]
        source: JoinError,
    },
}

/// Handle to blocking work running on the tokio runtime.
pub struct TaskHandle<T> {
    name: &'static str,
    timeout: Duration,
    handle: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    /// Wait for the result, at most for the task's timeout. A timed out task
    /// runs to completion in the background but its result is discarded.
    pub async fn join(self) -> Result<T, TaskError> {
        let Self {
            name,
            timeout,
            mut handle,
        } = self;
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(result) => result.map_err(|source| TaskError::Failed { name, source }),
            Err(_) => {
                warn!(task = name, ?timeout, "background task timed out");
                Err(TaskError::TimedOut { name, timeout })
            }
        }
    }
}

/// Run blocking work (storage I/O, mode changes) off the async workers.
pub fn spawn_blocking<T, F>(name: &'static str, timeout: Duration, f: F) -> TaskHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    TaskHandle {
        name,
        timeout,
        handle: tokio::task::spawn_blocking(f),
    }
}
