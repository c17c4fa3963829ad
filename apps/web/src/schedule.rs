//! Delayed visual effects as explicit, cancellable tokio tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a task started by [`schedule_after`].
/// Dropping the handle detaches the task; call [`TaskHandle::cancel`] to stop it.
#[derive(Debug)]
pub struct TaskHandle {
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Runs `task` once `delay` has elapsed.
pub fn schedule_after<F>(delay: Duration, task: F) -> TaskHandle
where
    F: FnOnce() + Send + 'static,
{
    let join = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        task();
    });
    TaskHandle { join }
}

/// Cooperative cancellation for effects that run as a loop of small steps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
