//! Cancellable one-shot timers.

use core::time::Duration;
use std::sync::Mutex;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Re-armable timer: scheduling again replaces the pending callback.
///
/// At most one callback is pending per timer. Dropping the timer cancels it.
#[derive(Debug)]
pub struct Debounce {
    handle: Handle,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debounce {
    pub fn new(handle: Handle, delay: Duration) -> Self {
        Self {
            handle,
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `f` after the timer's delay unless re-armed or cancelled first.
    pub fn schedule<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_after(self.delay, f);
    }

    /// Like [`Debounce::schedule`] with an explicit delay.
    pub fn schedule_after<F>(&self, delay: Duration, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        let Ok(mut pending) = self.pending.lock() else {
            task.abort();
            return;
        };
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Drop the pending callback, if any.
    pub fn cancel(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(task) = pending.take() {
                task.abort();
            }
        }
    }

    /// Whether a callback is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.as_ref().is_some_and(|task| !task.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for Debounce {
    fn drop(&mut self) {
        self.cancel();
    }
}
