//! Serial task queue.
//!
//! Every window mutation (growth, visibility pass, eviction, navigation)
//! runs through one [`TaskQueue`]. Tasks start in submission order and a task
//! does not start until the previous one has settled.

use core::future::Future;
use core::pin::Pin;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::ManagerError;

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + 'static>;

/// Single-worker FIFO of async tasks.
#[derive(Debug)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl TaskQueue {
    /// Start the queue worker on the current tokio runtime.
    pub fn new() -> Result<Self, ManagerError> {
        let handle = Handle::try_current().map_err(|_| ManagerError::NoRuntime)?;
        Ok(Self::with_handle(&handle))
    }

    /// Start the queue worker on `handle`.
    pub fn with_handle(handle: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = handle.spawn(async move {
            while let Some(job) = rx.recv().await {
                job().await;
            }
        });
        Self { tx, worker }
    }

    /// Submit a task.
    ///
    /// The task is queued immediately; it runs even if the returned future is
    /// dropped. Awaiting the future yields the task's output once it settles.
    pub fn enqueue<F, Fut, T>(
        &self,
        task: F,
    ) -> impl Future<Output = Result<T, ManagerError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let out = task().await;
                let _ = done_tx.send(out);
            })
        });
        let queued = self.tx.send(job).is_ok();
        if !queued {
            log::debug!("task queue closed; dropping task");
        }
        async move {
            if !queued {
                return Err(ManagerError::QueueClosed);
            }
            done_rx.await.map_err(|_| ManagerError::QueueClosed)
        }
    }

    /// Resolves once every task submitted before this call has settled.
    pub fn idle(&self) -> impl Future<Output = Result<(), ManagerError>> + Send + 'static {
        self.enqueue(|| async {})
    }

    /// Stop the worker. Pending tasks are dropped and their futures resolve
    /// to [`ManagerError::QueueClosed`].
    pub fn close(&self) {
        self.worker.abort();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed() || self.worker.is_finished()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn tasks_run_in_submission_order_without_overlap() {
        let queue = TaskQueue::new().expect("runtime");
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut pending = Vec::new();
        for (idx, delay) in [(0u32, 30u64), (1, 5), (2, 0)] {
            let log = Arc::clone(&log);
            pending.push(queue.enqueue(move || async move {
                log.lock().expect("log").push(format!("start {}", idx));
                tokio::time::sleep(Duration::from_millis(delay)).await;
                log.lock().expect("log").push(format!("end {}", idx));
                idx
            }));
        }

        let mut results = Vec::new();
        for fut in pending {
            results.push(fut.await.expect("task"));
        }
        assert_eq!(results, vec![0, 1, 2]);
        assert_eq!(
            *log.lock().expect("log"),
            vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_future_still_runs_task() {
        let queue = TaskQueue::new().expect("runtime");
        let hits = Arc::new(Mutex::new(0));
        {
            let hits = Arc::clone(&hits);
            drop(queue.enqueue(move || async move {
                *hits.lock().expect("hits") += 1;
            }));
        }
        queue.idle().await.expect("idle");
        assert_eq!(*hits.lock().expect("hits"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_queue_reports_closed() {
        let queue = TaskQueue::new().expect("runtime");
        queue.close();
        tokio::task::yield_now().await;
        let result = queue.enqueue(|| async { 1 }).await;
        assert_eq!(result, Err(ManagerError::QueueClosed));
    }

    #[test]
    fn new_outside_runtime_fails() {
        assert!(matches!(TaskQueue::new(), Err(ManagerError::NoRuntime)));
    }
}
