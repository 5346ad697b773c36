use std::{sync::Arc, time::Duration};

use futures::{future::BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Handle to a task that will run once, later
pub trait ScheduledTask: Send {
    /// Prevents the task from running if it has not started yet
    fn cancel(&self);
}

/// Where view tracking gets its timers and background tasks from
pub trait Scheduler: Send + Sync + 'static {
    type Task: ScheduledTask;

    fn schedule_once(&self, delay: Duration, task: BoxFuture<'static, ()>) -> Self::Task;

    /// Runs `task` in the background, its outcome is not observed
    fn spawn(&self, task: BoxFuture<'static, ()>);

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

#[derive(Clone, Debug)]
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,

    /// Tasks started with `spawn` that may still be running
    spawned: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TokioScheduler {
    /// Uses the runtime this is called from
    pub fn current() -> anyhow::Result<TokioScheduler> {
        Ok(TokioScheduler::new(tokio::runtime::Handle::try_current()?))
    }

    pub fn new(runtime: tokio::runtime::Handle) -> TokioScheduler {
        TokioScheduler {
            runtime,
            spawned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Waits for every spawned task to complete, including the ones spawned
    /// while waiting
    pub async fn join_spawned(&self) {
        loop {
            let handles = std::mem::take(&mut *self.spawned.lock());
            if handles.is_empty() {
                return;
            }
            for h in handles {
                if let Err(err) = h.await {
                    tracing::warn!(?err, "background task failed");
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct TokioTask(JoinHandle<()>);

impl ScheduledTask for TokioTask {
    fn cancel(&self) {
        self.0.abort()
    }
}

impl Scheduler for TokioScheduler {
    type Task = TokioTask;

    fn schedule_once(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TokioTask {
        TokioTask(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await
        }))
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) {
        let handle = self.runtime.spawn(task);
        let mut spawned = self.spawned.lock();
        spawned.retain(|h| !h.is_finished());
        spawned.push(handle);
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}
