use std::{
    collections::VecDeque,
    sync::{Arc, Weak},
    time::Duration,
};

use futures::{future::BoxFuture, FutureExt};
use kdom_client::{ScheduledTask, Scheduler};
use parking_lot::Mutex;

/// Scheduler driven by hand, with a virtual clock.
///
/// Nothing runs until the test says so: timers become ready with `advance`,
/// and ready tasks (including spawned ones) run with `run_until_idle`.
/// Awaiting `sleep` advances the clock and runs whatever became ready, the
/// way a real sleep would let timers fire in the meantime.
#[derive(Clone, Default)]
pub struct ManualScheduler(Arc<Mutex<State>>);

#[derive(Default)]
struct State {
    now: Duration,
    next_id: u64,
    timers: Vec<Timer>,
    ready: VecDeque<BoxFuture<'static, ()>>,
}

struct Timer {
    id: u64,
    deadline: Duration,
    task: BoxFuture<'static, ()>,
}

pub struct ManualTask {
    id: u64,
    scheduler: Weak<Mutex<State>>,
}

impl ScheduledTask for ManualTask {
    fn cancel(&self) {
        if let Some(s) = self.scheduler.upgrade() {
            s.lock().timers.retain(|t| t.id != self.id);
        }
    }
}

impl ManualScheduler {
    pub fn new() -> ManualScheduler {
        ManualScheduler::default()
    }

    pub fn now(&self) -> Duration {
        self.0.lock().now
    }

    pub fn num_timers(&self) -> usize {
        self.0.lock().timers.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.0.lock().timers.iter().map(|t| t.deadline).min()
    }

    /// Moves the clock forward, making due timers ready in deadline order
    pub fn advance(&self, d: Duration) {
        let mut state = self.0.lock();
        state.now += d;
        let now = state.now;
        let (mut due, later): (Vec<_>, Vec<_>) =
            state.timers.drain(..).partition(|t| t.deadline <= now);
        state.timers = later;
        due.sort_by_key(|t| (t.deadline, t.id));
        state.ready.extend(due.into_iter().map(|t| t.task));
    }

    /// Runs ready tasks until there are none left
    pub fn run_until_idle(&self) {
        while let Some(task) = self.pop_ready() {
            futures::executor::block_on(task);
        }
    }

    pub fn advance_and_run(&self, d: Duration) {
        self.advance(d);
        self.run_until_idle();
    }

    fn pop_ready(&self) -> Option<BoxFuture<'static, ()>> {
        self.0.lock().ready.pop_front()
    }
}

impl Scheduler for ManualScheduler {
    type Task = ManualTask;

    fn schedule_once(&self, delay: Duration, task: BoxFuture<'static, ()>) -> ManualTask {
        let mut state = self.0.lock();
        let id = state.next_id;
        state.next_id += 1;
        let deadline = state.now + delay;
        state.timers.push(Timer { id, deadline, task });
        ManualTask {
            id,
            scheduler: Arc::downgrade(&self.0),
        }
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.0.lock().ready.push_back(task);
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let this = self.clone();
        async move {
            this.advance(duration);
            while let Some(task) = this.pop_ready() {
                task.await;
            }
        }
        .boxed()
    }
}
