use std::{
    collections::HashSet,
    sync::{Arc, Weak},
};

use async_trait::async_trait;
use futures::{future::join_all, FutureExt};
use parking_lot::Mutex;

use crate::{
    api::{Config, ContentType, TrackingKey, UserId, ViewEvent},
    ScheduledTask, Scheduler,
};

/// Receives the view events once they leave the batch
#[async_trait]
pub trait ViewSink: Send + Sync + 'static {
    async fn send(&self, event: ViewEvent) -> anyhow::Result<()>;
}

/// One entry of a bulk view report
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ViewItem {
    pub content_type: ContentType,
    pub content_id: String,
    pub viewer_id: Option<UserId>,
}

/// Batches content views and forwards each piece of content at most once to
/// a `ViewSink`.
///
/// A batch leaves either when it reaches `Config::batch_size`, or
/// `Config::batch_delay` after the first view of an idle window. Dropping the
/// tracker flushes whatever is still pending.
///
/// Delivery is best-effort: a view whose delivery failed is not retried, and
/// will not be tracked again by this tracker.
pub struct ViewTracker<S: Scheduler> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: Scheduler> {
    config: Config,
    sink: Arc<dyn ViewSink>,
    scheduler: S,
    state: Mutex<State<S::Task>>,
}

struct State<T> {
    tracked: HashSet<TrackingKey>,
    pending: Vec<ViewEvent>,

    /// Armed flush timer, along with its generation
    timer: Option<(u64, T)>,
    next_timer: u64,
}

impl<S: Scheduler> ViewTracker<S> {
    pub fn new(config: Config, sink: Arc<dyn ViewSink>, scheduler: S) -> ViewTracker<S> {
        ViewTracker {
            inner: Arc::new(Inner {
                config,
                sink,
                scheduler,
                state: Mutex::new(State {
                    tracked: HashSet::new(),
                    pending: Vec::new(),
                    timer: None,
                    next_timer: 0,
                }),
            }),
        }
    }

    pub fn record_view(
        &self,
        content_type: ContentType,
        content_id: &str,
        viewer_id: Option<UserId>,
    ) {
        let event = ViewEvent::now(content_type, String::from(content_id), viewer_id);
        if let Some(batch) = self.inner.enqueue(event) {
            self.inner.spawn_delivery(batch);
        }
    }

    /// Records each not-yet-tracked item in turn, pausing for
    /// `Config::item_spacing` between two of them
    pub async fn record_views(&self, items: impl IntoIterator<Item = ViewItem>) {
        let mut items = items.into_iter().collect::<Vec<_>>();
        {
            let state = self.inner.state.lock();
            items.retain(|i| {
                !state
                    .tracked
                    .contains(&TrackingKey::new(i.content_type, &i.content_id))
            });
        }
        for (n, item) in items.into_iter().enumerate() {
            if n != 0 {
                self.inner
                    .scheduler
                    .sleep(self.inner.config.item_spacing())
                    .await;
            }
            self.record_view(item.content_type, &item.content_id, item.viewer_id);
        }
    }

    /// Delivers the pending batch now, and waits for the delivery to complete
    pub async fn flush(&self) {
        let batch = self.inner.take_batch();
        deliver(self.inner.sink.clone(), batch).await
    }

    pub fn is_tracked(&self, content_type: ContentType, content_id: &str) -> bool {
        self.inner
            .state
            .lock()
            .tracked
            .contains(&TrackingKey::new(content_type, content_id))
    }

    pub fn num_pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn has_armed_timer(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }

    /// Tears the tracker down, flushing any pending view in the background
    pub fn dispose(self) {
        drop(self)
    }
}

impl<S: Scheduler> Drop for ViewTracker<S> {
    fn drop(&mut self) {
        let batch = self.inner.take_batch();
        if !batch.is_empty() {
            tracing::debug!(num_events = batch.len(), "flushing views on tracker teardown");
            self.inner.spawn_delivery(batch);
        }
    }
}

impl<S: Scheduler> Inner<S> {
    /// Returns the batch to deliver right away, if this event filled it
    fn enqueue(self: &Arc<Self>, event: ViewEvent) -> Option<Vec<ViewEvent>> {
        let key = event.key();
        let mut state = self.state.lock();
        if !state.tracked.insert(key.clone()) {
            tracing::debug!(%key, "view already tracked");
            return None;
        }
        state.pending.push(event);

        if state.pending.len() >= self.config.batch_size {
            if let Some((_, timer)) = state.timer.take() {
                timer.cancel();
            }
            return Some(std::mem::take(&mut state.pending));
        }

        if state.timer.is_none() {
            let generation = state.next_timer;
            state.next_timer += 1;
            let this: Weak<Self> = Arc::downgrade(self);
            let task = async move {
                if let Some(this) = this.upgrade() {
                    this.on_timer(generation).await;
                }
            };
            let timer = self
                .scheduler
                .schedule_once(self.config.batch_delay(), task.boxed());
            state.timer = Some((generation, timer));
        }
        None
    }

    async fn on_timer(&self, generation: u64) {
        let batch = {
            let mut state = self.state.lock();
            if !matches!(&state.timer, Some((g, _)) if *g == generation) {
                // superseded by a flush that could not cancel us in time
                return;
            }
            state.timer = None;
            std::mem::take(&mut state.pending)
        };
        deliver(self.sink.clone(), batch).await
    }

    fn take_batch(&self) -> Vec<ViewEvent> {
        let mut state = self.state.lock();
        if let Some((_, timer)) = state.timer.take() {
            timer.cancel();
        }
        std::mem::take(&mut state.pending)
    }

    fn spawn_delivery(&self, batch: Vec<ViewEvent>) {
        self.scheduler.spawn(deliver(self.sink.clone(), batch).boxed());
    }
}

/// Sends all the events concurrently; one failing does not prevent the others
async fn deliver(sink: Arc<dyn ViewSink>, batch: Vec<ViewEvent>) {
    if batch.is_empty() {
        return;
    }
    tracing::debug!(num_events = batch.len(), "flushing view batch");
    let sends = batch.into_iter().map(|e| {
        let key = e.key();
        sink.send(e).map(move |res| (key, res))
    });
    for (key, res) in join_all(sends).await {
        if let Err(err) = res {
            tracing::warn!(%key, ?err, "failed to deliver view event");
        }
    }
}
