use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::executor::block_on;
use kdom_client::{
    api::{Config, ContentType, TrackingKey, UserId, ViewEvent},
    TokioScheduler, ViewItem, ViewSink, ViewTracker,
};
use kdom_mock_server::{ManualScheduler, MockSink};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn setup(config: Config) -> (ManualScheduler, Arc<MockSink>, ViewTracker<ManualScheduler>) {
    let sched = ManualScheduler::new();
    let sink = Arc::new(MockSink::new());
    let tracker = ViewTracker::new(config, sink.clone(), sched.clone());
    (sched, sink, tracker)
}

fn item(content_type: ContentType, id: &str) -> ViewItem {
    ViewItem {
        content_type,
        content_id: String::from(id),
        viewer_id: None,
    }
}

#[test]
fn same_content_is_reported_once() {
    let (sched, sink, tracker) = setup(Config::default());
    tracker.record_view(ContentType::Post, "42", None);
    tracker.record_view(ContentType::Post, "42", Some(UserId::stub()));
    assert_eq!(tracker.num_pending(), 1);

    sched.advance_and_run(ms(2000));
    assert_eq!(sink.delivered_keys(), vec!["post:42"]);

    // still deduplicated once delivered
    tracker.record_view(ContentType::Post, "42", None);
    assert_eq!(tracker.num_pending(), 0);
    assert!(!tracker.has_armed_timer());
    assert!(tracker.is_tracked(ContentType::Post, "42"));
}

#[test]
fn same_id_with_other_content_type_is_distinct() {
    let (sched, sink, tracker) = setup(Config::default());
    tracker.record_view(ContentType::Post, "7", None);
    tracker.record_view(ContentType::KDom, "7", None);
    sched.advance_and_run(ms(2000));
    assert_eq!(sink.delivered_keys(), vec!["post:7", "kdom:7"]);
}

#[test]
fn full_batch_is_flushed_right_away() {
    let (sched, sink, tracker) = setup(Config {
        batch_size: 3,
        ..Config::default()
    });
    tracker.record_view(ContentType::Post, "1", None);
    tracker.record_view(ContentType::Post, "2", None);
    assert!(tracker.has_armed_timer());
    assert_eq!(sched.num_timers(), 1);

    tracker.record_view(ContentType::KDom, "3", None);
    assert_eq!(tracker.num_pending(), 0);
    assert!(!tracker.has_armed_timer());
    assert_eq!(sched.num_timers(), 0);

    sched.run_until_idle();
    assert_eq!(sink.delivered_keys(), vec!["post:1", "post:2", "kdom:3"]);
    assert_eq!(sched.now(), ms(0));

    // the cancelled timer must not deliver anything else
    sched.advance_and_run(ms(5000));
    assert_eq!(sink.attempts(), 3);
}

#[test]
fn incomplete_batch_waits_for_the_delay() {
    let (sched, sink, tracker) = setup(Config::default());
    tracker.record_view(ContentType::Post, "a", None);
    tracker.record_view(ContentType::Post, "b", None);

    sched.advance_and_run(ms(1999));
    assert!(sink.delivered().is_empty());
    assert_eq!(tracker.num_pending(), 2);

    sched.advance_and_run(ms(1));
    assert_eq!(sink.delivered_keys(), vec!["post:a", "post:b"]);
    assert_eq!(tracker.num_pending(), 0);
    assert!(!tracker.has_armed_timer());
}

#[test]
fn delay_counts_from_the_first_pending_view() {
    let (sched, sink, tracker) = setup(Config::default());
    tracker.record_view(ContentType::Post, "a", None);
    sched.advance_and_run(ms(1500));
    tracker.record_view(ContentType::Post, "b", None);
    assert_eq!(sched.num_timers(), 1);
    assert_eq!(sched.next_deadline(), Some(ms(2000)));

    sched.advance_and_run(ms(500));
    assert_eq!(sink.delivered_keys(), vec!["post:a", "post:b"]);

    // the next view opens a new window
    tracker.record_view(ContentType::Post, "c", None);
    assert_eq!(sched.next_deadline(), Some(ms(4000)));
    sched.advance_and_run(ms(2000));
    assert_eq!(sink.delivered_keys(), vec!["post:a", "post:b", "post:c"]);
}

#[test]
fn failed_delivery_does_not_stop_the_batch() {
    let (sched, sink, tracker) = setup(Config {
        batch_size: 3,
        ..Config::default()
    });
    sink.fail_for(TrackingKey::new(ContentType::Post, "b"));
    tracker.record_view(ContentType::Post, "a", None);
    tracker.record_view(ContentType::Post, "b", None);
    tracker.record_view(ContentType::Post, "c", None);
    sched.run_until_idle();
    assert_eq!(sink.attempts(), 3);
    assert_eq!(sink.delivered_keys(), vec!["post:a", "post:c"]);

    // no retry, neither automatic nor by viewing again
    tracker.record_view(ContentType::Post, "b", None);
    assert_eq!(tracker.num_pending(), 0);
    sched.advance_and_run(ms(10_000));
    assert_eq!(sink.attempts(), 3);
}

#[test]
fn bulk_report_skips_tracked_content_and_spaces_items() {
    let (sched, sink, tracker) = setup(Config::default());
    tracker.record_view(ContentType::Post, "1", None);

    block_on(tracker.record_views(vec![
        item(ContentType::Post, "1"),
        item(ContentType::Post, "2"),
        item(ContentType::KDom, "3"),
    ]));
    // one pause, between the two untracked items
    assert_eq!(sched.now(), ms(100));
    assert_eq!(tracker.num_pending(), 3);

    sched.advance_and_run(ms(1900));
    assert_eq!(sink.delivered_keys(), vec!["post:1", "post:2", "kdom:3"]);
}

#[test]
fn bulk_report_items_may_query_the_tracker() {
    let (sched, _sink, tracker) = setup(Config::default());
    tracker.record_view(ContentType::Post, "1", None);
    let items = ["1", "2", "3"]
        .into_iter()
        .filter(|id| !tracker.is_tracked(ContentType::Post, id))
        .map(|id| item(ContentType::Post, id));
    block_on(tracker.record_views(items));
    assert_eq!(tracker.num_pending(), 3);
    assert_eq!(sched.now(), ms(100));
}

#[test]
fn bulk_report_lets_timers_fire_while_spacing() {
    let (sched, sink, tracker) = setup(Config {
        batch_delay_ms: 150,
        ..Config::default()
    });
    block_on(tracker.record_views(
        ["a", "b", "c"]
            .into_iter()
            .map(|id| item(ContentType::Post, id)),
    ));
    // a and b left with the timer armed by a, c is still pending
    assert_eq!(sched.now(), ms(200));
    assert_eq!(sink.delivered_keys(), vec!["post:a", "post:b"]);
    assert_eq!(tracker.num_pending(), 1);
    assert_eq!(sched.next_deadline(), Some(ms(350)));
}

#[test]
fn explicit_flush_delivers_and_disarms() {
    let (sched, sink, tracker) = setup(Config::default());
    tracker.record_view(ContentType::KDom, "x", Some(UserId(String::from("u1"))));
    block_on(tracker.flush());
    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].content_id, "x");
    assert_eq!(delivered[0].viewer_id, Some(UserId(String::from("u1"))));
    assert!(!tracker.has_armed_timer());

    sched.advance_and_run(ms(2000));
    assert_eq!(sink.attempts(), 1);

    // flushing nothing sends nothing
    block_on(tracker.flush());
    assert_eq!(sink.attempts(), 1);
}

#[test]
fn dispose_flushes_pending_views() {
    let (sched, sink, tracker) = setup(Config::default());
    tracker.record_view(ContentType::Post, "1", None);
    tracker.record_view(ContentType::Post, "2", None);
    tracker.dispose();
    assert_eq!(sched.num_timers(), 0);
    assert!(sink.delivered().is_empty());

    sched.run_until_idle();
    assert_eq!(sink.delivered_keys(), vec!["post:1", "post:2"]);
}

#[test]
fn dropping_an_idle_tracker_sends_nothing() {
    let (sched, sink, tracker) = setup(Config::default());
    drop(tracker);
    sched.advance_and_run(ms(10_000));
    assert_eq!(sink.attempts(), 0);
}

struct ChannelSink(tokio::sync::mpsc::UnboundedSender<ViewEvent>);

#[async_trait]
impl ViewSink for ChannelSink {
    async fn send(&self, event: ViewEvent) -> anyhow::Result<()> {
        self.0.send(event)?;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn tokio_scheduler_end_to_end() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let sched = TokioScheduler::current().unwrap();
    let tracker = ViewTracker::new(
        Config {
            batch_size: 3,
            ..Config::default()
        },
        Arc::new(ChannelSink(tx)),
        sched.clone(),
    );

    tracker.record_view(ContentType::Post, "1", None);
    tokio::time::sleep(ms(1000)).await;
    assert!(rx.try_recv().is_err());
    tokio::time::sleep(ms(1001)).await;
    assert_eq!(rx.recv().await.unwrap().content_id, "1");

    for id in ["2", "3", "4"] {
        tracker.record_view(ContentType::KDom, id, None);
    }
    sched.join_spawned().await;
    let got = (0..3)
        .map(|_| rx.try_recv().unwrap().key().to_string())
        .collect::<Vec<_>>();
    assert_eq!(got, vec!["kdom:2", "kdom:3", "kdom:4"]);

    tracker.record_view(ContentType::Post, "5", None);
    tracker.dispose();
    sched.join_spawned().await;
    assert_eq!(rx.recv().await.unwrap().content_id, "5");
}
