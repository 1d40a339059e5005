use std::rc::Rc;

use bus::MonitorEvent;
use core_types::{Phase, PhaseTally};
use monitor::capability::ConsoleCapability;
use monitor::{
    AssetPayload, InjectOptions, InputEvent, InputKind, ManualClock, MonitorConfig, ResourceTiming,
    inject,
};
use monitor_test_support::{FakeDocumentView, Harness, diff_lines, event_lines};

fn tally(requests: u64, bytes: u64) -> PhaseTally {
    PhaseTally { requests, bytes }
}

#[test]
fn resources_split_by_phase() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));

    h.clock.set(100.0);
    h.monitor.resource_timing(&ResourceTiming::new("index.js", 20.0, 100));
    h.monitor.resource_timing(&ResourceTiming::new("logo.png", 80.0, 50));
    h.monitor.content_loaded(400.0);

    h.clock.set(1000.0);
    h.monitor.input(&InputEvent::new(InputKind::PointerDown, 1000.0));
    h.clock.set(1300.0);
    h.monitor.resource_timing(&ResourceTiming::new("video.mp4", 1200.0, 200));

    h.clock.set(9000.0);
    h.monitor.resource_timing(&ResourceTiming::new("frame2.png", 8000.0, 300));

    let network = h.monitor.summary().network.expect("network measured");
    assert_eq!(network.initial, tally(2, 150));
    assert_eq!(network.user, tally(1, 200));
    assert_eq!(network.subload, tally(1, 300));
    assert_eq!(network.total, tally(4, 650));
    assert!(network.is_consistent());
}

#[test]
fn duplicate_timing_records_count_once() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    let record = ResourceTiming::new("index.js", 20.0, 100);
    h.monitor.resource_timing(&record);
    h.monitor.resource_timing(&record);
    h.monitor.resource_timing(&record);

    let network = h.monitor.summary().network.expect("network measured");
    assert_eq!(network.phase(Phase::Initial), tally(1, 100));
    assert_eq!(network.total, tally(1, 100));
}

#[test]
fn window_closes_after_its_length() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    h.monitor.content_loaded(0.0);
    h.monitor.input(&InputEvent::new(InputKind::KeyDown("Enter".into()), 100.0));
    h.clock.set(3000.0);
    h.monitor.resource_timing(&ResourceTiming::new("late.png", 2700.0, 10));

    let network = h.monitor.summary().network.expect("network measured");
    assert_eq!(network.subload, tally(1, 10));
    assert_eq!(network.user, PhaseTally::default());
}

#[test]
fn missing_transfer_size_falls_back_to_the_bundle() {
    let assets = AssetPayload::from_files("index.html", [("img/hero.jpg".to_string(), 4096)], "blob:bundle/");
    let h = Harness::with(FakeDocumentView::new(300.0, 250.0), MonitorConfig::default(), assets);
    h.monitor.resource_timing(&ResourceTiming::new("blob:bundle/img/hero.jpg", 5.0, 0));

    let network = h.monitor.summary().network.expect("network measured");
    assert_eq!(network.initial, tally(1, 4096));
}

#[test]
fn unmeasured_fields_stay_unknown() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    let summary = h.monitor.summary();
    assert_eq!(summary.network, None);
    assert_eq!(summary.dialogs, None);
    assert_eq!(summary.max_animation_ms, None);
    assert_eq!(summary.content_ready_ms, None);
}

#[test]
fn second_injection_is_a_no_op() {
    let mut h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    let (tx, _rx) = bus::channel();
    let again = inject(
        &mut h.cx,
        InjectOptions {
            config: MonitorConfig::default(),
            assets: AssetPayload::default(),
            events: tx,
            clock: Rc::new(ManualClock::new(0.0)),
        },
    );
    assert!(again.is_none());

    h.cx.console.error("boom");
    assert_eq!(h.monitor.summary().console_errors, Some(1));
    assert_eq!(h.log.count_prefix("console.error"), 1);
}

#[test]
fn snapshots_repeat_up_to_the_cap() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    h.monitor.content_loaded(0.0);
    h.run_until(60_000.0);

    let snapshots = h
        .drain()
        .into_iter()
        .filter(|e| matches!(e, MonitorEvent::SummarySnapshot { .. }))
        .count();
    assert_eq!(snapshots, 10);
    assert_eq!(h.monitor.summary().content_ready_ms, Some(0.0));
    assert_eq!(h.monitor.pending_tasks(), 0);
}

#[test]
fn content_loaded_only_counts_once() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    h.monitor.content_loaded(250.0);
    let pending = h.monitor.pending_tasks();
    h.monitor.content_loaded(900.0);
    assert_eq!(h.monitor.pending_tasks(), pending);
    assert_eq!(h.monitor.summary().content_ready_ms, Some(250.0));
}

#[test]
fn long_tasks_count_only_inside_the_window() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    h.monitor.long_task(50.0);
    h.monitor.long_task(f64::NAN);
    h.run_until(3000.0);
    h.monitor.long_task(80.0);
    assert_eq!(h.monitor.summary().long_task_ms, Some(50.0));
}

#[test]
fn frames_and_first_paint() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    h.monitor.first_paint(42.0);
    h.monitor.first_paint(90.0);
    for _ in 0..3 {
        h.monitor.frame();
    }
    let summary = h.monitor.summary();
    assert_eq!(summary.first_paint_ms, Some(42.0));
    assert_eq!(summary.frames, Some(3));
}

#[test]
fn runtime_errors_are_counted_and_reported() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    h.monitor.runtime_error("x is not defined", Some("main.js"), Some(12));
    assert_eq!(h.monitor.summary().errors, Some(1));

    let expected = vec!["runtime-error x is not defined".to_string()];
    let actual = event_lines(&h.drain());
    assert_eq!(actual, expected, "\n{}", diff_lines(&expected, &actual));
}

#[test]
fn teardown_stops_timers_and_returns_handles() {
    let assets = AssetPayload::from_files(
        "index.html",
        [("a.png".to_string(), 1), ("b.png".to_string(), 2)],
        "blob:bundle/",
    );
    let h = Harness::with(FakeDocumentView::new(300.0, 250.0), MonitorConfig::default(), assets);
    h.monitor.content_loaded(0.0);
    let Harness { monitor, events, .. } = h;

    let handles = monitor.teardown();
    assert_eq!(handles, vec!["blob:bundle/a.png".to_string(), "blob:bundle/b.png".to_string()]);
    let last = events.try_drain();
    assert!(matches!(last.last(), Some(MonitorEvent::SummarySnapshot { .. })));
}
