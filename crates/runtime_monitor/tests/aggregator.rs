use std::sync::Arc;

use bus::{MonitorEvent, Provenance, StorageOp};
use core_types::Summary;
use monitor_test_support::MockTransport;
use net::ExitStatus;
use runtime_monitor::{Aggregator, SharedTransport, SummarySource, start_aggregator};

fn snapshot(dialogs: u32) -> MonitorEvent {
    MonitorEvent::SummarySnapshot {
        summary: Summary {
            dialogs: Some(dialogs),
            ..Summary::default()
        },
    }
}

fn candidate(destination: &str) -> MonitorEvent {
    MonitorEvent::ClickCandidate {
        destination: destination.to_string(),
        provenance: Provenance::UserGesture,
        api: None,
    }
}

#[test]
fn no_snapshot_means_unknown() {
    let agg = Aggregator::default();
    assert!(agg.latest().is_none());
    assert_eq!(agg.snapshot_count(), 0);
}

#[test]
fn latest_snapshot_wins() {
    let mut agg = Aggregator::default();
    agg.apply(snapshot(1));
    agg.apply(MonitorEvent::StorageWrite {
        op: StorageOp::Clear,
        key: None,
    });
    agg.apply(snapshot(3));
    assert_eq!(agg.snapshot_count(), 2);
    assert_eq!(agg.latest_summary().and_then(|s| s.dialogs), Some(3));
    assert_eq!(agg.events().len(), 1);
}

#[test]
fn click_candidates_resolve_through_the_transport() {
    let dest = "https://example.com/x?utm=1";

    let ok: SharedTransport = Arc::new(MockTransport::new().respond(dest, 200));
    let mut agg = Aggregator::new(Some(ok), None);
    agg.apply(candidate(dest));
    assert_eq!(agg.exits().len(), 1);
    assert_eq!(agg.exits()[0].status, ExitStatus::Ok);
    assert_eq!(agg.exits()[0].http_status, Some(200));

    let missing: SharedTransport = Arc::new(MockTransport::new().respond(dest, 404));
    let mut agg = Aggregator::new(Some(missing), None);
    agg.apply(candidate(dest));
    assert_eq!(agg.exits()[0].status, ExitStatus::HttpError);
}

#[test]
fn unreachable_destination_is_unknown() {
    let offline: SharedTransport = Arc::new(MockTransport::new());
    let mut agg = Aggregator::new(Some(offline), None);
    agg.apply(candidate("https://down.example.com/"));
    assert_eq!(agg.exits()[0].status, ExitStatus::Unknown);
    // the candidate itself is still kept
    assert_eq!(agg.events().len(), 1);
}

#[test]
fn relative_destinations_use_the_base() {
    let transport = Arc::new(MockTransport::new().respond("https://ads.example.com/c/landing.html", 200));
    let shared: SharedTransport = transport.clone();
    let mut agg = Aggregator::new(Some(shared), Some("https://ads.example.com/c/index.html".into()));
    agg.apply(candidate("landing.html"));
    assert_eq!(agg.exits()[0].status, ExitStatus::Ok);
    assert_eq!(transport.probed(), vec!["https://ads.example.com/c/landing.html".to_string()]);
}

#[test]
fn threaded_aggregator_drains_until_senders_close() {
    let dest = "https://example.com/x?utm=1";
    let (tx, rx) = bus::channel();
    let transport: SharedTransport = Arc::new(MockTransport::new().respond(dest, 200));
    let handle = start_aggregator(rx, Some(transport), None);

    tx.emit(snapshot(1));
    tx.emit(candidate(dest));
    tx.post_raw("{\"type\":\"log-entry\",\"level\":\"error\",\"message\":\"not ours\"}");
    tx.emit(snapshot(2));
    drop(tx);

    let agg = handle.join();
    assert_eq!(agg.snapshot_count(), 2);
    assert_eq!(agg.latest_summary().and_then(|s| s.dialogs), Some(2));
    assert_eq!(agg.events().len(), 1);
    assert_eq!(agg.exits()[0].status, ExitStatus::Ok);
}

#[test]
fn event_log_stops_at_its_limit_but_snapshots_still_land() {
    let mut agg = Aggregator::default().with_retained(2);
    for i in 0..5 {
        agg.apply(MonitorEvent::RuntimeError {
            message: format!("e{i}"),
            source: None,
            line: None,
        });
    }
    agg.apply(snapshot(7));

    assert_eq!(agg.events().len(), 2);
    assert_eq!(agg.dropped_events(), 3);
    assert_eq!(agg.latest().and_then(|s| s.dialogs), Some(7));
}
