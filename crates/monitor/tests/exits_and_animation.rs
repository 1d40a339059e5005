use bus::{MonitorEvent, Provenance};
use core_types::{ElementRef, Rectangle};
use monitor::{ElementSnapshot, InputDisposition, InputEvent, InputKind, ProbeState, TargetNode};
use monitor_test_support::{FakeDocumentView, FakeExitApi, Harness, event_lines};

fn animated(id: u64, animation: &str) -> ElementSnapshot {
    ElementSnapshot::new(ElementRef::new(id, "div"), Rectangle::new(0.0, 0.0, 50.0, 50.0))
        .with_computed("animation", animation)
}

fn candidates(h: &Harness) -> Vec<MonitorEvent> {
    h.drain()
        .into_iter()
        .filter(|e| matches!(e, MonitorEvent::ClickCandidate { .. }))
        .collect()
}

#[test]
fn scheduled_scans_keep_the_longest_duration() {
    let view = FakeDocumentView::new(300.0, 250.0).with_element(animated(1, "fade 1s"));
    let h = Harness::new(view);
    h.monitor.content_loaded(0.0);

    h.run_until(600.0);
    assert_eq!(h.monitor.summary().max_animation_ms, Some(1000.0));

    h.view.set_elements(vec![animated(1, "slide 3s")]);
    h.run_until(2000.0);
    assert_eq!(h.monitor.summary().max_animation_ms, Some(3000.0));

    h.view.set_elements(vec![animated(1, "fade 2s")]);
    h.run_until(5000.0);
    assert_eq!(h.monitor.summary().max_animation_ms, Some(3000.0));
}

#[test]
fn infinite_animation_sticks() {
    let view = FakeDocumentView::new(300.0, 250.0).with_element(animated(1, "pulse 500ms infinite"));
    let h = Harness::new(view);
    h.monitor.content_loaded(0.0);
    h.run_until(600.0);

    h.view.set_elements(vec![animated(1, "pulse 500ms 2")]);
    h.run_until(31_000.0);

    let summary = h.monitor.summary();
    assert_eq!(summary.infinite_animation, Some(true));
    assert_eq!(summary.max_animation_loops, Some(999));
}

#[test]
fn anchor_activation_becomes_a_candidate() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    let click = InputEvent::new(InputKind::Click, 50.0).on(vec![
        TargetNode::new("img"),
        TargetNode::link("a", "https://landing.example.com/?utm=1"),
    ]);
    assert_eq!(h.monitor.input(&click), InputDisposition::PreventDefault);

    assert_eq!(
        candidates(&h),
        vec![MonitorEvent::ClickCandidate {
            destination: "https://landing.example.com/?utm=1".into(),
            provenance: Provenance::UserGesture,
            api: None,
        }]
    );
}

#[test]
fn click_tag_global_is_the_fallback_destination() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    h.cx.globals.borrow_mut().set_var("clickTag", "https://ct.example.com/");

    let click = InputEvent::new(InputKind::Click, 50.0).on(vec![TargetNode::link("a", "#"), TargetNode::new("div")]);
    assert_eq!(h.monitor.input(&click), InputDisposition::PreventDefault);
    assert_eq!(
        event_lines(&candidates(&h)),
        vec!["click-candidate https://ct.example.com/ UserGesture -".to_string()]
    );
}

#[test]
fn untrusted_or_unaimed_clicks_pass_through() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    let scripted = InputEvent::new(InputKind::Click, 10.0)
        .on(vec![TargetNode::link("a", "https://x.example.com/")])
        .untrusted();
    assert_eq!(h.monitor.input(&scripted), InputDisposition::Continue);

    let nowhere = InputEvent::new(InputKind::Click, 20.0).on(vec![TargetNode::new("div")]);
    assert_eq!(h.monitor.input(&nowhere), InputDisposition::Continue);
    assert!(candidates(&h).is_empty());
}

#[test]
fn probe_installs_the_shim_when_no_api_appears() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    assert_eq!(h.monitor.exit_probe().state(), ProbeState::Searching { attempts: 1 });

    h.run_until(4_750.0);
    assert_eq!(h.monitor.exit_probe().state(), ProbeState::Exhausted);
    assert!(h.monitor.exit_probe().shim_installed());
    assert_eq!(h.monitor.summary().exit_shim_installed, Some(true));

    // the shim reports like any hooked api
    assert!(h.cx.globals.borrow_mut().call_exit("ExitApi", Some("https://shim.example.com/")));
    assert_eq!(
        event_lines(&candidates(&h)),
        vec!["click-candidate https://shim.example.com/ ExitApi ExitApi".to_string()]
    );
}

#[test]
fn late_exit_api_is_hooked_and_never_navigates() {
    let h = Harness::new(FakeDocumentView::new(300.0, 250.0));
    h.run_until(1000.0);
    h.cx.globals
        .borrow_mut()
        .define_exit_api("Enabler", FakeExitApi::boxed(&h.log, "Enabler"));
    h.run_until(1_300.0);

    assert_eq!(h.monitor.exit_probe().state(), ProbeState::Found);
    assert_eq!(h.monitor.summary().exit_shim_installed, Some(false));
    assert_eq!(h.monitor.pending_tasks(), 1);

    h.cx.globals.borrow_mut().set_var("clickTAG", "https://fallback.example.com/");
    assert!(h.cx.globals.borrow_mut().call_exit("Enabler", None));
    assert_eq!(
        event_lines(&candidates(&h)),
        vec!["click-candidate https://fallback.example.com/ ExitApi Enabler".to_string()]
    );
    assert_eq!(h.log.count_prefix("Enabler.exit"), 0);
}

#[test]
fn api_present_at_injection_is_found_immediately() {
    let view = FakeDocumentView::new(300.0, 250.0);
    let log = monitor_test_support::CallLog::default();
    let mut cx = monitor_test_support::fake_context(view, &log);
    cx.globals
        .borrow_mut()
        .define_exit_api("mraid", FakeExitApi::boxed(&log, "mraid"));
    let (tx, _rx) = bus::channel();
    let Some(monitor) = monitor::inject(
        &mut cx,
        monitor::InjectOptions {
            config: monitor::MonitorConfig::default(),
            assets: monitor::AssetPayload::default(),
            events: tx,
            clock: std::rc::Rc::new(monitor::ManualClock::new(0.0)),
        },
    ) else {
        panic!("injection refused");
    };
    assert_eq!(monitor.exit_probe().state(), ProbeState::Found);
    assert!(cx.globals.borrow().is_hooked("mraid"));
}
