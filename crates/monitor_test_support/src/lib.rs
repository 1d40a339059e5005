//! Fakes for every capability of a monitored context, a scriptable probe
//! transport, and TOML document fixtures.
//!
//! Every fake appends a readable line to a shared [`CallLog`], so a test
//! can assert on exactly what reached the original capability.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Mutex;

use bus::{EventReceiver, MonitorEvent};
use core_types::{ElementRef, Millis, Size};
use monitor::capability::drawing::{CanvasFactory, DrawingCapability, StrokeStyle};
use monitor::capability::globals::{DurationUnit, ExitApi, TimelineLibrary, TweenParams, Vars};
use monitor::capability::{
    ConsoleCapability, DialogCapability, DocumentCapability, ElementCapability, ExecutionContext,
    NetworkCapability, ObserveTarget, ObserverCapability, ObserverKind, RequestId, SheetId,
    StorageCapability, StyleCapability,
};
use monitor::{AssetPayload, InjectOptions, ManualClock, Monitor, MonitorConfig, inject};
use net::{NetError, ProbeResponse, ProbeTransport};

pub mod fixture;

pub use fixture::FakeDocumentView;

#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn push(&self, line: impl Into<String>) {
        self.0.borrow_mut().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn contains(&self, line: &str) -> bool {
        self.0.borrow().iter().any(|l| l == line)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0.borrow().iter().filter(|l| l.starts_with(prefix)).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct FakeNetwork {
    log: CallLog,
    next: u64,
}

impl NetworkCapability for FakeNetwork {
    fn fetch(&mut self, method: &str, url: &str) -> RequestId {
        self.next += 1;
        self.log.push(format!("fetch {method} {url}"));
        RequestId(self.next)
    }

    fn open(&mut self, method: &str, url: &str) -> RequestId {
        self.next += 1;
        self.log.push(format!("open {method} {url}"));
        RequestId(self.next)
    }

    fn send(&mut self, request: RequestId) {
        self.log.push(format!("send {}", request.0));
    }
}

pub struct FakeStorage {
    log: CallLog,
    items: HashMap<String, String>,
}

impl StorageCapability for FakeStorage {
    fn get_item(&mut self, key: &str) -> Option<String> {
        self.log.push(format!("storage.get {key}"));
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.log.push(format!("storage.set {key}={value}"));
        self.items.insert(key.to_string(), value.to_string());
    }

    fn remove_item(&mut self, key: &str) {
        self.log.push(format!("storage.remove {key}"));
        self.items.remove(key);
    }

    fn clear(&mut self) {
        self.log.push("storage.clear");
        self.items.clear();
    }
}

pub struct FakeDialogs {
    log: CallLog,
}

impl DialogCapability for FakeDialogs {
    fn alert(&mut self, message: &str) {
        self.log.push(format!("alert {message}"));
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.log.push(format!("confirm {message}"));
        true
    }

    fn prompt(&mut self, message: &str, default: Option<&str>) -> Option<String> {
        self.log.push(format!("prompt {message}"));
        default.map(str::to_string)
    }
}

pub struct FakeConsole {
    log: CallLog,
}

impl ConsoleCapability for FakeConsole {
    fn error(&mut self, message: &str) {
        self.log.push(format!("console.error {message}"));
    }

    fn warn(&mut self, message: &str) {
        self.log.push(format!("console.warn {message}"));
    }

    fn log(&mut self, message: &str) {
        self.log.push(format!("console.log {message}"));
    }
}

pub struct FakeDocument {
    log: CallLog,
}

impl DocumentCapability for FakeDocument {
    fn write(&mut self, markup: &str) {
        self.log.push(format!("document.write {markup}"));
    }
}

pub struct FakeElements {
    log: CallLog,
}

impl ElementCapability for FakeElements {
    fn set_property(&mut self, element: &ElementRef, name: &str, value: &str) {
        self.log.push(format!("<{}#{}>.{name}={value}", element.tag, element.id));
    }

    fn set_attribute(&mut self, element: &ElementRef, name: &str, value: &str) {
        self.log.push(format!("<{}#{}> {name}=\"{value}\"", element.tag, element.id));
    }
}

pub struct FakeStyles {
    log: CallLog,
}

impl StyleCapability for FakeStyles {
    fn set_sheet_text(&mut self, sheet: SheetId, text: &str) {
        self.log.push(format!("sheet#{} {text}", sheet.0));
    }

    fn insert_rule(&mut self, sheet: SheetId, rule: &str, index: usize) -> usize {
        self.log.push(format!("sheet#{}[{index}] {rule}", sheet.0));
        index
    }

    fn set_style_property(&mut self, element: &ElementRef, name: &str, value: &str) {
        self.log.push(format!("<{}#{}>.style.{name}={value}", element.tag, element.id));
    }
}

/// Panics on anything that is not an element, the way an unguarded
/// platform observer throws.
pub struct FakeObservers {
    log: CallLog,
}

impl ObserverCapability for FakeObservers {
    fn observe(&mut self, kind: ObserverKind, target: &ObserveTarget) -> bool {
        match target {
            ObserveTarget::Element(el) => {
                self.log.push(format!("observe {kind:?} <{}#{}>", el.tag, el.id));
                true
            }
            ObserveTarget::Document => {
                self.log.push(format!("observe {kind:?} document"));
                true
            }
            ObserveTarget::Value { class_name } => {
                panic!("observe: parameter 1 is not of type 'Node' ({class_name})")
            }
        }
    }
}

pub struct FakeCanvas {
    log: CallLog,
    size: Size,
}

impl FakeCanvas {
    pub fn new(log: CallLog, size: Size) -> Self {
        Self { log, size }
    }
}

impl DrawingCapability for FakeCanvas {
    fn surface_size(&self) -> Size {
        self.size
    }

    fn save(&mut self) {
        self.log.push("save");
    }
    fn restore(&mut self) {
        self.log.push("restore");
    }
    fn translate(&mut self, x: f64, y: f64) {
        self.log.push(format!("translate {x} {y}"));
    }
    fn scale(&mut self, x: f64, y: f64) {
        self.log.push(format!("scale {x} {y}"));
    }
    fn rotate(&mut self, radians: f64) {
        self.log.push(format!("rotate {radians}"));
    }
    fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.log.push(format!("transform {a} {b} {c} {d} {e} {f}"));
    }
    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.log.push(format!("setTransform {a} {b} {c} {d} {e} {f}"));
    }
    fn reset_transform(&mut self) {
        self.log.push("resetTransform");
    }
    fn set_line_width(&mut self, width: f64) {
        self.log.push(format!("lineWidth {width}"));
    }
    fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.log.push(format!("strokeStyle {style:?}"));
    }
    fn set_global_alpha(&mut self, alpha: f64) {
        self.log.push(format!("globalAlpha {alpha}"));
    }
    fn begin_path(&mut self) {
        self.log.push("beginPath");
    }
    fn move_to(&mut self, x: f64, y: f64) {
        self.log.push(format!("moveTo {x} {y}"));
    }
    fn line_to(&mut self, x: f64, y: f64) {
        self.log.push(format!("lineTo {x} {y}"));
    }
    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.log.push(format!("quadraticCurveTo {cpx} {cpy} {x} {y}"));
    }
    fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.log.push(format!("bezierCurveTo {c1x} {c1y} {c2x} {c2y} {x} {y}"));
    }
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, ccw: bool) {
        self.log.push(format!("arc {x} {y} {radius} {start} {end} {ccw}"));
    }
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.log.push(format!("rect {x} {y} {w} {h}"));
    }
    fn close_path(&mut self) {
        self.log.push("closePath");
    }
    fn stroke(&mut self) {
        self.log.push("stroke");
    }
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.log.push(format!("strokeRect {x} {y} {w} {h}"));
    }
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.log.push(format!("fillRect {x} {y} {w} {h}"));
    }
}

/// Every `<canvas>` gets a surface of the same size.
pub struct FakeCanvases {
    log: CallLog,
    size: Size,
}

impl CanvasFactory for FakeCanvases {
    fn get_context(&mut self, canvas: &ElementRef) -> Option<Box<dyn DrawingCapability>> {
        if !canvas.is("canvas") {
            return None;
        }
        Some(Box::new(FakeCanvas::new(self.log.clone(), self.size)))
    }
}

pub struct FakeExitApi {
    log: CallLog,
    name: String,
}

impl FakeExitApi {
    pub fn boxed(log: &CallLog, name: &str) -> Box<dyn ExitApi> {
        Box::new(Self {
            log: log.clone(),
            name: name.to_string(),
        })
    }
}

impl ExitApi for FakeExitApi {
    fn exit(&mut self, destination: Option<&str>, _vars: &Vars) {
        self.log.push(format!("{}.exit {}", self.name, destination.unwrap_or("-")));
    }
}

pub struct FakeTimeline {
    log: CallLog,
    unit: DurationUnit,
}

impl FakeTimeline {
    pub fn boxed(log: &CallLog, unit: DurationUnit) -> Box<dyn TimelineLibrary> {
        Box::new(Self {
            log: log.clone(),
            unit,
        })
    }
}

impl TimelineLibrary for FakeTimeline {
    fn unit(&self) -> DurationUnit {
        self.unit
    }

    fn tween(&mut self, target: &str, params: &TweenParams) {
        self.log.push(format!("tween {target} {}", params.duration));
    }

    fn timeline(&mut self, params: &TweenParams) {
        self.log.push(format!("timeline {}", params.duration));
    }
}

/// A context where every capability is a recording fake sharing `log`.
pub fn fake_context(view: FakeDocumentView, log: &CallLog) -> ExecutionContext {
    let surface = view.viewport;
    ExecutionContext::new(Rc::new(view))
        .with_network(Box::new(FakeNetwork {
            log: log.clone(),
            next: 0,
        }))
        .with_storage(Box::new(FakeStorage {
            log: log.clone(),
            items: HashMap::new(),
        }))
        .with_dialogs(Box::new(FakeDialogs { log: log.clone() }))
        .with_console(Box::new(FakeConsole { log: log.clone() }))
        .with_document(Box::new(FakeDocument { log: log.clone() }))
        .with_elements(Box::new(FakeElements { log: log.clone() }))
        .with_styles(Box::new(FakeStyles { log: log.clone() }))
        .with_observers(Box::new(FakeObservers { log: log.clone() }))
        .with_canvases(Box::new(FakeCanvases {
            log: log.clone(),
            size: surface,
        }))
}

/// One monitored load over fakes, on a hand-driven clock.
pub struct Harness {
    pub cx: ExecutionContext,
    pub monitor: Monitor,
    pub clock: ManualClock,
    pub events: EventReceiver,
    pub log: CallLog,
    pub view: FakeDocumentView,
}

impl Harness {
    pub fn new(view: FakeDocumentView) -> Self {
        Self::with(view, MonitorConfig::default(), AssetPayload::default())
    }

    pub fn with(view: FakeDocumentView, config: MonitorConfig, assets: AssetPayload) -> Self {
        let log = CallLog::default();
        let mut cx = fake_context(view.clone(), &log);
        let clock = ManualClock::new(0.0);
        let (sender, events) = bus::channel();
        let Some(monitor) = inject(
            &mut cx,
            InjectOptions {
                config,
                assets,
                events: sender,
                clock: Rc::new(clock.clone()),
            },
        ) else {
            panic!("fresh context refused injection");
        };
        Self {
            cx,
            monitor,
            clock,
            events,
            log,
            view,
        }
    }

    /// Move the clock forward to `t`, stopping at each timer on the way so
    /// every task sees its own due time as "now".
    pub fn run_until(&self, t: Millis) -> usize {
        let mut ran = 0;
        while let Some(due) = self.monitor.next_due().filter(|due| *due <= t) {
            self.clock.set(due);
            ran += self.monitor.tick();
        }
        self.clock.set(t);
        ran + self.monitor.tick()
    }

    pub fn drain(&self) -> Vec<MonitorEvent> {
        self.events.try_drain()
    }
}

/// Probe transport answering from a table. Unknown URLs fail like an
/// unreachable host.
#[derive(Default)]
pub struct MockTransport {
    responses: HashMap<String, (u16, String)>,
    probed: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), (status, url.to_string()));
        self
    }

    pub fn redirect(mut self, url: &str, status: u16, final_url: &str) -> Self {
        self.responses
            .insert(url.to_string(), (status, final_url.to_string()));
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl ProbeTransport for MockTransport {
    fn probe(&self, url: &str) -> Result<ProbeResponse, NetError> {
        if let Ok(mut probed) = self.probed.lock() {
            probed.push(url.to_string());
        }
        match self.responses.get(url) {
            Some((status, final_url)) => Ok(ProbeResponse {
                status: *status,
                final_url: final_url.clone(),
            }),
            None => Err(NetError::Request(format!("no route to {url}"))),
        }
    }
}

/// One line per event: its wire type and the fields a test cares about.
pub fn event_lines(events: &[MonitorEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| match event {
            MonitorEvent::LogEntry { level, message } => format!("log-entry {level:?} {message}"),
            MonitorEvent::Dialog { kind, message } => format!("dialog {kind:?} {message}"),
            MonitorEvent::StorageWrite { op, key } => {
                format!("storage-write {op:?} {}", key.as_deref().unwrap_or("-"))
            }
            MonitorEvent::NetworkActivity {
                api,
                method,
                url,
                rewritten,
            } => format!("network-activity {api:?} {method} {url} rewritten={rewritten}"),
            MonitorEvent::RuntimeError { message, .. } => format!("runtime-error {message}"),
            MonitorEvent::SummarySnapshot { .. } => "summary-snapshot".to_string(),
            MonitorEvent::ClickCandidate {
                destination,
                provenance,
                api,
            } => format!(
                "click-candidate {destination} {provenance:?} {}",
                api.as_deref().unwrap_or("-")
            ),
        })
        .collect()
}

pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;

    let max = expected.len().max(actual.len());
    let missing = "<missing>";
    let mut out = String::new();
    for i in 0..max {
        let left = expected.get(i).map(String::as_str).unwrap_or(missing);
        let right = actual.get(i).map(String::as_str).unwrap_or(missing);
        let marker = if left == right { " " } else { ">" };
        let _ = writeln!(&mut out, "{marker} {:>3}  expected: {left}", i + 1);
        if left != right {
            let _ = writeln!(&mut out, "{marker} {:>3}    actual: {right}", i + 1);
        }
    }
    out
}
