//! Injection into an execution context and the handle the host drives.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use bus::{EventSender, MonitorEvent};
use core_types::{Counter, Millis, Summary};

use crate::animation::{hook_libraries, scan as scan_animations};
use crate::assets::{AssetPayload, AssetTable};
use crate::capability::console::InterceptedConsole;
use crate::capability::dialog::InterceptedDialogs;
use crate::capability::document::InterceptedDocument;
use crate::capability::drawing::InterceptedCanvases;
use crate::capability::element::InterceptedElements;
use crate::capability::network::InterceptedNetwork;
use crate::capability::observer::GuardedObservers;
use crate::capability::storage::InterceptedStorage;
use crate::capability::style::InterceptedStyles;
use crate::capability::{DocumentView, ExecutionContext, Globals, Inert};
use crate::click_exit::{self, ExitProbe, InputDisposition, InputEvent, hook_exit_apis};
use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::context::MonitorContext;
use crate::geometry::{count_border_rules, scan_dom};
use crate::guard::fail_open;
use crate::phase::ResourceTiming;
use crate::scheduler::{Next, Scheduler, SchedulerCell, Task, TaskId};

pub struct InjectOptions {
    pub config: MonitorConfig,
    pub assets: AssetPayload,
    pub events: EventSender,
    pub clock: Rc<dyn Clock>,
}

macro_rules! rewrap {
    ($cx:ident . $field:ident, $wrapper:ident, $ctx:expr) => {{
        let original = mem::replace(&mut $cx.$field, Box::new(Inert::default()));
        $cx.$field = $wrapper::wrap(original, $ctx.clone());
    }};
}

/// Wrap every capability of `cx`. A context that is already monitored is
/// left alone and `None` comes back.
pub fn inject(cx: &mut ExecutionContext, options: InjectOptions) -> Option<Monitor> {
    if cx.is_monitored() {
        log::debug!(target: "monitor", "context already monitored; skipping injection");
        return None;
    }
    cx.mark_monitored();

    let InjectOptions {
        config,
        assets,
        events,
        clock,
    } = options;
    let config = match config.validate() {
        Ok(()) => config,
        Err(err) => {
            log::warn!(target: "monitor", "invalid monitor config ({err}); using defaults");
            MonitorConfig::default()
        }
    };

    let ctx = MonitorContext::new(config, clock, events, AssetTable::new(&assets));
    rewrap!(cx.network, InterceptedNetwork, ctx);
    rewrap!(cx.storage, InterceptedStorage, ctx);
    rewrap!(cx.dialogs, InterceptedDialogs, ctx);
    rewrap!(cx.console, InterceptedConsole, ctx);
    rewrap!(cx.document, InterceptedDocument, ctx);
    rewrap!(cx.elements, InterceptedElements, ctx);
    rewrap!(cx.styles, InterceptedStyles, ctx);
    rewrap!(cx.observers, GuardedObservers, ctx);
    rewrap!(cx.canvases, InterceptedCanvases, ctx);

    let monitor = Monitor {
        ctx: ctx.clone(),
        scheduler: RefCell::new(Scheduler::new()),
        view: cx.view.clone(),
        globals: cx.globals.clone(),
        probe: ExitProbe::new(),
    };

    ctx.observe("animation.hook", |ctx| hook_libraries(ctx, &monitor.globals).map(drop));
    monitor.start_exit_probe();

    let close_at = ctx.now() + ctx.config().timing.long_task_window_ms;
    let long_tasks = ctx.clone();
    monitor.schedule(
        close_at,
        "long-task.close",
        Box::new(move |_: Millis| {
            long_tasks.close_long_tasks();
            log::trace!(target: "monitor", "long-task observer disconnected");
            Next::Done
        }),
    );

    log::debug!(
        target: "monitor",
        "injected with {} local assets",
        ctx.assets().len()
    );
    Some(monitor)
}

/// Host-side handle on one monitored load.
///
/// Every entry point runs synchronously and fails open. Timers only fire
/// from [`Monitor::tick`].
pub struct Monitor {
    ctx: MonitorContext,
    scheduler: RefCell<Scheduler>,
    view: Rc<dyn DocumentView>,
    globals: Rc<RefCell<Globals>>,
    probe: ExitProbe,
}

impl Monitor {
    pub fn context(&self) -> &MonitorContext {
        &self.ctx
    }

    pub fn exit_probe(&self) -> &ExitProbe {
        &self.probe
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.borrow().pending()
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.scheduler.borrow().next_due()
    }

    /// Run every timer due by the clock's current time.
    pub fn tick(&self) -> usize {
        self.scheduler.run_due(self.ctx.now())
    }

    fn schedule(&self, due: Millis, label: &'static str, task: Task) -> TaskId {
        self.scheduler.borrow_mut().schedule_at(due, label, task)
    }

    fn start_exit_probe(&self) {
        if let Next::After(delay) = self.probe.attempt(&self.ctx, &self.globals) {
            let (probe, ctx, globals) = (self.probe.clone(), self.ctx.clone(), self.globals.clone());
            self.schedule(
                self.ctx.now() + delay,
                "exit.probe",
                Box::new(move |_: Millis| probe.attempt(&ctx, &globals)),
            );
        }
    }

    /// The load-completed signal. The first call fixes content-ready time
    /// and starts the scheduled scans and snapshot re-emission.
    pub fn content_loaded(&self, t: Millis) {
        let mut first = false;
        self.ctx.observe("phase.content_loaded", |ctx| {
            first = ctx.phases()?.content_loaded(t);
            if first {
                ctx.update(|s| s.content_ready_ms = Some(t))?;
            }
            Ok(())
        });
        if !first {
            return;
        }

        for &offset in &self.ctx.config().animation.scan_offsets_ms {
            let (ctx, view, globals) = (self.ctx.clone(), self.view.clone(), self.globals.clone());
            self.schedule(
                t + offset,
                "detector.scan",
                Box::new(move |_: Millis| {
                    run_scan(&ctx, view.as_ref(), &globals);
                    Next::Done
                }),
            );
        }

        let snapshots = &self.ctx.config().snapshots;
        if snapshots.max_emissions > 0 {
            let (ctx, interval, max) = (self.ctx.clone(), snapshots.interval_ms, snapshots.max_emissions);
            let mut sent = 0;
            self.schedule(
                t + interval,
                "summary.snapshot",
                Box::new(move |_: Millis| {
                    ctx.publish_snapshot();
                    sent += 1;
                    if sent >= max { Next::Done } else { Next::After(interval) }
                }),
            );
        }
    }

    pub fn resource_timing(&self, timing: &ResourceTiming) {
        self.ctx.observe("phase.classify", |ctx| {
            let now = ctx.now();
            let observation = ctx
                .phases()?
                .classify(timing, |name| ctx.assets().size_of_handle(name), now);
            if let Some(obs) = observation {
                log::trace!(
                    target: "monitor.phase",
                    "{} @{} -> {:?} ({} bytes)",
                    obs.name,
                    obs.start_time,
                    obs.phase,
                    obs.bytes
                );
                ctx.update(|s| s.record_resource(obs.phase, obs.bytes))?;
            }
            Ok(())
        });
    }

    /// Feed one input event. Primary gestures open an interaction window;
    /// trusted activations may become click-exit candidates.
    pub fn input(&self, event: &InputEvent) -> InputDisposition {
        if let Some(gesture) = event.gesture() {
            self.ctx.observe("phase.gesture", |ctx| {
                ctx.phases()?.open_window(gesture, event.time);
                Ok(())
            });
        }
        let mut disposition = InputDisposition::Continue;
        fail_open("exit.gesture", || {
            disposition = click_exit::on_input(&self.ctx, &self.globals, event);
            Ok(())
        });
        disposition
    }

    pub fn frame(&self) {
        self.ctx.observe("timing.frame", |ctx| {
            ctx.update(|s| s.frames = Some(s.frames.unwrap_or(0) + 1))
        });
    }

    pub fn first_paint(&self, t: Millis) {
        self.ctx.observe("timing.first_paint", |ctx| {
            ctx.update(|s| {
                s.first_paint_ms.get_or_insert(t);
            })
        });
    }

    /// Blocking time counts only while the long-task observer is connected.
    pub fn long_task(&self, duration: Millis) {
        if !self.ctx.long_tasks_open() || !duration.is_finite() || duration < 0.0 {
            return;
        }
        self.ctx.observe("timing.long_task", |ctx| {
            ctx.update(|s| s.long_task_ms = Some(s.long_task_ms.unwrap_or(0.0) + duration))
        });
    }

    pub fn runtime_error(&self, message: &str, source: Option<&str>, line: Option<u32>) {
        self.ctx.observe("runtime.error", |ctx| {
            ctx.increment(Counter::Errors)?;
            ctx.emit(MonitorEvent::RuntimeError {
                message: bus::clip(message),
                source: source.map(bus::clip),
                line,
            });
            Ok(())
        });
    }

    /// Run the detector scan now, outside the schedule.
    pub fn scan_now(&self) {
        run_scan(&self.ctx, self.view.as_ref(), &self.globals);
    }

    pub fn summary(&self) -> Summary {
        self.ctx.summary()
    }

    pub fn publish_snapshot(&self) {
        self.ctx.publish_snapshot();
    }

    /// Stop all timers, send a last snapshot and hand back the local
    /// asset handles so the host can revoke them.
    pub fn teardown(self) -> Vec<String> {
        self.scheduler.borrow_mut().cancel_all();
        self.ctx.publish_snapshot();
        let handles = self.ctx.assets().handles();
        log::debug!(target: "monitor", "torn down; {} handles to revoke", handles.len());
        handles
    }
}

fn run_scan(ctx: &MonitorContext, view: &dyn DocumentView, globals: &RefCell<Globals>) {
    ctx.observe("animation.hook", |ctx| hook_libraries(ctx, globals).map(drop));
    ctx.observe("exit.hook", |ctx| hook_exit_apis(ctx, globals).map(drop));
    ctx.observe("animation.scan", |ctx| scan_animations(ctx, view).map(drop));
    ctx.observe("geometry.dom", |ctx| {
        let edges = scan_dom(view, &ctx.config().geometry);
        let rules = count_border_rules(&view.style_sheets());
        ctx.record_border(|evidence| {
            evidence.dom = evidence.dom.union(edges);
            evidence.rules = evidence.rules.max(rules);
        })
    });
}
