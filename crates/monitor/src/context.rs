use std::borrow::Cow;
use std::cell::{Cell, RefCell, RefMut};
use std::collections::HashSet;
use std::rc::Rc;

use bus::{EventSender, MonitorEvent};
use core_types::{Counter, Millis, Summary};

use crate::assets::AssetTable;
use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::geometry::BorderEvidence;
use crate::guard::fail_open;
use crate::phase::PhaseClassifier;

/// State of one monitored load, shared by every hook and detector.
///
/// Built once at injection time and handed to each wrapper by clone; no
/// hook looks anything up ambiently. Cheap to clone.
#[derive(Clone)]
pub struct MonitorContext {
    inner: Rc<Inner>,
}

struct Inner {
    config: MonitorConfig,
    clock: Rc<dyn Clock>,
    events: EventSender,
    assets: AssetTable,
    summary: RefCell<Summary>,
    phases: RefCell<PhaseClassifier>,
    border: RefCell<BorderEvidence>,
    rejected_targets: RefCell<HashSet<String>>,
    long_tasks_open: Cell<bool>,
}

impl MonitorContext {
    pub fn new(
        config: MonitorConfig,
        clock: Rc<dyn Clock>,
        events: EventSender,
        assets: AssetTable,
    ) -> Self {
        let phases = PhaseClassifier::new(config.phase.clone());
        Self {
            inner: Rc::new(Inner {
                config,
                clock,
                events,
                assets,
                summary: RefCell::new(Summary::default()),
                phases: RefCell::new(phases),
                border: RefCell::new(BorderEvidence::default()),
                rejected_targets: RefCell::new(HashSet::new()),
                long_tasks_open: Cell::new(true),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn now(&self) -> Millis {
        self.inner.clock.now_ms()
    }

    pub fn assets(&self) -> &AssetTable {
        &self.inner.assets
    }

    /// Run a hook body behind the fail-open guard.
    pub fn observe<F>(&self, hook: &'static str, f: F)
    where
        F: FnOnce(&MonitorContext) -> Result<(), MonitorError>,
    {
        fail_open(hook, || f(self));
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Summary) -> R) -> Result<R, MonitorError> {
        let mut summary = self
            .inner
            .summary
            .try_borrow_mut()
            .map_err(|_| MonitorError::SummaryBusy)?;
        Ok(f(&mut summary))
    }

    pub fn increment(&self, counter: Counter) -> Result<(), MonitorError> {
        self.update(|s| s.increment(counter))
    }

    pub fn summary(&self) -> Summary {
        self.inner.summary.borrow().clone()
    }

    pub fn emit(&self, event: MonitorEvent) {
        if !self.inner.events.emit(event) {
            log::trace!(target: "monitor", "event channel closed");
        }
    }

    pub fn publish_snapshot(&self) {
        let summary = self.summary();
        self.emit(MonitorEvent::SummarySnapshot { summary });
    }

    pub fn phases(&self) -> Result<RefMut<'_, PhaseClassifier>, MonitorError> {
        self.inner
            .phases
            .try_borrow_mut()
            .map_err(|_| MonitorError::Hook("phase classifier is busy".into()))
    }

    /// Fold new border evidence in and republish the edge count.
    pub fn record_border(&self, f: impl FnOnce(&mut BorderEvidence)) -> Result<(), MonitorError> {
        let (sides, rules) = {
            let mut evidence = self
                .inner
                .border
                .try_borrow_mut()
                .map_err(|_| MonitorError::Hook("border evidence is busy".into()))?;
            f(&mut evidence);
            (evidence.edge_count(), evidence.rules)
        };
        self.update(|s| {
            s.border_sides = Some(sides);
            s.border_rules = Some(rules);
        })
    }

    /// Resolve a reference through the asset table. Any fault means "leave
    /// the reference alone".
    pub fn resolve_reference(&self, reference: &str) -> Option<String> {
        let mut resolved = None;
        fail_open("assets.resolve", || {
            resolved = self.inner.assets.resolve(reference).map(str::to_string);
            Ok(())
        });
        resolved
    }

    /// Style-sheet text with resolvable `url(...)` tokens replaced; `None`
    /// when nothing changed or the rewrite faulted.
    pub fn rewrite_css(&self, css: &str) -> Option<String> {
        let mut rewritten = None;
        fail_open("assets.rewrite_css", || {
            if let Cow::Owned(text) = self.inner.assets.rewrite_css(css) {
                rewritten = Some(text);
            }
            Ok(())
        });
        rewritten
    }

    pub fn rewrite_markup(&self, html: &str) -> Option<String> {
        let mut rewritten = None;
        fail_open("assets.rewrite_markup", || {
            if let Cow::Owned(text) = self.inner.assets.rewrite_markup(html) {
                rewritten = Some(text);
            }
            Ok(())
        });
        rewritten
    }

    /// Returns true the first time a target class is seen.
    pub fn first_rejection(&self, class: &str) -> bool {
        match self.inner.rejected_targets.try_borrow_mut() {
            Ok(mut seen) => seen.insert(class.to_string()),
            Err(_) => false,
        }
    }

    pub fn long_tasks_open(&self) -> bool {
        self.inner.long_tasks_open.get()
    }

    pub fn close_long_tasks(&self) {
        self.inner.long_tasks_open.set(false);
    }
}
