use core_types::ElementRef;

use crate::context::MonitorContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserverKind {
    Mutation,
    Resize,
    Intersection,
}

/// What a registration asked to observe.
#[derive(Clone, Debug, PartialEq)]
pub enum ObserveTarget {
    Element(ElementRef),
    Document,
    /// Anything else the script passed in; `class_name` is its runtime
    /// type as the context reports it.
    Value { class_name: String },
}

/// Structural-change and geometry-observation registration.
pub trait ObserverCapability {
    /// Returns whether the registration took effect.
    fn observe(&mut self, kind: ObserverKind, target: &ObserveTarget) -> bool;
}

pub struct GuardedObservers {
    inner: Box<dyn ObserverCapability>,
    ctx: MonitorContext,
}

impl GuardedObservers {
    pub fn wrap(original: Box<dyn ObserverCapability>, ctx: MonitorContext) -> Box<dyn ObserverCapability> {
        Box::new(Self { inner: original, ctx })
    }
}

fn accepts(kind: ObserverKind, target: &ObserveTarget) -> bool {
    match target {
        ObserveTarget::Element(_) => true,
        // only tree mutations can watch the document node
        ObserveTarget::Document => kind == ObserverKind::Mutation,
        ObserveTarget::Value { .. } => false,
    }
}

impl ObserverCapability for GuardedObservers {
    fn observe(&mut self, kind: ObserverKind, target: &ObserveTarget) -> bool {
        if !accepts(kind, target) {
            let class = match target {
                ObserveTarget::Value { class_name } => class_name.as_str(),
                ObserveTarget::Document => "Document",
                ObserveTarget::Element(_) => "Element",
            };
            if self.ctx.first_rejection(class) {
                log::warn!(target: "monitor.capability", "ignoring {kind:?} observer on non-element target {class}");
            }
            return false;
        }
        self.inner.observe(kind, target)
    }
}
