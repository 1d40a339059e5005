use bus::{DialogKind, MonitorEvent};
use core_types::Counter;

use crate::context::MonitorContext;

/// The three blocking prompt shapes.
pub trait DialogCapability {
    fn alert(&mut self, message: &str);
    fn confirm(&mut self, message: &str) -> bool;
    fn prompt(&mut self, message: &str, default: Option<&str>) -> Option<String>;
}

pub struct InterceptedDialogs {
    inner: Box<dyn DialogCapability>,
    ctx: MonitorContext,
}

impl InterceptedDialogs {
    pub fn wrap(original: Box<dyn DialogCapability>, ctx: MonitorContext) -> Box<dyn DialogCapability> {
        Box::new(Self { inner: original, ctx })
    }

    fn report(&self, kind: DialogKind, message: &str) {
        self.ctx.observe("dialog", |ctx| {
            ctx.increment(Counter::Dialogs)?;
            ctx.emit(MonitorEvent::Dialog {
                kind,
                message: bus::clip(message),
            });
            Ok(())
        });
    }
}

impl DialogCapability for InterceptedDialogs {
    fn alert(&mut self, message: &str) {
        self.report(DialogKind::Alert, message);
        self.inner.alert(message);
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.report(DialogKind::Confirm, message);
        self.inner.confirm(message)
    }

    fn prompt(&mut self, message: &str, default: Option<&str>) -> Option<String> {
        self.report(DialogKind::Prompt, message);
        self.inner.prompt(message, default)
    }
}
