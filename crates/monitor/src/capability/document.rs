use core_types::Counter;

use crate::context::MonitorContext;

/// Legacy whole-document text insertion.
pub trait DocumentCapability {
    fn write(&mut self, markup: &str);
}

pub struct InterceptedDocument {
    inner: Box<dyn DocumentCapability>,
    ctx: MonitorContext,
}

impl InterceptedDocument {
    pub fn wrap(original: Box<dyn DocumentCapability>, ctx: MonitorContext) -> Box<dyn DocumentCapability> {
        Box::new(Self { inner: original, ctx })
    }
}

impl DocumentCapability for InterceptedDocument {
    fn write(&mut self, markup: &str) {
        self.ctx
            .observe("document.write", |ctx| ctx.increment(Counter::DocumentWrites));
        match self.ctx.rewrite_markup(markup) {
            Some(rewritten) => self.inner.write(&rewritten),
            None => self.inner.write(markup),
        }
    }
}
