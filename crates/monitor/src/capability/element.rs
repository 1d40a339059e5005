use core_types::{ElementRef, ResourceKind};

use crate::animation::fold_declarations;
use crate::context::MonitorContext;

/// Direct property assignment and generic attribute assignment on
/// elements.
pub trait ElementCapability {
    fn set_property(&mut self, element: &ElementRef, name: &str, value: &str);
    fn set_attribute(&mut self, element: &ElementRef, name: &str, value: &str);
}

pub struct InterceptedElements {
    inner: Box<dyn ElementCapability>,
    ctx: MonitorContext,
}

impl InterceptedElements {
    pub fn wrap(original: Box<dyn ElementCapability>, ctx: MonitorContext) -> Box<dyn ElementCapability> {
        Box::new(Self { inner: original, ctx })
    }

    /// Replacement for a reference write, or `None` to forward as is.
    fn rewrite(&self, element: &ElementRef, name: &str, value: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "src" | "href" | "poster" | "data" if ResourceKind::from_tag(&element.tag).is_some() => {
                let local = self.ctx.resolve_reference(value)?;
                log::trace!(target: "monitor.capability", "<{}> {name} -> {local}", element.tag);
                Some(local)
            }
            "style" | "csstext" => {
                self.ctx.observe("element.style", |ctx| {
                    let decls = css::parse_declarations(value);
                    fold_declarations(ctx, decls.iter().map(|d| (d.name.as_str(), d.value.as_str())))
                });
                self.ctx.rewrite_css(value)
            }
            _ => None,
        }
    }
}

impl ElementCapability for InterceptedElements {
    fn set_property(&mut self, element: &ElementRef, name: &str, value: &str) {
        match self.rewrite(element, name, value) {
            Some(local) => self.inner.set_property(element, name, &local),
            None => self.inner.set_property(element, name, value),
        }
    }

    fn set_attribute(&mut self, element: &ElementRef, name: &str, value: &str) {
        match self.rewrite(element, name, value) {
            Some(local) => self.inner.set_attribute(element, name, &local),
            None => self.inner.set_attribute(element, name, value),
        }
    }
}
