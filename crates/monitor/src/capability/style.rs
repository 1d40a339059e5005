use core_types::ElementRef;

use crate::animation::fold_declarations;
use crate::context::MonitorContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SheetId(pub u64);

/// Style-sheet text and per-element style property writes.
pub trait StyleCapability {
    fn set_sheet_text(&mut self, sheet: SheetId, text: &str);
    fn insert_rule(&mut self, sheet: SheetId, rule: &str, index: usize) -> usize;
    fn set_style_property(&mut self, element: &ElementRef, name: &str, value: &str);
}

pub struct InterceptedStyles {
    inner: Box<dyn StyleCapability>,
    ctx: MonitorContext,
}

impl InterceptedStyles {
    pub fn wrap(original: Box<dyn StyleCapability>, ctx: MonitorContext) -> Box<dyn StyleCapability> {
        Box::new(Self { inner: original, ctx })
    }

    fn fold_sheet(&self, text: &str) {
        self.ctx.observe("style.sheet", |ctx| {
            let sheet = css::parse_stylesheet(text);
            let decls = sheet
                .rules
                .iter()
                .flat_map(|r| r.declarations.iter())
                .map(|d| (d.name.as_str(), d.value.as_str()));
            fold_declarations(ctx, decls)
        });
    }
}

impl StyleCapability for InterceptedStyles {
    fn set_sheet_text(&mut self, sheet: SheetId, text: &str) {
        self.fold_sheet(text);
        match self.ctx.rewrite_css(text) {
            Some(rewritten) => self.inner.set_sheet_text(sheet, &rewritten),
            None => self.inner.set_sheet_text(sheet, text),
        }
    }

    fn insert_rule(&mut self, sheet: SheetId, rule: &str, index: usize) -> usize {
        self.fold_sheet(rule);
        match self.ctx.rewrite_css(rule) {
            Some(rewritten) => self.inner.insert_rule(sheet, &rewritten, index),
            None => self.inner.insert_rule(sheet, rule, index),
        }
    }

    fn set_style_property(&mut self, element: &ElementRef, name: &str, value: &str) {
        self.ctx.observe("style.property", |ctx| {
            fold_declarations(ctx, std::iter::once((name, value)))
        });
        match self.ctx.rewrite_css(value) {
            Some(rewritten) => self.inner.set_style_property(element, name, &rewritten),
            None => self.inner.set_style_property(element, name, value),
        }
    }
}
