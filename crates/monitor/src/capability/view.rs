use std::collections::BTreeMap;

use core_types::{ElementRef, Rectangle, Size};

/// Read-only picture of one element: its inline declarations, its
/// computed style and its bounding client rectangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementSnapshot {
    pub element: Option<ElementRef>,
    pub inline: BTreeMap<String, String>,
    pub computed: BTreeMap<String, String>,
    pub rect: Rectangle,
}

impl ElementSnapshot {
    pub fn new(element: ElementRef, rect: Rectangle) -> Self {
        Self {
            element: Some(element),
            rect,
            ..Self::default()
        }
    }

    pub fn with_inline(mut self, name: &str, value: &str) -> Self {
        self.inline.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_computed(mut self, name: &str, value: &str) -> Self {
        self.computed.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Inline declarations win over computed ones.
    pub fn style(&self, name: &str) -> Option<&str> {
        self.inline
            .get(name)
            .or_else(|| self.computed.get(name))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Structural queries the detectors run against the live document.
pub trait DocumentView {
    fn viewport(&self) -> Size;

    /// Up to `limit` elements in document order.
    fn elements(&self, limit: usize) -> Vec<ElementSnapshot>;

    /// Text of every readable style sheet.
    fn style_sheets(&self) -> Vec<String>;
}

/// A document with nothing in it.
pub struct EmptyView;

impl DocumentView for EmptyView {
    fn viewport(&self) -> Size {
        Size::new(0.0, 0.0)
    }

    fn elements(&self, _limit: usize) -> Vec<ElementSnapshot> {
        Vec::new()
    }

    fn style_sheets(&self) -> Vec<String> {
        Vec::new()
    }
}
