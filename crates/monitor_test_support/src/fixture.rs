use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use core_types::{ElementRef, Rectangle, Size};
use monitor::{DocumentView, ElementSnapshot};
use serde::Deserialize;

/// Scriptable document. Clones share the element list, so a test can keep
/// one clone and change what the next scan sees.
#[derive(Clone)]
pub struct FakeDocumentView {
    pub viewport: Size,
    elements: Rc<RefCell<Vec<ElementSnapshot>>>,
    sheets: Rc<RefCell<Vec<String>>>,
}

impl FakeDocumentView {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            viewport: Size::new(width, height),
            elements: Rc::default(),
            sheets: Rc::default(),
        }
    }

    pub fn with_element(self, element: ElementSnapshot) -> Self {
        self.elements.borrow_mut().push(element);
        self
    }

    pub fn with_sheet(self, text: &str) -> Self {
        self.sheets.borrow_mut().push(text.to_string());
        self
    }

    pub fn set_elements(&self, elements: Vec<ElementSnapshot>) {
        *self.elements.borrow_mut() = elements;
    }

    /// Load a document description:
    ///
    /// ```toml
    /// viewport = [300, 250]
    /// sheets = [".frame { border: 1px solid #000 }"]
    ///
    /// [[elements]]
    /// id = 1
    /// tag = "div"
    /// rect = [0, 0, 300, 1]
    /// inline = { position = "absolute", background = "#000" }
    /// ```
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let fixture: DocumentFixture = toml::from_str(text)?;
        let view = Self::new(fixture.viewport[0], fixture.viewport[1]);
        *view.sheets.borrow_mut() = fixture.sheets;
        *view.elements.borrow_mut() = fixture
            .elements
            .into_iter()
            .map(ElementFixture::into_snapshot)
            .collect();
        Ok(view)
    }
}

impl DocumentView for FakeDocumentView {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn elements(&self, limit: usize) -> Vec<ElementSnapshot> {
        self.elements.borrow().iter().take(limit).cloned().collect()
    }

    fn style_sheets(&self) -> Vec<String> {
        self.sheets.borrow().clone()
    }
}

#[derive(Deserialize)]
struct DocumentFixture {
    viewport: [f32; 2],
    #[serde(default)]
    sheets: Vec<String>,
    #[serde(default)]
    elements: Vec<ElementFixture>,
}

#[derive(Deserialize)]
struct ElementFixture {
    id: u64,
    tag: String,
    #[serde(default)]
    rect: [f32; 4],
    #[serde(default)]
    inline: BTreeMap<String, String>,
    #[serde(default)]
    computed: BTreeMap<String, String>,
}

impl ElementFixture {
    fn into_snapshot(self) -> ElementSnapshot {
        let [x, y, w, h] = self.rect;
        let mut snapshot = ElementSnapshot::new(ElementRef::new(self.id, self.tag), Rectangle::new(x, y, w, h));
        for (name, value) in &self.inline {
            snapshot = snapshot.with_inline(name, value);
        }
        for (name, value) in &self.computed {
            snapshot = snapshot.with_computed(name, value);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_fixture() {
        let view = FakeDocumentView::from_toml(
            r##"
viewport = [300, 250]
sheets = [".a { border: 1px solid red }"]

[[elements]]
id = 7
tag = "DIV"
rect = [0, 0, 300, 2]
inline = { animation = "spin 2s 3" }
"##,
        )
        .expect("fixture");
        assert_eq!(view.viewport(), Size::new(300.0, 250.0));
        let elements = view.elements(10);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].element.as_ref().map(|e| e.tag.as_str()), Some("div"));
        assert_eq!(elements[0].style("animation"), Some("spin 2s 3"));
        assert_eq!(view.style_sheets().len(), 1);
    }

    #[test]
    fn clones_share_elements() {
        let view = FakeDocumentView::new(10.0, 10.0);
        let handle = view.clone();
        handle.set_elements(vec![ElementSnapshot::default()]);
        assert_eq!(view.elements(10).len(), 1);
        assert_eq!(view.elements(0).len(), 0);
    }
}
