//! Capability interfaces of a monitored execution context.
//!
//! Each surface the creative can reach is a trait object. The injector
//! swaps every one for an interceptor built with `wrap(original, ctx)`;
//! interceptors report through the shared [`MonitorContext`] and then
//! always forward to the original.
//!
//! [`MonitorContext`]: crate::context::MonitorContext

use std::cell::RefCell;
use std::rc::Rc;

pub mod console;
pub mod dialog;
pub mod document;
pub mod drawing;
pub mod element;
pub mod globals;
pub mod network;
pub mod observer;
pub mod storage;
pub mod style;
pub mod view;

pub use console::ConsoleCapability;
pub use dialog::DialogCapability;
pub use document::DocumentCapability;
pub use drawing::{CanvasFactory, DrawingCapability, StrokeStyle};
pub use element::ElementCapability;
pub use globals::{ExitApi, Globals, RepeatSpec, TimelineLibrary, TweenParams, Vars};
pub use network::{NetworkCapability, RequestId};
pub use observer::{ObserveTarget, ObserverCapability, ObserverKind};
pub use storage::StorageCapability;
pub use style::{SheetId, StyleCapability};
pub use view::{DocumentView, ElementSnapshot, EmptyView};

/// Everything the creative can touch. Fields are public so the host can
/// drive them the way the creative's own code would.
pub struct ExecutionContext {
    pub network: Box<dyn NetworkCapability>,
    pub storage: Box<dyn StorageCapability>,
    pub dialogs: Box<dyn DialogCapability>,
    pub console: Box<dyn ConsoleCapability>,
    pub document: Box<dyn DocumentCapability>,
    pub elements: Box<dyn ElementCapability>,
    pub styles: Box<dyn StyleCapability>,
    pub observers: Box<dyn ObserverCapability>,
    pub canvases: Box<dyn CanvasFactory>,
    pub view: Rc<dyn DocumentView>,
    pub globals: Rc<RefCell<Globals>>,
    monitored: bool,
}

impl ExecutionContext {
    /// A context whose capabilities do nothing.
    pub fn new(view: Rc<dyn DocumentView>) -> Self {
        Self {
            network: Box::new(Inert::default()),
            storage: Box::new(Inert::default()),
            dialogs: Box::new(Inert::default()),
            console: Box::new(Inert::default()),
            document: Box::new(Inert::default()),
            elements: Box::new(Inert::default()),
            styles: Box::new(Inert::default()),
            observers: Box::new(Inert::default()),
            canvases: Box::new(Inert::default()),
            view,
            globals: Rc::new(RefCell::new(Globals::default())),
            monitored: false,
        }
    }

    pub fn with_network(mut self, network: Box<dyn NetworkCapability>) -> Self {
        self.network = network;
        self
    }

    pub fn with_storage(mut self, storage: Box<dyn StorageCapability>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_dialogs(mut self, dialogs: Box<dyn DialogCapability>) -> Self {
        self.dialogs = dialogs;
        self
    }

    pub fn with_console(mut self, console: Box<dyn ConsoleCapability>) -> Self {
        self.console = console;
        self
    }

    pub fn with_document(mut self, document: Box<dyn DocumentCapability>) -> Self {
        self.document = document;
        self
    }

    pub fn with_elements(mut self, elements: Box<dyn ElementCapability>) -> Self {
        self.elements = elements;
        self
    }

    pub fn with_styles(mut self, styles: Box<dyn StyleCapability>) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_observers(mut self, observers: Box<dyn ObserverCapability>) -> Self {
        self.observers = observers;
        self
    }

    pub fn with_canvases(mut self, canvases: Box<dyn CanvasFactory>) -> Self {
        self.canvases = canvases;
        self
    }

    pub fn with_globals(mut self, globals: Globals) -> Self {
        self.globals = Rc::new(RefCell::new(globals));
        self
    }

    /// Set once by the injector; a marked context is never wrapped again.
    pub fn is_monitored(&self) -> bool {
        self.monitored
    }

    pub(crate) fn mark_monitored(&mut self) {
        self.monitored = true;
    }
}

/// Stand-in for a capability the context does not offer.
#[derive(Default)]
pub struct Inert {
    next_request: u64,
}

impl NetworkCapability for Inert {
    fn fetch(&mut self, _method: &str, _url: &str) -> RequestId {
        self.next_request += 1;
        RequestId(self.next_request)
    }

    fn open(&mut self, _method: &str, _url: &str) -> RequestId {
        self.next_request += 1;
        RequestId(self.next_request)
    }

    fn send(&mut self, _request: RequestId) {}
}

impl StorageCapability for Inert {
    fn get_item(&mut self, _key: &str) -> Option<String> {
        None
    }
    fn set_item(&mut self, _key: &str, _value: &str) {}
    fn remove_item(&mut self, _key: &str) {}
    fn clear(&mut self) {}
}

impl DialogCapability for Inert {
    fn alert(&mut self, _message: &str) {}
    fn confirm(&mut self, _message: &str) -> bool {
        false
    }
    fn prompt(&mut self, _message: &str, _default: Option<&str>) -> Option<String> {
        None
    }
}

impl ConsoleCapability for Inert {
    fn error(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
    fn log(&mut self, _message: &str) {}
}

impl DocumentCapability for Inert {
    fn write(&mut self, _markup: &str) {}
}

impl ElementCapability for Inert {
    fn set_property(&mut self, _element: &core_types::ElementRef, _name: &str, _value: &str) {}
    fn set_attribute(&mut self, _element: &core_types::ElementRef, _name: &str, _value: &str) {}
}

impl StyleCapability for Inert {
    fn set_sheet_text(&mut self, _sheet: SheetId, _text: &str) {}
    fn insert_rule(&mut self, _sheet: SheetId, _rule: &str, index: usize) -> usize {
        index
    }
    fn set_style_property(&mut self, _element: &core_types::ElementRef, _name: &str, _value: &str) {}
}

impl ObserverCapability for Inert {
    fn observe(&mut self, _kind: ObserverKind, _target: &ObserveTarget) -> bool {
        true
    }
}

impl CanvasFactory for Inert {
    fn get_context(&mut self, _canvas: &core_types::ElementRef) -> Option<Box<dyn DrawingCapability>> {
        None
    }
}
