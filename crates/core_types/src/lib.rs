mod summary;

use serde::{Deserialize, Serialize};

pub use summary::{Counter, NetworkBreakdown, PhaseTally, Summary};

/// Milliseconds on the monitored context's high-resolution timeline.
pub type Millis = f64;

pub type ElementId = u64;
pub type SurfaceId = u64;

/// (r, g, b, a), alpha 0 is fully transparent.
pub type Rgba = (u8, u8, u8, u8);

/// When a network resource was requested relative to content-ready time
/// and user gestures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Initial,
    Subload,
    User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Document,
    Image,
    Media,
    Script,
    Stylesheet,
}

impl ResourceKind {
    /// Element kinds whose reference attributes point at fetchable content.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag.to_ascii_lowercase().as_str() {
            "img" | "image" | "input" => ResourceKind::Image,
            "video" | "audio" | "source" | "track" => ResourceKind::Media,
            "script" => ResourceKind::Script,
            "link" | "style" => ResourceKind::Stylesheet,
            "iframe" | "frame" | "embed" | "object" => ResourceKind::Document,
            _ => return None,
        };
        Some(kind)
    }
}

/// Host-side handle on an element of the monitored document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub id: ElementId,
    pub tag: String,
}

impl ElementRef {
    pub fn new(id: ElementId, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into().to_ascii_lowercase(),
        }
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}
