//! Border detection.
//!
//! Two independent heuristics feed one tally of viewport edges: stroked
//! canvas paths that span a whole drawing surface, and DOM bars or boxes
//! that hug the viewport edges. A side counts when either path saw it.

pub mod canvas;
pub mod dom;
pub mod transform;

pub use canvas::CanvasTracker;
pub use dom::{count_border_rules, scan_dom};
pub use transform::{Affine, TransformState};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Edges {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Edges {
    pub const ALL: Edges = Edges {
        top: true,
        right: true,
        bottom: true,
        left: true,
    };

    pub fn union(self, other: Edges) -> Edges {
        Edges {
            top: self.top || other.top,
            right: self.right || other.right,
            bottom: self.bottom || other.bottom,
            left: self.left || other.left,
        }
    }

    pub fn count(self) -> u8 {
        [self.top, self.right, self.bottom, self.left]
            .into_iter()
            .filter(|&b| b)
            .count() as u8
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BorderEvidence {
    pub canvas: Edges,
    pub dom: Edges,
    /// Stylesheet rules declaring a border or outline. Diagnostic only.
    pub rules: u32,
}

impl BorderEvidence {
    pub fn edges(&self) -> Edges {
        self.canvas.union(self.dom)
    }

    pub fn edge_count(&self) -> u8 {
        self.edges().count()
    }
}
