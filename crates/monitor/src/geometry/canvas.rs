//! Canvas path tracking for one drawing surface.
//!
//! Path points are mapped through the transform in force when they are
//! added, the way a 2D context bakes them into its path. Curves and arcs
//! are sampled, which is enough to bound a path without flattening it.
//! Only the running bounds of the path are kept.

use core_types::Size;

use super::transform::{Affine, TransformState};
use crate::config::GeometryConfig;

const CURVE_SAMPLES: [f64; 4] = [0.25, 0.5, 0.75, 1.0];
const ARC_SAMPLES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn point(x: f64, y: f64) -> Bounds {
        Bounds {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn extend(self, x: f64, y: f64) -> Bounds {
        Bounds {
            min_x: self.min_x.min(x),
            min_y: self.min_y.min(y),
            max_x: self.max_x.max(x),
            max_y: self.max_y.max(y),
        }
    }

    fn of(points: &[(f64, f64)]) -> Option<Bounds> {
        let (&(x0, y0), rest) = points.split_first()?;
        Some(rest.iter().fold(Bounds::point(x0, y0), |b, &(x, y)| b.extend(x, y)))
    }

    fn inflate(self, by: f64) -> Bounds {
        Bounds {
            min_x: self.min_x - by,
            min_y: self.min_y - by,
            max_x: self.max_x + by,
            max_y: self.max_y + by,
        }
    }

    fn spans(&self, size: Size, tolerance: f64) -> bool {
        let (w, h) = (f64::from(size.width), f64::from(size.height));
        w > 0.0
            && h > 0.0
            && self.min_x <= tolerance
            && self.min_y <= tolerance
            && self.max_x >= w - tolerance
            && self.max_y >= h - tolerance
    }
}

#[derive(Clone, Debug, Default)]
pub struct CanvasTracker {
    state: TransformState,
    path: Option<Bounds>,
    // user-space current point and subpath start
    cursor: Option<(f64, f64)>,
    subpath_start: Option<(f64, f64)>,
    detections: u32,
}

impl CanvasTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TransformState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TransformState {
        &mut self.state
    }

    pub fn detections(&self) -> u32 {
        self.detections
    }

    pub fn begin_path(&mut self) {
        self.path = None;
        self.cursor = None;
        self.subpath_start = None;
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.push(x, y);
        self.subpath_start = Some((x, y));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        if self.cursor.is_none() {
            self.subpath_start = Some((x, y));
        }
        self.push(x, y);
    }

    pub fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        let (x0, y0) = self.cursor.unwrap_or((cpx, cpy));
        for t in CURVE_SAMPLES {
            let u = 1.0 - t;
            self.push(
                u * u * x0 + 2.0 * u * t * cpx + t * t * x,
                u * u * y0 + 2.0 * u * t * cpy + t * t * y,
            );
        }
    }

    pub fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        let (x0, y0) = self.cursor.unwrap_or((c1x, c1y));
        for t in CURVE_SAMPLES {
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            self.push(
                a * x0 + b * c1x + c * c2x + d * x,
                a * y0 + b * c1y + c * c2y + d * y,
            );
        }
    }

    pub fn arc(&mut self, cx: f64, cy: f64, radius: f64, start: f64, end: f64, ccw: bool) {
        if !radius.is_finite() || radius < 0.0 {
            return;
        }
        let tau = std::f64::consts::TAU;
        let mut sweep = end - start;
        if ccw {
            if sweep > 0.0 {
                sweep = (sweep % tau) - tau;
            }
            sweep = sweep.max(-tau);
        } else {
            if sweep < 0.0 {
                sweep = (sweep % tau) + tau;
            }
            sweep = sweep.min(tau);
        }
        for i in 0..=ARC_SAMPLES {
            let angle = start + sweep * (i as f64 / ARC_SAMPLES as f64);
            let (sin, cos) = angle.sin_cos();
            self.push(cx + radius * cos, cy + radius * sin);
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        for (px, py) in [(x, y), (x + w, y), (x + w, y + h), (x, y + h)] {
            self.push(px, py);
        }
        self.cursor = Some((x, y));
        self.subpath_start = Some((x, y));
    }

    pub fn close_path(&mut self) {
        if let Some((x, y)) = self.subpath_start {
            self.cursor = Some((x, y));
        }
    }

    /// Commit the current path. Returns true when it draws a full border.
    pub fn stroke(&mut self, surface: Size, config: &GeometryConfig) -> bool {
        let hit = self.is_border(self.path, surface, config);
        self.note(hit)
    }

    /// `strokeRect`: strokes a rectangle without touching the current path.
    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, surface: Size, config: &GeometryConfig) -> bool {
        let m = self.state.matrix();
        let corners: Vec<(f64, f64)> = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
            .into_iter()
            .map(|(px, py)| m.apply(px, py))
            .collect();
        let hit = self.is_border(Bounds::of(&corners), surface, config);
        self.note(hit)
    }

    fn note(&mut self, hit: bool) -> bool {
        if hit {
            self.detections += 1;
            log::debug!(target: "monitor.geometry", "canvas border stroke detected");
        }
        hit
    }

    fn push(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        let (px, py) = self.state.matrix().apply(x, y);
        self.path = Some(match self.path {
            Some(b) => b.extend(px, py),
            None => Bounds::point(px, py),
        });
        self.cursor = Some((x, y));
    }

    fn is_border(&self, bounds: Option<Bounds>, surface: Size, config: &GeometryConfig) -> bool {
        let draw = self.state.current();
        if !draw.stroke_visible || draw.global_alpha <= 0.0 {
            return false;
        }
        let width = draw.line_width * scale_factor(&draw.matrix);
        let (min, max) = (f64::from(config.min_thickness_px), f64::from(config.max_thickness_px));
        if !(width > 0.0 && width >= min && width <= max) {
            return false;
        }
        bounds
            .map(|b| b.inflate(width / 2.0).spans(surface, f64::from(config.canvas_tolerance_px)))
            .unwrap_or(false)
    }
}

fn scale_factor(m: &Affine) -> f64 {
    (m.a * m.d - m.b * m.c).abs().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: Size = Size {
        width: 300.0,
        height: 250.0,
    };

    fn tracker(width: f64) -> CanvasTracker {
        let mut t = CanvasTracker::new();
        t.state_mut().current_mut().line_width = width;
        t
    }

    #[test]
    fn full_surface_stroke_rect_is_a_border() {
        let config = GeometryConfig::default();
        let mut t = tracker(2.0);
        assert!(t.stroke_rect(0.0, 0.0, 300.0, 250.0, SURFACE, &config));
        assert!(!t.stroke_rect(20.0, 20.0, 100.0, 100.0, SURFACE, &config));
        assert_eq!(t.detections(), 1);
    }

    #[test]
    fn translated_path_is_detected() {
        let config = GeometryConfig::default();
        let mut t = tracker(2.0);
        t.state_mut().translate(150.0, 125.0);
        t.begin_path();
        t.move_to(-150.0, -125.0);
        t.line_to(150.0, -125.0);
        t.line_to(150.0, 125.0);
        t.line_to(-150.0, 125.0);
        t.close_path();
        assert!(t.stroke(SURFACE, &config));
    }

    #[test]
    fn thick_or_invisible_strokes_are_not_borders() {
        let config = GeometryConfig::default();
        let mut t = tracker(40.0);
        assert!(!t.stroke_rect(0.0, 0.0, 300.0, 250.0, SURFACE, &config));

        let mut t = tracker(2.0);
        t.state_mut().current_mut().stroke_visible = false;
        assert!(!t.stroke_rect(0.0, 0.0, 300.0, 250.0, SURFACE, &config));

        let mut t = tracker(2.0);
        t.state_mut().current_mut().global_alpha = 0.0;
        assert!(!t.stroke_rect(0.0, 0.0, 300.0, 250.0, SURFACE, &config));
    }

    #[test]
    fn full_circle_arc_bounds_cover_its_box() {
        let config = GeometryConfig::default();
        let mut t = tracker(2.0);
        let surface = Size::new(100.0, 100.0);
        t.begin_path();
        t.arc(50.0, 50.0, 50.0, 0.0, std::f64::consts::TAU, false);
        assert!(t.stroke(surface, &config));
    }

    #[test]
    fn unbroken_path_keeps_only_its_bounds() {
        let config = GeometryConfig::default();
        let mut t = tracker(2.0);
        // no beginPath between frames: the path only ever widens
        for i in 0..10_000 {
            let x = f64::from(i % 100) + 100.0;
            t.line_to(x, 100.0);
            assert!(!t.stroke(SURFACE, &config));
        }
        t.rect(0.0, 0.0, 300.0, 250.0);
        assert!(t.stroke(SURFACE, &config));

        t.begin_path();
        t.rect(10.0, 10.0, 20.0, 20.0);
        assert!(!t.stroke(SURFACE, &config));
    }

    #[test]
    fn scaled_line_width_counts() {
        let config = GeometryConfig::default();
        let mut t = tracker(10.0);
        t.state_mut().scale(2.0, 2.0);
        // effective width 20 exceeds the 16px cap
        assert!(!t.stroke_rect(0.0, 0.0, 150.0, 125.0, SURFACE, &config));
    }
}
