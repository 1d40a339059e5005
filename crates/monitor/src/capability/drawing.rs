use core_types::{ElementRef, Size};

use crate::context::MonitorContext;
use crate::geometry::transform::Affine;
use crate::geometry::{CanvasTracker, Edges};

#[derive(Clone, Debug, PartialEq)]
pub enum StrokeStyle {
    Color(String),
    Gradient,
    Pattern,
}

impl StrokeStyle {
    pub fn is_visible(&self) -> bool {
        match self {
            StrokeStyle::Color(c) => css::is_visible_color(c),
            StrokeStyle::Gradient | StrokeStyle::Pattern => true,
        }
    }
}

/// The 2D drawing primitives of one surface.
pub trait DrawingCapability {
    fn surface_size(&self) -> Size;

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f64, y: f64);
    fn scale(&mut self, x: f64, y: f64);
    fn rotate(&mut self, radians: f64);
    fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64);
    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64);
    fn reset_transform(&mut self);

    fn set_line_width(&mut self, width: f64);
    fn set_stroke_style(&mut self, style: StrokeStyle);
    fn set_global_alpha(&mut self, alpha: f64);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64);
    fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64);
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, ccw: bool);
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn close_path(&mut self);

    fn stroke(&mut self);
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
}

/// Hands out drawing capabilities for canvas elements.
pub trait CanvasFactory {
    fn get_context(&mut self, canvas: &ElementRef) -> Option<Box<dyn DrawingCapability>>;
}

pub struct InterceptedCanvases {
    inner: Box<dyn CanvasFactory>,
    ctx: MonitorContext,
}

impl InterceptedCanvases {
    pub fn wrap(original: Box<dyn CanvasFactory>, ctx: MonitorContext) -> Box<dyn CanvasFactory> {
        Box::new(Self { inner: original, ctx })
    }
}

impl CanvasFactory for InterceptedCanvases {
    fn get_context(&mut self, canvas: &ElementRef) -> Option<Box<dyn DrawingCapability>> {
        let original = self.inner.get_context(canvas)?;
        Some(InterceptedDrawing::wrap(original, self.ctx.clone()))
    }
}

/// Tracks transform and path state next to the real surface. Tracking
/// never changes what gets drawn.
pub struct InterceptedDrawing {
    inner: Box<dyn DrawingCapability>,
    ctx: MonitorContext,
    tracker: CanvasTracker,
}

impl InterceptedDrawing {
    pub fn wrap(original: Box<dyn DrawingCapability>, ctx: MonitorContext) -> Box<dyn DrawingCapability> {
        Box::new(Self {
            inner: original,
            ctx,
            tracker: CanvasTracker::new(),
        })
    }

    fn track(&mut self, hook: &'static str, f: impl FnOnce(&mut CanvasTracker)) {
        let tracker = &mut self.tracker;
        self.ctx.observe(hook, |_| {
            f(tracker);
            Ok(())
        });
    }

    fn commit(&mut self, hook: &'static str, f: impl FnOnce(&mut CanvasTracker, Size, &MonitorContext) -> bool) {
        let surface = self.inner.surface_size();
        let tracker = &mut self.tracker;
        self.ctx.observe(hook, |ctx| {
            if f(tracker, surface, ctx) {
                ctx.record_border(|evidence| evidence.canvas = Edges::ALL)?;
            }
            Ok(())
        });
    }
}

impl DrawingCapability for InterceptedDrawing {
    fn surface_size(&self) -> Size {
        self.inner.surface_size()
    }

    fn save(&mut self) {
        self.track("canvas.save", |t| t.state_mut().save());
        self.inner.save();
    }

    fn restore(&mut self) {
        self.track("canvas.restore", |t| t.state_mut().restore());
        self.inner.restore();
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.track("canvas.translate", |t| t.state_mut().translate(x, y));
        self.inner.translate(x, y);
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.track("canvas.scale", |t| t.state_mut().scale(x, y));
        self.inner.scale(x, y);
    }

    fn rotate(&mut self, radians: f64) {
        self.track("canvas.rotate", |t| t.state_mut().rotate(radians));
        self.inner.rotate(radians);
    }

    fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.track("canvas.transform", |t| t.state_mut().compose(Affine::new(a, b, c, d, e, f)));
        self.inner.transform(a, b, c, d, e, f);
    }

    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.track("canvas.set_transform", |t| t.state_mut().set(Affine::new(a, b, c, d, e, f)));
        self.inner.set_transform(a, b, c, d, e, f);
    }

    fn reset_transform(&mut self) {
        self.track("canvas.reset_transform", |t| t.state_mut().reset());
        self.inner.reset_transform();
    }

    fn set_line_width(&mut self, width: f64) {
        // the platform ignores non-positive and non-finite widths
        if width.is_finite() && width > 0.0 {
            self.track("canvas.line_width", |t| t.state_mut().current_mut().line_width = width);
        }
        self.inner.set_line_width(width);
    }

    fn set_stroke_style(&mut self, style: StrokeStyle) {
        let visible = style.is_visible();
        self.track("canvas.stroke_style", |t| t.state_mut().current_mut().stroke_visible = visible);
        self.inner.set_stroke_style(style);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        if (0.0..=1.0).contains(&alpha) {
            self.track("canvas.global_alpha", |t| t.state_mut().current_mut().global_alpha = alpha);
        }
        self.inner.set_global_alpha(alpha);
    }

    fn begin_path(&mut self) {
        self.track("canvas.begin_path", |t| t.begin_path());
        self.inner.begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.track("canvas.move_to", |t| t.move_to(x, y));
        self.inner.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.track("canvas.line_to", |t| t.line_to(x, y));
        self.inner.line_to(x, y);
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.track("canvas.quadratic_curve_to", |t| t.quadratic_curve_to(cpx, cpy, x, y));
        self.inner.quadratic_curve_to(cpx, cpy, x, y);
    }

    fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.track("canvas.bezier_curve_to", |t| t.bezier_curve_to(c1x, c1y, c2x, c2y, x, y));
        self.inner.bezier_curve_to(c1x, c1y, c2x, c2y, x, y);
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, ccw: bool) {
        self.track("canvas.arc", |t| t.arc(x, y, radius, start, end, ccw));
        self.inner.arc(x, y, radius, start, end, ccw);
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.track("canvas.rect", |t| t.rect(x, y, w, h));
        self.inner.rect(x, y, w, h);
    }

    fn close_path(&mut self) {
        self.track("canvas.close_path", |t| t.close_path());
        self.inner.close_path();
    }

    fn stroke(&mut self) {
        self.commit("canvas.stroke", |t, surface, ctx| t.stroke(surface, &ctx.config().geometry));
        self.inner.stroke();
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.commit("canvas.stroke_rect", |t, surface, ctx| {
            t.stroke_rect(x, y, w, h, surface, &ctx.config().geometry)
        });
        self.inner.stroke_rect(x, y, w, h);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.inner.fill_rect(x, y, w, h);
    }
}
