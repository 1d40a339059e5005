/// 2x3 affine matrix in canvas order: `x' = a*x + c*y + e`,
/// `y' = b*x + d*y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn then(&self, other: &Affine) -> Affine {
        Affine {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Drawing state that `save`/`restore` carry.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawState {
    pub matrix: Affine,
    pub line_width: f64,
    pub stroke_visible: bool,
    pub global_alpha: f64,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            matrix: Affine::IDENTITY,
            line_width: 1.0,
            // default strokeStyle is opaque black
            stroke_visible: true,
            global_alpha: 1.0,
        }
    }
}

/// Per-surface transform with its save/restore stack.
#[derive(Clone, Debug, Default)]
pub struct TransformState {
    current: DrawState,
    stack: Vec<DrawState>,
}

impl TransformState {
    pub fn current(&self) -> &DrawState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut DrawState {
        &mut self.current
    }

    pub fn matrix(&self) -> Affine {
        self.current.matrix
    }

    pub fn save(&mut self) {
        self.stack.push(self.current.clone());
    }

    /// Unbalanced restores are ignored, as the platform does.
    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.current = state;
        }
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        self.compose(Affine::new(1.0, 0.0, 0.0, 1.0, x, y));
    }

    pub fn scale(&mut self, x: f64, y: f64) {
        self.compose(Affine::new(x, 0.0, 0.0, y, 0.0, 0.0));
    }

    pub fn rotate(&mut self, radians: f64) {
        let (sin, cos) = radians.sin_cos();
        self.compose(Affine::new(cos, sin, -sin, cos, 0.0, 0.0));
    }

    /// `transform(a..f)`: post-multiply.
    pub fn compose(&mut self, m: Affine) {
        if !m.is_finite() {
            return;
        }
        self.current.matrix = self.current.matrix.then(&m);
    }

    /// `setTransform(a..f)`: replace.
    pub fn set(&mut self, m: Affine) {
        if !m.is_finite() {
            return;
        }
        self.current.matrix = m;
    }

    pub fn reset(&mut self) {
        self.current.matrix = Affine::IDENTITY;
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_then_scale_maps_points() {
        let mut t = TransformState::default();
        t.translate(150.0, 125.0);
        t.scale(2.0, 1.0);
        assert_eq!(t.matrix().apply(10.0, 10.0), (170.0, 135.0));
    }

    #[test]
    fn rotate_quarter_turn() {
        let mut t = TransformState::default();
        t.rotate(std::f64::consts::FRAC_PI_2);
        let (x, y) = t.matrix().apply(1.0, 0.0);
        assert!(x.abs() < 1e-9);
        assert!((y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn save_restore_round_trips_state() {
        let mut t = TransformState::default();
        t.current_mut().line_width = 4.0;
        t.save();
        t.translate(5.0, 5.0);
        t.current_mut().line_width = 9.0;
        t.restore();
        assert_eq!(t.matrix(), Affine::IDENTITY);
        assert_eq!(t.current().line_width, 4.0);
        t.restore();
        assert_eq!(t.depth(), 0);
    }

    #[test]
    fn non_finite_matrices_are_ignored() {
        let mut t = TransformState::default();
        t.set(Affine::new(f64::NAN, 0.0, 0.0, 1.0, 0.0, 0.0));
        assert_eq!(t.matrix(), Affine::IDENTITY);
    }
}
