use serde::{Deserialize, Serialize};

/// Fractal-space height visible on the surface at `zoom == 1.0`.
pub const VIEW_SPAN: f64 = 2.5;

const HOME_X: f64 = -0.5;
const HOME_Y: f64 = 0.0;
const HOME_ZOOM: f64 = 1.0;

/// The logical camera: fractal-space center plus zoom factor.
///
/// Smaller `zoom` means more magnified. Values are replaced wholesale, never
/// patched in place, so a reader always sees a consistent center/zoom pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

/// How zoom is blended while animating between two viewports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomInterpolation {
    #[default]
    Linear,
    Logarithmic,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}

impl Viewport {
    pub const fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    /// The home view every session starts from.
    pub const fn identity() -> Self {
        Self::new(HOME_X, HOME_Y, HOME_ZOOM)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Fractal-space point under the normalized screen coordinate `(fx, fy)`.
    pub fn point_at(&self, fx: f64, fy: f64, aspect: f64) -> (f64, f64) {
        let span = self.zoom * VIEW_SPAN;
        (
            self.x + (fx - 0.5) * span * aspect,
            self.y + (fy - 0.5) * span,
        )
    }

    /// Shift the center by a fraction of the visible surface.
    pub fn translate(&self, dx: f64, dy: f64, aspect: f64) -> Self {
        let span = self.zoom * VIEW_SPAN;
        Self {
            x: self.x + dx * span * aspect,
            y: self.y + dy * span,
            zoom: self.zoom,
        }
    }

    /// Scale zoom by `scale`, keeping the point under `(fx, fy)` fixed on screen.
    pub fn zoom_at(&self, fx: f64, fy: f64, scale: f64, aspect: f64) -> Self {
        let (px, py) = self.point_at(fx, fy, aspect);
        let zoom = self.zoom * scale;
        let span = zoom * VIEW_SPAN;
        Self {
            x: px - (fx - 0.5) * span * aspect,
            y: py - (fy - 0.5) * span,
            zoom,
        }
    }

    /// Field-wise linear blend; `frac = 0` yields `a`, `frac = 1` yields `b`.
    pub fn interpolate(a: &Self, b: &Self, frac: f64) -> Self {
        if frac <= 0.0 {
            return *a;
        }
        if frac >= 1.0 {
            return *b;
        }
        Self {
            x: lerp(a.x, b.x, frac),
            y: lerp(a.y, b.y, frac),
            zoom: lerp(a.zoom, b.zoom, frac),
        }
    }

    /// Like [`Viewport::interpolate`] but zoom moves geometrically, which keeps
    /// the perceived zoom speed constant across depths.
    pub fn interpolate_log_zoom(a: &Self, b: &Self, frac: f64) -> Self {
        if frac <= 0.0 {
            return *a;
        }
        if frac >= 1.0 {
            return *b;
        }
        Self {
            x: lerp(a.x, b.x, frac),
            y: lerp(a.y, b.y, frac),
            zoom: (lerp(a.zoom.ln(), b.zoom.ln(), frac)).exp(),
        }
    }

    pub fn blend(a: &Self, b: &Self, frac: f64, mode: ZoomInterpolation) -> Self {
        match mode {
            ZoomInterpolation::Linear => Self::interpolate(a, b, frac),
            ZoomInterpolation::Logarithmic => Self::interpolate_log_zoom(a, b, frac),
        }
    }
}

/// Width over height of a drawing surface.
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    if height == 0 {
        return 1.0;
    }
    width as f64 / height as f64
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::{Viewport, ZoomInterpolation, aspect_ratio};

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        let tolerance = 1e-12 * expected.abs().max(1.0);
        assert!(
            diff < tolerance,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    fn assert_view_close(actual: Viewport, expected: Viewport) {
        assert_close(actual.x, expected.x);
        assert_close(actual.y, expected.y);
        assert_close(actual.zoom, expected.zoom);
    }

    fn samples() -> Vec<Viewport> {
        vec![
            Viewport::identity(),
            Viewport::new(-0.8036284402834375, 0.18252764009245603, 0.0017168874184687476),
            Viewport::new(0.28773359691377504, 0.011569467738227467, 0.0010047419752590714),
            Viewport::new(3.5, -2.25, 40.0),
        ]
    }

    #[test]
    fn translate_then_inverse_returns_to_start() {
        for v in samples() {
            for &(dx, dy, aspect) in &[(0.1, -0.2, 1.0), (-0.37, 0.05, 16.0 / 9.0), (0.9, 0.9, 0.5)]
            {
                let moved = v.translate(dx, dy, aspect);
                assert_ne!(moved, v);
                assert_view_close(moved.translate(-dx, -dy, aspect), v);
            }
        }
    }

    #[test]
    fn translate_corrects_horizontal_motion_for_aspect() {
        let v = Viewport::new(0.0, 0.0, 1.0);
        let square = v.translate(0.1, 0.1, 1.0);
        let wide = v.translate(0.1, 0.1, 2.0);
        assert_close(wide.x, square.x * 2.0);
        assert_close(wide.y, square.y);
        assert_eq!(wide.zoom, v.zoom);
    }

    #[test]
    fn zoom_at_keeps_cursor_point_fixed() {
        let cursors = [(0.5, 0.5), (0.1, 0.9), (0.75, 0.2), (0.01, 0.99)];
        let scales = [0.75, 1.25, 0.1];
        for v in samples() {
            for &(fx, fy) in &cursors {
                for &scale in &scales {
                    let aspect = 1.6;
                    let before = v.point_at(fx, fy, aspect);
                    let zoomed = v.zoom_at(fx, fy, scale, aspect);
                    let after = zoomed.point_at(fx, fy, aspect);
                    assert_close(after.0, before.0);
                    assert_close(after.1, before.1);
                    assert_close(zoomed.zoom, v.zoom * scale);
                }
            }
        }
    }

    #[test]
    fn zoom_at_center_keeps_center() {
        let v = Viewport::new(0.0, 0.0, 1.0);
        let zoomed = v.zoom_at(0.5, 0.5, 0.75, 1.3);
        assert_eq!(zoomed.x, 0.0);
        assert_eq!(zoomed.y, 0.0);
        assert_eq!(zoomed.zoom, 0.75);
    }

    #[test]
    fn interpolate_hits_endpoints_exactly() {
        let a = Viewport::identity();
        let b = Viewport::new(-1.195852878464819, -0.31260127931769716, 0.02999999999999997);
        assert_eq!(Viewport::interpolate(&a, &b, 0.0), a);
        assert_eq!(Viewport::interpolate(&a, &b, 1.0), b);
        assert_eq!(Viewport::interpolate_log_zoom(&a, &b, 0.0), a);
        assert_eq!(Viewport::interpolate_log_zoom(&a, &b, 1.0), b);
    }

    #[test]
    fn interpolate_midpoint_is_linear_in_every_field() {
        let a = Viewport::new(0.0, 2.0, 1.0);
        let b = Viewport::new(1.0, 4.0, 0.5);
        let mid = Viewport::interpolate(&a, &b, 0.5);
        assert_close(mid.x, 0.5);
        assert_close(mid.y, 3.0);
        assert_close(mid.zoom, 0.75);
    }

    #[test]
    fn log_zoom_midpoint_is_geometric_mean() {
        let a = Viewport::new(0.0, 0.0, 1.0);
        let b = Viewport::new(0.0, 0.0, 0.01);
        let mid = Viewport::blend(&a, &b, 0.5, ZoomInterpolation::Logarithmic);
        assert_close(mid.zoom, 0.1);
    }

    #[test]
    fn identity_detection_is_exact() {
        assert!(Viewport::identity().is_identity());
        assert!(Viewport::default().is_identity());
        let nudged = Viewport::identity().translate(1e-9, 0.0, 1.0);
        assert!(!nudged.is_identity());
    }

    #[test]
    fn aspect_ratio_handles_degenerate_height() {
        assert_close(aspect_ratio(1920, 1080), 16.0 / 9.0);
        assert_close(aspect_ratio(300, 0), 1.0);
    }
}
