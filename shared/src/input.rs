//! Turns raw pointer, wheel and button input into viewport changes.
//!
//! Every handler works in normalized screen coordinates (fractions of the
//! interactive area) so the behavior does not depend on pixel resolution.
//! Degenerate input is dropped or clamped here so the viewport math never
//! sees it.

use crate::controller::ViewController;
use crate::viewport::Viewport;

/// Zoom factor applied per wheel notch toward the user.
pub const WHEEL_ZOOM_IN: f64 = 0.75;
/// Zoom factor applied per wheel notch away from the user.
pub const WHEEL_ZOOM_OUT: f64 = 1.25;
/// Zoom factor for a double click, a much deeper single jump.
pub const DOUBLE_CLICK_ZOOM: f64 = 0.1;

/// Size of the interactive area at the moment an event arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMetrics {
    /// CSS pixel width used to normalize pointer positions.
    pub width: f64,
    /// CSS pixel height used to normalize pointer positions.
    pub height: f64,
    /// Width over height of the drawing surface, read live.
    pub aspect: f64,
}

impl SurfaceMetrics {
    pub fn is_usable(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
            && self.aspect.is_finite()
            && self.aspect > 0.0
    }

    /// Cursor position as fractions of the area, clamped to `[0, 1]`.
    pub fn cursor_fraction(&self, client_x: f64, client_y: f64) -> Option<(f64, f64)> {
        if !self.is_usable() || !client_x.is_finite() || !client_y.is_finite() {
            return None;
        }
        Some((
            (client_x / self.width).clamp(0.0, 1.0),
            (client_y / self.height).clamp(0.0, 1.0),
        ))
    }
}

/// Pointer moved with a button held: pan 1:1 with the pointer, no easing.
pub fn drag(ctrl: &mut ViewController, movement_x: f64, movement_y: f64, surface: SurfaceMetrics) {
    if !surface.is_usable() || !movement_x.is_finite() || !movement_y.is_finite() {
        return;
    }
    if movement_x == 0.0 && movement_y == 0.0 {
        return;
    }
    // Content follows the pointer, so the center moves the other way.
    let dx = (-movement_x / surface.width).clamp(-1.0, 1.0);
    let dy = (-movement_y / surface.height).clamp(-1.0, 1.0);
    let moved = ctrl.viewport().translate(dx, dy, surface.aspect);
    ctrl.set_direct(moved);
}

/// Wheel notch at a cursor position. Positive `wheel_delta` zooms in.
pub fn wheel(
    ctrl: &mut ViewController,
    wheel_delta: f64,
    client_x: f64,
    client_y: f64,
    surface: SurfaceMetrics,
    now: f64,
) {
    if !wheel_delta.is_finite() || wheel_delta == 0.0 {
        return;
    }
    let scale = if wheel_delta > 0.0 {
        WHEEL_ZOOM_IN
    } else {
        WHEEL_ZOOM_OUT
    };
    zoom_toward(ctrl, client_x, client_y, scale, surface, now);
}

pub fn double_click(
    ctrl: &mut ViewController,
    client_x: f64,
    client_y: f64,
    surface: SurfaceMetrics,
    now: f64,
) {
    zoom_toward(ctrl, client_x, client_y, DOUBLE_CLICK_ZOOM, surface, now);
}

fn zoom_toward(
    ctrl: &mut ViewController,
    client_x: f64,
    client_y: f64,
    scale: f64,
    surface: SurfaceMetrics,
    now: f64,
) {
    let Some((fx, fy)) = surface.cursor_fraction(client_x, client_y) else {
        return;
    };
    let target = ctrl.viewport().zoom_at(fx, fy, scale, surface.aspect);
    ctrl.animate_to(target, now, None);
}

/// Fly to a bookmark. Unless already home, the flight detours through the
/// home view first.
pub fn go_to_bookmark(ctrl: &mut ViewController, target: Viewport, now: f64) {
    if ctrl.viewport().is_identity() {
        ctrl.animate_to(target, now, None);
        return;
    }
    ctrl.animate_to(
        Viewport::identity(),
        now,
        Some(Box::new(move |ctrl, now| ctrl.animate_to(target, now, None))),
    );
}

pub fn reset(ctrl: &mut ViewController, now: f64) {
    ctrl.animate_to(Viewport::identity(), now, None);
}
