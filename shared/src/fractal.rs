//! Escape-time Mandelbrot kernel and palette for CPU rendering.
//!
//! The GPU shader mirrors these formulas so switching backends keeps the
//! picture.

use std::f64::consts::TAU;

use crate::backend::FrameInput;

/// How quickly the palette cycles per smoothed iteration.
const PALETTE_DENSITY: f64 = 0.025;
/// How quickly the palette cycles per clock second.
const PALETTE_SPEED: f64 = 0.1;

/// Smoothed iteration count at which `c = cx + i·cy` escapes, or `None` when
/// it stays bounded for `max_iterations`.
///
/// `divergence` is the squared escape radius.
pub fn escape_time(cx: f64, cy: f64, max_iterations: u32, divergence: f64) -> Option<f64> {
    let (mut zx, mut zy) = (0.0f64, 0.0f64);
    for n in 0..max_iterations {
        let zx2 = zx * zx;
        let zy2 = zy * zy;
        let norm = zx2 + zy2;
        if norm > divergence {
            let log_modulus = 0.5 * norm.ln();
            let smooth = n as f64 + 1.0 - log_modulus.max(f64::MIN_POSITIVE).ln() / 2f64.ln();
            return Some(smooth.max(0.0));
        }
        zy = 2.0 * zx * zy + cy;
        zx = zx2 - zy2 + cx;
    }
    None
}

/// Palette color for a smoothed iteration count at a clock value.
pub fn shade(smooth: Option<f64>, clock: f64) -> [u8; 3] {
    let Some(mu) = smooth else {
        return [0, 0, 0];
    };
    let t = mu * PALETTE_DENSITY + clock * PALETTE_SPEED;
    let channel = |phase: f64| {
        let value = 0.5 + 0.5 * (TAU * (t + phase)).cos();
        (value.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    [channel(0.0), channel(0.1), channel(0.2)]
}

/// Fill `out` with `width × height` RGBA pixels for `frame`.
pub fn render_rgba(frame: &FrameInput, width: u32, height: u32, out: &mut Vec<u8>) {
    let len = width as usize * height as usize * 4;
    out.clear();
    out.resize(len, 255);
    if width == 0 || height == 0 {
        return;
    }

    let divergence = frame.params.divergence as f64;
    let inv_w = 1.0 / width as f64;
    let inv_h = 1.0 / height as f64;
    for (py, row) in out.chunks_exact_mut(width as usize * 4).enumerate() {
        let fy = (py as f64 + 0.5) * inv_h;
        for (px, pixel) in row.chunks_exact_mut(4).enumerate() {
            let fx = (px as f64 + 0.5) * inv_w;
            let (cx, cy) = frame.viewport.point_at(fx, fy, frame.aspect);
            let [r, g, b] = shade(
                escape_time(cx, cy, frame.params.iterations, divergence),
                frame.clock,
            );
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{escape_time, render_rgba, shade};
    use crate::backend::{FrameInput, RenderParams};
    use crate::viewport::Viewport;

    fn frame(viewport: Viewport, clock: f64) -> FrameInput {
        FrameInput {
            viewport,
            aspect: 1.0,
            clock,
            params: RenderParams::default(),
        }
    }

    #[test]
    fn points_in_the_set_never_escape() {
        assert_eq!(escape_time(0.0, 0.0, 500, 4.0), None);
        assert_eq!(escape_time(-1.0, 0.0, 500, 4.0), None);
        assert_eq!(escape_time(-0.1, 0.1, 500, 4.0), None);
    }

    #[test]
    fn points_outside_escape_early() {
        let far = escape_time(2.0, 2.0, 500, 4.0).expect("far point escapes");
        assert!(far < 3.0);
        // Just outside the period-two neck and the cusp: slow escapes.
        for (cx, cy) in [(-0.75, 0.1), (0.26, 0.0)] {
            let near = escape_time(cx, cy, 500, 4.0).expect("point near the boundary escapes");
            assert!(near > 10.0, "({cx}, {cy}) escaped after {near}");
            assert!(near > far);
        }
    }

    #[test]
    fn bounded_points_are_black() {
        assert_eq!(shade(None, 12.0), [0, 0, 0]);
        assert_ne!(shade(Some(4.0), 0.0), [0, 0, 0]);
    }

    #[test]
    fn palette_shifts_with_the_clock() {
        assert_ne!(shade(Some(10.0), 0.0), shade(Some(10.0), 2.5));
        assert_eq!(shade(Some(10.0), 0.0), shade(Some(10.0), 10.0));
    }

    #[test]
    fn render_fills_every_pixel_opaque() {
        let mut out = Vec::new();
        render_rgba(&frame(Viewport::identity(), 0.0), 16, 9, &mut out);
        assert_eq!(out.len(), 16 * 9 * 4);
        assert!(out.chunks_exact(4).all(|px| px[3] == 255));
        // The home view straddles the set, so it holds both black and color.
        assert!(out.chunks_exact(4).any(|px| px[..3] == [0, 0, 0]));
        assert!(out.chunks_exact(4).any(|px| px[..3] != [0, 0, 0]));
    }

    #[test]
    fn render_reuses_buffer_across_sizes() {
        let mut out = vec![7; 3];
        render_rgba(&frame(Viewport::identity(), 0.0), 4, 4, &mut out);
        assert_eq!(out.len(), 64);
        render_rgba(&frame(Viewport::identity(), 0.0), 0, 4, &mut out);
        assert!(out.is_empty());
    }
}
