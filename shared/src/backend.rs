use std::fmt::Display;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::viewport::Viewport;

pub const RESOLUTION_RANGE: RangeInclusive<f64> = 0.1..=2.0;
pub const ITERATIONS_RANGE: RangeInclusive<u32> = 16..=2000;
pub const DIVERGENCE_RANGE: RangeInclusive<u32> = 2..=64;

const DEFAULT_RESOLUTION: f64 = 0.5;
const DEFAULT_ITERATIONS: u32 = 200;
const DEFAULT_DIVERGENCE: u32 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    Gpu,
    Cpu,
}

impl BackendKind {
    pub fn toggled(self) -> Self {
        match self {
            Self::Gpu => Self::Cpu,
            Self::Cpu => Self::Gpu,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gpu => "gpu",
            Self::Cpu => "cpu",
        }
    }
}

/// Knobs that shape every frame.
///
/// `iterations` and `divergence` are compiled into the GPU pipeline, so
/// changing them while the GPU backend is active rebuilds the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Drawing-buffer pixels per CSS pixel.
    pub resolution: f64,
    /// Escape-time iteration budget.
    pub iterations: u32,
    /// Squared escape radius.
    pub divergence: u32,
    /// Whether the coloring clock advances between frames.
    pub animate: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            iterations: DEFAULT_ITERATIONS,
            divergence: DEFAULT_DIVERGENCE,
            animate: false,
        }
    }
}

impl RenderParams {
    pub fn clamp_resolution(value: f64) -> f64 {
        if !value.is_finite() {
            return DEFAULT_RESOLUTION;
        }
        value.clamp(*RESOLUTION_RANGE.start(), *RESOLUTION_RANGE.end())
    }

    pub fn clamp_iterations(value: u32) -> u32 {
        value.clamp(*ITERATIONS_RANGE.start(), *ITERATIONS_RANGE.end())
    }

    pub fn clamp_divergence(value: u32) -> u32 {
        value.clamp(*DIVERGENCE_RANGE.start(), *DIVERGENCE_RANGE.end())
    }

    /// Copy with every field forced into its valid range. Used on values
    /// loaded from storage.
    pub fn sanitized(self) -> Self {
        Self {
            resolution: Self::clamp_resolution(self.resolution),
            iterations: Self::clamp_iterations(self.iterations),
            divergence: Self::clamp_divergence(self.divergence),
            animate: self.animate,
        }
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub viewport: Viewport,
    pub aspect: f64,
    pub clock: f64,
    pub params: RenderParams,
}

/// Readiness of a backend whose setup may finish after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Ready,
    Pending,
    Failed(String),
}

/// The element frames are drawn into.
pub trait DrawingSurface {
    /// Size the surface is displayed at, in CSS pixels.
    fn display_size(&self) -> (u32, u32);
    /// Size of the drawing buffer, in device pixels.
    fn size(&self) -> (u32, u32);
    fn set_size(&mut self, width: u32, height: u32);
}

/// A renderer that can draw one frame for a viewport.
pub trait RenderBackend {
    fn kind(&self) -> BackendKind;

    fn status(&self) -> BackendStatus {
        BackendStatus::Ready
    }

    /// The drawing buffer changed size. Called after the surface has
    /// been resized.
    fn resize(&mut self, _width: u32, _height: u32) {}

    fn render_frame(&mut self, frame: &FrameInput);
}

/// Creates surfaces and backends for the dispatcher.
pub trait BackendFactory {
    type Surface: DrawingSurface;
    type Error: Display;

    fn create_surface(&mut self) -> Result<Self::Surface, Self::Error>;

    fn create_gpu(
        &mut self,
        surface: &mut Self::Surface,
        params: &RenderParams,
    ) -> Result<Box<dyn RenderBackend>, Self::Error>;

    /// May replace `surface` when the existing one can no longer host a 2D
    /// context.
    fn create_cpu(
        &mut self,
        surface: &mut Self::Surface,
    ) -> Result<Box<dyn RenderBackend>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::{BackendKind, RenderParams};

    #[test]
    fn toggling_twice_is_identity() {
        assert_eq!(BackendKind::Gpu.toggled(), BackendKind::Cpu);
        assert_eq!(BackendKind::Gpu.toggled().toggled(), BackendKind::Gpu);
    }

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let params = RenderParams {
            resolution: 9.0,
            iterations: 3,
            divergence: 1_000,
            animate: true,
        }
        .sanitized();
        assert_eq!(params.resolution, 2.0);
        assert_eq!(params.iterations, 16);
        assert_eq!(params.divergence, 64);
        assert!(params.animate);
        assert_eq!(RenderParams::clamp_resolution(f64::NAN), 0.5);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let params: RenderParams =
            serde_json::from_str(r#"{"iterations": 500}"#).expect("params should parse");
        assert_eq!(params.iterations, 500);
        assert_eq!(params.resolution, RenderParams::default().resolution);
        assert!(!params.animate);
    }
}
