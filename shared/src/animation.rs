use crate::controller::ViewController;
use crate::easing::ease_in_out_cubic;
use crate::viewport::{Viewport, ZoomInterpolation};

/// Length of every camera flight, in milliseconds.
pub const ANIMATION_DURATION_MS: f64 = 500.0;
/// Interval between animation steps, in milliseconds. Independent of the
/// display refresh rate.
pub const ANIMATION_TICK_MS: u32 = 10;

/// Runs once when a flight lands. It receives the controller so it can chain
/// another flight.
pub type OnComplete = Box<dyn FnOnce(&mut ViewController, f64)>;

/// One in-flight transition between two viewports.
pub struct AnimationRun {
    pub start: Viewport,
    pub end: Viewport,
    pub start_time: f64,
    pub duration: f64,
    pub(crate) on_complete: Option<OnComplete>,
}

impl std::fmt::Debug for AnimationRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationRun")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("start_time", &self.start_time)
            .field("duration", &self.duration)
            .field("has_on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Where a run stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunSample {
    InFlight(Viewport),
    Landed(Viewport),
}

impl AnimationRun {
    pub fn new(
        start: Viewport,
        end: Viewport,
        start_time: f64,
        on_complete: Option<OnComplete>,
    ) -> Self {
        Self {
            start,
            end,
            start_time,
            duration: ANIMATION_DURATION_MS,
            on_complete,
        }
    }

    pub fn sample(&self, now: f64, mode: ZoomInterpolation) -> RunSample {
        let elapsed = (now - self.start_time).clamp(0.0, self.duration);
        if elapsed >= self.duration {
            return RunSample::Landed(self.end);
        }
        let frac = ease_in_out_cubic(elapsed, self.duration);
        RunSample::InFlight(Viewport::blend(&self.start, &self.end, frac, mode))
    }
}

/// At most one run exists at a time.
#[derive(Debug, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Running(AnimationRun),
}

impl AnimationState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    pub fn target(&self) -> Option<Viewport> {
        match self {
            Self::Idle => None,
            Self::Running(run) => Some(run.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ANIMATION_DURATION_MS, AnimationRun, RunSample};
    use crate::viewport::{Viewport, ZoomInterpolation};

    #[test]
    fn sample_before_start_is_the_start_view() {
        let start = Viewport::identity();
        let end = Viewport::new(0.25, 0.0, 0.5);
        let run = AnimationRun::new(start, end, 1_000.0, None);
        assert_eq!(
            run.sample(900.0, ZoomInterpolation::Linear),
            RunSample::InFlight(start)
        );
    }

    #[test]
    fn sample_at_half_duration_is_the_midpoint() {
        let start = Viewport::new(0.0, 0.0, 1.0);
        let end = Viewport::new(1.0, -1.0, 0.5);
        let run = AnimationRun::new(start, end, 0.0, None);
        let RunSample::InFlight(mid) = run.sample(ANIMATION_DURATION_MS / 2.0, ZoomInterpolation::Linear)
        else {
            panic!("run should still be in flight at half time");
        };
        assert!((mid.x - 0.5).abs() < 1e-12);
        assert!((mid.y + 0.5).abs() < 1e-12);
        assert!((mid.zoom - 0.75).abs() < 1e-12);
    }

    #[test]
    fn sample_after_duration_lands_exactly() {
        let end = Viewport::new(-0.8036284402834375, 0.18252764009245603, 0.0017168874184687476);
        let run = AnimationRun::new(Viewport::identity(), end, 0.0, None);
        assert_eq!(
            run.sample(ANIMATION_DURATION_MS, ZoomInterpolation::Logarithmic),
            RunSample::Landed(end)
        );
        assert_eq!(
            run.sample(ANIMATION_DURATION_MS * 4.0, ZoomInterpolation::Linear),
            RunSample::Landed(end)
        );
    }
}
