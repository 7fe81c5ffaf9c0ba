use crate::animation::{AnimationRun, AnimationState, OnComplete, RunSample};
use crate::store::{SubscriptionId, ViewportStore};
use crate::viewport::{Viewport, ZoomInterpolation};

type FlightHook = Box<dyn FnMut()>;

/// Owns the viewport and the single animation slot.
///
/// Every viewport write goes through here, either as a direct manipulation
/// (which cancels any flight) or as an animation step.
#[derive(Default)]
pub struct ViewController {
    store: ViewportStore,
    state: AnimationState,
    interpolation: ZoomInterpolation,
    on_flight_start: Option<FlightHook>,
}

impl std::fmt::Debug for ViewController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewController")
            .field("store", &self.store)
            .field("animating", &self.state.is_running())
            .field("interpolation", &self.interpolation)
            .finish()
    }
}

impl ViewController {
    pub fn new(initial: Viewport) -> Self {
        Self {
            store: ViewportStore::new(initial),
            state: AnimationState::Idle,
            interpolation: ZoomInterpolation::default(),
            on_flight_start: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.store.get()
    }

    pub fn is_animating(&self) -> bool {
        self.state.is_running()
    }

    /// Destination of the flight in progress, if any.
    pub fn target(&self) -> Option<Viewport> {
        self.state.target()
    }

    pub fn interpolation(&self) -> ZoomInterpolation {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, mode: ZoomInterpolation) {
        self.interpolation = mode;
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Viewport) + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    /// Install the hook run each time a flight starts, chained flights
    /// included. The tick driver uses it to wake up; `tick` returning
    /// `false` tells it to sleep again.
    pub fn on_flight_start(&mut self, hook: impl FnMut() + 'static) {
        self.on_flight_start = Some(Box::new(hook));
    }

    /// Start flying from the current viewport to `end`.
    ///
    /// A flight already in progress is discarded and its callback never runs.
    pub fn animate_to(&mut self, end: Viewport, now: f64, on_complete: Option<OnComplete>) {
        let start = self.store.get();
        self.state = AnimationState::Running(AnimationRun::new(start, end, now, on_complete));
        if let Some(hook) = self.on_flight_start.as_mut() {
            hook();
        }
    }

    /// Drop the flight in progress without running its callback.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.state.is_running();
        self.state = AnimationState::Idle;
        was_running
    }

    /// Direct manipulation from user input. Cancels any flight first so the
    /// animation cannot fight the pointer.
    pub fn set_direct(&mut self, viewport: Viewport) {
        self.cancel();
        self.store.set(viewport);
    }

    /// Advance the flight to `now`. Returns whether a flight is still active
    /// afterwards (a completion callback may have started a new one).
    pub fn tick(&mut self, now: f64) -> bool {
        let sample = match &self.state {
            AnimationState::Idle => return false,
            AnimationState::Running(run) => run.sample(now, self.interpolation),
        };

        match sample {
            RunSample::InFlight(viewport) => {
                self.store.set(viewport);
                true
            }
            RunSample::Landed(viewport) => {
                let AnimationState::Running(run) = std::mem::take(&mut self.state) else {
                    return false;
                };
                self.store.set(viewport);
                if let Some(on_complete) = run.on_complete {
                    on_complete(self, now);
                }
                self.state.is_running()
            }
        }
    }
}
