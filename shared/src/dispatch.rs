use crate::backend::{
    BackendFactory, BackendKind, BackendStatus, DrawingSurface, FrameInput, RenderBackend,
    RenderParams,
};
use crate::viewport::{Viewport, aspect_ratio};

/// The coloring clock wraps after this many seconds.
pub const CLOCK_PERIOD_SECS: f64 = 1000.0;

/// Drawing-buffer size for a display size at a resolution scale.
pub fn surface_size(display_width: u32, display_height: u32, resolution: f64) -> (u32, u32) {
    let scale = RenderParams::clamp_resolution(resolution);
    let width = (display_width as f64 * scale).floor().max(1.0) as u32;
    let height = (display_height as f64 * scale).floor().max(1.0) as u32;
    (width, height)
}

/// Time value handed to backends for time-varying coloring.
///
/// Follows wall-clock seconds modulo [`CLOCK_PERIOD_SECS`] while animation is
/// on and holds its last value while it is off.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationClock {
    value: f64,
}

impl AnimationClock {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn advance(&mut self, now_ms: f64, animate: bool) {
        if animate && now_ms.is_finite() {
            self.value = (now_ms / 1000.0).rem_euclid(CLOCK_PERIOD_SECS);
        }
    }
}

/// Things the dispatcher did that the host should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// GPU setup failed; the session now runs on the CPU backend.
    FellBack { cause: String },
    /// No surface could be created; frames are skipped until the next rebuild.
    SurfaceUnavailable { cause: String },
    /// No backend could be attached to the surface.
    BackendUnavailable { kind: BackendKind, cause: String },
    Resized { width: u32, height: u32 },
}

/// Owns the one drawing surface and the one active backend.
///
/// Backend kinds are only ever named here and in the factory; everything
/// else talks to the [`RenderBackend`] trait.
pub struct Dispatcher<F: BackendFactory> {
    factory: F,
    // Field order matters: the backend is dropped before its surface.
    backend: Option<Box<dyn RenderBackend>>,
    surface: Option<F::Surface>,
    kind: BackendKind,
    params: RenderParams,
    clock: AnimationClock,
}

impl<F: BackendFactory> Dispatcher<F> {
    /// Create the dispatcher and its first session.
    pub fn new(factory: F, kind: BackendKind, params: RenderParams) -> (Self, Vec<DispatchEvent>) {
        let mut dispatcher = Self {
            factory,
            backend: None,
            surface: None,
            kind,
            params: params.sanitized(),
            clock: AnimationClock::default(),
        };
        let events = dispatcher.rebuild();
        (dispatcher, events)
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn params(&self) -> RenderParams {
        self.params
    }

    pub fn clock(&self) -> f64 {
        self.clock.value()
    }

    pub fn surface(&self) -> Option<&F::Surface> {
        self.surface.as_ref()
    }

    pub fn backend_status(&self) -> Option<BackendStatus> {
        self.backend.as_ref().map(|backend| backend.status())
    }

    /// Width over height of the live drawing buffer.
    pub fn aspect_ratio(&self) -> f64 {
        self.surface
            .as_ref()
            .map(|surface| {
                let (width, height) = surface.size();
                aspect_ratio(width, height)
            })
            .unwrap_or(1.0)
    }

    /// Whether the host should keep requesting frames without new input.
    pub fn wants_next_frame(&self) -> bool {
        self.params.animate || matches!(self.backend_status(), Some(BackendStatus::Pending))
    }

    /// Tear the session down and build a new one on a fresh surface.
    pub fn rebuild(&mut self) -> Vec<DispatchEvent> {
        let mut events = Vec::new();
        self.backend = None;
        self.surface = None;

        match self.factory.create_surface() {
            Ok(surface) => self.surface = Some(surface),
            Err(e) => {
                events.push(DispatchEvent::SurfaceUnavailable {
                    cause: e.to_string(),
                });
                return events;
            }
        }

        self.attach_backend(&mut events);
        events
    }

    pub fn switch_backend(&mut self, kind: BackendKind) -> Vec<DispatchEvent> {
        if kind == self.kind && self.backend.is_some() {
            return Vec::new();
        }
        self.kind = kind;
        self.rebuild()
    }

    pub fn toggle_backend(&mut self) -> Vec<DispatchEvent> {
        self.switch_backend(self.kind.toggled())
    }

    pub fn set_iterations(&mut self, iterations: u32) -> Vec<DispatchEvent> {
        let iterations = RenderParams::clamp_iterations(iterations);
        if iterations == self.params.iterations {
            return Vec::new();
        }
        self.params.iterations = iterations;
        self.rebuild_if_gpu()
    }

    pub fn set_divergence(&mut self, divergence: u32) -> Vec<DispatchEvent> {
        let divergence = RenderParams::clamp_divergence(divergence);
        if divergence == self.params.divergence {
            return Vec::new();
        }
        self.params.divergence = divergence;
        self.rebuild_if_gpu()
    }

    /// Takes effect on the next frame; never rebuilds.
    pub fn set_resolution(&mut self, resolution: f64) {
        self.params.resolution = RenderParams::clamp_resolution(resolution);
    }

    pub fn set_animate(&mut self, animate: bool) {
        self.params.animate = animate;
    }

    /// Draw one frame of `viewport`. Called once per display refresh.
    pub fn frame(&mut self, viewport: Viewport, now_ms: f64) -> Vec<DispatchEvent> {
        let mut events = Vec::new();

        if let Some(BackendStatus::Failed(cause)) = self.backend_status() {
            self.fall_back(cause, &mut events);
        }

        let Some(surface) = self.surface.as_mut() else {
            return events;
        };

        let (display_width, display_height) = surface.display_size();
        if display_width == 0 || display_height == 0 {
            return events;
        }

        let (width, height) = surface_size(display_width, display_height, self.params.resolution);
        if surface.size() != (width, height) {
            // Resizing discards backend resources, so only do it on change.
            surface.set_size(width, height);
            if let Some(backend) = self.backend.as_mut() {
                backend.resize(width, height);
            }
            events.push(DispatchEvent::Resized { width, height });
        }

        if let Some(backend) = self.backend.as_mut()
            && backend.status() == BackendStatus::Ready
        {
            backend.render_frame(&FrameInput {
                viewport,
                aspect: aspect_ratio(width, height),
                clock: self.clock.value(),
                params: self.params,
            });
        }

        self.clock.advance(now_ms, self.params.animate);
        events
    }

    fn rebuild_if_gpu(&mut self) -> Vec<DispatchEvent> {
        match self.kind {
            BackendKind::Gpu => self.rebuild(),
            BackendKind::Cpu => Vec::new(),
        }
    }

    fn attach_backend(&mut self, events: &mut Vec<DispatchEvent>) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let created = match self.kind {
            BackendKind::Gpu => self.factory.create_gpu(surface, &self.params),
            BackendKind::Cpu => self.factory.create_cpu(surface),
        };
        match created {
            Ok(backend) => self.backend = Some(backend),
            Err(e) => match self.kind {
                BackendKind::Gpu => self.fall_back(e.to_string(), events),
                BackendKind::Cpu => events.push(DispatchEvent::BackendUnavailable {
                    kind: BackendKind::Cpu,
                    cause: e.to_string(),
                }),
            },
        }
    }

    /// Drop the GPU backend and continue on the CPU backend, same surface.
    fn fall_back(&mut self, cause: String, events: &mut Vec<DispatchEvent>) {
        self.backend = None;
        self.kind = BackendKind::Cpu;
        events.push(DispatchEvent::FellBack { cause });
        self.attach_backend(events);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{AnimationClock, DispatchEvent, Dispatcher, surface_size};
    use crate::backend::{
        BackendFactory, BackendKind, BackendStatus, DrawingSurface, FrameInput, RenderBackend,
        RenderParams,
    };
    use crate::viewport::Viewport;

    #[derive(Debug, Default)]
    struct Journal {
        surfaces_created: usize,
        gpu_attempts: usize,
        cpu_created: usize,
        resizes: Vec<(u32, u32)>,
        frames: Vec<(BackendKind, FrameInput)>,
    }

    struct MockSurface {
        id: usize,
        display: Rc<RefCell<(u32, u32)>>,
        size: (u32, u32),
    }

    impl DrawingSurface for MockSurface {
        fn display_size(&self) -> (u32, u32) {
            *self.display.borrow()
        }

        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn set_size(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }
    }

    struct MockBackend {
        kind: BackendKind,
        status: Rc<RefCell<BackendStatus>>,
        journal: Rc<RefCell<Journal>>,
    }

    impl RenderBackend for MockBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn status(&self) -> BackendStatus {
            self.status.borrow().clone()
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.journal.borrow_mut().resizes.push((width, height));
        }

        fn render_frame(&mut self, frame: &FrameInput) {
            self.journal.borrow_mut().frames.push((self.kind, *frame));
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum GpuBehavior {
        Works,
        FailsImmediately,
        StaysPending,
    }

    struct MockFactory {
        journal: Rc<RefCell<Journal>>,
        display: Rc<RefCell<(u32, u32)>>,
        gpu: GpuBehavior,
        gpu_status: Rc<RefCell<BackendStatus>>,
    }

    impl MockFactory {
        fn new(gpu: GpuBehavior) -> Self {
            let status = match gpu {
                GpuBehavior::StaysPending => BackendStatus::Pending,
                _ => BackendStatus::Ready,
            };
            Self {
                journal: Rc::default(),
                display: Rc::new(RefCell::new((800, 600))),
                gpu,
                gpu_status: Rc::new(RefCell::new(status)),
            }
        }
    }

    impl BackendFactory for MockFactory {
        type Surface = MockSurface;
        type Error = String;

        fn create_surface(&mut self) -> Result<MockSurface, String> {
            let mut journal = self.journal.borrow_mut();
            journal.surfaces_created += 1;
            Ok(MockSurface {
                id: journal.surfaces_created,
                display: self.display.clone(),
                size: (300, 150),
            })
        }

        fn create_gpu(
            &mut self,
            _surface: &mut MockSurface,
            _params: &RenderParams,
        ) -> Result<Box<dyn RenderBackend>, String> {
            self.journal.borrow_mut().gpu_attempts += 1;
            if self.gpu == GpuBehavior::FailsImmediately {
                return Err("webgl2 context unavailable".to_string());
            }
            Ok(Box::new(MockBackend {
                kind: BackendKind::Gpu,
                status: self.gpu_status.clone(),
                journal: self.journal.clone(),
            }))
        }

        fn create_cpu(&mut self, _surface: &mut MockSurface) -> Result<Box<dyn RenderBackend>, String> {
            self.journal.borrow_mut().cpu_created += 1;
            Ok(Box::new(MockBackend {
                kind: BackendKind::Cpu,
                status: Rc::new(RefCell::new(BackendStatus::Ready)),
                journal: self.journal.clone(),
            }))
        }
    }

    fn dispatcher(gpu: GpuBehavior, kind: BackendKind) -> (Dispatcher<MockFactory>, Rc<RefCell<Journal>>) {
        let factory = MockFactory::new(gpu);
        let journal = factory.journal.clone();
        let (dispatcher, _) = Dispatcher::new(factory, kind, RenderParams::default());
        (dispatcher, journal)
    }

    #[test]
    fn surface_size_floors_scaled_display() {
        assert_eq!(surface_size(1001, 777, 0.5), (500, 388));
        assert_eq!(surface_size(1, 1, 0.1), (1, 1));
        assert_eq!(surface_size(640, 480, 1.0), (640, 480));
    }

    #[test]
    fn clock_advances_only_while_animating_and_wraps() {
        let mut clock = AnimationClock::default();
        clock.advance(5_000.0, false);
        assert_eq!(clock.value(), 0.0);
        clock.advance(1_002_500.0, true);
        assert!((clock.value() - 2.5).abs() < 1e-9);
        clock.advance(9_000.0, false);
        assert!((clock.value() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn gpu_failure_falls_back_to_cpu_without_error() {
        let factory = MockFactory::new(GpuBehavior::FailsImmediately);
        let journal = factory.journal.clone();
        let (mut dispatcher, events) = Dispatcher::new(factory, BackendKind::Gpu, RenderParams::default());

        assert_eq!(
            events,
            vec![DispatchEvent::FellBack {
                cause: "webgl2 context unavailable".to_string()
            }]
        );
        assert_eq!(dispatcher.kind(), BackendKind::Cpu);
        assert_eq!(journal.borrow().cpu_created, 1);
        // Fallback stays on the surface the GPU attempt used.
        assert_eq!(journal.borrow().surfaces_created, 1);

        dispatcher.frame(Viewport::identity(), 0.0);
        assert_eq!(journal.borrow().frames.len(), 1);
        assert_eq!(journal.borrow().frames[0].0, BackendKind::Cpu);
    }

    #[test]
    fn toggle_after_forced_fallback_retries_gpu() {
        let (mut dispatcher, journal) = dispatcher(GpuBehavior::FailsImmediately, BackendKind::Gpu);
        assert_eq!(dispatcher.kind(), BackendKind::Cpu);

        dispatcher.toggle_backend();
        assert_eq!(journal.borrow().gpu_attempts, 2);
        assert_eq!(dispatcher.kind(), BackendKind::Cpu);
        assert_eq!(journal.borrow().surfaces_created, 2);
    }

    #[test]
    fn late_gpu_failure_falls_back_on_next_frame() {
        let factory = MockFactory::new(GpuBehavior::StaysPending);
        let journal = factory.journal.clone();
        let status = factory.gpu_status.clone();
        let (mut dispatcher, events) = Dispatcher::new(factory, BackendKind::Gpu, RenderParams::default());
        assert!(events.is_empty());
        assert!(dispatcher.wants_next_frame());

        dispatcher.frame(Viewport::identity(), 0.0);
        assert!(journal.borrow().frames.is_empty());

        *status.borrow_mut() = BackendStatus::Failed("no adapter".to_string());
        let events = dispatcher.frame(Viewport::identity(), 16.0);
        assert!(events.contains(&DispatchEvent::FellBack {
            cause: "no adapter".to_string()
        }));
        assert_eq!(dispatcher.kind(), BackendKind::Cpu);
        assert_eq!(journal.borrow().frames.len(), 1);
        assert!(!dispatcher.wants_next_frame());
    }

    #[test]
    fn switching_backend_replaces_the_surface() {
        let (mut dispatcher, journal) = dispatcher(GpuBehavior::Works, BackendKind::Gpu);
        let first_id = dispatcher.surface().map(|s| s.id);

        assert!(dispatcher.switch_backend(BackendKind::Cpu).is_empty());
        assert_eq!(dispatcher.kind(), BackendKind::Cpu);
        assert_ne!(dispatcher.surface().map(|s| s.id), first_id);

        // Asking for the active kind again is a no-op.
        assert!(dispatcher.switch_backend(BackendKind::Cpu).is_empty());
        assert_eq!(journal.borrow().surfaces_created, 2);
    }

    #[test]
    fn gpu_only_params_rebuild_only_on_gpu() {
        let (mut dispatcher, journal) = dispatcher(GpuBehavior::Works, BackendKind::Gpu);
        dispatcher.set_iterations(500);
        dispatcher.set_divergence(8);
        assert_eq!(journal.borrow().gpu_attempts, 3);
        // Same value again is not a change.
        dispatcher.set_iterations(500);
        assert_eq!(journal.borrow().gpu_attempts, 3);

        dispatcher.switch_backend(BackendKind::Cpu);
        let surfaces = journal.borrow().surfaces_created;
        dispatcher.set_iterations(1_000);
        dispatcher.set_divergence(16);
        assert_eq!(journal.borrow().surfaces_created, surfaces);
        assert_eq!(dispatcher.params().iterations, 1_000);
        assert_eq!(dispatcher.params().divergence, 16);

        dispatcher.switch_backend(BackendKind::Gpu);
        assert_eq!(journal.borrow().gpu_attempts, 4);
    }

    #[test]
    fn resizes_only_when_target_size_changes() {
        let factory = MockFactory::new(GpuBehavior::Works);
        let journal = factory.journal.clone();
        let display = factory.display.clone();
        let (mut dispatcher, _) = Dispatcher::new(factory, BackendKind::Gpu, RenderParams::default());

        let events = dispatcher.frame(Viewport::identity(), 0.0);
        assert_eq!(
            events,
            vec![DispatchEvent::Resized {
                width: 400,
                height: 300
            }]
        );
        assert!(dispatcher.frame(Viewport::identity(), 16.0).is_empty());
        assert_eq!(journal.borrow().resizes, vec![(400, 300)]);

        *display.borrow_mut() = (1000, 300);
        dispatcher.frame(Viewport::identity(), 32.0);
        dispatcher.set_resolution(1.0);
        dispatcher.frame(Viewport::identity(), 48.0);
        assert_eq!(journal.borrow().resizes, vec![(400, 300), (500, 150), (1000, 300)]);

        let journal = journal.borrow();
        let last = journal.frames[journal.frames.len() - 1].1;
        assert!((last.aspect - 1000.0 / 300.0).abs() < 1e-12);
        assert!((dispatcher.aspect_ratio() - 1000.0 / 300.0).abs() < 1e-12);
    }

    #[test]
    fn frames_carry_viewport_and_frozen_clock() {
        let (mut dispatcher, journal) = dispatcher(GpuBehavior::Works, BackendKind::Gpu);
        let target = Viewport::new(0.1, 0.2, 0.3);
        dispatcher.frame(target, 4_000.0);
        dispatcher.set_animate(true);
        dispatcher.frame(target, 5_000.0);
        dispatcher.frame(target, 6_000.0);

        let journal = journal.borrow();
        let clocks: Vec<f64> = journal.frames.iter().map(|(_, f)| f.clock).collect();
        assert_eq!(clocks, vec![0.0, 0.0, 5.0]);
        assert!(journal.frames.iter().all(|(_, f)| f.viewport == target));
    }
}
