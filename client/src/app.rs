use std::cell::RefCell;
use std::rc::Rc;

use gloo_storage::Storage;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

use mandelscope_shared::{
    ANIMATION_TICK_MS, BackendKind, RenderParams, ViewController, Viewport, ZoomInterpolation,
};

use crate::canvas::FractalCanvas;
use crate::panel::ControlPanel;

const SETTINGS_KEY: &str = "mandelscope_settings";

/// The one view controller, shared by input handlers, the animation timer
/// and the frame loop.
pub(crate) type SharedController = Rc<RefCell<ViewController>>;

/// Newtype wrappers so each setting gets its own context slot.
#[derive(Clone, Copy)]
pub(crate) struct Resolution(pub RwSignal<f64>);
#[derive(Clone, Copy)]
pub(crate) struct Iterations(pub RwSignal<u32>);
#[derive(Clone, Copy)]
pub(crate) struct Divergence(pub RwSignal<u32>);
#[derive(Clone, Copy)]
pub(crate) struct AnimatePalette(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct ActiveBackend(pub RwSignal<BackendKind>);
#[derive(Clone, Copy)]
pub(crate) struct ZoomMode(pub RwSignal<ZoomInterpolation>);
/// Mirror of the controller's viewport for reactive consumers.
#[derive(Clone, Copy)]
pub(crate) struct CurrentView(pub RwSignal<Viewport>);

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    render: RenderParams,
    backend: BackendKind,
    zoom_interpolation: ZoomInterpolation,
}

impl Settings {
    fn load() -> Self {
        gloo_storage::LocalStorage::get::<Settings>(SETTINGS_KEY)
            .map(Settings::sanitized)
            .unwrap_or_default()
    }

    fn sanitized(self) -> Self {
        Self {
            render: self.render.sanitized(),
            ..self
        }
    }
}

/// Milliseconds on the page's monotonic clock.
pub(crate) fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|performance| performance.now())
        .unwrap_or_else(js_sys::Date::now)
}

struct AnimationTimerBinding {
    window: web_sys::Window,
    interval_id: Option<i32>,
    callback: Closure<dyn Fn()>,
}

thread_local! {
    static ANIMATION_TIMER_BINDING: RefCell<Option<AnimationTimerBinding>> = const { RefCell::new(None) };
}

/// Install the camera-flight timer. It stays disarmed until the controller
/// starts a flight and disarms itself once `tick` reports the controller
/// idle, so an idle page gets no wake-ups.
fn install_animation_timer(controller: &SharedController) {
    ANIMATION_TIMER_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take()
            && let Some(interval_id) = old.interval_id
        {
            old.window.clear_interval_with_handle(interval_id);
        }
    });

    let Some(window) = web_sys::window() else {
        return;
    };

    let callback = Closure::<dyn Fn()>::new({
        let controller = controller.clone();
        move || {
            let Ok(mut ctrl) = controller.try_borrow_mut() else {
                return;
            };
            let running = ctrl.tick(now_ms());
            drop(ctrl);
            if !running {
                disarm_animation_timer();
            }
        }
    });
    ANIMATION_TIMER_BINDING.with(|slot| {
        *slot.borrow_mut() = Some(AnimationTimerBinding {
            window,
            interval_id: None,
            callback,
        });
    });

    controller.borrow_mut().on_flight_start(arm_animation_timer);
}

/// Start the 10 ms interval unless it is already running.
fn arm_animation_timer() {
    ANIMATION_TIMER_BINDING.with(|slot| {
        let mut slot = slot.borrow_mut();
        let Some(binding) = slot.as_mut() else {
            return;
        };
        if binding.interval_id.is_some() {
            return;
        }
        match binding
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                binding.callback.as_ref().unchecked_ref(),
                ANIMATION_TICK_MS as i32,
            ) {
            Ok(interval_id) => binding.interval_id = Some(interval_id),
            Err(_) => web_sys::console::warn_1(&"animation timer: setInterval failed".into()),
        }
    });
}

fn disarm_animation_timer() {
    ANIMATION_TIMER_BINDING.with(|slot| {
        if let Some(binding) = slot.borrow_mut().as_mut()
            && let Some(interval_id) = binding.interval_id.take()
        {
            binding.window.clear_interval_with_handle(interval_id);
        }
    });
}

/// Root application component. Provides the settings signals via context.
#[component]
pub fn App() -> impl IntoView {
    let saved = Settings::load();
    let resolution: RwSignal<f64> = RwSignal::new(saved.render.resolution);
    let iterations: RwSignal<u32> = RwSignal::new(saved.render.iterations);
    let divergence: RwSignal<u32> = RwSignal::new(saved.render.divergence);
    let animate: RwSignal<bool> = RwSignal::new(saved.render.animate);
    let backend: RwSignal<BackendKind> = RwSignal::new(saved.backend);
    let zoom_mode: RwSignal<ZoomInterpolation> = RwSignal::new(saved.zoom_interpolation);

    // View state always starts at home; it is never persisted.
    let controller: SharedController = Rc::new(RefCell::new(ViewController::default()));
    let current_view: RwSignal<Viewport> = RwSignal::new(controller.borrow().viewport());
    controller
        .borrow_mut()
        .subscribe(move |viewport| current_view.set(*viewport));

    provide_context(Resolution(resolution));
    provide_context(Iterations(iterations));
    provide_context(Divergence(divergence));
    provide_context(AnimatePalette(animate));
    provide_context(ActiveBackend(backend));
    provide_context(ZoomMode(zoom_mode));
    provide_context(CurrentView(current_view));

    // Persist settings to localStorage on any change
    Effect::new(move || {
        let settings = Settings {
            render: RenderParams {
                resolution: resolution.get(),
                iterations: iterations.get(),
                divergence: divergence.get(),
                animate: animate.get(),
            },
            backend: backend.get(),
            zoom_interpolation: zoom_mode.get(),
        };
        if let Err(e) = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings) {
            web_sys::console::warn_1(&format!("settings: save failed: {e}").into());
        }
    });

    Effect::new({
        let controller = controller.clone();
        move || {
            let mode = zoom_mode.get();
            controller.borrow_mut().set_interpolation(mode);
        }
    });

    Effect::new({
        let controller = controller.clone();
        move || install_animation_timer(&controller)
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden; background: #000;">
            <FractalCanvas controller=controller.clone() />
            <ControlPanel controller=controller />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use mandelscope_shared::{BackendKind, RenderParams, ZoomInterpolation};

    #[test]
    fn empty_storage_gives_defaults() {
        let settings: Settings = serde_json::from_str("{}").expect("settings should parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.backend, BackendKind::Gpu);
        assert_eq!(settings.zoom_interpolation, ZoomInterpolation::Linear);
    }

    #[test]
    fn partial_settings_keep_stored_fields() {
        let settings: Settings = serde_json::from_str(
            r#"{"backend": "Cpu", "render": {"iterations": 750, "animate": true}}"#,
        )
        .expect("settings should parse");
        assert_eq!(settings.backend, BackendKind::Cpu);
        assert_eq!(settings.render.iterations, 750);
        assert!(settings.render.animate);
        assert_eq!(settings.render.resolution, RenderParams::default().resolution);
    }

    #[test]
    fn loaded_settings_are_clamped() {
        let settings: Settings =
            serde_json::from_str(r#"{"render": {"resolution": 40.0, "divergence": 0}}"#)
                .expect("settings should parse");
        let settings = settings.sanitized();
        assert_eq!(settings.render.resolution, 2.0);
        assert_eq!(settings.render.divergence, 2);
    }

    #[test]
    fn settings_survive_storage_format() {
        let settings = Settings {
            render: RenderParams {
                resolution: 1.25,
                iterations: 400,
                divergence: 16,
                animate: true,
            },
            backend: BackendKind::Cpu,
            zoom_interpolation: ZoomInterpolation::Logarithmic,
        };
        let json = serde_json::to_string(&settings).expect("settings should serialize");
        let back: Settings = serde_json::from_str(&json).expect("settings should parse");
        assert_eq!(back, settings);
    }
}
