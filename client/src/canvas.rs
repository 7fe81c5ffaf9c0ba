use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{HtmlElement, MouseEvent, PointerEvent, WheelEvent};

use mandelscope_shared::input::{self, SurfaceMetrics};
use mandelscope_shared::viewport::aspect_ratio;
use mandelscope_shared::{BackendKind, DispatchEvent, Dispatcher, RenderParams};

use crate::app::{
    ActiveBackend, AnimatePalette, CurrentView, Divergence, Iterations, Resolution,
    SharedController, now_ms,
};
use crate::backend::WebBackendFactory;
use crate::render_loop::{FrameScheduler, FrameStats};

type SharedDispatcher = Rc<RefCell<Option<Dispatcher<WebBackendFactory>>>>;

struct ResizeBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

/// Run `f` against the dispatcher if it exists and is not already in use.
fn with_dispatcher<R>(
    dispatcher: &SharedDispatcher,
    f: impl FnOnce(&mut Dispatcher<WebBackendFactory>) -> R,
) -> Option<R> {
    let mut slot = dispatcher.try_borrow_mut().ok()?;
    slot.as_mut().map(f)
}

/// Log dispatcher events and mirror a forced backend change into the
/// persisted setting.
fn report(events: &[DispatchEvent], kind: BackendKind, backend: RwSignal<BackendKind>) {
    for event in events {
        match event {
            DispatchEvent::FellBack { cause } => web_sys::console::warn_1(
                &format!("GPU backend unavailable, using Canvas 2D: {cause}").into(),
            ),
            DispatchEvent::SurfaceUnavailable { cause } => {
                web_sys::console::warn_1(&format!("drawing surface unavailable: {cause}").into())
            }
            DispatchEvent::BackendUnavailable { kind, cause } => web_sys::console::warn_1(
                &format!("{} backend unavailable: {cause}", kind.label()).into(),
            ),
            DispatchEvent::Resized { .. } => {}
        }
    }
    if backend.get_untracked() != kind {
        backend.set(kind);
    }
}

fn surface_metrics(container: &HtmlElement, dispatcher: &SharedDispatcher) -> SurfaceMetrics {
    let width = container.client_width().max(0) as u32;
    let height = container.client_height().max(0) as u32;
    let aspect = with_dispatcher(dispatcher, |d| d.aspect_ratio())
        .unwrap_or_else(|| aspect_ratio(width, height));
    SurfaceMetrics {
        width: width as f64,
        height: height as f64,
        aspect,
    }
}

/// Pointer position relative to the container's top-left corner.
fn local_position(container: &HtmlElement, e: &MouseEvent) -> (f64, f64) {
    let rect = container.get_bounding_client_rect();
    (
        e.client_x() as f64 - rect.left(),
        e.client_y() as f64 - rect.top(),
    )
}

#[component]
pub fn FractalCanvas(controller: SharedController) -> impl IntoView {
    let Resolution(resolution) = expect_context();
    let Iterations(iterations) = expect_context();
    let Divergence(divergence) = expect_context();
    let AnimatePalette(animate) = expect_context();
    let ActiveBackend(backend) = expect_context();
    let CurrentView(current_view) = expect_context();

    let container_ref = NodeRef::<leptos::html::Div>::new();
    let dispatcher: SharedDispatcher = Rc::new(RefCell::new(None));

    let scheduler = Rc::new(FrameScheduler::new({
        let dispatcher = dispatcher.clone();
        let controller = controller.clone();
        let stats = RefCell::new(FrameStats::default());
        move || {
            let mut slot = dispatcher.borrow_mut();
            let Some(dispatcher) = slot.as_mut() else {
                return false;
            };
            let now = now_ms();
            let viewport = controller.borrow().viewport();
            let events = dispatcher.frame(viewport, now);
            report(&events, dispatcher.kind(), backend);

            if let Some(fps) = stats.borrow_mut().record(now) {
                web_sys::console::log_1(
                    &format!("fps: {fps:.1} ({})", dispatcher.kind().label()).into(),
                );
            }

            dispatcher.wants_next_frame() || controller.borrow().is_animating()
        }
    }));

    // Build the first session once the container is in the DOM
    Effect::new({
        let dispatcher = dispatcher.clone();
        let scheduler = scheduler.clone();
        move || {
            let Some(container_el) = container_ref.get() else {
                return;
            };
            if dispatcher.borrow().is_some() {
                return;
            }
            let container: &HtmlElement = &container_el;
            let params = RenderParams {
                resolution: resolution.get_untracked(),
                iterations: iterations.get_untracked(),
                divergence: divergence.get_untracked(),
                animate: animate.get_untracked(),
            };
            let (session, events) = Dispatcher::new(
                WebBackendFactory::new(container.clone()),
                backend.get_untracked(),
                params,
            );
            report(&events, session.kind(), backend);
            *dispatcher.borrow_mut() = Some(session);
            scheduler.mark_dirty();
        }
    });

    Effect::new({
        let dispatcher = dispatcher.clone();
        let scheduler = scheduler.clone();
        move || {
            let value = resolution.get();
            with_dispatcher(&dispatcher, |d| d.set_resolution(value));
            scheduler.mark_dirty();
        }
    });

    Effect::new({
        let dispatcher = dispatcher.clone();
        let scheduler = scheduler.clone();
        move || {
            let value = animate.get();
            with_dispatcher(&dispatcher, |d| d.set_animate(value));
            scheduler.mark_dirty();
        }
    });

    // Iterations and divergence are compiled into the GPU pipeline
    Effect::new({
        let dispatcher = dispatcher.clone();
        let scheduler = scheduler.clone();
        move || {
            let value = iterations.get();
            if let Some((events, kind)) =
                with_dispatcher(&dispatcher, |d| (d.set_iterations(value), d.kind()))
            {
                report(&events, kind, backend);
            }
            scheduler.mark_dirty();
        }
    });

    Effect::new({
        let dispatcher = dispatcher.clone();
        let scheduler = scheduler.clone();
        move || {
            let value = divergence.get();
            if let Some((events, kind)) =
                with_dispatcher(&dispatcher, |d| (d.set_divergence(value), d.kind()))
            {
                report(&events, kind, backend);
            }
            scheduler.mark_dirty();
        }
    });

    Effect::new({
        let dispatcher = dispatcher.clone();
        let scheduler = scheduler.clone();
        move || {
            let requested = backend.get();
            if let Some((events, kind)) =
                with_dispatcher(&dispatcher, |d| (d.switch_backend(requested), d.kind()))
            {
                report(&events, kind, backend);
            }
            scheduler.mark_dirty();
        }
    });

    // Viewport effect: every camera change needs a repaint
    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            current_view.track();
            scheduler.mark_dirty();
        }
    });

    // Window resize: the dispatcher re-reads the display size on the next frame
    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            let Some(window) = web_sys::window() else {
                return;
            };
            RESIZE_BINDING.with(|slot| {
                if let Some(old) = slot.borrow_mut().take() {
                    let _ = old.window.remove_event_listener_with_callback(
                        "resize",
                        old._handler.as_ref().unchecked_ref(),
                    );
                }
            });
            let scheduler = scheduler.clone();
            let handler = Closure::<dyn Fn()>::new(move || scheduler.mark_dirty());
            if window
                .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
                .is_ok()
            {
                RESIZE_BINDING.with(|slot| {
                    *slot.borrow_mut() = Some(ResizeBinding {
                        window: window.clone(),
                        _handler: handler,
                    });
                });
            }
        }
    });

    // --- Input handlers ---

    let on_pointer_down = move |e: PointerEvent| {
        if let Some(target) = e.current_target()
            && let Ok(el) = target.dyn_into::<HtmlElement>()
        {
            el.set_pointer_capture(e.pointer_id()).ok();
            el.style().set_property("cursor", "grabbing").ok();
        }
    };

    let on_pointer_up = move |e: PointerEvent| {
        if let Some(target) = e.current_target()
            && let Ok(el) = target.dyn_into::<HtmlElement>()
        {
            el.style().set_property("cursor", "grab").ok();
        }
    };

    let on_pointer_move = {
        let controller = controller.clone();
        let dispatcher = dispatcher.clone();
        move |e: PointerEvent| {
            if e.buttons() == 0 {
                return;
            }
            let Some(container) = container_ref.get_untracked() else {
                return;
            };
            let metrics = surface_metrics(&container, &dispatcher);
            input::drag(
                &mut controller.borrow_mut(),
                e.movement_x() as f64,
                e.movement_y() as f64,
                metrics,
            );
        }
    };

    let on_wheel = {
        let controller = controller.clone();
        let dispatcher = dispatcher.clone();
        move |e: WheelEvent| {
            e.prevent_default();
            let Some(container) = container_ref.get_untracked() else {
                return;
            };
            let metrics = surface_metrics(&container, &dispatcher);
            let (x, y) = local_position(&container, &e);
            // Scrolling toward the user (negative deltaY) zooms in.
            input::wheel(
                &mut controller.borrow_mut(),
                -e.delta_y(),
                x,
                y,
                metrics,
                now_ms(),
            );
        }
    };

    let on_double_click = {
        let controller = controller.clone();
        let dispatcher = dispatcher.clone();
        move |e: MouseEvent| {
            e.prevent_default();
            let Some(container) = container_ref.get_untracked() else {
                return;
            };
            let metrics = surface_metrics(&container, &dispatcher);
            let (x, y) = local_position(&container, &e);
            input::double_click(&mut controller.borrow_mut(), x, y, metrics, now_ms());
        }
    };

    view! {
        <div
            node_ref=container_ref
            style="position: absolute; inset: 0; overflow: hidden; cursor: grab; touch-action: none; user-select: none;"
            on:pointerdown=on_pointer_down
            on:pointerup=on_pointer_up
            on:pointermove=on_pointer_move
            on:wheel=on_wheel
            on:dblclick=on_double_click
            on:contextmenu=|e: MouseEvent| e.prevent_default()
        />
    }
}
