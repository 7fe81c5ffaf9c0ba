use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use mandelscope_shared::backend::{DIVERGENCE_RANGE, ITERATIONS_RANGE, RESOLUTION_RANGE};
use mandelscope_shared::{BOOKMARKS, BackendKind, Bookmark, RenderParams, ZoomInterpolation, input};

use crate::app::{
    ActiveBackend, AnimatePalette, CurrentView, Divergence, Iterations, Resolution,
    SharedController, ZoomMode, now_ms,
};
use crate::cpu::{THUMBNAIL_SIZE, render_thumbnail};

/// Sliders that rebuild the GPU pipeline wait this long after the last
/// input before committing.
const REBUILD_DEBOUNCE_MS: u32 = 150;

const PANEL_STYLE: &str = "position: absolute; top: 16px; right: 16px; z-index: 10; width: 280px; max-height: calc(100% - 32px); overflow-y: auto; background: rgba(19,22,31,0.92); border: 1px solid #282c3e; border-radius: 8px; padding: 10px; box-sizing: border-box;";
const SECTION_LABEL_STYLE: &str = "padding: 8px 10px 4px; font-family: 'JetBrains Mono', monospace; font-size: 0.6rem; letter-spacing: 0.08em; text-transform: uppercase; color: #5a5860;";
const BUTTON_STYLE: &str = "flex: 1; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 4px; color: #e2e0d8; font-family: 'JetBrains Mono', monospace; font-size: 0.72rem; padding: 6px 8px; cursor: pointer;";

/// Slider position to an integer setting.
fn slider_count(value: f64, clamp: fn(u32) -> u32) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return clamp(0);
    }
    clamp(value.round() as u32)
}

/// Wrap `apply` so bursts of calls collapse into one, `delay_ms` after the
/// last call.
fn debounced(delay_ms: u32, apply: impl Fn(f64) + 'static) -> impl Fn(f64) + 'static {
    let pending: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));
    let apply = Rc::new(apply);
    move |value| {
        if let Some(timeout) = pending.borrow_mut().take() {
            timeout.cancel();
        }
        let apply = Rc::clone(&apply);
        let timeout = Timeout::new(delay_ms, move || apply(value));
        *pending.borrow_mut() = Some(timeout);
    }
}

#[component]
pub fn ControlPanel(controller: SharedController) -> impl IntoView {
    let Resolution(resolution) = expect_context();
    let Iterations(iterations) = expect_context();
    let Divergence(divergence) = expect_context();
    let AnimatePalette(animate) = expect_context();
    let ActiveBackend(backend) = expect_context();
    let ZoomMode(zoom_mode) = expect_context();
    let CurrentView(current_view) = expect_context();

    let on_reset = {
        let controller = controller.clone();
        move |_| input::reset(&mut controller.borrow_mut(), now_ms())
    };

    let commit_iterations = debounced(REBUILD_DEBOUNCE_MS, move |value| {
        iterations.set(slider_count(value, RenderParams::clamp_iterations));
    });
    let commit_divergence = debounced(REBUILD_DEBOUNCE_MS, move |value| {
        divergence.set(slider_count(value, RenderParams::clamp_divergence));
    });

    let bookmarks = BOOKMARKS
        .iter()
        .map(|bookmark| view! { <BookmarkButton bookmark=*bookmark controller=controller.clone() /> })
        .collect_view();

    view! {
        <div style=PANEL_STYLE>
            <div style="display: flex; gap: 8px; padding: 4px 10px 8px;">
                <button style=BUTTON_STYLE on:click=on_reset>"Reset"</button>
            </div>
            <div style=SECTION_LABEL_STYLE>"Bookmarks"</div>
            <div style="display: grid; grid-template-columns: repeat(4, 1fr); gap: 6px; padding: 0 10px 6px;">
                {bookmarks}
            </div>
            <div style=SECTION_LABEL_STYLE>"Rendering"</div>
            <PanelToggleRow
                label="Animate colors"
                active=animate
                on_toggle=move || animate.update(|v| *v = !*v)
            />
            <PanelToggleRow
                label="GPU (WebGL2)"
                active=Signal::derive(move || backend.get() == BackendKind::Gpu)
                on_toggle=move || backend.update(|kind| *kind = kind.toggled())
            />
            <PanelToggleRow
                label="Logarithmic zoom"
                active=Signal::derive(move || zoom_mode.get() == ZoomInterpolation::Logarithmic)
                on_toggle=move || {
                    zoom_mode.update(|mode| {
                        *mode = match *mode {
                            ZoomInterpolation::Linear => ZoomInterpolation::Logarithmic,
                            ZoomInterpolation::Logarithmic => ZoomInterpolation::Linear,
                        }
                    })
                }
            />
            <PanelSliderRow
                label="Resolution"
                value=Signal::derive(move || resolution.get())
                min=*RESOLUTION_RANGE.start()
                max=*RESOLUTION_RANGE.end()
                step=0.05
                decimals=2
                on_commit=move |value| resolution.set(RenderParams::clamp_resolution(value))
            />
            <PanelSliderRow
                label="Iterations"
                value=Signal::derive(move || iterations.get() as f64)
                min=*ITERATIONS_RANGE.start() as f64
                max=*ITERATIONS_RANGE.end() as f64
                step=1.0
                decimals=0
                on_commit=commit_iterations
            />
            <PanelSliderRow
                label="Divergence"
                value=Signal::derive(move || divergence.get() as f64)
                min=*DIVERGENCE_RANGE.start() as f64
                max=*DIVERGENCE_RANGE.end() as f64
                step=1.0
                decimals=0
                on_commit=commit_divergence
            />
            <div style="display: flex; justify-content: space-between; padding: 8px 10px 2px; font-family: 'JetBrains Mono', monospace; font-size: 0.6rem; color: #5a5860;">
                <span>
                    {move || {
                        let vp = current_view.get();
                        format!("{:.6}, {:.6} @ {:.2e}", vp.x, vp.y, vp.zoom)
                    }}
                </span>
                <span>{move || backend.get().label()}</span>
            </div>
        </div>
    }
}

#[component]
fn BookmarkButton(bookmark: Bookmark, controller: SharedController) -> impl IntoView {
    let thumbnail = match render_thumbnail(bookmark.view, &RenderParams::default()) {
        Ok(url) => Some(url),
        Err(e) => {
            web_sys::console::warn_1(&format!("bookmark {}: {e}", bookmark.id).into());
            None
        }
    };

    let on_click = move |_| {
        input::go_to_bookmark(&mut controller.borrow_mut(), bookmark.view, now_ms());
    };

    view! {
        <button
            id=bookmark.id
            title=bookmark.label
            style="aspect-ratio: 1; padding: 0; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 4px; overflow: hidden; cursor: pointer; color: #9a9590; font-family: 'JetBrains Mono', monospace; font-size: 0.55rem;"
            on:click=on_click
        >
            {match thumbnail {
                Some(src) => view! {
                    <img
                        src=src
                        alt=bookmark.label
                        width=THUMBNAIL_SIZE.to_string()
                        height=THUMBNAIL_SIZE.to_string()
                        style="display: block; width: 100%; height: 100%;"
                    />
                }
                .into_any(),
                None => view! { <span>{bookmark.label}</span> }.into_any(),
            }}
        </button>
    }
}

#[component]
fn PanelToggleRow(
    label: &'static str,
    #[prop(into)] active: Signal<bool>,
    on_toggle: impl Fn() + 'static,
) -> impl IntoView {
    view! {
        <div
            style="display: flex; align-items: center; justify-content: space-between; padding: 9px 10px; border-radius: 4px; cursor: pointer; transition: background 0.15s;"
            on:click=move |_| on_toggle()
            on:mouseenter=|e| {
                if let Some(el) = e.target().and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok()) {
                    el.style().set_property("background", "#232738").ok();
                }
            }
            on:mouseleave=|e| {
                if let Some(el) = e.target().and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok()) {
                    el.style().set_property("background", "transparent").ok();
                }
            }
        >
            <span style="font-size: 0.88rem; color: #e2e0d8; font-family: 'Inter', system-ui, sans-serif;">{label}</span>
            <span style=move || {
                if active.get() {
                    "display: inline-block; width: 8px; height: 8px; border-radius: 50%; background: #50c878; box-shadow: 0 0 5px rgba(80,200,120,0.4); flex-shrink: 0;"
                } else {
                    "display: inline-block; width: 8px; height: 8px; border-radius: 50%; background: #3a3f5c; flex-shrink: 0;"
                }
            } />
        </div>
    }
}

#[component]
fn PanelSliderRow(
    label: &'static str,
    value: Signal<f64>,
    min: f64,
    max: f64,
    step: f64,
    decimals: usize,
    on_commit: impl Fn(f64) + 'static,
) -> impl IntoView {
    // Follows the pointer immediately even when the commit is debounced.
    let shown: RwSignal<f64> = RwSignal::new(value.get_untracked());
    Effect::new(move || shown.set(value.get()));

    let on_input = move |e: leptos::ev::Event| {
        let Some(target) = e.target() else {
            return;
        };
        let Ok(el) = target.dyn_into::<web_sys::HtmlInputElement>() else {
            return;
        };
        if let Ok(parsed) = el.value().trim().parse::<f64>() {
            let clamped = parsed.clamp(min, max);
            shown.set(clamped);
            on_commit(clamped);
        }
    };

    view! {
        <div style="display: flex; align-items: center; gap: 10px; padding: 9px 10px; border-radius: 4px;">
            <span style="min-width: 78px; font-size: 0.82rem; color: #e2e0d8; font-family: 'Inter', system-ui, sans-serif;">
                {label}
            </span>
            <input
                type="range"
                min=min
                max=max
                step=step
                prop:value=move || shown.get().to_string()
                on:input=on_input
                style="flex: 1; margin: 0; accent-color: #f5c542;"
            />
            <span style="width: 42px; text-align: right; font-family: 'JetBrains Mono', monospace; font-size: 0.66rem; color: #9a9590;">
                {move || format!("{:.*}", decimals, shown.get())}
            </span>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::slider_count;
    use mandelscope_shared::RenderParams;

    #[test]
    fn slider_positions_round_to_counts() {
        assert_eq!(slider_count(199.6, RenderParams::clamp_iterations), 200);
        assert_eq!(slider_count(7.4, RenderParams::clamp_divergence), 7);
    }

    #[test]
    fn degenerate_slider_positions_clamp_to_range() {
        assert_eq!(slider_count(-5.0, RenderParams::clamp_iterations), 16);
        assert_eq!(slider_count(f64::NAN, RenderParams::clamp_divergence), 2);
        assert_eq!(slider_count(1e12, RenderParams::clamp_divergence), 64);
    }
}
