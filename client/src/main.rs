mod app;
mod backend;
mod canvas;
mod cpu;
#[cfg(target_arch = "wasm32")]
mod gpu;
mod panel;
mod render_loop;
mod shader;

#[cfg(not(target_arch = "wasm32"))]
mod gpu {
    use mandelscope_shared::{BackendKind, FrameInput, RenderBackend, RenderParams};

    pub struct GpuBackend;

    impl GpuBackend {
        pub fn start(
            _canvas: &web_sys::HtmlCanvasElement,
            _params: &RenderParams,
        ) -> Result<Self, String> {
            Err("not wasm".into())
        }
    }

    impl RenderBackend for GpuBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Gpu
        }

        fn render_frame(&mut self, _frame: &FrameInput) {}
    }
}

use leptos::mount::mount_to;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

thread_local! {
    static APP_MOUNT_HANDLE: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let mount_target = document
        .get_element_by_id("app")
        .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
        .or_else(|| document.body());
    let Some(target) = mount_target else {
        return;
    };

    APP_MOUNT_HANDLE.with(move |slot| {
        // A re-entered main() must not leave the previous mount's effects running.
        let _old = slot.borrow_mut().take();
        let handle = mount_to(target, app::App);
        *slot.borrow_mut() = Some(Box::new(handle));
    });
}
