use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement};

use mandelscope_shared::{BackendFactory, DrawingSurface, RenderBackend, RenderParams};

use crate::cpu::{CpuBackend, context_2d};
use crate::gpu::GpuBackend;

const CANVAS_STYLE: &str = "position: absolute; inset: 0; width: 100%; height: 100%; display: block; touch-action: none; image-rendering: pixelated;";

/// A `<canvas>` appended to the fractal container. Removed from the DOM
/// when dropped.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
}

impl CanvasSurface {
    pub fn element(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl DrawingSurface for CanvasSurface {
    fn display_size(&self) -> (u32, u32) {
        (
            self.canvas.client_width().max(0) as u32,
            self.canvas.client_height().max(0) as u32,
        )
    }

    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }
}

impl Drop for CanvasSurface {
    fn drop(&mut self) {
        self.canvas.remove();
    }
}

/// Creates canvases inside `container` and attaches WebGL or Canvas 2D
/// backends to them.
pub struct WebBackendFactory {
    container: HtmlElement,
}

impl WebBackendFactory {
    pub fn new(container: HtmlElement) -> Self {
        Self { container }
    }

    fn new_canvas(&self) -> Result<HtmlCanvasElement, String> {
        let document = self
            .container
            .owner_document()
            .ok_or("surface: container is detached from the document")?;
        let canvas = document
            .create_element("canvas")
            .map_err(|e| format!("surface: create canvas: {e:?}"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| "surface: element is not a canvas".to_string())?;
        canvas
            .set_attribute("style", CANVAS_STYLE)
            .map_err(|e| format!("surface: style canvas: {e:?}"))?;
        // Keep the canvas behind any overlay already in the container.
        self.container
            .insert_before(&canvas, self.container.first_child().as_ref())
            .map_err(|e| format!("surface: attach canvas: {e:?}"))?;
        Ok(canvas)
    }
}

impl BackendFactory for WebBackendFactory {
    type Surface = CanvasSurface;
    type Error = String;

    fn create_surface(&mut self) -> Result<CanvasSurface, String> {
        Ok(CanvasSurface {
            canvas: self.new_canvas()?,
        })
    }

    fn create_gpu(
        &mut self,
        surface: &mut CanvasSurface,
        params: &RenderParams,
    ) -> Result<Box<dyn RenderBackend>, String> {
        Ok(Box::new(GpuBackend::start(surface.element(), params)?))
    }

    fn create_cpu(&mut self, surface: &mut CanvasSurface) -> Result<Box<dyn RenderBackend>, String> {
        if let Some(context) = context_2d(surface.element())? {
            return Ok(Box::new(CpuBackend::new(surface.element().clone(), context)));
        }

        // A failed WebGL attempt leaves the canvas bound to a GL context.
        web_sys::console::log_1(&"cpu: canvas holds a WebGL context, replacing it".into());
        *surface = self.create_surface()?;
        let context = context_2d(surface.element())?
            .ok_or("cpu: fresh canvas refused a 2D context")?;
        Ok(Box::new(CpuBackend::new(surface.element().clone(), context)))
    }
}
