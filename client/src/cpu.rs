use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use mandelscope_shared::fractal::render_rgba;
use mandelscope_shared::{BackendKind, FrameInput, RenderBackend, RenderParams, Viewport};

/// Canvas 2D backend: every frame is computed on the main thread and
/// blitted with `putImageData`.
pub struct CpuBackend {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    pixels: Vec<u8>,
}

impl CpuBackend {
    pub fn new(canvas: HtmlCanvasElement, context: CanvasRenderingContext2d) -> Self {
        Self {
            canvas,
            context,
            pixels: Vec::new(),
        }
    }
}

impl RenderBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn render_frame(&mut self, frame: &FrameInput) {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        if width == 0 || height == 0 {
            return;
        }
        render_rgba(frame, width, height, &mut self.pixels);
        if let Err(e) = blit(&self.context, &self.pixels, width, height) {
            web_sys::console::warn_1(&format!("cpu frame: {e}").into());
        }
    }
}

fn blit(
    context: &CanvasRenderingContext2d,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> Result<(), String> {
    let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(pixels), width, height)
        .map_err(|e| format!("ImageData: {e:?}"))?;
    context
        .put_image_data(&image, 0.0, 0.0)
        .map_err(|e| format!("putImageData: {e:?}"))
}

/// 2D context of `canvas`, or `None` when the canvas already hosts another
/// kind of context.
pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<Option<CanvasRenderingContext2d>, String> {
    canvas
        .get_context("2d")
        .map_err(|e| format!("getContext(2d): {e:?}"))?
        .map(|ctx| {
            ctx.dyn_into::<CanvasRenderingContext2d>()
                .map_err(|_| "getContext(2d) returned a non-2D context".to_string())
        })
        .transpose()
}

pub const THUMBNAIL_SIZE: u32 = 96;

/// Square preview of `view` as a PNG data URL.
pub fn render_thumbnail(view: Viewport, params: &RenderParams) -> Result<String, String> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or("thumbnail: document is unavailable")?;
    let canvas = document
        .create_element("canvas")
        .map_err(|e| format!("thumbnail: create canvas: {e:?}"))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| "thumbnail: element is not a canvas".to_string())?;
    canvas.set_width(THUMBNAIL_SIZE);
    canvas.set_height(THUMBNAIL_SIZE);
    let context = context_2d(&canvas)?.ok_or("thumbnail: no 2D context")?;

    let mut pixels = Vec::new();
    let frame = FrameInput {
        viewport: view,
        aspect: 1.0,
        clock: 0.0,
        params: *params,
    };
    render_rgba(&frame, THUMBNAIL_SIZE, THUMBNAIL_SIZE, &mut pixels);
    blit(&context, &pixels, THUMBNAIL_SIZE, THUMBNAIL_SIZE)?;
    canvas
        .to_data_url()
        .map_err(|e| format!("thumbnail: toDataURL: {e:?}"))
}
