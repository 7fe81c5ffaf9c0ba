use std::cell::RefCell;
use std::rc::{Rc, Weak};

use web_sys::HtmlCanvasElement;
use wgpu::util::DeviceExt;

use mandelscope_shared::viewport::VIEW_SPAN;
use mandelscope_shared::{BackendKind, BackendStatus, FrameInput, RenderBackend, RenderParams};

use crate::shader::fractal_shader;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    center: [f32; 2],
    span: [f32; 2],
    clock: f32,
    divergence: f32,
    _pad: [f32; 2],
}

impl FrameUniform {
    fn from_frame(frame: &FrameInput) -> Self {
        let height = frame.viewport.zoom * VIEW_SPAN;
        Self {
            center: [frame.viewport.x as f32, frame.viewport.y as f32],
            span: [(height * frame.aspect) as f32, height as f32],
            clock: frame.clock as f32,
            divergence: frame.params.divergence as f32,
            _pad: [0.0, 0.0],
        }
    }
}

/// Synchronous half of initialization: instance and surface exist, adapter
/// and device are still to be requested.
struct PendingInit {
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    width: u32,
    height: u32,
    iterations: u32,
}

struct FractalRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl FractalRenderer {
    async fn init_with_backends(
        pending: PendingInit,
        backends: wgpu::Backends,
        backend_path: &str,
    ) -> Result<Self, String> {
        let PendingInit {
            instance,
            surface,
            width,
            height,
            iterations,
        } = pending;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .ok_or_else(|| format!("wgpu init ({backend_path}): no suitable GPU adapter found"))?;

        // WebGL2 adapters expose zero compute limits, so the plain defaults
        // fail validation.
        let required_limits = if backends == wgpu::Backends::GL {
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
        } else {
            wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("mandelscope-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| format!("wgpu init ({backend_path}) request_device: {e}"))?;

        let mut surface_config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or_else(|| format!("wgpu init ({backend_path}): surface unsupported by adapter"))?;
        let caps = surface.get_capabilities(&adapter);

        // The palette is computed in display space; an sRGB target would
        // wash it out relative to the CPU path.
        if let Some(format) = caps.formats.iter().copied().find(|f| !f.is_srgb()) {
            surface_config.format = format;
        }
        if caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
            surface_config.alpha_mode = wgpu::CompositeAlphaMode::Opaque;
        }

        web_sys::console::log_1(
            &format!(
                "wgpu init: path={backend_path} format={:?} present={:?} alpha={:?} iterations={iterations}",
                surface_config.format, surface_config.present_mode, surface_config.alpha_mode,
            )
            .into(),
        );
        surface.configure(&device, &surface_config);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame-ubo"),
            contents: bytemuck::cast_slice(&[FrameUniform {
                center: [0.0, 0.0],
                span: [1.0, 1.0],
                clock: 0.0,
                divergence: 4.0,
                _pad: [0.0, 0.0],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bg"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fractal-shader"),
            source: wgpu::ShaderSource::Wgsl(fractal_shader(iterations).into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fractal-pl"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fractal-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if self.surface_config.width == width && self.surface_config.height == height {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn render(&mut self, frame: &FrameInput) -> Result<(), String> {
        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[FrameUniform::from_frame(frame)]),
        );

        let output = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err("wgpu frame: out of memory".into());
            }
            Err(_) => return Ok(()),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("fractal-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fractal-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

enum GpuSlot {
    Pending,
    Ready(FractalRenderer),
    Failed(String),
}

/// WebGL2 backend. Adapter and device requests finish after creation, so
/// the renderer lands in a shared slot and `status` reports progress.
pub struct GpuBackend {
    slot: Rc<RefCell<GpuSlot>>,
    size: (u32, u32),
}

impl GpuBackend {
    /// Claim `canvas` for WebGL and start the async part of setup.
    pub fn start(canvas: &HtmlCanvasElement, params: &RenderParams) -> Result<Self, String> {
        let backend_path = "webgl";
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::GL,
            ..Default::default()
        });
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| format!("wgpu init ({backend_path}) create_surface: {e}"))?;

        let size = (canvas.width().max(1), canvas.height().max(1));
        let pending = PendingInit {
            instance,
            surface,
            width: size.0,
            height: size.1,
            iterations: params.iterations,
        };

        let slot = Rc::new(RefCell::new(GpuSlot::Pending));
        let weak: Weak<RefCell<GpuSlot>> = Rc::downgrade(&slot);
        wasm_bindgen_futures::spawn_local(async move {
            let result =
                FractalRenderer::init_with_backends(pending, wgpu::Backends::GL, backend_path)
                    .await;
            // The backend may have been replaced while the device was pending.
            let Some(slot) = weak.upgrade() else {
                return;
            };
            *slot.borrow_mut() = match result {
                Ok(renderer) => GpuSlot::Ready(renderer),
                Err(e) => GpuSlot::Failed(e),
            };
        });

        Ok(Self { slot, size })
    }
}

impl RenderBackend for GpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn status(&self) -> BackendStatus {
        match &*self.slot.borrow() {
            GpuSlot::Pending => BackendStatus::Pending,
            GpuSlot::Ready(_) => BackendStatus::Ready,
            GpuSlot::Failed(cause) => BackendStatus::Failed(cause.clone()),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if let GpuSlot::Ready(renderer) = &mut *self.slot.borrow_mut() {
            renderer.resize(width, height);
        }
    }

    fn render_frame(&mut self, frame: &FrameInput) {
        let mut slot = self.slot.borrow_mut();
        let GpuSlot::Ready(renderer) = &mut *slot else {
            return;
        };
        // Resizes that arrived while the device was pending.
        renderer.resize(self.size.0, self.size.1);
        if let Err(e) = renderer.render(frame) {
            *slot = GpuSlot::Failed(e);
        }
    }
}
