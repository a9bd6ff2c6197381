//! wgpu resources for the stereo viewer.
//!
//! One WGSL module provides four fragment stages: anaglyph, wiggle, the plate
//! overview and its loupe inset. Each draws the same full-viewport quad; the
//! viewport selects the content rectangle and the scissor clips to the
//! visible rectangle, so nothing outside the crop is ever written.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::loupe::{LoupeLayout, LoupeUniforms};
use crate::processing::layout::PixelRect;
use crate::render::composite::{ModeKind, OverlayUniforms, StereoUniforms};
use crate::render::plate::Plate;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

// Output uv has its origin at the bottom-left, matching plate UV.
const QUAD: [Vertex; 4] = [
    //   NDC pos         UV
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 0.0],
    }, // bottom-left
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 0.0],
    }, // bottom-right
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 1.0],
    }, // top-left
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 1.0],
    }, // top-right
];

/// What one frame draws.
#[derive(Debug, Clone, Copy)]
pub enum DrawPass {
    /// Only the black clear.
    Blank,
    /// Composited stereo frame: viewport `content`, scissor `visible`.
    Stereo {
        mode: ModeKind,
        uniforms: StereoUniforms,
        content: PixelRect,
        visible: PixelRect,
    },
    /// Whole plate with midline and landmark markers, plus the loupe inset
    /// while it is held.
    Overview {
        overlay: OverlayUniforms,
        rect: PixelRect,
        loupe: Option<LoupeLayout>,
    },
}

pub struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    anaglyph: wgpu::RenderPipeline,
    wiggle: wgpu::RenderPipeline,
    overview: wgpu::RenderPipeline,
    loupe: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
    vbuf: wgpu::Buffer,

    stereo_buf: wgpu::Buffer,  // 32 bytes, `Stereo` in WGSL
    overlay_buf: wgpu::Buffer, // 160 bytes, `Overlay` in WGSL
    loupe_buf: wgpu::Buffer,   // 32 bytes, `Loupe` in WGSL
    sampler: wgpu::Sampler,
}

impl Gpu {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("stereo-device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .context("failed to acquire GPU device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "stereo surface configured",
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("plate-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_buffer = |label: &str, size: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let stereo_buf = uniform_buffer("stereo", std::mem::size_of::<StereoUniforms>());
        let overlay_buf = uniform_buffer("overlay", std::mem::size_of::<OverlayUniforms>());
        let loupe_buf = uniform_buffer("loupe", std::mem::size_of::<LoupeUniforms>());

        let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stereo-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/stereo.wgsl").into()),
        });

        let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stereo-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_entry(2),
                uniform_entry(3),
                uniform_entry(4),
            ],
        });

        let pip_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stereo-pipe-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, fs: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pip_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let anaglyph = make_pipeline("anaglyph", "fs_anaglyph");
        let wiggle = make_pipeline("wiggle", "fs_wiggle");
        let overview = make_pipeline("overview", "fs_plate");
        let loupe = make_pipeline("loupe", "fs_loupe");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            anaglyph,
            wiggle,
            overview,
            loupe,
            bind_layout,
            bind_group: None,
            vbuf,
            stereo_buf,
            overlay_buf,
            loupe_buf,
            sampler,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn max_texture_dim(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        debug!(
            width = self.config.width,
            height = self.config.height,
            "stereo surface resized",
        );
    }

    /// Replace the plate texture; the previous one is dropped.
    pub fn upload_plate(&mut self, plate: &Plate) {
        let (w, h) = (plate.width(), plate.height());
        let size = wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        };
        let tex = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("plate"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            tex.as_image_copy(),
            plate.rgba().as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            size,
        );
        let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
        self.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("stereo-bind-group"),
            layout: &self.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.stereo_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.overlay_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.loupe_buf.as_entire_binding(),
                },
            ],
        }));
        info!(width = w, height = h, "plate uploaded");
    }

    /// Draw one frame. Surface errors are returned for the caller to recover from.
    pub fn render(&self, pass: &DrawPass) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stereo-encoder"),
            });

        let draw = match (*pass, self.bind_group.as_ref()) {
            (DrawPass::Blank, _) | (_, None) => None,
            (
                DrawPass::Stereo {
                    mode,
                    uniforms,
                    content,
                    visible,
                },
                Some(bg),
            ) => {
                self.queue
                    .write_buffer(&self.stereo_buf, 0, bytemuck::bytes_of(&uniforms));
                let pipeline = match mode {
                    ModeKind::Anaglyph => &self.anaglyph,
                    ModeKind::Wiggle => &self.wiggle,
                };
                Some((pipeline, bg, content, visible))
            }
            (DrawPass::Overview { overlay, rect, .. }, Some(bg)) => {
                self.queue
                    .write_buffer(&self.overlay_buf, 0, bytemuck::bytes_of(&overlay));
                Some((&self.overview, bg, rect, rect))
            }
        };
        let inset = match (*pass, self.bind_group.as_ref()) {
            (
                DrawPass::Overview {
                    loupe: Some(loupe), ..
                },
                Some(bg),
            ) => {
                self.queue
                    .write_buffer(&self.loupe_buf, 0, bytemuck::bytes_of(&loupe.uniforms));
                Some((&self.loupe, bg, loupe.rect))
            }
            _ => None,
        };

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stereo-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let target = PixelRect::new(0, 0, self.config.width, self.config.height);
            if let Some((pipeline, bg, viewport, scissor)) = draw {
                self.draw_quad(&mut rpass, pipeline, bg, viewport, scissor, target);
            }
            // the inset is 1:1, so it is skipped rather than squeezed when clipped
            if let Some((pipeline, bg, rect)) = inset {
                if rect.intersect(&target) == rect {
                    self.draw_quad(&mut rpass, pipeline, bg, rect, rect, target);
                }
            }
        }
        self.queue.submit([encoder.finish()]);
        frame.present();
        Ok(())
    }

    fn draw_quad(
        &self,
        rpass: &mut wgpu::RenderPass<'_>,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        viewport: PixelRect,
        scissor: PixelRect,
        target: PixelRect,
    ) {
        let viewport = viewport.intersect(&target);
        let scissor = scissor.intersect(&target);
        if viewport.is_empty() || scissor.is_empty() {
            return;
        }
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vbuf.slice(..));
        rpass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        rpass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
        rpass.draw(0..4, 0..1);
    }
}
