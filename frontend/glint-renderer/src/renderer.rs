use crate::compositor::{Compositor, GraphicsDevice, RendererError};
use crate::config::VideoConfig;
use crate::shader::{LoadedShader, ShaderParams, ShaderSelection};
use crate::texture::TexCoordQuad;
use crate::viewport::{Mat4, Viewport};
use glint_common::frontend::{self, Color, FrameSize, PackedFrame, StatusSink};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::borrow::Cow;
use std::iter;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    texture_coords: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// Triangle strip over the unit square; the projection maps it to clip space
fn quad_vertices(quad: TexCoordQuad) -> [Vertex; 4] {
    [
        Vertex { position: [0.0, 0.0], texture_coords: quad.corner(TexCoordQuad::BOTTOM_LEFT) },
        Vertex { position: [1.0, 0.0], texture_coords: quad.corner(TexCoordQuad::BOTTOM_RIGHT) },
        Vertex { position: [0.0, 1.0], texture_coords: quad.corner(TexCoordQuad::TOP_LEFT) },
        Vertex { position: [1.0, 1.0], texture_coords: quad.corner(TexCoordQuad::TOP_RIGHT) },
    ]
}

fn present_mode_for(vsync: bool, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }

    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(wgpu::PresentMode::AutoNoVsync)
}

// create_texture reports limit violations through the device error handler, not a Result
fn check_texture_limit(texture_size: FrameSize, max_dimension: u32) -> Result<(), RendererError> {
    if texture_size.width > max_dimension || texture_size.height > max_dimension {
        log::error!(
            "Frame texture size {}x{} exceeds device limit {max_dimension}",
            texture_size.width,
            texture_size.height
        );
        return Err(RendererError::TextureTooLarge {
            width: texture_size.width,
            height: texture_size.height,
            max_dimension,
        });
    }

    Ok(())
}

/// GPU graphics device that draws through a wgpu surface attached to a window.
pub struct WgpuDevice<Window> {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    available_present_modes: Vec<wgpu::PresentMode>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    frame_texture: wgpu::Texture,
    texture_size: FrameSize,
    vertex_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    render_pipeline: wgpu::RenderPipeline,
    params: ShaderParams,
    viewport: Viewport,
    frame_buffer: Vec<Color>,
    // SAFETY: The surface must not outlive the window it was created from, thus the window must be
    // declared after the surface
    window: Window,
    window_size: FrameSize,
}

impl<Window: HasDisplayHandle + HasWindowHandle> WgpuDevice<Window> {
    /// Initialize wgpu against the given window and allocate the frame texture.
    ///
    /// # Errors
    ///
    /// This function will return an error if wgpu cannot provide a surface, adapter, or device for
    /// the window, or if the configured shader cannot be loaded or compiled.
    pub async fn new(
        window: Window,
        window_size: FrameSize,
        config: &VideoConfig,
    ) -> Result<Self, RendererError> {
        let texture_size = config.texture_size()?;
        let shader = ShaderSelection::resolve(&config.shader).load()?;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::default()
        });

        // SAFETY: The surface must not outlive the window it was created from
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::from_window(&window)?)
        }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Obtained wgpu adapter with backend {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: "device".into(),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..wgpu::DeviceDescriptor::default()
            })
            .await?;

        check_texture_limit(texture_size, device.limits().max_texture_dimension_2d)?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let surface_format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| {
                log::warn!(
                    "wgpu adapter does not support any sRGB texture formats; defaulting to first format in this list: {:?}",
                    surface_capabilities.formats
                );
                surface_capabilities.formats.first().copied()
            })
            .ok_or(RendererError::NoSurfaceFormat)?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: window_size.width.max(1),
            height: window_size.height.max(1),
            present_mode: present_mode_for(config.vsync, &surface_capabilities.present_modes),
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);

        log::info!(
            "Configured {surface_format:?} surface with present mode {:?}",
            surface_config.present_mode
        );

        let texture_format = if surface_format.is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        let frame_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: "frame_texture".into(),
            size: wgpu::Extent3d {
                width: texture_size.width,
                height: texture_size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let filter_mode = shader
            .as_ref()
            .and_then(|shader| shader.filter_override)
            .unwrap_or_else(|| config.filter_mode())
            .to_wgpu_filter_mode();
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: "frame_sampler".into(),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..wgpu::SamplerDescriptor::default()
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: "vertex_buffer".into(),
            contents: bytemuck::cast_slice(&quad_vertices(TexCoordQuad::full())),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::VERTEX,
        });

        let params = ShaderParams::default();
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: "params_buffer".into(),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: "render_bind_group_layout".into(),
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
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let frame_texture_view = frame_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: "render_bind_group".into(),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&frame_texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry { binding: 2, resource: params_buffer.as_entire_binding() },
            ],
        });

        let render_pipeline = create_render_pipeline(
            &device,
            &bind_group_layout,
            surface_format,
            shader.as_ref(),
        )
        .await?;

        Ok(Self {
            surface,
            surface_config,
            available_present_modes: surface_capabilities.present_modes,
            device,
            queue,
            frame_texture,
            texture_size,
            vertex_buffer,
            params_buffer,
            bind_group,
            render_pipeline,
            params,
            viewport: Viewport::full(window_size),
            frame_buffer: vec![Color::TRANSPARENT; texture_size.len()],
            window,
            window_size,
        })
    }
}

async fn create_render_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
    shader: Option<&LoadedShader>,
) -> Result<wgpu::RenderPipeline, RendererError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let builtin = device.create_shader_module(wgpu::include_wgsl!("render.wgsl"));
    let fragment_module = match shader {
        Some(shader) => {
            log::info!("Using post-processing shader {}", shader.path.display());
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: "post_process_shader".into(),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&shader.source)),
            })
        }
        None => builtin.clone(),
    };

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: "render_pipeline_layout".into(),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: "render_pipeline".into(),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &builtin,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[Vertex::buffer_layout()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    });

    if let Some(err) = device.pop_error_scope().await {
        log::error!("Failed to create render pipeline: {err}");
        return Err(RendererError::ShaderCompile(err.to_string()));
    }

    Ok(render_pipeline)
}

impl<Window> WgpuDevice<Window> {
    pub fn window(&self) -> &Window {
        &self.window
    }

    fn write_texture(&self, colors: &[Color], size: FrameSize) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.frame_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(colors),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 4),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d { width: size.width, height: size.height, depth_or_array_layers: 1 },
        );
    }

    fn render(&mut self) -> Result<bool, RendererError> {
        let output = self.surface.get_current_texture()?;
        let output_view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: "encoder".into() });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: "render_pass".into(),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &output_view,
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

            let Viewport { x, y, width, height } = self.viewport;
            let fits_surface = x + width <= self.surface_config.width
                && y + height <= self.surface_config.height;
            if !self.viewport.is_empty() && fits_surface {
                render_pass.set_viewport(
                    x as f32,
                    y as f32,
                    width as f32,
                    height as f32,
                    0.0,
                    1.0,
                );
                render_pass.set_bind_group(0, &self.bind_group, &[]);
                render_pass.set_pipeline(&self.render_pipeline);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.draw(0..4, 0..1);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));

        let suboptimal = output.suboptimal;
        output.present();

        Ok(suboptimal)
    }
}

impl<Window> GraphicsDevice for WgpuDevice<Window> {
    fn clear_texture(&mut self) {
        self.frame_buffer.fill(Color::TRANSPARENT);
        self.write_texture(&self.frame_buffer, self.texture_size);
    }

    fn write_frame(&mut self, frame: PackedFrame<'_>) {
        let size = frame.size();
        if size.is_empty() {
            return;
        }

        let len = size.len();
        frontend::unpack_frame(&frame, &mut self.frame_buffer[..len], size.width as usize);
        self.write_texture(&self.frame_buffer[..len], size);
    }

    fn set_tex_coords(&mut self, quad: TexCoordQuad) {
        self.queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&quad_vertices(quad)));
    }

    fn set_viewport(&mut self, viewport: Viewport, projection: Mat4) {
        self.viewport = viewport;
        self.params.projection = projection;
        self.queue.write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[self.params]));
    }

    fn set_shader_params(&mut self, params: ShaderParams) {
        if params == self.params {
            return;
        }

        self.params = params;
        self.queue.write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[self.params]));
    }

    fn draw_and_present(&mut self) -> Result<(), RendererError> {
        if self.window_size.is_empty() {
            // Minimized
            return Ok(());
        }

        match self.render() {
            Ok(false) => {}
            Ok(true) => {
                log::debug!("Reconfiguring surface because graphics API reported it as suboptimal");
                self.surface.configure(&self.device, &self.surface_config);
            }
            Err(RendererError::WgpuSurface(
                err @ (wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Timeout),
            )) => {
                log::warn!("Skipping frame because wgpu surface could not be acquired: {err}");
                self.surface.configure(&self.device, &self.surface_config);
            }
            Err(err) => return Err(err),
        }

        Ok(())
    }

    fn set_vsync(&mut self, vsync: bool) {
        let present_mode = present_mode_for(vsync, &self.available_present_modes);
        if present_mode == self.surface_config.present_mode {
            return;
        }

        log::debug!("Changing present mode to {present_mode:?}");

        self.surface_config.present_mode = present_mode;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn resize_surface(&mut self, size: FrameSize) {
        self.window_size = size;
        if size.is_empty() {
            return;
        }

        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn surface_size(&self) -> FrameSize {
        self.window_size
    }

    fn identifier(&self) -> &'static str {
        "wgpu"
    }
}

/// Create a GPU-backed compositor drawing into `window`.
///
/// # Errors
///
/// Propagates any error from initializing wgpu or loading the configured shader.
pub async fn create_wgpu_compositor<Window: HasDisplayHandle + HasWindowHandle>(
    window: Window,
    window_size: FrameSize,
    config: &VideoConfig,
    status_sink: Box<dyn StatusSink>,
) -> Result<Compositor<WgpuDevice<Window>>, RendererError> {
    let device = WgpuDevice::new(window, window_size, config).await?;
    Compositor::new(device, config, status_sink)
}
