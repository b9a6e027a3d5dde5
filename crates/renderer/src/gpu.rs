//! GPU resources backing the sandbox window.
//!
//! `GpuState` owns the surface, device, render pipeline, and uniform buffer,
//! and draws the full-screen quad once per frame. Shader swaps go through
//! [`GpuState::reload`], which validates the freshly compiled pair inside an
//! error scope so a broken edit keeps the previous pipeline on screen instead
//! of tearing the process down.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::compile::{compile_fragment_shader, compile_vertex_shader, ShaderPair};
use crate::uniforms::SandboxUniforms;

pub(crate) struct GpuState {
    /// `wgpu` instance that produced the surface; kept alive for the surface lifetime.
    _instance: wgpu::Instance,
    /// Limits advertised by the adapter; used to validate resize requests.
    limits: wgpu::Limits,
    /// Adapter description surfaced on demand via the info hotkey.
    adapter_info: wgpu::AdapterInfo,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    pipeline_layout: wgpu::PipelineLayout,
    /// Full-screen quad pipeline driving the current shader pair.
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// CPU copy of the uniform data mirrored into the buffer each frame.
    uniforms: SandboxUniforms,
    /// Monotonic frame counter for diagnostics.
    frame_count: u32,
    /// Used to throttle the once-per-second diagnostic line.
    last_log_time: Instant,
}

impl GpuState {
    /// Creates a GPU pipeline targeting the window surface and compiles the
    /// initial shader pair. Compilation failure is fatal here; once running,
    /// failures are confined to [`GpuState::reload`].
    pub fn new(
        window: Arc<Window>,
        initial_size: PhysicalSize<u32>,
        shader_base: &Path,
    ) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        let max_dimension = limits.max_texture_dimension_2d;
        if size.width > max_dimension || size.height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {}x{}",
                size.width,
                size.height
            );
        }

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("shadelab device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&device_descriptor))
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sandbox pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let pair = ShaderPair::load(shader_base)?;
        let pipeline =
            build_validated_pipeline(&device, &pipeline_layout, surface_format, &pair)
                .context("failed to compile the initial shader pair")?;

        let uniforms = SandboxUniforms::new(size.width, size.height);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        tracing::info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            width = size.width,
            height = size.height,
            "initialised GPU state"
        );

        Ok(Self {
            _instance: instance,
            limits,
            adapter_info,
            surface,
            device,
            queue,
            config,
            size,
            pipeline_layout,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            frame_count: 0,
            last_log_time: Instant::now(),
        })
    }

    /// Returns the current surface size.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigures the swapchain to match the new size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        let max_dimension = self.limits.max_texture_dimension_2d;
        if new_size.width > max_dimension || new_size.height > max_dimension {
            tracing::warn!(
                width = new_size.width,
                height = new_size.height,
                max_dimension,
                "resize exceeds GPU max texture dimension; keeping previous size"
            );
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.uniforms
            .set_resolution(new_size.width as f32, new_size.height as f32);
    }

    /// Recompiles the shader pair from disk and swaps the pipeline in.
    ///
    /// Validation runs inside an error scope; on failure the old pipeline
    /// stays active and the error is returned for the caller to log.
    pub fn reload(&mut self, shader_base: &Path) -> Result<()> {
        let pair = ShaderPair::load(shader_base)?;
        let pipeline = build_validated_pipeline(
            &self.device,
            &self.pipeline_layout,
            self.config.format,
            &pair,
        )?;
        self.pipeline = pipeline;
        Ok(())
    }

    /// Logs the adapter and device characteristics, mirroring the original
    /// sandbox's GL info dump.
    pub fn log_adapter_info(&self) {
        tracing::info!(
            name = %self.adapter_info.name,
            backend = ?self.adapter_info.backend,
            device_type = ?self.adapter_info.device_type,
            driver = %self.adapter_info.driver,
            driver_info = %self.adapter_info.driver_info,
            max_texture_dimension_2d = self.limits.max_texture_dimension_2d,
            surface_format = ?self.config.format,
            "adapter info"
        );
    }

    /// Uploads the frame's uniforms, records the quad draw, and presents.
    pub fn render_frame(
        &mut self,
        time: f32,
        time_scale: f32,
        mouse: [f32; 4],
    ) -> Result<(), wgpu::SurfaceError> {
        self.uniforms.set_clock(time, time_scale);
        self.uniforms.set_mouse(mouse);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.01,
                            g: 0.01,
                            b: 0.01,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.draw(0..4, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        self.frame_count = self.frame_count.saturating_add(1);
        let now = Instant::now();
        if now.duration_since(self.last_log_time) >= Duration::from_secs(1) {
            tracing::debug!(
                time,
                time_scale,
                frame = self.frame_count,
                width = self.size.width,
                height = self.size.height,
                "frame diagnostics"
            );
            self.last_log_time = now;
        }

        Ok(())
    }
}

/// Compiles both stages and builds the quad pipeline inside a validation
/// error scope, so bad GLSL surfaces as a `Result` instead of a panic.
fn build_validated_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    pair: &ShaderPair,
) -> Result<wgpu::RenderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let vertex_module = compile_vertex_shader(device, &pair.vertex);
    let fragment_module = compile_fragment_shader(device, &pair.fragment);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("sandbox pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        anyhow::bail!("shader validation failed: {error}");
    }
    Ok(pipeline)
}
