use crate::cubemap::{self, CubemapTexture};
use crate::gravity::GravityKernel;
use crate::particles::ParticleStore;
use crate::{Particle, SimConfig};
use std::borrow::Cow;
use std::path::Path;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};

/// Uniform parameters for the particle draw shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawParams {
  velocity_cutoff: f32,
  particle_scale: f32,
  _pad: [f32; 2],
}

/// Owns the environment and particle pipelines and encodes the per-frame
/// pass sequence: optional gravity step, then sky, then particles.
pub struct Render {
  env_pipeline: wgpu::RenderPipeline,
  env_bind_group: wgpu::BindGroup,
  particle_pipeline: wgpu::RenderPipeline,
  // One bind group per ping-pong orientation, indexed by the store's
  // current front buffer.
  particle_bind_groups: Vec<wgpu::BindGroup>,
  quad_vertices: wgpu::Buffer,
  num_particles: u32,
}

impl Render {
  #[must_use]
  pub fn init(
    config: &wgpu::SurfaceConfiguration,
    _adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    store: &ParticleStore,
    sim_config: &SimConfig,
  ) -> Self {
    // Build diagnostics are surfaced but do not halt the session; a
    // validation failure here leaves a pipeline that draws nothing.
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("particles"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/particles.wgsl"))),
    });
    let env_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("env"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/env.wgsl"))),
    });

    let cubemap = match cubemap::load_cubemap(device, queue, Path::new("cubemaps")) {
      Ok(cubemap) => cubemap,
      Err(err) => {
        log::warn!("falling back to solid environment: {err}");
        cubemap::solid_cubemap(device, queue, [2, 2, 8, 255])
      }
    };

    let draw_params = DrawParams {
      velocity_cutoff: sim_config.velocity_cutoff,
      particle_scale: 0.08,
      _pad: [0.0; 2],
    };
    let draw_param_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Draw Parameter Buffer"),
      contents: bytemuck::cast_slice(&[draw_params]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    // Shared clip-space quad, drawn as a 4-vertex strip by both pipelines.
    let quad_data: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
    let quad_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Quad Vertex Buffer"),
      contents: bytemuck::cast_slice(&quad_data),
      usage: wgpu::BufferUsages::VERTEX,
    });

    // ========================================================================
    // environment pipeline
    // ========================================================================

    let env_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      entries: &[
        wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::FRAGMENT,
          ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::Cube,
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
      ],
      label: Some("env_bind_group_layout"),
    });
    let env_bind_group = Self::env_bind_group(device, &env_bind_group_layout, &cubemap);

    let env_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("env"),
      bind_group_layouts: &[camera_bind_group_layout, &env_bind_group_layout],
      push_constant_ranges: &[],
    });
    let quad_layout = wgpu::VertexBufferLayout {
      array_stride: 2 * 4,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![0 => Float32x2],
    };
    let env_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Env Pipeline"),
      layout: Some(&env_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &env_shader,
        entry_point: "main_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[quad_layout],
      },
      fragment: Some(wgpu::FragmentState {
        module: &env_shader,
        entry_point: "main_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(config.view_formats[0].into())],
      }),
      primitive: wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleStrip,
        ..wgpu::PrimitiveState::default()
      },
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    // ========================================================================
    // particle pipeline
    // ========================================================================

    let particle_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
          wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
              ty: wgpu::BufferBindingType::Uniform,
              has_dynamic_offset: false,
              min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawParams>() as _),
            },
            count: None,
          },
          wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
              ty: wgpu::BufferBindingType::Storage { read_only: true },
              has_dynamic_offset: false,
              min_binding_size: wgpu::BufferSize::new(
                u64::from(store.count()) * std::mem::size_of::<Particle>() as u64,
              ),
            },
            count: None,
          },
        ],
        label: Some("particle_bind_group_layout"),
      });

    let mut particle_bind_groups = Vec::with_capacity(2);
    for buffer in [store.front(), store.back()] {
      particle_bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &particle_bind_group_layout,
        entries: &[
          wgpu::BindGroupEntry {
            binding: 0,
            resource: draw_param_buffer.as_entire_binding(),
          },
          wgpu::BindGroupEntry {
            binding: 1,
            resource: buffer.as_entire_binding(),
          },
        ],
        label: None,
      }));
    }

    let particle_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("particles"),
      bind_group_layouts: &[camera_bind_group_layout, &particle_bind_group_layout],
      push_constant_ranges: &[],
    });
    // The index sequence addresses particles; logically always the
    // identity permutation.
    let index_layout = wgpu::VertexBufferLayout {
      array_stride: 4,
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &wgpu::vertex_attr_array![0 => Uint32],
    };
    let corner_layout = wgpu::VertexBufferLayout {
      array_stride: 2 * 4,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![1 => Float32x2],
    };
    let particle_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Particle Pipeline"),
      layout: Some(&particle_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &particle_shader,
        entry_point: "main_vs",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[index_layout, corner_layout],
      },
      fragment: Some(wgpu::FragmentState {
        module: &particle_shader,
        entry_point: "main_fs",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(wgpu::ColorTargetState {
          format: config.view_formats[0],
          blend: Some(wgpu::BlendState::ALPHA_BLENDING),
          write_mask: wgpu::ColorWrites::ALL,
        })],
      }),
      primitive: wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleStrip,
        ..wgpu::PrimitiveState::default()
      },
      depth_stencil: None,
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
      log::error!("render pipeline build diagnostics: {error}");
    }

    Self {
      env_pipeline,
      env_bind_group,
      particle_pipeline,
      particle_bind_groups,
      quad_vertices,
      num_particles: store.count(),
    }
  }

  fn env_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    cubemap: &CubemapTexture,
  ) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout,
      entries: &[
        wgpu::BindGroupEntry {
          binding: 0,
          resource: wgpu::BindingResource::TextureView(&cubemap.view),
        },
        wgpu::BindGroupEntry {
          binding: 1,
          resource: wgpu::BindingResource::Sampler(&cubemap.sampler),
        },
      ],
      label: Some("env_bind_group"),
    })
  }

  /// Encode and submit one frame. When `step` is set, the gravity pass runs
  /// first against the current orientation and the buffer roles exchange,
  /// so the render pass reads the freshly written front buffer. Everything
  /// shares one encoder and one submission: the pass boundary is the
  /// completion barrier required before anyone reads the step's output, and
  /// frames cannot overlap.
  pub fn render(
    &mut self,
    view: &wgpu::TextureView,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    camera_bind_group: &wgpu::BindGroup,
    store: &mut ParticleStore,
    kernel: &GravityKernel,
    step: bool,
  ) {
    let mut command_encoder =
      device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

    if step {
      kernel.encode(&mut command_encoder, store.front_index());
      store.swap();
    }

    {
      let color_attachments = [Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
          load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
          store: wgpu::StoreOp::Store,
        },
      })];
      let mut rpass = command_encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: None,
        color_attachments: &color_attachments,
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
      });

      // Sky first, particles blended over it.
      rpass.set_pipeline(&self.env_pipeline);
      rpass.set_bind_group(0, camera_bind_group, &[]);
      rpass.set_bind_group(1, &self.env_bind_group, &[]);
      rpass.set_vertex_buffer(0, self.quad_vertices.slice(..));
      rpass.draw(0..4, 0..1);

      rpass.set_pipeline(&self.particle_pipeline);
      rpass.set_bind_group(0, camera_bind_group, &[]);
      rpass.set_bind_group(1, &self.particle_bind_groups[store.front_index()], &[]);
      rpass.set_vertex_buffer(0, store.index_buffer().slice(..));
      rpass.set_vertex_buffer(1, self.quad_vertices.slice(..));
      rpass.draw(0..4, 0..self.num_particles);
    }

    queue.submit(Some(command_encoder.finish()));
  }
}
