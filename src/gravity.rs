use crate::particles::ParticleStore;
use crate::{Particle, SimParams};
use cgmath::{InnerSpace, Vector3};
use std::borrow::Cow;
use wgpu::{util::DeviceExt, PipelineCompilationOptions};

const PARTICLES_PER_GROUP: u32 = 64;

/// Advance the particle set by one step on the CPU, writing results into
/// `back`. Same arithmetic as `shaders/gravity.wgsl`: softened O(n²)
/// pairwise gravity, then semi-implicit Euler (position integrates the
/// updated velocity). Reads only `front`, writes only `back`.
pub fn step_cpu(params: &SimParams, front: &[Particle], back: &mut [Particle]) {
  for (i, out) in back.iter_mut().enumerate() {
    let pos = Vector3::from([front[i].pos[0], front[i].pos[1], front[i].pos[2]]);
    let vel = Vector3::from([front[i].vel[0], front[i].vel[1], front[i].vel[2]]);

    let mut acc = Vector3::new(0.0f32, 0.0, 0.0);
    for other in front {
      let r = Vector3::from([other.pos[0], other.pos[1], other.pos[2]]) - pos;
      // The i == j term has a zero numerator over a positive softened
      // denominator, so self-interaction contributes exactly nothing.
      let dist_sq = r.magnitude2() + params.softening;
      acc += r * (params.gravity * other.mass / (dist_sq * dist_sq.sqrt()));
    }

    let new_vel = vel + acc * params.delta_t;
    let new_pos = pos + new_vel * params.delta_t;
    *out = Particle::new(new_pos.into(), new_vel.into(), front[i].mass);
  }
}

/// GPU gravity step: one compute worker per particle, dispatched over the
/// ping-pong buffer pair. Workers read the front buffer and write the back
/// buffer only; the pass boundary inside the frame's command encoder is the
/// completion barrier before anything reads the results.
pub struct GravityKernel {
  compute_pipeline: wgpu::ComputePipeline,
  bind_groups: Vec<wgpu::BindGroup>,
  work_group_count: u32,
}

impl GravityKernel {
  #[must_use]
  pub fn init(device: &wgpu::Device, params: SimParams, store: &ParticleStore) -> Self {
    let compute_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("gravity"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/gravity.wgsl"))),
    });

    let param_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Simulation Parameter Buffer"),
      contents: bytemuck::cast_slice(&[params]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let particle_bytes = u64::from(params.num_particles) * std::mem::size_of::<Particle>() as u64;
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      entries: &[
        wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::COMPUTE,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<SimParams>() as _),
          },
          count: None,
        },
        wgpu::BindGroupLayoutEntry {
          binding: 1,
          visibility: wgpu::ShaderStages::COMPUTE,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(particle_bytes),
          },
          count: None,
        },
        wgpu::BindGroupLayoutEntry {
          binding: 2,
          visibility: wgpu::ShaderStages::COMPUTE,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(particle_bytes),
          },
          count: None,
        },
      ],
      label: Some("gravity_bind_group_layout"),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("gravity"),
      bind_group_layouts: &[&bind_group_layout],
      push_constant_ranges: &[],
    });
    let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
      label: Some("Gravity pipeline"),
      layout: Some(&pipeline_layout),
      module: &compute_shader,
      entry_point: "main",
      compilation_options: PipelineCompilationOptions::default(),
      cache: None,
    });

    // One bind group per ping-pong orientation. The store starts with
    // member 0 as front, so group index == store.front_index().
    let oriented = [
      (store.front(), store.back()),
      (store.back(), store.front()),
    ];
    let mut bind_groups = Vec::with_capacity(2);
    for (input, output) in oriented {
      bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &bind_group_layout,
        entries: &[
          wgpu::BindGroupEntry {
            binding: 0,
            resource: param_buffer.as_entire_binding(),
          },
          wgpu::BindGroupEntry {
            binding: 1,
            resource: input.as_entire_binding(),
          },
          wgpu::BindGroupEntry {
            binding: 2,
            resource: output.as_entire_binding(),
          },
        ],
        label: None,
      }));
    }

    let work_group_count =
      (params.num_particles as f32 / PARTICLES_PER_GROUP as f32).ceil() as u32;

    Self {
      compute_pipeline,
      bind_groups,
      work_group_count,
    }
  }

  /// Encode one gravity step into the frame's command encoder. `orientation`
  /// is the store's current front index; functional output is independent of
  /// the workgroup batching.
  pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, orientation: usize) {
    let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
      label: Some("gravity"),
      timestamp_writes: None,
    });
    cpass.set_pipeline(&self.compute_pipeline);
    cpass.set_bind_group(0, &self.bind_groups[orientation], &[]);
    cpass.dispatch_workgroups(self.work_group_count, 1, 1);
  }
}
