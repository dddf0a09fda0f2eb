pub mod camera;
pub mod cubemap;
pub mod gravity;
pub mod particles;
pub mod render;
pub mod state;

/// Uniform parameters consumed by the gravity compute shader. Layout must
/// match `shaders/gravity.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimParams {
  pub delta_t: f32,
  pub gravity: f32,
  pub softening: f32,
  pub num_particles: u32,
}

impl Default for SimParams {
  fn default() -> Self {
    Self {
      delta_t: 0.004,
      gravity: 0.001,
      softening: 0.1,
      num_particles: 2500,
    }
  }
}

/// One simulation particle, 48 bytes, shared bit-for-bit with the WGSL
/// `Particle` struct. The w components and the tail padding are always zero.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
  pub pos: [f32; 4],
  pub vel: [f32; 4],
  pub mass: f32,
  pub _pad: [f32; 3],
}

impl Particle {
  #[must_use]
  pub fn new(pos: [f32; 3], vel: [f32; 3], mass: f32) -> Self {
    Self {
      pos: [pos[0], pos[1], pos[2], 0.0],
      vel: [vel[0], vel[1], vel[2], 0.0],
      mass,
      _pad: [0.0; 3],
    }
  }
}

/// Startup configuration. There is no persisted config file; everything
/// here arrives from the CLI or falls back to these defaults.
#[derive(Copy, Clone, Debug)]
pub struct SimConfig {
  pub num_particles: u32,
  pub min_mass: f32,
  pub max_mass: f32,
  pub disk_radius: f32,
  pub disk_height: f32,
  pub velocity_extent: f32,
  pub velocity_cutoff: f32,
  pub sensitivity: f32,
  pub width: u32,
  pub height: u32,
  pub seed: u64,
}

impl Default for SimConfig {
  fn default() -> Self {
    Self {
      num_particles: 2500,
      min_mass: 1.0,
      max_mass: 50.0,
      disk_radius: 10.0,
      disk_height: 1.0,
      velocity_extent: 0.5,
      velocity_cutoff: 0.3, // fastest color beyond this speed
      sensitivity: 0.005,
      width: 900,
      height: 600,
      seed: 42,
    }
  }
}

impl SimConfig {
  #[must_use]
  pub fn sim_params(&self) -> SimParams {
    SimParams {
      num_particles: self.num_particles,
      ..SimParams::default()
    }
  }
}
