use crate::{Particle, SimConfig};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::f32::consts::TAU;
use wgpu::util::DeviceExt;

/// Sample the initial particle set: positions uniform over a disk of the
/// given radius and a slab of the given height, velocities uniform inside a
/// centered axis-aligned box, masses uniform in `[min_mass, max_mass]`.
/// Bit-reproducible for a fixed seed.
#[must_use]
pub fn generate(config: &SimConfig) -> Vec<Particle> {
  let mut rng = SmallRng::seed_from_u64(config.seed);
  let mut particles = Vec::with_capacity(config.num_particles as usize);
  for _ in 0..config.num_particles {
    let pos = random_disk_position(&mut rng, config.disk_radius, config.disk_height);
    let vel = random_box_velocity(&mut rng, config.velocity_extent);
    let mass = rng.gen_range(config.min_mass..=config.max_mass);
    particles.push(Particle::new(pos, vel, mass));
  }
  particles
}

// sqrt on the radial sample keeps the areal density uniform; a plain
// uniform radius would cluster particles at the center.
fn random_disk_position(rng: &mut SmallRng, radius: f32, height: f32) -> [f32; 3] {
  let angle = rng.gen_range(0.0..TAU);
  let distance = rng.gen_range(0.0f32..1.0).sqrt() * radius;
  let y = rng.gen_range(-height / 2.0..=height / 2.0);
  [distance * angle.cos(), y, distance * angle.sin()]
}

fn random_box_velocity(rng: &mut SmallRng, extent: f32) -> [f32; 3] {
  let half = extent / 2.0;
  [
    rng.gen_range(-half..=half),
    rng.gen_range(-half..=half),
    rng.gen_range(-half..=half),
  ]
}

/// Index sequence used to address particles during rendering. Logically
/// always the identity permutation; re-materialized on reset.
#[must_use]
pub fn identity_indices(count: u32) -> Vec<u32> {
  (0..count).collect()
}

/// An owned pair of buffers tagged with front/back roles. `swap` is a true
/// two-way role exchange: after it, front is whichever member was back, and
/// vice versa. No data moves.
pub struct DoubleBuffer<T> {
  pair: [T; 2],
  front: usize,
}

impl<T> DoubleBuffer<T> {
  pub fn new(front: T, back: T) -> Self {
    Self {
      pair: [front, back],
      front: 0,
    }
  }

  pub fn front(&self) -> &T {
    &self.pair[self.front]
  }

  pub fn back(&self) -> &T {
    &self.pair[1 - self.front]
  }

  pub fn swap(&mut self) {
    self.front = 1 - self.front;
  }

  /// Which member currently holds the front role (0 or 1).
  pub fn front_index(&self) -> usize {
    self.front
  }
}

/// Owns the GPU-resident particle state: the ping-pong buffer pair, the
/// index sequence buffer, and a cached copy of the initial set for reset.
pub struct ParticleStore {
  initial: Vec<Particle>,
  buffers: DoubleBuffer<wgpu::Buffer>,
  index_buffer: wgpu::Buffer,
  count: u32,
}

impl ParticleStore {
  #[must_use]
  pub fn new(device: &wgpu::Device, config: &SimConfig) -> Self {
    let initial = generate(config);

    let particle_buffer = |i: usize| {
      device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("Particle Buffer {i}")),
        contents: bytemuck::cast_slice(&initial),
        usage: wgpu::BufferUsages::VERTEX
          | wgpu::BufferUsages::STORAGE
          | wgpu::BufferUsages::COPY_DST,
      })
    };
    let front = particle_buffer(0);
    let back = particle_buffer(1);

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Particle Index Buffer"),
      contents: bytemuck::cast_slice(&identity_indices(config.num_particles)),
      usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });

    Self {
      initial,
      buffers: DoubleBuffer::new(front, back),
      index_buffer,
      count: config.num_particles,
    }
  }

  /// Repopulate both buffers with the cached initial set and restore the
  /// identity index sequence. The caller must only invoke this between
  /// frames; queue ordering then makes the rewrite visible to every later
  /// submission, so no step can observe a partial reset.
  pub fn reset(&mut self, queue: &wgpu::Queue) {
    let bytes: &[u8] = bytemuck::cast_slice(&self.initial);
    queue.write_buffer(self.buffers.front(), 0, bytes);
    queue.write_buffer(self.buffers.back(), 0, bytes);
    queue.write_buffer(
      &self.index_buffer,
      0,
      bytemuck::cast_slice(&identity_indices(self.count)),
    );
  }

  pub fn swap(&mut self) {
    self.buffers.swap();
  }

  pub fn front(&self) -> &wgpu::Buffer {
    self.buffers.front()
  }

  pub fn back(&self) -> &wgpu::Buffer {
    self.buffers.back()
  }

  /// Ping-pong orientation, used to pick the matching compute bind group.
  pub fn front_index(&self) -> usize {
    self.buffers.front_index()
  }

  pub fn index_buffer(&self) -> &wgpu::Buffer {
    &self.index_buffer
  }

  pub fn count(&self) -> u32 {
    self.count
  }

  pub fn initial(&self) -> &[Particle] {
    &self.initial
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn swap_is_its_own_inverse() {
    let mut buffer = DoubleBuffer::new('a', 'b');
    assert_eq!(*buffer.front(), 'a');
    assert_eq!(*buffer.back(), 'b');

    buffer.swap();
    assert_eq!(*buffer.front(), 'b');
    assert_eq!(*buffer.back(), 'a');

    buffer.swap();
    assert_eq!(*buffer.front(), 'a');
    assert_eq!(*buffer.back(), 'b');
  }

  #[test]
  fn swap_exchanges_roles_both_ways() {
    let mut buffer = DoubleBuffer::new(0, 1);
    buffer.swap();
    // A one-way assignment would leave both roles on the same member.
    assert_ne!(buffer.front(), buffer.back());
  }

  #[test]
  fn indices_are_identity() {
    let indices = identity_indices(5);
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
  }
}
