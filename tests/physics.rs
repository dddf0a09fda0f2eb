use cgmath::{InnerSpace, Vector3};
use nbody_sim::gravity::step_cpu;
use nbody_sim::particles::{generate, identity_indices};
use nbody_sim::{Particle, SimConfig, SimParams};

/// Two equal-mass bodies at rest, separated along the x axis.
fn two_body_set(dist: f32, mass: f32) -> Vec<Particle> {
  vec![
    Particle::new([-dist / 2.0, 0.0, 0.0], [0.0; 3], mass),
    Particle::new([dist / 2.0, 0.0, 0.0], [0.0; 3], mass),
  ]
}

fn test_params(count: u32) -> SimParams {
  SimParams {
    num_particles: count,
    ..SimParams::default()
  }
}

fn vec3(p: &[f32; 4]) -> Vector3<f32> {
  Vector3::new(p[0], p[1], p[2])
}

// ==================================================================================
// Generation tests
// ==================================================================================

#[test]
fn generate_respects_count_and_domains() {
  let config = SimConfig {
    num_particles: 500,
    min_mass: 2.0,
    max_mass: 8.0,
    disk_radius: 5.0,
    disk_height: 0.5,
    ..SimConfig::default()
  };
  let particles = generate(&config);
  assert_eq!(particles.len(), 500);

  for p in &particles {
    assert!(p.mass >= 2.0 && p.mass <= 8.0, "mass out of range: {}", p.mass);
    let planar = (p.pos[0] * p.pos[0] + p.pos[2] * p.pos[2]).sqrt();
    assert!(planar <= 5.0 + 1e-4, "disk radius exceeded: {planar}");
    assert!(p.pos[1].abs() <= 0.25 + 1e-6, "slab height exceeded: {}", p.pos[1]);
    for c in 0..3 {
      assert!(p.vel[c].abs() <= config.velocity_extent / 2.0 + 1e-6);
    }
    assert_eq!(p.pos[3], 0.0);
    assert_eq!(p.vel[3], 0.0);
  }
}

#[test]
fn generation_is_reproducible_per_seed() {
  let config = SimConfig::default();
  // Reset restores exactly this: a fresh generation with the same
  // parameters and seed must be bit-identical.
  assert_eq!(generate(&config), generate(&config));

  let reseeded = SimConfig {
    seed: 7,
    ..SimConfig::default()
  };
  assert_ne!(generate(&config), generate(&reseeded));
}

#[test]
fn index_sequence_is_identity() {
  let indices = identity_indices(100);
  assert!(indices.iter().enumerate().all(|(i, &v)| v == i as u32));
}

// ==================================================================================
// Gravity step tests
// ==================================================================================

#[test]
fn two_body_step_is_mirror_symmetric() {
  // Masses large enough that one step moves the bodies by more than an ulp.
  let front = two_body_set(2.0, 5.0e5);
  let mut back = front.clone();
  let params = test_params(2);
  step_cpu(&params, &front, &mut back);

  let p0 = vec3(&back[0].pos);
  let p1 = vec3(&back[1].pos);
  let v0 = vec3(&back[0].vel);
  let v1 = vec3(&back[1].vel);

  // Both moved toward the origin by equal magnitude.
  assert!(p0.x > -1.0, "left body did not move inward");
  assert!(p1.x < 1.0, "right body did not move inward");
  assert!((p0.x + p1.x).abs() < 1e-6, "positions lost mirror symmetry");
  assert!((p0.y, p0.z) == (0.0, 0.0) && (p1.y, p1.z) == (0.0, 0.0));

  // Velocities point toward each other.
  assert!(v0.x > 0.0 && v1.x < 0.0);
  assert!((v0.x + v1.x).abs() < 1e-6);
}

#[test]
fn momentum_is_conserved_over_a_step() {
  let config = SimConfig {
    num_particles: 200,
    ..SimConfig::default()
  };
  let front = generate(&config);
  let mut back = front.clone();
  let params = test_params(200);

  // Accumulate in f64 so summation noise does not mask a real drift.
  let total = |set: &[Particle]| -> Vector3<f64> {
    set.iter().fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| {
      acc + vec3(&p.vel).cast::<f64>().unwrap() * f64::from(p.mass)
    })
  };
  let before = total(&front);
  step_cpu(&params, &front, &mut back);
  let after = total(&back);

  // A one-way buffer exchange or an asymmetric force sum would break this.
  assert!(
    (after - before).magnitude() < 1e-3,
    "momentum drifted: {:?} -> {:?}",
    before,
    after
  );
}

#[test]
fn single_particle_feels_no_self_interaction() {
  for softening in [1e-6, 0.1, 10.0] {
    let front = vec![Particle::new([3.0, -2.0, 1.0], [0.1, 0.0, 0.0], 50.0)];
    let mut back = front.clone();
    let params = SimParams {
      num_particles: 1,
      softening,
      ..SimParams::default()
    };
    step_cpu(&params, &front, &mut back);

    let vel = vec3(&back[0].vel);
    assert!(vel.x.is_finite() && vel.y.is_finite() && vel.z.is_finite());
    // Velocity unchanged: zero net acceleration.
    assert_eq!(vel, vec3(&front[0].vel), "softening {softening}");
    let expected = vec3(&front[0].pos) + vel * params.delta_t;
    assert!((vec3(&back[0].pos) - expected).magnitude() < 1e-6);
  }
}

#[test]
fn step_preserves_mass_and_padding() {
  let config = SimConfig {
    num_particles: 50,
    ..SimConfig::default()
  };
  let front = generate(&config);
  let mut back = front.clone();
  step_cpu(&test_params(50), &front, &mut back);

  for (before, after) in front.iter().zip(&back) {
    assert_eq!(before.mass, after.mass);
    assert_eq!(after.pos[3], 0.0);
    assert_eq!(after.vel[3], 0.0);
  }
}

#[test]
fn position_integrates_updated_velocity() {
  // Semi-implicit Euler: pos' = pos + vel' * dt, not pos + vel * dt.
  let front = two_body_set(2.0, 1.0e5);
  let mut back = front.clone();
  let params = test_params(2);
  step_cpu(&params, &front, &mut back);

  let v_new = vec3(&back[0].vel);
  let expected = vec3(&front[0].pos) + v_new * params.delta_t;
  assert!((vec3(&back[0].pos) - expected).magnitude() < 1e-7);
  // The bodies started at rest, so a plain explicit Euler step would not
  // move them at all.
  assert!(vec3(&back[0].pos) != vec3(&front[0].pos));
}
