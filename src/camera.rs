use cgmath::{Matrix, Matrix3, Matrix4, Rad, SquareMatrix, Vector3};
use winit::event::{ElementState, MouseButton, WindowEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

const FOV_Y: Rad<f32> = Rad(0.698132);
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 1000.0;

/// Smallest allowed orbit distance; keeps the view matrix non-degenerate
/// when zooming all the way in.
const MIN_DISTANCE: f32 = 0.1;

/// Camera orbiting the origin, parameterized by a distance and two angles.
/// Every derived field is a pure function of those three scalars and is
/// recomputed by `update` whenever any of them changes.
pub struct OrbitCamera {
  pub distance: f32,
  pub yaw: f32,
  pub pitch: f32,
  projection: Matrix4<f32>,
  rotation: Matrix3<f32>,
  rotation_inverse: Matrix3<f32>,
  view: Matrix4<f32>,
  inverse_view_proj: Matrix4<f32>,
}

impl OrbitCamera {
  /// Zero angles, default distance: the rotation starts as the identity.
  #[must_use]
  pub fn new(aspect: f32) -> Self {
    let mut camera = Self {
      distance: 30.0,
      yaw: 0.0,
      pitch: 0.0,
      projection: cgmath::perspective(FOV_Y, aspect, Z_NEAR, Z_FAR),
      rotation: Matrix3::identity(),
      rotation_inverse: Matrix3::identity(),
      view: Matrix4::identity(),
      inverse_view_proj: Matrix4::identity(),
    };
    camera.update();
    camera
  }

  /// Recompute all derived matrices from distance + angles.
  pub fn update(&mut self) {
    self.rotation = Matrix3::from_angle_x(Rad(self.pitch)) * Matrix3::from_angle_y(Rad(self.yaw));
    // Orthonormal, so the transpose is the exact inverse.
    self.rotation_inverse = self.rotation.transpose();

    let translation = Matrix4::from_translation(Vector3::new(0.0, 0.0, -self.distance));
    let rotation = Matrix4::from(self.rotation);
    self.view = OPENGL_TO_WGPU_MATRIX * self.projection * translation * rotation;
    // Direction-only transform for environment sampling: no translation.
    self.inverse_view_proj = (OPENGL_TO_WGPU_MATRIX * self.projection * rotation)
      .invert()
      .expect("perspective * rotation is invertible");
  }

  pub fn view(&self) -> Matrix4<f32> {
    self.view
  }

  pub fn inverse_view_proj(&self) -> Matrix4<f32> {
    self.inverse_view_proj
  }

  pub fn rotation(&self) -> Matrix3<f32> {
    self.rotation
  }

  pub fn rotation_inverse(&self) -> Matrix3<f32> {
    self.rotation_inverse
  }

  /// World-space eye position via spherical conversion, exposed for any
  /// consumer that needs the camera location rather than its matrices.
  #[must_use]
  pub fn eye_position(&self) -> Vector3<f32> {
    Vector3::new(
      -self.distance * self.yaw.sin() * self.pitch.cos(),
      self.distance * self.pitch.sin(),
      self.distance * self.yaw.cos() * self.pitch.cos(),
    )
  }
}

/// Camera matrices in shader layout. The mat3 inverse rotation travels as
/// three vec4 columns to satisfy uniform alignment.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
  view: [[f32; 4]; 4],
  inverse_view_proj: [[f32; 4]; 4],
  rotation_inverse: [[f32; 4]; 3],
  eye: [f32; 3],
  _pad: f32,
}

impl CameraUniform {
  #[must_use]
  pub fn new() -> Self {
    let mut uniform = Self {
      view: Matrix4::identity().into(),
      inverse_view_proj: Matrix4::identity().into(),
      rotation_inverse: [[0.0; 4]; 3],
      eye: [0.0; 3],
      _pad: 0.0,
    };
    uniform.rotation_inverse = pad_mat3(Matrix3::identity());
    uniform
  }

  pub fn update(&mut self, camera: &OrbitCamera) {
    self.view = camera.view().into();
    self.inverse_view_proj = camera.inverse_view_proj().into();
    self.rotation_inverse = pad_mat3(camera.rotation_inverse());
    self.eye = camera.eye_position().into();
  }
}

impl Default for CameraUniform {
  fn default() -> Self {
    Self::new()
  }
}

fn pad_mat3(m: Matrix3<f32>) -> [[f32; 4]; 3] {
  [
    [m.x.x, m.x.y, m.x.z, 0.0],
    [m.y.x, m.y.y, m.y.z, 0.0],
    [m.z.x, m.z.y, m.z.z, 0.0],
  ]
}

/// Translates pointer input into orbit/zoom changes. The previous sample is
/// remembered only while a button is held; the first move after a press
/// primes it, so a drag can never begin with a spurious large delta.
pub struct CameraController {
  sensitivity: f32,
  primary_down: bool,
  secondary_down: bool,
  prev: Option<(f64, f64)>,
}

impl CameraController {
  #[must_use]
  pub fn init(sensitivity: f32) -> Self {
    Self {
      sensitivity,
      primary_down: false,
      secondary_down: false,
      prev: None,
    }
  }

  /// Returns true when the event changed camera state.
  pub fn process_events(&mut self, event: &WindowEvent, camera: &mut OrbitCamera) -> bool {
    match event {
      WindowEvent::MouseInput { state, button, .. } => {
        let held = *state == ElementState::Pressed;
        match button {
          MouseButton::Left => {
            self.set_primary(held);
            true
          }
          MouseButton::Right => {
            self.set_secondary(held);
            true
          }
          _ => false,
        }
      }
      WindowEvent::CursorMoved { position, .. } => {
        self.pointer_moved(position.x, position.y, camera)
      }
      _ => false,
    }
  }

  pub fn set_primary(&mut self, held: bool) {
    self.primary_down = held;
    if !self.primary_down && !self.secondary_down {
      self.prev = None;
    }
  }

  pub fn set_secondary(&mut self, held: bool) {
    self.secondary_down = held;
    if !self.primary_down && !self.secondary_down {
      self.prev = None;
    }
  }

  pub fn pointer_moved(&mut self, x: f64, y: f64, camera: &mut OrbitCamera) -> bool {
    if !self.primary_down && !self.secondary_down {
      return false;
    }
    let (prev_x, prev_y) = self.prev.unwrap_or((x, y));
    let dx = (x - prev_x) as f32;
    let dy = (y - prev_y) as f32;

    if self.primary_down {
      camera.yaw += self.sensitivity * dx;
      camera.pitch += self.sensitivity * dy;
    }
    if self.secondary_down {
      // Raw delta, deliberately unscaled by sensitivity.
      camera.distance = (camera.distance + dy).max(MIN_DISTANCE);
    }
    camera.update();
    self.prev = Some((x, y));
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn matrices_close(a: Matrix3<f32>, b: Matrix3<f32>) -> bool {
    let a: [[f32; 3]; 3] = a.into();
    let b: [[f32; 3]; 3] = b.into();
    a.iter()
      .flatten()
      .zip(b.iter().flatten())
      .all(|(x, y)| (x - y).abs() < 1e-6)
  }

  #[test]
  fn default_rotation_is_identity() {
    let camera = OrbitCamera::new(1.5);
    assert!(matrices_close(camera.rotation(), Matrix3::identity()));
    assert!(matrices_close(camera.rotation_inverse(), Matrix3::identity()));
  }

  #[test]
  fn drag_begin_applies_no_spurious_delta() {
    let mut camera = OrbitCamera::new(1.5);
    let mut controller = CameraController::init(0.005);

    controller.set_primary(true);
    // First sample after the press lands far from wherever the pointer was
    // before; it must only prime the previous-position memory.
    controller.pointer_moved(500.0, 400.0, &mut camera);
    assert_eq!(camera.yaw, 0.0);
    assert_eq!(camera.pitch, 0.0);

    controller.pointer_moved(510.0, 400.0, &mut camera);
    assert!((camera.yaw - 0.05).abs() < 1e-6);
  }

  #[test]
  fn release_clears_previous_sample() {
    let mut camera = OrbitCamera::new(1.5);
    let mut controller = CameraController::init(0.005);

    controller.set_primary(true);
    controller.pointer_moved(100.0, 100.0, &mut camera);
    controller.set_primary(false);

    // A new drag starting elsewhere must re-prime instead of jumping.
    controller.set_primary(true);
    controller.pointer_moved(900.0, 900.0, &mut camera);
    assert_eq!(camera.yaw, 0.0);
  }

  #[test]
  fn zoom_clamps_to_minimum_distance() {
    let mut camera = OrbitCamera::new(1.5);
    let mut controller = CameraController::init(0.005);

    controller.set_secondary(true);
    controller.pointer_moved(0.0, 0.0, &mut camera);
    controller.pointer_moved(0.0, -10000.0, &mut camera);
    assert!(camera.distance >= MIN_DISTANCE);
  }

  #[test]
  fn eye_position_matches_distance() {
    use cgmath::InnerSpace;
    let mut camera = OrbitCamera::new(1.5);
    camera.yaw = -0.5;
    camera.pitch = 0.5;
    camera.update();
    assert!((camera.eye_position().magnitude() - camera.distance).abs() < 1e-3);
  }
}
