use crate::camera::{CameraController, CameraUniform, OrbitCamera};
use crate::gravity::{self, GravityKernel};
use crate::particles::{self, ParticleStore};
use crate::render::Render;
use crate::SimConfig;
use cgmath::{InnerSpace, Vector3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wgpu::util::DeviceExt;
use winit::event::ElementState;
use winit::keyboard::*;
use winit::{
  dpi::PhysicalSize,
  event::{Event, KeyEvent, StartCause, WindowEvent},
  event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
  window::Window,
};

/// Target frame interval, independent of the surface's own pacing.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Whether gravity steps are being issued. Starts paused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunState {
  Paused,
  Running,
}

impl RunState {
  #[must_use]
  pub fn toggled(self) -> Self {
    match self {
      Self::Paused => Self::Running,
      Self::Running => Self::Paused,
    }
  }
}

/// Transient reset axis: entering `Resetting` replaces the particle state at
/// the top of the next frame, before any step may be issued, then returns to
/// `Active`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResetState {
  Active,
  Resetting,
}

struct EventLoopWrapper {
  event_loop: EventLoop<()>,
  window: Arc<Window>,
}

impl EventLoopWrapper {
  pub fn new(title: &str, size: PhysicalSize<u32>) -> Self {
    let event_loop = EventLoop::new().expect("could not create event loop");
    let mut builder = winit::window::WindowBuilder::new();
    builder = builder
      .with_title(title)
      .with_inner_size(size)
      .with_resizable(false);
    let window = Arc::new(builder.build(&event_loop).expect("could not create window"));

    Self { event_loop, window }
  }
}

struct SurfaceWrapper {
  surface: Option<wgpu::Surface<'static>>,
  config: Option<wgpu::SurfaceConfiguration>,
}

impl SurfaceWrapper {
  fn new() -> Self {
    Self {
      surface: None,
      config: None,
    }
  }

  fn resume(&mut self, context: &State, window: Arc<Window>) {
    let window_size = window.inner_size();
    let width = window_size.width.max(1);
    let height = window_size.height.max(1);
    self.surface = Some(
      context
        .instance
        .create_surface(window)
        .expect("could not create surface"),
    );
    let surface = self.surface.as_ref().unwrap();
    let mut config = surface
      .get_default_config(&context.adapter, width, height)
      .expect("surface is not supported by the adapter");
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    surface.configure(&context.device, &config);
    self.config = Some(config);
  }

  fn acquire(&mut self, context: &State) -> wgpu::SurfaceTexture {
    let surface = self.surface.as_ref().unwrap();

    match surface.get_current_texture() {
      Ok(frame) => frame,
      Err(wgpu::SurfaceError::Timeout) => surface.get_current_texture().unwrap(),
      Err(
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost | wgpu::SurfaceError::OutOfMemory,
      ) => {
        surface.configure(&context.device, self.config());
        surface.get_current_texture().unwrap()
      }
    }
  }

  fn suspend(&mut self) {}

  fn config(&self) -> &wgpu::SurfaceConfiguration {
    self.config.as_ref().unwrap()
  }
}

/// The simulation context: GPU handles, camera stack, and the two state
/// machine axes. Owned by the event loop and passed by reference to each
/// component; there is no hidden global state.
struct State {
  instance: wgpu::Instance,
  adapter: wgpu::Adapter,
  device: wgpu::Device,
  queue: wgpu::Queue,
  camera: OrbitCamera,
  camera_uniform: CameraUniform,
  camera_buffer: wgpu::Buffer,
  camera_bind_group: wgpu::BindGroup,
  camera_bind_group_layout: wgpu::BindGroupLayout,
  camera_controller: CameraController,
  run_state: RunState,
  reset_state: ResetState,
}

impl State {
  /// Route input to the camera controller and the command keys. Returns
  /// true when the event was consumed.
  fn input(&mut self, event: &WindowEvent) -> bool {
    if self.camera_controller.process_events(event, &mut self.camera) {
      return true;
    }
    match event {
      WindowEvent::KeyboardInput {
        event:
          KeyEvent {
            state: ElementState::Released,
            physical_key: PhysicalKey::Code(keycode),
            ..
          },
        ..
      } => match keycode {
        KeyCode::Space => {
          self.run_state = self.run_state.toggled();
          log::info!("simulation {:?}", self.run_state);
          true
        }
        KeyCode::KeyR => {
          self.reset_state = ResetState::Resetting;
          true
        }
        _ => false,
      },
      _ => false,
    }
  }

  fn update(&mut self) {
    self.camera_uniform.update(&self.camera);
    self.queue.write_buffer(
      &self.camera_buffer,
      0,
      bytemuck::cast_slice(&[self.camera_uniform]),
    );
  }

  async fn init(surface: &SurfaceWrapper, config: &SimConfig) -> Self {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
      backends: wgpu::Backends::PRIMARY,
      ..Default::default()
    });

    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: surface.surface.as_ref(),
        force_fallback_adapter: false,
      })
      .await
      .expect("no suitable GPU adapter found");

    let (device, queue) = adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: None,
          required_features: wgpu::Features::empty(),
          required_limits: wgpu::Limits::default(),
          memory_hints: Default::default(),
        },
        None,
      )
      .await
      .expect("could not acquire GPU device");

    let mut camera = OrbitCamera::new(config.width as f32 / config.height as f32);
    camera.yaw = -0.5;
    camera.pitch = 0.5;
    camera.update();

    let mut camera_uniform = CameraUniform::new();
    camera_uniform.update(&camera);

    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Camera Buffer"),
      contents: bytemuck::cast_slice(&[camera_uniform]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let camera_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
          },
          count: None,
        }],
        label: Some("camera_bind_group_layout"),
      });
    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &camera_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: camera_buffer.as_entire_binding(),
      }],
      label: Some("camera_bind_group"),
    });
    let camera_controller = CameraController::init(config.sensitivity);

    Self {
      instance,
      adapter,
      device,
      queue,
      camera,
      camera_uniform,
      camera_buffer,
      camera_bind_group,
      camera_bind_group_layout,
      camera_controller,
      run_state: RunState::Paused,
      reset_state: ResetState::Active,
    }
  }
}

async fn start(config: SimConfig) {
  let window_loop = EventLoopWrapper::new(
    "3D N-Body",
    PhysicalSize::new(config.width, config.height),
  );
  let mut surface = SurfaceWrapper::new();
  let mut context = State::init(&surface, &config).await;

  let mut store = ParticleStore::new(&context.device, &config);
  let kernel = GravityKernel::init(&context.device, config.sim_params(), &store);
  let mut renderer = None;
  let mut next_frame = Instant::now();

  let event_loop_function = EventLoop::run;
  let _ = (event_loop_function)(
    window_loop.event_loop,
    move |event, target: &EventLoopWindowTarget<()>| match event {
      Event::NewEvents(StartCause::Init) => {
        surface.resume(&context, window_loop.window.clone());
        if renderer.is_none() {
          renderer = Some(Render::init(
            surface.config(),
            &context.adapter,
            &context.device,
            &context.queue,
            &context.camera_bind_group_layout,
            &store,
            &config,
          ));
        }
        window_loop.window.request_redraw();
      }
      Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
        window_loop.window.request_redraw();
      }
      Event::Suspended => {
        surface.suspend();
      }
      Event::WindowEvent { event, window_id } if window_id == window_loop.window.id() => {
        if !context.input(&event) {
          match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
              event:
                KeyEvent {
                  state: ElementState::Pressed,
                  physical_key: PhysicalKey::Code(KeyCode::Escape),
                  ..
                },
              ..
            } => target.exit(),
            WindowEvent::RedrawRequested => {
              if renderer.is_none() {
                return;
              }
              context.update();

              // Reset is linearized with stepping: it runs here, between
              // frames, before any step is encoded.
              if context.reset_state == ResetState::Resetting {
                store.reset(&context.queue);
                context.reset_state = ResetState::Active;
                log::info!("simulation reset");
              }

              let step = context.run_state == RunState::Running;
              if let Some(renderer) = &mut renderer {
                let frame = surface.acquire(&context);
                let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
                  format: Some(surface.config().view_formats[0]),
                  ..wgpu::TextureViewDescriptor::default()
                });
                renderer.render(
                  &view,
                  &context.device,
                  &context.queue,
                  &context.camera_bind_group,
                  &mut store,
                  &kernel,
                  step,
                );
                frame.present();
              }

              next_frame = Instant::now() + FRAME_INTERVAL;
              target.set_control_flow(ControlFlow::WaitUntil(next_frame));
            }
            _ => {}
          }
        }
      }
      _ => {}
    },
  );
}

/// Windowless mode: drive the CPU reference integrator and log aggregate
/// state until interrupted.
fn run_headless(config: SimConfig) {
  let params = config.sim_params();
  let mut front = particles::generate(&config);
  let mut back = front.clone();

  let running = Arc::new(AtomicBool::new(true));
  let flag = running.clone();
  ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
    .expect("could not set Ctrl-C handler");

  log::info!(
    "headless: {} particles, dt {}, G {}",
    config.num_particles,
    params.delta_t,
    params.gravity
  );

  let mut steps: u64 = 0;
  while running.load(Ordering::SeqCst) {
    gravity::step_cpu(&params, &front, &mut back);
    std::mem::swap(&mut front, &mut back);
    steps += 1;

    if steps % 64 == 0 {
      let mut momentum = Vector3::new(0.0f32, 0.0, 0.0);
      let mut extent = 0.0f32;
      for p in &front {
        momentum += Vector3::from([p.vel[0], p.vel[1], p.vel[2]]) * p.mass;
        extent = extent.max(Vector3::from([p.pos[0], p.pos[1], p.pos[2]]).magnitude());
      }
      log::info!(
        "step {steps}: |momentum| {:.4}, extent {extent:.2}",
        momentum.magnitude()
      );
    }
    std::thread::sleep(FRAME_INTERVAL);
  }
  log::info!("stopped after {steps} steps");
}

pub fn run(config: SimConfig, headless: bool) {
  env_logger::init();
  if headless {
    run_headless(config);
  } else {
    pollster::block_on(start(config));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn run_state_toggles_both_ways() {
    assert_eq!(RunState::Paused.toggled(), RunState::Running);
    assert_eq!(RunState::Running.toggled(), RunState::Paused);
  }
}
