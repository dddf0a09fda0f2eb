use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use nbody_sim::SimConfig;
use std::io;

/// Interactive N-body gravity visualizer
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Number of particles to simulate
  #[arg(short = 'n', long, default_value_t = 2500)]
  particles: u32,
  /// Minimum particle mass
  #[arg(long, default_value_t = 1.0)]
  min_mass: f32,
  /// Maximum particle mass
  #[arg(long, default_value_t = 50.0)]
  max_mass: f32,
  /// Radius of the initial particle disk
  #[arg(long, default_value_t = 10.0)]
  disk_radius: f32,
  /// Height of the initial particle disk
  #[arg(long, default_value_t = 1.0)]
  disk_height: f32,
  /// Speed at which particle color saturates
  #[arg(long, default_value_t = 0.3)]
  velocity_cutoff: f32,
  /// Orbit drag sensitivity
  #[arg(long, default_value_t = 0.005)]
  sensitivity: f32,
  /// Window width in pixels
  #[arg(long, default_value_t = 900)]
  width: u32,
  /// Window height in pixels
  #[arg(long, default_value_t = 600)]
  height: u32,
  /// Random seed for the initial particle set
  #[arg(long, default_value_t = 42)]
  seed: u64,
  /// Run in headless mode (no window, CPU integrator)
  #[arg(long, default_value_t = false)]
  headless: bool,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
}

fn main() {
  let args = Args::parse();

  if let Some(Commands::Completions { shell }) = args.command {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    return;
  }

  let config = SimConfig {
    num_particles: args.particles,
    min_mass: args.min_mass,
    max_mass: args.max_mass,
    disk_radius: args.disk_radius,
    disk_height: args.disk_height,
    velocity_cutoff: args.velocity_cutoff,
    sensitivity: args.sensitivity,
    width: args.width,
    height: args.height,
    seed: args.seed,
    ..SimConfig::default()
  };

  nbody_sim::state::run(config, args.headless);
}
