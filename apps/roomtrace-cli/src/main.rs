use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use roomtrace_assets::SceneFile;
use roomtrace_input::{Action, MoveKey, MoveKeys};
use roomtrace_kernel::PartitionWarning;
use roomtrace_render::{FrameInputs, RayTraceDispatch, RecordingDevice};
use roomtrace_stream::Scene;
use roomtrace_tools::SceneInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roomtrace-cli", about = "CLI tool for room-partitioned ray-traced scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Scene file (.yaml/.yml/.json); the built-in demo when omitted
    #[arg(short, long, global = true)]
    scene: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and a scene summary
    Info,
    /// Print the room partition as an ASCII map plus per-room details
    Partition,
    /// Run headless frames against a recording device
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Output width in pixels
        #[arg(long, default_value = "640")]
        width: u32,
        /// Output height in pixels
        #[arg(long, default_value = "480")]
        height: u32,
        /// Hold the forward key for the whole run
        #[arg(long)]
        walk: bool,
        /// Yaw added per frame, in degrees
        #[arg(long, default_value = "0")]
        turn: f32,
    },
    /// Load and build the scene, failing on any error
    Validate {
        /// Treat partition warnings as errors
        #[arg(long)]
        strict: bool,
    },
    /// Write the built-in demo scene to a file
    ExportDemo {
        /// Destination (.yaml/.yml/.json)
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("roomtrace-cli v{}", env!("CARGO_PKG_VERSION"));
            let file = load(cli.scene.as_deref())?;
            let scene = file.build_scene()?;
            println!("{}", SceneInspector::summary(&scene));
            println!(
                "staging: spheres={} planes={} lights={} materials={}",
                file.config.staging.spheres,
                file.config.staging.planes,
                file.config.staging.lights,
                file.config.staging.materials
            );
        }
        Commands::Partition => {
            let file = load(cli.scene.as_deref())?;
            let scene = file.build_scene()?;
            let world = scene.world();
            print!(
                "{}",
                SceneInspector::ascii_map(world, Some(scene.observer().coordinate()))
            );
            for info in SceneInspector::rooms(world) {
                println!("{info}");
            }
            for warning in world.warnings() {
                println!("warning: {warning}");
            }
        }
        Commands::Simulate {
            frames,
            width,
            height,
            walk,
            turn,
        } => {
            let file = load(cli.scene.as_deref())?;
            let run = simulate(&file, frames, (width, height), walk, turn)?;
            println!(
                "uploaded={} frames={} transitions={} dropped={} commands={}",
                run.uploaded, run.frames, run.transitions, run.dropped, run.commands
            );
            println!("{}", SceneInspector::summary(&run.scene));
        }
        Commands::Validate { strict } => {
            let file = load(cli.scene.as_deref())?;
            let world = file.build_world()?;
            let warnings = world.warnings();
            for warning in warnings {
                match warning {
                    PartitionWarning::DegenerateRoom { .. } => println!("warning: {warning}"),
                }
            }
            if strict && !warnings.is_empty() {
                anyhow::bail!("{} partition warning(s)", warnings.len());
            }
            if file.materials.len() > file.config.staging.materials {
                println!(
                    "warning: {} materials exceed staging capacity {}",
                    file.materials.len(),
                    file.config.staging.materials
                );
            }
            println!(
                "OK: {} rooms, {} doors, {} lights, {} spheres",
                world.room_count(),
                world.door_count(),
                world.light_count(),
                world.sphere_count()
            );
        }
        Commands::ExportDemo { path } => {
            SceneFile::demo().save(&path)?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}

/// Outcome of a headless run.
struct Simulation {
    scene: Scene,
    uploaded: usize,
    frames: u64,
    transitions: u64,
    dropped: u64,
    commands: usize,
}

/// Drive `frames` update and render phases against a recording device, with
/// walk and look speeds taken from the scene's input config.
fn simulate(
    file: &SceneFile,
    frames: u64,
    resolution: (u32, u32),
    walk: bool,
    turn: f32,
) -> anyhow::Result<Simulation> {
    let mut scene = file.build_scene()?;
    let mut device = RecordingDevice::new();
    let uploaded = scene.world_mut().upload_meshes(&mut device)?;

    let mut dispatch = RayTraceDispatch::new(&file.config.staging, file.config.dispatch.clone());
    let input = file.config.input;
    let mut keys = MoveKeys::default();
    keys.set(MoveKey::Forward, walk);

    let mut transitions = 0u64;
    for frame in 0..frames {
        let rate = 1.0;
        keys.walk(&input, rate).apply(&mut scene);
        Action::Look {
            d_theta: turn,
            d_phi: 0.0,
        }
        .apply(&mut scene);

        let update = scene.update(rate);
        if update.room_changed {
            transitions += 1;
            println!(
                "frame {frame}: entered {}",
                update
                    .current_room
                    .map_or_else(|| "none".to_string(), |id| id.to_string())
            );
        }

        let inputs = FrameInputs {
            world: scene.world(),
            active: scene.active_rooms(),
            observer: scene.observer(),
            materials: &file.materials,
            resolution,
        };
        let stats = dispatch.render_frame(&mut device, &inputs);
        tracing::trace!(frame, ?stats, "frame rendered");
    }

    if !device.frames_are_ordered() {
        anyhow::bail!("recorded command stream is out of order");
    }
    Ok(Simulation {
        scene,
        uploaded,
        frames: dispatch.frames(),
        transitions,
        dropped: dispatch.dropped_total(),
        commands: device.commands().len(),
    })
}

fn load(path: Option<&Path>) -> anyhow::Result<SceneFile> {
    Ok(match path {
        Some(path) => SceneFile::load(path)?,
        None => SceneFile::demo(),
    })
}
