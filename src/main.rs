//! lantern - headless progressive path tracer.
//!
//! Renders a number of progressive frames of a sphere scene and writes the
//! accumulated image to a PNG.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use lantern_trace::{save_png, ComputeBackend, CpuBackend, GpuBackend, Lantern, RenderSettings, ResetPolicy, Scene};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SceneKind {
    /// Ground, a diffuse, a glass and a metal sphere
    Default,
    /// Grid of small random spheres around the three large ones
    Random,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendKind {
    Cpu,
    /// wgpu compute shader, falls back to cpu when no adapter is found
    Gpu,
}

#[derive(Parser, Debug)]
#[command(name = "lantern")]
#[command(about = "Progressive sphere path tracer", long_about = None)]
struct Cli {
    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Progressive frames to accumulate
    #[arg(short, long, default_value_t = 64)]
    frames: u32,

    /// Samples per pixel per frame
    #[arg(long, default_value_t = 1)]
    spp: u32,

    /// Maximum path length
    #[arg(long, default_value_t = 8)]
    bounces: u32,

    #[arg(long, value_enum, default_value_t = SceneKind::Default)]
    scene: SceneKind,

    /// Seed for the random scene
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = BackendKind::Cpu)]
    backend: BackendKind,

    /// Degrees to orbit the camera around its target between frames
    #[arg(long, default_value_t = 0.0)]
    orbit: f32,

    /// Keep accumulated samples when only the camera moves
    #[arg(long)]
    keep_on_camera_motion: bool,

    #[arg(short, long, default_value = "lantern.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let scene = match cli.scene {
        SceneKind::Default => Scene::default_scene(),
        SceneKind::Random => Scene::random_scene(cli.seed),
    };
    scene.validate().context("scene rejected")?;

    let settings = RenderSettings {
        width: cli.width,
        height: cli.height,
        samples_per_frame: cli.spp,
        max_bounces: cli.bounces,
        reset_policy: if cli.keep_on_camera_motion {
            ResetPolicy::StructuralOnly
        } else {
            ResetPolicy::OnAnyChange
        },
    };
    settings.validate().context("invalid render settings")?;

    match cli.backend {
        BackendKind::Cpu => render_frames(CpuBackend::new(cli.width, cli.height), &cli, scene, settings),
        BackendKind::Gpu => match GpuBackend::new(cli.width, cli.height) {
            Ok(gpu) => {
                info!("rendering on {}", gpu.adapter_name());
                render_frames(gpu, &cli, scene, settings)
            }
            Err(error) => {
                warn!("gpu backend unavailable ({error}), falling back to cpu");
                render_frames(CpuBackend::new(cli.width, cli.height), &cli, scene, settings)
            }
        },
    }
}

fn render_frames<B: ComputeBackend>(backend: B, cli: &Cli, mut scene: Scene, settings: RenderSettings) -> Result<()> {
    let mut lantern = Lantern::new(backend, settings)?;
    let orbit_step = cli.orbit.to_radians();
    let started = Instant::now();

    for frame in 0..cli.frames {
        if frame > 0 && orbit_step != 0.0 {
            scene.camera = scene.camera.orbited(orbit_step);
        }
        lantern
            .render(&scene, &settings)
            .with_context(|| format!("frame {frame} failed"))?;

        if (frame + 1) % 16 == 0 {
            info!(
                "frame {}/{}: {} samples/pixel, {:.2?} elapsed",
                frame + 1,
                cli.frames,
                lantern.sample_count(),
                started.elapsed()
            );
        }
    }

    save_png(&cli.output, settings.width, settings.height, lantern.output())
        .with_context(|| format!("could not write {}", cli.output.display()))?;
    info!(
        "wrote {} ({} samples/pixel, {} backend, {:.2?})",
        cli.output.display(),
        lantern.sample_count(),
        lantern.backend().label(),
        started.elapsed()
    );

    Ok(())
}
