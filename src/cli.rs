use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::Parser;
use indicatif::ProgressBar;

use zoetrace::{Framebuffer, RenderSettings, Scene, render, render_whitted, scene::loader};

#[derive(Debug, Parser)]
#[command(about = "Offline Monte Carlo path tracer")]
struct Args {
    /// JSON scene description. Renders the built-in Cornell box when
    /// omitted.
    scene: Option<PathBuf>,

    /// Path samples per pixel.
    #[arg(long, default_value_t = 64)]
    spp: u32,

    /// Worker threads; defaults to all logical CPUs.
    #[arg(long)]
    workers: Option<usize>,

    /// Resume accumulation from a previous output image.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    #[arg(long, default_value = "render.png")]
    output: PathBuf,

    /// Resolution of the built-in scene. A scene file carries its own.
    #[arg(long, default_value_t = 784)]
    width: u32,
    #[arg(long, default_value_t = 784)]
    height: u32,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Single-pass Whitted preview instead of path tracing.
    #[arg(long)]
    whitted: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut scene = match &args.scene {
        Some(path) => loader::load_scene(path)
            .with_context(|| format!("loading scene {}", path.display()))?,
        None => Scene::cornell_box(args.width, args.height),
    };
    log::info!("scene holds {} primitives", scene.primitive_count());
    scene.build_bvh();

    let start = Instant::now();
    let framebuffer = if args.whitted {
        render_whitted(&scene)
    } else {
        path_trace(scene, &args)?
    };
    println!("Time: {}ms", start.elapsed().as_millis());

    framebuffer
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!(
        "Wrote {} ({} samples per pixel)",
        args.output.display(),
        framebuffer.samples()
    );
    Ok(())
}

fn path_trace(scene: Scene, args: &Args) -> anyhow::Result<Framebuffer> {
    let (width, height) = scene.camera.resolution();
    let framebuffer = match &args.checkpoint {
        Some(path) => {
            let framebuffer = Framebuffer::load_checkpoint(path, width, height)
                .with_context(|| format!("loading checkpoint {}", path.display()))?;
            println!(
                "Resuming from {} with {} accumulated samples",
                path.display(),
                framebuffer.samples()
            );
            framebuffer
        }
        None => Framebuffer::new(width, height),
    };

    let settings = RenderSettings {
        sample_count: NonZeroU32::new(args.spp).context("--spp must be at least 1")?,
        worker_count: args.workers,
        seed: args.seed,
    };

    let progress = render(scene, settings, framebuffer)?;
    let (_, total) = progress.progress();
    let bar = ProgressBar::new(total as u64);
    while !progress.is_finished() {
        let (finished, _) = progress.progress();
        bar.set_position(finished as u64);
        std::thread::sleep(Duration::from_millis(250));
    }
    bar.finish();

    Ok(progress.into_framebuffer())
}
