use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_core::{export_image, SceneDescription, SceneKind};
use lumen_renderer::{build_world, camera_config, PixelBuffer, RenderContext, RenderSession};

mod cli;
mod display;

use cli::{format_for_path, Args};
use display::{Display, PreviewTarget};

fn load_scene(args: &Args) -> Result<SceneDescription> {
    match &args.scene_file {
        Some(path) => SceneDescription::load(path)
            .with_context(|| format!("Failed to load scene {}", path.display())),
        None => {
            let kind = SceneKind::from(args.scene);
            log::info!("Generating built-in scene '{}'", kind);
            Ok(kind.build(args.seed))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    // Resolve everything that can fail before any rendering starts
    let format = args.output_format()?;
    let config = args.render_config()?;
    let time_limit = args.time_limit()?;
    let preview = match &args.preview {
        Some(path) => Some(PreviewTarget {
            format: format_for_path(path, format)?,
            path: path.clone(),
            every: args.preview_every,
        }),
        None => None,
    };

    let scene = load_scene(&args)?;
    let world = build_world(&scene).context("Invalid scene")?;
    let camera = camera_config(scene.camera.as_ref(), config.aspect_ratio()).build();

    let context = Arc::new(RenderContext::new(Arc::new(world), camera, &config));
    let buffer = Arc::new(PixelBuffer::new(config.width, config.height));
    let mut session = RenderSession::start(context, Arc::clone(&buffer), config.threads)
        .context("Failed to start render")?;

    let mut display = Display::new(config.samples, preview)?;
    let reason = display.run(&mut session, time_limit)?;
    log::debug!("Render stopped: {:?}", reason);

    export_image(
        &args.output,
        format,
        &buffer.snapshot(),
        config.width,
        config.height,
    )
    .with_context(|| format!("Failed to write {}", args.output.display()))?;

    Ok(())
}
