use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use lumen_core::{ImageFormat, SceneKind};
use lumen_renderer::{RenderConfig, SamplePolicy};

/// Time limit applied to progressive renders when none is given.
pub const DEFAULT_PROGRESSIVE_LIMIT: Duration = Duration::from_secs(30);

/// Log levels selectable from the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Built-in scenes
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SceneArg {
    Random,
    ThreeSpheres,
    TwoSpheres,
}

impl From<SceneArg> for SceneKind {
    fn from(scene: SceneArg) -> Self {
        match scene {
            SceneArg::Random => SceneKind::Random,
            SceneArg::ThreeSpheres => SceneKind::ThreeSpheres,
            SceneArg::TwoSpheres => SceneKind::TwoSpheres,
        }
    }
}

/// Output image formats
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Png,
    #[value(alias = "jpeg")]
    Jpg,
    Bmp,
    Tga,
    Hdr,
    Ppm,
    Webp,
}

impl From<FormatArg> for ImageFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpg => ImageFormat::Jpg,
            FormatArg::Bmp => ImageFormat::Bmp,
            FormatArg::Tga => ImageFormat::Tga,
            FormatArg::Hdr => ImageFormat::Hdr,
            FormatArg::Ppm => ImageFormat::Ppm,
            FormatArg::Webp => ImageFormat::Webp,
        }
    }
}

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "lumen")]
#[command(about = "Progressive multithreaded path tracer")]
pub struct Args {
    /// Output image path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format; inferred from the output extension when omitted
    #[arg(short = 't', long)]
    pub format: Option<FormatArg>,

    /// Built-in scene to render
    #[arg(long, value_enum, default_value = "random")]
    pub scene: SceneArg,

    /// JSON scene description, overrides --scene
    #[arg(long)]
    pub scene_file: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, default_value_t = 400, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 266, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,

    /// Passes per pixel, 0 renders progressively until the time limit
    #[arg(long, short = 's', default_value_t = 10)]
    pub samples: u32,

    /// Maximum bounces per path
    #[arg(long, default_value_t = 25)]
    pub max_depth: u32,

    /// Worker threads (defaults to the number of cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Seed for the scene generator and the samplers
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Stop rendering after this many seconds (30 for progressive renders)
    #[arg(long)]
    pub time_limit: Option<f64>,

    /// Periodically write the in-progress frame here
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Write the preview every N display frames
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub preview_every: u64,

    /// Set the logging level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    /// Format from `--format`, else the output extension, else PNG.
    pub fn output_format(&self) -> Result<ImageFormat> {
        match self.format {
            Some(format) => Ok(format.into()),
            None => format_for_path(&self.output, ImageFormat::Png),
        }
    }

    pub fn render_config(&self) -> Result<RenderConfig> {
        let mut config = RenderConfig::default()
            .with_resolution(self.width, self.height)
            .with_quality(SamplePolicy::from_count(self.samples), self.max_depth)
            .with_seed(self.seed);

        if let Some(threads) = self.threads {
            if threads == 0 {
                bail!("--threads must be at least 1");
            }
            config = config.with_threads(threads);
        }
        Ok(config)
    }

    pub fn time_limit(&self) -> Result<Option<Duration>> {
        match self.time_limit {
            Some(seconds) => match Duration::try_from_secs_f64(seconds) {
                Ok(limit) => Ok(Some(limit)),
                Err(_) => bail!("--time-limit must be a non-negative number of seconds"),
            },
            None if self.samples == 0 => Ok(Some(DEFAULT_PROGRESSIVE_LIMIT)),
            None => Ok(None),
        }
    }
}

/// Format implied by `path`'s extension, or `fallback` when it has none.
/// An extension that names no supported format is an error.
pub fn format_for_path(path: &Path, fallback: ImageFormat) -> Result<ImageFormat> {
    if path.extension().is_none() {
        return Ok(fallback);
    }
    ImageFormat::from_path(path).with_context(|| {
        format!(
            "Cannot infer an image format from {}; pass --format",
            path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("lumen").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-o", "out.png"]).unwrap();
        let config = args.render_config().unwrap();

        assert_eq!((config.width, config.height), (400, 266));
        assert_eq!(config.samples, SamplePolicy::Passes(10));
        assert_eq!(config.max_depth, 25);
        assert_eq!(SceneKind::from(args.scene), SceneKind::Random);
        assert_eq!(args.output_format().unwrap(), ImageFormat::Png);
        assert_eq!(args.time_limit().unwrap(), None);
    }

    #[test]
    fn test_format_selection() {
        let args = parse(&["-o", "out.hdr"]).unwrap();
        assert_eq!(args.output_format().unwrap(), ImageFormat::Hdr);

        let args = parse(&["-o", "out.hdr", "-t", "jpeg"]).unwrap();
        assert_eq!(args.output_format().unwrap(), ImageFormat::Jpg);

        let args = parse(&["-o", "out"]).unwrap();
        assert_eq!(args.output_format().unwrap(), ImageFormat::Png);

        let args = parse(&["-o", "OUT.WEBP"]).unwrap();
        assert_eq!(args.output_format().unwrap(), ImageFormat::Webp);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let args = parse(&["-o", "out.gif"]).unwrap();
        assert!(args.output_format().is_err());

        // An explicit format overrides the extension
        let args = parse(&["-o", "out.gif", "-t", "png"]).unwrap();
        assert_eq!(args.output_format().unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_preview_format_falls_back_to_output() {
        let path = Path::new("preview");
        assert_eq!(format_for_path(path, ImageFormat::Hdr).unwrap(), ImageFormat::Hdr);
        assert_eq!(
            format_for_path(Path::new("preview.bmp"), ImageFormat::Hdr).unwrap(),
            ImageFormat::Bmp
        );
        assert!(format_for_path(Path::new("preview.tiff"), ImageFormat::Png).is_err());
    }

    #[test]
    fn test_invalid_selectors_fail_fast() {
        assert!(parse(&["-o", "out.png", "--scene", "cornell"]).is_err());
        assert!(parse(&["-o", "out.png", "-t", "gif"]).is_err());
        assert!(parse(&["-o", "out.png", "--width", "0"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_progressive_gets_time_limit() {
        let args = parse(&["-o", "out.png", "--samples", "0"]).unwrap();
        assert_eq!(args.render_config().unwrap().samples, SamplePolicy::Progressive);
        assert_eq!(args.time_limit().unwrap(), Some(DEFAULT_PROGRESSIVE_LIMIT));

        let args = parse(&["-o", "out.png", "--samples", "0", "--time-limit", "1.5"]).unwrap();
        assert_eq!(args.time_limit().unwrap(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let args = parse(&["-o", "out.png", "--threads", "0"]).unwrap();
        assert!(args.render_config().is_err());

        let args = parse(&["-o", "out.png", "--threads", "3", "--scene", "two-spheres"]).unwrap();
        assert_eq!(args.render_config().unwrap().threads, 3);
        assert_eq!(SceneKind::from(args.scene), SceneKind::TwoSpheres);
    }
}
