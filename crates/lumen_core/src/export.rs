//! Raster export of the accumulated pixel buffer.
//!
//! The renderer keeps its buffer gamma encoded, one `Color` per pixel in
//! row-major order starting at the top-left. 8-bit formats quantize that
//! directly; HDR squares each channel back to linear first.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use image::codecs::bmp::BmpEncoder;
use image::codecs::hdr::HdrEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ColorType, ImageEncoder, Rgb};
use lumen_math::{Color, Interval};
use rayon::prelude::*;
use thiserror::Error;

/// Errors that can occur while exporting an image.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Pixel buffer holds {actual} pixels, expected {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        actual: usize,
    },

    #[error("Unsupported image format: {0}")]
    UnknownFormat(String),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Output container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpg,
    Bmp,
    Tga,
    Hdr,
    Ppm,
    Webp,
}

impl ImageFormat {
    /// All supported formats.
    pub const ALL: [ImageFormat; 7] = [
        ImageFormat::Png,
        ImageFormat::Jpg,
        ImageFormat::Bmp,
        ImageFormat::Tga,
        ImageFormat::Hdr,
        ImageFormat::Ppm,
        ImageFormat::Webp,
    ];

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tga => "tga",
            ImageFormat::Hdr => "hdr",
            ImageFormat::Ppm => "ppm",
            ImageFormat::Webp => "webp",
        }
    }

    /// Infer the format from a file extension (case insensitive).
    pub fn from_path<P: AsRef<Path>>(path: P) -> ExportResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ExportError::UnknownFormat(path.display().to_string()))?;
        extension.to_ascii_lowercase().parse()
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "bmp" => Ok(ImageFormat::Bmp),
            "tga" => Ok(ImageFormat::Tga),
            "hdr" => Ok(ImageFormat::Hdr),
            "ppm" => Ok(ImageFormat::Ppm),
            "webp" => Ok(ImageFormat::Webp),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// One 8-bit RGB pixel, laid out so a slice casts straight to bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Quantize one gamma-encoded color to 8 bits per channel.
#[inline]
pub fn color_to_rgb8(color: Color) -> Rgb8 {
    let intensity = Interval::new(0.0, 0.999);
    Rgb8 {
        r: (256.0 * intensity.clamp(color.x)) as u8,
        g: (256.0 * intensity.clamp(color.y)) as u8,
        b: (256.0 * intensity.clamp(color.z)) as u8,
    }
}

/// Quantize a whole gamma-encoded buffer.
pub fn to_rgb8(pixels: &[Color]) -> Vec<Rgb8> {
    pixels.par_iter().map(|c| color_to_rgb8(*c)).collect()
}

/// Undo the gamma encoding for floating point output.
pub fn to_linear_f32(pixels: &[Color]) -> Vec<Rgb<f32>> {
    pixels
        .par_iter()
        .map(|c| Rgb([(c.x * c.x) as f32, (c.y * c.y) as f32, (c.z * c.z) as f32]))
        .collect()
}

/// Encode `pixels` into `out` using the given container format.
pub fn write_image<W: Write>(
    mut out: W,
    format: ImageFormat,
    pixels: &[Color],
    width: u32,
    height: u32,
) -> ExportResult<()> {
    if pixels.len() != width as usize * height as usize {
        return Err(ExportError::SizeMismatch {
            width,
            height,
            actual: pixels.len(),
        });
    }

    let rgb8 = || to_rgb8(pixels);
    match format {
        ImageFormat::Png => PngEncoder::new(out).write_image(
            bytemuck::cast_slice(&rgb8()),
            width,
            height,
            ColorType::Rgb8,
        )?,
        ImageFormat::Jpg => JpegEncoder::new_with_quality(out, 100).write_image(
            bytemuck::cast_slice(&rgb8()),
            width,
            height,
            ColorType::Rgb8,
        )?,
        ImageFormat::Bmp => BmpEncoder::new(&mut out).write_image(
            bytemuck::cast_slice(&rgb8()),
            width,
            height,
            ColorType::Rgb8,
        )?,
        ImageFormat::Tga => TgaEncoder::new(out).write_image(
            bytemuck::cast_slice(&rgb8()),
            width,
            height,
            ColorType::Rgb8,
        )?,
        ImageFormat::Webp => WebPEncoder::new_lossless(out).write_image(
            bytemuck::cast_slice(&rgb8()),
            width,
            height,
            ColorType::Rgb8,
        )?,
        ImageFormat::Hdr => {
            let linear = to_linear_f32(pixels);
            HdrEncoder::new(out).encode(&linear, width as usize, height as usize)?;
        }
        ImageFormat::Ppm => write_ppm(&mut out, &rgb8(), width, height)?,
    }

    Ok(())
}

/// Plain-text PPM: one `r g b` triple per line.
fn write_ppm<W: Write>(out: &mut W, pixels: &[Rgb8], width: u32, height: u32) -> ExportResult<()> {
    write!(out, "P3\n{} {}\n255\n", width, height)?;
    for pixel in pixels {
        writeln!(out, "{} {} {}", pixel.r, pixel.g, pixel.b)?;
    }
    out.flush()?;
    Ok(())
}

/// Export `pixels` to a file at `path`, truncating any existing file.
pub fn export_image<P: AsRef<Path>>(
    path: P,
    format: ImageFormat,
    pixels: &[Color],
    width: u32,
    height: u32,
) -> ExportResult<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_image(&mut writer, format, pixels, width, height)?;
    writer.flush()?;

    log::info!(
        "Exported {}x{} {} image to {}",
        width,
        height,
        format,
        path.display()
    );
    Ok(())
}
