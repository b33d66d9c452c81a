//! Tiles and the shared pixel buffer.
//!
//! The image is split into vertical strips, one per worker. A worker can only
//! write through the [`TileCanvas`] it was handed, and the buffer hands out
//! canvases exactly once, so no two workers ever write the same cell.
//!
//! Cells are stored as atomic bit patterns. Readers such as the live preview
//! may see a frame that is only partly updated, but never a torn channel.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{RenderError, RenderResult};
use lumen_math::Color;

/// A rectangular region of the image owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Full image width
    pub data_width: u32,
    /// Full image height
    pub data_height: u32,
    /// Completed (or interrupted) passes over this tile
    pub iteration: u32,
    /// Index of this tile, left to right
    pub index: usize,
}

impl Tile {
    /// Get the total number of pixels in this tile.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn x_range(&self) -> Range<u32> {
        self.x..self.x + self.width
    }

    pub fn y_range(&self) -> Range<u32> {
        self.y..self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.x_range().contains(&x) && self.y_range().contains(&y)
    }
}

/// Split a `width` x `height` image into at most `count` full-height strips.
///
/// Every strip is `width / count` pixels wide except the last, which also
/// takes the remainder. `count` is clamped to `1..=width` so no strip is
/// empty. Returns no tiles for an empty image.
pub fn generate_tiles(width: u32, height: u32, count: usize) -> Vec<Tile> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let count = count.clamp(1, width as usize) as u32;
    let strip = width / count;

    (0..count)
        .map(|i| {
            let x = i * strip;
            let tile_width = if i == count - 1 { width - x } else { strip };
            Tile {
                x,
                y: 0,
                width: tile_width,
                height,
                data_width: width,
                data_height: height,
                iteration: 0,
                index: i as usize,
            }
        })
        .collect()
}

#[derive(Default)]
struct AtomicColor([AtomicU64; 3]);

impl AtomicColor {
    #[inline]
    fn load(&self) -> Color {
        Color::new(
            f64::from_bits(self.0[0].load(Ordering::Relaxed)),
            f64::from_bits(self.0[1].load(Ordering::Relaxed)),
            f64::from_bits(self.0[2].load(Ordering::Relaxed)),
        )
    }

    #[inline]
    fn store(&self, color: Color) {
        self.0[0].store(color.x.to_bits(), Ordering::Relaxed);
        self.0[1].store(color.y.to_bits(), Ordering::Relaxed);
        self.0[2].store(color.z.to_bits(), Ordering::Relaxed);
    }
}

/// Row-major, gamma-encoded image shared by all workers. Row 0 is the top.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    cells: Box<[AtomicColor]>,
    partitioned: AtomicBool,
}

impl PixelBuffer {
    /// Create a black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let cells = (0..width as usize * height as usize)
            .map(|_| AtomicColor::default())
            .collect();

        Self {
            width,
            height,
            cells,
            partitioned: AtomicBool::new(false),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read one pixel. Panics if `(x, y)` is outside the image.
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.cells[self.index(x, y)].load()
    }

    /// Copy the whole buffer. Concurrent writers may leave it partly updated.
    pub fn snapshot(&self) -> Vec<Color> {
        self.cells.iter().map(AtomicColor::load).collect()
    }

    /// Hand out one canvas per strip. Succeeds once per buffer.
    pub fn partition(self: &Arc<Self>, count: usize) -> RenderResult<Vec<TileCanvas>> {
        if self.is_empty() {
            return Err(RenderError::ZeroSize {
                width: self.width,
                height: self.height,
            });
        }
        if count == 0 {
            return Err(RenderError::ZeroThreads);
        }
        if self.partitioned.swap(true, Ordering::AcqRel) {
            return Err(RenderError::AlreadyPartitioned);
        }

        if count > self.width as usize {
            log::debug!(
                "Clamping {} tiles to image width {}",
                count,
                self.width
            );
        }

        Ok(generate_tiles(self.width, self.height, count)
            .into_iter()
            .map(|tile| TileCanvas {
                tile,
                buffer: Arc::clone(self),
            })
            .collect())
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({}, {}) is outside the image", x, y);
        y as usize * self.width as usize + x as usize
    }
}

/// Exclusive write access to one tile of a [`PixelBuffer`].
pub struct TileCanvas {
    tile: Tile,
    buffer: Arc<PixelBuffer>,
}

impl TileCanvas {
    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    /// Read a pixel inside this tile, in image coordinates.
    ///
    /// Panics if `(x, y)` belongs to another tile.
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.check_bounds(x, y);
        self.buffer.get(x, y)
    }

    /// Write a pixel inside this tile, in image coordinates.
    ///
    /// Panics if `(x, y)` belongs to another tile, in every build profile.
    /// Strips never overlap, so this check is what keeps writes exclusive.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.check_bounds(x, y);
        self.buffer.cells[self.buffer.index(x, y)].store(color);
    }

    #[inline]
    fn check_bounds(&self, x: u32, y: u32) {
        assert!(
            self.tile.contains(x, y),
            "pixel ({}, {}) is outside tile {}",
            x,
            y,
            self.tile.index
        );
    }

    pub(crate) fn finish_pass(&mut self) {
        self.tile.iteration += 1;
    }
}
