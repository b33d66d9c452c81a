//! Lumen Core - scene descriptions and image export.
//!
//! This crate provides:
//!
//! - **Scene descriptions**: `SceneDescription`, `MaterialDesc`, `ShapeDesc`,
//!   JSON loading and the built-in named scenes
//! - **Export**: conversion of the gamma-encoded pixel buffer to PNG, JPG,
//!   BMP, TGA, HDR, PPM and WEBP files
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::scene::SceneKind;
//!
//! let scene = SceneKind::Random.build(42);
//! println!("{} primitives", scene.primitive_count());
//! ```

pub mod export;
pub mod scene;

// Re-export commonly used types
pub use export::{export_image, ExportError, ImageFormat};
pub use scene::{
    CameraDesc, MaterialDesc, PrimitiveDesc, SceneDescription, SceneError, SceneKind, ShapeDesc,
};
