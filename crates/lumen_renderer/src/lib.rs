//! Lumen Renderer - progressive CPU path tracing
//!
//! A Monte Carlo path tracer that refines an image pass by pass. The image
//! is split into vertical tiles, one per worker thread, and every pass blends
//! one new sample per pixel into a shared gamma-encoded buffer.

mod camera;
mod error;
mod hittable;
mod material;
mod renderer;
mod session;
mod sphere;
mod tile;
mod world;

pub mod sampling;

pub use camera::{Camera, CameraConfig};
pub use error::{RenderError, RenderResult};
pub use hittable::{HitRecord, Hittable, HittableList};
pub use material::{reflect, refract, Dielectric, Lambertian, Material, Metal, ScatterResult};
pub use renderer::{
    gamma_to_linear, linear_to_gamma, ray_color, render_pass, running_mean, sky_gradient,
    BlendFn, PassStatus, RenderConfig, RenderContext, SamplePolicy, T_MIN,
};
pub use session::{worker_seed, RenderSession};
pub use sphere::Sphere;
pub use tile::{generate_tiles, PixelBuffer, Tile, TileCanvas};
pub use world::{build_material, build_world, camera_config};

/// Re-export the math types used throughout the public API
pub use lumen_math::{Aabb, Color, Interval, Point3, Ray, Vec3};
