//! Core path tracing renderer.
//!
//! Implements progressive Monte Carlo path tracing:
//! - Recursive ray tracing with a hard bounce cutoff
//! - One jittered sample per pixel per pass
//! - Running-mean accumulation into a gamma-encoded buffer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::sampling::random_f64;
use crate::tile::TileCanvas;
use crate::{Camera, Hittable};
use lumen_math::{Color, Interval, Ray};
use rand::RngCore;

/// Minimum hit distance, keeps scattered rays off their own surface.
pub const T_MIN: f64 = 0.001;

/// How many passes each worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePolicy {
    /// Stop after this many passes.
    Passes(u32),
    /// Keep refining until cancelled.
    Progressive,
}

impl SamplePolicy {
    /// Map a sample count to a policy; 0 means progressive.
    pub fn from_count(samples: u32) -> Self {
        if samples == 0 {
            SamplePolicy::Progressive
        } else {
            SamplePolicy::Passes(samples)
        }
    }

    /// Whether a tile at `iteration` has done all its passes.
    pub fn is_complete(&self, iteration: u32) -> bool {
        match self {
            SamplePolicy::Passes(n) => iteration >= *n,
            SamplePolicy::Progressive => false,
        }
    }
}

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Maximum ray bounce depth
    pub max_depth: u32,
    pub samples: SamplePolicy,
    /// Worker thread count, one tile each
    pub threads: usize,
    /// Base seed for every worker's generator
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 266,
            max_depth: 25,
            samples: SamplePolicy::Passes(10),
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set quality settings.
    pub fn with_quality(mut self, samples: SamplePolicy, max_depth: u32) -> Self {
        self.samples = samples;
        self.max_depth = max_depth;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

/// Combines the stored linear color with a new sample. The last argument is
/// the 1-based pass number.
pub type BlendFn = fn(Color, Color, u32) -> Color;

/// Running mean: `previous * (n - 1) / n + sample / n`.
#[inline]
pub fn running_mean(previous: Color, sample: Color, n: u32) -> Color {
    let n = n as f64;
    previous * ((n - 1.0) / n) + sample / n
}

/// Everything a worker needs to render passes. Shared read-only between
/// workers, apart from the cancellation flag.
pub struct RenderContext {
    scene: Arc<dyn Hittable>,
    camera: Camera,
    max_depth: u32,
    samples: SamplePolicy,
    seed: u64,
    blend: BlendFn,
    cancelled: AtomicBool,
}

impl RenderContext {
    pub fn new(scene: Arc<dyn Hittable>, camera: Camera, config: &RenderConfig) -> Self {
        Self {
            scene,
            camera,
            max_depth: config.max_depth,
            samples: config.samples,
            seed: config.seed,
            blend: running_mean,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Replace the accumulation function.
    pub fn with_blend(mut self, blend: BlendFn) -> Self {
        self.blend = blend;
        self
    }

    pub fn scene(&self) -> &dyn Hittable {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn samples(&self) -> SamplePolicy {
        self.samples
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Ask every worker to stop after its current row.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Compute the color seen by a ray.
///
/// Traces the ray through the scene, multiplying in each surface's
/// attenuation until it escapes to the sky, is absorbed, or runs out of
/// bounces.
pub fn ray_color(ray: &Ray, world: &dyn Hittable, depth: u32, rng: &mut dyn RngCore) -> Color {
    // Bounce budget exhausted
    if depth == 0 {
        return Color::ZERO;
    }

    let Some(rec) = world.hit(ray, Interval::new(T_MIN, f64::INFINITY)) else {
        return sky_gradient(ray);
    };

    match rec.material.scatter(ray, &rec, rng) {
        Some(result) => result.attenuation * ray_color(&result.scattered, world, depth - 1, rng),
        None => Color::ZERO,
    }
}

/// Background light: a blend from white straight down to sky blue straight
/// up, driven by the ray direction's Y component.
pub fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// Apply gamma correction (gamma = 2.0) per channel.
#[inline]
pub fn linear_to_gamma(linear: Color) -> Color {
    let encode = |c: f64| if c > 0.0 { c.sqrt() } else { 0.0 };
    Color::new(encode(linear.x), encode(linear.y), encode(linear.z))
}

/// Undo [`linear_to_gamma`].
#[inline]
pub fn gamma_to_linear(gamma: Color) -> Color {
    gamma * gamma
}

/// Outcome of one pass over a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Complete,
    /// Cancellation was seen at a row boundary.
    Interrupted,
}

/// Render one pass over the canvas's tile.
///
/// Each pixel gets one jittered sample. The stored value is squared back to
/// linear, blended with the sample, and square-rooted again before being
/// written. Cancellation is polled after every row. The tile's iteration
/// count advances even when the pass is interrupted.
pub fn render_pass(
    context: &RenderContext,
    canvas: &mut TileCanvas,
    rng: &mut dyn RngCore,
) -> PassStatus {
    let tile = *canvas.tile();
    let n = tile.iteration + 1;
    // Single-pixel dimensions would otherwise divide by zero
    let s_scale = 1.0 / (tile.data_width.max(2) - 1) as f64;
    let t_scale = 1.0 / (tile.data_height.max(2) - 1) as f64;

    let mut status = PassStatus::Complete;
    for y in tile.y_range() {
        // Buffer rows run top-down, viewport t runs bottom-up
        let row = (tile.data_height - 1 - y) as f64;
        for x in tile.x_range() {
            let s = (x as f64 + random_f64(rng)) * s_scale;
            let t = (row + random_f64(rng)) * t_scale;
            let ray = context.camera.get_ray(s, t, rng);
            let sample = ray_color(&ray, context.scene(), context.max_depth, rng);

            let previous = gamma_to_linear(canvas.get(x, y));
            let blended = (context.blend)(previous, sample, n);
            canvas.set(x, y, linear_to_gamma(blended));
        }

        if context.is_cancelled() {
            status = PassStatus::Interrupted;
            break;
        }
    }

    canvas.finish_pass();
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hittable::HitRecord;
    use crate::material::ScatterResult;
    use crate::{CameraConfig, HittableList, Lambertian, Material, PixelBuffer, Sphere};
    use lumen_math::{Point3, Vec3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Sends every ray straight up with a fixed attenuation.
    struct Skyward(Color);

    impl Material for Skyward {
        fn scatter(&self, _ray_in: &Ray, rec: &HitRecord, _rng: &mut dyn RngCore) -> Option<ScatterResult> {
            Some(ScatterResult {
                attenuation: self.0,
                scattered: Ray::new(rec.p, Vec3::Y),
            })
        }
    }

    fn make_context(world: HittableList, camera: Camera, max_depth: u32) -> RenderContext {
        let config = RenderConfig::default()
            .with_quality(SamplePolicy::Progressive, max_depth)
            .with_threads(1);
        RenderContext::new(Arc::new(world), camera, &config)
    }

    fn looking_down() -> Camera {
        CameraConfig::new()
            .with_position(Point3::new(0.0, 1.0, 0.0), Point3::ZERO, Vec3::Z)
            .with_lens(20.0, 0.0, 1.0)
            .with_aspect_ratio(4.0 / 3.0)
            .build()
    }

    fn ground(material: Arc<dyn Material>) -> HittableList {
        let mut world = HittableList::new();
        world.add(Arc::new(Sphere::new(Point3::new(0.0, -1000.0, 0.0), 1000.0, material)));
        world
    }

    #[test]
    fn test_sky_gradient() {
        let up = sky_gradient(&Ray::new(Point3::ZERO, Vec3::Y));
        assert_eq!(up, Color::new(0.5, 0.7, 1.0));

        let down = sky_gradient(&Ray::new(Point3::ZERO, Vec3::new(0.0, -3.0, 0.0)));
        assert_eq!(down, Color::ONE);

        let horizon = sky_gradient(&Ray::new(Point3::ZERO, Vec3::X));
        assert!((horizon - Color::new(0.75, 0.85, 1.0)).length() < 1e-12);
    }

    #[test]
    fn test_gamma_round_trip() {
        assert_eq!(linear_to_gamma(Color::new(0.25, 0.0, -1.0)), Color::new(0.5, 0.0, 0.0));
        assert_eq!(gamma_to_linear(Color::new(0.5, 1.0, 0.0)), Color::new(0.25, 1.0, 0.0));

        let c = Color::new(0.2, 0.4, 0.9);
        assert!((gamma_to_linear(linear_to_gamma(c)) - c).length() < 1e-15);
    }

    #[test]
    fn test_running_mean() {
        let sample = Color::new(0.3, 0.6, 0.9);
        // First pass ignores whatever was stored
        assert_eq!(running_mean(Color::splat(7.0), sample, 1), sample);

        let mean = running_mean(Color::ZERO, Color::splat(1.0), 4);
        assert!((mean - Color::splat(0.25)).length() < 1e-15);

        let mut acc = Color::ZERO;
        for (i, s) in [1.0, 2.0, 3.0, 6.0].iter().enumerate() {
            acc = running_mean(acc, Color::splat(*s), i as u32 + 1);
        }
        assert!((acc - Color::splat(3.0)).length() < 1e-12);
    }

    #[test]
    fn test_sample_policy() {
        assert_eq!(SamplePolicy::from_count(0), SamplePolicy::Progressive);
        assert_eq!(SamplePolicy::from_count(5), SamplePolicy::Passes(5));
        assert!(!SamplePolicy::Passes(2).is_complete(1));
        assert!(SamplePolicy::Passes(2).is_complete(2));
        assert!(!SamplePolicy::Progressive.is_complete(u32::MAX));
    }

    #[test]
    fn test_render_config_default() {
        let config = RenderConfig::default();
        assert_eq!((config.width, config.height), (400, 266));
        assert_eq!(config.max_depth, 25);
        assert_eq!(config.samples, SamplePolicy::Passes(10));
        assert!(config.threads >= 1);
        assert!((config.aspect_ratio() - 400.0 / 266.0).abs() < 1e-12);
    }

    #[test]
    fn test_ray_color_depth_cutoff() {
        let world = HittableList::new();
        let mut rng = StdRng::seed_from_u64(0);
        let ray = Ray::new(Point3::ZERO, Vec3::Y);

        assert_eq!(ray_color(&ray, &world, 0, &mut rng), Color::ZERO);
        assert_eq!(ray_color(&ray, &world, 1, &mut rng), Color::new(0.5, 0.7, 1.0));
    }

    #[test]
    fn test_ray_color_bounce_attenuates() {
        let world = ground(Arc::new(Skyward(Color::new(0.5, 0.25, 1.0))));
        let mut rng = StdRng::seed_from_u64(0);
        let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), Vec3::NEG_Y);

        let color = ray_color(&ray, &world, 2, &mut rng);
        assert!((color - Color::new(0.25, 0.175, 1.0)).length() < 1e-12);

        // One bounce budget is spent on the ground hit
        assert_eq!(ray_color(&ray, &world, 1, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_diffuse_ground_stays_below_sky() {
        let world = ground(Arc::new(Lambertian::new(Color::splat(0.5))));
        let mut rng = StdRng::seed_from_u64(9);
        let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), Vec3::NEG_Y);

        for _ in 0..100 {
            let color = ray_color(&ray, &world, 10, &mut rng);
            assert!(color.max_element() <= 0.5 + 1e-12);
            assert!(color.min_element() >= 0.0);
        }
    }

    #[test]
    fn test_constant_sample_blend_is_exact() {
        let albedo = Color::new(0.8, 0.3, 0.5);
        let expected = linear_to_gamma(albedo * Color::new(0.5, 0.7, 1.0));

        for passes in [1, 2, 5, 17] {
            let context = make_context(ground(Arc::new(Skyward(albedo))), looking_down(), 4);
            let buffer = Arc::new(PixelBuffer::new(8, 6));
            let mut canvas = buffer.partition(1).unwrap().remove(0);
            let mut rng = StdRng::seed_from_u64(passes as u64);

            for _ in 0..passes {
                assert_eq!(render_pass(&context, &mut canvas, &mut rng), PassStatus::Complete);
            }

            assert_eq!(canvas.tile().iteration, passes);
            for pixel in buffer.snapshot() {
                assert!(
                    (pixel - expected).length() < 1e-12,
                    "{:?} drifted from {:?} after {} passes",
                    pixel,
                    expected,
                    passes
                );
            }
        }
    }

    #[test]
    fn test_custom_blend_function() {
        fn keep_latest(_previous: Color, sample: Color, _n: u32) -> Color {
            sample
        }

        let context = make_context(HittableList::new(), looking_down(), 2).with_blend(keep_latest);
        let buffer = Arc::new(PixelBuffer::new(2, 2));
        let mut canvas = buffer.partition(1).unwrap().remove(0);
        let mut rng = StdRng::seed_from_u64(0);

        render_pass(&context, &mut canvas, &mut rng);
        // Camera looks straight down at an empty world: the sky is white there
        for pixel in buffer.snapshot() {
            assert!((pixel - Color::ONE).length() < 0.05);
        }
    }

    #[test]
    fn test_cancelled_pass_stops_after_one_row() {
        let context = make_context(HittableList::new(), looking_down(), 2);
        let buffer = Arc::new(PixelBuffer::new(4, 3));
        let mut canvas = buffer.partition(1).unwrap().remove(0);
        let mut rng = StdRng::seed_from_u64(0);

        context.cancel();
        assert!(context.is_cancelled());
        assert_eq!(render_pass(&context, &mut canvas, &mut rng), PassStatus::Interrupted);
        assert_eq!(canvas.tile().iteration, 1);

        for x in 0..4 {
            assert!(buffer.get(x, 0).min_element() > 0.0);
            assert_eq!(buffer.get(x, 1), Color::ZERO);
            assert_eq!(buffer.get(x, 2), Color::ZERO);
        }
    }

    #[test]
    fn test_single_pixel_image() {
        let context = make_context(HittableList::new(), looking_down(), 2);
        let buffer = Arc::new(PixelBuffer::new(1, 1));
        let mut canvas = buffer.partition(1).unwrap().remove(0);
        let mut rng = StdRng::seed_from_u64(0);

        render_pass(&context, &mut canvas, &mut rng);
        let pixel = buffer.get(0, 0);
        assert!(pixel.is_finite());
        assert!(pixel.min_element() > 0.0);
    }
}
