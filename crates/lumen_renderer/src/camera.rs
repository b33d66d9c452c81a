//! Thin-lens camera for ray generation.

use crate::sampling::random_in_unit_disk;
use lumen_math::{Point3, Ray, Vec3};
use rand::RngCore;

/// Camera placement and lens settings.
///
/// Built with the `with_*` methods and turned into an immutable [`Camera`]
/// by [`CameraConfig::build`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub look_from: Point3,
    pub look_at: Point3,
    pub vup: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f64,
    pub aspect_ratio: f64,
    pub aperture: f64,
    /// Distance from the eye to the plane of perfect focus
    pub focus_dist: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            look_from: Point3::ZERO,
            look_at: Point3::NEG_Z,
            vup: Vec3::Y,
            vfov: 90.0,
            aspect_ratio: 1.5,
            aperture: 0.0,
            focus_dist: 1.0,
        }
    }
}

impl CameraConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Point3, look_at: Point3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f64, aperture: f64, focus_dist: f64) -> Self {
        self.vfov = vfov;
        self.aperture = aperture;
        self.focus_dist = focus_dist;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn build(&self) -> Camera {
        Camera::new(self)
    }
}

/// Immutable camera with a precomputed view basis.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    origin: Point3,
    lower_left_corner: Point3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    lens_radius: f64,
}

impl Camera {
    /// Derive the view basis from `config`.
    ///
    /// The eye and target must differ and `vup` must not be parallel to the
    /// view direction.
    pub fn new(config: &CameraConfig) -> Self {
        let theta = config.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = config.aspect_ratio * viewport_height;

        let w = (config.look_from - config.look_at).normalize();
        let u = config.vup.cross(w).normalize();
        let v = w.cross(u);

        let origin = config.look_from;
        let horizontal = config.focus_dist * viewport_width * u;
        let vertical = config.focus_dist * viewport_height * v;
        let lower_left_corner = origin - horizontal / 2.0 - vertical / 2.0 - config.focus_dist * w;

        Self {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            w,
            lens_radius: config.aperture / 2.0,
        }
    }

    /// Primary ray through viewport coordinates `(s, t)`, where (0, 0) is the
    /// bottom-left corner and (1, 1) the top-right.
    pub fn get_ray(&self, s: f64, t: f64, rng: &mut dyn RngCore) -> Ray {
        let rd = self.lens_radius * random_in_unit_disk(rng);
        let offset = self.u * rd.x + self.v * rd.y;
        let focus_point = self.lower_left_corner + s * self.horizontal + t * self.vertical;

        Ray::new(self.origin + offset, focus_point - self.origin - offset)
    }

    pub fn origin(&self) -> Point3 {
        self.origin
    }

    pub fn lens_radius(&self) -> f64 {
        self.lens_radius
    }

    /// Orthonormal basis (u, v, w); `w` points away from the target.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn looking_at_origin() -> CameraConfig {
        CameraConfig::new()
            .with_position(Point3::new(13.0, 2.0, 3.0), Point3::ZERO, Vec3::Y)
            .with_lens(20.0, 0.1, 10.0)
            .with_aspect_ratio(16.0 / 9.0)
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let camera = looking_at_origin().build();
        let (u, v, w) = camera.basis();

        for axis in [u, v, w] {
            assert!((axis.length() - 1.0).abs() < 1e-12);
        }
        assert!(u.dot(v).abs() < 1e-12);
        assert!(v.dot(w).abs() < 1e-12);
        assert!(w.dot(u).abs() < 1e-12);
        assert!(w.dot(Point3::new(13.0, 2.0, 3.0)) > 0.0);
        assert!((camera.lens_radius() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = CameraConfig::new()
            .with_position(Point3::new(0.0, 0.0, 5.0), Point3::ZERO, Vec3::Y)
            .build();
        let mut rng = StdRng::seed_from_u64(0);

        let ray = camera.get_ray(0.5, 0.5, &mut rng);
        assert_eq!(ray.origin(), Point3::new(0.0, 0.0, 5.0));
        assert!((ray.direction().normalize() - Vec3::NEG_Z).length() < 1e-12);
    }

    #[test]
    fn test_viewport_corners() {
        // 90 degree fov with unit aspect spans [-1, 1] at focus distance 1
        let camera = CameraConfig::new().with_aspect_ratio(1.0).build();
        let mut rng = StdRng::seed_from_u64(0);

        let ray = camera.get_ray(0.0, 0.0, &mut rng);
        assert!((ray.direction() - Vec3::new(-1.0, -1.0, -1.0)).length() < 1e-12);

        let ray = camera.get_ray(1.0, 1.0, &mut rng);
        assert!((ray.direction() - Vec3::new(1.0, 1.0, -1.0)).length() < 1e-12);
    }

    #[test]
    fn test_lens_jitter_keeps_focus_point() {
        let config = looking_at_origin();
        let camera = config.build();
        let mut rng = StdRng::seed_from_u64(3);

        let reference = camera.get_ray(0.3, 0.7, &mut rng).at(1.0);
        for _ in 0..100 {
            let ray = camera.get_ray(0.3, 0.7, &mut rng);
            // Origins stay on the lens disk
            assert!((ray.origin() - config.look_from).length() <= camera.lens_radius() + 1e-12);
            // Every jittered ray passes through the same focus-plane point
            assert!((ray.at(1.0) - reference).length() < 1e-9);
        }
    }
}
