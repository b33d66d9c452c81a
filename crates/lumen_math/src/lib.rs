//! Lumen math types.
//!
//! Double precision vectors, rays, intervals and bounding boxes shared by
//! the scene description, renderer and viewer crates.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

/// Three doubles used as a direction or displacement.
pub type Vec3 = glam::DVec3;

/// A position in world space.
pub type Point3 = glam::DVec3;

/// Linear (or gamma encoded, depending on context) RGB color.
pub type Color = glam::DVec3;

/// Threshold below which a vector component counts as zero.
pub const NEAR_ZERO_EPSILON: f64 = 1e-8;

/// Vector helpers not provided by glam.
pub trait Vec3Ext {
    /// Returns true if the vector is close to zero in every dimension.
    fn near_zero(&self) -> bool;
}

impl Vec3Ext for Vec3 {
    #[inline]
    fn near_zero(&self) -> bool {
        self.x.abs() < NEAR_ZERO_EPSILON
            && self.y.abs() < NEAR_ZERO_EPSILON
            && self.z.abs() < NEAR_ZERO_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a * b, Vec3::new(4.0, 10.0, 18.0));
        assert_eq!(a.dot(b), 32.0);
        assert_eq!(Vec3::X.cross(Vec3::Y), Vec3::Z);
    }

    #[test]
    fn test_near_zero() {
        assert!(Vec3::ZERO.near_zero());
        assert!(Vec3::new(1e-9, -1e-9, 0.0).near_zero());
        assert!(!Vec3::new(1e-9, 1e-3, 0.0).near_zero());
        assert!(!Vec3::new(0.0, 0.0, -1e-7).near_zero());
    }
}
