//! Hittable trait and HitRecord for ray-object intersection.

use std::sync::Arc;

use crate::Material;
use lumen_math::{Aabb, Interval, Point3, Ray, Vec3};

/// Record of a ray-object intersection.
#[derive(Clone, Copy)]
pub struct HitRecord<'a> {
    /// Point of intersection
    pub p: Point3,
    /// Unit surface normal, always facing against the incoming ray
    pub normal: Vec3,
    /// Material at the intersection point
    pub material: &'a dyn Material,
    /// Ray parameter where the intersection occurs
    pub t: f64,
    /// Whether the ray hit the outside of the surface
    pub front_face: bool,
}

impl<'a> HitRecord<'a> {
    /// Build a record, orienting the normal against `ray`.
    ///
    /// `outward_normal` must be unit length.
    pub fn new(
        ray: &Ray,
        t: f64,
        outward_normal: Vec3,
        material: &'a dyn Material,
    ) -> Self {
        let mut rec = Self {
            p: ray.at(t),
            normal: outward_normal,
            material,
            t,
            front_face: true,
        };
        rec.set_face_normal(ray, outward_normal);
        rec
    }

    /// Set the face normal based on ray direction and outward normal.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        // Same direction as the normal means we're inside
        self.front_face = ray.direction().dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Nearest intersection with `ray` whose parameter lies strictly inside `ray_t`.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>>;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;
}

/// A list of hittable objects, tested in insertion order.
#[derive(Clone)]
pub struct HittableList {
    objects: Vec<Arc<dyn Hittable>>,
    bbox: Aabb,
}

impl HittableList {
    /// Create a new empty hittable list.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            bbox: Aabb::EMPTY,
        }
    }

    /// Add an object to the list.
    pub fn add(&mut self, object: Arc<dyn Hittable>) {
        self.bbox = Aabb::surrounding(&self.bbox, &object.bounding_box());
        self.objects.push(object);
    }

    /// Clear all objects from the list.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.bbox = Aabb::EMPTY;
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[Arc<dyn Hittable>] {
        &self.objects
    }
}

impl Default for HittableList {
    fn default() -> Self {
        Self::new()
    }
}

impl Hittable for HittableList {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        let mut closest: Option<HitRecord<'_>> = None;
        let mut closest_so_far = ray_t.max;

        for object in &self.objects {
            if let Some(rec) = object.hit(ray, Interval::new(ray_t.min, closest_so_far)) {
                closest_so_far = rec.t;
                closest = Some(rec);
            }
        }

        closest
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lambertian, Sphere};
    use lumen_math::Color;

    fn sphere(center: Point3, radius: f64) -> Arc<dyn Hittable> {
        let material: Arc<dyn Material> = Arc::new(Lambertian::new(Color::splat(0.5)));
        Arc::new(Sphere::new(center, radius, material))
    }

    #[test]
    fn test_list_returns_nearest_hit() {
        let mut world = HittableList::new();
        // Farther sphere first so insertion order can't decide the answer
        world.add(sphere(Point3::new(0.0, 0.0, -5.0), 0.5));
        world.add(sphere(Point3::new(0.0, 0.0, -2.0), 0.5));

        let ray = Ray::new(Point3::ZERO, Vec3::NEG_Z);
        let rec = world.hit(&ray, Interval::new(0.001, f64::INFINITY)).unwrap();
        assert!((rec.t - 1.5).abs() < 1e-12);
        assert!(rec.front_face);
    }

    #[test]
    fn test_list_respects_interval() {
        let mut world = HittableList::new();
        world.add(sphere(Point3::new(0.0, 0.0, -2.0), 0.5));

        let ray = Ray::new(Point3::ZERO, Vec3::NEG_Z);
        assert!(world.hit(&ray, Interval::new(0.001, 1.0)).is_none());
        // The far side of the sphere is still reachable past the near root
        let rec = world.hit(&ray, Interval::new(2.0, 10.0)).unwrap();
        assert!((rec.t - 2.5).abs() < 1e-12);
        assert!(!rec.front_face);
    }

    #[test]
    fn test_empty_list_misses() {
        let world = HittableList::default();
        let ray = Ray::new(Point3::ZERO, Vec3::X);
        assert!(world.is_empty());
        assert!(world.hit(&ray, Interval::UNIVERSE).is_none());
    }

    #[test]
    fn test_list_bounding_box() {
        let mut world = HittableList::new();
        world.add(sphere(Point3::new(-1.0, 0.0, 0.0), 1.0));
        world.add(sphere(Point3::new(3.0, 0.0, 0.0), 1.0));

        let bbox = world.bounding_box();
        assert_eq!(bbox.x.min, -2.0);
        assert_eq!(bbox.x.max, 4.0);
        assert_eq!(world.len(), 2);

        world.clear();
        assert!(world.is_empty());
    }

    #[test]
    fn test_face_normal_orientation() {
        let material = Lambertian::new(Color::ONE);
        let outward = Vec3::Y;

        let from_above = Ray::new(Point3::new(0.0, 1.0, 0.0), Vec3::NEG_Y);
        let rec = HitRecord::new(&from_above, 1.0, outward, &material);
        assert!(rec.front_face);
        assert_eq!(rec.normal, Vec3::Y);

        let from_below = Ray::new(Point3::new(0.0, -1.0, 0.0), Vec3::Y);
        let rec = HitRecord::new(&from_below, 1.0, outward, &material);
        assert!(!rec.front_face);
        assert_eq!(rec.normal, Vec3::NEG_Y);
    }
}
