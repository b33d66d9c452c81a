//! Turning scene descriptions into renderable objects.

use std::sync::Arc;

use crate::error::RenderResult;
use crate::{CameraConfig, Dielectric, Hittable, HittableList, Lambertian, Material, Metal, Sphere};
use lumen_core::{CameraDesc, MaterialDesc, SceneDescription, ShapeDesc};

/// Build the renderer material for a description.
pub fn build_material(desc: &MaterialDesc) -> Arc<dyn Material> {
    match *desc {
        MaterialDesc::Lambertian { albedo } => Arc::new(Lambertian::new(albedo)),
        MaterialDesc::Metal { albedo, fuzz } => Arc::new(Metal::new(albedo, fuzz)),
        MaterialDesc::Dielectric { ir } => Arc::new(Dielectric::new(ir)),
    }
}

/// Validate `scene` and build its primitives.
///
/// Each material is created once and shared by every primitive that
/// references it.
pub fn build_world(scene: &SceneDescription) -> RenderResult<HittableList> {
    scene.validate()?;

    let materials: Vec<Arc<dyn Material>> = scene.materials.iter().map(build_material).collect();

    let mut world = HittableList::new();
    for primitive in &scene.primitives {
        let material = Arc::clone(&materials[primitive.material]);
        match primitive.shape {
            ShapeDesc::Sphere { center, radius } => {
                world.add(Arc::new(Sphere::new(center, radius, material)));
            }
        }
    }

    log::info!(
        "Built scene '{}': {} objects, {} materials, bounds {}",
        scene.name,
        world.len(),
        materials.len(),
        describe_bounds(&world)
    );

    Ok(world)
}

/// Camera settings for a description, or the default view when it has none.
pub fn camera_config(camera: Option<&CameraDesc>, aspect_ratio: f64) -> CameraConfig {
    let config = match camera {
        Some(desc) => CameraConfig::new()
            .with_position(desc.look_from, desc.look_at, desc.vup)
            .with_lens(desc.vfov, desc.aperture, desc.focus_distance()),
        None => CameraConfig::new(),
    };
    config.with_aspect_ratio(aspect_ratio)
}

fn describe_bounds(world: &HittableList) -> String {
    if world.is_empty() {
        return "empty".to_string();
    }
    let bbox = world.bounding_box();
    format!(
        "[{:.2}, {:.2}, {:.2}]..[{:.2}, {:.2}, {:.2}]",
        bbox.x.min, bbox.y.min, bbox.z.min, bbox.x.max, bbox.y.max, bbox.z.max
    )
}
