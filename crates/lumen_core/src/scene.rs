//! Scene descriptions for Lumen.
//!
//! A description is plain data: materials, primitives that reference them by
//! index, and an optional camera placement. The renderer turns it into
//! intersectable geometry; this crate only loads, builds and validates it.

use std::fmt;
use std::path::Path;

use lumen_math::{Color, Point3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating a scene description.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Primitive {primitive} references material {material}, but only {count} materials exist")]
    InvalidMaterial {
        primitive: usize,
        material: usize,
        count: usize,
    },

    #[error("Primitive {primitive} has invalid sphere radius {radius}")]
    InvalidRadius { primitive: usize, radius: f64 },

    #[error("Material {material} has invalid refractive index {ir}")]
    InvalidRefractiveIndex { material: usize, ir: f64 },

    #[error("Invalid camera: {0}")]
    InvalidCamera(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Surface description, mirrored one-to-one by the renderer's materials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialDesc {
    /// Diffuse surface.
    Lambertian { albedo: Color },

    /// Reflective surface; `fuzz` is clamped to [0, 1] when built.
    Metal { albedo: Color, fuzz: f64 },

    /// Clear refractive surface with index of refraction `ir`.
    Dielectric { ir: f64 },
}

/// Geometric shape of a primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeDesc {
    Sphere { center: Point3, radius: f64 },
}

/// A shape paired with the index of its material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveDesc {
    pub shape: ShapeDesc,
    pub material: usize,
}

fn default_vup() -> Vec3 {
    Vec3::Y
}

/// Camera placement suggested by a scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraDesc {
    pub look_from: Point3,
    pub look_at: Point3,
    #[serde(default = "default_vup")]
    pub vup: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f64,
    #[serde(default)]
    pub aperture: f64,
    /// Distance to the plane of perfect focus (defaults to |look_from - look_at|)
    #[serde(default)]
    pub focus_dist: Option<f64>,
}

impl CameraDesc {
    /// Create a pinhole camera placement focused on `look_at`.
    pub fn new(look_from: Point3, look_at: Point3, vfov: f64) -> Self {
        Self {
            look_from,
            look_at,
            vup: Vec3::Y,
            vfov,
            aperture: 0.0,
            focus_dist: None,
        }
    }

    /// Set the lens aperture and focus distance.
    pub fn with_lens(mut self, aperture: f64, focus_dist: f64) -> Self {
        self.aperture = aperture;
        self.focus_dist = Some(focus_dist);
        self
    }

    /// Focus distance, falling back to the distance to the target.
    pub fn focus_distance(&self) -> f64 {
        self.focus_dist
            .unwrap_or_else(|| (self.look_from - self.look_at).length())
    }

    fn validate(&self) -> SceneResult<()> {
        let view = self.look_from - self.look_at;
        if view.length_squared() == 0.0 {
            return Err(SceneError::InvalidCamera(
                "look_from and look_at coincide".to_string(),
            ));
        }
        if self.vup.cross(view).length_squared() == 0.0 {
            return Err(SceneError::InvalidCamera(
                "vup is parallel to the view direction".to_string(),
            ));
        }
        if !(self.vfov > 0.0 && self.vfov < 180.0) {
            return Err(SceneError::InvalidCamera(format!(
                "vfov {} is outside (0, 180)",
                self.vfov
            )));
        }
        if self.focus_distance() <= 0.0 {
            return Err(SceneError::InvalidCamera(
                "focus distance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A complete scene: shared materials, primitives and a camera suggestion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Scene name (built-in selector or file stem)
    #[serde(default)]
    pub name: String,

    /// Materials, referenced by index from primitives
    pub materials: Vec<MaterialDesc>,

    /// Primitives in insertion order
    pub primitives: Vec<PrimitiveDesc>,

    /// Camera placement (optional)
    #[serde(default)]
    pub camera: Option<CameraDesc>,
}

impl SceneDescription {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a material to the scene and return its index.
    pub fn add_material(&mut self, material: MaterialDesc) -> usize {
        let id = self.materials.len();
        self.materials.push(material);
        id
    }

    /// Add a sphere that uses the material at `material`.
    pub fn add_sphere(&mut self, center: Point3, radius: f64, material: usize) {
        self.primitives.push(PrimitiveDesc {
            shape: ShapeDesc::Sphere { center, radius },
            material,
        });
    }

    /// Set the camera placement.
    pub fn with_camera(mut self, camera: CameraDesc) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Get primitive count.
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Get material count.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Check that every reference and parameter is usable by the renderer.
    pub fn validate(&self) -> SceneResult<()> {
        for (index, material) in self.materials.iter().enumerate() {
            if let MaterialDesc::Dielectric { ir } = material {
                if !(ir.is_finite() && *ir > 0.0) {
                    return Err(SceneError::InvalidRefractiveIndex {
                        material: index,
                        ir: *ir,
                    });
                }
            }
        }

        for (index, primitive) in self.primitives.iter().enumerate() {
            if primitive.material >= self.materials.len() {
                return Err(SceneError::InvalidMaterial {
                    primitive: index,
                    material: primitive.material,
                    count: self.materials.len(),
                });
            }
            match primitive.shape {
                ShapeDesc::Sphere { radius, .. } => {
                    if !(radius.is_finite() && radius > 0.0) {
                        return Err(SceneError::InvalidRadius {
                            primitive: index,
                            radius,
                        });
                    }
                }
            }
        }

        if let Some(camera) = &self.camera {
            camera.validate()?;
        }

        Ok(())
    }

    /// Parse and validate a JSON scene description.
    pub fn from_json_str(json: &str) -> SceneResult<Self> {
        let scene: SceneDescription = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Load and validate a JSON scene description from disk.
    ///
    /// The file stem becomes the scene name when the file does not set one.
    pub fn load<P: AsRef<Path>>(path: P) -> SceneResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let mut scene = Self::from_json_str(&json)?;

        if scene.name.is_empty() {
            scene.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed")
                .to_string();
        }

        log::info!(
            "Loaded scene '{}' from {}: {} primitives, {} materials",
            scene.name,
            path.display(),
            scene.primitive_count(),
            scene.material_count()
        );
        Ok(scene)
    }
}

/// Built-in scenes selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    /// Ground plane, a grid of small random spheres and three large ones
    Random,
    /// Ground, a diffuse sphere flanked by glass and metal
    ThreeSpheres,
    /// A blue and a red sphere touching at the view axis
    TwoSpheres,
}

impl SceneKind {
    /// All built-in scenes.
    pub const ALL: [SceneKind; 3] = [
        SceneKind::Random,
        SceneKind::ThreeSpheres,
        SceneKind::TwoSpheres,
    ];

    /// Selector name of this scene.
    pub fn name(&self) -> &'static str {
        match self {
            SceneKind::Random => "random",
            SceneKind::ThreeSpheres => "three-spheres",
            SceneKind::TwoSpheres => "two-spheres",
        }
    }

    /// Build the scene. Only `Random` consumes the seed.
    pub fn build(&self, seed: u64) -> SceneDescription {
        match self {
            SceneKind::Random => random_scene(seed),
            SceneKind::ThreeSpheres => three_spheres_scene(),
            SceneKind::TwoSpheres => two_spheres_scene(),
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn random_color<R: Rng>(rng: &mut R) -> Color {
    Color::new(rng.gen(), rng.gen(), rng.gen())
}

fn random_scene(seed: u64) -> SceneDescription {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = SceneDescription::new("random").with_camera(
        CameraDesc::new(Point3::new(13.0, 2.0, 3.0), Point3::ZERO, 20.0).with_lens(0.1, 10.0),
    );

    let ground = scene.add_material(MaterialDesc::Lambertian {
        albedo: Color::splat(0.5),
    });
    scene.add_sphere(Point3::new(0.0, -1000.0, 0.0), 1000.0, ground);

    // Keep small spheres clear of the large metal one
    let clearance_center = Point3::new(4.0, 0.2, 0.0);

    for a in -11..11 {
        for b in -11..11 {
            let choose_mat: f64 = rng.gen();
            let center = Point3::new(
                a as f64 + 0.9 * rng.gen::<f64>(),
                0.2,
                b as f64 + 0.9 * rng.gen::<f64>(),
            );

            if (center - clearance_center).length() <= 0.9 {
                continue;
            }

            let material = if choose_mat < 0.8 {
                let albedo = random_color(&mut rng) * random_color(&mut rng);
                MaterialDesc::Lambertian { albedo }
            } else if choose_mat < 0.95 {
                let albedo = Color::new(
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                );
                let fuzz = rng.gen_range(0.0..0.5);
                MaterialDesc::Metal { albedo, fuzz }
            } else {
                MaterialDesc::Dielectric { ir: 1.5 }
            };

            let id = scene.add_material(material);
            scene.add_sphere(center, 0.2, id);
        }
    }

    let glass = scene.add_material(MaterialDesc::Dielectric { ir: 1.5 });
    scene.add_sphere(Point3::new(0.0, 1.0, 0.0), 1.0, glass);

    let diffuse = scene.add_material(MaterialDesc::Lambertian {
        albedo: Color::new(0.4, 0.2, 0.1),
    });
    scene.add_sphere(Point3::new(-4.0, 1.0, 0.0), 1.0, diffuse);

    let metal = scene.add_material(MaterialDesc::Metal {
        albedo: Color::new(0.7, 0.6, 0.5),
        fuzz: 0.0,
    });
    scene.add_sphere(Point3::new(4.0, 1.0, 0.0), 1.0, metal);

    scene
}

fn three_spheres_scene() -> SceneDescription {
    let mut scene = SceneDescription::new("three-spheres").with_camera(CameraDesc::new(
        Point3::new(-2.0, 2.0, 1.0),
        Point3::new(0.0, 0.0, -1.0),
        20.0,
    ));

    let ground = scene.add_material(MaterialDesc::Lambertian {
        albedo: Color::new(0.8, 0.8, 0.0),
    });
    let center = scene.add_material(MaterialDesc::Lambertian {
        albedo: Color::new(0.1, 0.2, 0.5),
    });
    let left = scene.add_material(MaterialDesc::Dielectric { ir: 1.5 });
    let right = scene.add_material(MaterialDesc::Metal {
        albedo: Color::new(0.8, 0.6, 0.2),
        fuzz: 0.0,
    });

    scene.add_sphere(Point3::new(0.0, -100.5, -1.0), 100.0, ground);
    scene.add_sphere(Point3::new(0.0, 0.0, -1.0), 0.5, center);
    scene.add_sphere(Point3::new(-1.0, 0.0, -1.0), 0.5, left);
    scene.add_sphere(Point3::new(1.0, 0.0, -1.0), 0.5, right);

    scene
}

fn two_spheres_scene() -> SceneDescription {
    let mut scene = SceneDescription::new("two-spheres").with_camera(CameraDesc::new(
        Point3::ZERO,
        Point3::new(0.0, 0.0, -1.0),
        90.0,
    ));

    let r = std::f64::consts::FRAC_PI_4.cos();
    let blue = scene.add_material(MaterialDesc::Lambertian {
        albedo: Color::new(0.0, 0.0, 1.0),
    });
    let red = scene.add_material(MaterialDesc::Lambertian {
        albedo: Color::new(1.0, 0.0, 0.0),
    });

    scene.add_sphere(Point3::new(-r, 0.0, -1.0), r, blue);
    scene.add_sphere(Point3::new(r, 0.0, -1.0), r, red);

    scene
}
