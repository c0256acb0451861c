use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera::Camera;
use crate::error::{RenderError, Result};
use crate::util::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    /// Negative radii are accepted; they flip the normal (hollow spheres).
    pub radius: f32,
    pub material_index: usize,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material_index: usize) -> Self {
        Self {
            center,
            radius,
            material_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    Lambertian { albedo: Vec3 },
    /// `fuzz` 0 is a perfect mirror.
    Metal { albedo: Vec3, fuzz: f32 },
    /// `albedo` tints the glass, usually white.
    Dielectric { albedo: Vec3, refraction_index: f32 },
}

impl Material {
    pub fn lambertian(r: f32, g: f32, b: f32) -> Self {
        Self::Lambertian {
            albedo: Vec3::new(r, g, b),
        }
    }

    pub fn metal(r: f32, g: f32, b: f32, fuzz: f32) -> Self {
        Self::Metal {
            albedo: Vec3::new(r, g, b),
            fuzz,
        }
    }

    pub fn glass(refraction_index: f32) -> Self {
        Self::Dielectric {
            albedo: Vec3::new(1.0, 1.0, 1.0),
            refraction_index,
        }
    }

    pub fn albedo(&self) -> Vec3 {
        match *self {
            Self::Lambertian { albedo }
            | Self::Metal { albedo, .. }
            | Self::Dielectric { albedo, .. } => albedo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    /// Indexed by [`Sphere::material_index`].
    pub materials: Vec<Material>,
    pub camera: Camera,
}

impl Scene {
    /// Ground plus one diffuse, one glass and one metal sphere.
    pub fn default_scene() -> Self {
        let materials = vec![
            Material::lambertian(0.5, 0.5, 0.5),
            Material::lambertian(0.4, 0.2, 0.1),
            Material::glass(1.5),
            Material::metal(0.7, 0.6, 0.5, 0.0),
        ];
        let spheres = vec![
            Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, 0),
            Sphere::new(Vec3::new(-4.0, 1.0, 0.0), 1.0, 1),
            Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, 2),
            Sphere::new(Vec3::new(4.0, 1.0, 0.0), 1.0, 3),
        ];

        Self {
            spheres,
            materials,
            camera: Camera::default(),
        }
    }

    /// The default scene surrounded by a grid of small random spheres.
    /// The same seed always produces the same scene.
    pub fn random_scene(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scene = Self::default_scene();
        let clearing = Vec3::new(4.0, 0.2, 0.0);

        for a in -11..11 {
            for b in -11..11 {
                let center = Vec3::new(
                    a as f32 + 0.9 * rng.gen::<f32>(),
                    0.2,
                    b as f32 + 0.9 * rng.gen::<f32>(),
                );
                if (center - clearing).norm() <= 0.9 {
                    continue;
                }

                let choice = rng.gen::<f32>();
                let material = if choice < 0.8 {
                    let albedo = Vec3::from_fn(|_, _| rng.gen::<f32>() * rng.gen::<f32>());
                    Material::Lambertian { albedo }
                } else if choice < 0.95 {
                    let albedo = Vec3::from_fn(|_, _| rng.gen_range(0.5..1.0));
                    Material::Metal {
                        albedo,
                        fuzz: rng.gen_range(0.0..0.5),
                    }
                } else {
                    Material::glass(1.5)
                };

                scene.materials.push(material);
                scene
                    .spheres
                    .push(Sphere::new(center, 0.2, scene.materials.len() - 1));
            }
        }

        scene.camera.aperture = 0.1;
        scene
    }

    /// Same geometry and materials, camera ignored.
    pub fn same_structure(&self, other: &Scene) -> bool {
        self.spheres == other.spheres && self.materials == other.materials
    }

    /// Collaborator-side check of the caller contracts the kernel relies on.
    pub fn validate(&self) -> Result<()> {
        if let Some((index, sphere)) = self
            .spheres
            .iter()
            .enumerate()
            .find(|(_, sphere)| sphere.material_index >= self.materials.len())
        {
            return Err(RenderError::InvalidScene(format!(
                "sphere {index} references material {} but only {} exist",
                sphere.material_index,
                self.materials.len()
            )));
        }

        if self.camera.is_degenerate() {
            return Err(RenderError::InvalidScene(
                "camera up vector is parallel to the view direction".to_owned(),
            ));
        }

        Ok(())
    }
}

/// When a camera-only change should throw away accumulated samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Any scene difference, camera included, resets accumulation.
    #[default]
    OnAnyChange,
    /// Only sphere/material edits reset; camera motion keeps accumulating.
    StructuralOnly,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Samples taken per pixel in each dispatch.
    pub samples_per_frame: u32,
    /// Bounce budget; 0 renders black.
    pub max_bounces: u32,
    pub reset_policy: ResetPolicy,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            samples_per_frame: 1,
            max_bounces: 8,
            reset_policy: ResetPolicy::OnAnyChange,
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidSettings(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.samples_per_frame == 0 {
            return Err(RenderError::InvalidSettings(
                "samples_per_frame must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
