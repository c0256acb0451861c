//! Fixed-stride records shared by both compute backends.
//!
//! Every record is `#[repr(C)]`, 16-byte aligned in size, and mirrors a
//! struct in `shaders/path_trace.wgsl` field for field. The scene author
//! never touches these; [`SceneRecords::from_scene`] is the only bridge.

use bytemuck::{Pod, Zeroable};
use nalgebra::Vector3;

use crate::camera::CameraBasis;
use crate::lantern::scene::{Material, RenderSettings, Scene};
use crate::util::{to_array, Vec3};

pub const LAMBERTIAN: u32 = 0;
pub const METAL: u32 = 1;
pub const DIELECTRIC: u32 = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SphereRecord {
    pub center: [f32; 3],
    pub radius: f32,
    pub material_index: u32,
    pub _pad: [u32; 3],
}

impl SphereRecord {
    pub fn center(&self) -> Vec3 {
        Vector3::from(self.center)
    }
}

/// Unused fields stay zero so every material has the same stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialRecord {
    pub albedo: [f32; 3],
    pub kind: u32,
    pub fuzz: f32,
    pub refraction_index: f32,
    pub _pad: [f32; 2],
}

impl MaterialRecord {
    pub fn albedo(&self) -> Vec3 {
        Vector3::from(self.albedo)
    }
}

impl From<&Material> for MaterialRecord {
    fn from(material: &Material) -> Self {
        let (kind, fuzz, refraction_index) = match *material {
            Material::Lambertian { .. } => (LAMBERTIAN, 0.0, 0.0),
            Material::Metal { fuzz, .. } => (METAL, fuzz, 0.0),
            Material::Dielectric {
                refraction_index, ..
            } => (DIELECTRIC, 0.0, refraction_index),
        };

        Self {
            albedo: to_array(&material.albedo()),
            kind,
            fuzz,
            refraction_index,
            _pad: [0.0; 2],
        }
    }
}

/// Camera basis in vec4 slots; `w` components carry the lens radius or padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraRecord {
    pub origin: [f32; 3],
    pub lens_radius: f32,
    pub lower_left_corner: [f32; 3],
    pub _pad0: f32,
    pub horizontal: [f32; 3],
    pub _pad1: f32,
    pub vertical: [f32; 3],
    pub _pad2: f32,
    pub u: [f32; 3],
    pub _pad3: f32,
    pub v: [f32; 3],
    pub _pad4: f32,
    pub w: [f32; 3],
    pub _pad5: f32,
}

impl CameraRecord {
    pub fn basis(&self) -> CameraBasis {
        CameraBasis {
            origin: Vector3::from(self.origin),
            lower_left_corner: Vector3::from(self.lower_left_corner),
            horizontal: Vector3::from(self.horizontal),
            vertical: Vector3::from(self.vertical),
            u: Vector3::from(self.u),
            v: Vector3::from(self.v),
            w: Vector3::from(self.w),
            lens_radius: self.lens_radius,
        }
    }
}

impl From<&CameraBasis> for CameraRecord {
    fn from(basis: &CameraBasis) -> Self {
        Self {
            origin: to_array(&basis.origin),
            lens_radius: basis.lens_radius,
            lower_left_corner: to_array(&basis.lower_left_corner),
            horizontal: to_array(&basis.horizontal),
            vertical: to_array(&basis.vertical),
            u: to_array(&basis.u),
            v: to_array(&basis.v),
            w: to_array(&basis.w),
            ..Self::zeroed()
        }
    }
}

/// Per-dispatch scalars.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub width: u32,
    pub height: u32,
    /// Dispatches since the last reset, this one excluded.
    pub frame_index: u32,
    /// Samples per pixel already in the accumulation buffer.
    pub sample_base: u32,
    pub samples_per_frame: u32,
    pub max_bounces: u32,
    pub sphere_count: u32,
    pub material_count: u32,
}

impl FrameUniforms {
    /// Total samples per pixel once this dispatch completes. Saturates
    /// rather than wrapping.
    pub fn sample_total(&self) -> u32 {
        self.sample_base.saturating_add(self.samples_per_frame)
    }
}

/// Scene flattened into kernel records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneRecords {
    pub spheres: Vec<SphereRecord>,
    pub materials: Vec<MaterialRecord>,
}

impl SceneRecords {
    pub fn from_scene(scene: &Scene) -> Self {
        let spheres = scene
            .spheres
            .iter()
            .map(|sphere| SphereRecord {
                center: to_array(&sphere.center),
                radius: sphere.radius,
                material_index: sphere.material_index as u32,
                _pad: [0; 3],
            })
            .collect();
        let materials = scene.materials.iter().map(MaterialRecord::from).collect();

        Self { spheres, materials }
    }
}

/// Everything one dispatch reads.
#[derive(Debug, Clone, Copy)]
pub struct FrameData<'a> {
    pub uniforms: FrameUniforms,
    pub camera: CameraRecord,
    pub spheres: &'a [SphereRecord],
    pub materials: &'a [MaterialRecord],
}

impl<'a> FrameData<'a> {
    pub fn new(
        records: &'a SceneRecords,
        scene: &Scene,
        settings: &RenderSettings,
        frame_index: u32,
        sample_base: u32,
    ) -> Self {
        let basis = scene.camera.basis(settings.width, settings.height);

        Self {
            uniforms: FrameUniforms {
                width: settings.width,
                height: settings.height,
                frame_index,
                sample_base,
                samples_per_frame: settings.samples_per_frame,
                max_bounces: settings.max_bounces,
                sphere_count: records.spheres.len() as u32,
                material_count: records.materials.len() as u32,
            },
            camera: CameraRecord::from(&basis),
            spheres: &records.spheres,
            materials: &records.materials,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use super::*;

    #[test]
    fn record_strides_match_shader_layout() {
        assert_eq!(size_of::<SphereRecord>(), 32);
        assert_eq!(size_of::<MaterialRecord>(), 32);
        assert_eq!(size_of::<CameraRecord>(), 112);
        assert_eq!(size_of::<FrameUniforms>(), 32);
    }

    #[test]
    fn material_tags_and_unused_fields() {
        let glass = MaterialRecord::from(&Material::glass(1.5));
        assert_eq!(glass.kind, DIELECTRIC);
        assert_eq!(glass.refraction_index, 1.5);
        assert_eq!(glass.fuzz, 0.0);

        let metal = MaterialRecord::from(&Material::metal(0.7, 0.6, 0.5, 0.3));
        assert_eq!(metal.kind, METAL);
        assert_eq!(metal.fuzz, 0.3);
        assert_eq!(metal.refraction_index, 0.0);
        assert_eq!(metal.albedo, [0.7, 0.6, 0.5]);

        let diffuse = MaterialRecord::from(&Material::lambertian(0.1, 0.2, 0.3));
        assert_eq!(diffuse.kind, LAMBERTIAN);
        assert_eq!((diffuse.fuzz, diffuse.refraction_index), (0.0, 0.0));
    }

    #[test]
    fn scene_serialization_preserves_order_and_indices() {
        let scene = Scene::default_scene();
        let records = SceneRecords::from_scene(&scene);

        assert_eq!(records.spheres.len(), scene.spheres.len());
        assert_eq!(records.materials.len(), scene.materials.len());
        for (record, sphere) in records.spheres.iter().zip(&scene.spheres) {
            assert_eq!(record.center(), sphere.center);
            assert_eq!(record.radius, sphere.radius);
            assert_eq!(record.material_index as usize, sphere.material_index);
        }
    }

    #[test]
    fn camera_record_carries_basis() {
        let basis = Scene::default_scene().camera.basis(800, 600);
        assert_eq!(CameraRecord::from(&basis).basis(), basis);
    }

    #[test]
    fn frame_data_counts() {
        let scene = Scene::default_scene();
        let records = SceneRecords::from_scene(&scene);
        let settings = RenderSettings {
            samples_per_frame: 4,
            ..Default::default()
        };
        let frame = FrameData::new(&records, &scene, &settings, 3, 12);

        assert_eq!(frame.uniforms.sphere_count, 4);
        assert_eq!(frame.uniforms.material_count, 4);
        assert_eq!(frame.uniforms.sample_total(), 16);
        assert_eq!(frame.uniforms.frame_index, 3);
    }

    #[test]
    fn sample_total_saturates() {
        let uniforms = FrameUniforms {
            sample_base: u32::MAX - 1,
            samples_per_frame: 4,
            ..FrameUniforms::zeroed()
        };
        assert_eq!(uniforms.sample_total(), u32::MAX);
    }
}
