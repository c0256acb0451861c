use crate::lantern::hit::HitPayload;
use crate::lantern::layout::{MaterialRecord, DIELECTRIC, METAL};
use crate::lantern::rng::KernelRng;
use crate::util::{near_zero, reflect, refract, Vec3};

/// A ray that survived the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scatter {
    pub direction: Vec3,
    pub attenuation: Vec3,
}

/// `None` means the ray was absorbed.
pub fn scatter(
    material: &MaterialRecord,
    incoming: &Vec3,
    hit: &HitPayload,
    rng: &mut KernelRng,
) -> Option<Scatter> {
    match material.kind {
        METAL => scatter_metal(material, incoming, hit, rng),
        DIELECTRIC => Some(scatter_dielectric(material, incoming, hit, rng)),
        // unknown tags shade as diffuse
        _ => Some(scatter_lambertian(material, hit, rng)),
    }
}

fn scatter_lambertian(material: &MaterialRecord, hit: &HitPayload, rng: &mut KernelRng) -> Scatter {
    let mut direction = hit.normal + rng.unit_vector();
    if near_zero(&direction) {
        direction = hit.normal;
    }

    Scatter {
        direction,
        attenuation: material.albedo(),
    }
}

fn scatter_metal(
    material: &MaterialRecord,
    incoming: &Vec3,
    hit: &HitPayload,
    rng: &mut KernelRng,
) -> Option<Scatter> {
    let reflected = reflect(&incoming.normalize(), &hit.normal);
    let direction = reflected + rng.in_unit_sphere() * material.fuzz;

    // fuzzed below the surface
    if direction.dot(&hit.normal) <= 0.0 {
        return None;
    }

    Some(Scatter {
        direction,
        attenuation: material.albedo(),
    })
}

fn scatter_dielectric(
    material: &MaterialRecord,
    incoming: &Vec3,
    hit: &HitPayload,
    rng: &mut KernelRng,
) -> Scatter {
    let ratio = if hit.front_face {
        1.0 / material.refraction_index
    } else {
        material.refraction_index
    };

    let unit_direction = incoming.normalize();
    let cos_theta = (-unit_direction).dot(&hit.normal).min(1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

    let cannot_refract = ratio * sin_theta > 1.0;
    let direction = if cannot_refract || reflectance(cos_theta, ratio) > rng.next() {
        reflect(&unit_direction, &hit.normal)
    } else {
        refract(&unit_direction, &hit.normal, ratio)
    };

    Scatter {
        direction,
        attenuation: material.albedo(),
    }
}

/// Schlick's approximation of Fresnel reflectance.
pub fn reflectance(cosine: f32, refraction_ratio: f32) -> f32 {
    let r0 = ((1.0 - refraction_ratio) / (1.0 + refraction_ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lantern::scene::Material;

    fn hit_facing_up(front_face: bool) -> HitPayload {
        HitPayload {
            distance: 1.0,
            position: Vec3::zeros(),
            normal: Vec3::new(0.0, 1.0, 0.0),
            front_face,
            material_index: 0,
        }
    }

    #[test]
    fn lambertian_always_scatters_into_upper_hemisphere() {
        let material = MaterialRecord::from(&Material::lambertian(0.4, 0.2, 0.1));
        let hit = hit_facing_up(true);
        let incoming = Vec3::new(0.0, -1.0, 0.0);

        for seed in 0..200 {
            let mut rng = KernelRng::seed(seed);
            let scattered = scatter(&material, &incoming, &hit, &mut rng).unwrap();
            assert!(scattered.direction.dot(&hit.normal) >= 0.0);
            assert!(!near_zero(&scattered.direction));
            assert_eq!(scattered.attenuation, Vec3::new(0.4, 0.2, 0.1));
        }
    }

    #[test]
    fn perfect_mirror_has_no_stochastic_deviation() {
        let material = MaterialRecord::from(&Material::metal(0.7, 0.6, 0.5, 0.0));
        let hit = hit_facing_up(true);
        let incoming = Vec3::new(1.0, -1.0, 0.5);
        let expected = reflect(&incoming.normalize(), &hit.normal);

        for seed in 0..100 {
            let mut rng = KernelRng::seed(seed);
            let scattered = scatter(&material, &incoming, &hit, &mut rng).unwrap();
            assert_eq!(scattered.direction, expected);
        }
    }

    #[test]
    fn rough_metal_grazing_ray_can_be_absorbed() {
        let material = MaterialRecord::from(&Material::metal(0.7, 0.6, 0.5, 1.0));
        let hit = hit_facing_up(true);
        let grazing = Vec3::new(1.0, -0.01, 0.0);

        let absorbed = (0..500)
            .filter(|&seed| scatter(&material, &grazing, &hit, &mut KernelRng::seed(seed)).is_none())
            .count();
        assert!(absorbed > 0);
        assert!(absorbed < 500);
    }

    #[test]
    fn total_internal_reflection_always_reflects() {
        let material = MaterialRecord::from(&Material::glass(1.5));
        // leaving the glass at ~60 degrees, past the ~41.8 degree critical angle
        let hit = hit_facing_up(false);
        let incoming = Vec3::new(60f32.to_radians().sin(), -60f32.to_radians().cos(), 0.0);
        let expected = reflect(&incoming.normalize(), &hit.normal);

        for seed in 0..200 {
            let mut rng = KernelRng::seed(seed);
            let scattered = scatter(&material, &incoming, &hit, &mut rng).unwrap();
            assert!((scattered.direction - expected).norm() < 1e-6);
        }
    }

    #[test]
    fn head_on_glass_mostly_refracts() {
        let material = MaterialRecord::from(&Material::glass(1.5));
        let hit = hit_facing_up(true);
        let incoming = Vec3::new(0.0, -1.0, 0.0);

        let refracted = (0..1_000)
            .filter(|&seed| {
                let scattered = scatter(&material, &incoming, &hit, &mut KernelRng::seed(seed)).unwrap();
                scattered.direction.y < 0.0
            })
            .count();
        // normal incidence reflectance is 4%
        assert!(refracted > 900, "refracted {refracted}");
        assert!(refracted < 1_000);
    }

    #[test]
    fn schlick_endpoints() {
        assert!((reflectance(1.0, 1.5) - 0.04).abs() < 1e-6);
        assert!((reflectance(0.0, 1.5) - 1.0).abs() < 1e-6);
    }
}
