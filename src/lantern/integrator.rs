use crate::lantern::hit::closest_hit;
use crate::lantern::layout::{MaterialRecord, SphereRecord};
use crate::lantern::material::scatter;
use crate::lantern::ray::Ray;
use crate::lantern::rng::KernelRng;
use crate::util::{lerp, Vec3};

/// Keeps a bounced ray from re-hitting the surface it left.
pub const SHADOW_ACNE_EPSILON: f32 = 0.001;

/// White at the nadir, sky blue at the zenith.
pub fn sky_color(direction: &Vec3) -> Vec3 {
    let t = 0.5 * (direction.normalize().y + 1.0);
    lerp(&Vec3::new(1.0, 1.0, 1.0), &Vec3::new(0.5, 0.7, 1.0), t)
}

/// Radiance along `ray`, bouncing at most `max_bounces` times.
///
/// Iterative, matching the compute shader loop. Paths still alive when the
/// budget runs out contribute black.
pub fn ray_color(
    spheres: &[SphereRecord],
    materials: &[MaterialRecord],
    ray: Ray,
    max_bounces: u32,
    rng: &mut KernelRng,
) -> Vec3 {
    let mut ray = ray;
    let mut throughput = Vec3::new(1.0, 1.0, 1.0);

    for _ in 0..max_bounces {
        let Some(hit) = closest_hit(spheres, &ray, SHADOW_ACNE_EPSILON, f32::INFINITY) else {
            return throughput.component_mul(&sky_color(&ray.direction));
        };

        let material = &materials[hit.material_index as usize];
        let Some(scattered) = scatter(material, &ray.direction, &hit, rng) else {
            return Vec3::zeros();
        };

        throughput.component_mul_assign(&scattered.attenuation);
        ray = Ray::new(hit.position, scattered.direction);
    }

    Vec3::zeros()
}
