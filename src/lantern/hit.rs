use crate::lantern::layout::SphereRecord;
use crate::lantern::ray::Ray;
use crate::util::Vec3;

/// Where a ray landed. Shading happens later, in the integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPayload {
    pub distance: f32,
    pub position: Vec3,
    /// Always opposes the incoming ray.
    pub normal: Vec3,
    /// True when the ray arrived from outside the sphere.
    pub front_face: bool,
    pub material_index: u32,
}

/// Nearest root of |o + t·d − c|² = r² strictly inside (t_min, t_max).
pub fn hit_sphere(sphere: &SphereRecord, ray: &Ray, t_min: f32, t_max: f32) -> Option<f32> {
    let oc = ray.origin - sphere.center();

    let a = ray.direction.norm_squared();
    let half_b = oc.dot(&ray.direction);
    let c = oc.norm_squared() - sphere.radius * sphere.radius;

    let discriminant = half_b * half_b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    [(-half_b - sqrt_d) / a, (-half_b + sqrt_d) / a]
        .into_iter()
        .find(|&root| t_min < root && root < t_max)
}

/// Linear scan keeping the nearest hit. `t_max` shrinks as hits are found,
/// so of two spheres at the same distance the earlier one in the list wins.
pub fn closest_hit(spheres: &[SphereRecord], ray: &Ray, t_min: f32, t_max: f32) -> Option<HitPayload> {
    let mut closest: Option<(&SphereRecord, f32)> = None;
    let mut closest_so_far = t_max;

    for sphere in spheres {
        if let Some(distance) = hit_sphere(sphere, ray, t_min, closest_so_far) {
            closest_so_far = distance;
            closest = Some((sphere, distance));
        }
    }

    closest.map(|(sphere, distance)| payload(sphere, ray, distance))
}

fn payload(sphere: &SphereRecord, ray: &Ray, distance: f32) -> HitPayload {
    let position = ray.at(distance);
    // dividing by the signed radius turns hollow spheres inside out
    let outward = (position - sphere.center()) / sphere.radius;
    let front_face = ray.direction.dot(&outward) < 0.0;

    HitPayload {
        distance,
        position,
        normal: if front_face { outward } else { -outward },
        front_face,
        material_index: sphere.material_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(x: f32, y: f32, z: f32, radius: f32, material_index: u32) -> SphereRecord {
        SphereRecord {
            center: [x, y, z],
            radius,
            material_index,
            _pad: [0; 3],
        }
    }

    fn ray(origin: [f32; 3], direction: [f32; 3]) -> Ray {
        Ray::new(Vec3::from(origin), Vec3::from(direction))
    }

    #[test]
    fn miss_when_closest_approach_exceeds_radius() {
        let s = sphere(0.0, 0.0, 0.0, 1.0, 0);
        let r = ray([-5.0, 1.5, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(hit_sphere(&s, &r, 0.001, f32::INFINITY), None);
    }

    #[test]
    fn smaller_root_from_outside() {
        let s = sphere(0.0, 0.0, 0.0, 1.0, 0);
        let r = ray([-5.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let t = hit_sphere(&s, &r, 0.001, f32::INFINITY).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn unnormalized_direction_scales_distance() {
        let s = sphere(0.0, 0.0, 0.0, 1.0, 0);
        let r = ray([-5.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let t = hit_sphere(&s, &r, 0.001, f32::INFINITY).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn larger_root_when_smaller_is_out_of_range() {
        let s = sphere(0.0, 0.0, 0.0, 1.0, 0);
        let inside = ray([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let t = hit_sphere(&s, &inside, 0.001, f32::INFINITY).unwrap();
        assert!((t - 1.0).abs() < 1e-5);

        let outside = ray([-5.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(hit_sphere(&s, &outside, 0.001, 3.0), None);
        let far = hit_sphere(&s, &outside, 4.5, f32::INFINITY).unwrap();
        assert!((far - 6.0).abs() < 1e-5);
    }

    #[test]
    fn closest_hit_reports_nearest_regardless_of_order() {
        let spheres = [sphere(10.0, 0.0, 0.0, 1.0, 0), sphere(4.0, 0.0, 0.0, 1.0, 1)];
        let r = ray([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);

        let hit = closest_hit(&spheres, &r, 0.001, f32::INFINITY).unwrap();
        assert_eq!(hit.material_index, 1);
        assert!((hit.distance - 3.0).abs() < 1e-5);
        assert!((hit.position - Vec3::new(3.0, 0.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn equal_distance_keeps_first_in_list() {
        let spheres = [sphere(4.0, 0.0, 0.0, 1.0, 7), sphere(4.0, 0.0, 0.0, 1.0, 8)];
        let r = ray([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let hit = closest_hit(&spheres, &r, 0.001, f32::INFINITY).unwrap();
        assert_eq!(hit.material_index, 7);
    }

    #[test]
    fn normal_opposes_ray_from_outside_and_inside() {
        let spheres = [sphere(0.0, 0.0, 0.0, 1.0, 0)];

        let outside = ray([-5.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let hit = closest_hit(&spheres, &outside, 0.001, f32::INFINITY).unwrap();
        assert!(hit.front_face);
        assert!((hit.normal - Vec3::new(-1.0, 0.0, 0.0)).norm() < 1e-5);

        let inside = ray([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let hit = closest_hit(&spheres, &inside, 0.001, f32::INFINITY).unwrap();
        assert!(!hit.front_face);
        assert!((hit.normal - Vec3::new(-1.0, 0.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn negative_radius_flips_facing() {
        let spheres = [sphere(0.0, 0.0, 0.0, -1.0, 0)];
        let outside = ray([-5.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let hit = closest_hit(&spheres, &outside, 0.001, f32::INFINITY).unwrap();
        assert!(!hit.front_face);
        assert!(hit.normal.dot(&outside.direction) < 0.0);
    }

    #[test]
    fn empty_scene_misses() {
        let r = ray([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(closest_hit(&[], &r, 0.001, f32::INFINITY), None);
    }
}
