use nalgebra::Vector3;

/// Three floats, used for points, directions and linear RGB alike.
pub type Vec3 = Vector3<f32>;

/// Mirror `v` about `normal`. `normal` must be unit length.
pub fn reflect(v: &Vec3, normal: &Vec3) -> Vec3 {
    v - normal * (2.0 * v.dot(normal))
}

/// Snell's law in vector form. `unit_direction` and `normal` must be unit
/// length and face each other.
pub fn refract(unit_direction: &Vec3, normal: &Vec3, eta_ratio: f32) -> Vec3 {
    let cos_theta = (-unit_direction).dot(normal).min(1.0);
    let perpendicular = (unit_direction + normal * cos_theta) * eta_ratio;
    let parallel = normal * -(1.0 - perpendicular.norm_squared()).abs().sqrt();
    perpendicular + parallel
}

/// True when every component is within 1e-8 of zero.
pub fn near_zero(v: &Vec3) -> bool {
    const EPSILON: f32 = 1e-8;
    v.iter().all(|component| component.abs() < EPSILON)
}

pub fn lerp(from: &Vec3, to: &Vec3, t: f32) -> Vec3 {
    from * (1.0 - t) + to * t
}

pub fn to_array(v: &Vec3) -> [f32; 3] {
    [v.x, v.y, v.z]
}
