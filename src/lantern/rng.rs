use crate::util::Vec3;

/// Rejection sampling gives up after this many draws.
const MAX_REJECTION_ATTEMPTS: u32 = 64;

/// PCG-style integer hash. Identical to `pcg_hash` in the WGSL kernel.
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Per-worker generator. Lives on the stack of one pixel sample and is
/// threaded through the integrator by `&mut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelRng {
    state: u32,
}

impl KernelRng {
    pub fn seed(value: u32) -> Self {
        Self { state: value }
    }

    /// Decorrelated across pixels and across samples of the same pixel.
    pub fn for_pixel(x: u32, y: u32, width: u32, height: u32, sample_index: u32) -> Self {
        let index = x
            .wrapping_add(y.wrapping_mul(width))
            .wrapping_add(sample_index.wrapping_mul(width.wrapping_mul(height)));
        Self::seed(pcg_hash(index))
    }

    /// Uniform in [0, 1).
    pub fn next(&mut self) -> f32 {
        self.state = pcg_hash(self.state);
        // 24 bits fit an f32 mantissa exactly, so 1.0 is unreachable
        (self.state >> 8) as f32 / 16_777_216.0
    }

    pub fn in_unit_sphere(&mut self) -> Vec3 {
        sphere_from(|| self.next())
    }

    pub fn unit_vector(&mut self) -> Vec3 {
        normalize_or_up(self.in_unit_sphere())
    }

    /// Point in the unit disk on the z = 0 plane.
    pub fn in_unit_disk(&mut self) -> Vec3 {
        disk_from(|| self.next())
    }
}

/// Rejection sampling over `draw`; the origin once every attempt is spent.
fn sphere_from(mut draw: impl FnMut() -> f32) -> Vec3 {
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let x = draw() * 2.0 - 1.0;
        let y = draw() * 2.0 - 1.0;
        let z = draw() * 2.0 - 1.0;
        let p = Vec3::new(x, y, z);
        if p.norm_squared() < 1.0 {
            return p;
        }
    }
    Vec3::zeros()
}

fn disk_from(mut draw: impl FnMut() -> f32) -> Vec3 {
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let x = draw() * 2.0 - 1.0;
        let y = draw() * 2.0 - 1.0;
        let p = Vec3::new(x, y, 0.0);
        if p.norm_squared() < 1.0 {
            return p;
        }
    }
    Vec3::zeros()
}

fn normalize_or_up(p: Vec3) -> Vec3 {
    if p.norm_squared() <= f32::EPSILON {
        return Vec3::new(0.0, 1.0, 0.0);
    }
    p.normalize()
}
