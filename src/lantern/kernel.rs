//! The per-pixel path tracing kernel and its rayon host.
//!
//! Everything above [`CpuBackend`] is a line-for-line twin of
//! `shaders/path_trace.wgsl`, including the order in which random numbers
//! are drawn, so both backends converge to the same image.

use log::{debug, trace};
use rayon::prelude::*;

use crate::camera::CameraBasis;
use crate::error::{RenderError, Result};
use crate::lantern::integrator::ray_color;
use crate::lantern::layout::FrameData;
use crate::lantern::ray::Ray;
use crate::lantern::rng::KernelRng;
use crate::lantern::texture::{gamma_correct, Pixel, OPAQUE_BLACK};
use crate::lantern::ComputeBackend;
use crate::util::Vec3;

/// Workers are grouped in TILE_SIZE x TILE_SIZE tiles on the GPU and in
/// bands of TILE_SIZE rows on the CPU.
pub const TILE_SIZE: u32 = 8;

/// Jittered ray through pixel (x, y); row 0 is the top of the image.
pub fn camera_ray(camera: &CameraBasis, x: u32, y: u32, width: u32, height: u32, rng: &mut KernelRng) -> Ray {
    let s = (x as f32 + rng.next()) / width as f32;
    let t = ((height - 1 - y) as f32 + rng.next()) / height as f32;

    // moving the origin across the lens while the target stays put keeps
    // the focus plane sharp
    let lens = rng.in_unit_disk() * camera.lens_radius;
    let offset = camera.u * lens.x + camera.v * lens.y;
    let origin = camera.origin - offset;
    let target = camera.lower_left_corner + camera.horizontal * s + camera.vertical * t;

    Ray::new(origin, target - origin)
}

/// One radiance sample for (x, y). `sample_index` is the pixel's sample
/// ordinal since the last reset and takes the frame index's role in seeding.
pub fn sample_pixel(frame: &FrameData, camera: &CameraBasis, x: u32, y: u32, sample_index: u32) -> Vec3 {
    let FrameData {
        uniforms,
        spheres,
        materials,
        ..
    } = *frame;
    let mut rng = KernelRng::for_pixel(x, y, uniforms.width, uniforms.height, sample_index);
    let ray = camera_ray(camera, x, y, uniforms.width, uniforms.height, &mut rng);

    ray_color(spheres, materials, ray, uniforms.max_bounces, &mut rng)
}

/// Averaged, clamped and gamma-corrected display value. No samples yet
/// means black rather than a division by zero.
pub fn resolve(sum: &[f32; 4], sample_count: u32) -> Pixel {
    if sample_count == 0 {
        return OPAQUE_BLACK;
    }

    let inverse = 1.0 / sample_count as f32;
    [
        gamma_correct(sum[0] * inverse),
        gamma_correct(sum[1] * inverse),
        gamma_correct(sum[2] * inverse),
        1.0,
    ]
}

/// Adds this dispatch's samples into `cell` and returns the new display value.
pub fn shade_pixel(frame: &FrameData, camera: &CameraBasis, x: u32, y: u32, cell: &mut [f32; 4]) -> Pixel {
    let uniforms = &frame.uniforms;

    for sample in 0..uniforms.samples_per_frame {
        let color = sample_pixel(frame, camera, x, y, uniforms.sample_base.saturating_add(sample));
        cell[0] += color.x;
        cell[1] += color.y;
        cell[2] += color.z;
    }

    resolve(cell, uniforms.sample_total())
}

// pixels are independent, so bands need no locking
/// Runs the kernel on the CPU thread pool.
pub struct CpuBackend {
    width: u32,
    height: u32,
    accumulation: Vec<[f32; 4]>,
    output: Vec<Pixel>,
}

impl CpuBackend {
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = width as usize * height as usize;

        Self {
            width,
            height,
            accumulation: vec![[0.0; 4]; pixel_count],
            output: vec![OPAQUE_BLACK; pixel_count],
        }
    }

    /// Linear running sums, one cell per pixel.
    pub fn accumulation(&self) -> &[[f32; 4]] {
        &self.accumulation
    }
}

impl ComputeBackend for CpuBackend {
    fn label(&self) -> &str {
        "cpu"
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        debug!("cpu backend: reallocating for {width}x{height}");
        *self = Self::new(width, height);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.accumulation.fill([0.0; 4]);
        self.output.fill(OPAQUE_BLACK);
        Ok(())
    }

    fn submit(&mut self, frame: &FrameData) -> Result<()> {
        let uniforms = frame.uniforms;
        if (uniforms.width, uniforms.height) != (self.width, self.height) {
            return Err(RenderError::InvalidSettings(format!(
                "frame is {}x{} but buffers are {}x{}",
                uniforms.width, uniforms.height, self.width, self.height
            )));
        }

        trace!(
            "cpu dispatch {}: samples {}..{}",
            uniforms.frame_index,
            uniforms.sample_base,
            uniforms.sample_total()
        );

        let camera = frame.camera.basis();
        let width = self.width;
        let band = width as usize * TILE_SIZE as usize;

        self.accumulation
            .par_chunks_mut(band)
            .zip(self.output.par_chunks_mut(band))
            .enumerate()
            .for_each(|(band_index, (cells, pixels))| {
                let first_row = band_index as u32 * TILE_SIZE;

                for (index, (cell, pixel)) in cells.iter_mut().zip(pixels.iter_mut()).enumerate() {
                    let x = index as u32 % width;
                    let y = first_row + index as u32 / width;
                    *pixel = shade_pixel(frame, &camera, x, y, cell);
                }
            });

        Ok(())
    }

    fn output(&self) -> &[Pixel] {
        &self.output
    }
}
