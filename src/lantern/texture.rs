use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::error::{RenderError, Result};

/// Displayable RGBA, gamma-corrected, every channel in [0, 1].
pub type Pixel = [f32; 4];

pub const OPAQUE_BLACK: Pixel = [0.0, 0.0, 0.0, 1.0];

/// Display gamma applied to averaged linear radiance.
pub const GAMMA: f32 = 2.2;

pub fn gamma_correct(linear: f32) -> f32 {
    linear.clamp(0.0, 1.0).powf(1.0 / GAMMA)
}

pub fn to_rgba8(pixels: &[Pixel]) -> Vec<u8> {
    pixels
        .iter()
        .flat_map(|pixel| pixel.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8))
        .collect()
}

pub fn save_png<P: AsRef<Path>>(path: P, width: u32, height: u32, pixels: &[Pixel]) -> Result<()> {
    let image = RgbaImage::from_raw(width, height, to_rgba8(pixels)).ok_or_else(|| {
        RenderError::InvalidSettings(format!(
            "{} pixels do not fill a {width}x{height} image",
            pixels.len()
        ))
    })?;
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
