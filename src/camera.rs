use nalgebra::{Rotation3, Vector3};

use crate::util::Vec3;

/// Thin-lens camera as the scene author describes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub origin: Vec3,
    pub look_at: Vec3,
    /// Must not be parallel to `origin - look_at`.
    pub up: Vec3,
    /// Vertical field of view, degrees.
    pub vertical_fov: f32,
    /// Lens diameter, 0 for a pinhole.
    pub aperture: f32,
    /// Distance to the plane of perfect focus.
    pub focus_distance: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            origin: Vec3::new(13.0, 2.0, 3.0),
            look_at: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            vertical_fov: 20.0,
            aperture: 0.0,
            focus_distance: 10.0,
        }
    }
}

/// Orthonormal frame and image plane derived from a [`Camera`] and an
/// aspect ratio. Never stored by the renderer; rebuilt every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub origin: Vec3,
    pub lower_left_corner: Vec3,
    pub horizontal: Vec3,
    pub vertical: Vec3,
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
    pub lens_radius: f32,
}

impl Camera {
    pub fn basis(&self, width: u32, height: u32) -> CameraBasis {
        let aspect = width as f32 / height as f32;

        let theta = self.vertical_fov.to_radians();
        let half_height = (theta / 2.0).tan();
        let viewport_height = 2.0 * half_height;
        let viewport_width = aspect * viewport_height;

        // w points backwards, away from what the camera looks at
        let w = (self.origin - self.look_at).normalize();
        let u = self.up.cross(&w).normalize();
        let v = w.cross(&u);

        let horizontal = u * (viewport_width * self.focus_distance);
        let vertical = v * (viewport_height * self.focus_distance);
        let lower_left_corner =
            self.origin - horizontal / 2.0 - vertical / 2.0 - w * self.focus_distance;

        CameraBasis {
            origin: self.origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            w,
            lens_radius: self.aperture / 2.0,
        }
    }

    /// Copy of this camera with `origin` rotated by `radians` around the
    /// vertical axis through `look_at`.
    pub fn orbited(&self, radians: f32) -> Self {
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), radians);
        let offset = self.origin - self.look_at;

        Self {
            origin: self.look_at + rotation * offset,
            ..*self
        }
    }

    /// `up` parallel to the view direction leaves `u` undefined.
    pub fn is_degenerate(&self) -> bool {
        let view = self.origin - self.look_at;
        if view.norm_squared() == 0.0 || self.up.norm_squared() == 0.0 {
            return true;
        }
        // squared sine of the angle between up and the view axis
        self.up.normalize().cross(&view.normalize()).norm_squared() <= f32::EPSILON
    }
}
