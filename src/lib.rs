pub mod camera;
pub mod error;
pub mod lantern;
pub mod util;

pub use camera::{Camera, CameraBasis};
pub use error::{RenderError, Result};
pub use lantern::gpu::GpuBackend;
pub use lantern::kernel::CpuBackend;
pub use lantern::scene::{Material, RenderSettings, ResetPolicy, Scene, Sphere};
pub use lantern::texture::{save_png, to_rgba8, Pixel, OPAQUE_BLACK};
pub use lantern::{ComputeBackend, Lantern};
