//! Error types for the renderer host and its compute backends.
//!
//! The kernel itself never fails; these cover collaborator-side validation
//! and device/resource failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// Render settings rejected before any dispatch.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Scene violates a caller contract (material index, camera basis).
    #[error("invalid scene: {0}")]
    InvalidScene(String),

    /// No adapter matched the requested options.
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// Shader or pipeline rejected by the device.
    #[error("compute pipeline creation failed: {0}")]
    Pipeline(String),

    /// Buffer allocation, binding or dispatch rejected by device validation.
    #[error("gpu device rejected {0}")]
    Device(String),

    /// Mapping the output buffer back to the host failed (device lost).
    #[error("output readback failed: {0}")]
    Readback(String),

    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for renderer operations.
pub type Result<T> = std::result::Result<T, RenderError>;
