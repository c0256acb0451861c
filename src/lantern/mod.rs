use log::{debug, info, trace};

use crate::error::Result;
use crate::lantern::layout::{FrameData, SceneRecords};
use crate::lantern::scene::{RenderSettings, ResetPolicy, Scene};
use crate::lantern::texture::Pixel;

pub mod gpu;
pub mod hit;
pub mod integrator;
pub mod kernel;
pub mod layout;
pub mod material;
pub mod ray;
pub mod rng;
pub mod scene;
pub mod texture;

/// The only surface the host needs from a parallel device: run one
/// dispatch over the flat scene records and expose the resulting frame.
///
/// Implementations own the accumulation buffer. A dispatch either
/// completes or fails as a whole.
pub trait ComputeBackend {
    fn label(&self) -> &str;

    /// Reallocate accumulation and output for a new pixel grid. Previous
    /// samples are discarded.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Zero the accumulation buffer and blank the output.
    fn clear(&mut self) -> Result<()>;

    fn submit(&mut self, frame: &FrameData) -> Result<()>;

    fn output(&self) -> &[Pixel];
}

/// Progressive renderer: owns the frame/sample counters and decides when
/// accumulated samples are no longer valid.
pub struct Lantern<B: ComputeBackend> {
    backend: B,
    settings: RenderSettings,
    scene: Option<Scene>,
    records: SceneRecords,
    frame_index: u32,
    sample_count: u32,
}

impl<B: ComputeBackend> Lantern<B> {
    pub fn new(mut backend: B, settings: RenderSettings) -> Result<Self> {
        settings.validate()?;
        backend.resize(settings.width, settings.height)?;
        info!(
            "lantern: {} backend at {}x{}, {} spp/frame, {} bounces",
            backend.label(),
            settings.width,
            settings.height,
            settings.samples_per_frame,
            settings.max_bounces
        );

        Ok(Self {
            backend,
            settings,
            scene: None,
            records: SceneRecords::default(),
            frame_index: 0,
            sample_count: 0,
        })
    }

    /// Render one progressive frame of `scene`. Settings and scene are
    /// compared with the previous frame; anything that makes earlier samples
    /// incomparable resets accumulation first.
    pub fn render(&mut self, scene: &Scene, settings: &RenderSettings) -> Result<&[Pixel]> {
        self.apply_settings(settings)?;
        self.apply_scene(scene)?;

        let Some(scene) = self.scene.as_ref() else {
            return Ok(self.backend.output());
        };

        let frame = FrameData::new(
            &self.records,
            scene,
            &self.settings,
            self.frame_index,
            self.sample_count,
        );
        self.backend.submit(&frame)?;

        self.frame_index = self.frame_index.saturating_add(1);
        self.sample_count = frame.uniforms.sample_total();
        trace!("frame {} done, {} samples", self.frame_index, self.sample_count);

        Ok(self.backend.output())
    }

    pub fn apply_settings(&mut self, settings: &RenderSettings) -> Result<()> {
        if *settings == self.settings {
            return Ok(());
        }
        settings.validate()?;

        // settings are only committed once the backend accepted them
        if (self.settings.width, self.settings.height) != (settings.width, settings.height) {
            info!("lantern: resizing to {}x{}", settings.width, settings.height);
            self.backend.resize(settings.width, settings.height)?;
            self.settings = *settings;
            return self.reset();
        }

        // samples from a different bounce budget do not average together
        let bounces_changed = self.settings.max_bounces != settings.max_bounces;
        self.settings = *settings;
        if bounces_changed {
            self.reset()?;
        }
        Ok(())
    }

    pub fn apply_scene(&mut self, scene: &Scene) -> Result<()> {
        let (structural, camera_moved) = match &self.scene {
            None => (true, false),
            Some(previous) => (
                !previous.same_structure(scene),
                previous.camera != scene.camera,
            ),
        };

        if structural {
            debug!(
                "lantern: uploading {} spheres, {} materials",
                scene.spheres.len(),
                scene.materials.len()
            );
            self.records = SceneRecords::from_scene(scene);
        }
        if structural || camera_moved {
            self.scene = Some(scene.clone());
        }

        let camera_resets = self.settings.reset_policy == ResetPolicy::OnAnyChange;
        if structural || (camera_moved && camera_resets) {
            self.reset()?;
        }
        Ok(())
    }

    /// Throw away accumulated samples. Called automatically on relevant
    /// changes; collaborators may also call it directly.
    pub fn reset(&mut self) -> Result<()> {
        debug!(
            "lantern: reset after {} frames / {} samples",
            self.frame_index, self.sample_count
        );
        self.frame_index = 0;
        self.sample_count = 0;
        self.backend.clear()
    }

    /// Displayable frame from the last dispatch, black after a reset.
    pub fn output(&self) -> &[Pixel] {
        self.backend.output()
    }

    /// Samples per pixel averaged into [`Lantern::output`].
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Dispatches since the last reset.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
