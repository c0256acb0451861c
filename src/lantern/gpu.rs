//! wgpu compute backend. Runs `shaders/path_trace.wgsl` with one invocation
//! per pixel and reads the resolved frame back to the host after every
//! dispatch.

use std::mem::size_of;
use std::sync::mpsc;

use bytemuck::Pod;
use log::{debug, info, trace};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, Result};
use crate::lantern::kernel::TILE_SIZE;
use crate::lantern::layout::{CameraRecord, FrameData, FrameUniforms, MaterialRecord, SphereRecord};
use crate::lantern::texture::{Pixel, OPAQUE_BLACK};
use crate::lantern::ComputeBackend;

const PATH_TRACE_WGSL: &str = include_str!("shaders/path_trace.wgsl");

const PIXEL_SIZE: u64 = size_of::<Pixel>() as u64;

/// Per-resolution buffers, rebuilt on resize.
struct PixelBuffers {
    accumulation: wgpu::Buffer,
    output: wgpu::Buffer,
    readback: wgpu::Buffer,
    size: u64,
}

impl PixelBuffers {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = width as u64 * height as u64 * PIXEL_SIZE;

        // zero-initialised by wgpu, which is exactly an empty accumulation
        let accumulation = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lantern Accumulation"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lantern Output"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lantern Readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            accumulation,
            output,
            readback,
            size,
        }
    }
}

/// Scene records as last uploaded, with the storage buffers holding them.
struct SceneBuffers {
    spheres: Vec<SphereRecord>,
    materials: Vec<MaterialRecord>,
    sphere_buffer: wgpu::Buffer,
    material_buffer: wgpu::Buffer,
}

impl SceneBuffers {
    fn matches(&self, frame: &FrameData) -> bool {
        self.spheres == frame.spheres && self.materials == frame.materials
    }
}

pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    pixels: PixelBuffers,
    scene: Option<SceneBuffers>,
    bind_group: Option<wgpu::BindGroup>,
    width: u32,
    height: u32,
    output: Vec<Pixel>,
}

impl GpuBackend {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        pollster::block_on(Self::new_async(width, height))
    }

    pub async fn new_async(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Lantern Device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;
        info!("gpu backend: using {adapter_name}");
        check_pixel_limits(&device.limits(), width, height)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lantern Bind Group Layout"),
            entries: &[
                layout_entry(0, wgpu::BufferBindingType::Uniform),
                layout_entry(1, wgpu::BufferBindingType::Uniform),
                layout_entry(2, wgpu::BufferBindingType::Storage { read_only: true }),
                layout_entry(3, wgpu::BufferBindingType::Storage { read_only: true }),
                layout_entry(4, wgpu::BufferBindingType::Storage { read_only: false }),
                layout_entry(5, wgpu::BufferBindingType::Storage { read_only: false }),
            ],
        });

        // shader errors would otherwise go to the uncaptured handler and panic
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lantern Path Trace Shader"),
            source: wgpu::ShaderSource::Wgsl(PATH_TRACE_WGSL.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lantern Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Lantern Path Trace Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
        });
        if let Some(error) = device.pop_error_scope().await {
            return Err(RenderError::Pipeline(error.to_string()));
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lantern Frame Uniforms"),
            size: size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lantern Camera"),
            size: size_of::<CameraRecord>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let pixels = PixelBuffers::new(&device, width, height);
        if let Some(error) = device.pop_error_scope().await {
            return Err(RenderError::Device(format!("pixel buffers: {error}")));
        }

        Ok(Self {
            device,
            queue,
            adapter_name,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            camera_buffer,
            pixels,
            scene: None,
            bind_group: None,
            width,
            height,
            output: vec![OPAQUE_BLACK; width as usize * height as usize],
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Re-uploads sphere and material records when they differ from what the
    /// device already holds.
    fn upload_scene(&mut self, frame: &FrameData) -> Result<()> {
        if self.scene.as_ref().is_some_and(|scene| scene.matches(frame)) {
            return Ok(());
        }

        let spheres = storage_bytes(frame.spheres);
        let materials = storage_bytes(frame.materials);
        let limit = self.device.limits().max_storage_buffer_binding_size as usize;
        if spheres.len().max(materials.len()) > limit {
            return Err(RenderError::InvalidScene(format!(
                "{} spheres and {} materials exceed the {limit} byte storage binding limit",
                frame.spheres.len(),
                frame.materials.len()
            )));
        }

        debug!(
            "gpu backend: uploading {} spheres, {} materials",
            frame.spheres.len(),
            frame.materials.len()
        );

        let sphere_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lantern Spheres"),
            contents: &spheres,
            usage: wgpu::BufferUsages::STORAGE,
        });
        let material_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lantern Materials"),
            contents: &materials,
            usage: wgpu::BufferUsages::STORAGE,
        });

        self.scene = Some(SceneBuffers {
            spheres: frame.spheres.to_vec(),
            materials: frame.materials.to_vec(),
            sphere_buffer,
            material_buffer,
        });
        self.bind_group = None;
        Ok(())
    }

    fn ensure_bind_group(&mut self) -> Result<()> {
        let Some(scene) = self.scene.as_ref() else {
            return Err(RenderError::InvalidScene("no scene uploaded".to_string()));
        };

        if self.bind_group.is_none() {
            self.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Lantern Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.camera_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: scene.sphere_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: scene.material_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: self.pixels.accumulation.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: self.pixels.output.as_entire_binding(),
                    },
                ],
            }));
        }
        Ok(())
    }

    /// Turns whatever the innermost error scope caught into a
    /// [`RenderError::Device`] instead of letting wgpu's uncaptured handler
    /// panic.
    fn check_error_scope(&self, stage: &str) -> Result<()> {
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(RenderError::Device(format!("{stage}: {error}"))),
            None => Ok(()),
        }
    }

    /// Uploads, binds and dispatches one frame, then queues the copy into
    /// the readback buffer.
    fn record_dispatch(&mut self, frame: &FrameData) -> Result<()> {
        self.upload_scene(frame)?;
        self.ensure_bind_group()?;
        let Some(bind_group) = self.bind_group.as_ref() else {
            return Err(RenderError::InvalidScene("no scene uploaded".to_string()));
        };

        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&frame.uniforms));
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&frame.camera));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Lantern Dispatch Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Lantern Path Trace Pass"),
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(
                self.width.div_ceil(TILE_SIZE),
                self.height.div_ceil(TILE_SIZE),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&self.pixels.output, 0, &self.pixels.readback, 0, self.pixels.size);
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Blocks until the copied output is mapped, then mirrors it on the host.
    fn read_back(&mut self) -> Result<()> {
        let slice = self.pixels.readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // the receiver outlives the poll below
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| RenderError::Readback("map callback never ran".to_string()))?
            .map_err(|error| RenderError::Readback(error.to_string()))?;

        {
            let data = slice.get_mapped_range();
            let bytes: &[u8] = &data;
            self.output.copy_from_slice(bytemuck::cast_slice(bytes));
        }
        self.pixels.readback.unmap();
        Ok(())
    }
}

impl ComputeBackend for GpuBackend {
    fn label(&self) -> &str {
        "gpu"
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        check_pixel_limits(&self.device.limits(), width, height)?;
        debug!("gpu backend: reallocating for {width}x{height}");

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let pixels = PixelBuffers::new(&self.device, width, height);
        self.check_error_scope("pixel buffers")?;

        self.pixels = pixels;
        self.bind_group = None;
        self.width = width;
        self.height = height;
        self.output = vec![OPAQUE_BLACK; width as usize * height as usize];
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Lantern Clear Encoder"),
        });
        encoder.clear_buffer(&self.pixels.accumulation, 0, None);
        self.queue.submit(Some(encoder.finish()));

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
            "gpu dispatch {}: samples {}..{}",
            uniforms.frame_index,
            uniforms.sample_base,
            uniforms.sample_total()
        );

        // the scope is popped even when recording bails out early
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let recorded = self.record_dispatch(frame);
        let validated = self.check_error_scope("dispatch");
        recorded?;
        validated?;

        self.read_back()
    }

    fn output(&self) -> &[Pixel] {
        &self.output
    }
}

/// Rejects pixel grids whose accumulation buffer the device cannot bind.
fn check_pixel_limits(limits: &wgpu::Limits, width: u32, height: u32) -> Result<()> {
    let size = width as u64 * height as u64 * PIXEL_SIZE;
    let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    if size > limit {
        return Err(RenderError::InvalidSettings(format!(
            "{width}x{height} needs {size} byte pixel buffers, device allows {limit}"
        )));
    }
    Ok(())
}

fn layout_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Storage bindings may not be empty, so an empty list uploads one zeroed
/// record that the shader never indexes.
fn storage_bytes<T: Pod>(records: &[T]) -> Vec<u8> {
    if records.is_empty() {
        vec![0; size_of::<T>()]
    } else {
        bytemuck::cast_slice(records).to_vec()
    }
}
