//! GPU swirl stage
//!
//! Each frame is uploaded into a fresh texture, drawn through the swirl program onto an
//! offscreen surface sized to the frame, and copied back into a new CPU frame that keeps
//! the input's timestamp. The input frame is released as soon as its pixels are on the
//! device. When no graphics device can be acquired the stage stays in the pipeline but
//! releases every frame without producing output.

mod context;
mod pipeline;
mod readback;
mod surface;
mod upload;

pub use pipeline::{QUAD_VERTEX_COUNT, QUAD_VERTICES, SURFACE_FORMAT, Vertex};
pub use surface::SurfaceState;

use crate::{
    Frame,
    config::GpuStageConfig,
    error::{InitError, RenderError, SinkClosed},
    stage::{OutputSink, TransformStage},
};
use context::DeviceContext;
use pipeline::SwirlPipeline;
use readback::ReadbackBuffer;
use surface::OffscreenSurface;
use upload::FrameUpload;

/// Counters describing what a GPU stage did with its frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuStageStats {
    /// Frames drawn and forwarded downstream
    pub frames_rendered: u64,
    /// Frames released without output, because the stage is disabled or the frame failed to render
    pub frames_dropped: u64,
    /// Times the render surface was (re)configured for a new frame size
    pub surface_reconfigurations: u64,
}

/// Device-side state of an initialized stage
struct GpuResources {
    context: DeviceContext,
    pipeline: SwirlPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    surface: OffscreenSurface,
}

impl GpuResources {
    async fn create(config: &GpuStageConfig) -> Result<Self, InitError> {
        let context = DeviceContext::acquire(config).await?;
        let pipeline = SwirlPipeline::new(context.device());
        let bind_group_layout = pipeline.bind_group_layout();

        Ok(Self {
            context,
            pipeline,
            bind_group_layout,
            surface: OffscreenSurface::new(),
        })
    }

    /// Draws one frame and reads the result back
    ///
    /// The input frame is released once its pixels have been handed to the device.
    async fn render(&mut self, frame: Frame) -> Result<Frame, RenderError> {
        let (width, height) = (frame.display_width(), frame.display_height());
        if let Err(err) = check_frame_limits(&self.context.limits(), width, height) {
            frame.release();
            return Err(err);
        }

        let device = self.context.device();
        let queue = self.context.queue();

        // Scopes are per thread: everything up to the pops runs without suspending
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let surface_texture = self.surface.configure_for(device, width, height);

        let upload = {
            let bitmap = frame.to_bitmap();
            FrameUpload::new(device, queue, &self.bind_group_layout, self.context.sampler(), &bitmap)
        };
        let timestamp = frame.timestamp();
        frame.release();

        let surface_view = surface_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Swirl Encoder") });
        self.pipeline.encode(&mut encoder, &surface_view, upload.bind_group(), width, height);

        let readback = ReadbackBuffer::new(device, width, height);
        readback.encode_copy(&mut encoder, surface_texture);
        queue.submit(Some(encoder.finish()));

        let validation = device.pop_error_scope();
        let out_of_memory = device.pop_error_scope();
        let device_error = validation.await.or(out_of_memory.await);
        if let Some(err) = device_error {
            upload.destroy();
            // The render target may be the failed allocation; recreate it for the next frame
            self.surface.destroy();
            return Err(RenderError::Device(err));
        }

        let output = readback.into_frame(device, timestamp).await;
        upload.destroy();
        output
    }

    fn destroy(self) {
        let Self { context, pipeline, mut surface, .. } = self;
        surface.destroy();
        pipeline.destroy();
        context.destroy();
    }
}

/// Rejects frames whose textures or readback buffer would exceed the device limits
fn check_frame_limits(limits: &wgpu::Limits, width: u32, height: u32) -> Result<(), RenderError> {
    let max = limits.max_texture_dimension_2d;
    if width > max || height > max {
        return Err(RenderError::FrameTooLarge { width, height, max });
    }

    let size = readback::readback_size(width, height);
    if size > limits.max_buffer_size {
        return Err(RenderError::ReadbackTooLarge {
            width,
            height,
            size,
            max: limits.max_buffer_size,
        });
    }

    Ok(())
}

enum StageState {
    Uninitialized,
    Ready(Box<GpuResources>),
    /// No graphics device could be acquired
    Disabled,
    Destroyed,
}

/// Transform stage that applies a swirl distortion on the GPU
pub struct GpuStage {
    config: GpuStageConfig,
    state: StageState,
    stats: GpuStageStats,
}

impl GpuStage {
    /// Creates an uninitialized stage; no device is touched until [`TransformStage::init`]
    pub fn new(config: GpuStageConfig) -> Self {
        Self {
            config,
            state: StageState::Uninitialized,
            stats: GpuStageStats::default(),
        }
    }

    /// Whether initialization failed and frames are being released without output
    pub fn is_disabled(&self) -> bool {
        matches!(self.state, StageState::Disabled)
    }

    /// Largest frame width or height the device accepts, once initialized
    pub fn max_frame_dimension(&self) -> Option<u32> {
        match &self.state {
            StageState::Ready(resources) => Some(resources.context.limits().max_texture_dimension_2d),
            _ => None,
        }
    }

    /// Counters accumulated since creation
    pub fn stats(&self) -> GpuStageStats {
        self.stats
    }
}

impl std::fmt::Debug for GpuStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            StageState::Uninitialized => "uninitialized",
            StageState::Ready(_) => "ready",
            StageState::Disabled => "disabled",
            StageState::Destroyed => "destroyed",
        };
        f.debug_struct("GpuStage").field("config", &self.config).field("state", &state).field("stats", &self.stats).finish()
    }
}

impl TransformStage for GpuStage {
    fn name(&self) -> &'static str {
        "swirl"
    }

    /// Acquires a device and builds the swirl pipeline
    ///
    /// Calling this on a ready stage does nothing. A disabled stage retries acquisition.
    ///
    /// # Panics
    /// If the stage was already destroyed
    async fn init(&mut self) -> Result<(), InitError> {
        match self.state {
            StageState::Ready(_) => {
                tracing::debug!("swirl stage already initialized");
                return Ok(());
            }
            StageState::Destroyed => panic!("GpuStage::init called after destroy"),
            StageState::Uninitialized | StageState::Disabled => {}
        }

        match GpuResources::create(&self.config).await {
            Ok(resources) => {
                tracing::info!("swirl stage initialized");
                self.state = StageState::Ready(Box::new(resources));
                Ok(())
            }
            Err(err) => {
                tracing::error!(%err, "graphics acceleration unavailable; swirl stage will drop every frame");
                self.state = StageState::Disabled;
                Err(err)
            }
        }
    }

    /// # Panics
    /// If called before [`TransformStage::init`] or after [`TransformStage::destroy`]
    async fn transform<S: OutputSink>(&mut self, frame: Frame, sink: &mut S) -> Result<(), SinkClosed> {
        let resources = match &mut self.state {
            StageState::Ready(resources) => resources,
            StageState::Disabled => {
                self.stats.frames_dropped += 1;
                frame.release();
                return Ok(());
            }
            StageState::Uninitialized => panic!("GpuStage::transform called before init"),
            StageState::Destroyed => panic!("GpuStage::transform called after destroy"),
        };

        let rendered = resources.render(frame).await;
        self.stats.surface_reconfigurations = resources.surface.state().reconfigurations();

        match rendered {
            Ok(output) => {
                self.stats.frames_rendered += 1;
                sink.enqueue(output).await
            }
            Err(err) => {
                self.stats.frames_dropped += 1;
                tracing::warn!(%err, "swirl render failed; frame dropped");
                Ok(())
            }
        }
    }

    /// Releases every device resource
    ///
    /// # Panics
    /// If called twice
    fn destroy(&mut self) {
        match std::mem::replace(&mut self.state, StageState::Destroyed) {
            StageState::Ready(resources) => {
                resources.destroy();
                tracing::debug!(stats = ?self.stats, "swirl stage destroyed");
            }
            StageState::Uninitialized | StageState::Disabled => {}
            StageState::Destroyed => panic!("GpuStage::destroy called twice"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameLedger;
    use std::time::Duration;

    fn disabled_config() -> GpuStageConfig {
        GpuStageConfig {
            backends: wgpu::Backends::empty(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_device_disables_the_stage() {
        let ledger = FrameLedger::new();
        let mut stage = GpuStage::new(disabled_config());
        assert!(stage.init().await.is_err());
        assert!(stage.is_disabled());

        let mut out = Vec::new();
        for i in 0..5u64 {
            let frame = Frame::solid(Duration::from_millis(i * 33), 64, 48, [10, 20, 30, 255]).unwrap().tracked(&ledger);
            stage.transform(frame, &mut out).await.unwrap();
        }

        assert!(out.is_empty());
        assert_eq!((ledger.live(), ledger.released()), (0, 5));
        assert_eq!(stage.stats().frames_dropped, 5);
        stage.destroy();
    }

    #[test]
    fn frames_beyond_device_limits_are_rejected() {
        let limits = wgpu::Limits::downlevel_defaults();
        let max = limits.max_texture_dimension_2d;

        assert!(check_frame_limits(&limits, 640, 480).is_ok());
        assert!(matches!(check_frame_limits(&limits, max + 1, 1), Err(RenderError::FrameTooLarge { .. })));

        // 16384 pixels per row is exactly 64 KiB, so 4097 rows need one row more than a 256 MiB buffer holds
        let limits = wgpu::Limits {
            max_texture_dimension_2d: 16384,
            max_buffer_size: 256 << 20,
            ..limits
        };
        assert!(check_frame_limits(&limits, 16384, 4096).is_ok());
        assert!(matches!(
            check_frame_limits(&limits, 16384, 4097),
            Err(RenderError::ReadbackTooLarge {
                size: 268_500_992,
                max: 268_435_456,
                ..
            })
        ));
    }

    #[tokio::test]
    #[should_panic(expected = "before init")]
    async fn transform_before_init_panics() {
        let mut stage = GpuStage::new(disabled_config());
        let _ = stage.transform(Frame::solid(Duration::ZERO, 1, 1, [0; 4]).unwrap(), &mut Vec::new()).await;
    }

    #[test]
    #[should_panic(expected = "twice")]
    fn double_destroy_panics() {
        let mut stage = GpuStage::new(disabled_config());
        stage.destroy();
        stage.destroy();
    }
}
