//! Error types shared across the pipeline
//!
//! Stage-local failures are absorbed inside the stage that hit them; only `SinkClosed`
//! crosses a stage boundary, and `InitError` is reported once when a stage is set up.

/// Failure to acquire the graphics capability required by a GPU-backed stage
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// No adapter matched the requested backends and options
    #[error("no suitable graphics adapter available: {0}")]
    AdapterUnavailable(#[from] wgpu::RequestAdapterError),
    /// The adapter refused to create a logical device
    #[error("failed to create graphics device: {0}")]
    DeviceUnavailable(#[from] wgpu::RequestDeviceError),
}

/// Invalid frame construction or region request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Width or height is zero
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    /// Pixel buffer length does not match `width * height * 4`
    #[error("expected {expected} bytes of RGBA8 pixel data, got {actual}")]
    PixelLength { expected: usize, actual: usize },
    /// Requested visible region is empty or escapes the coded frame
    #[error("region {x},{y} {width}x{height} does not fit in a {frame_width}x{frame_height} frame")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },
}

/// Failure while rendering one frame or copying the result back into CPU memory
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The frame exceeds the device's 2D texture limit
    #[error("frame {width}x{height} exceeds the device texture limit of {max}")]
    FrameTooLarge { width: u32, height: u32, max: u32 },
    /// The padded readback copy of the frame exceeds the device's buffer limit
    #[error("readback of a {width}x{height} frame needs {size} bytes, device buffer limit is {max}")]
    ReadbackTooLarge { width: u32, height: u32, size: u64, max: u64 },
    /// The device reported a validation or out-of-memory error while preparing the frame
    #[error("device rejected the frame: {0}")]
    Device(wgpu::Error),
    /// The staging buffer could not be mapped
    #[error("failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    /// The map callback was dropped without reporting a result
    #[error("readback buffer mapping was cancelled")]
    Cancelled,
    /// Waiting on the device failed
    #[error("failed to poll device: {0}")]
    Poll(#[from] wgpu::PollError),
    /// The blocking poll task did not complete
    #[error("device poll task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// The rendered pixels did not form a valid frame
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// The downstream consumer stopped accepting frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("output sink closed")]
pub struct SinkClosed;

/// Invalid textual stage specification
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseStageError {
    /// The stage name is not known
    #[error("unknown stage '{0}' (expected passthrough, drop:<p>, delay:<ms>, crop or swirl)")]
    UnknownStage(String),
    /// The stage expects an argument after ':'
    #[error("stage '{0}' requires an argument")]
    MissingArgument(&'static str),
    /// The stage takes no argument but one was given
    #[error("stage '{stage}' takes no argument, got '{value}'")]
    UnexpectedArgument { stage: &'static str, value: String },
    /// The stage argument could not be parsed
    #[error("invalid argument '{value}' for stage '{stage}'")]
    InvalidArgument { stage: &'static str, value: String },
    /// Drop probability outside `0.0..=1.0`
    #[error("drop probability must be within 0.0..=1.0, got {0}")]
    ProbabilityOutOfRange(f64),
}

/// Failure reported by the stage-chain runner
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage task panicked or was cancelled
    #[error("stage task '{name}' failed: {source}")]
    StageTask {
        name: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}
