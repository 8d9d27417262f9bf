//! Pluggable video-frame transform pipeline
//!
//! Frames flow from a source through an ordered chain of transform stages to a sink. Each
//! stage takes ownership of a frame and either forwards a (possibly new) frame downstream or
//! releases it. The centrepiece is [`gpu::GpuStage`], which runs every frame through a swirl
//! distortion on the GPU and reads the result back into a new frame.

pub mod config;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod stage;
pub mod stages;

pub use config::{GpuStageConfig, PipelineConfig, StageSpec};
pub use frame::{Bitmap, Frame, FrameLedger, Rect};
pub use gpu::{GpuStage, GpuStageStats};
pub use pipeline::{Pipeline, PipelineReport, RunningPipeline, StageReport};
pub use stage::{AnyStage, OutputSink, TransformStage};
