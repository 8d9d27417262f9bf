//! Verification utilities for framepipe
//!
//! This crate checks the GPU swirl stage against a CPU reference implementation of the
//! same effect.

pub mod compare;
pub mod reference;

use framepipe::{Frame, GpuStage, GpuStageConfig, TransformStage, error::InitError};
use std::time::Duration;

/// Failure while running an image through the GPU stage
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// No graphics device could be acquired
    #[error(transparent)]
    Init(#[from] InitError),
    /// The image could not be turned into a frame
    #[error("invalid input image: {0}")]
    Frame(#[from] framepipe::error::FrameError),
    /// The stage dropped the frame instead of rendering it
    #[error("GPU stage produced no output")]
    NoOutput,
}

/// Converts an RGBA8 image into a frame with the given timestamp
pub fn image_to_frame(image: &image::RgbaImage, timestamp: Duration) -> Result<Frame, framepipe::error::FrameError> {
    Frame::new(timestamp, image.width(), image.height(), image.as_raw().clone())
}

/// Copies a frame's visible pixels into an RGBA8 image
pub fn frame_to_image(frame: &Frame) -> image::RgbaImage {
    let bitmap = frame.to_bitmap();
    // Bitmaps are always tightly packed, so the buffer length matches the dimensions
    image::RgbaImage::from_fn(bitmap.width, bitmap.height, |x, y| {
        let offset = ((y * bitmap.width + x) * 4) as usize;
        image::Rgba([bitmap.pixels[offset], bitmap.pixels[offset + 1], bitmap.pixels[offset + 2], bitmap.pixels[offset + 3]])
    })
}

/// Runs a single image through a freshly initialized GPU stage
///
/// # Arguments
/// * `input` - Image to swirl
/// * `config` - Adapter selection for the stage
///
/// # Returns
/// The rendered image, or why the stage could not produce one
pub async fn swirl_on_gpu(input: &image::RgbaImage, config: GpuStageConfig) -> Result<image::RgbaImage, VerifyError> {
    let mut stage = GpuStage::new(config);
    if let Err(err) = stage.init().await {
        stage.destroy();
        return Err(err.into());
    }

    let mut outputs = Vec::new();
    let frame = image_to_frame(input, Duration::ZERO);
    let result = match frame {
        Ok(frame) => {
            // A `Vec` sink never closes
            let _ = stage.transform(frame, &mut outputs).await;
            outputs.first().map(frame_to_image).ok_or(VerifyError::NoOutput)
        }
        Err(err) => Err(err.into()),
    };

    stage.destroy();
    result
}
