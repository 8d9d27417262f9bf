//! Swirl verification binary
//!
//! Runs an image through the GPU swirl stage and through the CPU reference, then reports
//! how closely the two outputs agree.

use framepipe::GpuStageConfig;
use framepipe_verification::{
    compare::{CompareResult, compare_images},
    reference::swirl_image,
    swirl_on_gpu,
};

/// Largest per-channel difference counted as a match
const TOLERANCE: u8 = 8;

/// Largest fraction of pixels allowed outside tolerance
///
/// Steep colour edges inside the swirl amplify tiny coordinate differences between GPU and CPU filtering.
const MAX_MISMATCH_RATIO: f64 = 0.01;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <input_image>", args[0]);
        return Ok(());
    }

    let input_path = &args[1];
    let input_image = image::open(input_path).map_err(|e| format!("Failed to open input image: {e}"))?.to_rgba8();

    let config = GpuStageConfig {
        backends: wgpu::Backends::all(),
        ..Default::default()
    };
    let gpu_output = swirl_on_gpu(&input_image, config).await?;
    let reference_output = swirl_image(&input_image);

    let result = compare_images(&reference_output, &gpu_output, TOLERANCE);
    match result {
        CompareResult::Match { max_difference } => {
            println!("✓ Outputs match for {input_path} (max difference {max_difference})");
        }
        CompareResult::DimensionMismatch {
            reference_dimensions,
            actual_dimensions,
        } => {
            eprintln!("✗ Dimension mismatch for {input_path}: reference {reference_dimensions:?}, GPU {actual_dimensions:?}");
        }
        CompareResult::PixelMismatch {
            max_difference,
            mismatched_pixels,
            total_pixels,
        } => {
            let marker = if result.mismatch_ratio() <= MAX_MISMATCH_RATIO { "✓" } else { "✗" };
            println!("{marker} {mismatched_pixels} of {total_pixels} pixels outside tolerance for {input_path} (max difference {max_difference})");
        }
    }

    if result.mismatch_ratio() > MAX_MISMATCH_RATIO {
        return Err("GPU output does not match the reference".into());
    }

    Ok(())
}
