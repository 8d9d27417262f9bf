use framepipe::GpuStageConfig;
use framepipe_verification::{VerifyError, compare::compare_images, frame_to_image, image_to_frame, reference::swirl_image, swirl_on_gpu};
use std::time::Duration;

fn gradient(width: u32, height: u32) -> image::RgbaImage {
    image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 255 / (width - 1)) as u8, (y * 255 / (height - 1)) as u8, 128, 255])
    })
}

#[tokio::test]
async fn gpu_swirl_matches_cpu_reference() {
    let input = gradient(96, 64);
    let config = GpuStageConfig {
        backends: wgpu::Backends::all(),
        ..Default::default()
    };

    let gpu_output = match swirl_on_gpu(&input, config).await {
        Ok(output) => output,
        Err(VerifyError::Init(err)) => {
            eprintln!("skipping GPU test: {err}");
            return;
        }
        Err(err) => panic!("GPU stage failed: {err}"),
    };

    let result = compare_images(&swirl_image(&input), &gpu_output, 8);
    assert!(result.mismatch_ratio() <= 0.01, "{result:?}");
}

#[test]
fn frame_conversion_keeps_pixels() {
    let input = gradient(5, 3);
    let frame = image_to_frame(&input, Duration::from_millis(3)).unwrap();

    assert_eq!(frame.timestamp(), Duration::from_millis(3));
    assert_eq!(frame_to_image(&frame), input);
}
