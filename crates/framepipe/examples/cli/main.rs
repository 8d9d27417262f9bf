//! framepipe CLI
//!
//! Pushes a sequence of still images through a stage chain as if they were consecutive
//! video frames and writes every frame that comes out the other end.
//!
//! # Usage
//! ```bash
//! cargo run --example cli -- a.png b.png c.png --output-dir out --stage crop --stage swirl
//! ```
//!
//! Output files are named `frame_<index>_<timestamp_us>.png`.

use clap::Parser;
use framepipe::{AnyStage, Frame, GpuStageConfig, Pipeline, PipelineConfig, RunningPipeline, StageSpec, config::DEFAULT_CHANNEL_CAPACITY};
use std::{path::PathBuf, time::Duration};

/// Command-line arguments for the frame pipeline demo
#[derive(Parser)]
#[command(version, about = "Run images through a video-frame transform pipeline")]
struct Args {
    /// Input image files, in frame order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the output frames are written to
    #[arg(long, short)]
    output_dir: PathBuf,

    /// Frame rate used to assign timestamps to the inputs
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Stage to append to the chain (passthrough, drop:<p>, delay:<ms>, crop, swirl); repeatable
    #[arg(long, short)]
    stage: Vec<StageSpec>,

    /// Frames buffered between adjacent stages
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    capacity: usize,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if !(args.fps.is_finite() && args.fps > 0.0) {
        return Err(format!("Invalid frame rate '{}'", args.fps).into());
    }
    std::fs::create_dir_all(&args.output_dir)?;

    let gpu_config = GpuStageConfig::default();
    let stages: Vec<AnyStage> = args.stage.iter().map(|spec| AnyStage::from_spec(spec, &gpu_config)).collect();
    tracing::info!(stages = ?args.stage, "starting pipeline");

    let pipeline = Pipeline::new(
        stages,
        PipelineConfig {
            channel_capacity: args.capacity,
        },
    );
    let RunningPipeline { input, mut output, handle } = pipeline.spawn();

    // Decode on a separate task so reading and writing overlap
    let inputs = args.inputs.clone();
    let frame_interval = Duration::from_secs_f64(1.0 / args.fps);
    let producer = tokio::spawn(async move {
        for (index, path) in inputs.iter().enumerate() {
            let image = image::open(path)?.to_rgba8();
            let (width, height) = image.dimensions();
            let frame = Frame::new(frame_interval * index as u32, width, height, image.into_raw())?;
            tracing::debug!(path = %path.display(), width, height, "loaded input frame");

            if input.send(frame).await.is_err() {
                break;
            }
        }
        Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
    });

    let mut written = 0usize;
    while let Some(frame) = output.recv().await {
        let bitmap = frame.to_bitmap();
        let path = args.output_dir.join(format!("frame_{written}_{}.png", frame.timestamp().as_micros()));
        let image = image::RgbaImage::from_raw(bitmap.width, bitmap.height, bitmap.pixels.to_vec()).ok_or("Frame pixels do not match its dimensions")?;
        image.save(&path)?;
        frame.release();
        tracing::debug!(path = %path.display(), "wrote output frame");
        written += 1;
    }

    producer.await?.map_err(|err| err.to_string())?;
    let report = handle.finish().await?;

    println!("Wrote {written} of {} frames to {}", args.inputs.len(), args.output_dir.display());
    print!("{report}");

    Ok(())
}
