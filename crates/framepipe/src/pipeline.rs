//! Stage-chain runner
//!
//! Every stage runs on its own tokio task and is connected to its neighbours by bounded
//! channels, so frames leave the chain in the order they entered it and a slow stage
//! backpressures everything upstream of it. Dropping the input sender drains the chain;
//! each stage is destroyed once its input has closed.

use crate::{
    Frame,
    config::PipelineConfig,
    error::{PipelineError, SinkClosed},
    stage::{AnyStage, OutputSink, TransformStage},
};
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
};

/// What one stage did over the lifetime of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: &'static str,
    /// Frames received from upstream
    pub frames_in: u64,
    /// Frames accepted by downstream
    pub frames_out: u64,
    /// Initialization failed and the stage ran without its capability
    pub disabled: bool,
}

/// Per-stage reports in chain order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl std::fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for stage in &self.stages {
            write!(f, "{:<12} in {:>6}  out {:>6}", stage.name, stage.frames_in, stage.frames_out)?;
            if stage.disabled {
                write!(f, "  (disabled)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// An ordered chain of stages, not yet running
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<AnyStage>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a chain that feeds each stage's output into the next one
    pub fn new(stages: Vec<AnyStage>, config: PipelineConfig) -> Self {
        Self { stages, config }
    }

    /// Starts one task per stage on the current tokio runtime
    ///
    /// With no stages the input is connected straight to the output.
    pub fn spawn(self) -> RunningPipeline {
        let capacity = self.config.channel_capacity.max(1);
        let (input, mut upstream) = mpsc::channel(capacity);

        let mut tasks = Vec::with_capacity(self.stages.len());
        for stage in self.stages {
            let (downstream, next) = mpsc::channel(capacity);
            let name = stage.name();
            tracing::debug!(stage = name, capacity, "spawning stage task");
            tasks.push((name, tokio::spawn(run_stage(stage, upstream, downstream))));
            upstream = next;
        }

        RunningPipeline {
            input,
            output: upstream,
            handle: PipelineHandle { tasks },
        }
    }
}

/// Endpoints of a running chain
///
/// Send frames into `input`, receive results from `output`, then drop `input` and call
/// [`PipelineHandle::finish`] once `output` is drained or dropped.
#[derive(Debug)]
pub struct RunningPipeline {
    pub input: Sender<Frame>,
    pub output: Receiver<Frame>,
    pub handle: PipelineHandle,
}

/// Join handles of the stage tasks
#[derive(Debug)]
pub struct PipelineHandle {
    tasks: Vec<(&'static str, JoinHandle<StageReport>)>,
}

impl PipelineHandle {
    /// Waits for every stage task to stop
    ///
    /// # Returns
    /// The per-stage reports, or the first stage task that panicked
    pub async fn finish(self) -> Result<PipelineReport, PipelineError> {
        let mut stages = Vec::with_capacity(self.tasks.len());
        for (name, task) in self.tasks {
            let report = task.await.map_err(|source| PipelineError::StageTask { name, source })?;
            stages.push(report);
        }
        Ok(PipelineReport { stages })
    }
}

/// Channel sender that counts the frames downstream accepted
struct CountingSink {
    sender: Sender<Frame>,
    sent: u64,
}

impl OutputSink for CountingSink {
    async fn enqueue(&mut self, frame: Frame) -> Result<(), SinkClosed> {
        self.sender.enqueue(frame).await?;
        self.sent += 1;
        Ok(())
    }
}

async fn run_stage(mut stage: AnyStage, mut input: Receiver<Frame>, output: Sender<Frame>) -> StageReport {
    let name = stage.name();
    let disabled = match stage.init().await {
        Ok(()) => false,
        Err(err) => {
            tracing::warn!(stage = name, %err, "stage initialization failed");
            true
        }
    };

    let mut sink = CountingSink { sender: output, sent: 0 };
    let mut frames_in = 0;
    while let Some(frame) = input.recv().await {
        frames_in += 1;
        if stage.transform(frame, &mut sink).await.is_err() {
            tracing::debug!(stage = name, "downstream closed; stopping stage");
            break;
        }
    }

    stage.destroy();
    tracing::debug!(stage = name, frames_in, frames_out = sink.sent, "stage finished");

    StageReport {
        name,
        frames_in,
        frames_out: sink.sent,
        disabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        FrameLedger,
        config::{GpuStageConfig, StageSpec},
    };
    use std::time::Duration;

    fn build(specs: &[StageSpec], gpu_config: &GpuStageConfig) -> Pipeline {
        let stages = specs.iter().map(|spec| AnyStage::from_spec(spec, gpu_config)).collect();
        Pipeline::new(stages, PipelineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn preserves_order_through_a_chain() {
        let specs = [
            StageSpec::PassThrough,
            StageSpec::Delay {
                delay: Duration::from_millis(5),
            },
            StageSpec::Crop,
        ];
        let RunningPipeline { input, mut output, handle } = build(&specs, &GpuStageConfig::default()).spawn();

        let producer = tokio::spawn(async move {
            for i in 0..20u64 {
                let frame = Frame::solid(Duration::from_millis(i * 33), 64, 48, [i as u8, 0, 0, 255]).unwrap();
                input.send(frame).await.unwrap();
            }
        });

        let mut timestamps = Vec::new();
        while let Some(frame) = output.recv().await {
            assert_eq!((frame.display_width(), frame.display_height()), (32, 24));
            timestamps.push(frame.timestamp());
        }
        producer.await.unwrap();

        let expected: Vec<_> = (0..20u64).map(|i| Duration::from_millis(i * 33)).collect();
        assert_eq!(timestamps, expected);

        let report = handle.finish().await.unwrap();
        let names: Vec<_> = report.stages.iter().map(|stage| stage.name).collect();
        assert_eq!(names, ["passthrough", "delay", "crop"]);
        assert!(report.stages.iter().all(|stage| stage.frames_in == 20 && stage.frames_out == 20 && !stage.disabled));
    }

    #[tokio::test]
    async fn empty_chain_forwards_frames() {
        let RunningPipeline { input, mut output, handle } = build(&[], &GpuStageConfig::default()).spawn();

        input.send(Frame::solid(Duration::from_micros(7), 2, 2, [1, 2, 3, 4]).unwrap()).await.unwrap();
        drop(input);

        let frame = output.recv().await.unwrap();
        assert_eq!(frame.timestamp(), Duration::from_micros(7));
        assert!(output.recv().await.is_none());
        assert!(handle.finish().await.unwrap().stages.is_empty());
    }

    #[tokio::test]
    async fn disabled_gpu_stage_is_reported_and_releases_frames() {
        let ledger = FrameLedger::new();
        let gpu_config = GpuStageConfig {
            backends: wgpu::Backends::empty(),
            ..Default::default()
        };
        let RunningPipeline { input, mut output, handle } = build(&[StageSpec::PassThrough, StageSpec::Swirl], &gpu_config).spawn();

        for i in 0..4u64 {
            let frame = Frame::solid(Duration::from_millis(i), 8, 8, [0; 4]).unwrap().tracked(&ledger);
            input.send(frame).await.unwrap();
        }
        drop(input);

        assert!(output.recv().await.is_none());
        let report = handle.finish().await.unwrap();

        assert_eq!(
            report.stages[1],
            StageReport {
                name: "swirl",
                frames_in: 4,
                frames_out: 0,
                disabled: true
            }
        );
        assert_eq!((ledger.live(), ledger.released()), (0, 4));
    }

    #[tokio::test]
    async fn closed_output_stops_the_chain() {
        let ledger = FrameLedger::new();
        let RunningPipeline { input, output, handle } = build(&[StageSpec::PassThrough], &GpuStageConfig::default()).spawn();
        drop(output);

        // The stage stops after its first failed enqueue; later sends may fail once its input closes.
        for i in 0..8u64 {
            let frame = Frame::solid(Duration::from_millis(i), 1, 1, [0; 4]).unwrap().tracked(&ledger);
            if input.send(frame).await.is_err() {
                break;
            }
        }
        drop(input);

        let report = handle.finish().await.unwrap();
        assert_eq!(report.stages[0].frames_out, 0);
        assert_eq!(ledger.live(), 0);
    }
}
