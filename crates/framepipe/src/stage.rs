//! Transform-stage contract
//!
//! Every stage follows the same lifecycle: `init` once, `transform` once per frame, then
//! `destroy` once. `transform` consumes its input frame: the frame is either moved into an
//! output passed to the sink or released before the call returns, on every path.

use crate::{
    Frame,
    config::{GpuStageConfig, StageSpec},
    error::{InitError, SinkClosed},
    gpu::GpuStage,
    stages::{Crop, FixedDelay, PassThrough, RandomDrop},
};
use std::future::Future;

/// Destination for frames produced by a stage
pub trait OutputSink: Send {
    /// Hands a frame to the consumer, waiting for capacity if the consumer is bounded
    fn enqueue(&mut self, frame: Frame) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

impl OutputSink for Vec<Frame> {
    async fn enqueue(&mut self, frame: Frame) -> Result<(), SinkClosed> {
        self.push(frame);
        Ok(())
    }
}

impl OutputSink for tokio::sync::mpsc::Sender<Frame> {
    async fn enqueue(&mut self, frame: Frame) -> Result<(), SinkClosed> {
        // A closed receiver hands the frame back inside the error, which releases it here.
        self.send(frame).await.map_err(|_| SinkClosed)
    }
}

/// A unit of frame processing that can be composed into a pipeline
pub trait TransformStage: Send {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Performs expensive, fallible setup
    ///
    /// Stages with nothing to set up return `Ok(())` immediately.
    fn init(&mut self) -> impl Future<Output = Result<(), InitError>> + Send;

    /// Processes one frame, passing zero or one output frame to `sink`
    ///
    /// Only a closed sink is reported; every other failure is handled inside the stage.
    fn transform<S: OutputSink>(&mut self, frame: Frame, sink: &mut S) -> impl Future<Output = Result<(), SinkClosed>> + Send;

    /// Releases long-lived resources; the stage must not be used afterwards
    fn destroy(&mut self);
}

/// Any of the stages this crate provides, chosen once when the pipeline is built
#[derive(Debug)]
pub enum AnyStage {
    PassThrough(PassThrough),
    RandomDrop(RandomDrop),
    FixedDelay(FixedDelay),
    Crop(Crop),
    Gpu(Box<GpuStage>),
}

impl AnyStage {
    /// Builds the stage described by `spec`
    ///
    /// # Arguments
    /// * `spec` - Which stage to build and its parameters
    /// * `gpu_config` - Adapter selection used when `spec` names the GPU stage
    pub fn from_spec(spec: &StageSpec, gpu_config: &GpuStageConfig) -> Self {
        match *spec {
            StageSpec::PassThrough => AnyStage::PassThrough(PassThrough),
            StageSpec::Drop { probability } => AnyStage::RandomDrop(RandomDrop::from_entropy(probability)),
            StageSpec::Delay { delay } => AnyStage::FixedDelay(FixedDelay::new(delay)),
            StageSpec::Crop => AnyStage::Crop(Crop::new()),
            StageSpec::Swirl => AnyStage::Gpu(Box::new(GpuStage::new(gpu_config.clone()))),
        }
    }
}

impl TransformStage for AnyStage {
    fn name(&self) -> &'static str {
        match self {
            AnyStage::PassThrough(stage) => stage.name(),
            AnyStage::RandomDrop(stage) => stage.name(),
            AnyStage::FixedDelay(stage) => stage.name(),
            AnyStage::Crop(stage) => stage.name(),
            AnyStage::Gpu(stage) => stage.name(),
        }
    }

    async fn init(&mut self) -> Result<(), InitError> {
        match self {
            AnyStage::PassThrough(stage) => stage.init().await,
            AnyStage::RandomDrop(stage) => stage.init().await,
            AnyStage::FixedDelay(stage) => stage.init().await,
            AnyStage::Crop(stage) => stage.init().await,
            AnyStage::Gpu(stage) => stage.init().await,
        }
    }

    async fn transform<S: OutputSink>(&mut self, frame: Frame, sink: &mut S) -> Result<(), SinkClosed> {
        match self {
            AnyStage::PassThrough(stage) => stage.transform(frame, sink).await,
            AnyStage::RandomDrop(stage) => stage.transform(frame, sink).await,
            AnyStage::FixedDelay(stage) => stage.transform(frame, sink).await,
            AnyStage::Crop(stage) => stage.transform(frame, sink).await,
            AnyStage::Gpu(stage) => stage.transform(frame, sink).await,
        }
    }

    fn destroy(&mut self) {
        match self {
            AnyStage::PassThrough(stage) => stage.destroy(),
            AnyStage::RandomDrop(stage) => stage.destroy(),
            AnyStage::FixedDelay(stage) => stage.destroy(),
            AnyStage::Crop(stage) => stage.destroy(),
            AnyStage::Gpu(stage) => stage.destroy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameLedger;
    use std::time::Duration;

    #[tokio::test]
    async fn closed_channel_sink_releases_the_frame() {
        let ledger = FrameLedger::new();
        let (mut tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);

        let frame = Frame::solid(Duration::ZERO, 2, 2, [0, 0, 0, 255]).unwrap().tracked(&ledger);
        assert_eq!(tx.enqueue(frame).await, Err(SinkClosed));
        assert_eq!((ledger.live(), ledger.released()), (0, 1));
    }

    #[tokio::test]
    async fn any_stage_dispatches_to_the_selected_variant() {
        let mut stage = AnyStage::from_spec(&StageSpec::Crop, &GpuStageConfig::default());
        assert_eq!(stage.name(), "crop");
        stage.init().await.unwrap();

        let mut out = Vec::new();
        let frame = Frame::solid(Duration::ZERO, 8, 6, [9, 9, 9, 255]).unwrap();
        stage.transform(frame, &mut out).await.unwrap();
        stage.destroy();

        assert_eq!((out[0].display_width(), out[0].display_height()), (4, 3));
    }
}
