use crate::{
    Frame,
    error::{InitError, SinkClosed},
    stage::{OutputSink, TransformStage},
};

/// Forwards every frame unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl TransformStage for PassThrough {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    async fn init(&mut self) -> Result<(), InitError> {
        Ok(())
    }

    async fn transform<S: OutputSink>(&mut self, frame: Frame, sink: &mut S) -> Result<(), SinkClosed> {
        sink.enqueue(frame).await
    }

    fn destroy(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameLedger;
    use std::time::Duration;

    #[tokio::test]
    async fn forwards_the_same_frame_without_releasing_it() {
        let ledger = FrameLedger::new();
        let mut stage = PassThrough;
        let mut out = Vec::new();

        for i in 0..3u64 {
            let frame = Frame::solid(Duration::from_micros(i * 33_333), 4, 4, [1, 2, 3, 255]).unwrap().tracked(&ledger);
            stage.transform(frame, &mut out).await.unwrap();
        }

        assert_eq!(out.len(), 3);
        assert_eq!((ledger.live(), ledger.released()), (3, 0));
        assert_eq!(out[2].timestamp(), Duration::from_micros(66_666));
    }
}
