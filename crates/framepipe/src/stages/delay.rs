use crate::{
    Frame,
    error::{InitError, SinkClosed},
    stage::{OutputSink, TransformStage},
};
use std::time::Duration;

/// Holds every frame for a fixed duration before forwarding it unchanged
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Creates a stage that suspends for `delay` per frame
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Added latency per frame
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl TransformStage for FixedDelay {
    fn name(&self) -> &'static str {
        "delay"
    }

    async fn init(&mut self) -> Result<(), InitError> {
        Ok(())
    }

    async fn transform<S: OutputSink>(&mut self, frame: Frame, sink: &mut S) -> Result<(), SinkClosed> {
        tokio::time::sleep(self.delay).await;
        sink.enqueue(frame).await
    }

    fn destroy(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameLedger;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn suspends_for_the_configured_delay() {
        let ledger = FrameLedger::new();
        let mut stage = FixedDelay::new(Duration::from_millis(40));
        let mut out = Vec::new();
        let started = Instant::now();

        let frame = Frame::solid(Duration::from_micros(33_333), 2, 2, [5, 6, 7, 255]).unwrap().tracked(&ledger);
        stage.transform(frame, &mut out).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timestamp(), Duration::from_micros(33_333));
        // Forwarded, not released
        assert_eq!((ledger.live(), ledger.released()), (1, 0));
    }
}
