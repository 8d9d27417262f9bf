use crate::{
    Frame,
    error::{InitError, SinkClosed},
    stage::{OutputSink, TransformStage},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Forwards each frame with a fixed probability and releases the rest
#[derive(Debug, Clone)]
pub struct RandomDrop {
    /// Probability that a frame is forwarded
    pass_probability: f64,
    rng: StdRng,
    dropped: u64,
}

impl RandomDrop {
    /// Creates a stage with a reproducible random sequence
    ///
    /// # Arguments
    /// * `pass_probability` - Chance of forwarding a frame; clamped to `0.0..=1.0`, NaN counts as 0
    /// * `seed` - Seed for the frame-selection sequence
    pub fn seeded(pass_probability: f64, seed: u64) -> Self {
        Self::with_rng(pass_probability, StdRng::seed_from_u64(seed))
    }

    /// Creates a stage seeded from operating-system entropy
    pub fn from_entropy(pass_probability: f64) -> Self {
        Self::with_rng(pass_probability, StdRng::from_entropy())
    }

    fn with_rng(pass_probability: f64, rng: StdRng) -> Self {
        let pass_probability = if pass_probability.is_nan() { 0.0 } else { pass_probability.clamp(0.0, 1.0) };
        Self {
            pass_probability,
            rng,
            dropped: 0,
        }
    }

    /// Probability that a frame is forwarded
    pub fn pass_probability(&self) -> f64 {
        self.pass_probability
    }

    /// Number of frames released without output so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl TransformStage for RandomDrop {
    fn name(&self) -> &'static str {
        "drop"
    }

    async fn init(&mut self) -> Result<(), InitError> {
        Ok(())
    }

    async fn transform<S: OutputSink>(&mut self, frame: Frame, sink: &mut S) -> Result<(), SinkClosed> {
        if self.rng.gen_bool(self.pass_probability) {
            return sink.enqueue(frame).await;
        }

        self.dropped += 1;
        frame.release();
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::debug!(dropped = self.dropped, "drop stage destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameLedger;
    use std::time::Duration;

    #[tokio::test]
    async fn forwards_about_half_of_ten_thousand_frames() {
        const TOTAL: usize = 10_000;

        let ledger = FrameLedger::new();
        let mut stage = RandomDrop::seeded(0.5, 0x5eed);
        let mut out = Vec::new();

        for i in 0..TOTAL as u64 {
            let frame = Frame::solid(Duration::from_micros(i), 1, 1, [0, 0, 0, 255]).unwrap().tracked(&ledger);
            stage.transform(frame, &mut out).await.unwrap();
        }

        let ratio = out.len() as f64 / TOTAL as f64;
        assert!((0.47..=0.53).contains(&ratio), "forwarded ratio {ratio}");

        // Forwarded frames are still alive in `out`; everything else was released exactly once.
        assert_eq!(ledger.live(), out.len());
        assert_eq!(ledger.released(), TOTAL - out.len());
        assert_eq!(stage.dropped() as usize, TOTAL - out.len());
    }

    #[tokio::test]
    async fn extreme_probabilities_are_deterministic() {
        let mut keep_all = RandomDrop::seeded(1.0, 1);
        let mut keep_none = RandomDrop::seeded(0.0, 1);
        let mut kept = Vec::new();
        let mut none = Vec::new();

        for _ in 0..100 {
            keep_all.transform(Frame::solid(Duration::ZERO, 1, 1, [0; 4]).unwrap(), &mut kept).await.unwrap();
            keep_none.transform(Frame::solid(Duration::ZERO, 1, 1, [0; 4]).unwrap(), &mut none).await.unwrap();
        }

        assert_eq!((kept.len(), none.len()), (100, 0));
    }

    #[test]
    fn probability_is_clamped() {
        assert_eq!(RandomDrop::seeded(1.5, 0).pass_probability(), 1.0);
        assert_eq!(RandomDrop::seeded(-0.5, 0).pass_probability(), 0.0);
        assert_eq!(RandomDrop::seeded(f64::NAN, 0).pass_probability(), 0.0);
    }
}
