use crate::{
    Frame,
    error::{InitError, SinkClosed},
    frame::Rect,
    stage::{OutputSink, TransformStage},
};
use std::time::Duration;

/// Horizontal angular speed of the crop window, in radians per second
const PAN_SPEED_X: f64 = 1.0;
/// Vertical angular speed of the crop window, in radians per second
const PAN_SPEED_Y: f64 = 0.7;

/// Computes the half-size crop window for a `width`x`height` source
///
/// The window is `max(1, width / 2)` by `max(1, height / 2)` pixels and its origin pans
/// across the remaining space as a function of `elapsed` only.
pub fn crop_region(width: u32, height: u32, elapsed: Duration) -> Rect {
    let crop_width = (width / 2).max(1);
    let crop_height = (height / 2).max(1);
    let free_x = width.saturating_sub(crop_width);
    let free_y = height.saturating_sub(crop_height);

    let t = elapsed.as_secs_f64();
    let fx = 0.5 + 0.5 * (t * PAN_SPEED_X).sin();
    let fy = 0.5 + 0.5 * (t * PAN_SPEED_Y).cos();

    let x = ((free_x as f64 * fx).round() as u32).min(free_x);
    let y = ((free_y as f64 * fy).round() as u32).min(free_y);

    Rect::new(x, y, crop_width, crop_height)
}

/// Replaces every frame with a panning half-size view of itself
#[derive(Debug, Clone, Default)]
pub struct Crop {
    first_timestamp: Option<Duration>,
}

impl Crop {
    /// Creates a crop stage that has not observed any frame yet
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformStage for Crop {
    fn name(&self) -> &'static str {
        "crop"
    }

    async fn init(&mut self) -> Result<(), InitError> {
        Ok(())
    }

    async fn transform<S: OutputSink>(&mut self, frame: Frame, sink: &mut S) -> Result<(), SinkClosed> {
        let first = *self.first_timestamp.get_or_insert(frame.timestamp());
        let elapsed = frame.timestamp().saturating_sub(first);

        let visible = frame.visible_rect();
        let region = crop_region(visible.width, visible.height, elapsed);
        let region = Rect::new(visible.x + region.x, visible.y + region.y, region.width, region.height);

        let derived = frame.view(region);
        frame.release();

        match derived {
            Ok(view) => sink.enqueue(view).await,
            Err(err) => {
                tracing::warn!(%err, "crop region rejected; frame dropped");
                Ok(())
            }
        }
    }

    fn destroy(&mut self) {
        self.first_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameLedger;

    #[test]
    fn region_is_exactly_half_for_any_elapsed_time() {
        for (width, height) in [(640, 480), (320, 240), (1920, 1080), (2, 2), (7, 5)] {
            for step in 0..500u64 {
                let elapsed = Duration::from_millis(step * 37);
                let region = crop_region(width, height, elapsed);

                assert_eq!((region.width, region.height), (width / 2, height / 2));
                assert!(region.fits_within(width, height), "{region:?} escapes {width}x{height}");
            }
        }
    }

    #[test]
    fn single_pixel_sources_keep_a_one_pixel_window() {
        let region = crop_region(1, 1, Duration::from_secs(3));
        assert_eq!(region, Rect::new(0, 0, 1, 1));
    }

    #[test]
    fn region_moves_over_time() {
        let start = crop_region(640, 480, Duration::ZERO);
        let later = crop_region(640, 480, Duration::from_millis(1500));
        assert_ne!((start.x, start.y), (later.x, later.y));
    }

    #[tokio::test]
    async fn releases_the_source_and_enqueues_a_view() {
        let ledger = FrameLedger::new();
        let mut stage = Crop::new();
        let mut out = Vec::new();

        for i in 0..4u64 {
            let frame = Frame::solid(Duration::from_secs(10) + Duration::from_millis(i * 500), 640, 480, [1, 1, 1, 255])
                .unwrap()
                .tracked(&ledger);
            stage.transform(frame, &mut out).await.unwrap();
        }

        assert_eq!((ledger.live(), ledger.released()), (0, 4));
        assert_eq!(out.len(), 4);
        for (i, view) in out.iter().enumerate() {
            assert_eq!((view.display_width(), view.display_height()), (320, 240));
            // Elapsed time counts from the first frame, not from zero.
            assert_eq!(view.visible_rect(), crop_region(640, 480, Duration::from_millis(i as u64 * 500)));
        }
    }

    #[tokio::test]
    async fn crops_relative_to_an_existing_view() {
        let mut stage = Crop::new();
        let mut out = Vec::new();

        let frame = Frame::solid(Duration::ZERO, 16, 16, [0; 4]).unwrap().view(Rect::new(8, 8, 8, 8)).unwrap();
        stage.transform(frame, &mut out).await.unwrap();

        let rect = out[0].visible_rect();
        assert_eq!((rect.width, rect.height), (4, 4));
        assert!(rect.x >= 8 && rect.y >= 8);
    }
}
