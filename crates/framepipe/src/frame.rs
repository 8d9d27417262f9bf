//! Frame unit flowing through the pipeline
//!
//! A `Frame` is a timestamped RGBA8 image with a single owner. Ownership moves from the
//! source to each stage and finally to the sink; whoever holds the frame last releases it,
//! either explicitly with [`Frame::release`] or by dropping it. Frames attached to a
//! [`FrameLedger`] report their release so callers can check that nothing leaks.

use crate::error::FrameError;
use bytes::Bytes;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

/// Bytes per pixel of the RGBA8 layout used by every frame
pub const BYTES_PER_PIXEL: u32 = 4;

/// Axis-aligned pixel rectangle inside a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Creates a rectangle from origin and size
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Returns whether the rectangle is non-empty and lies entirely within `width`x`height`
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|right| right <= width)
            && self.y.checked_add(self.height).is_some_and(|bottom| bottom <= height)
    }
}

/// Shared release counters for a group of frames
///
/// Cloning a ledger yields another handle to the same counters.
#[derive(Debug, Clone, Default)]
pub struct FrameLedger {
    counters: Arc<LedgerCounters>,
}

#[derive(Debug, Default)]
struct LedgerCounters {
    live: AtomicUsize,
    released: AtomicUsize,
}

impl FrameLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked frames that have not been released yet
    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::Acquire)
    }

    /// Number of tracked frames released so far
    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::Acquire)
    }

    fn lease(&self) -> FrameLease {
        self.counters.live.fetch_add(1, Ordering::AcqRel);
        FrameLease {
            counters: self.counters.clone(),
        }
    }
}

/// Ledger entry owned by exactly one frame; settles the counters when dropped
#[derive(Debug)]
struct FrameLease {
    counters: Arc<LedgerCounters>,
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::AcqRel);
        self.counters.released.fetch_add(1, Ordering::AcqRel);
    }
}

/// A CPU-side copy of a frame's visible pixels, tightly packed RGBA8
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

impl Bitmap {
    /// Bytes per row of the packed pixel data
    pub fn bytes_per_row(&self) -> u32 {
        self.width * BYTES_PER_PIXEL
    }
}

/// A decoded video frame with explicit single-owner lifetime
#[derive(Debug)]
pub struct Frame {
    timestamp: Duration,
    coded_width: u32,
    coded_height: u32,
    visible: Rect,
    pixels: Bytes,
    lease: Option<FrameLease>,
}

impl Frame {
    /// Creates a frame from tightly packed RGBA8 pixels
    ///
    /// # Arguments
    /// * `timestamp` - Capture time of the frame
    /// * `width` - Frame width in pixels
    /// * `height` - Frame height in pixels
    /// * `pixels` - `width * height * 4` bytes, row-major, no padding
    pub fn new(timestamp: Duration, width: u32, height: u32, pixels: impl Into<Bytes>) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }

        let pixels = pixels.into();
        let expected = width as usize * height as usize * BYTES_PER_PIXEL as usize;
        if pixels.len() != expected {
            return Err(FrameError::PixelLength { expected, actual: pixels.len() });
        }

        Ok(Self {
            timestamp,
            coded_width: width,
            coded_height: height,
            visible: Rect::new(0, 0, width, height),
            pixels,
            lease: None,
        })
    }

    /// Creates a frame filled with a single RGBA colour
    pub fn solid(timestamp: Duration, width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, FrameError> {
        let pixel_count = width as usize * height as usize;
        let pixels: Vec<u8> = rgba.iter().copied().cycle().take(pixel_count * BYTES_PER_PIXEL as usize).collect();
        Self::new(timestamp, width, height, pixels)
    }

    /// Attaches this frame to a ledger; its eventual release is counted there
    pub fn tracked(mut self, ledger: &FrameLedger) -> Self {
        self.lease = Some(ledger.lease());
        self
    }

    /// Capture timestamp
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Width of the visible region
    pub fn display_width(&self) -> u32 {
        self.visible.width
    }

    /// Height of the visible region
    pub fn display_height(&self) -> u32 {
        self.visible.height
    }

    /// Dimensions of the underlying pixel storage
    pub fn coded_size(&self) -> (u32, u32) {
        (self.coded_width, self.coded_height)
    }

    /// Visible region within the coded frame
    pub fn visible_rect(&self) -> Rect {
        self.visible
    }

    /// Derives a frame showing `rect` of this frame's coded pixels
    ///
    /// The derived frame shares pixel storage with this one but has its own lifetime and is
    /// never attached to a ledger.
    pub fn view(&self, rect: Rect) -> Result<Self, FrameError> {
        if !rect.fits_within(self.coded_width, self.coded_height) {
            return Err(FrameError::RegionOutOfBounds {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                frame_width: self.coded_width,
                frame_height: self.coded_height,
            });
        }

        Ok(Self {
            timestamp: self.timestamp,
            coded_width: self.coded_width,
            coded_height: self.coded_height,
            visible: rect,
            pixels: self.pixels.clone(),
            lease: None,
        })
    }

    /// Materializes the visible region as a packed bitmap
    ///
    /// Zero-copy when the visible region covers the whole frame.
    pub fn to_bitmap(&self) -> Bitmap {
        let Rect { x, y, width, height } = self.visible;

        if (x, y, width, height) == (0, 0, self.coded_width, self.coded_height) {
            return Bitmap {
                width,
                height,
                pixels: self.pixels.clone(),
            };
        }

        let source_stride = (self.coded_width * BYTES_PER_PIXEL) as usize;
        let row_bytes = (width * BYTES_PER_PIXEL) as usize;
        let mut packed = Vec::with_capacity(row_bytes * height as usize);
        for row in y..y + height {
            let start = row as usize * source_stride + (x * BYTES_PER_PIXEL) as usize;
            packed.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }

        Bitmap {
            width,
            height,
            pixels: Bytes::from(packed),
        }
    }

    /// Releases the frame
    ///
    /// Equivalent to dropping it; spelled out where the release point matters.
    pub fn release(self) {
        drop(self);
    }
}
