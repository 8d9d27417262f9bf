//! Image comparison utilities for verification
//!
//! GPU filtering runs at lower precision than the CPU reference, so pixels are compared
//! per channel against a tolerance instead of exactly.

/// Result of comparing two images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    /// Every channel of every pixel is within tolerance
    Match {
        /// Largest per-channel difference seen
        max_difference: u8,
    },
    /// Images have different dimensions
    DimensionMismatch {
        /// Dimensions of the reference output
        reference_dimensions: (u32, u32),
        /// Dimensions of the output under test
        actual_dimensions: (u32, u32),
    },
    /// Images have matching dimensions but some pixels differ by more than the tolerance
    PixelMismatch {
        /// Largest per-channel difference seen
        max_difference: u8,
        /// Pixels with at least one channel outside tolerance
        mismatched_pixels: u64,
        /// Total pixel count
        total_pixels: u64,
    },
}

impl CompareResult {
    /// Fraction of pixels outside tolerance; dimension mismatches count as fully mismatched
    pub fn mismatch_ratio(&self) -> f64 {
        match *self {
            CompareResult::Match { .. } => 0.0,
            CompareResult::DimensionMismatch { .. } => 1.0,
            CompareResult::PixelMismatch {
                mismatched_pixels, total_pixels, ..
            } => mismatched_pixels as f64 / total_pixels as f64,
        }
    }
}

/// Compares two RGBA8 images pixel by pixel
///
/// # Arguments
/// * `reference` - Expected image
/// * `actual` - Image under test
/// * `tolerance` - Largest per-channel difference still counted as equal
///
/// # Returns
/// A `CompareResult` describing how far apart the images are
pub fn compare_images(reference: &image::RgbaImage, actual: &image::RgbaImage, tolerance: u8) -> CompareResult {
    if reference.dimensions() != actual.dimensions() {
        return CompareResult::DimensionMismatch {
            reference_dimensions: reference.dimensions(),
            actual_dimensions: actual.dimensions(),
        };
    }

    let mut max_difference = 0;
    let mut mismatched_pixels = 0;
    for (expected, found) in reference.pixels().zip(actual.pixels()) {
        let difference = expected.0.iter().zip(found.0).map(|(&a, b)| a.abs_diff(b)).max().unwrap_or(0);
        max_difference = max_difference.max(difference);
        if difference > tolerance {
            mismatched_pixels += 1;
        }
    }

    if mismatched_pixels == 0 {
        CompareResult::Match { max_difference }
    } else {
        CompareResult::PixelMismatch {
            max_difference,
            mismatched_pixels,
            total_pixels: reference.width() as u64 * reference.height() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_differences_are_within_tolerance() {
        let reference = image::RgbaImage::from_pixel(4, 4, image::Rgba([100, 100, 100, 255]));
        let actual = image::RgbaImage::from_pixel(4, 4, image::Rgba([102, 99, 100, 255]));

        assert_eq!(compare_images(&reference, &actual, 2), CompareResult::Match { max_difference: 2 });
    }

    #[test]
    fn reports_mismatched_pixels() {
        let reference = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let mut actual = reference.clone();
        actual.put_pixel(1, 2, image::Rgba([0, 50, 0, 255]));

        let result = compare_images(&reference, &actual, 4);
        assert_eq!(
            result,
            CompareResult::PixelMismatch {
                max_difference: 50,
                mismatched_pixels: 1,
                total_pixels: 16
            }
        );
        assert_eq!(result.mismatch_ratio(), 1.0 / 16.0);
    }

    #[test]
    fn different_sizes_never_match() {
        let result = compare_images(&image::RgbaImage::new(2, 2), &image::RgbaImage::new(2, 3), 255);
        assert!(matches!(result, CompareResult::DimensionMismatch { .. }));
        assert_eq!(result.mismatch_ratio(), 1.0);
    }
}
