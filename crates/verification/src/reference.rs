//! CPU reference implementation of the swirl effect
//!
//! Mirrors what the GPU stage computes per output pixel: take the pixel centre in UV space,
//! move it through the swirl mapping, and sample the input there with bilinear filtering
//! and repeat addressing.

/// Centre of the swirl in UV space
pub const SWIRL_CENTER: [f32; 2] = [0.5, 0.5];
/// Radius of the affected disc in UV units
pub const SWIRL_RADIUS: f32 = 0.5;
/// Rotation at the centre, in radians
pub const SWIRL_STRENGTH: f32 = 3.0;

/// Maps an output UV coordinate to the UV coordinate it samples from
///
/// Points inside the radius are rotated about the centre by `((radius - r) / radius)^2 * strength`;
/// everything else maps to itself.
pub fn swirl_uv(uv: [f32; 2]) -> [f32; 2] {
    let offset = [uv[0] - SWIRL_CENTER[0], uv[1] - SWIRL_CENTER[1]];
    let distance = offset[0].hypot(offset[1]);
    if distance >= SWIRL_RADIUS {
        return uv;
    }

    let falloff = (SWIRL_RADIUS - distance) / SWIRL_RADIUS;
    let angle = falloff * falloff * SWIRL_STRENGTH;
    let (s, c) = angle.sin_cos();
    [
        SWIRL_CENTER[0] + offset[0] * c - offset[1] * s,
        SWIRL_CENTER[1] + offset[0] * s + offset[1] * c,
    ]
}

/// Samples `image` at `uv` with bilinear filtering and repeat addressing
///
/// # Returns
/// RGBA channels normalized to `[0, 1]`
pub fn sample_bilinear_repeat(image: &image::RgbaImage, uv: [f32; 2]) -> [f32; 4] {
    let (width, height) = image.dimensions();

    // Texel centres sit at half-integer coordinates
    let x = uv[0] * width as f32 - 0.5;
    let y = uv[1] * height as f32 - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let texel = |tx: f32, ty: f32| -> [f32; 4] {
        let px = (tx as i64).rem_euclid(width as i64) as u32;
        let py = (ty as i64).rem_euclid(height as i64) as u32;
        image.get_pixel(px, py).0.map(|channel| channel as f32 / 255.0)
    };

    let top_left = texel(x0, y0);
    let top_right = texel(x0 + 1.0, y0);
    let bottom_left = texel(x0, y0 + 1.0);
    let bottom_right = texel(x0 + 1.0, y0 + 1.0);

    std::array::from_fn(|i| {
        let top = top_left[i] + (top_right[i] - top_left[i]) * fx;
        let bottom = bottom_left[i] + (bottom_right[i] - bottom_left[i]) * fx;
        top + (bottom - top) * fy
    })
}

/// Applies the swirl to a whole image
pub fn swirl_image(input: &image::RgbaImage) -> image::RgbaImage {
    let (width, height) = input.dimensions();
    image::RgbaImage::from_fn(width, height, |x, y| {
        let uv = [(x as f32 + 0.5) / width as f32, (y as f32 + 0.5) / height as f32];
        let color = sample_bilinear_repeat(input, swirl_uv(uv));
        image::Rgba(color.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_the_radius_is_identity() {
        for uv in [[0.0, 0.0], [1.0, 1.0], [0.02, 0.98], [0.5, 0.0], [1.0, 0.5], [0.9, 0.9]] {
            assert_eq!(swirl_uv(uv), uv);
        }
    }

    #[test]
    fn centre_is_a_fixed_point() {
        assert_eq!(swirl_uv(SWIRL_CENTER), SWIRL_CENTER);
    }

    #[test]
    fn rotation_preserves_distance_and_follows_falloff() {
        let uv = [0.75, 0.5];
        let [u, v] = swirl_uv(uv);
        let distance = (u - 0.5).hypot(v - 0.5);
        assert!((distance - 0.25).abs() < 1e-6);

        // Half way out the rotation is a quarter of the full strength
        let angle = (v - 0.5).atan2(u - 0.5);
        assert!((angle - 0.75).abs() < 1e-5, "angle {angle}");
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let input = image::RgbaImage::from_pixel(37, 21, image::Rgba([12, 200, 77, 255]));
        let output = swirl_image(&input);
        assert!(output.pixels().all(|pixel| pixel.0 == [12, 200, 77, 255]));
    }

    #[test]
    fn sampling_wraps_around_edges() {
        let mut input = image::RgbaImage::from_pixel(4, 1, image::Rgba([0, 0, 0, 255]));
        input.put_pixel(0, 0, image::Rgba([255, 255, 255, 255]));

        // Halfway between the last and the first texel
        let color = sample_bilinear_repeat(&input, [1.0, 0.5]);
        assert!((color[0] - 0.5).abs() < 1e-6);
    }
}
