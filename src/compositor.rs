//! Compositing the rotated tile onto the target image.
//!
//! The tile builder guarantees a tile at least as large as the image in both
//! axes; this module crops the tile's center to the image's exact size and
//! alpha-blends it over the image with the Porter-Duff "over" operator.

use crate::error::WatermarkError;
use image::{imageops, DynamicImage, RgbImage, Rgba, RgbaImage};

/// Center-aligned crop box of `inner` within `outer`.
///
/// Floor division on both dimensions, matching the tile builder's sizing.
pub fn center_crop_box(
    outer_w: u32,
    outer_h: u32,
    inner_w: u32,
    inner_h: u32,
) -> Result<(u32, u32), WatermarkError> {
    if inner_w > outer_w || inner_h > outer_h {
        return Err(WatermarkError::Composite(format!(
            "crop box {}x{} does not fit inside tile {}x{}",
            inner_w, inner_h, outer_w, outer_h
        )));
    }

    let x = outer_w / 2 - inner_w / 2;
    let y = outer_h / 2 - inner_h / 2;

    // The tile builder's coverage invariant should make this unreachable,
    // but an out-of-bounds crop must fail loudly, never truncate.
    if x + inner_w > outer_w || y + inner_h > outer_h {
        return Err(WatermarkError::Composite(format!(
            "crop box ({}, {}) + {}x{} exceeds tile {}x{}",
            x, y, inner_w, inner_h, outer_w, outer_h
        )));
    }

    Ok((x, y))
}

/// Blend `top` over `bottom` using the Porter-Duff "over" operator.
pub(crate) fn blend_over(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);
    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let v = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(top[0], bottom[0]),
        channel(top[1], bottom[1]),
        channel(top[2], bottom[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}

/// Crop the rotated tile to the image's bounds and blend it over the image.
///
/// The result is flattened to opaque RGB for saving. Output dimensions are
/// always identical to the input's.
pub fn composite(image: &DynamicImage, tile: &RgbaImage) -> Result<RgbImage, WatermarkError> {
    let mut base = image.to_rgba8();
    let (img_w, img_h) = base.dimensions();
    let (tile_w, tile_h) = tile.dimensions();

    let (x, y) = center_crop_box(tile_w, tile_h, img_w, img_h)?;
    let cropped = imageops::crop_imm(tile, x, y, img_w, img_h).to_image();

    for (px, py, pixel) in base.enumerate_pixels_mut() {
        let overlay = cropped.get_pixel(px, py);
        if overlay[3] > 0 {
            *pixel = blend_over(*pixel, *overlay);
        }
    }

    Ok(DynamicImage::ImageRgba8(base).to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    // Test: crop box is centered with floor-division semantics
    #[test]
    fn test_center_crop_box_even_and_odd() {
        assert_eq!(center_crop_box(100, 100, 40, 20).unwrap(), (30, 40));
        // 11/2 - 9/2 = 5 - 4 = 1
        assert_eq!(center_crop_box(11, 11, 9, 9).unwrap(), (1, 1));
        assert_eq!(center_crop_box(10, 10, 10, 10).unwrap(), (0, 0));
    }

    // Test: an oversized crop fails loudly instead of truncating
    #[test]
    fn test_center_crop_box_rejects_oversized_inner() {
        let err = center_crop_box(50, 50, 60, 40).unwrap_err();
        assert!(matches!(err, WatermarkError::Composite(_)));

        let err = center_crop_box(50, 50, 40, 60).unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }

    #[test]
    fn test_composite_preserves_dimensions() {
        let image = DynamicImage::ImageRgba8(solid(320, 200, [10, 20, 30, 255]));
        let tile = solid(500, 400, [220, 220, 220, 51]);

        let out = composite(&image, &tile).unwrap();
        assert_eq!(out.dimensions(), (320, 200));
    }

    #[test]
    fn test_composite_rejects_undersized_tile() {
        let image = DynamicImage::ImageRgba8(solid(320, 200, [0, 0, 0, 255]));
        let tile = solid(100, 400, [220, 220, 220, 51]);

        assert!(composite(&image, &tile).is_err());
    }

    // Test: fully transparent tile leaves the image untouched
    #[test]
    fn test_composite_transparent_tile_is_identity() {
        let image = DynamicImage::ImageRgba8(solid(64, 48, [90, 120, 150, 255]));
        let tile = solid(128, 96, [255, 255, 255, 0]);

        let out = composite(&image, &tile).unwrap();
        for pixel in out.pixels() {
            assert_eq!(pixel.0, [90, 120, 150]);
        }
    }

    #[test]
    fn test_composite_blends_half_transparent_gray() {
        // 50% alpha white over black comes out mid-gray
        let image = DynamicImage::ImageRgba8(solid(10, 10, [0, 0, 0, 255]));
        let tile = solid(20, 20, [255, 255, 255, 128]);

        let out = composite(&image, &tile).unwrap();
        let p = out.get_pixel(5, 5);
        assert!(p[0] > 110 && p[0] < 145);
        assert!(p[1] > 110 && p[1] < 145);
        assert!(p[2] > 110 && p[2] < 145);
    }

    #[test]
    fn test_blend_over_opaque_top_wins() {
        let out = blend_over(Rgba([10, 20, 30, 255]), Rgba([200, 100, 50, 255]));
        assert_eq!(out, Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn test_blend_over_transparent_top_keeps_bottom() {
        let out = blend_over(Rgba([10, 20, 30, 255]), Rgba([200, 100, 50, 0]));
        assert_eq!(out, Rgba([10, 20, 30, 255]));
    }
}
