//! Tile builder: the repeating-text layer that covers a rotated image.
//!
//! The tile is a transparent RGBA buffer filled with rows of repeated
//! watermark text, each row cyclically shifted so the copies do not line up
//! vertically, then rotated by the configured angle. It is sized from the
//! image's diagonal, so after rotation its bounds always enclose the image
//! and the compositor's center crop never exposes an untextured corner.
//!
//! # Coverage
//!
//! With covering side `S = ceil(sqrt(w^2 + h^2))`, both tile dimensions are
//! at least `S` before rotation. A rotated rectangle's bounding box spans
//! `W*|cos| + H*|sin|` by `W*|sin| + H*|cos|`, and `|cos| + |sin| >= 1` for
//! every angle, so both rotated bounds stay at least `S` — which is the
//! image's diagonal. The centered image rectangle therefore always fits.

use crate::compositor::blend_over;
use crate::error::WatermarkError;
use crate::font::{line_height, measure_width};
use crate::spec::WatermarkSpec;
use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

/// Side of the square that covers a `width` x `height` rectangle under any
/// rotation: the rectangle's diagonal, rounded up.
pub fn covering_side(width: u32, height: u32) -> u32 {
    let w = width as f64;
    let h = height as f64;
    ((w * w + h * h).sqrt().ceil() as u32).max(1)
}

/// Cyclic left rotation of `row * step` characters.
///
/// Character semantics, not bytes: multi-byte text shifts whole characters.
pub fn cyclic_shift(s: &str, step: usize, row: usize) -> String {
    let len = s.chars().count();
    if len == 0 {
        return String::new();
    }

    let shift = (row * step) % len;
    let split = s
        .char_indices()
        .nth(shift)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(0);

    format!("{}{}", &s[split..], &s[..split])
}

/// One row's text: a leading separator, then `repeat` copies of the text
/// joined by the same separator.
fn build_line(text: &str, space_interval: usize, repeat: usize) -> String {
    let separator = " ".repeat(space_interval);
    let mut line = String::with_capacity((text.len() + space_interval) * repeat);
    for _ in 0..repeat {
        line.push_str(&separator);
        line.push_str(text);
    }
    line
}

/// Build the rotated watermark tile for an image of the given dimensions.
///
/// Pure function over its inputs; identical inputs produce identical tiles.
pub fn build_tile(
    image_w: u32,
    image_h: u32,
    spec: &WatermarkSpec,
    font: &FontVec,
) -> Result<RgbaImage, WatermarkError> {
    let side = covering_side(image_w, image_h);
    let scale = PxScale::from(spec.font_size);

    let text_w = measure_width(font, scale, &spec.text);
    if text_w < 1.0 {
        return Err(WatermarkError::Font(format!(
            "text {:?} has no measurable width in this font",
            spec.text
        )));
    }

    let repeat = (side as f32 / text_w).ceil() as usize;
    let line = build_line(&spec.text, spec.space_interval, repeat);

    let line_w = measure_width(font, scale, &line).ceil().max(1.0) as u32;
    let line_h = line_height(font, scale).ceil().max(1.0) as u32;

    let row_pitch = line_h + 2 * spec.padding;
    let num_rows = ((side + row_pitch - 1) / row_pitch).max(1);

    let mut tile = RgbaImage::new(line_w, row_pitch * num_rows);

    let fill = Rgba([spec.fill_gray, spec.fill_gray, spec.fill_gray, spec.alpha()]);
    for row in 0..num_rows {
        let shifted = cyclic_shift(&line, spec.space_interval, row as usize);
        draw_text_row(&mut tile, font, scale, &shifted, (row * row_pitch) as f32, fill);
    }

    tracing::debug!(
        image_w,
        image_h,
        side,
        tile_w = tile.width(),
        tile_h = tile.height(),
        num_rows,
        "built watermark tile"
    );

    if spec.angle == 0.0 {
        return Ok(tile);
    }
    Ok(rotate_expand(&tile, spec.angle))
}

/// Draw one row of text with its top edge at `y_top`.
fn draw_text_row(
    canvas: &mut RgbaImage,
    font: &FontVec,
    scale: PxScale,
    text: &str,
    y_top: f32,
    fill: Rgba<u8>,
) {
    let scaled = font.as_scaled(scale);
    let baseline = y_top + scaled.ascent();
    let (canvas_w, canvas_h) = (canvas.width() as i32, canvas.height() as i32);

    let mut cursor = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev_id) = prev {
            cursor += scaled.kern(prev_id, id);
        }

        let glyph = id.with_scale_and_position(scale, point(cursor, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = gx as i32 + bounds.min.x as i32;
                let y = gy as i32 + bounds.min.y as i32;
                if x < 0 || y < 0 || x >= canvas_w || y >= canvas_h {
                    return;
                }

                let alpha = (coverage * fill[3] as f32).round() as u8;
                if alpha == 0 {
                    return;
                }

                // Blend so overlapping glyph edges keep their anti-aliasing
                let top = Rgba([fill[0], fill[1], fill[2], alpha]);
                let bottom = *canvas.get_pixel(x as u32, y as u32);
                canvas.put_pixel(x as u32, y as u32, blend_over(bottom, top));
            });
        }

        cursor += scaled.h_advance(id);
        prev = Some(id);
    }
}

/// Rotate counter-clockwise by `degrees`, expanding the canvas to the
/// rotated bounding box. Bilinear resampling; outside samples are
/// transparent.
fn rotate_expand(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let theta = degrees.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();

    let src_w = src.width() as f32;
    let src_h = src.height() as f32;

    let dst_w = (src_w * cos_t.abs() + src_h * sin_t.abs()).ceil().max(1.0) as u32;
    let dst_h = (src_w * sin_t.abs() + src_h * cos_t.abs()).ceil().max(1.0) as u32;

    let src_cx = src_w / 2.0;
    let src_cy = src_h / 2.0;
    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    let mut dst = RgbaImage::new(dst_w, dst_h);
    for (dx, dy, out) in dst.enumerate_pixels_mut() {
        // Inverse-map each destination pixel center back into source space
        let rx = dx as f32 + 0.5 - dst_cx;
        let ry = dy as f32 + 0.5 - dst_cy;

        let sx = rx * cos_t + ry * sin_t + src_cx - 0.5;
        let sy = -rx * sin_t + ry * cos_t + src_cy - 0.5;

        *out = sample_bilinear(src, sx, sy);
    }

    dst
}

/// Bilinear sample at fractional coordinates; taps outside the image read
/// as fully transparent.
fn sample_bilinear(src: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let w = src.width() as i64;
    let h = src.height() as i64;

    if x <= -1.0 || y <= -1.0 || x >= w as f32 || y >= h as f32 {
        return Rgba([0, 0, 0, 0]);
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x0 = x0 as i64;
    let y0 = y0 as i64;

    let tap = |xi: i64, yi: i64| -> [f32; 4] {
        if xi < 0 || yi < 0 || xi >= w || yi >= h {
            return [0.0; 4];
        }
        let p = src.get_pixel(xi as u32, yi as u32);
        [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
    };

    let p00 = tap(x0, y0);
    let p10 = tap(x0 + 1, y0);
    let p01 = tap(x0, y0 + 1);
    let p11 = tap(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let v = p00[c] * (1.0 - fx) * (1.0 - fy)
            + p10[c] * fx * (1.0 - fy)
            + p01[c] * (1.0 - fx) * fy
            + p11[c] * fx * fy;
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }

    Rgba(out)
}
