//! Per-file watermark processing.
//!
//! Dispatches on the input's extension: PNG and JPEG are single-frame
//! decode/watermark/encode; TIFF iterates every page, watermarks each one
//! and appends it to a multi-page output in the original order.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;

use crate::compositor::composite;
use crate::error::WatermarkError;
use crate::spec::{SaveOptions, WatermarkSpec};
use crate::tile::build_tile;
use ab_glyph::FontVec;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{imageops, ColorType, DynamicImage, ImageEncoder, RgbImage};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, compression, TiffEncoder};

/// Supported input formats, detected from the file extension
/// (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Tiff,
}

impl ImageKind {
    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, WatermarkError> {
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "png" => Ok(ImageKind::Png),
            "jpg" | "jpeg" => Ok(ImageKind::Jpeg),
            "tif" | "tiff" => Ok(ImageKind::Tiff),
            "" => Err(WatermarkError::UnsupportedFormat {
                format: "(no extension)".to_string(),
            }),
            other => Err(WatermarkError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    /// Whether the path carries a supported extension.
    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

/// Watermark a single decoded image: build the rotated tile for its
/// dimensions, crop-center it and blend it over.
pub fn watermark_image(
    image: &DynamicImage,
    spec: &WatermarkSpec,
    font: &FontVec,
) -> Result<RgbImage, WatermarkError> {
    let tile = build_tile(image.width(), image.height(), spec, font)?;
    composite(image, &tile)
}

/// Watermark one file, writing the result to `output` in the same format.
pub fn watermark_file(
    input: &Path,
    output: &Path,
    spec: &WatermarkSpec,
    font: &FontVec,
    opts: &SaveOptions,
) -> Result<(), WatermarkError> {
    let kind = ImageKind::from_path(input)?;

    match kind {
        ImageKind::Tiff => watermark_tiff(input, output, spec, font, opts),
        ImageKind::Png | ImageKind::Jpeg => {
            let image = image::open(input)?;
            tracing::debug!(
                input = %input.display(),
                width = image.width(),
                height = image.height(),
                "decoded single-frame image"
            );
            let marked = watermark_image(&image, spec, font)?;
            save_single_frame(output, &marked, kind, opts.quality)
        }
    }
}

/// Encode a single watermarked frame as PNG or JPEG.
fn save_single_frame(
    output: &Path,
    frame: &RgbImage,
    kind: ImageKind,
    quality: u8,
) -> Result<(), WatermarkError> {
    let writer = BufWriter::new(File::create(output)?);
    let (width, height) = frame.dimensions();

    match kind {
        ImageKind::Jpeg => {
            JpegEncoder::new_with_quality(writer, quality)
                .write_image(frame.as_raw(), width, height, ColorType::Rgb8)?;
        }
        ImageKind::Png => {
            // PNG is lossless; the quality parameter does not apply
            PngEncoder::new(writer)
                .write_image(frame.as_raw(), width, height, ColorType::Rgb8)?;
        }
        ImageKind::Tiff => unreachable!("TIFF goes through watermark_tiff"),
    }

    Ok(())
}

/// Watermark every page of a TIFF, appending each result to a multi-page
/// output in the original order.
///
/// A decode failure on a later page must not leave a truncated container
/// behind, so the output is removed when any page fails.
fn watermark_tiff(
    input: &Path,
    output: &Path,
    spec: &WatermarkSpec,
    font: &FontVec,
    opts: &SaveOptions,
) -> Result<(), WatermarkError> {
    let result = watermark_tiff_pages(input, output, spec, font, opts);
    if result.is_err() {
        let _ = std::fs::remove_file(output);
    }
    result
}

fn watermark_tiff_pages(
    input: &Path,
    output: &Path,
    spec: &WatermarkSpec,
    font: &FontVec,
    opts: &SaveOptions,
) -> Result<(), WatermarkError> {
    let reader = BufReader::new(File::open(input)?);
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let writer = BufWriter::new(File::create(output)?);
    let mut encoder = TiffEncoder::new(writer)?;

    let mut frames = 0usize;
    loop {
        let frame = decode_tiff_frame(&mut decoder)?;
        let mut marked = watermark_image(&frame, spec, font)?;
        if let Some(target) = opts.resize {
            marked = resize_longest_side(marked, target);
        }
        write_tiff_frame(&mut encoder, &marked, opts.compress)?;
        frames += 1;

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    tracing::debug!(input = %input.display(), frames, "watermarked multi-page TIFF");
    Ok(())
}

/// Decode the decoder's current page into a `DynamicImage`.
///
/// 8-bit gray, RGB and RGBA pages are supported; anything else is a typed
/// decode error naming the color type.
fn decode_tiff_frame(
    decoder: &mut Decoder<BufReader<File>>,
) -> Result<DynamicImage, WatermarkError> {
    let (width, height) = decoder.dimensions()?;
    let color = decoder.colortype()?;

    let data = match decoder.read_image()? {
        DecodingResult::U8(data) => data,
        _ => {
            return Err(WatermarkError::Decode(
                "unsupported TIFF bit depth (expected 8-bit samples)".to_string(),
            ))
        }
    };

    let size_mismatch =
        || WatermarkError::Decode("TIFF frame buffer size mismatch".to_string());

    match color {
        tiff::ColorType::Gray(8) => image::GrayImage::from_raw(width, height, data)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(size_mismatch),
        tiff::ColorType::RGB(8) => RgbImage::from_raw(width, height, data)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(size_mismatch),
        tiff::ColorType::RGBA(8) => image::RgbaImage::from_raw(width, height, data)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(size_mismatch),
        other => Err(WatermarkError::Decode(format!(
            "unsupported TIFF color type {:?}",
            other
        ))),
    }
}

/// Append one RGB frame to the multi-page encoder.
///
/// The Rust tiff encoder has no JPEG-in-TIFF compressor; `compress` maps to
/// Deflate, which is lossless.
fn write_tiff_frame<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    frame: &RgbImage,
    compress: bool,
) -> Result<(), WatermarkError> {
    let (width, height) = frame.dimensions();

    if compress {
        encoder.write_image_with_compression::<colortype::RGB8, _>(
            width,
            height,
            compression::Deflate::default(),
            frame.as_raw(),
        )?;
    } else {
        encoder.write_image::<colortype::RGB8>(width, height, frame.as_raw())?;
    }

    Ok(())
}

/// Scale so the longest side equals `target`, preserving aspect ratio.
/// Never upscales.
fn resize_longest_side(frame: RgbImage, target: u32) -> RgbImage {
    let (width, height) = frame.dimensions();
    let longest = width.max(height);
    if target >= longest {
        return frame;
    }

    let scale = target as f64 / longest as f64;
    let new_w = ((width as f64 * scale).round() as u32).max(1);
    let new_h = ((height as f64 * scale).round() as u32).max(1);

    imageops::resize(&frame, new_w, new_h, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_support::test_font;
    use image::Rgb;
    use rstest::rstest;

    #[rstest]
    #[case("photo.png", ImageKind::Png)]
    #[case("photo.PNG", ImageKind::Png)]
    #[case("scan.jpg", ImageKind::Jpeg)]
    #[case("scan.JPEG", ImageKind::Jpeg)]
    #[case("doc.tif", ImageKind::Tiff)]
    #[case("doc.TIFF", ImageKind::Tiff)]
    fn test_detect_kind(#[case] name: &str, #[case] expected: ImageKind) {
        assert_eq!(ImageKind::from_path(Path::new(name)).unwrap(), expected);
    }

    #[rstest]
    #[case("anim.gif")]
    #[case("image.bmp")]
    #[case("noextension")]
    fn test_detect_kind_unsupported(#[case] name: &str) {
        let err = ImageKind::from_path(Path::new(name)).unwrap_err();
        assert!(matches!(err, WatermarkError::UnsupportedFormat { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_resize_longest_side_landscape() {
        let frame = RgbImage::from_pixel(2000, 1000, Rgb([128, 128, 128]));
        let out = resize_longest_side(frame, 500);
        assert_eq!(out.dimensions(), (500, 250));
    }

    #[test]
    fn test_resize_longest_side_portrait() {
        let frame = RgbImage::from_pixel(600, 1800, Rgb([128, 128, 128]));
        let out = resize_longest_side(frame, 900);
        assert_eq!(out.dimensions(), (300, 900));
    }

    #[test]
    fn test_resize_never_upscales() {
        let frame = RgbImage::from_pixel(400, 300, Rgb([128, 128, 128]));
        let out = resize_longest_side(frame, 4000);
        assert_eq!(out.dimensions(), (400, 300));
    }

    #[test]
    fn test_watermark_image_preserves_dimensions() {
        let font = test_font();
        let spec = WatermarkSpec {
            font_size: 16.0,
            padding: 20,
            ..WatermarkSpec::new("TEST")
        };
        let image =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(160, 90, Rgb([200, 210, 220])));

        let out = watermark_image(&image, &spec, &font).unwrap();
        assert_eq!(out.dimensions(), (160, 90));
    }

    #[test]
    fn test_watermark_file_missing_input() {
        let font = test_font();
        let dir = tempfile::tempdir().unwrap();
        let err = watermark_file(
            Path::new("/nonexistent/in.png"),
            &dir.path().join("out.png"),
            &WatermarkSpec::new("X"),
            &font,
            &SaveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WatermarkError::Io(_) | WatermarkError::Decode(_)
        ));
    }
}
