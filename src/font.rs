//! Font loading and text metrics.
//!
//! Wraps `ab_glyph` behind the two questions the tile builder asks: how wide
//! is this string, and how tall is one line.

use crate::error::WatermarkError;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use std::path::Path;

/// Load a TTF/OTF font from a file.
pub fn load_font(path: &Path) -> Result<FontVec, WatermarkError> {
    let data = std::fs::read(path).map_err(|e| {
        WatermarkError::Font(format!("cannot read font file {}: {}", path.display(), e))
    })?;
    FontVec::try_from_vec(data).map_err(|_| {
        WatermarkError::Font(format!("not a valid font file: {}", path.display()))
    })
}

/// Horizontal advance of `text` at the given scale, kerning included.
pub fn measure_width(font: &FontVec, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev_id) = prev {
            width += scaled.kern(prev_id, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }

    width
}

/// Line height (ascent - descent + line gap) at the given scale.
pub fn line_height(font: &FontVec, scale: PxScale) -> f32 {
    font.as_scaled(scale).height()
}


#[cfg(test)]
mod tests {
    use super::test_support::test_font;
    use super::*;

    #[test]
    fn test_load_font_missing_file() {
        let err = load_font(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, WatermarkError::Font(_)));
    }

    #[test]
    fn test_load_font_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.ttf");
        std::fs::write(&path, b"this is not a font").unwrap();

        let err = load_font(&path).unwrap_err();
        assert!(err.to_string().contains("not a valid font file"));
    }

    #[test]
    fn test_measure_width_scales_with_font_size() {
        let font = test_font();
        let w_small = measure_width(&font, PxScale::from(12.0), "Hello");
        let w_large = measure_width(&font, PxScale::from(48.0), "Hello");
        assert!(w_small > 0.0);
        assert!(w_large > w_small);
    }

    #[test]
    fn test_measure_width_grows_with_text() {
        let font = test_font();
        let scale = PxScale::from(24.0);
        let short = measure_width(&font, scale, "ab");
        let long = measure_width(&font, scale, "abcdef");
        assert!(long > short);
    }

    #[test]
    fn test_line_height_positive() {
        let font = test_font();
        let h = line_height(&font, PxScale::from(40.0));
        assert!(h > 0.0);
        assert!(h < 80.0);
    }
}
