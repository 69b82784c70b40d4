//! Watermark configuration.
//!
//! [`WatermarkSpec`] is the immutable description of one watermark: the text,
//! its geometry (angle, font size, padding, row shift) and its appearance
//! (gray level, opacity). It is validated once at the CLI boundary; the tile
//! builder and compositor can then assume every field is in range.

use crate::error::WatermarkError;

/// Percent-to-alpha scale factor (100% -> 255).
pub const OPACITY_COEF: f32 = 2.55;

// Default values
fn default_angle() -> f32 {
    45.0
}

fn default_opacity() -> u8 {
    20
}

fn default_fill_gray() -> u8 {
    220
}

fn default_font_size() -> f32 {
    50.0
}

fn default_padding() -> u32 {
    200
}

fn default_space_interval() -> usize {
    10
}

/// Immutable watermark configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    /// Text repeated across the tile.
    pub text: String,

    /// Font size in pixels (default: 50.0).
    pub font_size: f32,

    /// Rotation angle in degrees, counter-clockwise (default: 45.0).
    pub angle: f32,

    /// Text opacity in percent, 0-100 (default: 20).
    pub opacity: u8,

    /// Gray level reused for R, G and B, 0-255 (default: 220).
    pub fill_gray: u8,

    /// Pixels of padding above and below each text row (default: 200).
    pub padding: u32,

    /// Number of space characters used both as the text separator and as
    /// the per-row cyclic shift step (default: 10).
    pub space_interval: usize,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: default_font_size(),
            angle: default_angle(),
            opacity: default_opacity(),
            fill_gray: default_fill_gray(),
            padding: default_padding(),
            space_interval: default_space_interval(),
        }
    }
}

impl WatermarkSpec {
    /// Create a spec with the given text and default parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Validate every field, naming the offending one on failure.
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.text.is_empty() {
            return Err(WatermarkError::InvalidSpec(
                "text must not be empty".to_string(),
            ));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(WatermarkError::InvalidSpec(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        if !self.angle.is_finite() || self.angle < 0.0 || self.angle >= 360.0 {
            return Err(WatermarkError::InvalidSpec(format!(
                "angle must be in [0, 360), got {}",
                self.angle
            )));
        }
        if self.opacity > 100 {
            return Err(WatermarkError::InvalidSpec(format!(
                "opacity must be in 0-100, got {}",
                self.opacity
            )));
        }
        if self.space_interval == 0 {
            return Err(WatermarkError::InvalidSpec(
                "space interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Map the opacity percentage to an 8-bit alpha value.
    ///
    /// The scaled value is clamped to 255. The tool this replaces computed
    /// `opacity if opacity <= 100 else opacity`, which never clamped at all.
    pub fn alpha(&self) -> u8 {
        ((self.opacity as f32 * OPACITY_COEF).round() as u32).min(255) as u8
    }
}

/// Options controlling how the watermarked result is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// JPEG quality, 0-100 (default: 100). Ignored for PNG and TIFF.
    pub quality: u8,

    /// Compress TIFF frames (Deflate). Ignored for PNG and JPEG.
    pub compress: bool,

    /// Scale each TIFF frame so its longest side equals this value.
    /// Never upscales.
    pub resize: Option<u32>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            quality: 100,
            compress: false,
            resize: None,
        }
    }
}

impl SaveOptions {
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.quality > 100 {
            return Err(WatermarkError::InvalidSpec(format!(
                "quality must be in 0-100, got {}",
                self.quality
            )));
        }
        if let Some(target) = self.resize {
            if target == 0 {
                return Err(WatermarkError::InvalidSpec(
                    "resize target must be at least 1 pixel".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let spec = WatermarkSpec::new("DRAFT");
        assert_eq!(spec.text, "DRAFT");
        assert_eq!(spec.font_size, 50.0);
        assert_eq!(spec.angle, 45.0);
        assert_eq!(spec.opacity, 20);
        assert_eq!(spec.fill_gray, 220);
        assert_eq!(spec.padding, 200);
        assert_eq!(spec.space_interval, 10);
        assert!(spec.validate().is_ok());
    }

    // Test: opacity percent maps onto the full 8-bit alpha range
    #[rstest]
    #[case(0, 0)]
    #[case(20, 51)]
    #[case(50, 128)]
    #[case(100, 255)]
    fn test_alpha_mapping(#[case] opacity: u8, #[case] expected: u8) {
        let spec = WatermarkSpec {
            opacity,
            ..WatermarkSpec::new("x")
        };
        assert_eq!(spec.alpha(), expected);
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        let spec = WatermarkSpec::new("");
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("text"));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-12.5)]
    #[case(f32::NAN)]
    fn test_validate_rejects_bad_font_size(#[case] font_size: f32) {
        let spec = WatermarkSpec {
            font_size,
            ..WatermarkSpec::new("x")
        };
        assert!(spec.validate().is_err());
    }

    #[rstest]
    #[case(360.0)]
    #[case(-1.0)]
    #[case(720.0)]
    fn test_validate_rejects_out_of_range_angle(#[case] angle: f32) {
        let spec = WatermarkSpec {
            angle,
            ..WatermarkSpec::new("x")
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_opacity_over_100() {
        let spec = WatermarkSpec {
            opacity: 101,
            ..WatermarkSpec::new("x")
        };
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("opacity"));
    }

    #[test]
    fn test_validate_rejects_zero_space_interval() {
        let spec = WatermarkSpec {
            space_interval: 0,
            ..WatermarkSpec::new("x")
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_save_options_validation() {
        assert!(SaveOptions::default().validate().is_ok());

        let bad_quality = SaveOptions {
            quality: 101,
            ..SaveOptions::default()
        };
        assert!(bad_quality.validate().is_err());

        let bad_resize = SaveOptions {
            resize: Some(0),
            ..SaveOptions::default()
        };
        assert!(bad_resize.validate().is_err());

        let ok = SaveOptions {
            quality: 85,
            compress: true,
            resize: Some(1200),
        };
        assert!(ok.validate().is_ok());
    }
}
