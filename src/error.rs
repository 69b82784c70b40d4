//! Watermark error types.
//!
//! Every failure in the pipeline maps to one of these variants so the CLI
//! can report the failing file and pick a distinct exit code per kind.

use thiserror::Error;

/// Errors that can occur during watermark processing.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Input file extension outside the PNG/JPEG/TIFF allow-list.
    #[error("unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Input/output path kinds disagree (directory vs. file).
    #[error("directory mismatch: {0}")]
    DirectoryMismatch(String),

    /// A watermark parameter failed boundary validation.
    #[error("invalid watermark spec: {0}")]
    InvalidSpec(String),

    /// Font file could not be loaded or parsed.
    #[error("font error: {0}")]
    Font(String),

    /// Failed to decode an input image.
    #[error("decode error: {0}")]
    Decode(String),

    /// Failed to encode or write an output image.
    #[error("encode error: {0}")]
    Encode(String),

    /// Compositing invariant violated (crop box outside the tile).
    #[error("composite error: {0}")]
    Composite(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for WatermarkError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => WatermarkError::Encode(e.to_string()),
            image::ImageError::IoError(e) => WatermarkError::Io(e),
            other => WatermarkError::Decode(other.to_string()),
        }
    }
}

impl From<tiff::TiffError> for WatermarkError {
    fn from(err: tiff::TiffError) -> Self {
        match err {
            tiff::TiffError::IoError(e) => WatermarkError::Io(e),
            other => WatermarkError::Decode(other.to_string()),
        }
    }
}

impl WatermarkError {
    /// Process exit code for this error kind.
    ///
    /// Unsupported formats and path-kind mismatches get their own codes so
    /// scripts can tell them apart; everything else is a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            WatermarkError::UnsupportedFormat { .. } => 2,
            WatermarkError::DirectoryMismatch(_) => 3,
            WatermarkError::InvalidSpec(_) => 4,
            _ => 1,
        }
    }
}
