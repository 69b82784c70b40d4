//! Tiled text watermarks for raster images.
//!
//! The core is a two-step pipeline: the tile builder renders rows of
//! repeated, cyclically shifted text into a transparent RGBA buffer sized
//! from the image's diagonal and rotates it; the compositor crops the tile's
//! center to the image's bounds and alpha-blends it over. Everything else
//! (format dispatch, multi-page TIFF, directory batches) is plumbing around
//! those two functions.
//!
//! ```ignore
//! use tidemark::{font, processor, WatermarkSpec, SaveOptions};
//!
//! let spec = WatermarkSpec::new("CONFIDENTIAL");
//! spec.validate()?;
//! let face = font::load_font(Path::new("DejaVuSansMono.ttf"))?;
//! processor::watermark_file(input, output, &spec, &face, &SaveOptions::default())?;
//! ```

pub mod batch;
pub mod compositor;
pub mod error;
pub mod font;
pub mod logging;
pub mod processor;
pub mod spec;
pub mod tile;

pub use batch::{discover_images, mirror_output_path, run_batch, BatchSummary};
pub use compositor::composite;
pub use error::WatermarkError;
pub use processor::{watermark_file, watermark_image, ImageKind};
pub use spec::{SaveOptions, WatermarkSpec};
pub use tile::{build_tile, covering_side, cyclic_shift};
