//! Directory batch processing.
//!
//! Discovers images under the input root, mirrors the subtree under the
//! output root and watermarks the files on a rayon worker pool. A file's
//! failure is logged and counted, never fatal to the rest of the batch.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::WatermarkError;
use crate::processor::{watermark_file, ImageKind};
use crate::spec::{SaveOptions, WatermarkSpec};
use ab_glyph::FontVec;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    /// Failed files with their error messages, in discovery order.
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Recursively discover supported images under `root`, sorted for a
/// deterministic processing order.
pub fn discover_images(root: &Path) -> Result<Vec<PathBuf>, WatermarkError> {
    // escape the root so directory names with glob metacharacters
    // (brackets, `*`, `?`) still match literally
    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{}/**/*", escaped);

    let entries = glob::glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let mut images = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() && ImageKind::is_supported(&path) => images.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
        }
    }

    images.sort();
    Ok(images)
}

/// Derive the output path for `file`, recreating the input subtree under
/// the output root. Directory creation is idempotent, so concurrent workers
/// racing on the same subdirectory are fine.
pub fn mirror_output_path(
    file: &Path,
    input_root: &Path,
    output_root: &Path,
) -> Result<PathBuf, WatermarkError> {
    let relative = file.strip_prefix(input_root).map_err(|_| {
        WatermarkError::DirectoryMismatch(format!(
            "{} is not under the input directory {}",
            file.display(),
            input_root.display()
        ))
    })?;

    let target = output_root.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(target)
}

/// Ask for confirmation before a batch run, reporting the file count.
pub fn confirm(count: usize) -> io::Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!(
        "There are {} images to watermark. Continue? (y/N): ",
        count
    ))?;
    let answer = term.read_line()?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Watermark every file on a worker pool bounded by the CPU core count.
///
/// Each file is independent; only the progress bar and the summary are
/// shared. Failures are isolated per file.
pub fn run_batch(
    files: &[PathBuf],
    input_root: &Path,
    output_root: &Path,
    spec: &WatermarkSpec,
    font: &FontVec,
    opts: &SaveOptions,
) -> BatchSummary {
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("progress template is valid"),
    );

    let results: Vec<Result<(), (PathBuf, String)>> = files
        .par_iter()
        .map(|file| {
            let result = mirror_output_path(file, input_root, output_root)
                .and_then(|output| watermark_file(file, &output, spec, font, opts));
            bar.inc(1);

            match result {
                Ok(()) => {
                    tracing::info!(file = %file.display(), "watermarked");
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "failed to watermark");
                    Err((file.clone(), e.to_string()))
                }
            }
        })
        .collect();

    bar.finish_and_clear();

    let mut summary = BatchSummary::default();
    for result in results {
        match result {
            Ok(()) => summary.succeeded += 1,
            Err(failure) => summary.failures.push(failure),
        }
    }
    summary.failures.sort();
    summary
}
