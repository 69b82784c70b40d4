use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::process;
use tidemark::{batch, font, logging, processor, SaveOptions, WatermarkError, WatermarkSpec};

/// Overlay a tiled, rotated text watermark on images or directory trees
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input file or directory
    #[arg(short, long)]
    input: PathBuf,

    /// Output file or directory
    #[arg(short, long)]
    output: PathBuf,

    /// Watermark text
    #[arg(short, long)]
    text: String,

    /// TTF/OTF font file
    #[arg(long)]
    font: PathBuf,

    /// Rotation angle in degrees, counter-clockwise
    #[arg(long, default_value_t = 45.0)]
    angle: f32,

    /// Text opacity in percent (0-100)
    #[arg(long, default_value_t = 20)]
    opacity: u8,

    /// Fill gray level reused for R, G and B (0-255)
    #[arg(long, default_value_t = 220)]
    fill: u8,

    /// Font size in pixels
    #[arg(long, default_value_t = 50.0)]
    font_size: f32,

    /// Padding above and below each text row, in pixels
    #[arg(long, default_value_t = 200)]
    padding: u32,

    /// Space characters between text copies, also the per-row shift step
    #[arg(long, default_value_t = 10)]
    space_interval: usize,

    /// JPEG save quality (0-100)
    #[arg(long, default_value_t = 100)]
    quality: u8,

    /// Compress TIFF frames (Deflate)
    #[arg(long)]
    compress: bool,

    /// Resize TIFF frames so the longest side equals this many pixels
    #[arg(long)]
    resize: Option<u32>,

    /// Skip the confirmation prompt in directory mode
    #[arg(short = 'y', long)]
    yes: bool,
}

fn main() {
    logging::init_subscriber().expect("failed to initialize logging subsystem");

    let args = Args::parse();
    match run(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            process::exit(e.exit_code());
        }
    }
}

fn run(args: &Args) -> Result<i32, WatermarkError> {
    let spec = WatermarkSpec {
        text: args.text.clone(),
        font_size: args.font_size,
        angle: args.angle,
        opacity: args.opacity,
        fill_gray: args.fill,
        padding: args.padding,
        space_interval: args.space_interval,
    };
    spec.validate()?;

    let opts = SaveOptions {
        quality: args.quality,
        compress: args.compress,
        resize: args.resize,
    };
    opts.validate()?;

    let face = font::load_font(&args.font)?;

    if args.input.is_dir() {
        run_directory(args, &spec, &face, &opts)
    } else {
        if args.output.is_dir() {
            return Err(WatermarkError::DirectoryMismatch(
                "output is a directory but input is a single file".to_string(),
            ));
        }
        processor::watermark_file(&args.input, &args.output, &spec, &face, &opts)?;
        Ok(0)
    }
}

fn run_directory(
    args: &Args,
    spec: &WatermarkSpec,
    face: &ab_glyph::FontVec,
    opts: &SaveOptions,
) -> Result<i32, WatermarkError> {
    if !args.output.is_dir() {
        return Err(WatermarkError::DirectoryMismatch(
            "if input is a directory, output must be an existing directory".to_string(),
        ));
    }

    let files = batch::discover_images(&args.input)?;
    if files.is_empty() {
        eprintln!(
            "no supported images found under {}",
            args.input.display()
        );
        return Ok(0);
    }

    if !args.yes && !batch::confirm(files.len())? {
        eprintln!("aborted");
        return Ok(0);
    }

    let summary = batch::run_batch(&files, &args.input, &args.output, spec, face, opts);

    for (file, reason) in &summary.failures {
        eprintln!("{} {}: {}", style("failed").red(), file.display(), reason);
    }
    if summary.is_clean() {
        eprintln!("{} {} file(s) watermarked", style("done:").green(), summary.succeeded);
        Ok(0)
    } else {
        eprintln!(
            "{} {} succeeded, {} failed",
            style("done:").yellow(),
            summary.succeeded,
            style(summary.failed()).red()
        );
        Ok(1)
    }
}
