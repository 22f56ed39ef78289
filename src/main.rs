use anyhow::{Context, Result};
use clap::Parser;
use image::Rgb;
use segmatte::output::{parse_hex_color, PngSequenceOutput, PresentationSink, V4L2Output};
use segmatte::segmentation::{self, MaskSequence, QualityLevel, SegmentationProvider};
use segmatte::source::{FrameSource, ImageSequence, Orientation, WebcamCapture};
use segmatte::{run_pipeline, PipelineOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of frames to play in a loop (uses the webcam when omitted)
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Capture resolution width
    #[arg(long, default_value_t = 1280)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 720)]
    capture_height: u32,

    /// Rotation applied to incoming frames
    #[arg(long, value_enum, default_value_t = Orientation::Up)]
    orientation: Orientation,

    /// Path to segmentation model (ONNX file)
    #[arg(long, conflicts_with = "masks")]
    model: Option<PathBuf>,

    /// Model speed/quality trade-off
    #[arg(long, value_enum, default_value_t = QualityLevel::Balanced)]
    quality: QualityLevel,

    /// Directory of pre-computed grayscale masks used instead of a model
    #[arg(long)]
    masks: Option<PathBuf>,

    /// Keep the provider loaded but show frames unmodified
    #[arg(long)]
    no_segmentation: bool,

    /// Show matte visualization (grayscale silhouette) instead of compositing
    #[arg(long)]
    show_matte: bool,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Write PNG frames (with alpha) to this directory instead of a device
    #[arg(long)]
    png_out: Option<PathBuf>,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Colour shown through transparent areas on the loopback device
    #[arg(long, value_parser = parse_hex_color, default_value = "#00ff00")]
    background: Rgb<u8>,

    /// Target frames per second (0 = as fast as possible)
    #[arg(long, default_value_t = 20)]
    fps: u32,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("segmatte starting");
    tracing::info!("Target FPS: {}", args.fps);

    let mut source = open_source(&args)?;
    let (width, height) = source.resolution();
    tracing::info!("Source: {}x{}", width, height);

    let provider = open_provider(&args)?;
    let mut sink = open_sink(&args)?;

    let options = PipelineOptions {
        fps: args.fps,
        segmentation_enabled: !args.no_segmentation,
        show_matte: args.show_matte,
        max_frames: args.max_frames,
    };

    let stats = run_pipeline(source.as_mut(), sink.as_mut(), provider, &options)?;
    tracing::info!(
        "Done: {} frames ({} composited, {} passed through, {} segmentation failures)",
        stats.frames,
        stats.composited,
        stats.passed_through,
        stats.segmentation_failures
    );

    Ok(())
}

fn open_source(args: &Args) -> Result<Box<dyn FrameSource>> {
    match &args.frames {
        Some(dir) => {
            let seq = ImageSequence::open(dir, args.orientation)
                .context("Failed to load frame sequence")?;
            Ok(Box::new(seq))
        }
        None => {
            let capture = WebcamCapture::new(
                args.input_device,
                args.capture_width,
                args.capture_height,
                args.orientation,
            )
            .context("Failed to initialize webcam capture")?;
            Ok(Box::new(capture))
        }
    }
}

fn open_provider(args: &Args) -> Result<Option<Box<dyn SegmentationProvider>>> {
    if let Some(dir) = &args.masks {
        let masks = MaskSequence::open(dir).context("Failed to load mask sequence")?;
        return Ok(Some(Box::new(masks)));
    }

    if let Some(model_path) = &args.model {
        tracing::info!("Loading segmentation model from {}", model_path.display());
        let model = segmentation::create_default_model(model_path, args.quality)
            .context("Failed to load segmentation model")?;
        tracing::info!("Segmentation model loaded successfully");
        return Ok(Some(model));
    }

    Ok(None)
}

fn open_sink(args: &Args) -> Result<Box<dyn PresentationSink>> {
    match &args.png_out {
        Some(dir) => {
            let sink = PngSequenceOutput::new(dir).context("Failed to prepare PNG output")?;
            Ok(Box::new(sink))
        }
        None => {
            tracing::info!("Output: {}x{}", args.output_width, args.output_height);
            let sink = V4L2Output::new(
                &args.output_device,
                args.output_width,
                args.output_height,
                args.background,
            )
            .context("Failed to initialize v4l2loopback output")?;
            Ok(Box::new(sink))
        }
    }
}
