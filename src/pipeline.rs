//! Per-frame loop tying a frame source, an optional segmentation provider and
//! a presentation sink together.

use crate::compose::AlphaCompositor;
use crate::output::PresentationSink;
use crate::segmentation::SegmentationProvider;
use crate::source::FrameSource;
use anyhow::{Context, Result};
use image::buffer::ConvertBuffer;
use image::{RgbImage, RgbaImage};
use std::time::{Duration, Instant};

/// Log averages every this many frames
const STATS_INTERVAL: u64 = 30;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Target frames per second; 0 disables pacing
    pub fps: u32,
    /// Master switch for segmentation; off means every frame passes through
    pub segmentation_enabled: bool,
    /// Present the matte as an opaque grey image instead of compositing
    pub show_matte: bool,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fps: 20,
            segmentation_enabled: true,
            show_matte: false,
            max_frames: None,
        }
    }
}

/// What happened to a frame on its way to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Source colour with mask alpha
    Composited,
    /// Mask rendered in grey
    Matte,
    /// Source shown unmodified
    PassThrough,
}

pub struct ProcessedFrame {
    pub image: RgbaImage,
    pub disposition: FrameDisposition,
    /// Set when the provider returned an error rather than "no mask"
    pub segmentation_failed: bool,
    pub segment_time: Duration,
    pub compose_time: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub frames: u64,
    pub composited: u64,
    pub mattes: u64,
    pub passed_through: u64,
    pub segmentation_failures: u64,
    pub source_time: Duration,
    pub segment_time: Duration,
    pub compose_time: Duration,
    pub present_time: Duration,
}

impl PipelineStats {
    fn record(&mut self, frame: &ProcessedFrame) {
        self.frames += 1;
        match frame.disposition {
            FrameDisposition::Composited => self.composited += 1,
            FrameDisposition::Matte => self.mattes += 1,
            FrameDisposition::PassThrough => self.passed_through += 1,
        }
        if frame.segmentation_failed {
            self.segmentation_failures += 1;
        }
        self.segment_time += frame.segment_time;
        self.compose_time += frame.compose_time;
    }

    fn average_ms(&self, total: Duration) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        total.as_secs_f64() * 1000.0 / self.frames as f64
    }

    /// One-line timing and disposition summary
    pub fn summary(&self) -> String {
        let source_ms = self.average_ms(self.source_time);
        let segment_ms = self.average_ms(self.segment_time);
        let compose_ms = self.average_ms(self.compose_time);
        let present_ms = self.average_ms(self.present_time);
        let total_ms = source_ms + segment_ms + compose_ms + present_ms;
        let fps = if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 };

        format!(
            "Frame {}: source={:.1}ms, segment={:.1}ms, compose={:.1}ms, present={:.1}ms, total={:.1}ms, fps={:.1} (composited={}, matte={}, passthrough={}, segmentation_failures={})",
            self.frames,
            source_ms,
            segment_ms,
            compose_ms,
            present_ms,
            total_ms,
            fps,
            self.composited,
            self.mattes,
            self.passed_through,
            self.segmentation_failures
        )
    }

    fn log(&self) {
        tracing::info!("{}", self.summary());
    }
}

/// Describe a disagreement between the source size and a sink's fixed size
pub fn size_mismatch(source: (u32, u32), sink: Option<(u32, u32)>) -> Option<String> {
    match sink {
        Some(sink) if sink != source => Some(format!(
            "Source is {}x{} but the sink presents at {}x{}; frames will be rescaled",
            source.0, source.1, sink.0, sink.1
        )),
        _ => None,
    }
}

/// The unmodified frame as opaque RGBA
pub fn pass_through(frame: &RgbImage) -> RgbaImage {
    frame.convert()
}

/// Run one frame through segmentation and compositing.
///
/// No provider, no mask, or a provider error all fall back to showing the
/// frame unmodified. Compositor errors are returned.
pub fn process_frame(
    frame: &RgbImage,
    provider: Option<&mut (dyn SegmentationProvider + 'static)>,
    compositor: &AlphaCompositor,
    show_matte: bool,
) -> Result<ProcessedFrame> {
    let mut processed = ProcessedFrame {
        image: RgbaImage::new(0, 0),
        disposition: FrameDisposition::PassThrough,
        segmentation_failed: false,
        segment_time: Duration::ZERO,
        compose_time: Duration::ZERO,
    };

    let mask = match provider {
        Some(provider) => {
            let start = Instant::now();
            let result = provider.segment(frame);
            processed.segment_time = start.elapsed();

            match result {
                Ok(mask) => mask,
                Err(err) => {
                    tracing::warn!("{} failed, showing frame as-is: {:#}", provider.name(), err);
                    processed.segmentation_failed = true;
                    None
                }
            }
        }
        None => None,
    };

    let start = Instant::now();
    match mask {
        Some(mask) if show_matte => {
            let (width, height) = frame.dimensions();
            processed.image = mask
                .resized(width, height)
                .context("Failed to scale matte to frame")?
                .to_preview();
            processed.disposition = FrameDisposition::Matte;
        }
        Some(mask) => {
            processed.image = compositor
                .compose_rgb(frame, &mask)
                .context("Failed to composite frame")?;
            processed.disposition = FrameDisposition::Composited;
        }
        None => {
            processed.image = pass_through(frame);
        }
    }
    processed.compose_time = start.elapsed();

    Ok(processed)
}

/// Pull frames from `source` and push results to `sink` until an error
/// occurs or `max_frames` is reached.
pub fn run_pipeline<C, O>(
    source: &mut C,
    sink: &mut O,
    mut provider: Option<Box<dyn SegmentationProvider>>,
    options: &PipelineOptions,
) -> Result<PipelineStats>
where
    C: FrameSource + ?Sized,
    O: PresentationSink + ?Sized,
{
    let frame_duration = if options.fps > 0 {
        Some(Duration::from_secs_f64(1.0 / f64::from(options.fps)))
    } else {
        None
    };
    let compositor = AlphaCompositor::new();
    let mut stats = PipelineStats::default();

    tracing::info!("Starting main pipeline loop");
    match &provider {
        Some(p) if options.segmentation_enabled => {
            tracing::info!("Segmentation enabled ({}), show_matte={}", p.name(), options.show_matte);
        }
        Some(p) => tracing::info!("Segmentation available ({}) but switched off", p.name()),
        None => tracing::info!("Running in passthrough mode (no segmentation)"),
    }
    if let Some(mismatch) = size_mismatch(source.resolution(), sink.resolution()) {
        tracing::warn!("{}", mismatch);
    }

    loop {
        if options.max_frames.is_some_and(|max| stats.frames >= max) {
            tracing::info!("Reached frame limit of {}", stats.frames);
            break;
        }

        let loop_start = Instant::now();

        let source_start = Instant::now();
        let frame = source.next_frame().context("Failed to get frame")?;
        stats.source_time += source_start.elapsed();

        if source.restarted() {
            if let Some(provider) = provider.as_deref_mut() {
                tracing::debug!("Source restarted, resetting {}", provider.name());
                provider.reset_state();
            }
        }

        let active = if options.segmentation_enabled {
            provider.as_deref_mut()
        } else {
            None
        };
        let processed = process_frame(&frame, active, &compositor, options.show_matte)?;

        let present_start = Instant::now();
        sink.present(&processed.image)
            .context("Failed to present frame")?;
        stats.present_time += present_start.elapsed();

        stats.record(&processed);

        if stats.frames % STATS_INTERVAL == 0 {
            stats.log();
        }

        if let Some(frame_duration) = frame_duration {
            let elapsed = loop_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
    }

    stats.log();
    Ok(stats)
}
