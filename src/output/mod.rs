mod flatten;
mod loopback;
mod png;

pub use flatten::{flatten_over, parse_hex_color};
pub use loopback::V4L2Output;
pub use png::PngSequenceOutput;

use anyhow::Result;
use image::RgbaImage;

/// Trait for presentation destinations
pub trait PresentationSink {
    /// Present a composed (or passed-through) frame
    fn present(&mut self, frame: &RgbaImage) -> Result<()>;

    /// Fixed output resolution, if the sink imposes one
    fn resolution(&self) -> Option<(u32, u32)>;
}
