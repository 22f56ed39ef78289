mod orientation;
mod sequence;
mod webcam;

pub use orientation::Orientation;
pub use sequence::ImageSequence;
pub use webcam::WebcamCapture;

pub(crate) use sequence::image_files;

use anyhow::Result;
use image::RgbImage;

/// Trait for anything that hands out colour frames
///
/// Sources deliver frames already upright; orientation correction happens
/// here, never downstream.
pub trait FrameSource {
    /// Produce the next frame
    fn next_frame(&mut self) -> Result<RgbImage>;

    /// Size of the frames this source produces, after orientation
    fn resolution(&self) -> (u32, u32);

    /// True when the frame last returned by `next_frame` restarted playback
    /// from the beginning (loop or seek). Live sources never restart.
    fn restarted(&self) -> bool {
        false
    }
}
