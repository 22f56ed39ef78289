use clap::ValueEnum;
use image::{imageops, RgbImage};

/// Clockwise rotation applied to frames before they leave a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Orientation {
    #[default]
    Up,
    /// 90 degrees clockwise
    Right,
    /// 180 degrees
    Down,
    /// 90 degrees counter-clockwise
    Left,
}

impl Orientation {
    pub fn apply(self, frame: RgbImage) -> RgbImage {
        match self {
            Orientation::Up => frame,
            Orientation::Right => imageops::rotate90(&frame),
            Orientation::Down => imageops::rotate180(&frame),
            Orientation::Left => imageops::rotate270(&frame),
        }
    }

    /// Frame size after rotation
    pub fn oriented_size(self, (width, height): (u32, u32)) -> (u32, u32) {
        match self {
            Orientation::Up | Orientation::Down => (width, height),
            Orientation::Right | Orientation::Left => (height, width),
        }
    }
}
