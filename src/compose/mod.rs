mod alpha;
mod error;
mod mask;
mod resample;

pub use alpha::{compose, AlphaCompositor, ResamplePolicy};
pub use error::ComposeError;
pub use mask::{alpha_from_coverage, Mask};
