use crate::compose::Mask;
use anyhow::Result;
use clap::ValueEnum;
use image::RgbImage;

/// Trait for person segmentation backends
/// Allows swapping an ONNX model for pre-computed masks or test doubles
pub trait SegmentationProvider {
    /// Estimate foreground coverage for a frame
    ///
    /// # Arguments
    /// * `frame` - Input RGB frame
    ///
    /// # Returns
    /// * `Some(mask)` at whatever resolution the backend works in
    /// * `None` when the backend has nothing for this frame; the caller shows
    ///   the frame unmodified
    fn segment(&mut self, frame: &RgbImage) -> Result<Option<Mask>>;

    /// Reset internal state (for models with temporal/recurrent components)
    ///
    /// Call this when:
    /// - The source loops or seeks
    /// - Switching cameras
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless providers
    }

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Speed/quality trade-off for model-based segmentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum QualityLevel {
    Fast,
    #[default]
    Balanced,
    Accurate,
}

impl QualityLevel {
    /// Square model input edge in pixels
    pub fn input_size(self) -> u32 {
        match self {
            QualityLevel::Fast => 256,
            QualityLevel::Balanced => 512,
            QualityLevel::Accurate => 768,
        }
    }
}
