use super::types::SegmentationProvider;
use crate::compose::Mask;
use crate::source::image_files;
use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::path::Path;

/// Pre-computed masks replayed in step with the frame source
///
/// Useful when segmentation ran offline, or to drive the pipeline without a
/// model. Masks cycle independently of the frame size; the compositor
/// rescales each one to the frame it lands on.
pub struct MaskSequence {
    masks: Vec<Mask>,
    cursor: usize,
}

impl MaskSequence {
    /// Load every single-channel image in `dir`, ordered by file name
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        tracing::info!("Loading mask sequence from {}", dir.display());

        let masks = image_files(dir)?
            .into_iter()
            .map(|path| {
                let decoded = image::open(&path)
                    .with_context(|| format!("Failed to decode mask {}", path.display()))?;
                Mask::from_dynamic(&decoded)
                    .with_context(|| format!("Unusable mask {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_masks(masks).with_context(|| format!("No masks in {}", dir.display()))
    }

    pub fn from_masks(masks: Vec<Mask>) -> Result<Self> {
        if masks.is_empty() {
            bail!("mask sequence is empty");
        }
        tracing::info!("Mask sequence ready: {} masks", masks.len());
        Ok(Self { masks, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

impl SegmentationProvider for MaskSequence {
    fn segment(&mut self, _frame: &RgbImage) -> Result<Option<Mask>> {
        let mask = self.masks[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.masks.len();
        Ok(Some(mask))
    }

    fn reset_state(&mut self) {
        self.cursor = 0;
    }

    fn name(&self) -> &str {
        "mask-sequence"
    }
}
