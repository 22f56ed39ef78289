use super::PresentationSink;
use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Writes each presented frame as a numbered PNG, alpha included
pub struct PngSequenceOutput {
    dir: PathBuf,
    written: u64,
}

impl PngSequenceOutput {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        tracing::info!("Writing PNG frames to {}", dir.display());

        Ok(Self { dir, written: 0 })
    }

    fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl PresentationSink for PngSequenceOutput {
    fn present(&mut self, frame: &RgbaImage) -> Result<()> {
        let path = self.frame_path(self.written);
        frame
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        None
    }
}
